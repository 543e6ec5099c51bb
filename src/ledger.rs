//! Persists rating history. Every event yields four ledger entries, one per
//! player, keyed so that recomputation overwrites instead of duplicating.

use crate::elo::GameUpdate;
use crate::event::{GameEvent, RatingHistoryEntry, Team};
use crate::store::{BATCH_LIMIT, Store, StoreError};

/// How entries reach the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    /// Locate by key and overwrite; append only where the key is new. A full
    /// rerun over identical input leaves the ledger byte-identical.
    Backfill,
    /// Append without lookup; the events are known to be new.
    Incremental,
}

/// The four ledger entries of one event. Score and team-rating diagnostics
/// are stored from each player's own perspective, so a bottom-team entry
/// carries the mirrored expected/actual scores. `created_at` repeats the
/// game's completion time, never the wall clock, keeping reruns identical.
pub fn entries_for(event: &GameEvent, update: &GameUpdate) -> Vec<RatingHistoryEntry> {
    update
        .players
        .iter()
        .map(|p| {
            let (expected_score, actual_score, team_rating, opponent_rating) = match p.team {
                Team::Top => (
                    update.expected_top,
                    update.actual_top,
                    update.team_rating_top,
                    update.team_rating_bottom,
                ),
                Team::Bottom => (
                    1.0 - update.expected_top,
                    1.0 - update.actual_top,
                    update.team_rating_bottom,
                    update.team_rating_top,
                ),
            };
            RatingHistoryEntry {
                player_id: p.player_id.clone(),
                group_id: event.group_id.clone(),
                container_id: event.container_id.clone(),
                sequence_number: event.sequence_number,
                kind: event.kind,
                rating: p.rating_after,
                rating_before: p.rating_before,
                delta: p.delta,
                created_at: event.completed_at,
                expected_score,
                actual_score,
                team_rating,
                opponent_rating,
            }
        })
        .collect()
}

pub struct LedgerWriter {
    mode: WriteMode,
}

impl LedgerWriter {
    pub fn new(mode: WriteMode) -> Self {
        Self { mode }
    }

    /// Writes all entries in batches of at most [`BATCH_LIMIT`]. Batches are
    /// not atomic with each other: a failing batch aborts the run after the
    /// already-committed batches, which stay valid and are safely rewritten
    /// by the next backfill.
    pub fn write_all<S: Store>(
        &self,
        store: &mut S,
        entries: &[RatingHistoryEntry],
    ) -> Result<usize, StoreError> {
        for batch in entries.chunks(BATCH_LIMIT) {
            match self.mode {
                WriteMode::Backfill => store.upsert_history(batch)?,
                WriteMode::Incremental => store.append_history(batch)?,
            }
            tracing::debug!("Committed ledger batch of {} entries", batch.len());
        }
        Ok(entries.len())
    }
}
