//! The whole run: parallel read-only extraction fans in to one totally
//! ordered event sequence, a strictly sequential calculator fold produces the
//! ledger, and the aggregation pass republishes the per-player snapshots.
//! Dry-run computes everything and writes nothing.

use crate::aggregate;
use crate::config::{ConfigError, EloConfig};
use crate::elo::{EloCalculator, RatingState};
use crate::event::{
    ContainerId, ContainerPlayerRating, ContainerRatingSummary, EventKind, GlobalPlayerRating,
    GroupId, HistoryKey, PlayerId, RatingHistoryEntry,
};
use crate::extract;
use crate::ledger::{LedgerWriter, WriteMode, entries_for};
use crate::sequence;
use crate::store::{Store, StoreError};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Compute and log intended writes, perform none.
    DryRun,
    Commit,
}

#[derive(Clone, Debug)]
pub struct RunOptions {
    pub mode: RunMode,
    pub write_mode: WriteMode,
    /// Restrict extraction to one group.
    pub group: Option<GroupId>,
    /// Process at most this many events of the ordered sequence.
    pub limit: Option<usize>,
    /// How many events the dry-run preview prints.
    pub preview: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: RunMode::DryRun,
            write_mode: WriteMode::Backfill,
            group: None,
            limit: None,
            preview: 20,
        }
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub groups: usize,
    pub events_processed: usize,
    pub events_dropped: usize,
    pub players: usize,
    pub entries_written: usize,
    pub committed: bool,
    pub snapshots: Vec<GlobalPlayerRating>,
}

/// Runs the full pipeline. The config is validated before any event is
/// touched; an invalid constant set aborts here.
pub fn run<S: Store + Sync>(
    store: &mut S,
    config: &EloConfig,
    options: &RunOptions,
) -> Result<RunReport, PipelineError> {
    let calculator = EloCalculator::new(*config)?;

    let group_ids: Vec<GroupId> = match &options.group {
        Some(group) => vec![group.clone()],
        None => store.group_ids()?,
    };
    tracing::info!("Extracting events from {} group(s)", group_ids.len());
    let extracted = extract::extract_all(&*store, &group_ids)?;
    let dropped = extracted.dropped;

    let mut events = sequence::sequence(extracted.events);

    // An incremental run continues where the ledger left off: the state is
    // seeded from each player's replayed history, and events already rated
    // are filtered out so only genuinely new ones are appended.
    let mut state = RatingState::new();
    if options.write_mode == WriteMode::Incremental {
        let mut rated: HashSet<(ContainerId, u32, EventKind)> = HashSet::new();
        for player_id in store.players_with_history()? {
            let history = store.player_history(&player_id)?;
            for entry in &history {
                rated.insert((entry.container_id.clone(), entry.sequence_number, entry.kind));
            }
            if let Some(snap) = aggregate::snapshot_from_history(&player_id, history) {
                state.seed(player_id, snap.current_rating, snap.total_games_played);
            }
        }
        let before = events.len();
        events.retain(|e| {
            !rated.contains(&(e.container_id.clone(), e.sequence_number, e.kind))
        });
        tracing::info!(
            "Incremental run: {} events already rated, {} new",
            before - events.len(),
            events.len()
        );
    }

    if let Some(limit) = options.limit {
        events.truncate(limit);
    }
    tracing::info!(
        "Replaying {} events in chronological order ({} dropped at extraction)",
        events.len(),
        dropped
    );

    // The serial core: one global order, state threaded through the fold.
    let mut run_entries: Vec<RatingHistoryEntry> = Vec::with_capacity(events.len() * 4);
    let mut summaries: BTreeMap<(GroupId, ContainerId, EventKind), ContainerRatingSummary> =
        BTreeMap::new();

    for (index, event) in events.iter().enumerate() {
        let update = calculator.apply(&mut state, event);

        if options.mode == RunMode::DryRun && index < options.preview {
            tracing::info!(
                "[preview] {} {} #{}: striche {}:{}, expected {:.3}, actual {:.3}, team delta {:+.2}",
                event.kind.tag(),
                event.container_id,
                event.sequence_number,
                event.outcome.striche_top,
                event.outcome.striche_bottom,
                update.expected_top,
                update.actual_top,
                update.delta,
            );
            for p in &update.players {
                tracing::info!(
                    "[preview]   {}: {:.2} -> {:.2} ({:+.2})",
                    p.player_id,
                    p.rating_before,
                    p.rating_after,
                    p.delta,
                );
            }
        }

        let key = (event.group_id.clone(), event.container_id.clone(), event.kind);
        let summary = summaries.entry(key).or_insert_with(|| ContainerRatingSummary {
            group_id: event.group_id.clone(),
            container_id: event.container_id.clone(),
            kind: event.kind,
            final_ratings: BTreeMap::new(),
        });
        for p in &update.players {
            let games_played = state
                .get(&p.player_id)
                .expect("player present after apply")
                .games_played;
            let slot = summary
                .final_ratings
                .entry(p.player_id.clone())
                .or_insert(ContainerPlayerRating {
                    rating: p.rating_after,
                    delta: 0.0,
                    games_played,
                });
            slot.rating = p.rating_after;
            slot.delta += p.delta;
            slot.games_played = games_played;
        }

        run_entries.extend(entries_for(event, &update));
    }

    let mut entries_written = 0;
    if options.mode == RunMode::Commit {
        let writer = LedgerWriter::new(options.write_mode);
        entries_written = writer.write_all(store, &run_entries)?;
        for summary in summaries.values() {
            store.put_container_summary(summary)?;
        }
    }

    // Snapshots always derive from the ledger. After a commit that is the
    // store itself; a dry run previews the ledger the commit would produce.
    let per_player = match options.mode {
        RunMode::Commit => ledger_by_player(store)?,
        RunMode::DryRun => projected_ledger_by_player(&*store, &run_entries)?,
    };
    let snapshots: Vec<GlobalPlayerRating> = per_player
        .into_iter()
        .filter_map(|(player_id, entries)| aggregate::snapshot_from_history(&player_id, entries))
        .collect();
    if options.mode == RunMode::Commit {
        aggregate::publish_all(store, &snapshots)?;
    }

    let report = RunReport {
        groups: group_ids.len(),
        events_processed: events.len(),
        events_dropped: dropped,
        players: state.len(),
        entries_written,
        committed: options.mode == RunMode::Commit,
        snapshots,
    };
    tracing::info!(
        "Run complete: {} events, {} players, {} ledger entries written{}",
        report.events_processed,
        report.players,
        report.entries_written,
        if report.committed { "" } else { " (dry-run)" },
    );
    Ok(report)
}

fn ledger_by_player<S: Store>(
    store: &S,
) -> Result<BTreeMap<PlayerId, Vec<RatingHistoryEntry>>, StoreError> {
    let mut per_player = BTreeMap::new();
    for player_id in store.players_with_history()? {
        let history = store.player_history(&player_id)?;
        per_player.insert(player_id, history);
    }
    Ok(per_player)
}

/// The ledger a commit of `run_entries` would leave behind: the stored
/// entries of every touched player, with the run's entries upserted over
/// them in memory.
fn projected_ledger_by_player<S: Store>(
    store: &S,
    run_entries: &[RatingHistoryEntry],
) -> Result<BTreeMap<PlayerId, Vec<RatingHistoryEntry>>, StoreError> {
    let mut touched: Vec<&PlayerId> = run_entries.iter().map(|e| &e.player_id).collect();
    touched.sort();
    touched.dedup();

    let mut merged: BTreeMap<PlayerId, BTreeMap<HistoryKey, RatingHistoryEntry>> = BTreeMap::new();
    for player_id in touched {
        let stored = store.player_history(player_id)?;
        let ledger = merged.entry(player_id.clone()).or_default();
        for entry in stored {
            ledger.insert(entry.key(), entry);
        }
    }
    for entry in run_entries {
        merged
            .entry(entry.player_id.clone())
            .or_default()
            .insert(entry.key(), entry.clone());
    }

    Ok(merged
        .into_iter()
        .map(|(player_id, by_key)| (player_id, by_key.into_values().collect()))
        .collect())
}
