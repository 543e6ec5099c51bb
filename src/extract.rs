//! Extraction boundary: turns raw session and tournament records into
//! normalized [`GameEvent`]s. All storage-shape knowledge ends here; the
//! calculator never branches on where an outcome came from.

use crate::event::{EventKind, GameEvent, GroupId, Outcome, PlayerId};
use crate::store::{
    PasseRecord, RawRoster, SessionGameRecord, SessionRecord, Store, StoreError, TournamentRecord,
};
use itertools::Itertools;
use rayon::prelude::*;

/// Result of extracting one or more groups. Dropped events are counted, never
/// defaulted: silently rating invalid input is worse than skipping it.
#[derive(Debug, Default)]
pub struct Extracted {
    pub events: Vec<GameEvent>,
    pub dropped: usize,
}

impl Extracted {
    fn merge(mut self, other: Extracted) -> Extracted {
        self.events.extend(other.events);
        self.dropped += other.dropped;
        self
    }
}

/// Extracts every group in parallel and materializes the combined event set.
/// Fan-out is read-only; all events are collected before any rating math runs.
pub fn extract_all<S: Store + Sync>(
    store: &S,
    group_ids: &[GroupId],
) -> Result<Extracted, StoreError> {
    group_ids
        .par_iter()
        .map(|group_id| extract_group(store, group_id))
        .try_reduce(Extracted::default, |a, b| Ok(a.merge(b)))
}

/// One event per game of every completed session, one per passe of every
/// completed tournament.
pub fn extract_group<S: Store>(store: &S, group_id: &str) -> Result<Extracted, StoreError> {
    let mut extracted = Extracted::default();

    for session in store.sessions(group_id)? {
        if !session.is_completed() {
            continue;
        }
        for game in &session.games {
            match session_game_event(group_id, &session, game) {
                Ok(event) => extracted.events.push(event),
                Err(reason) => {
                    tracing::warn!(
                        "Dropping game {} of session {}: {}",
                        game.game_number,
                        session.id,
                        reason
                    );
                    extracted.dropped += 1;
                }
            }
        }
    }

    for tournament in store.tournaments(group_id)? {
        if !tournament.is_completed() {
            continue;
        }
        for passe in &tournament.passes {
            match passe_event(group_id, &tournament, passe) {
                Ok(event) => extracted.events.push(event),
                Err(reason) => {
                    tracing::warn!(
                        "Dropping passe {} of tournament {}: {}",
                        passe.passe_number,
                        tournament.id,
                        reason
                    );
                    extracted.dropped += 1;
                }
            }
        }
    }

    Ok(extracted)
}

fn session_game_event(
    group_id: &str,
    session: &SessionRecord,
    game: &SessionGameRecord,
) -> Result<GameEvent, &'static str> {
    // Games recorded without their own timestamp inherit the session's.
    let completed_at = game
        .completed_at
        .or(session.completed_at)
        .ok_or("no usable completion timestamp")?;
    let roster = game.teams.as_ref().unwrap_or(&session.teams);
    let (top, bottom) = checked_roster(roster)?;

    // The outcome scalar is the raw marker-category sum; weis points on the
    // record stay out of it.
    let outcome = Outcome {
        striche_top: game.striche.top.total(),
        striche_bottom: game.striche.bottom.total(),
    };
    Ok(GameEvent::new(
        EventKind::SessionGame,
        group_id.to_string(),
        session.id.clone(),
        game.game_number,
        completed_at,
        top,
        bottom,
        outcome,
    ))
}

fn passe_event(
    group_id: &str,
    tournament: &TournamentRecord,
    passe: &PasseRecord,
) -> Result<GameEvent, &'static str> {
    let completed_at = passe
        .completed_at
        .ok_or("no usable completion timestamp")?;
    let (top, bottom) = checked_roster(&passe.teams)?;

    // Passe totals arrive pre-aggregated; use them as-is.
    let outcome = Outcome {
        striche_top: passe.striche_top,
        striche_bottom: passe.striche_bottom,
    };
    Ok(GameEvent::new(
        EventKind::TournamentPasse,
        group_id.to_string(),
        tournament.id.clone(),
        passe.passe_number,
        completed_at,
        top,
        bottom,
        outcome,
    ))
}

/// Enforces the 2v2 shape: two players per team, four distinct players total.
fn checked_roster(roster: &RawRoster) -> Result<([PlayerId; 2], [PlayerId; 2]), &'static str> {
    let [t0, t1] = roster.top.as_slice() else {
        return Err("top team does not have exactly 2 players");
    };
    let [b0, b1] = roster.bottom.as_slice() else {
        return Err("bottom team does not have exactly 2 players");
    };
    if ![t0, t1, b0, b1].into_iter().all_unique() {
        return Err("players are not distinct across teams");
    }
    Ok(([t0.clone(), t1.clone()], [b0.clone(), b1.clone()]))
}
