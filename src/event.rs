//! Core data model: normalized game outcomes and the persisted rating records
//! derived from them. Everything downstream of extraction operates on these
//! types and never sees the raw store documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub type PlayerId = String;
pub type GroupId = String;
pub type ContainerId = String;

/// Which source record a `GameEvent` was extracted from.
///
/// Variant order is the final chronological tie-break: a session game sorts
/// before a tournament passe when every other key component is equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "game")]
    SessionGame,
    #[serde(rename = "tournament_passe")]
    TournamentPasse,
}

impl EventKind {
    /// Stable tag used in ledger documents and store keys.
    pub fn tag(self) -> &'static str {
        match self {
            EventKind::SessionGame => "game",
            EventKind::TournamentPasse => "tournament_passe",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Top,
    Bottom,
}

impl Team {
    pub fn opponent(self) -> Team {
        match self {
            Team::Top => Team::Bottom,
            Team::Bottom => Team::Top,
        }
    }
}

/// Margin-of-victory scalar per team: the unweighted striche marker totals.
/// Weis/bonus points are never part of this value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub striche_top: u32,
    pub striche_bottom: u32,
}

impl Outcome {
    pub fn total(&self) -> u32 {
        self.striche_top + self.striche_bottom
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPlayer {
    pub player_id: PlayerId,
    pub team: Team,
}

/// One completed 2v2 game outcome, uniquely identified by
/// `(container_id, sequence_number, kind)` within its group.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEvent {
    pub kind: EventKind,
    pub group_id: GroupId,
    pub container_id: ContainerId,
    pub sequence_number: u32,
    pub completed_at: DateTime<Utc>,
    players: [EventPlayer; 4],
    pub outcome: Outcome,
}

impl GameEvent {
    /// Builds an event from validated 2v2 rosters. Distinctness of the four
    /// players is the extractor's responsibility; events that reach this
    /// constructor are well-formed.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: EventKind,
        group_id: GroupId,
        container_id: ContainerId,
        sequence_number: u32,
        completed_at: DateTime<Utc>,
        top: [PlayerId; 2],
        bottom: [PlayerId; 2],
        outcome: Outcome,
    ) -> Self {
        let [t0, t1] = top;
        let [b0, b1] = bottom;
        let players = [
            EventPlayer { player_id: t0, team: Team::Top },
            EventPlayer { player_id: t1, team: Team::Top },
            EventPlayer { player_id: b0, team: Team::Bottom },
            EventPlayer { player_id: b1, team: Team::Bottom },
        ];
        Self {
            kind,
            group_id,
            container_id,
            sequence_number,
            completed_at,
            players,
            outcome,
        }
    }

    pub fn players(&self) -> &[EventPlayer; 4] {
        &self.players
    }

    pub fn team_members(&self, team: Team) -> impl Iterator<Item = &PlayerId> {
        self.players
            .iter()
            .filter(move |p| p.team == team)
            .map(|p| &p.player_id)
    }

    /// Total chronological order over all events: completion time, then
    /// container id, then sequence number, then kind. Distinct events never
    /// compare equal, so replay order is deterministic across runs.
    pub fn chronological_cmp(&self, other: &Self) -> Ordering {
        (
            self.completed_at,
            &self.container_id,
            self.sequence_number,
            self.kind,
        )
            .cmp(&(
                other.completed_at,
                &other.container_id,
                other.sequence_number,
                other.kind,
            ))
    }
}

/// Identity of a ledger entry; the idempotent upsert key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HistoryKey {
    pub player_id: PlayerId,
    pub container_id: ContainerId,
    pub sequence_number: u32,
    pub kind: EventKind,
}

/// One player's rating movement from one game, as persisted in the ledger.
/// `created_at` mirrors the game's completion time so recomputation writes
/// the exact same document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatingHistoryEntry {
    pub player_id: PlayerId,
    pub group_id: GroupId,
    pub container_id: ContainerId,
    pub sequence_number: u32,
    pub kind: EventKind,
    pub rating: f64,
    pub rating_before: f64,
    pub delta: f64,
    pub created_at: DateTime<Utc>,
    pub expected_score: f64,
    pub actual_score: f64,
    pub team_rating: f64,
    pub opponent_rating: f64,
}

impl RatingHistoryEntry {
    pub fn key(&self) -> HistoryKey {
        HistoryKey {
            player_id: self.player_id.clone(),
            container_id: self.container_id.clone(),
            sequence_number: self.sequence_number,
            kind: self.kind,
        }
    }

    /// Same ordering as the events that produced the entries.
    pub fn chronological_cmp(&self, other: &Self) -> Ordering {
        (
            self.created_at,
            &self.container_id,
            self.sequence_number,
            self.kind,
        )
            .cmp(&(
                other.created_at,
                &other.container_id,
                other.sequence_number,
                other.kind,
            ))
    }
}

/// Read-optimized per-player snapshot, fully derivable from the ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalPlayerRating {
    pub player_id: PlayerId,
    pub current_rating: f64,
    pub total_games_played: u32,
    pub last_updated: DateTime<Utc>,
    pub peak_rating: f64,
    pub peak_rating_date: DateTime<Utc>,
    pub lowest_rating: f64,
    pub lowest_rating_date: DateTime<Utc>,
    pub last_delta: f64,
}

/// Post-container standing of one participant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContainerPlayerRating {
    pub rating: f64,
    pub delta: f64,
    pub games_played: u32,
}

/// Final ratings written back onto a processed session or tournament, the
/// read-model chart consumers render per container.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContainerRatingSummary {
    pub group_id: GroupId,
    pub container_id: ContainerId,
    pub kind: EventKind,
    pub final_ratings: BTreeMap<PlayerId, ContainerPlayerRating>,
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn event(container: &str, seq: u32, secs: i64, kind: EventKind) -> GameEvent {
        GameEvent::new(
            kind,
            "g1".into(),
            container.into(),
            seq,
            ts(secs),
            ["a".into(), "b".into()],
            ["c".into(), "d".into()],
            Outcome { striche_top: 1, striche_bottom: 0 },
        )
    }

    #[test]
    fn timestamp_dominates_ordering() {
        let early = event("z", 9, 100, EventKind::TournamentPasse);
        let late = event("a", 1, 200, EventKind::SessionGame);
        assert_eq!(early.chronological_cmp(&late), Ordering::Less);
    }

    #[test]
    fn same_container_ties_break_by_sequence() {
        let first = event("s1", 1, 100, EventKind::SessionGame);
        let second = event("s1", 2, 100, EventKind::SessionGame);
        assert_eq!(first.chronological_cmp(&second), Ordering::Less);
    }

    #[test]
    fn cross_container_ties_break_by_container_id() {
        let a = event("aaa", 7, 100, EventKind::SessionGame);
        let b = event("bbb", 1, 100, EventKind::SessionGame);
        assert_eq!(a.chronological_cmp(&b), Ordering::Less);
    }

    #[test]
    fn session_game_sorts_before_tournament_passe() {
        let game = event("same", 1, 100, EventKind::SessionGame);
        let passe = event("same", 1, 100, EventKind::TournamentPasse);
        assert_eq!(game.chronological_cmp(&passe), Ordering::Less);
    }

    #[test]
    fn team_members_returns_both_seats() {
        let ev = event("s1", 1, 100, EventKind::SessionGame);
        let top: Vec<_> = ev.team_members(Team::Top).collect();
        assert_eq!(top, ["a", "b"]);
        let bottom: Vec<_> = ev.team_members(Team::Bottom).collect();
        assert_eq!(bottom, ["c", "d"]);
    }
}
