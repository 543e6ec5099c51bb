//! Abstract key/collection document store and the raw record shapes read from
//! it. Records are deliberately loose (optional timestamps, variable-length
//! rosters): malformed documents must survive deserialization so the
//! extraction boundary can observe and drop them instead of failing the run.

mod json_dir;
mod memory;

pub use json_dir::JsonStore;
pub use memory::MemoryStore;

use crate::event::{
    ContainerId, ContainerRatingSummary, GlobalPlayerRating, GroupId, PlayerId,
    RatingHistoryEntry,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// The store's transactional-batch write limit. The ledger writer never hands
/// a larger slice to `upsert_history`/`append_history`.
pub const BATCH_LIMIT: usize = 500;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed document at {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Lifecycle marker as stored; only `"completed"` records are rated. Kept as
/// the raw string because the upstream store is schemaless and historical
/// documents carry a variety of states ("active", "abandoned", ...).
pub const STATUS_COMPLETED: &str = "completed";

/// Player-to-team assignment as stored. Length is unchecked here; the
/// extractor enforces the 2v2 shape.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRoster {
    #[serde(default)]
    pub top: Vec<PlayerId>,
    #[serde(default)]
    pub bottom: Vec<PlayerId>,
}

/// Per-team occurrence counts of the scoring-marker categories. Each category
/// counts raw occurrences; severity never weights the sum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StricheMarks {
    #[serde(default)]
    pub win: u32,
    #[serde(default)]
    pub hill: u32,
    #[serde(default)]
    pub slam: u32,
    #[serde(default)]
    pub counter_slam: u32,
    #[serde(default)]
    pub cover: u32,
}

impl StricheMarks {
    pub fn total(&self) -> u32 {
        self.win + self.hill + self.slam + self.counter_slam + self.cover
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamMarks {
    #[serde(default)]
    pub top: StricheMarks,
    #[serde(default)]
    pub bottom: StricheMarks,
}

/// Weis/bonus points per team. Tracked for other consumers; the rating
/// pipeline never reads them into the outcome scalar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeisPoints {
    #[serde(default)]
    pub top: u32,
    #[serde(default)]
    pub bottom: u32,
}

/// One game inside a session record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionGameRecord {
    pub game_number: u32,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Per-game roster override; tournament-style sessions reseat players
    /// between games.
    #[serde(default)]
    pub teams: Option<RawRoster>,
    #[serde(default)]
    pub striche: TeamMarks,
    #[serde(default)]
    pub weis_points: WeisPoints,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: ContainerId,
    pub group_id: GroupId,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub teams: RawRoster,
    #[serde(default)]
    pub games: Vec<SessionGameRecord>,
}

impl SessionRecord {
    pub fn is_completed(&self) -> bool {
        self.status == STATUS_COMPLETED
    }
}

/// One tournament round. The striche totals arrive pre-aggregated; the
/// extractor uses them as-is rather than recomputing from marker categories.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PasseRecord {
    pub passe_number: u32,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub teams: RawRoster,
    #[serde(default)]
    pub striche_top: u32,
    #[serde(default)]
    pub striche_bottom: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TournamentRecord {
    pub id: ContainerId,
    pub group_id: GroupId,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub passes: Vec<PasseRecord>,
}

impl TournamentRecord {
    pub fn is_completed(&self) -> bool {
        self.status == STATUS_COMPLETED
    }
}

/// Abstract document store the pipeline reads inputs from and writes the
/// ledger, snapshots, and container summaries to.
///
/// Reads take `&self` and may run concurrently (the extraction fan-out);
/// writes are serial. Callers keep write slices within [`BATCH_LIMIT`];
/// batches are not atomic with each other, and a failed batch leaves
/// previously committed batches valid.
pub trait Store {
    fn group_ids(&self) -> Result<Vec<GroupId>, StoreError>;
    fn sessions(&self, group_id: &str) -> Result<Vec<SessionRecord>, StoreError>;
    fn tournaments(&self, group_id: &str) -> Result<Vec<TournamentRecord>, StoreError>;

    /// Every player owning at least one ledger entry.
    fn players_with_history(&self) -> Result<Vec<PlayerId>, StoreError>;
    /// A player's ledger entries, in no particular order.
    fn player_history(&self, player_id: &str) -> Result<Vec<RatingHistoryEntry>, StoreError>;

    /// Locates each entry by its `(player, container, sequence, kind)` key and
    /// overwrites it in place, appending where no entry matches. Re-running
    /// over identical input leaves the ledger byte-identical.
    fn upsert_history(&mut self, entries: &[RatingHistoryEntry]) -> Result<(), StoreError>;
    /// Appends entries known to be new, without a key lookup.
    fn append_history(&mut self, entries: &[RatingHistoryEntry]) -> Result<(), StoreError>;

    fn snapshot(&self, player_id: &str) -> Result<Option<GlobalPlayerRating>, StoreError>;
    /// Replaces the player's snapshot entirely; it is a derived cache.
    fn put_snapshot(&mut self, snapshot: &GlobalPlayerRating) -> Result<(), StoreError>;

    fn put_container_summary(
        &mut self,
        summary: &ContainerRatingSummary,
    ) -> Result<(), StoreError>;
}
