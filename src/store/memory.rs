use super::{SessionRecord, Store, StoreError, TournamentRecord};
use crate::event::{
    ContainerRatingSummary, EventKind, GlobalPlayerRating, GroupId, PlayerId, RatingHistoryEntry,
};
use std::collections::BTreeMap;

/// In-memory store for tests and dry experiments. All collections are
/// `BTreeMap`s so iteration order, and therefore any serialization of the
/// contents, is stable.
#[derive(Default)]
pub struct MemoryStore {
    sessions: BTreeMap<GroupId, Vec<SessionRecord>>,
    tournaments: BTreeMap<GroupId, Vec<TournamentRecord>>,
    history: BTreeMap<PlayerId, Vec<RatingHistoryEntry>>,
    snapshots: BTreeMap<PlayerId, GlobalPlayerRating>,
    summaries: BTreeMap<(GroupId, String, EventKind), ContainerRatingSummary>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_session(&mut self, session: SessionRecord) {
        self.sessions
            .entry(session.group_id.clone())
            .or_default()
            .push(session);
    }

    pub fn add_tournament(&mut self, tournament: TournamentRecord) {
        self.tournaments
            .entry(tournament.group_id.clone())
            .or_default()
            .push(tournament);
    }

    pub fn container_summary(
        &self,
        group_id: &str,
        container_id: &str,
        kind: EventKind,
    ) -> Option<&ContainerRatingSummary> {
        self.summaries
            .get(&(group_id.to_string(), container_id.to_string(), kind))
    }
}

impl Store for MemoryStore {
    fn group_ids(&self) -> Result<Vec<GroupId>, StoreError> {
        let mut ids: Vec<GroupId> = self
            .sessions
            .keys()
            .chain(self.tournaments.keys())
            .cloned()
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    fn sessions(&self, group_id: &str) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self.sessions.get(group_id).cloned().unwrap_or_default())
    }

    fn tournaments(&self, group_id: &str) -> Result<Vec<TournamentRecord>, StoreError> {
        Ok(self.tournaments.get(group_id).cloned().unwrap_or_default())
    }

    fn players_with_history(&self) -> Result<Vec<PlayerId>, StoreError> {
        Ok(self.history.keys().cloned().collect())
    }

    fn player_history(&self, player_id: &str) -> Result<Vec<RatingHistoryEntry>, StoreError> {
        Ok(self.history.get(player_id).cloned().unwrap_or_default())
    }

    fn upsert_history(&mut self, entries: &[RatingHistoryEntry]) -> Result<(), StoreError> {
        for entry in entries {
            let ledger = self.history.entry(entry.player_id.clone()).or_default();
            match ledger.iter_mut().find(|e| e.key() == entry.key()) {
                Some(existing) => *existing = entry.clone(),
                None => ledger.push(entry.clone()),
            }
        }
        Ok(())
    }

    fn append_history(&mut self, entries: &[RatingHistoryEntry]) -> Result<(), StoreError> {
        for entry in entries {
            self.history
                .entry(entry.player_id.clone())
                .or_default()
                .push(entry.clone());
        }
        Ok(())
    }

    fn snapshot(&self, player_id: &str) -> Result<Option<GlobalPlayerRating>, StoreError> {
        Ok(self.snapshots.get(player_id).cloned())
    }

    fn put_snapshot(&mut self, snapshot: &GlobalPlayerRating) -> Result<(), StoreError> {
        self.snapshots
            .insert(snapshot.player_id.clone(), snapshot.clone());
        Ok(())
    }

    fn put_container_summary(
        &mut self,
        summary: &ContainerRatingSummary,
    ) -> Result<(), StoreError> {
        self.summaries.insert(
            (
                summary.group_id.clone(),
                summary.container_id.clone(),
                summary.kind,
            ),
            summary.clone(),
        );
        Ok(())
    }
}
