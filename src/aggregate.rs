//! Derives the per-player read-model snapshot from the ledger. The snapshot
//! is a cache: replaying the entries always reproduces it, so it is
//! overwritten whole and never hand-edited.

use crate::event::{GlobalPlayerRating, PlayerId, RatingHistoryEntry};
use crate::store::{Store, StoreError};

/// Replays one player's ledger in chronological order. The last entry gives
/// the current rating and delta; extrema run across the whole ledger,
/// seeded with the rating the player held before their first game, and keep
/// the date the extremum was first reached.
pub fn snapshot_from_history(
    player_id: &PlayerId,
    mut entries: Vec<RatingHistoryEntry>,
) -> Option<GlobalPlayerRating> {
    if entries.is_empty() {
        return None;
    }
    entries.sort_unstable_by(|a, b| a.chronological_cmp(b));

    let first = &entries[0];
    let mut peak_rating = first.rating_before;
    let mut peak_rating_date = first.created_at;
    let mut lowest_rating = first.rating_before;
    let mut lowest_rating_date = first.created_at;
    for entry in &entries {
        if entry.rating > peak_rating {
            peak_rating = entry.rating;
            peak_rating_date = entry.created_at;
        }
        if entry.rating < lowest_rating {
            lowest_rating = entry.rating;
            lowest_rating_date = entry.created_at;
        }
    }

    let last = entries.last().expect("entries checked non-empty");
    Some(GlobalPlayerRating {
        player_id: player_id.clone(),
        current_rating: last.rating,
        total_games_played: entries.len() as u32,
        last_updated: last.created_at,
        peak_rating,
        peak_rating_date,
        lowest_rating,
        lowest_rating_date,
        last_delta: last.delta,
    })
}

/// Overwrites every snapshot in the store.
pub fn publish_all<S: Store>(
    store: &mut S,
    snapshots: &[GlobalPlayerRating],
) -> Result<(), StoreError> {
    for snapshot in snapshots {
        store.put_snapshot(snapshot)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::event::EventKind;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn entry(seq: u32, secs: i64, rating_before: f64, rating: f64) -> RatingHistoryEntry {
        RatingHistoryEntry {
            player_id: "anna".into(),
            group_id: "g1".into(),
            container_id: "s1".into(),
            sequence_number: seq,
            kind: EventKind::SessionGame,
            rating,
            rating_before,
            delta: rating - rating_before,
            created_at: ts(secs),
            expected_score: 0.5,
            actual_score: 0.5,
            team_rating: rating_before,
            opponent_rating: rating_before,
        }
    }

    #[test]
    fn empty_history_yields_no_snapshot() {
        assert!(snapshot_from_history(&"anna".into(), vec![]).is_none());
    }

    #[test]
    fn snapshot_reflects_the_last_entry_and_the_extrema() {
        // Rise to 1016, fall to 990, recover to 1004.
        let history = vec![
            entry(1, 10, 1000.0, 1008.0),
            entry(2, 20, 1008.0, 1016.0),
            entry(3, 30, 1016.0, 990.0),
            entry(4, 40, 990.0, 1004.0),
        ];
        let snap = snapshot_from_history(&"anna".into(), history).unwrap();

        assert_eq!(snap.current_rating, 1004.0);
        assert_eq!(snap.total_games_played, 4);
        assert_eq!(snap.last_delta, 14.0);
        assert_eq!(snap.last_updated, ts(40));
        assert_eq!(snap.peak_rating, 1016.0);
        assert_eq!(snap.peak_rating_date, ts(20));
        assert_eq!(snap.lowest_rating, 990.0);
        assert_eq!(snap.lowest_rating_date, ts(30));
    }

    #[test]
    fn starting_rating_counts_toward_the_extrema() {
        // A player who only ever gains still has the default as their lowest.
        let history = vec![entry(1, 10, 1000.0, 1008.0), entry(2, 20, 1008.0, 1012.0)];
        let snap = snapshot_from_history(&"anna".into(), history).unwrap();
        assert_eq!(snap.lowest_rating, 1000.0);
        assert_eq!(snap.lowest_rating_date, ts(10));
    }

    #[test]
    fn extremum_ties_keep_the_earlier_date() {
        let history = vec![
            entry(1, 10, 1000.0, 1008.0),
            entry(2, 20, 1008.0, 1000.0),
            entry(3, 30, 1000.0, 1008.0),
        ];
        let snap = snapshot_from_history(&"anna".into(), history).unwrap();
        assert_eq!(snap.peak_rating, 1008.0);
        assert_eq!(snap.peak_rating_date, ts(10));
    }

    #[test]
    fn replay_order_ignores_input_order() {
        let sorted = vec![
            entry(1, 10, 1000.0, 1008.0),
            entry(2, 20, 1008.0, 1016.0),
            entry(3, 30, 1016.0, 990.0),
        ];
        let mut shuffled = sorted.clone();
        shuffled.reverse();
        assert_eq!(
            snapshot_from_history(&"anna".into(), sorted),
            snapshot_from_history(&"anna".into(), shuffled),
        );
    }
}
