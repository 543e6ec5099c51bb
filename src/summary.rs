//! Leaderboard over the published snapshots, for operator output and CSV
//! export. Tiers are attached here, on read, never persisted.

use crate::event::GlobalPlayerRating;
use crate::tier::tier_for;
use serde::Serialize;
use std::path::Path;

#[derive(Clone, Debug, Serialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub player_id: String,
    pub rating: f64,
    pub games_played: u32,
    pub last_delta: f64,
    pub tier: &'static str,
    pub tier_emoji: &'static str,
}

/// Ranks players by rating, highest first, with the player id as the stable
/// tie-break.
pub fn make_leaderboard(snapshots: &[GlobalPlayerRating]) -> Vec<LeaderboardRow> {
    let mut ordered: Vec<&GlobalPlayerRating> = snapshots.iter().collect();
    ordered.sort_unstable_by(|a, b| {
        b.current_rating
            .total_cmp(&a.current_rating)
            .then_with(|| a.player_id.cmp(&b.player_id))
    });

    ordered
        .into_iter()
        .enumerate()
        .map(|(i, snap)| {
            let tier = tier_for(snap.current_rating);
            LeaderboardRow {
                rank: i + 1,
                player_id: snap.player_id.clone(),
                rating: snap.current_rating,
                games_played: snap.total_games_played,
                last_delta: snap.last_delta,
                tier: tier.name,
                tier_emoji: tier.emoji,
            }
        })
        .collect()
}

pub fn log_leaderboard(rows: &[LeaderboardRow]) {
    if rows.is_empty() {
        tracing::info!("No rated players yet");
        return;
    }
    let mean = rows.iter().map(|r| r.rating).sum::<f64>() / rows.len() as f64;
    tracing::info!("Leaderboard ({} players, mean rating {:.1})", rows.len(), mean);
    for row in rows {
        tracing::info!(
            "{:3}. {} {:<20} {:8.2} ({} games, last {:+.2})",
            row.rank,
            row.tier_emoji,
            row.player_id,
            row.rating,
            row.games_played,
            row.last_delta,
        );
    }
}

pub fn write_csv(rows: &[LeaderboardRow], path: impl AsRef<Path>) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    rows.iter().try_for_each(|row| writer.serialize(row))?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn snapshot(player: &str, rating: f64) -> GlobalPlayerRating {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        GlobalPlayerRating {
            player_id: player.into(),
            current_rating: rating,
            total_games_played: 10,
            last_updated: now,
            peak_rating: rating,
            peak_rating_date: now,
            lowest_rating: rating,
            lowest_rating_date: now,
            last_delta: 1.5,
        }
    }

    #[test]
    fn ranks_by_rating_then_player_id() {
        let rows = make_leaderboard(&[
            snapshot("cora", 1008.0),
            snapshot("anna", 992.0),
            snapshot("beat", 1008.0),
        ]);
        let order: Vec<_> = rows.iter().map(|r| r.player_id.as_str()).collect();
        assert_eq!(order, ["beat", "cora", "anna"]);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[2].rank, 3);
    }

    #[test]
    fn rows_carry_the_derived_tier() {
        let rows = make_leaderboard(&[snapshot("anna", 1210.0)]);
        assert_eq!(rows[0].tier, "Diamond I");
    }
}
