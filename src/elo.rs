//! The rating model: classical team Elo driven by the striche margin instead
//! of win/loss. One calculator, parameterized by `EloConfig`; the historical
//! one-off backfill formulas all reduce to this with different presets.

use crate::config::{ConfigError, EloConfig};
use crate::event::{GameEvent, PlayerId, Team};
use std::collections::BTreeMap;

/// One player's accumulator entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerRating {
    pub rating: f64,
    pub games_played: u32,
}

/// Process-local rating accumulator, threaded through the fold over the
/// ordered event sequence. Never persisted; the ledger entries it produces
/// are the durable record. A `BTreeMap` keeps iteration deterministic.
#[derive(Clone, Debug, Default)]
pub struct RatingState {
    ratings: BTreeMap<PlayerId, PlayerRating>,
}

impl RatingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, player_id: &str) -> Option<&PlayerRating> {
        self.ratings.get(player_id)
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlayerId, &PlayerRating)> {
        self.ratings.iter()
    }

    /// Preloads a player's standing, e.g. from the existing ledger before an
    /// incremental run continues where the history left off.
    pub fn seed(&mut self, player_id: PlayerId, rating: f64, games_played: u32) {
        self.ratings
            .insert(player_id, PlayerRating { rating, games_played });
    }

    /// Current rating, creating the player at `default_rating` on first sight.
    fn resolve(&mut self, player_id: &PlayerId, default_rating: f64) -> f64 {
        self.ratings
            .entry(player_id.clone())
            .or_insert(PlayerRating { rating: default_rating, games_played: 0 })
            .rating
    }

    fn bump(&mut self, player_id: &str, delta: f64) {
        let entry = self
            .ratings
            .get_mut(player_id)
            .expect("player resolved before bump");
        entry.rating += delta;
        entry.games_played += 1;
    }
}

/// One player's movement from one event.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerUpdate {
    pub player_id: PlayerId,
    pub team: Team,
    pub rating_before: f64,
    pub rating_after: f64,
    pub delta: f64,
}

/// Everything one `apply` call computed, enough to build ledger entries and
/// operator previews without touching the state again.
#[derive(Clone, Debug)]
pub struct GameUpdate {
    pub team_rating_top: f64,
    pub team_rating_bottom: f64,
    pub expected_top: f64,
    pub actual_top: f64,
    /// Team-level delta; each top player gets half of it, each bottom player
    /// the negated half.
    pub delta: f64,
    pub players: Vec<PlayerUpdate>,
}

#[derive(Clone, Debug)]
pub struct EloCalculator {
    config: EloConfig,
}

impl EloCalculator {
    /// Validates the constants up front: a bad config must abort before any
    /// event is processed.
    pub fn new(config: EloConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EloConfig {
        &self.config
    }

    /// Probability that a team rated `rating_a` beats one rated `rating_b`.
    pub fn expected_score(&self, rating_a: f64, rating_b: f64) -> f64 {
        1.0 / (1.0 + 10f64.powf((rating_b - rating_a) / self.config.scale))
    }

    /// Achieved score of the top team: its share of all striche. A 0–0 game
    /// carries no information and scores 0.5.
    pub fn striche_score(striche_top: u32, striche_bottom: u32) -> f64 {
        let total = striche_top + striche_bottom;
        if total == 0 {
            return 0.5;
        }
        f64::from(striche_top) / f64::from(total)
    }

    /// Applies one event to the state, in sequence order. Both teammates
    /// receive the identical `±delta/2`; the event's four updates sum to zero.
    pub fn apply(&self, state: &mut RatingState, event: &GameEvent) -> GameUpdate {
        let team_average = |state: &mut RatingState, team: Team| -> f64 {
            let members: Vec<&PlayerId> = event.team_members(team).collect();
            let sum: f64 = members
                .iter()
                .map(|id| state.resolve(id, self.config.default_rating))
                .sum();
            sum / members.len() as f64
        };
        let team_rating_top = team_average(state, Team::Top);
        let team_rating_bottom = team_average(state, Team::Bottom);

        let expected_top = self.expected_score(team_rating_top, team_rating_bottom);
        let actual_top =
            Self::striche_score(event.outcome.striche_top, event.outcome.striche_bottom);
        let delta = self.config.k * (actual_top - expected_top);

        let players = event
            .players()
            .iter()
            .map(|p| {
                let player_delta = match p.team {
                    Team::Top => delta / 2.0,
                    Team::Bottom => -delta / 2.0,
                };
                let rating_before = state.resolve(&p.player_id, self.config.default_rating);
                state.bump(&p.player_id, player_delta);
                PlayerUpdate {
                    player_id: p.player_id.clone(),
                    team: p.team,
                    rating_before,
                    rating_after: rating_before + player_delta,
                    delta: player_delta,
                }
            })
            .collect();

        GameUpdate {
            team_rating_top,
            team_rating_bottom,
            expected_top,
            actual_top,
            delta,
            players,
        }
    }
}
