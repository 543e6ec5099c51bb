//! Cosmetic tier ladder. Purely derived from the numeric rating; nothing here
//! feeds back into the rating itself and nothing is stored.

const NUM_TIERS: usize = 15;
const TIER_BOUND: [f64; NUM_TIERS] = [
    f64::NEG_INFINITY,
    750.,
    800.,
    850.,
    900.,
    950.,
    1000.,
    1050.,
    1100.,
    1150.,
    1200.,
    1250.,
    1300.,
    1350.,
    1400.,
];
const TIER_NAME: [&str; NUM_TIERS] = [
    "Egg",
    "Duck",
    "Chick",
    "Rooster",
    "Sprout",
    "Clover",
    "Student",
    "Bronze",
    "Silver",
    "Gold",
    "Diamond I",
    "Diamond II",
    "Master",
    "Grandmaster",
    "Legend",
];
const TIER_EMOJI: [&str; NUM_TIERS] = [
    "🥚", "🦆", "🐥", "🐓", "🌱", "🍀", "🎓", "🥉", "🥈", "🥇", "💍", "💎", "🎖️", "🏆", "👑",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tier {
    pub name: &'static str,
    pub emoji: &'static str,
}

/// Maps a rating to its tier: inclusive lower bounds, most exclusive tier
/// checked first, with the bottom tier catching everything below the ladder.
pub fn tier_for(rating: f64) -> Tier {
    let idx = (0..NUM_TIERS)
        .rev()
        .find(|&i| rating >= TIER_BOUND[i])
        .unwrap_or(0);
    Tier { name: TIER_NAME[idx], emoji: TIER_EMOJI[idx] }
}
