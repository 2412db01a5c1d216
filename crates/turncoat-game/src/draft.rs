//! Traitor count and selection at `begin`.

use rand::RngCore;
use rand::seq::IndexedRandom;
use turncoat_protocol::PlayerId;

/// How many traitors a table of `players` gets.
///
/// Up to 5 players get one, up to 8 get two, larger tables get
/// `ceiling`. The ceiling also caps the smaller tiers, and there is
/// always at least one faithful player.
pub fn traitor_count(players: usize, ceiling: usize) -> usize {
    let tier = match players {
        0..=5 => 1,
        6..=8 => 2,
        _ => ceiling,
    };
    tier.min(ceiling).min(players.saturating_sub(1)).max(1)
}

/// Picks `count` distinct players uniformly at random, in roster order.
pub fn pick_traitors(rng: &mut dyn RngCore, players: &[PlayerId], count: usize) -> Vec<PlayerId> {
    let mut picked: Vec<PlayerId> = players.choose_multiple(rng, count).copied().collect();
    picked.sort();
    picked
}

/// Picks one player uniformly at random.
pub fn pick_one(rng: &mut dyn RngCore, players: &[PlayerId]) -> Option<PlayerId> {
    players.choose(rng).copied()
}
