//! Game configuration and the phase enum.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// Tunables for every room on this server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Pool split evenly across each faction's members at `begin`.
    pub team_starting_points: u64,

    /// Points a blackmailed player forfeits to the last traitor if they
    /// refuse to join.
    pub blackmail_penalty: u64,

    /// Ceiling on the number of traitors drafted at `begin`.
    pub max_traitors: usize,

    /// Minimum players needed to begin.
    pub min_players: usize,

    /// When a scheduled day is further away than this, the night is split
    /// into a night half and a discussion half.
    pub timed_mode_threshold: Duration,

    /// Delay between a resolved vote and the next nightfall.
    pub night_delay: Duration,

    /// Seed for each room's random source. `None` seeds from the OS.
    /// The room id is mixed in so rooms don't mirror each other.
    pub rng_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            team_starting_points: 1000,
            blackmail_penalty: 40,
            max_traitors: 3,
            min_players: 3,
            timed_mode_threshold: Duration::from_secs(4 * 60 * 60),
            night_delay: Duration::from_secs(12 * 60 * 60),
            rng_seed: None,
        }
    }
}

impl GameConfig {
    /// Smallest table the rules work with: one traitor, two faithful.
    pub const MIN_PLAYERS: usize = 3;

    /// Clamp out-of-range values so the config is safe to use.
    pub fn validated(mut self) -> Self {
        if self.min_players < Self::MIN_PLAYERS {
            tracing::warn!(
                min_players = self.min_players,
                floor = Self::MIN_PLAYERS,
                "min_players below floor, clamping"
            );
            self.min_players = Self::MIN_PLAYERS;
        }
        if self.max_traitors == 0 {
            tracing::warn!("max_traitors is 0, clamping to 1");
            self.max_traitors = 1;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Where a room is in its cycle.
///
/// ```text
/// Lobby ──begin──→ Night ──day──→ Day ──vote resolves + timer──→ Night → …
/// ```
///
/// A win ends the cycle from any phase; the room is then deleted, so
/// there is no terminal variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Lobby,
    Night,
    Day,
}

impl Phase {
    /// Returns `true` if players can still join.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Lobby)
    }

    /// Returns `true` once roles have been dealt.
    pub fn is_running(self) -> bool {
        matches!(self, Self::Night | Self::Day)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => write!(f, "LOBBY"),
            Self::Night => write!(f, "NIGHT"),
            Self::Day => write!(f, "DAY"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_config_default() {
        let config = GameConfig::default();
        assert_eq!(config.team_starting_points, 1000);
        assert_eq!(config.blackmail_penalty, 40);
        assert_eq!(config.max_traitors, 3);
        assert_eq!(config.night_delay, Duration::from_secs(43_200));
        assert!(config.rng_seed.is_none());
    }

    #[test]
    fn test_validated_clamps_floor_values() {
        let config = GameConfig {
            min_players: 1,
            max_traitors: 0,
            ..GameConfig::default()
        }
        .validated();
        assert_eq!(config.min_players, 3);
        assert_eq!(config.max_traitors, 1);
    }

    #[test]
    fn test_phase_predicates() {
        assert!(Phase::Lobby.is_joinable());
        assert!(!Phase::Night.is_joinable());
        assert!(Phase::Night.is_running());
        assert!(Phase::Day.is_running());
        assert!(!Phase::Lobby.is_running());
    }

    #[test]
    fn test_phase_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Phase::Night).unwrap(), r#""NIGHT""#);
        assert_eq!(Phase::Day.to_string(), "DAY");
    }
}
