//! Player registry for one room.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use turncoat_protocol::{PlayerId, Role, TargetEntry};

use crate::GameError;

/// Whether a player is still in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Active,
    /// Voted out, murdered, or removed by the moderator. Permanent.
    Banished,
}

/// One participant in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// `None` until roles are dealt at `begin`.
    pub role: Option<Role>,
    pub status: Status,
    pub points: u64,
    /// Set when a faithful player accepted a recruit or blackmail offer.
    #[serde(default)]
    pub converted: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            role: None,
            status: Status::Active,
            points: 0,
            converted: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    pub fn is_active_as(&self, role: Role) -> bool {
        self.is_active() && self.role == Some(role)
    }
}

/// All players in a room, ordered by id.
///
/// Ordered storage keeps iteration (and therefore every seeded random
/// draw over it) deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster(BTreeMap<PlayerId, Player>);

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a player. Returns `false` if the id was already present.
    pub fn insert(&mut self, player: Player) -> bool {
        if self.0.contains_key(&player.id) {
            return false;
        }
        self.0.insert(player.id, player);
        true
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.0.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.0.get_mut(&id)
    }

    /// Like [`get`](Self::get) but reports a missing player as an error.
    pub fn require(&self, id: PlayerId) -> Result<&Player, GameError> {
        self.get(id).ok_or(GameError::NoSuchPlayer(id))
    }

    pub fn require_mut(&mut self, id: PlayerId) -> Result<&mut Player, GameError> {
        self.0.get_mut(&id).ok_or(GameError::NoSuchPlayer(id))
    }

    /// Looks up a player who must still be active.
    pub fn require_active(&self, id: PlayerId) -> Result<&Player, GameError> {
        let player = self.require(id)?;
        if !player.is_active() {
            return Err(GameError::NotActive(id));
        }
        Ok(player)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.0.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.0.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.0.values_mut()
    }

    pub fn ids(&self) -> Vec<PlayerId> {
        self.0.keys().copied().collect()
    }

    pub fn active(&self) -> impl Iterator<Item = &Player> {
        self.iter().filter(|p| p.is_active())
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    /// Active members of one faction.
    pub fn active_as(&self, role: Role) -> impl Iterator<Item = &Player> {
        self.iter().filter(move |p| p.is_active_as(role))
    }

    pub fn active_ids_as(&self, role: Role) -> Vec<PlayerId> {
        self.active_as(role).map(|p| p.id).collect()
    }

    pub fn count_active_as(&self, role: Role) -> usize {
        self.active_as(role).count()
    }

    /// Names of everyone who holds `role`, banished or not.
    pub fn names_as(&self, role: Role) -> Vec<String> {
        self.iter()
            .filter(|p| p.role == Some(role))
            .map(|p| p.name.clone())
            .collect()
    }

    /// Night-menu entries for the active members of `role`.
    pub fn targets_as(&self, role: Role) -> Vec<TargetEntry> {
        self.active_as(role)
            .map(|p| TargetEntry {
                player: p.id,
                name: p.name.clone(),
                points: p.points,
            })
            .collect()
    }

    /// Display name, falling back to the id for unknown players.
    pub fn name_of(&self, id: PlayerId) -> String {
        self.get(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}
