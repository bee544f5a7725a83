//! Room membership and role assignment.
//!
//! A room is the participant side of a game document: the ordered player
//! seats, the spectators, and the lifecycle status. Roles are decided once,
//! when a participant first arrives, and stored alongside the seats.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};

use super::lifecycle::{GameStatus, InvalidTransition, LifecycleEvent};

/// Stable participant identifier supplied by the identity provider.
pub type ParticipantId = String;

/// Seats in an Ultimate Tic-Tac-Toe room.
pub const ULTIMATE_CAPACITY: usize = 2;

/// Which game a room is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameKind {
    UltimateTicTacToe,
    DotsAndBoxes,
}

impl GameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UltimateTicTacToe => "ultimate-tictactoe",
            Self::DotsAndBoxes => "dots-and-boxes",
        }
    }

    /// Symbol shown for the player in `slot`.
    pub fn symbol_for_slot(&self, slot: usize) -> String {
        match self {
            Self::UltimateTicTacToe => match slot {
                0 => "X".to_string(),
                _ => "O".to_string(),
            },
            Self::DotsAndBoxes => (slot + 1).to_string(),
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Participant credential from the identity provider. Treated as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub id: ParticipantId,
    pub display_name: String,
}

impl Identity {
    pub fn new(id: impl Into<ParticipantId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// A participant's role in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Seated player, by slot (0 = first to join)
    Player(usize),
    /// Read-only observer
    Spectator,
}

impl Role {
    pub fn is_player(&self) -> bool {
        matches!(self, Self::Player(_))
    }

    pub fn slot(&self) -> Option<usize> {
        match self {
            Self::Player(slot) => Some(*slot),
            Self::Spectator => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Player(slot) => serde_json::json!({"role": "player", "slot": slot}),
            Self::Spectator => serde_json::json!({"role": "spectator"}),
        }
    }
}

/// An occupied player seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub id: ParticipantId,
    pub display_name: String,
    pub symbol: String,
    pub joined_at: DateTime<Utc>,
}

impl Seat {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.display_name,
            "symbol": self.symbol
        })
    }
}

/// A spectator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spectator {
    pub id: ParticipantId,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
}

/// Result of a join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    pub role: Role,
    /// Whether the room was modified (false for returning participants)
    pub changed: bool,
}

/// Room errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("Participant id must not be empty")]
    MissingIdentity,
    #[error("Only the first player can do that")]
    NotHost,
    #[error("Room capacity {0} is out of range")]
    InvalidCapacity(usize),
    #[error(transparent)]
    Lifecycle(#[from] InvalidTransition),
}

/// Room state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// Game being played
    pub kind: GameKind,

    /// Maximum player seats
    capacity: usize,

    /// Player seats in join order
    seats: Vec<Seat>,

    /// Spectators in arrival order
    spectators: Vec<Spectator>,

    /// Role of every participant, fixed at first arrival
    roles: HashMap<ParticipantId, Role>,

    /// Lifecycle status
    pub status: GameStatus,
}

impl Room {
    /// Create an empty room.
    pub fn new(kind: GameKind, capacity: usize) -> Result<Self, RoomError> {
        if capacity < 2 || (kind == GameKind::UltimateTicTacToe && capacity != ULTIMATE_CAPACITY) {
            return Err(RoomError::InvalidCapacity(capacity));
        }

        Ok(Self {
            kind,
            capacity,
            seats: Vec::new(),
            spectators: Vec::new(),
            roles: HashMap::new(),
            status: GameStatus::Waiting,
        })
    }

    /// Assign a role to an arriving participant.
    ///
    /// Returning participants keep the role they were given. Newcomers take
    /// the next seat while the room is waiting and not full; filling the last
    /// seat activates the room. Everyone else spectates.
    pub fn join(&mut self, identity: &Identity, now: DateTime<Utc>) -> Result<JoinOutcome, RoomError> {
        if identity.id.is_empty() {
            return Err(RoomError::MissingIdentity);
        }

        if let Some(role) = self.roles.get(&identity.id) {
            return Ok(JoinOutcome {
                role: *role,
                changed: false,
            });
        }

        let role = if self.status == GameStatus::Waiting && !self.is_full() {
            let slot = self.seats.len();
            self.seats.push(Seat {
                id: identity.id.clone(),
                display_name: identity.display_name.clone(),
                symbol: self.kind.symbol_for_slot(slot),
                joined_at: now,
            });
            if self.is_full() {
                self.status.apply_mut(LifecycleEvent::CapacityReached)?;
            }
            Role::Player(slot)
        } else {
            self.spectators.push(Spectator {
                id: identity.id.clone(),
                display_name: identity.display_name.clone(),
                joined_at: now,
            });
            Role::Spectator
        };

        self.roles.insert(identity.id.clone(), role);
        Ok(JoinOutcome {
            role,
            changed: true,
        })
    }

    /// Get the stored role of a participant.
    pub fn role_of(&self, id: &str) -> Option<Role> {
        self.roles.get(id).copied()
    }

    /// Get the seat in a slot.
    pub fn seat(&self, slot: usize) -> Option<&Seat> {
        self.seats.get(slot)
    }

    /// Get a participant's slot and seat.
    pub fn seat_of(&self, id: &str) -> Option<(usize, &Seat)> {
        let slot = self.role_of(id)?.slot()?;
        self.seats.get(slot).map(|seat| (slot, seat))
    }

    /// First seat. The host may restart a finished game.
    pub fn host(&self) -> Option<&Seat> {
        self.seats.first()
    }

    pub fn is_host(&self, id: &str) -> bool {
        self.host().is_some_and(|seat| seat.id == id)
    }

    pub fn is_player(&self, id: &str) -> bool {
        self.role_of(id).is_some_and(|role| role.is_player())
    }

    pub fn is_spectator(&self, id: &str) -> bool {
        self.role_of(id) == Some(Role::Spectator)
    }

    /// Player seats in slot order.
    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn spectators(&self) -> &[Spectator] {
        &self.spectators
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn player_count(&self) -> usize {
        self.seats.len()
    }

    pub fn spectator_count(&self) -> usize {
        self.spectators.len()
    }

    pub fn is_full(&self) -> bool {
        self.seats.len() >= self.capacity
    }

    pub fn to_json(&self) -> serde_json::Value {
        let players: Vec<serde_json::Value> = self.seats.iter().map(Seat::to_json).collect();
        let spectators: Vec<&str> = self.spectators.iter().map(|s| s.id.as_str()).collect();

        serde_json::json!({
            "game_type": self.kind.as_str(),
            "status": self.status.as_str(),
            "max_players": self.capacity,
            "players": players,
            "spectators": spectators
        })
    }
}
