//! Boardroom State Library
//!
//! This crate provides the game rules and shared room state for a two-game
//! board-game site: Ultimate Tic-Tac-Toe and Dots and Boxes.
//!
//! # Overview
//!
//! The state module provides:
//!
//! - **Rule Engines** - Pure functions from a snapshot and a proposed move to
//!   either the next snapshot or an explicit rejection reason.
//!
//! - **Rooms** - Seats, spectators and roles. A participant's role is fixed
//!   the first time they arrive.
//!
//! - **Lifecycle** - Waiting, active and finished, with validated transitions
//!   and a deletion deadline once a game ends.
//!
//! - **Game Store** - Versioned documents with conditional commits and
//!   change subscriptions.
//!
//! - **Profiles** - Registration, stats, leaderboard, friends and invitations.
//!
//! # Design Principles
//!
//! 1. **Engines never mutate** - A move produces a new snapshot; nothing is
//!    written until the store accepts it at the version it was computed from.
//!
//! 2. **State machines validate transitions** - Invalid status changes are
//!    rejected with clear errors.
//!
//! 3. **No networking** - This crate is pure state, no WebSocket or HTTP.
//!
//! 4. **Serialization-ready** - All snapshots can be converted to JSON for clients.
//!
//! # Example
//!
//! ```rust
//! use boardroom_state::{EngineConfig, GameService, GameStatus, Identity, Role};
//!
//! let service = GameService::new(EngineConfig::default()).unwrap();
//!
//! let alice = service.register_player("alice", "secret").unwrap();
//! let bob = service.register_player("bob", "hunter2").unwrap();
//!
//! // Alice opens a game and is seated as X.
//! let game_id = service.create_ultimate(&alice).unwrap().document.id;
//!
//! // Bob takes the last seat; the game starts.
//! assert_eq!(service.join(&game_id, &bob).unwrap(), Role::Player(1));
//!
//! let receipt = service.propose_move(&game_id, &alice.id, 4, 4).unwrap();
//! assert_eq!(receipt.status, GameStatus::Active);
//!
//! // Anyone arriving now watches.
//! let carol = Identity::new("carol", "Carol");
//! assert_eq!(service.join(&game_id, &carol).unwrap(), Role::Spectator);
//! ```

pub mod clock;
pub mod config;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, DotsLimits, DotsSettings, EngineConfig};

// Re-export everything from state module at crate root
pub use state::*;
