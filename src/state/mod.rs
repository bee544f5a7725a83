//! State management module for Boardroom.
//!
//! This module provides the rule engines and the shared game state:
//!
//! - `outcome` - Three-in-a-row detection for boards and sub-boards
//! - `ultimate` - Ultimate Tic-Tac-Toe rules
//! - `dots` - Dots and Boxes rules
//! - `room` - Seats, spectators and roles
//! - `lifecycle` - Game status machine and the post-game deletion deadline
//! - `document` / `store` - Versioned game documents and their subscribers
//! - `profile` - Player records, stats, leaderboard, friends
//! - `service` - The façade tying it all together
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                            GameService                                │
//! │                                                                       │
//! │  ┌───────────────────────┐          ┌─────────────────────────┐       │
//! │  │       GameStore        │          │     ProfileRegistry     │       │
//! │  │                        │          │                         │       │
//! │  │ game_id →              │  stats   │ player_id → Profile     │       │
//! │  │   (version, Document)  │ ───────▶ │ name → player_id        │       │
//! │  │ game_id → subscribers  │          │                         │       │
//! │  └───────────┬────────────┘          └─────────────────────────┘       │
//! │              │ read, step, commit at version                          │
//! │  ┌───────────▼───────────────────────────────────────────────────┐    │
//! │  │ GameDocument { Room, UltimateGame | DotsGame, expires_at }     │    │
//! │  │                                                                │    │
//! │  │   Waiting ──▶ Active ──▶ Finished ──▶ (swept)                  │    │
//! │  │                  ▲           │                                 │    │
//! │  │                  └─ restart ─┘                                 │    │
//! │  └────────────────────────────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use boardroom_state::state::{
//!     room::Identity,
//!     ultimate::UltimateGame,
//! };
//!
//! let mut game = UltimateGame::new()?;
//! game.room.join(&Identity::new("a", "Alice"), now)?;
//! game.room.join(&Identity::new("b", "Bob"), now)?;
//!
//! let transition = game.propose_move("a", 4, 4)?;
//! assert_eq!(transition.state.board.active_board(), Some(4));
//! ```

pub mod document;
pub mod dots;
pub mod engine;
pub mod lifecycle;
pub mod outcome;
pub mod profile;
pub mod room;
pub mod service;
pub mod store;
pub mod ultimate;

// Re-export commonly used types
pub use document::{Game, GameDocument, GameId};
pub use dots::{DotsBoard, DotsGame, Orientation};
pub use engine::{Completion, GameResult, MoveRejection, StatDelta, Transition};
pub use lifecycle::{ExpiryPolicy, GameStatus, InvalidTransition, LifecycleEvent};
pub use outcome::{evaluate, Mark, Outcome, Square};
pub use profile::{
    GameInvitation, LeaderboardEntry, PlayerProfile, ProfileError, ProfileRegistry,
};
pub use room::{GameKind, Identity, JoinOutcome, ParticipantId, Role, Room, RoomError, Seat};
pub use service::{ActiveGame, GameService, MoveReceipt, ServiceError};
pub use store::{GameStore, Snapshot, StoreError, StoreEvent};
pub use ultimate::{SubBoard, UltimateBoard, UltimateGame};
