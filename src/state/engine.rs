//! Types shared by the rule engines.
//!
//! Engines are pure: they take a game snapshot and a proposed move and
//! return either a [`MoveRejection`] or a [`Transition`] holding the next
//! snapshot and, when the move ended the game, a [`Completion`].

use super::lifecycle::InvalidTransition;
use super::room::{ParticipantId, Seat};

/// Why a proposed move was refused. A refused move never changes state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveRejection {
    #[error("Move is outside the board")]
    OutOfBounds,
    #[error("Game is already over")]
    GameOver,
    #[error("Waiting for players to join")]
    WaitingForPlayers,
    #[error("Not a player in this game")]
    NotAPlayer,
    #[error("It's not your turn")]
    WrongTurn,
    #[error("Move must be played in board {required}")]
    WrongBoard { required: usize },
    #[error("That board is already decided")]
    BoardLocked,
    #[error("Cell is already occupied")]
    CellOccupied,
    #[error("Line is already drawn")]
    LineDrawn,
    #[error(transparent)]
    Lifecycle(#[from] InvalidTransition),
}

/// Per-participant counter increments produced by a finished game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatDelta {
    pub participant: ParticipantId,
    pub played: u32,
    pub won: u32,
}

/// How a game ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameResult {
    /// A single winner
    Winner(ParticipantId),
    /// Tic-tac-toe draw
    Draw,
    /// Dots and Boxes: several players share the top score
    Tie(Vec<ParticipantId>),
}

impl GameResult {
    pub fn winner(&self) -> Option<&str> {
        match self {
            Self::Winner(id) => Some(id),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Winner(id) => serde_json::json!({"type": "winner", "winner": id}),
            Self::Draw => serde_json::json!({"type": "draw"}),
            Self::Tie(ids) => serde_json::json!({"type": "tie", "tied": ids}),
        }
    }
}

/// Terminal result plus the stat updates it triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub result: GameResult,
    pub stats: Vec<StatDelta>,
}

impl Completion {
    /// Every seated player gets a game played; the winner, if any, a win.
    pub fn settle(result: GameResult, seats: &[Seat]) -> Self {
        let stats = seats
            .iter()
            .map(|seat| StatDelta {
                participant: seat.id.clone(),
                played: 1,
                won: u32::from(result.winner() == Some(seat.id.as_str())),
            })
            .collect();
        Self { result, stats }
    }
}

/// An accepted move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<S> {
    /// Next snapshot
    pub state: S,
    /// Set when this move ended the game
    pub completion: Option<Completion>,
    /// Boxes claimed by this move (Dots and Boxes only)
    pub claimed: Vec<usize>,
}

impl<S> Transition<S> {
    /// Wrap the next snapshot, keeping the move's side effects.
    pub fn map<T>(self, f: impl FnOnce(S) -> T) -> Transition<T> {
        Transition {
            state: f(self.state),
            completion: self.completion,
            claimed: self.claimed,
        }
    }
}
