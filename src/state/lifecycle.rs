//! Game lifecycle state machine.
//!
//! Every game document moves forward through the same states and is deleted
//! by the store once its post-game grace period runs out.
//!
//! # State Diagram
//!
//! ```text
//! ┌─────────┐ capacity_reached ┌────────┐ terminal_result ┌──────────┐
//! │ Waiting │─────────────────▶│ Active │────────────────▶│ Finished │
//! └─────────┘                  └────────┘                 └────┬─────┘
//!                                   ▲                          │
//!                                   │ restart (tic-tac-toe)    │ grace period
//!                                   └──────────────────────────┤
//!                                                              ▼
//!                                                         (deleted)
//! ```

use std::fmt;

use chrono::{DateTime, Utc};

/// Lifecycle states of a game document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameStatus {
    /// Created, waiting for player seats to fill
    #[default]
    Waiting,
    /// All seats taken, moves accepted
    Active,
    /// Terminal result reached, awaiting deletion
    Finished,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Finished => "finished",
        }
    }

    /// Check if moves can be played.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Check if the game has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Apply an event, returning the next status or an error.
    pub fn apply(self, event: LifecycleEvent) -> Result<Self, InvalidTransition> {
        use GameStatus::*;
        use LifecycleEvent::*;

        let invalid = |reason: &'static str| InvalidTransition {
            from: self,
            event,
            reason,
        };

        match (self, event) {
            (Waiting, CapacityReached) => Ok(Active),
            (_, CapacityReached) => Err(invalid("Seats were already filled")),

            (Active, TerminalResult) => Ok(Finished),
            (Waiting, TerminalResult) => Err(invalid("Game has not started")),
            (Finished, TerminalResult) => Err(invalid("Game already finished")),

            (Finished, Restart) => Ok(Active),
            (_, Restart) => Err(invalid("Only a finished game can restart")),
        }
    }

    /// Apply an event in place.
    pub fn apply_mut(&mut self, event: LifecycleEvent) -> Result<(), InvalidTransition> {
        *self = self.apply(event)?;
        Ok(())
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The last player seat was taken
    CapacityReached,
    /// An engine detected a win or draw
    TerminalResult,
    /// The host reset a finished tic-tac-toe board
    Restart,
}

/// Error when a lifecycle transition is invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid transition from {from} via {event:?}: {reason}")]
pub struct InvalidTransition {
    pub from: GameStatus,
    pub event: LifecycleEvent,
    pub reason: &'static str,
}

/// When finished games are removed from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    grace: chrono::Duration,
}

impl ExpiryPolicy {
    pub fn new(grace: chrono::Duration) -> Self {
        Self { grace }
    }

    pub fn grace(&self) -> chrono::Duration {
        self.grace
    }

    /// Deletion deadline for a game that finished at `finished_at`.
    pub fn deadline(&self, finished_at: DateTime<Utc>) -> DateTime<Utc> {
        finished_at + self.grace
    }

    /// Check if a deadline has passed.
    pub fn is_due(deadline: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now >= deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_initial_status() {
        let status = GameStatus::default();
        assert_eq!(status, GameStatus::Waiting);
        assert!(!status.is_active());
        assert!(!status.is_terminal());
    }

    #[test]
    fn test_forward_flow() {
        let mut status = GameStatus::Waiting;

        status.apply_mut(LifecycleEvent::CapacityReached).unwrap();
        assert!(status.is_active());

        status.apply_mut(LifecycleEvent::TerminalResult).unwrap();
        assert!(status.is_terminal());

        status.apply_mut(LifecycleEvent::Restart).unwrap();
        assert_eq!(status, GameStatus::Active);
    }

    #[test]
    fn test_invalid_transitions() {
        let waiting = GameStatus::Waiting;
        assert!(waiting.apply(LifecycleEvent::TerminalResult).is_err());
        assert!(waiting.apply(LifecycleEvent::Restart).is_err());

        let active = GameStatus::Active;
        assert!(active.apply(LifecycleEvent::CapacityReached).is_err());
        assert!(active.apply(LifecycleEvent::Restart).is_err());

        let finished = GameStatus::Finished;
        let err = finished.apply(LifecycleEvent::TerminalResult).unwrap_err();
        assert_eq!(err.from, GameStatus::Finished);
        assert_eq!(err.reason, "Game already finished");
    }

    #[test]
    fn test_failed_apply_mut_keeps_status() {
        let mut status = GameStatus::Active;
        assert!(status.apply_mut(LifecycleEvent::CapacityReached).is_err());
        assert_eq!(status, GameStatus::Active);
    }

    #[test]
    fn test_display() {
        let err = GameStatus::Waiting
            .apply(LifecycleEvent::Restart)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid transition from waiting via Restart: Only a finished game can restart"
        );
    }

    #[test]
    fn test_expiry_deadline() {
        let policy = ExpiryPolicy::new(chrono::Duration::seconds(5));
        let finished = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let deadline = policy.deadline(finished);

        assert!(!ExpiryPolicy::is_due(deadline, finished));
        assert!(!ExpiryPolicy::is_due(
            deadline,
            finished + chrono::Duration::seconds(4)
        ));
        assert!(ExpiryPolicy::is_due(
            deadline,
            finished + chrono::Duration::seconds(5)
        ));
    }
}
