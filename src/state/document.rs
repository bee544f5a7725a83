//! Game documents.
//!
//! A document is the unit of shared state: one per game id, holding the
//! room, the board of whichever game is being played, and the timestamps
//! the store uses for expiry.

use chrono::{DateTime, Utc};

use super::dots::DotsGame;
use super::lifecycle::{ExpiryPolicy, GameStatus};
use super::room::{GameKind, Room};
use super::ultimate::UltimateGame;

/// Game identifier, assigned by the store.
pub type GameId = String;

/// The game a document holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Game {
    Ultimate(UltimateGame),
    Dots(DotsGame),
}

impl Game {
    pub fn kind(&self) -> GameKind {
        match self {
            Self::Ultimate(_) => GameKind::UltimateTicTacToe,
            Self::Dots(_) => GameKind::DotsAndBoxes,
        }
    }

    pub fn room(&self) -> &Room {
        match self {
            Self::Ultimate(game) => &game.room,
            Self::Dots(game) => &game.room,
        }
    }

    pub fn room_mut(&mut self) -> &mut Room {
        match self {
            Self::Ultimate(game) => &mut game.room,
            Self::Dots(game) => &mut game.room,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Ultimate(game) => game.to_json(),
            Self::Dots(game) => game.to_json(),
        }
    }
}

/// A stored game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameDocument {
    pub id: GameId,
    pub game: Game,
    pub created_at: DateTime<Utc>,
    /// Set when the game reached a terminal result
    pub finished_at: Option<DateTime<Utc>>,
    /// Deletion deadline, set together with `finished_at`
    pub expires_at: Option<DateTime<Utc>>,
}

impl GameDocument {
    pub fn new(id: GameId, game: Game, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            game,
            created_at,
            finished_at: None,
            expires_at: None,
        }
    }

    pub fn kind(&self) -> GameKind {
        self.game.kind()
    }

    pub fn status(&self) -> GameStatus {
        self.game.room().status
    }

    pub fn room(&self) -> &Room {
        self.game.room()
    }

    /// Same document holding a different game snapshot.
    pub fn with_game(&self, game: Game) -> Self {
        Self {
            id: self.id.clone(),
            game,
            created_at: self.created_at,
            finished_at: self.finished_at,
            expires_at: self.expires_at,
        }
    }

    /// Stamp the finish time and deletion deadline, once.
    pub fn mark_finished(&mut self, now: DateTime<Utc>, policy: &ExpiryPolicy) {
        if self.finished_at.is_none() {
            self.finished_at = Some(now);
            self.expires_at = Some(policy.deadline(now));
        }
    }

    /// Clear the deadline after a restart.
    pub fn clear_finish(&mut self) {
        self.finished_at = None;
        self.expires_at = None;
    }

    /// Check if the deletion deadline has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|deadline| ExpiryPolicy::is_due(deadline, now))
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = self.game.to_json();
        obj["game_id"] = serde_json::json!(self.id);
        obj["created_at"] = serde_json::json!(self.created_at);
        obj["finished_at"] = serde_json::json!(self.finished_at);
        obj["expires_at"] = serde_json::json!(self.expires_at);
        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> GameDocument {
        let game = Game::Dots(DotsGame::new(2, 2, 2).unwrap());
        GameDocument::new("game-1".to_string(), game, Utc::now())
    }

    #[test]
    fn test_document_new() {
        let doc = doc();
        assert_eq!(doc.kind(), GameKind::DotsAndBoxes);
        assert_eq!(doc.status(), GameStatus::Waiting);
        assert!(doc.expires_at.is_none());
    }

    #[test]
    fn test_mark_finished_once() {
        let mut doc = doc();
        let policy = ExpiryPolicy::new(chrono::Duration::seconds(5));
        let t0 = Utc::now();

        doc.mark_finished(t0, &policy);
        doc.mark_finished(t0 + chrono::Duration::seconds(3), &policy);

        assert_eq!(doc.finished_at, Some(t0));
        assert_eq!(doc.expires_at, Some(t0 + chrono::Duration::seconds(5)));
        assert!(!doc.is_expired(t0 + chrono::Duration::seconds(4)));
        assert!(doc.is_expired(t0 + chrono::Duration::seconds(5)));

        doc.clear_finish();
        assert!(!doc.is_expired(t0 + chrono::Duration::seconds(60)));
    }

    #[test]
    fn test_to_json() {
        let json = doc().to_json();
        assert_eq!(json["game_id"], "game-1");
        assert_eq!(json["game_type"], "dots-and-boxes");
        assert_eq!(json["grid_rows"], 2);
        assert!(json["expires_at"].is_null());
    }
}
