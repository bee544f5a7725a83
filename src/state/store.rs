//! Versioned game store.
//!
//! In-process stand-in for the hosted document database. Every document
//! carries a version that increments on each write; writes are conditional
//! on the version the writer read, so two participants racing on the same
//! snapshot cannot both succeed. Subscribers receive the full document on
//! every change.

use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::document::{GameDocument, GameId};

/// A document at a specific version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub version: u64,
    pub document: GameDocument,
}

impl Snapshot {
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = self.document.to_json();
        obj["version"] = serde_json::json!(self.version);
        obj
    }
}

/// Change notification pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Updated(Snapshot),
    Deleted(GameId),
}

/// Store errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Game not found: {0}")]
    NotFound(GameId),
    #[error("Game already exists: {0}")]
    AlreadyExists(GameId),
    #[error("Game {id} changed: expected version {expected}, found {actual}")]
    Conflict { id: GameId, expected: u64, actual: u64 },
    #[error("Game store unavailable")]
    Unavailable,
}

#[derive(Debug, Default)]
struct StoreInner {
    games: HashMap<GameId, Snapshot>,
    subscribers: HashMap<GameId, Vec<Sender<StoreEvent>>>,
    next_id: u64,
}

impl StoreInner {
    /// Deliver an event, dropping subscribers that hung up.
    fn notify(&mut self, id: &str, event: StoreEvent) {
        if let Some(senders) = self.subscribers.get_mut(id) {
            senders.retain(|tx| tx.send(event.clone()).is_ok());
            if senders.is_empty() {
                self.subscribers.remove(id);
            }
        }
    }

    /// Remove a game and tell its subscribers.
    fn remove(&mut self, id: &str) -> Option<Snapshot> {
        let snapshot = self.games.remove(id)?;
        self.notify(id, StoreEvent::Deleted(id.to_string()));
        self.subscribers.remove(id);
        Some(snapshot)
    }

    /// Get a game that is still within its deadline. A game found past its
    /// deadline is deleted on the spot.
    fn live(&mut self, id: &str, now: DateTime<Utc>) -> Result<&mut Snapshot, StoreError> {
        let expired = self
            .games
            .get(id)
            .is_some_and(|s| s.document.is_expired(now));
        if expired {
            self.remove(id);
            info!(game_id = id, "Expired game deleted");
        }
        self.games
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

/// Game store - tracks all live game documents.
///
/// Reads take the caller's `now`: a document past its deletion deadline is
/// never returned or written, whether or not a sweep has run.
#[derive(Debug, Default)]
pub struct GameStore {
    inner: Mutex<StoreInner>,
}

impl GameStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreInner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Unavailable)
    }

    /// Reserve a fresh game id.
    pub fn allocate_id(&self) -> Result<GameId, StoreError> {
        let mut inner = self.lock()?;
        inner.next_id += 1;
        Ok(format!("game-{:06}", inner.next_id))
    }

    /// Add a new document at version 1.
    pub fn insert(&self, document: GameDocument) -> Result<Snapshot, StoreError> {
        let mut inner = self.lock()?;
        if inner.games.contains_key(&document.id) {
            return Err(StoreError::AlreadyExists(document.id));
        }

        let snapshot = Snapshot {
            version: 1,
            document,
        };
        let id = snapshot.document.id.clone();
        inner.games.insert(id.clone(), snapshot.clone());
        info!(game_id = %id, kind = %snapshot.document.kind(), "Game created");
        Ok(snapshot)
    }

    /// Get the current snapshot of a game.
    pub fn get(&self, id: &str, now: DateTime<Utc>) -> Result<Snapshot, StoreError> {
        let mut inner = self.lock()?;
        let snapshot = inner.live(id, now)?.clone();
        Ok(snapshot)
    }

    /// Write a document if it is still at `expected_version`.
    pub fn commit(
        &self,
        id: &str,
        expected_version: u64,
        document: GameDocument,
        now: DateTime<Utc>,
    ) -> Result<Snapshot, StoreError> {
        let mut inner = self.lock()?;
        let current = inner.live(id, now)?;

        if current.version != expected_version {
            debug!(
                game_id = id,
                expected = expected_version,
                actual = current.version,
                "Stale write rejected"
            );
            return Err(StoreError::Conflict {
                id: id.to_string(),
                expected: expected_version,
                actual: current.version,
            });
        }

        current.version += 1;
        current.document = document;
        let snapshot = current.clone();
        inner.notify(id, StoreEvent::Updated(snapshot.clone()));
        Ok(snapshot)
    }

    /// Remove a game.
    pub fn delete(&self, id: &str) -> Result<Snapshot, StoreError> {
        self.lock()?
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Watch a game. The current snapshot is delivered immediately.
    pub fn subscribe(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Receiver<StoreEvent>, StoreError> {
        let mut inner = self.lock()?;
        let snapshot = inner.live(id, now)?.clone();

        let (tx, rx) = channel();
        // The receiver is still in hand, so this send cannot fail.
        let _ = tx.send(StoreEvent::Updated(snapshot));
        inner.subscribers.entry(id.to_string()).or_default().push(tx);
        Ok(rx)
    }

    /// Delete every game whose deletion deadline has passed.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Result<Vec<GameId>, StoreError> {
        let mut inner = self.lock()?;
        let expired: Vec<GameId> = inner
            .games
            .iter()
            .filter(|(_, s)| s.document.is_expired(now))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            inner.remove(id);
            info!(game_id = %id, "Expired game deleted");
        }

        Ok(expired)
    }

    /// Snapshots of all games still within their deadline.
    pub fn snapshots(&self, now: DateTime<Utc>) -> Result<Vec<Snapshot>, StoreError> {
        Ok(self
            .lock()?
            .games
            .values()
            .filter(|s| !s.document.is_expired(now))
            .cloned()
            .collect())
    }

    /// Count stored games, expired or not.
    pub fn count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.games.len())
    }
}

#[cfg(test)]
impl GameStore {
    /// Leave the lock poisoned, as a writer that panicked mid-update would.
    pub(crate) fn poison(&self) {
        std::thread::scope(|s| {
            let writer = s.spawn(|| {
                let _guard = self.inner.lock();
                panic!("writer crashed while holding the store");
            });
            assert!(writer.join().is_err());
        });
    }
}
