//! Game service.
//!
//! The entry point a transport layer talks to. Every mutation follows the
//! same shape: read the current snapshot, run the rule engine on it, and
//! commit the result conditionally on the version that was read. When
//! another participant got there first the whole step is re-run on the
//! fresh snapshot, so decisions such as "is there still a free seat" are
//! never made on stale data.

use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use super::document::{Game, GameDocument, GameId};
use super::dots::{DotsGame, Orientation};
use super::engine::{Completion, MoveRejection, Transition};
use super::lifecycle::{ExpiryPolicy, GameStatus};
use super::profile::{GameInvitation, LeaderboardEntry, PlayerProfile, ProfileError, ProfileRegistry};
use super::room::{GameKind, Identity, Role, RoomError};
use super::store::{GameStore, Snapshot, StoreError, StoreEvent};
use super::ultimate::UltimateGame;
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, DotsSettings, EngineConfig};

/// Service errors.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Game not found: {0}")]
    NotFound(GameId),
    #[error("Move rejected: {0}")]
    Rejected(#[from] MoveRejection),
    #[error(transparent)]
    Room(#[from] RoomError),
    #[error("Game {game_id} is not a {expected} game")]
    WrongKind { game_id: GameId, expected: GameKind },
    #[error("Game {game_id} kept changing, gave up after {attempts} attempts")]
    Contended { game_id: GameId, attempts: u32 },
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

/// Outcome of an accepted move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReceipt {
    /// Document version written by the move
    pub version: u64,
    pub status: GameStatus,
    /// Set when the move ended the game
    pub completion: Option<Completion>,
    /// Boxes claimed by the move
    pub claimed: Vec<usize>,
}

/// A game a player is still seated in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveGame {
    pub game_id: GameId,
    pub kind: GameKind,
    pub status: GameStatus,
    pub players: usize,
    pub capacity: usize,
    pub created_at: DateTime<Utc>,
}

impl ActiveGame {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "game_id": self.game_id,
            "game_type": self.kind.as_str(),
            "status": self.status.as_str(),
            "players": self.players,
            "max_players": self.capacity,
            "created_at": self.created_at
        })
    }
}

/// What a transaction step wants done with the document it was given.
enum Step<T> {
    Write(GameDocument, T),
    Unchanged(T),
}

/// Game service - owns the store, the profiles and the clock.
#[derive(Debug)]
pub struct GameService {
    config: EngineConfig,
    expiry: ExpiryPolicy,
    clock: Arc<dyn Clock>,
    store: GameStore,
    profiles: Mutex<ProfileRegistry>,
}

impl GameService {
    /// Create a service on the wall clock.
    pub fn new(config: EngineConfig) -> Result<Self, ServiceError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self, ServiceError> {
        config.validate()?;
        Ok(Self {
            expiry: config.expiry_policy(),
            config,
            clock,
            store: GameStore::new(),
            profiles: Mutex::new(ProfileRegistry::new()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn profiles(&self) -> Result<MutexGuard<'_, ProfileRegistry>, ServiceError> {
        self.profiles
            .lock()
            .map_err(|_| ServiceError::Store(StoreError::Unavailable))
    }

    // ========================================================================
    // Players
    // ========================================================================

    #[instrument(skip(self, password))]
    pub fn register_player(&self, name: &str, password: &str) -> Result<Identity, ServiceError> {
        let identity = self.profiles()?.register(name, password, self.now())?;
        info!(player_id = %identity.id, "Player registered");
        Ok(identity)
    }

    #[instrument(skip(self, password))]
    pub fn login(&self, name: &str, password: &str) -> Result<Identity, ServiceError> {
        self.profiles()?
            .login(name, password)
            .inspect_err(|e| debug!(error = %e, "Login refused"))
            .map_err(ServiceError::from)
    }

    pub fn profile(&self, player_id: &str) -> Result<PlayerProfile, ServiceError> {
        self.profiles()?
            .get(player_id)
            .cloned()
            .ok_or_else(|| ProfileError::UnknownPlayer(player_id.to_string()).into())
    }

    /// Top players, as many as the config allows.
    pub fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, ServiceError> {
        Ok(self.profiles()?.leaderboard(self.config.leaderboard_size))
    }

    pub fn send_friend_request(&self, from: &str, to: &str) -> Result<(), ServiceError> {
        Ok(self.profiles()?.send_friend_request(from, to)?)
    }

    pub fn accept_friend_request(&self, me: &str, from: &str) -> Result<(), ServiceError> {
        Ok(self.profiles()?.accept_friend_request(me, from)?)
    }

    pub fn decline_friend_request(&self, me: &str, from: &str) -> Result<(), ServiceError> {
        Ok(self.profiles()?.decline_friend_request(me, from)?)
    }

    pub fn friends(&self, player_id: &str) -> Result<Vec<Identity>, ServiceError> {
        Ok(self.profiles()?.friends(player_id)?)
    }

    /// Invite a friend to a live game.
    #[instrument(skip(self))]
    pub fn invite(&self, game_id: &str, from: &str, to: &str) -> Result<(), ServiceError> {
        let kind = self.store.get(game_id, self.now())?.document.kind();
        self.profiles()?.invite(from, to, game_id, kind, self.now())?;
        info!("Invitation sent");
        Ok(())
    }

    /// Pending invitations, cleared once read.
    pub fn take_invitations(&self, player_id: &str) -> Result<Vec<GameInvitation>, ServiceError> {
        Ok(self.profiles()?.take_invitations(player_id)?)
    }

    // ========================================================================
    // Games
    // ========================================================================

    /// Open an Ultimate Tic-Tac-Toe game with the creator as X.
    #[instrument(skip(self, creator), fields(creator = %creator.id))]
    pub fn create_ultimate(&self, creator: &Identity) -> Result<Snapshot, ServiceError> {
        self.create(Game::Ultimate(UltimateGame::new()?), creator)
    }

    /// Open a Dots and Boxes game with the creator in the first seat.
    #[instrument(skip(self, creator), fields(creator = %creator.id))]
    pub fn create_dots(
        &self,
        creator: &Identity,
        settings: DotsSettings,
    ) -> Result<Snapshot, ServiceError> {
        self.config.dots.check(&settings)?;
        let game = DotsGame::new(settings.rows, settings.cols, settings.max_players)?;
        self.create(Game::Dots(game), creator)
    }

    /// Open a Dots and Boxes game at the configured default size.
    #[instrument(skip(self, creator), fields(creator = %creator.id))]
    pub fn create_dots_default(&self, creator: &Identity) -> Result<Snapshot, ServiceError> {
        self.create_dots(creator, self.config.dots.default_settings())
    }

    fn create(&self, mut game: Game, creator: &Identity) -> Result<Snapshot, ServiceError> {
        let now = self.now();
        game.room_mut().join(creator, now)?;
        let id = self.store.allocate_id()?;
        Ok(self.store.insert(GameDocument::new(id, game, now))?)
    }

    pub fn get(&self, game_id: &str) -> Result<Snapshot, ServiceError> {
        Ok(self.store.get(game_id, self.now())?)
    }

    /// Watch a game; the current document arrives first.
    pub fn subscribe(&self, game_id: &str) -> Result<Receiver<StoreEvent>, ServiceError> {
        Ok(self.store.subscribe(game_id, self.now())?)
    }

    /// Enter a game as a player if a seat is free, otherwise as a spectator.
    #[instrument(skip(self, identity), fields(participant = %identity.id))]
    pub fn join(&self, game_id: &str, identity: &Identity) -> Result<Role, ServiceError> {
        let (_, role) = self.transact(game_id, |doc, now| {
            let mut next = doc.clone();
            let outcome = next.game.room_mut().join(identity, now)?;
            Ok(if outcome.changed {
                Step::Write(next, outcome.role)
            } else {
                Step::Unchanged(outcome.role)
            })
        })?;
        info!(role = ?role, "Joined game");
        Ok(role)
    }

    /// Place a mark in an Ultimate Tic-Tac-Toe game.
    #[instrument(skip(self))]
    pub fn propose_move(
        &self,
        game_id: &str,
        actor: &str,
        sub_board: usize,
        cell: usize,
    ) -> Result<MoveReceipt, ServiceError> {
        self.play(game_id, |game| match game {
            Game::Ultimate(game) => Ok(game
                .propose_move(actor, sub_board, cell)?
                .map(Game::Ultimate)),
            Game::Dots(_) => Err(wrong_kind(game_id, GameKind::UltimateTicTacToe)),
        })
    }

    /// Draw a line in a Dots and Boxes game.
    #[instrument(skip(self))]
    pub fn propose_line(
        &self,
        game_id: &str,
        actor: &str,
        orientation: Orientation,
        row: usize,
        col: usize,
    ) -> Result<MoveReceipt, ServiceError> {
        self.play(game_id, |game| match game {
            Game::Dots(game) => Ok(game
                .propose_line(actor, orientation, row, col)?
                .map(Game::Dots)),
            Game::Ultimate(_) => Err(wrong_kind(game_id, GameKind::DotsAndBoxes)),
        })
    }

    /// Start a finished Ultimate game over with the same players.
    #[instrument(skip(self))]
    pub fn restart(&self, game_id: &str, actor: &str) -> Result<u64, ServiceError> {
        let (version, ()) = self.transact(game_id, |doc, _| {
            let Game::Ultimate(game) = &doc.game else {
                return Err(wrong_kind(game_id, GameKind::UltimateTicTacToe));
            };
            let mut next = doc.with_game(Game::Ultimate(game.restart(actor)?));
            next.clear_finish();
            Ok(Step::Write(next, ()))
        })?;
        info!(version, "Game restarted");
        Ok(version)
    }

    /// Delete games whose post-game grace period is over.
    pub fn sweep_expired(&self) -> Result<Vec<GameId>, ServiceError> {
        Ok(self.store.sweep_expired(self.now())?)
    }

    /// Unfinished games where the player holds a seat, newest first.
    pub fn active_games_for(&self, player_id: &str) -> Result<Vec<ActiveGame>, ServiceError> {
        let mut games: Vec<ActiveGame> = self
            .store
            .snapshots(self.now())?
            .into_iter()
            .map(|s| s.document)
            .filter(|doc| !doc.status().is_terminal() && doc.room().is_player(player_id))
            .map(|doc| ActiveGame {
                kind: doc.kind(),
                status: doc.status(),
                players: doc.room().player_count(),
                capacity: doc.room().capacity(),
                created_at: doc.created_at,
                game_id: doc.id,
            })
            .collect();

        games.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.game_id.cmp(&a.game_id))
        });
        games.truncate(self.config.active_games_limit);
        Ok(games)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Run a rule-engine step and commit it, stamping expiry and recording
    /// stats when the move ends the game.
    fn play(
        &self,
        game_id: &str,
        mut step: impl FnMut(&Game) -> Result<Transition<Game>, ServiceError>,
    ) -> Result<MoveReceipt, ServiceError> {
        let policy = self.expiry;
        let (version, receipt) = self
            .transact(game_id, |doc, now| {
                let Transition {
                    state,
                    completion,
                    claimed,
                } = step(&doc.game)?;

                let mut next = doc.with_game(state);
                if completion.is_some() {
                    next.mark_finished(now, &policy);
                }
                let receipt = MoveReceipt {
                    version: 0,
                    status: next.status(),
                    completion,
                    claimed,
                };
                Ok(Step::Write(next, receipt))
            })
            .inspect_err(|e| debug!(error = %e, "Move not applied"))?;

        // Only the winning commit gets here, so stats land exactly once.
        if let Some(completion) = &receipt.completion {
            self.profiles()?.apply_all(&completion.stats);
            info!(game_id, result = ?completion.result, "Game finished");
        }

        Ok(MoveReceipt { version, ..receipt })
    }

    /// Read, compute, conditionally write; retry on version conflicts.
    fn transact<T>(
        &self,
        game_id: &str,
        mut step: impl FnMut(&GameDocument, DateTime<Utc>) -> Result<Step<T>, ServiceError>,
    ) -> Result<(u64, T), ServiceError> {
        let attempts = self.config.max_commit_retries;

        for attempt in 1..=attempts {
            let now = self.now();
            let snapshot = self.store.get(game_id, now)?;
            match step(&snapshot.document, now)? {
                Step::Unchanged(value) => return Ok((snapshot.version, value)),
                Step::Write(document, value) => {
                    match self.store.commit(game_id, snapshot.version, document, now) {
                        Ok(committed) => return Ok((committed.version, value)),
                        Err(StoreError::Conflict { actual, .. }) => {
                            debug!(game_id, attempt, actual, "Commit conflict, retrying");
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }

        warn!(game_id, attempts, "Giving up on contended game");
        Err(ServiceError::Contended {
            game_id: game_id.to_string(),
            attempts,
        })
    }
}

fn wrong_kind(game_id: &str, expected: GameKind) -> ServiceError {
    ServiceError::WrongKind {
        game_id: game_id.to_string(),
        expected,
    }
}
