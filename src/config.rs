//! Engine configuration.
//!
//! Every setting has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! deletion_grace_secs = 5
//! max_commit_retries = 8
//! leaderboard_size = 10
//!
//! [dots]
//! min_players = 2
//! max_players = 10
//! min_grid = 2
//! max_grid = 15
//! ```

use serde::Deserialize;

use crate::state::lifecycle::ExpiryPolicy;

/// Default delay between a game finishing and its deletion.
pub const DEFAULT_DELETION_GRACE_SECS: u64 = 5;

/// Longest accepted deletion delay (one day).
pub const MAX_DELETION_GRACE_SECS: u64 = 86_400;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
}

impl ConfigError {
    fn check(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), Self> {
        if value < min || value > max {
            return Err(Self::OutOfRange {
                field,
                value,
                min,
                max,
            });
        }
        Ok(())
    }
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds a finished game stays readable before deletion
    pub deletion_grace_secs: u64,
    /// Attempts at an optimistic commit before giving up
    pub max_commit_retries: u32,
    /// Rows returned by the leaderboard
    pub leaderboard_size: usize,
    /// Rows returned when listing a player's open games
    pub active_games_limit: usize,
    pub dots: DotsLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deletion_grace_secs: DEFAULT_DELETION_GRACE_SECS,
            max_commit_retries: 8,
            leaderboard_size: 10,
            active_games_limit: 20,
            dots: DotsLimits::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check(
            "deletion_grace_secs",
            self.deletion_grace_secs,
            0,
            MAX_DELETION_GRACE_SECS,
        )?;
        ConfigError::check("max_commit_retries", self.max_commit_retries.into(), 1, 1_000)?;
        ConfigError::check("leaderboard_size", self.leaderboard_size as u64, 1, 1_000)?;
        ConfigError::check("active_games_limit", self.active_games_limit as u64, 1, 1_000)?;
        self.dots.validate()
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        let secs = self.deletion_grace_secs.min(MAX_DELETION_GRACE_SECS) as i64;
        ExpiryPolicy::new(chrono::Duration::seconds(secs))
    }
}

/// Bounds for Dots and Boxes game creation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DotsLimits {
    pub min_players: usize,
    pub max_players: usize,
    pub min_grid: usize,
    pub max_grid: usize,
    pub default_rows: usize,
    pub default_cols: usize,
}

impl Default for DotsLimits {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 10,
            min_grid: 2,
            max_grid: 15,
            default_rows: 4,
            default_cols: 4,
        }
    }
}

impl DotsLimits {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check("dots.min_players", self.min_players as u64, 2, 100)?;
        ConfigError::check(
            "dots.max_players",
            self.max_players as u64,
            self.min_players as u64,
            100,
        )?;
        ConfigError::check("dots.min_grid", self.min_grid as u64, 1, 100)?;
        ConfigError::check("dots.max_grid", self.max_grid as u64, self.min_grid as u64, 100)?;
        self.check(&self.default_settings())
    }

    /// Settings for a game created without explicit choices.
    pub fn default_settings(&self) -> DotsSettings {
        DotsSettings {
            rows: self.default_rows,
            cols: self.default_cols,
            max_players: self.min_players,
        }
    }

    /// Check requested game settings against the limits.
    pub fn check(&self, settings: &DotsSettings) -> Result<(), ConfigError> {
        let (min_grid, max_grid) = (self.min_grid as u64, self.max_grid as u64);
        ConfigError::check("rows", settings.rows as u64, min_grid, max_grid)?;
        ConfigError::check("cols", settings.cols as u64, min_grid, max_grid)?;
        ConfigError::check(
            "max_players",
            settings.max_players as u64,
            self.min_players as u64,
            self.max_players as u64,
        )
    }
}

/// Parameters chosen when creating a Dots and Boxes game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DotsSettings {
    pub rows: usize,
    pub cols: usize,
    pub max_players: usize,
}
