//! Local persistence: rankings, the remembered player name and the setup handoff.
//!
//! All of it lives behind the [`LocalStore`] contract; [`SqliteStore`] is the
//! implementation.

pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::draft::types::GameConfig;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Entries shown in a ranking view.
pub const RANKING_SIZE: usize = 10;

/// How long a remembered player name stays valid.
pub fn player_name_ttl() -> Duration {
    Duration::days(365)
}

/// Current UTC date, the key of the daily ranking.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// A locally recorded score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u32,
    pub date: NaiveDate,
}

/// Formal contract for local persistence.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Append a finished game to the daily and all-time rankings.
    async fn record_score(&self, name: &str, score: u32, today: NaiveDate) -> Result<()>;

    /// Top scores of `today`; the daily list is cleared whenever the date changes.
    async fn daily_ranking(&self, today: NaiveDate) -> Result<Vec<ScoreEntry>>;

    /// Top scores ever recorded.
    async fn all_time_ranking(&self) -> Result<Vec<ScoreEntry>>;

    /// Remember the player name for [`player_name_ttl`]. The default name is not stored.
    async fn remember_player(&self, name: &str, now: DateTime<Utc>) -> Result<()>;

    /// The remembered name, unless it expired.
    async fn player_name(&self, now: DateTime<Utc>) -> Result<Option<String>>;

    /// Store the configuration for the next game, replacing any pending one.
    async fn stash_config(&self, config: &GameConfig) -> Result<()>;

    /// Read and clear the pending configuration.
    async fn take_config(&self) -> Result<Option<GameConfig>>;

    /// Health check for the storage backend.
    async fn health_check(&self) -> Result<bool>;
}
