//! SQLite implementation of [`LocalStore`].

use crate::config::DEFAULT_PLAYER_NAME;
use crate::draft::types::GameConfig;
use crate::storage::{player_name_ttl, LocalStore, ScoreEntry, RANKING_SIZE};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{sqlite::SqlitePoolOptions, FromRow, Pool, Sqlite};
use tracing::{debug, info};

const DAILY: &str = "daily";
const ALL_TIME: &str = "all_time";
const DAILY_DATE_KEY: &str = "daily_date";

#[derive(FromRow)]
struct ScoreRow {
    name: String,
    score: i64,
    date: NaiveDate,
}

impl From<ScoreRow> for ScoreEntry {
    fn from(row: ScoreRow) -> Self {
        Self {
            name: row.name,
            score: row.score.clamp(0, u32::MAX as i64) as u32,
            date: row.date,
        }
    }
}

pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    pub async fn new(path: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite:{}?mode=rwc", path))
            .await
            .with_context(|| format!("Failed to open SQLite database {}", path))?;

        let store = Self { pool };
        store.create_tables().await?;
        info!("SqliteStore initialized at {}", path);
        Ok(store)
    }

    /// Private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        // every connection to :memory: is a separate database, so keep exactly one alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory SQLite database")?;

        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    async fn create_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                scope TEXT NOT NULL,
                name TEXT NOT NULL,
                score INTEGER NOT NULL,
                date TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create scores table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_scores_scope ON scores(scope, score DESC);")
            .execute(&self.pool)
            .await
            .context("Failed to create scores index")?;

        sqlx::query("CREATE TABLE IF NOT EXISTS meta (key TEXT PRIMARY KEY, value TEXT NOT NULL);")
            .execute(&self.pool)
            .await
            .context("Failed to create meta table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS player (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                name TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create player table")?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS handoff (id INTEGER PRIMARY KEY CHECK (id = 1), config TEXT NOT NULL);",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create handoff table")?;

        Ok(())
    }

    /// Clear the daily list when its date key is not `today`.
    async fn refresh_daily(&self, today: NaiveDate) -> Result<()> {
        let stored: Option<String> = sqlx::query_scalar("SELECT value FROM meta WHERE key = ?")
            .bind(DAILY_DATE_KEY)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to read daily date key")?;

        let today_key = today.to_string();
        if stored.as_deref() == Some(today_key.as_str()) {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM scores WHERE scope = ?")
            .bind(DAILY)
            .execute(&mut *tx)
            .await
            .context("Failed to reset daily ranking")?;
        sqlx::query("INSERT OR REPLACE INTO meta (key, value) VALUES (?, ?)")
            .bind(DAILY_DATE_KEY)
            .bind(&today_key)
            .execute(&mut *tx)
            .await
            .context("Failed to store daily date key")?;
        tx.commit().await?;

        debug!("Daily ranking reset for {} (was {:?})", today_key, stored);
        Ok(())
    }

    async fn ranking(&self, scope: &str) -> Result<Vec<ScoreEntry>> {
        let rows: Vec<ScoreRow> = sqlx::query_as(
            "SELECT name, score, date FROM scores WHERE scope = ? ORDER BY score DESC, id ASC LIMIT ?",
        )
        .bind(scope)
        .bind(RANKING_SIZE as i64)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to read {} ranking", scope))?;

        Ok(rows.into_iter().map(ScoreEntry::from).collect())
    }
}

#[async_trait]
impl LocalStore for SqliteStore {
    async fn record_score(&self, name: &str, score: u32, today: NaiveDate) -> Result<()> {
        self.refresh_daily(today).await?;

        let mut tx = self.pool.begin().await?;
        for scope in [DAILY, ALL_TIME] {
            sqlx::query("INSERT INTO scores (scope, name, score, date) VALUES (?, ?, ?, ?)")
                .bind(scope)
                .bind(name)
                .bind(score as i64)
                .bind(today)
                .execute(&mut *tx)
                .await
                .context("Failed to record score")?;
        }
        tx.commit().await?;

        info!("Recorded local score {} for {}", score, name);
        Ok(())
    }

    async fn daily_ranking(&self, today: NaiveDate) -> Result<Vec<ScoreEntry>> {
        self.refresh_daily(today).await?;
        self.ranking(DAILY).await
    }

    async fn all_time_ranking(&self) -> Result<Vec<ScoreEntry>> {
        self.ranking(ALL_TIME).await
    }

    async fn remember_player(&self, name: &str, now: DateTime<Utc>) -> Result<()> {
        if name == DEFAULT_PLAYER_NAME {
            return Ok(());
        }

        sqlx::query("INSERT OR REPLACE INTO player (id, name, expires_at) VALUES (1, ?, ?)")
            .bind(name)
            .bind(now + player_name_ttl())
            .execute(&self.pool)
            .await
            .context("Failed to remember player name")?;
        Ok(())
    }

    async fn player_name(&self, now: DateTime<Utc>) -> Result<Option<String>> {
        let row: Option<(String, DateTime<Utc>)> =
            sqlx::query_as("SELECT name, expires_at FROM player WHERE id = 1")
                .fetch_optional(&self.pool)
                .await
                .context("Failed to read player name")?;

        Ok(row.and_then(|(name, expires_at)| (expires_at > now).then_some(name)))
    }

    async fn stash_config(&self, config: &GameConfig) -> Result<()> {
        let json = serde_json::to_string(config)?;
        sqlx::query("INSERT OR REPLACE INTO handoff (id, config) VALUES (1, ?)")
            .bind(json)
            .execute(&self.pool)
            .await
            .context("Failed to stash game config")?;
        Ok(())
    }

    async fn take_config(&self) -> Result<Option<GameConfig>> {
        let mut tx = self.pool.begin().await?;
        let json: Option<String> = sqlx::query_scalar("SELECT config FROM handoff WHERE id = 1")
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to read game config")?;
        sqlx::query("DELETE FROM handoff")
            .execute(&mut *tx)
            .await
            .context("Failed to clear game config")?;
        tx.commit().await?;

        json.map(|json| serde_json::from_str(&json).context("Stored game config is corrupt"))
            .transpose()
    }

    async fn health_check(&self) -> Result<bool> {
        let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        Ok(one == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[tokio::test]
    async fn test_rankings_are_sorted_and_truncated() {
        let store = SqliteStore::in_memory().await.unwrap();
        for score in 0..12u32 {
            store.record_score(&format!("p{}", score), 400 + score * 10, day(1)).await.unwrap();
        }

        let daily = store.daily_ranking(day(1)).await.unwrap();
        assert_eq!(daily.len(), RANKING_SIZE);
        assert_eq!(daily[0].score, 510);
        assert!(daily.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(store.all_time_ranking().await.unwrap().len(), RANKING_SIZE);
    }

    #[tokio::test]
    async fn test_player_name_expiry() {
        let store = SqliteStore::in_memory().await.unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();

        store.remember_player(DEFAULT_PLAYER_NAME, now).await.unwrap();
        assert_eq!(store.player_name(now).await.unwrap(), None);

        store.remember_player("Misty", now).await.unwrap();
        assert_eq!(store.player_name(now).await.unwrap().as_deref(), Some("Misty"));
        let later = now + player_name_ttl() + chrono::Duration::seconds(1);
        assert_eq!(store.player_name(later).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_health_check() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert!(store.health_check().await.unwrap());
    }
}
