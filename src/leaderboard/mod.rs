//! Global leaderboard client.
//!
//! Scores are only submitted for the canonical ruleset; the check happens before any
//! network traffic. Rankings are read with retries and can be refreshed periodically
//! in the background.

pub mod ruleset;
pub mod http;
pub mod memory;

pub use http::SheetsLeaderboard;
pub use memory::InMemoryLeaderboard;
pub use ruleset::{is_canonical, CANONICAL_RULES_MESSAGE};

use crate::draft::types::GameConfig;
use crate::storage::{LocalStore, ScoreEntry, RANKING_SIZE};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

/// Leaderboard failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LeaderboardError {
    #[error("{}", CANONICAL_RULES_MESSAGE)]
    NonCanonicalRuleset,
    #[error("could not save to the global ranking ({0}); the score was saved locally")]
    Network(String),
    #[error("the ranking service rejected the request")]
    Rejected,
}

/// One row of the global ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub name: String,
    pub score: u32,
}

/// Body of a score submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSubmission {
    pub action: &'static str,
    pub name: String,
    pub score: u32,
    pub config: GameConfig,
}

impl ScoreSubmission {
    pub fn new(name: &str, score: u32, config: &GameConfig) -> Self {
        Self {
            action: "saveScore",
            name: name.to_string(),
            score,
            config: config.clone(),
        }
    }
}

/// Remote ranking storage.
#[async_trait]
pub trait LeaderboardService: Send + Sync {
    async fn append(&self, submission: &ScoreSubmission) -> Result<(), LeaderboardError>;

    /// Ranking as stored by the service; ordering is not guaranteed.
    async fn ranking(&self) -> Result<Vec<RankingEntry>, LeaderboardError>;
}

/// Ranking shown to the player.
#[derive(Debug, Clone, PartialEq)]
pub enum RankingView {
    Global(Vec<RankingEntry>),
    /// The global ranking was unavailable or empty
    Local(Vec<ScoreEntry>),
}

/// Rankings shown around a game: today's local scores and the overall view.
#[derive(Debug, Clone, PartialEq)]
pub struct Standings {
    pub daily: Vec<ScoreEntry>,
    pub overall: RankingView,
}

impl Standings {
    /// Without a configured leaderboard the overall view is the local all-time ranking.
    pub async fn load(
        leaderboard: Option<&LeaderboardClient>,
        store: &dyn LocalStore,
        today: NaiveDate,
    ) -> anyhow::Result<Self> {
        let daily = store.daily_ranking(today).await?;
        let overall = match leaderboard {
            Some(client) => client.ranking_or_local(store).await?,
            None => RankingView::Local(store.all_time_ranking().await?),
        };
        Ok(Self { daily, overall })
    }
}

#[derive(Clone)]
pub struct LeaderboardClient {
    service: Arc<dyn LeaderboardService>,
    refresh_interval: Duration,
}

impl LeaderboardClient {
    pub fn new(service: Arc<dyn LeaderboardService>, refresh_interval: Duration) -> Self {
        Self {
            service,
            refresh_interval,
        }
    }

    /// Submit a finished game. Returns the confirmation message.
    #[instrument(skip(self, config))]
    pub async fn submit_score(
        &self,
        name: &str,
        score: u32,
        config: &GameConfig,
    ) -> Result<String, LeaderboardError> {
        if !is_canonical(&config.limits) {
            info!("Score of {} not submitted: non-canonical ruleset", name);
            return Err(LeaderboardError::NonCanonicalRuleset);
        }

        self.service
            .append(&ScoreSubmission::new(name, score, config))
            .await?;
        info!("Submitted score {} for {}", score, name);
        Ok("Score saved to the global ranking!".to_string())
    }

    /// Top entries, best first.
    pub async fn fetch_ranking(&self) -> Result<Vec<RankingEntry>, LeaderboardError> {
        let mut entries = self.service.ranking().await?;
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(RANKING_SIZE);
        Ok(entries)
    }

    /// Global ranking, or the local all-time ranking when the global one is
    /// unavailable or empty.
    pub async fn ranking_or_local(&self, store: &dyn LocalStore) -> anyhow::Result<RankingView> {
        match self.fetch_ranking().await {
            Ok(entries) if !entries.is_empty() => return Ok(RankingView::Global(entries)),
            Ok(_) => info!("Global ranking is empty, showing local ranking"),
            Err(e) => warn!("Global ranking unavailable: {}", e),
        }
        Ok(RankingView::Local(store.all_time_ranking().await?))
    }

    /// Push a fresh ranking to `updates` every refresh interval until the receiver is
    /// dropped. Failed fetches push an empty list.
    pub fn spawn_refresh(&self, updates: mpsc::Sender<Vec<RankingEntry>>) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(client.refresh_interval);
            // the first tick completes immediately; the caller already has a ranking
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let ranking = client.fetch_ranking().await.unwrap_or_else(|e| {
                    warn!("Ranking refresh failed: {}", e);
                    Vec::new()
                });
                if updates.send(ranking).await.is_err() {
                    break;
                }
            }
        })
    }
}
