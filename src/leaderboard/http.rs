//! Leaderboard backed by a spreadsheet web-app endpoint.

use crate::config::AppConfig;
use crate::leaderboard::{LeaderboardError, LeaderboardService, RankingEntry, ScoreSubmission};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio_retry::{strategy::ExponentialBackoff, Retry};
use tracing::{debug, instrument};

#[derive(Debug, Deserialize)]
struct RankingResponse {
    success: bool,
    #[serde(default)]
    data: Vec<RankingEntry>,
}

/// HTTP leaderboard service.
pub struct SheetsLeaderboard {
    http: Client,
    url: String,
    retry_attempts: usize,
}

impl SheetsLeaderboard {
    pub fn new(url: &str, config: &AppConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .context("Failed to build leaderboard HTTP client")?;

        Ok(Self {
            http,
            url: url.to_string(),
            retry_attempts: config.leaderboard_retry_attempts,
        })
    }

    /// Service from the configured URL, if there is one.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>> {
        config
            .leaderboard_url
            .as_deref()
            .map(|url| Self::new(url, config))
            .transpose()
    }

    async fn fetch_once(&self) -> Result<Vec<RankingEntry>, LeaderboardError> {
        let response = self
            .http
            .get(&self.url)
            .query(&[("action", "getRanking")])
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| LeaderboardError::Network(e.to_string()))?
            .error_for_status()
            .map_err(|e| LeaderboardError::Network(e.to_string()))?
            .json::<RankingResponse>()
            .await
            .map_err(|e| LeaderboardError::Network(e.to_string()))?;

        if response.success {
            debug!("Fetched {} ranking entries", response.data.len());
            Ok(response.data)
        } else {
            debug!("Ranking service reported failure");
            Ok(Vec::new())
        }
    }
}

#[async_trait]
impl LeaderboardService for SheetsLeaderboard {
    #[instrument(skip(self, submission), fields(name = %submission.name))]
    async fn append(&self, submission: &ScoreSubmission) -> Result<(), LeaderboardError> {
        let response = self
            .http
            .post(&self.url)
            .json(submission)
            .send()
            .await
            .map_err(|e| LeaderboardError::Network(e.to_string()))?;

        if response.status().is_client_error() {
            return Err(LeaderboardError::Rejected);
        }
        response
            .error_for_status()
            .map_err(|e| LeaderboardError::Network(e.to_string()))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn ranking(&self) -> Result<Vec<RankingEntry>, LeaderboardError> {
        let retry_strategy = ExponentialBackoff::from_millis(200)
            .max_delay(Duration::from_secs(2))
            .take(self.retry_attempts);

        Retry::spawn(retry_strategy, || self.fetch_once()).await
    }
}
