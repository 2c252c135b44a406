//! In-process leaderboard service.

use crate::leaderboard::{LeaderboardError, LeaderboardService, RankingEntry, ScoreSubmission};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Keeps submissions in memory; can be switched offline to simulate outages.
#[derive(Debug, Default)]
pub struct InMemoryLeaderboard {
    entries: Mutex<Vec<RankingEntry>>,
    offline: AtomicBool,
    append_calls: AtomicUsize,
}

impl InMemoryLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, entry: RankingEntry) {
        self.entries.lock().await.push(entry);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn append_calls(&self) -> usize {
        self.append_calls.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), LeaderboardError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(LeaderboardError::Network("service offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LeaderboardService for InMemoryLeaderboard {
    async fn append(&self, submission: &ScoreSubmission) -> Result<(), LeaderboardError> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        self.push(RankingEntry {
            name: submission.name.clone(),
            score: submission.score,
        })
        .await;
        Ok(())
    }

    async fn ranking(&self) -> Result<Vec<RankingEntry>, LeaderboardError> {
        self.check_online()?;
        Ok(self.entries.lock().await.clone())
    }
}
