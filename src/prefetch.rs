//! Sprite pool prefetching.
//!
//! Warms up a cache of sprite pairs for the whole candidate pool so reveal animations
//! have something to cycle through. Entries are appended while warming up and only read
//! afterwards.

use crate::api::CreatureSource;
use crate::draft::pool::CandidatePool;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument};

/// Default and variant sprite of one pool entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpritePair {
    pub default: String,
    pub variant: Option<String>,
}

/// Shared, append-only sprite cache.
#[derive(Debug, Clone, Default)]
pub struct SpriteCache {
    entries: Arc<RwLock<Vec<SpritePair>>>,
}

impl SpriteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn extend(&self, pairs: impl IntoIterator<Item = SpritePair>) {
        self.entries.write().await.extend(pairs);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// A random default sprite, `None` while the cache is empty.
    pub async fn random_placeholder(&self) -> Option<String> {
        let entries = self.entries.read().await;
        entries
            .choose(&mut rand::thread_rng())
            .map(|pair| pair.default.clone())
    }
}

/// Fetches sprites for every pool entry in fixed-size batches.
pub struct SpritePrefetcher {
    source: Arc<dyn CreatureSource>,
    cache: SpriteCache,
    batch_size: usize,
}

impl SpritePrefetcher {
    pub fn new(source: Arc<dyn CreatureSource>, cache: SpriteCache, batch_size: usize) -> Self {
        Self {
            source,
            cache,
            batch_size: batch_size.max(1),
        }
    }

    /// Fetch the whole pool; lookups within a batch run concurrently and failures are
    /// skipped. Returns the number of cached pairs.
    #[instrument(skip_all, fields(pool = pool.len()))]
    pub async fn warm_up(&self, pool: &CandidatePool) -> usize {
        let batches = pool.names().chunks(self.batch_size);
        let total_batches = batches.len();

        for (index, batch) in batches.enumerate() {
            let mut tasks = JoinSet::new();
            for name in batch {
                let source = self.source.clone();
                let name = name.clone();
                tasks.spawn(async move {
                    let record = source.creature(&name).await;
                    (name, record)
                });
            }

            let mut pairs = Vec::with_capacity(batch.len());
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((_, Ok(record))) => {
                        if let Some(default) = record.sprites.front_default {
                            pairs.push(SpritePair {
                                default,
                                variant: record.sprites.front_variant,
                            });
                        }
                    }
                    Ok((name, Err(e))) => debug!("Prefetch of {} failed: {}", name, e),
                    Err(e) => debug!("Prefetch task failed: {}", e),
                }
            }

            self.cache.extend(pairs).await;
            info!(
                "Prefetched batch {}/{} ({} sprites cached)",
                index + 1,
                total_batches,
                self.cache.len().await
            );
        }

        self.cache.len().await
    }
}
