//! HTTP client for the public creature API.

use crate::api::rate_limit::AdaptiveRateLimiter;
use crate::api::types::{CreatureRecord, PokemonDto, SpeciesDto, SpeciesRecord};
use crate::api::{AssetProbe, CreatureSource, LookupError};
use crate::config::AppConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Cached, rate-limited creature API client.
#[derive(Clone)]
pub struct PokeApiClient {
    http: Client,
    base_url: String,
    creatures: Cache<String, Arc<CreatureRecord>>,
    species: Cache<String, Arc<SpeciesRecord>>,
    limiter: Arc<Mutex<AdaptiveRateLimiter>>,
}

impl PokeApiClient {
    /// Create a client from the application configuration.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        let creatures = Cache::builder()
            .max_capacity(config.max_cache_entries)
            .time_to_live(Duration::from_secs(config.cache_ttl_seconds))
            .build();
        let species = Cache::builder()
            .max_capacity(config.max_cache_entries)
            .time_to_live(Duration::from_secs(config.cache_ttl_seconds))
            .build();

        let limiter = AdaptiveRateLimiter::new(
            config.rate_limit_requests_per_second,
            config.rate_limit_window,
            0.2,
        );

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            creatures,
            species,
            limiter: Arc::new(Mutex::new(limiter)),
        })
    }

    /// Number of cached creature records.
    pub fn cached_creatures(&self) -> u64 {
        self.creatures.entry_count()
    }

    fn species_url(&self, reference: &str) -> String {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            reference.to_string()
        } else {
            format!("{}/pokemon-species/{}", self.base_url, reference.to_lowercase())
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, LookupError> {
        self.limiter.lock().await.acquire().await;

        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                self.limiter.lock().await.record(false);
                return Err(LookupError::Http(e.to_string()));
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            self.limiter.lock().await.record(true);
            return Err(LookupError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            self.limiter.lock().await.record(false);
            return Err(LookupError::Http(format!("{} returned {}", url, status)));
        }

        let body = response
            .json::<T>()
            .await
            .map_err(|e| LookupError::InvalidData(e.to_string()));
        self.limiter.lock().await.record(body.is_ok());
        body
    }
}

#[async_trait]
impl CreatureSource for PokeApiClient {
    #[instrument(skip(self))]
    async fn creature(&self, identity: &str) -> Result<CreatureRecord, LookupError> {
        let key = identity.to_lowercase();
        let url = format!("{}/pokemon/{}", self.base_url, key);

        let record = self
            .creatures
            .try_get_with(key.clone(), async {
                let dto: PokemonDto = self.get_json(&url).await?;
                Ok::<_, LookupError>(Arc::new(CreatureRecord::from(dto)))
            })
            .await
            .map_err(|e| match e.as_ref() {
                LookupError::NotFound(_) => LookupError::NotFound(key.clone()),
                other => other.clone(),
            })?;

        debug!("Resolved creature {}", record.name);
        Ok(record.as_ref().clone())
    }

    #[instrument(skip(self))]
    async fn species(&self, reference: &str) -> Result<SpeciesRecord, LookupError> {
        let url = self.species_url(reference);

        let record = self
            .species
            .try_get_with(url.clone(), async {
                let dto: SpeciesDto = self.get_json(&url).await?;
                Ok::<_, LookupError>(Arc::new(SpeciesRecord::from(dto)))
            })
            .await
            .map_err(|e| e.as_ref().clone())?;

        Ok(record.as_ref().clone())
    }
}

#[async_trait]
impl AssetProbe for PokeApiClient {
    async fn load(&self, url: &str) -> Result<(), LookupError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| LookupError::Http(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(LookupError::Http(format!("{} returned {}", url, response.status())))
        }
    }
}
