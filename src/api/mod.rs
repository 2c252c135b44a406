//! Creature data lookup.
//!
//! The draft engine only sees the [`CreatureSource`] and [`AssetProbe`] traits; the
//! HTTP client and the in-memory source are interchangeable behind them.

pub mod types;
pub mod rate_limit;
pub mod client;
pub mod memory;

use async_trait::async_trait;

pub use client::PokeApiClient;
pub use memory::InMemorySource;
pub use rate_limit::AdaptiveRateLimiter;
pub use types::{CreatureRecord, SpeciesRecord, SpriteSet, Variety};

/// Failure of a creature, species or asset lookup.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LookupError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("request failed: {0}")]
    Http(String),
    #[error("invalid response: {0}")]
    InvalidData(String),
}

/// Read-only access to creature and species data.
#[async_trait]
pub trait CreatureSource: Send + Sync {
    /// Fetch a creature by its identity (e.g. `garchomp`).
    async fn creature(&self, identity: &str) -> Result<CreatureRecord, LookupError>;

    /// Fetch species data by reference (API URL or species name).
    async fn species(&self, reference: &str) -> Result<SpeciesRecord, LookupError>;
}

/// Checks that a sprite can actually be loaded before it is shown.
#[async_trait]
pub trait AssetProbe: Send + Sync {
    async fn load(&self, url: &str) -> Result<(), LookupError>;
}
