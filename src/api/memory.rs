//! In-memory creature source.
//!
//! Serves a fixed set of records without network access. Used by the test suites
//! and anywhere the draft needs to run against a known data set.

use crate::api::types::{CreatureRecord, SpeciesRecord, SpriteSet, Variety};
use crate::api::{AssetProbe, CreatureSource, LookupError};
use crate::types::StatVector;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Creature source backed by hash maps.
#[derive(Debug, Default)]
pub struct InMemorySource {
    creatures: HashMap<String, CreatureRecord>,
    species: HashMap<String, SpeciesRecord>,
    delays: HashMap<String, Duration>,
    failing: HashSet<String>,
    broken_assets: HashSet<String>,
    creature_calls: AtomicUsize,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a creature; it also gets a plain species entry unless one exists.
    pub fn with_creature(mut self, record: CreatureRecord) -> Self {
        self.species
            .entry(record.species.clone())
            .or_insert_with(|| SpeciesRecord {
                is_legendary: false,
                is_mythical: false,
                varieties: vec![Variety {
                    name: record.name.clone(),
                    is_default: true,
                }],
            });
        self.creatures.insert(record.name.clone(), record);
        self
    }

    /// Add or replace a species entry.
    pub fn with_species(mut self, reference: &str, record: SpeciesRecord) -> Self {
        self.species.insert(reference.to_string(), record);
        self
    }

    /// Delay every lookup of `identity` by `delay`.
    pub fn with_delay(mut self, identity: &str, delay: Duration) -> Self {
        self.delays.insert(identity.to_string(), delay);
        self
    }

    /// Make every lookup of `identity` fail with a transport error.
    pub fn with_failure(mut self, identity: &str) -> Self {
        self.failing.insert(identity.to_string());
        self
    }

    /// Make the asset at `url` fail to load.
    pub fn with_broken_asset(mut self, url: &str) -> Self {
        self.broken_assets.insert(url.to_string());
        self
    }

    /// Number of creature lookups served so far.
    pub fn creature_calls(&self) -> usize {
        self.creature_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CreatureSource for InMemorySource {
    async fn creature(&self, identity: &str) -> Result<CreatureRecord, LookupError> {
        self.creature_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(identity) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(identity) {
            return Err(LookupError::Http(format!("{} unavailable", identity)));
        }
        self.creatures
            .get(identity)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(identity.to_string()))
    }

    async fn species(&self, reference: &str) -> Result<SpeciesRecord, LookupError> {
        self.species
            .get(reference)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(reference.to_string()))
    }
}

#[async_trait]
impl AssetProbe for InMemorySource {
    async fn load(&self, url: &str) -> Result<(), LookupError> {
        if self.broken_assets.contains(url) {
            Err(LookupError::Http(format!("{} failed to load", url)))
        } else {
            Ok(())
        }
    }
}

/// Record with test sprites under `https://sprites.test/` and the species named after
/// the creature.
pub fn creature(name: &str, stats: [u32; 6]) -> CreatureRecord {
    CreatureRecord {
        id: 0,
        name: name.to_string(),
        sprites: SpriteSet {
            front_default: Some(format!("https://sprites.test/{}.png", name)),
            front_variant: Some(format!("https://sprites.test/shiny/{}.png", name)),
            fallbacks: Vec::new(),
        },
        species: name.to_string(),
        stats: StatVector::new(stats),
    }
}
