//! Candidate generation loop.
//!
//! Draws random pool entries until one passes every gate: not drawn before in this
//! session, fetchable, displayable and within its rarity allowance. The loop only
//! reads a [`GateSnapshot`]; accepting the candidate is left to the session.

use crate::api::CreatureSource;
use crate::draft::pool::CandidatePool;
use crate::draft::sink::EventSink;
use crate::draft::token::GenerationHandle;
use crate::draft::types::{DraftError, SessionCounters, SessionLimits};
use crate::types::{Candidate, RarityTag};
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// One in this many accepted candidates is a variant.
pub const VARIANT_ODDS: u32 = 2048;

/// Session state a generation is allowed to see.
#[derive(Debug, Clone)]
pub struct GateSnapshot {
    pub limits: SessionLimits,
    pub counters: SessionCounters,
    seen: Arc<HashSet<String>>,
}

impl GateSnapshot {
    pub fn new(limits: SessionLimits, counters: SessionCounters, seen: HashSet<String>) -> Self {
        Self {
            limits,
            counters,
            seen: Arc::new(seen),
        }
    }

    pub fn has_seen(&self, identity: &str) -> bool {
        self.seen.contains(identity)
    }

    /// Whether a candidate with this rarity may still be accepted.
    pub fn admits(&self, rarity: Option<RarityTag>) -> bool {
        rarity.map_or(true, |tag| self.limits.admits(&self.counters, tag))
    }
}

/// Draws candidates from a pool through a [`CreatureSource`].
pub struct CandidateGenerator {
    source: Arc<dyn CreatureSource>,
    pool: CandidatePool,
    max_attempts: Option<u32>,
}

impl CandidateGenerator {
    /// `max_attempts: None` keeps drawing until a candidate is found.
    pub fn new(source: Arc<dyn CreatureSource>, pool: CandidatePool, max_attempts: Option<u32>) -> Self {
        Self {
            source,
            pool,
            max_attempts,
        }
    }

    pub fn pool(&self) -> &CandidatePool {
        &self.pool
    }

    /// Produce one candidate that passes every gate of `gate`.
    #[instrument(skip_all, fields(token = handle.token()))]
    pub async fn generate(
        &self,
        gate: &GateSnapshot,
        handle: &GenerationHandle,
        rng: &mut StdRng,
        sink: &EventSink,
    ) -> Result<Candidate, DraftError> {
        if self.pool.is_empty() {
            return Err(DraftError::EmptyPool);
        }

        let mut attempts = 0u32;
        loop {
            if attempts > 0 {
                // Redraws can complete without suspending on a cache hit.
                tokio::task::yield_now().await;
            }
            handle.check()?;
            if let Some(max) = self.max_attempts {
                if attempts >= max {
                    warn!("No acceptable candidate after {} draws", attempts);
                    return Err(DraftError::PoolExhausted { attempts });
                }
            }
            attempts += 1;

            let identity = self.pool.pick(rng).ok_or(DraftError::EmptyPool)?.to_string();
            if gate.has_seen(&identity) {
                debug!("{} already drawn, redrawing", identity);
                sink.status(handle, format!("{} was already drawn", identity));
                continue;
            }

            let record = match self.source.creature(&identity).await {
                Ok(record) => record,
                Err(e) => {
                    debug!("Lookup of {} failed: {}", identity, e);
                    continue;
                }
            };
            handle.check()?;

            let Some(default_sprite) = record.sprites.front_default.clone() else {
                debug!("{} has no default sprite, redrawing", identity);
                continue;
            };

            let rarity = self.classify(&identity, &record.species).await;
            handle.check()?;

            if !gate.admits(rarity) {
                let message = match rarity {
                    Some(RarityTag::Legendary) => "Legendary skipped (limit reached)",
                    _ => "Ultra beast skipped (limit reached)",
                };
                debug!("{}: {}", identity, message);
                sink.status(handle, message);
                continue;
            }

            let is_variant = gate.limits.variant_enabled && rng.gen_ratio(1, VARIANT_ODDS);
            let sprite = record.sprites.for_variant(is_variant).unwrap_or(default_sprite);

            info!(
                "Drew {} after {} attempt(s){}",
                record.name,
                attempts,
                if is_variant { " (variant)" } else { "" }
            );

            return Ok(Candidate {
                identity,
                name: record.name,
                sprite,
                rarity,
                is_variant,
                species: record.species,
                stats: record.stats,
            });
        }
    }

    /// Legendary or mythical species win over ultra-beast membership. A failed species
    /// lookup counts as not legendary.
    async fn classify(&self, identity: &str, species: &str) -> Option<RarityTag> {
        match self.source.species(species).await {
            Ok(record) if record.is_legendary_tier() => return Some(RarityTag::Legendary),
            Ok(_) => {}
            Err(e) => debug!("Species lookup for {} failed: {}", identity, e),
        }
        self.pool
            .is_ultra_beast(identity)
            .then_some(RarityTag::UltraBeast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::{creature, InMemorySource};
    use crate::api::SpeciesRecord;
    use crate::draft::token::GenerationCounter;
    use crate::draft::types::Limit;
    use rand::SeedableRng;

    fn snapshot(limits: SessionLimits) -> GateSnapshot {
        GateSnapshot::new(limits, SessionCounters::default(), HashSet::new())
    }

    fn legendary() -> SpeciesRecord {
        SpeciesRecord {
            is_legendary: true,
            ..SpeciesRecord::default()
        }
    }

    #[tokio::test]
    async fn test_generates_known_candidate() {
        let source = InMemorySource::new().with_creature(creature("lapras", [130, 85, 80, 85, 95, 60]));
        let generator = CandidateGenerator::new(Arc::new(source), CandidatePool::new(["lapras"], &[]), Some(10));
        let handle = GenerationCounter::new().advance();
        let mut rng = StdRng::seed_from_u64(1);

        let candidate = generator
            .generate(&snapshot(SessionLimits::default()), &handle, &mut rng, &EventSink::detached())
            .await
            .unwrap();

        assert_eq!(candidate.identity, "lapras");
        assert_eq!(candidate.rarity, None);
        assert!(!candidate.is_variant);
        assert_eq!(candidate.sprite, "https://sprites.test/lapras.png");
    }

    #[tokio::test]
    async fn test_gated_legendary_exhausts_pool() {
        let source = InMemorySource::new()
            .with_creature(creature("mewtwo", [106, 110, 90, 154, 90, 130]))
            .with_species("mewtwo", legendary());
        let generator = CandidateGenerator::new(Arc::new(source), CandidatePool::new(["mewtwo"], &[]), Some(5));
        let handle = GenerationCounter::new().advance();
        let mut rng = StdRng::seed_from_u64(1);
        let limits = SessionLimits {
            legendary_limit: Limit::Finite(0),
            ..SessionLimits::default()
        };

        let result = generator
            .generate(&snapshot(limits), &handle, &mut rng, &EventSink::detached())
            .await;
        assert_eq!(result, Err(DraftError::PoolExhausted { attempts: 5 }));
    }

    #[tokio::test]
    async fn test_failed_species_lookup_falls_back_to_ultra_beast_list() {
        let mut record = creature("kartana", [59, 181, 131, 59, 31, 109]);
        record.species = "missing-species".to_string();
        let source = InMemorySource::new().with_creature(record);
        let generator = CandidateGenerator::new(
            Arc::new(source),
            CandidatePool::new(["kartana"], &["kartana"]),
            Some(3),
        );

        assert_eq!(
            generator.classify("kartana", "missing-species").await,
            Some(RarityTag::UltraBeast)
        );
    }

    #[tokio::test]
    async fn test_stale_handle_cancels() {
        let source = InMemorySource::new().with_creature(creature("lapras", [130, 85, 80, 85, 95, 60]));
        let generator = CandidateGenerator::new(Arc::new(source), CandidatePool::new(["lapras"], &[]), None);
        let counter = GenerationCounter::new();
        let handle = counter.advance();
        counter.advance();
        let mut rng = StdRng::seed_from_u64(1);

        let result = generator
            .generate(&snapshot(SessionLimits::default()), &handle, &mut rng, &EventSink::detached())
            .await;
        assert_eq!(result, Err(DraftError::Cancelled));
    }

    #[tokio::test]
    async fn test_unbounded_exhausted_draw_can_be_superseded() {
        let source = InMemorySource::new().with_creature(creature("lapras", [130, 85, 80, 85, 95, 60]));
        let generator = CandidateGenerator::new(Arc::new(source), CandidatePool::new(["lapras"], &[]), None);
        let gate = GateSnapshot::new(
            SessionLimits::default(),
            SessionCounters::default(),
            HashSet::from(["lapras".to_string()]),
        );
        let counter = GenerationCounter::new();
        let handle = counter.advance();

        let task = tokio::spawn(async move {
            let mut rng = StdRng::seed_from_u64(1);
            generator
                .generate(&gate, &handle, &mut rng, &EventSink::detached())
                .await
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        counter.advance();

        let result = tokio::time::timeout(std::time::Duration::from_secs(2), task)
            .await
            .expect("generation should observe the newer token")
            .unwrap();
        assert_eq!(result, Err(DraftError::Cancelled));
    }
}
