//! Draft engine - draws candidates, reveals them and fills the six stat slots.
//!
//! [`DraftSession`] is the synchronous state machine; [`DraftEngine`] runs it with
//! asynchronous generation tasks. [`DraftBuilder`] wires both together with sensible
//! defaults.

pub mod types;
pub mod token;
pub mod slots;
pub mod pool;
pub mod sink;
pub mod generator;
pub mod resolution;
pub mod reveal;
pub mod session;
pub mod engine;

pub use engine::{DraftEngine, GenerationOutcome, GenerationReport};
pub use generator::{CandidateGenerator, GateSnapshot};
pub use pool::CandidatePool;
pub use resolution::FormResolver;
pub use reveal::{RevealSequencer, RevealTiming};
pub use session::{Assignment, DraftSession, FormStep, MegaStep, Next, Phase, SkipOutcome};
pub use sink::EventSink;
pub use slots::{ScoreLine, Scorecard, SlotTable};
pub use types::{
    DraftError, GameConfig, Limit, PresentationEvent, Rejection, SessionCounters, SessionLimits,
};

use crate::api::{AssetProbe, CreatureSource, PokeApiClient};
use crate::config::AppConfig;
use crate::prefetch::SpriteCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Draft engine builder for convenient construction with sensible defaults.
pub struct DraftBuilder {
    config: AppConfig,
    limits: SessionLimits,
    source: Option<Arc<dyn CreatureSource>>,
    assets: Option<Arc<dyn AssetProbe>>,
    pool: CandidatePool,
    sprites: SpriteCache,
    timing: Option<RevealTiming>,
    seed: Option<u64>,
    events: Option<mpsc::UnboundedSender<PresentationEvent>>,
}

impl DraftBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            limits: SessionLimits::default(),
            source: None,
            assets: None,
            pool: CandidatePool::standard(),
            sprites: SpriteCache::new(),
            timing: None,
            seed: None,
            events: None,
        }
    }

    /// Use this infrastructure configuration.
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the session limits.
    pub fn with_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Use one value as both creature source and asset probe.
    pub fn with_backend<B>(mut self, backend: Arc<B>) -> Self
    where
        B: CreatureSource + AssetProbe + 'static,
    {
        self.source = Some(backend.clone());
        self.assets = Some(backend);
        self
    }

    /// Set the candidate pool.
    pub fn with_pool(mut self, pool: CandidatePool) -> Self {
        self.pool = pool;
        self
    }

    /// Share a (possibly prefetched) placeholder sprite cache.
    pub fn with_sprite_cache(mut self, sprites: SpriteCache) -> Self {
        self.sprites = sprites;
        self
    }

    /// Override the reveal timings from the configuration.
    pub fn with_timing(mut self, timing: RevealTiming) -> Self {
        self.timing = Some(timing);
        self
    }

    /// Set the draw attempt cap (`None` = unbounded).
    pub fn with_max_draw_attempts(mut self, attempts: Option<u32>) -> Self {
        self.config.max_draw_attempts = attempts;
        self
    }

    /// Set the pause after a skip.
    pub fn with_skip_pause(mut self, pause: Duration) -> Self {
        self.config.skip_pause_ms = pause.as_millis() as u64;
        self
    }

    /// Seed the session RNG.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Publish presentation events on this channel.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<PresentationEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Build the engine. Without an explicit backend a PokeAPI client is created from
    /// the configuration.
    pub fn build(self) -> anyhow::Result<DraftEngine> {
        let (source, assets) = match (self.source, self.assets) {
            (Some(source), Some(assets)) => (source, assets),
            _ => {
                let client = Arc::new(PokeApiClient::new(&self.config)?);
                let source: Arc<dyn CreatureSource> = client.clone();
                let assets: Arc<dyn AssetProbe> = client;
                (source, assets)
            }
        };

        let timing = self.timing.unwrap_or_else(|| RevealTiming::from(&self.config));
        let generator = CandidateGenerator::new(source.clone(), self.pool, self.config.max_draw_attempts);
        let resolver = FormResolver::new(source);
        let sequencer = RevealSequencer::new(self.sprites, timing, assets);
        let sink = self.events.map(EventSink::new).unwrap_or_default();
        let session = DraftSession::new(self.limits, self.seed.unwrap_or_else(rand::random));

        Ok(DraftEngine::new(
            session,
            generator,
            resolver,
            sequencer,
            sink,
            Duration::from_millis(self.config.skip_pause_ms),
        ))
    }
}

impl Default for DraftBuilder {
    fn default() -> Self {
        Self::new()
    }
}
