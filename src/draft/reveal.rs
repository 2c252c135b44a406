//! Reveal animation sequencing.
//!
//! A reveal cycles placeholder sprites while the draw is in flight, keeps cycling for a
//! hold period, pauses, fades, checks that the final sprite loads and only then
//! settles. Every step re-checks the generation handle; a stale reveal goes quiet.

use crate::api::AssetProbe;
use crate::config::AppConfig;
use crate::draft::sink::EventSink;
use crate::draft::token::GenerationHandle;
use crate::draft::types::{DraftError, PresentationEvent};
use crate::prefetch::SpriteCache;
use crate::types::Candidate;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tracing::{instrument, warn};

/// Reveal animation timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealTiming {
    pub frame: Duration,
    pub hold: Duration,
    pub settle: Duration,
    pub fade: Duration,
}

impl RevealTiming {
    /// No pauses at all.
    pub fn instant() -> Self {
        Self {
            frame: Duration::ZERO,
            hold: Duration::ZERO,
            settle: Duration::ZERO,
            fade: Duration::ZERO,
        }
    }
}

impl Default for RevealTiming {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for RevealTiming {
    fn from(config: &AppConfig) -> Self {
        Self {
            frame: Duration::from_millis(config.reveal_frame_ms),
            hold: Duration::from_millis(config.reveal_hold_ms),
            settle: Duration::from_millis(config.reveal_settle_ms),
            fade: Duration::from_millis(config.reveal_fade_ms),
        }
    }
}

/// How the final step of a reveal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    Shown,
    /// The final sprite did not load; the generation has to start over
    AssetFailed,
}

pub struct RevealSequencer {
    sprites: SpriteCache,
    timing: RevealTiming,
    assets: Arc<dyn AssetProbe>,
}

impl RevealSequencer {
    pub fn new(sprites: SpriteCache, timing: RevealTiming, assets: Arc<dyn AssetProbe>) -> Self {
        Self {
            sprites,
            timing,
            assets,
        }
    }

    pub fn timing(&self) -> RevealTiming {
        self.timing
    }

    /// Cycle placeholders until `work` finishes, then for the hold period.
    pub async fn spin<T, F>(
        &self,
        handle: &GenerationHandle,
        sink: &EventSink,
        work: F,
    ) -> Result<T, DraftError>
    where
        F: Future<Output = Result<T, DraftError>>,
    {
        tokio::pin!(work);

        let outcome = if self.timing.frame.is_zero() {
            work.await
        } else {
            let mut frames = interval(self.timing.frame);
            frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    outcome = &mut work => break outcome,
                    _ = frames.tick() => self.show_placeholder(handle, sink).await,
                }
            }
        };
        let value = outcome?;
        handle.check()?;

        self.hold(handle, sink).await?;
        Ok(value)
    }

    async fn hold(&self, handle: &GenerationHandle, sink: &EventSink) -> Result<(), DraftError> {
        if self.timing.hold.is_zero() {
            return Ok(());
        }
        let deadline = Instant::now() + self.timing.hold;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            self.show_placeholder(handle, sink).await;
            let step = if self.timing.frame.is_zero() {
                deadline - now
            } else {
                self.timing.frame.min(deadline - now)
            };
            sleep(step).await;
            handle.check()?;
        }
    }

    async fn show_placeholder(&self, handle: &GenerationHandle, sink: &EventSink) {
        if let Some(sprite) = self.sprites.random_placeholder().await {
            sink.emit(
                handle,
                PresentationEvent::Placeholder {
                    token: handle.token(),
                    sprite,
                },
            );
        }
    }

    /// Pause, fade, probe the final sprite and announce the candidate.
    #[instrument(skip_all, fields(token = handle.token(), candidate = %candidate.name))]
    pub async fn settle(
        &self,
        handle: &GenerationHandle,
        sink: &EventSink,
        candidate: &Candidate,
    ) -> Result<SettleOutcome, DraftError> {
        for pause in [self.timing.settle, self.timing.fade] {
            if !pause.is_zero() {
                sleep(pause).await;
            }
            handle.check()?;
        }

        let loaded = self.assets.load(&candidate.sprite).await;
        handle.check()?;
        if let Err(e) = loaded {
            warn!("Sprite {} failed to load: {}", candidate.sprite, e);
            return Ok(SettleOutcome::AssetFailed);
        }

        sink.emit(
            handle,
            PresentationEvent::Settled {
                token: handle.token(),
                candidate: candidate.clone(),
            },
        );
        Ok(SettleOutcome::Shown)
    }
}
