//! Adaptive request throttling for the public creature API.
//!
//! Wraps a governor limiter whose quota shrinks while the API answers with errors and
//! recovers once it is healthy again.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::collections::VecDeque;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Throttle for outgoing API requests.
pub struct AdaptiveRateLimiter {
    limiter: DefaultDirectRateLimiter,
    /// Configured requests per second
    base_quota: u32,
    /// Effective requests per second
    current_quota: u32,
    /// Outcome of the most recent requests, newest last
    outcomes: VecDeque<bool>,
    window_size: usize,
    /// Failure ratio above which the quota is lowered
    error_threshold: f64,
    min_quota: u32,
    last_adjustment: Instant,
    adjustment_interval: Duration,
}

impl AdaptiveRateLimiter {
    /// Create a limiter allowing `requests_per_second` (at least one).
    pub fn new(requests_per_second: u32, window_size: usize, error_threshold: f64) -> Self {
        let base_quota = requests_per_second.max(1);
        Self {
            limiter: RateLimiter::direct(Self::quota(base_quota)),
            base_quota,
            current_quota: base_quota,
            outcomes: VecDeque::with_capacity(window_size),
            window_size: window_size.max(1),
            error_threshold: error_threshold.clamp(0.0, 1.0),
            min_quota: (base_quota / 4).max(1),
            last_adjustment: Instant::now(),
            adjustment_interval: Duration::from_secs(30),
        }
    }

    fn quota(per_second: u32) -> Quota {
        Quota::per_second(NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN))
    }

    /// Wait until a request may be sent.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// Record whether a request succeeded and adjust the quota if due.
    #[instrument(skip(self))]
    pub fn record(&mut self, success: bool) {
        self.outcomes.push_back(success);
        while self.outcomes.len() > self.window_size {
            self.outcomes.pop_front();
        }

        if self.outcomes.len() >= self.window_size / 2
            && self.last_adjustment.elapsed() >= self.adjustment_interval
        {
            self.adjust_quota();
        }
    }

    fn adjust_quota(&mut self) {
        let error_rate = self.error_rate();
        let old_quota = self.current_quota;

        if error_rate > self.error_threshold {
            let reduction = 1.0 - (error_rate - self.error_threshold) * 0.5;
            self.current_quota = ((old_quota as f64 * reduction) as u32).max(self.min_quota);
            warn!(
                "API error rate {:.0}%, lowering quota from {} to {} req/s",
                error_rate * 100.0,
                old_quota,
                self.current_quota
            );
        } else if error_rate < self.error_threshold * 0.5 {
            let increase = 1.0 + (self.error_threshold * 0.5 - error_rate) * 0.2;
            let raised = ((old_quota as f64 * increase).ceil() as u32).max(old_quota + 1);
            self.current_quota = raised.min(self.base_quota);
            debug!("API healthy, quota {} -> {} req/s", old_quota, self.current_quota);
        }

        if self.current_quota != old_quota {
            self.limiter = RateLimiter::direct(Self::quota(self.current_quota));
            self.last_adjustment = Instant::now();
        }
    }

    /// Failure ratio over the current window.
    pub fn error_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        let failures = self.outcomes.iter().filter(|ok| !**ok).count();
        failures as f64 / self.outcomes.len() as f64
    }

    pub fn current_quota(&self) -> u32 {
        self.current_quota
    }
}
