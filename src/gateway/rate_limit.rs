//! Sliding-window rate limiter guarding outbound AI calls.
//!
//! Tracks the timestamps of recent calls and admits a new one only while
//! fewer than `max_requests` fall inside the trailing `window`. Timestamps
//! are appended in clock order, so pruning only ever pops from the front.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::trace;

use crate::clock::Clock;
use crate::telemetry;
use crate::{HuginnError, Result};

/// Configuration for the local rate limiter.
///
/// ```rust
/// # use huginn::RateLimitConfig;
/// # use std::time::Duration;
/// let config = RateLimitConfig::new(8, Duration::from_secs(60));
/// assert!(config.count_retries);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum calls inside the window. Default: 8.
    pub max_requests: usize,
    /// Length of the trailing window. Default: 60s.
    pub window: Duration,
    /// Whether each retry attempt consumes a slot. Default: true.
    pub count_retries: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 8,
            window: Duration::from_secs(60),
            count_retries: true,
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            ..Self::default()
        }
    }

    pub fn count_retries(mut self, enabled: bool) -> Self {
        self.count_retries = enabled;
        self
    }
}

/// Sliding-window limiter.
pub struct RateLimiter {
    config: RateLimitConfig,
    timestamps: Mutex<VecDeque<u64>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        let capacity = config.max_requests + 1;
        Self {
            config,
            timestamps: Mutex::new(VecDeque::with_capacity(capacity)),
            clock,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Whether a call would be admitted right now.
    pub fn can_make_request(&self) -> bool {
        let now = self.clock.now_millis();
        let mut timestamps = self.lock();
        self.prune(&mut timestamps, now);
        timestamps.len() < self.config.max_requests
    }

    /// Record a call at the current time.
    pub fn record_request(&self) {
        let now = self.clock.now_millis();
        push_ordered(&mut self.lock(), now);
    }

    /// Check and record in one step.
    ///
    /// On denial returns [`HuginnError::LocalRateLimited`] carrying how long
    /// until the oldest call leaves the window.
    pub fn try_admit(&self) -> Result<()> {
        let now = self.clock.now_millis();
        let mut timestamps = self.lock();
        self.prune(&mut timestamps, now);
        if timestamps.len() < self.config.max_requests {
            push_ordered(&mut timestamps, now);
            return Ok(());
        }
        metrics::counter!(telemetry::RATE_LIMITED_TOTAL).increment(1);
        Err(HuginnError::LocalRateLimited {
            retry_after: self.wait_time(&timestamps, now),
        })
    }

    /// How long until a call would be admitted (zero if it would be now).
    pub fn time_until_available(&self) -> Duration {
        let now = self.clock.now_millis();
        let mut timestamps = self.lock();
        self.prune(&mut timestamps, now);
        self.wait_time(&timestamps, now)
    }

    /// Number of calls currently inside the window.
    pub fn in_window(&self) -> usize {
        let now = self.clock.now_millis();
        let mut timestamps = self.lock();
        self.prune(&mut timestamps, now);
        timestamps.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<u64>> {
        self.timestamps.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn window_millis(&self) -> u64 {
        self.config.window.as_millis() as u64
    }

    fn prune(&self, timestamps: &mut VecDeque<u64>, now: u64) {
        let window = self.window_millis();
        let before = timestamps.len();
        while let Some(&oldest) = timestamps.front() {
            if now.saturating_sub(oldest) >= window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
        let pruned = before - timestamps.len();
        if pruned > 0 {
            trace!(pruned, remaining = timestamps.len(), "pruned rate limit window");
        }
    }

    fn wait_time(&self, timestamps: &VecDeque<u64>, now: u64) -> Duration {
        if timestamps.len() < self.config.max_requests {
            return Duration::ZERO;
        }
        match timestamps.front() {
            Some(&oldest) => {
                Duration::from_millis((oldest + self.window_millis()).saturating_sub(now))
            }
            None => Duration::ZERO,
        }
    }
}

/// Append `now`, clamped so the deque stays sorted if the wall clock
/// steps backwards.
fn push_ordered(timestamps: &mut VecDeque<u64>, now: u64) {
    let at = timestamps.back().map_or(now, |&last| last.max(now));
    timestamps.push_back(at);
}
