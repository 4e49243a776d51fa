//! Adaptive request spacing with multiplicative backoff and decay.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::status::ResponseStatus;
use crate::config::RateLimiterConfig;
use crate::error::Result;

/// Delay multiplier after an explicit rate-limit response.
const RATE_LIMITED_MULTIPLIER: f64 = 2.0;
/// Delay multiplier after a server error.
const SERVER_ERROR_MULTIPLIER: f64 = 1.5;

/// Spaces out calls to a rate-limited service.
///
/// The delay between requests grows on throttling and server errors and
/// decays back towards the floor on fast successful responses. It always stays
/// within `[minimum_delay, maximum_delay]`.
///
/// A limiter is owned by one client. Use [`SharedRateLimiter`] when several
/// tasks must draw from the same budget.
#[derive(Debug, Clone)]
pub struct AdaptiveRateLimiter {
    minimum_delay: Duration,
    maximum_delay: Duration,
    current_delay: Duration,
    backoff_factor: f64,
    decay_factor: f64,
    fast_response: Duration,
    max_retries: u32,
    consecutive_errors: u32,
    last_request_time: Option<Instant>,
}

impl AdaptiveRateLimiter {
    /// Create a limiter from validated configuration.
    pub fn new(config: &RateLimiterConfig) -> Result<Self> {
        config.validate()?;
        let minimum_delay = config.minimum_delay();
        Ok(Self {
            minimum_delay,
            maximum_delay: config.maximum_delay(),
            current_delay: minimum_delay,
            backoff_factor: config.backoff_factor,
            decay_factor: config.decay_factor,
            fast_response: config.fast_response(),
            max_retries: config.max_retries,
            consecutive_errors: 0,
            last_request_time: None,
        })
    }

    /// Time left before the next request may be issued.
    pub fn time_until_ready(&self) -> Duration {
        match self.last_request_time {
            Some(last) => self.current_delay.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Sleep until `current_delay` has passed since the previous request, then
    /// record this request as issued.
    ///
    /// Returns how long the call slept. Dropping the future cancels the wait
    /// without recording a request.
    pub async fn wait(&mut self) -> Duration {
        let pause = self.time_until_ready();
        if !pause.is_zero() {
            trace!(pause_ms = pause.as_millis() as u64, "Throttling request");
            tokio::time::sleep(pause).await;
        }
        self.last_request_time = Some(Instant::now());
        pause
    }

    /// Adapt the delay to an observed response.
    pub fn adjust_for_response(&mut self, response_time: Duration, status: ResponseStatus) {
        match status {
            ResponseStatus::RateLimited => {
                self.scale_delay(RATE_LIMITED_MULTIPLIER);
                self.consecutive_errors = self.consecutive_errors.saturating_add(1);
                warn!(
                    delay_ms = self.current_delay.as_millis() as u64,
                    consecutive_errors = self.consecutive_errors,
                    "Rate limited, backing off"
                );
            }
            ResponseStatus::ServerError => {
                self.scale_delay(SERVER_ERROR_MULTIPLIER);
                self.consecutive_errors = self.consecutive_errors.saturating_add(1);
                debug!(
                    delay_ms = self.current_delay.as_millis() as u64,
                    consecutive_errors = self.consecutive_errors,
                    "Server error, delay increased"
                );
            }
            ResponseStatus::Ok if response_time < self.fast_response => {
                self.scale_delay(self.decay_factor);
                self.consecutive_errors = 0;
                trace!(
                    delay_ms = self.current_delay.as_millis() as u64,
                    "Fast response, delay decayed"
                );
            }
            ResponseStatus::Ok => {
                self.consecutive_errors = 0;
            }
        }
    }

    /// Multiply the delay by `backoff_factor` after a rate-limit failure.
    ///
    /// Returns whether retrying is still sensible, i.e. the delay has not yet
    /// reached the ceiling.
    pub fn handle_rate_limit_error(&mut self) -> bool {
        self.scale_delay(self.backoff_factor);
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        let can_retry = self.current_delay < self.maximum_delay;
        if !can_retry {
            warn!(
                delay_ms = self.current_delay.as_millis() as u64,
                "Backoff reached maximum delay"
            );
        }
        can_retry
    }

    /// Restore the delay to the floor, leaving the error count untouched.
    pub fn reset_delay(&mut self) {
        self.current_delay = self.minimum_delay;
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        self.current_delay = self.minimum_delay;
        self.consecutive_errors = 0;
        self.last_request_time = None;
    }

    /// Whether consecutive errors exceed the advisory retry budget.
    pub fn should_give_up(&self) -> bool {
        self.consecutive_errors > self.max_retries
    }

    pub fn current_delay(&self) -> Duration {
        self.current_delay
    }

    pub fn minimum_delay(&self) -> Duration {
        self.minimum_delay
    }

    pub fn maximum_delay(&self) -> Duration {
        self.maximum_delay
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn last_request_time(&self) -> Option<Instant> {
        self.last_request_time
    }

    fn scale_delay(&mut self, factor: f64) {
        let scaled = self.current_delay.as_secs_f64() * factor;
        let clamped = scaled.clamp(
            self.minimum_delay.as_secs_f64(),
            self.maximum_delay.as_secs_f64(),
        );
        self.current_delay = Duration::from_secs_f64(clamped)
            .clamp(self.minimum_delay, self.maximum_delay);
    }
}

/// A limiter shared between tasks.
///
/// The lock is held across the sleep so concurrent callers are spaced one
/// after another rather than all waking at once.
#[derive(Debug, Clone)]
pub struct SharedRateLimiter {
    inner: Arc<Mutex<AdaptiveRateLimiter>>,
}

impl SharedRateLimiter {
    pub fn new(limiter: AdaptiveRateLimiter) -> Self {
        Self {
            inner: Arc::new(Mutex::new(limiter)),
        }
    }

    /// See [`AdaptiveRateLimiter::wait`].
    pub async fn wait(&self) -> Duration {
        self.inner.lock().await.wait().await
    }

    /// See [`AdaptiveRateLimiter::adjust_for_response`].
    pub async fn adjust_for_response(&self, response_time: Duration, status: ResponseStatus) {
        self.inner
            .lock()
            .await
            .adjust_for_response(response_time, status);
    }

    /// See [`AdaptiveRateLimiter::reset`].
    pub async fn reset(&self) {
        self.inner.lock().await.reset();
    }

    /// Copy of the current limiter state.
    pub async fn snapshot(&self) -> AdaptiveRateLimiter {
        self.inner.lock().await.clone()
    }
}
