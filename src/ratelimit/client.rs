//! Throttled access to an external stats API.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::limiter::AdaptiveRateLimiter;
use super::status::ResponseStatus;
use crate::error::{MedallionError, Result};

/// One observed response from the external API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    /// How long the request took
    pub elapsed: Duration,
    /// HTTP status code
    pub status: u16,
    /// Decoded payload, when the response carried one
    pub body: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn classify(&self) -> ResponseStatus {
        ResponseStatus::from_code(self.status)
    }
}

/// The capability of issuing one request against a stats endpoint.
///
/// Implementations report transport failures as errors and every completed
/// HTTP exchange, successful or not, as an [`ApiResponse`].
#[async_trait]
pub trait StatsApi: Send + Sync {
    type Body: Send;

    async fn request(&self, endpoint: &str) -> Result<ApiResponse<Self::Body>>;
}

/// Wraps a [`StatsApi`] so every call waits on, and feeds back into, an
/// [`AdaptiveRateLimiter`].
pub struct ThrottledClient<A: StatsApi> {
    api: A,
    limiter: AdaptiveRateLimiter,
}

impl<A: StatsApi> ThrottledClient<A> {
    pub fn new(api: A, limiter: AdaptiveRateLimiter) -> Self {
        Self { api, limiter }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn limiter(&self) -> &AdaptiveRateLimiter {
        &self.limiter
    }

    /// Fetch an endpoint, retrying throttled, failed and unreachable attempts.
    ///
    /// Gives up once more than `max_retries` attempts in a row have failed.
    #[instrument(skip(self), fields(max_retries = self.limiter.max_retries()))]
    pub async fn fetch(&mut self, endpoint: &str) -> Result<ApiResponse<A::Body>> {
        let mut attempts = 0u32;
        let mut failures = 0u32;
        let mut last_status = None;

        loop {
            self.limiter.wait().await;
            attempts += 1;

            match self.api.request(endpoint).await {
                Ok(response) => {
                    let status = response.classify();
                    last_status = Some(response.status);
                    self.limiter.adjust_for_response(response.elapsed, status);
                    if !status.is_error() {
                        debug!(
                            attempts,
                            status = response.status,
                            elapsed_ms = response.elapsed.as_millis() as u64,
                            "Request completed"
                        );
                        return Ok(response);
                    }
                    debug!(attempts, status = response.status, "Request failed, will retry");
                }
                Err(err) => {
                    last_status = None;
                    self.limiter
                        .adjust_for_response(Duration::ZERO, ResponseStatus::ServerError);
                    debug!(attempts, error = %err, "Request errored, will retry");
                }
            }

            failures += 1;
            if failures > self.limiter.max_retries() {
                warn!(attempts, ?last_status, "Retries exhausted");
                return Err(MedallionError::RetriesExhausted {
                    endpoint: endpoint.to_string(),
                    attempts,
                    last_status,
                });
            }
        }
    }
}
