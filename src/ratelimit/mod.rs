//! Adaptive throttling of outbound API calls.

mod client;
mod limiter;
mod status;

pub use client::{ApiResponse, StatsApi, ThrottledClient};
pub use limiter::{AdaptiveRateLimiter, SharedRateLimiter};
pub use status::ResponseStatus;
