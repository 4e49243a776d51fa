use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use nba_medallion::config::RateLimiterConfig;
use nba_medallion::error::{MedallionError, Result};
use nba_medallion::ratelimit::{AdaptiveRateLimiter, ApiResponse, StatsApi, ThrottledClient};
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

/// Stands in for the stats API, replaying canned status codes and recording
/// when each request arrived.
struct FakeStatsApi {
    statuses: Mutex<VecDeque<u16>>,
    arrivals: Mutex<Vec<Instant>>,
}

impl FakeStatsApi {
    fn new(statuses: &[u16]) -> Self {
        Self {
            statuses: Mutex::new(statuses.iter().copied().collect()),
            arrivals: Mutex::new(Vec::new()),
        }
    }

    fn gaps(&self) -> Vec<Duration> {
        let arrivals = self.arrivals.lock().unwrap();
        arrivals.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

#[async_trait]
impl StatsApi for FakeStatsApi {
    type Body = serde_json::Value;

    async fn request(&self, endpoint: &str) -> Result<ApiResponse<serde_json::Value>> {
        self.arrivals.lock().unwrap().push(Instant::now());
        let status = self.statuses.lock().unwrap().pop_front().unwrap_or(200);
        Ok(ApiResponse {
            elapsed: Duration::from_millis(120),
            status,
            body: (status == 200).then(|| serde_json::json!({ "resource": endpoint })),
        })
    }
}

fn limiter(max_retries: u32) -> AdaptiveRateLimiter {
    AdaptiveRateLimiter::new(&RateLimiterConfig {
        minimum_delay_secs: 1.0,
        maximum_delay_secs: 60.0,
        max_retries,
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_backoff_spacing_follows_responses() {
    let mut client = ThrottledClient::new(FakeStatsApi::new(&[429, 429, 503, 200]), limiter(5));

    let response = assert_ok!(client.fetch("leaguegamelog").await);

    assert_eq!(response.body.unwrap()["resource"], "leaguegamelog");
    let gaps = client.api().gaps();
    assert_eq!(gaps.len(), 3);
    // 1s doubled twice, then multiplied by 1.5.
    assert!(gaps[0] >= Duration::from_secs(2) && gaps[0] < Duration::from_millis(2010));
    assert!(gaps[1] >= Duration::from_secs(4) && gaps[1] < Duration::from_millis(4010));
    assert!(gaps[2] >= Duration::from_secs(6) && gaps[2] < Duration::from_millis(6010));
    assert_eq!(client.limiter().consecutive_errors(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_consecutive_fetches_respect_minimum_delay() {
    let mut client = ThrottledClient::new(FakeStatsApi::new(&[]), limiter(5));

    for endpoint in ["teams", "players", "scoreboard"] {
        assert_ok!(client.fetch(endpoint).await);
    }

    for gap in client.api().gaps() {
        assert!(gap >= Duration::from_secs(1));
    }
    assert_eq!(client.limiter().current_delay(), Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_surface_error() {
    let mut client = ThrottledClient::new(FakeStatsApi::new(&[500, 500, 500, 500]), limiter(1));

    let err = assert_err!(client.fetch("boxscore").await);

    assert!(matches!(
        err,
        MedallionError::RetriesExhausted { attempts: 2, last_status: Some(500), .. }
    ));
    assert!(client.limiter().should_give_up());
}
