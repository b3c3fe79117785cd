//! Rate limiters for calls against the shared external AQI source

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Gate awaited before every external lookup
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Wait until the next call is permitted and record it
    async fn acquire(&self);
}

/// Never waits. For tests and for local estimators.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLimiter;

#[async_trait]
impl RateLimiter for NoopLimiter {
    async fn acquire(&self) {}
}

/// Enforces a minimum delay between the starts of two consecutive calls
#[derive(Debug)]
pub struct FixedDelayLimiter {
    delay: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl FixedDelayLimiter {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_call: Mutex::new(None),
        }
    }
}

#[async_trait]
impl RateLimiter for FixedDelayLimiter {
    async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(last) = *last_call {
            let ready_at = last + self.delay;
            if ready_at > Instant::now() {
                debug!(
                    "Throttling lookup for {:.3}s",
                    (ready_at - Instant::now()).as_secs_f64()
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

/// Allows at most `max_requests` calls in any sliding `window`
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    request_times: Mutex<Vec<Instant>>,
}

impl SlidingWindowLimiter {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            request_times: Mutex::new(Vec::new()),
        }
    }

    /// E.g. the 60 calls/minute of a free API tier
    #[must_use]
    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Time until the next request is allowed, zero if one is allowed now
    pub async fn time_until_next_request(&self) -> Duration {
        let mut request_times = self.request_times.lock().await;
        self.wait_time(&mut request_times, Instant::now())
    }

    fn wait_time(&self, request_times: &mut Vec<Instant>, now: Instant) -> Duration {
        request_times.retain(|&time| now.duration_since(time) < self.window);
        if request_times.len() < self.max_requests {
            return Duration::ZERO;
        }
        request_times
            .first()
            .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
            .unwrap_or(Duration::ZERO)
    }
}

#[async_trait]
impl RateLimiter for SlidingWindowLimiter {
    async fn acquire(&self) {
        let mut request_times = self.request_times.lock().await;
        loop {
            let wait = self.wait_time(&mut request_times, Instant::now());
            if wait.is_zero() {
                break;
            }
            debug!("Rate window full, waiting {:.1}s", wait.as_secs_f64());
            tokio::time::sleep(wait).await;
        }
        request_times.push(Instant::now());
    }
}
