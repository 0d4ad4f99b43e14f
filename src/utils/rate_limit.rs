// src/utils/rate_limit.rs

//! Outbound request ceiling.
//!
//! Every network call goes through [`RateLimiter::admit`]. The limiter keeps
//! the instants of the last `max_requests` admissions; once that many fall
//! inside the trailing window the caller sleeps until the oldest one ages
//! out, plus a safety margin. Admissions are serialized through an async
//! mutex, so callers queue behind a sleeping caller instead of spinning.
//!
//! State is process-local. A restart begins with an empty window.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

use crate::models::RateLimitConfig;

/// At most `max_requests` admissions inside any `window`.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    margin: Duration,
    admitted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter. A ceiling of zero is treated as one.
    pub fn new(max_requests: usize, window: Duration, margin: Duration) -> Self {
        let max_requests = max_requests.max(1);
        Self {
            max_requests,
            window,
            margin,
            admitted: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, config.window(), config.margin())
    }

    /// Wait until one more request may start, then record it.
    ///
    /// Returns how long the caller was suspended.
    pub async fn admit(&self) -> Duration {
        let mut admitted = self.admitted.lock().await;
        let started = Instant::now();

        loop {
            let now = Instant::now();
            while admitted
                .front()
                .is_some_and(|t| now.duration_since(*t) >= self.window)
            {
                admitted.pop_front();
            }

            if admitted.len() < self.max_requests {
                admitted.push_back(now);
                return now.duration_since(started);
            }

            let Some(oldest) = admitted.front().copied() else {
                continue;
            };
            let resume = oldest + self.window + self.margin;
            log::info!(
                "Request ceiling of {} per {}s reached, waiting {}s",
                self.max_requests,
                self.window.as_secs(),
                resume.saturating_duration_since(now).as_secs()
            );
            sleep_until(resume).await;
        }
    }

    /// Admissions currently inside the trailing window.
    pub async fn in_window(&self) -> usize {
        let admitted = self.admitted.lock().await;
        let now = Instant::now();
        admitted
            .iter()
            .filter(|t| now.duration_since(**t) < self.window)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const WINDOW: Duration = Duration::from_secs(70);
    const MARGIN: Duration = Duration::from_secs(10);

    #[tokio::test(start_paused = true)]
    async fn test_admits_immediately_under_ceiling() {
        let limiter = RateLimiter::new(3, WINDOW, MARGIN);
        for _ in 0..3 {
            assert_eq!(limiter.admit().await, Duration::ZERO);
        }
        assert_eq!(limiter.in_window().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_remaining_window_plus_margin() {
        let limiter = RateLimiter::new(2, WINDOW, MARGIN);
        let start = Instant::now();

        limiter.admit().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        limiter.admit().await;

        let waited = limiter.admit().await;
        assert_eq!(waited, Duration::from_secs(75));
        assert_eq!(start.elapsed(), WINDOW + MARGIN);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_expiry_resets_count() {
        let limiter = RateLimiter::new(2, WINDOW, MARGIN);
        limiter.admit().await;
        limiter.admit().await;

        tokio::time::sleep(WINDOW).await;
        assert_eq!(limiter.in_window().await, 0);
        assert_eq!(limiter.admit().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_window_exceeds_ceiling() {
        let limit = 4;
        let limiter = RateLimiter::new(limit, WINDOW, MARGIN);
        let mut times = Vec::new();

        // Irregular gaps, including bursts right at window boundaries.
        let gaps = [0, 0, 1, 68, 2, 0, 0, 30, 45, 0, 0, 0, 0, 71, 0, 3, 0, 0, 0, 0];
        for gap in gaps {
            tokio::time::sleep(Duration::from_secs(gap)).await;
            limiter.admit().await;
            times.push(Instant::now());
        }

        for (i, t) in times.iter().enumerate() {
            let inside = times[i..]
                .iter()
                .take_while(|u| u.duration_since(*t) < WINDOW)
                .count();
            assert!(inside <= limit, "window from admission {i} holds {inside}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_limiter_serializes_callers() {
        let limiter = Arc::new(RateLimiter::new(2, WINDOW, Duration::ZERO));
        let mut handles = Vec::new();
        for _ in 0..6 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.admit().await;
                Instant::now()
            }));
        }

        let mut times = Vec::new();
        for handle in handles {
            times.push(handle.await.unwrap());
        }
        times.sort();

        for pair in times.windows(3) {
            assert!(pair[2].duration_since(pair[0]) >= WINDOW);
        }
    }
}
