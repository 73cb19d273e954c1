//! Outbound REST rate limiting.
//!
//! Three policies are supported, selected per-exchange by config:
//! `weight` (rolling-window cost budget), `count` (rolling-window
//! call budget, cost 1), and `token_bucket` (refill at a fixed rate up to a
//! capacity). On exhaustion, callers block until capacity frees up or their
//! deadline expires — callers never see a rate-limit error, only added
//! latency.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::core::exchange::ConnectorError;

/// Configuration for one exchange's rate limiter, deserialized from
/// `exchanges.<name>.rate_limit` in the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RateLimitPolicy {
    Weight { limit: u32, window_ms: u64 },
    Count { limit: u32, window_ms: u64 },
    TokenBucket { capacity: u32, refill_rate_per_s: f64 },
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::Count {
            limit: 1200,
            window_ms: 60_000,
        }
    }
}

enum Inner {
    Window {
        limit: u32,
        window: Duration,
        /// (timestamp, cost) of calls still inside the rolling window.
        calls: VecDeque<(Instant, u32)>,
    },
    TokenBucket {
        capacity: f64,
        refill_rate_per_s: f64,
        tokens: f64,
        last_refill: Instant,
    },
}

/// Shared, FIFO-on-waiters rate limiter for one exchange's REST surface.
pub struct RateLimiter {
    inner: Mutex<Inner>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(policy: RateLimitPolicy) -> Self {
        let inner = match policy {
            RateLimitPolicy::Weight { limit, window_ms } | RateLimitPolicy::Count { limit, window_ms } => {
                Inner::Window {
                    limit,
                    window: Duration::from_millis(window_ms),
                    calls: VecDeque::new(),
                }
            }
            RateLimitPolicy::TokenBucket {
                capacity,
                refill_rate_per_s,
            } => Inner::TokenBucket {
                capacity: f64::from(capacity),
                refill_rate_per_s,
                tokens: f64::from(capacity),
                last_refill: Instant::now(),
            },
        };
        Self { inner: Mutex::new(inner) }
    }

    /// Acquire `cost` units of capacity (1 for `count`/`token_bucket` calls;
    /// the endpoint's declared weight for `weight` policy calls), blocking
    /// until available or until `deadline` elapses.
    pub async fn acquire(&self, cost: u32, deadline: Instant) -> Result<(), ConnectorError> {
        loop {
            let wait = {
                let mut guard = self.inner.lock().await;
                match &mut *guard {
                    Inner::Window { limit, window, calls } => {
                        let now = Instant::now();
                        while calls.front().is_some_and(|(ts, _)| now.duration_since(*ts) >= *window) {
                            calls.pop_front();
                        }
                        let used: u32 = calls.iter().map(|(_, c)| *c).sum();
                        if used + cost <= *limit {
                            calls.push_back((now, cost));
                            None
                        } else {
                            let oldest = calls.front().map_or(*window, |(ts, _)| *window - now.duration_since(*ts));
                            Some(oldest)
                        }
                    }
                    Inner::TokenBucket {
                        capacity,
                        refill_rate_per_s,
                        tokens,
                        last_refill,
                    } => {
                        let now = Instant::now();
                        let elapsed = now.duration_since(*last_refill).as_secs_f64();
                        *tokens = (*tokens + elapsed * *refill_rate_per_s).min(*capacity);
                        *last_refill = now;

                        if *tokens >= f64::from(cost) {
                            *tokens -= f64::from(cost);
                            None
                        } else {
                            let deficit = f64::from(cost) - *tokens;
                            Some(Duration::from_secs_f64(deficit / *refill_rate_per_s))
                        }
                    }
                }
            };

            match wait {
                None => return Ok(()),
                Some(delay) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(ConnectorError::Timeout);
                    }
                    let capped = delay.min(deadline - now);
                    sleep(capped).await;
                }
            }
        }
    }
}
