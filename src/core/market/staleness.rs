//! Staleness policy: evaluated at read time, not at write time.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A snapshot is treated as absent if its `event_ts` is older than
/// `stale_threshold_seconds`, or if ingress-to-now latency exceeds
/// `max_latency_ms`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StalenessPolicy {
    #[serde(default = "default_stale_threshold_seconds")]
    pub stale_threshold_seconds: u64,
    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,
}

const fn default_stale_threshold_seconds() -> u64 {
    30
}
const fn default_max_latency_ms() -> u64 {
    100
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            stale_threshold_seconds: default_stale_threshold_seconds(),
            max_latency_ms: default_max_latency_ms(),
        }
    }
}

impl StalenessPolicy {
    /// `true` iff a snapshot with the given event time and ingress instant
    /// is still fresh as of `now`.
    #[must_use]
    pub fn is_fresh(&self, event_ts: DateTime<Utc>, ingress_ts: Instant, now: DateTime<Utc>, now_instant: Instant) -> bool {
        let age = now.signed_duration_since(event_ts);
        if age.num_seconds() < 0 || age.num_seconds() as u64 > self.stale_threshold_seconds {
            return false;
        }
        let latency_ms = now_instant.saturating_duration_since(ingress_ts).as_millis();
        latency_ms <= u128::from(self.max_latency_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn fresh_snapshot_passes() {
        let policy = StalenessPolicy::default();
        let now_instant = Instant::now();
        let now = Utc::now();
        assert!(policy.is_fresh(now, now_instant, now, now_instant));
    }

    #[test]
    fn stale_event_ts_fails() {
        let policy = StalenessPolicy::default();
        let now_instant = Instant::now();
        let now = Utc::now();
        let old = now - Duration::seconds(35);
        assert!(!policy.is_fresh(old, now_instant, now, now_instant));
    }
}
