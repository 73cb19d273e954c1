//! Alert coalescing: collapses repeated alerts of the same kind within a
//! throttle window into one, so a flapping connector doesn't page anyone
//! once per reconnect attempt.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{error, warn};

/// Severity of an [`Alert`], mirroring how loud the corresponding log line is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSeverity {
    Warning,
    Critical,
}

#[derive(Debug, Clone)]
pub struct Alert {
    pub key: String,
    pub severity: AlertSeverity,
    pub message: String,
}

/// Throttles repeat alerts sharing a `key` to at most one emission per
/// `min_interval`; the suppressed count is logged on the next emission so
/// nothing is silently dropped.
pub struct AlertSink {
    last_emitted: DashMap<String, (Instant, u32)>,
    min_interval: Duration,
}

impl AlertSink {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_emitted: DashMap::new(),
            min_interval,
        }
    }

    /// Emit `alert`, or bump its suppressed count if still inside the
    /// throttle window for its key.
    pub fn emit(&self, alert: Alert) {
        let now = Instant::now();
        let mut should_log = true;
        let mut suppressed = 0;

        self.last_emitted
            .entry(alert.key.clone())
            .and_modify(|(last, count)| {
                if now.duration_since(*last) < self.min_interval {
                    *count += 1;
                    should_log = false;
                } else {
                    suppressed = *count;
                    *last = now;
                    *count = 0;
                }
            })
            .or_insert((now, 0));

        if should_log {
            match alert.severity {
                AlertSeverity::Warning => warn!(key = %alert.key, suppressed, "{}", alert.message),
                AlertSeverity::Critical => error!(key = %alert.key, suppressed, "{}", alert.message),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_alert_for_a_key_always_emits() {
        let sink = AlertSink::new(Duration::from_secs(60));
        sink.emit(Alert { key: "conn:binance".into(), severity: AlertSeverity::Warning, message: "disconnected".into() });
        assert_eq!(sink.last_emitted.len(), 1);
    }

    #[test]
    fn repeat_within_window_is_suppressed_not_panicking() {
        let sink = AlertSink::new(Duration::from_secs(60));
        let alert = || Alert { key: "conn:binance".into(), severity: AlertSeverity::Warning, message: "disconnected".into() };
        sink.emit(alert());
        sink.emit(alert());
        sink.emit(alert());
        let (_, count) = *sink.last_emitted.get("conn:binance").unwrap();
        assert_eq!(count, 2);
    }
}
