//! Circuit breaker state tracked by the risk manager.

use chrono::{DateTime, Utc};

/// Consecutive-loss circuit breaker state machine: Normal → Tripped on
/// reaching the configured loss limit; Tripped → Normal on cooldown elapsed
/// or operator reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitPhase {
    Normal,
    Tripped,
}

/// State backing [`CircuitPhase`]: the consecutive-loss counter and, while
/// tripped, the cooldown deadline.
#[derive(Debug, Clone, Copy)]
pub struct CircuitState {
    pub consecutive_losses: u32,
    pub tripped_at: Option<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl CircuitState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            consecutive_losses: 0,
            tripped_at: None,
            cooldown_until: None,
        }
    }

    #[must_use]
    pub fn phase(&self, now: DateTime<Utc>) -> CircuitPhase {
        match self.cooldown_until {
            Some(until) if now < until => CircuitPhase::Tripped,
            _ => CircuitPhase::Normal,
        }
    }
}

impl Default for CircuitState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn phase_is_normal_before_trip() {
        let state = CircuitState::new();
        assert_eq!(state.phase(Utc::now()), CircuitPhase::Normal);
    }

    #[test]
    fn phase_is_tripped_during_cooldown_and_normal_after() {
        let now = Utc::now();
        let state = CircuitState {
            consecutive_losses: 10,
            tripped_at: Some(now),
            cooldown_until: Some(now + Duration::minutes(5)),
        };
        assert_eq!(state.phase(now), CircuitPhase::Tripped);
        assert_eq!(state.phase(now + Duration::minutes(6)), CircuitPhase::Normal);
    }
}
