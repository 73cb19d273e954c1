//! End-to-end: enough consecutive losing trades trips the circuit breaker,
//! the next signal is rejected regardless of its own profitability, and a
//! later signal clears again once the cooldown elapses.

use arbot::core::domain::{CircuitState, ExchangeId, Side, SignalId, SignalLeg, SignalStatus, StrategyKind, Symbol};
use arbot::core::risk::{AnomalyContext, EquitySnapshot, ExposureSnapshot, RiskConfig, RiskDecision, RiskManager, RiskRejectReason};
use rust_decimal_macros::dec;

fn profitable_signal() -> arbot::core::domain::Signal {
    arbot::core::domain::Signal {
        id: SignalId::new(),
        strategy: StrategyKind::Spatial,
        legs: vec![
            SignalLeg { exchange: ExchangeId::from("binance"), symbol: Symbol::from("BTC/USDT"), side: Side::Buy, target_price: dec!(100), max_qty: dec!(1) },
            SignalLeg { exchange: ExchangeId::from("kraken"), symbol: Symbol::from("BTC/USDT"), side: Side::Sell, target_price: dec!(101), max_qty: dec!(1) },
        ],
        gross_spread_pct: dec!(1.0),
        net_spread_pct: dec!(0.8),
        estimated_pnl_usd: dec!(8),
        notional_usd: dec!(100),
        detected_ts: chrono::Utc::now(),
        status: SignalStatus::Detected,
    }
}

/// Mirrors `AppState::record_trade_outcome`: a loss increments the streak
/// and trips the breaker once it reaches the configured threshold.
fn record_loss(circuit: &mut CircuitState, config: &RiskConfig, now: chrono::DateTime<chrono::Utc>) {
    circuit.consecutive_losses += 1;
    if circuit.consecutive_losses >= config.circuit_breaker_consecutive_losses {
        circuit.tripped_at = Some(now);
        circuit.cooldown_until = Some(now + chrono::Duration::seconds(config.circuit_breaker_cooldown_s));
    }
}

#[test]
fn tenth_consecutive_loss_trips_breaker_and_rejects_the_next_profitable_signal() {
    let config = RiskConfig { circuit_breaker_consecutive_losses: 10, circuit_breaker_cooldown_s: 900, ..RiskConfig::default() };
    let manager = RiskManager::new(config.clone());
    let mut circuit = CircuitState::new();
    let mut now = chrono::Utc::now();

    for _ in 0..10 {
        record_loss(&mut circuit, &config, now);
    }
    assert!(circuit.tripped_at.is_some(), "breaker should trip on the 10th consecutive loss");

    let decision = manager.evaluate(&profitable_signal(), &ExposureSnapshot::default(), &EquitySnapshot::default(), &AnomalyContext::default(), &circuit, now);
    assert!(matches!(decision, RiskDecision::Rejected(RiskRejectReason::CircuitBreakerTripped { .. })));

    now += chrono::Duration::seconds(config.circuit_breaker_cooldown_s + 1);
    let decision = manager.evaluate(&profitable_signal(), &ExposureSnapshot::default(), &EquitySnapshot::default(), &AnomalyContext::default(), &circuit, now);
    assert_eq!(
        decision,
        RiskDecision::Approved { adjusted_notional_usd: dec!(100), warning: None },
        "signal should clear again once the cooldown has elapsed"
    );
}
