//! End-to-end: a one-sided price dislocation wide enough to look like a
//! flash crash produces a detector signal, but the anomaly stage of the
//! risk pipeline rejects it before it ever reaches execution.

use std::collections::HashMap;
use std::time::Instant;

use arbot::core::domain::{CircuitState, ExchangeId, OrderBook, PriceLevel, Symbol};
use arbot::core::market::{MarketState, StalenessPolicy};
use arbot::core::risk::{AnomalyContext, EquitySnapshot, ExposureSnapshot, RiskConfig, RiskDecision, RiskManager, RiskRejectReason};
use arbot::core::strategy::{Detector, DetectorContext, FeeSchedule, SpatialConfig, SpatialDetector};
use rust_decimal_macros::dec;

fn book(exchange: &str, bid: rust_decimal::Decimal, ask: rust_decimal::Decimal) -> OrderBook {
    OrderBook::new(
        ExchangeId::from(exchange),
        Symbol::from("BTC/USDT"),
        vec![PriceLevel::new(bid, dec!(15))],
        vec![PriceLevel::new(ask, dec!(15))],
        chrono::Utc::now(),
        Instant::now(),
        Some(1),
    )
    .unwrap()
}

#[test]
fn a_one_sided_20pct_dislocation_is_detected_then_rejected_as_a_flash_crash() {
    let market = MarketState::new(StalenessPolicy::default());
    // One exchange craters from 100 to 80 while the rest hold steady.
    market.publish(book("binance", dec!(79.9), dec!(80.0)));
    market.publish(book("kraken", dec!(99.9), dec!(100.0)));

    let fees = FeeSchedule::new(dec!(0.0));
    let symbols = vec![Symbol::from("BTC/USDT")];
    let ctx = DetectorContext { market: &market, symbols: &symbols, fees: &fees };
    let detector = SpatialDetector::new(SpatialConfig::default());

    let signals = detector.detect(&ctx);
    assert_eq!(signals.len(), 1, "the detector has no notion of anomalies, it just sees a wide spread");
    let signal = &signals[0];
    assert!(signal.net_spread_pct > dec!(20), "buying the crashed leg and selling the stable one looks like a ~25% edge");

    // Cross-exchange median mid, the same reference the running system
    // would build from a fresh `snapshot_all` read.
    let mut median_price_by_symbol = HashMap::new();
    median_price_by_symbol.insert(Symbol::from("BTC/USDT"), dec!(89.95));
    let anomaly_ctx = AnomalyContext { median_price_by_symbol };

    let risk = RiskManager::new(RiskConfig::default());
    let decision = risk.evaluate(signal, &ExposureSnapshot::default(), &EquitySnapshot::default(), &anomaly_ctx, &CircuitState::new(), chrono::Utc::now());
    assert!(
        matches!(decision, RiskDecision::Rejected(RiskRejectReason::FlashCrash { .. })),
        "the anomaly stage must catch what the detector alone cannot: {decision:?}"
    );
}
