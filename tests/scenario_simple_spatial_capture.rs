//! End-to-end: a plain cross-exchange spread clears detection, risk, and
//! paper execution, and books a positive realized PnL net of fees.

use std::time::Instant;

use arbot::core::domain::{CircuitState, ExchangeId, OrderBook, PriceLevel, Symbol};
use arbot::core::execution::{self, ExecutionOutcome, Executor, ExecutorConfig, PaperExecutor};
use arbot::core::ledger::Portfolio;
use arbot::core::market::{MarketState, StalenessPolicy};
use arbot::core::risk::{AnomalyContext, EquitySnapshot, ExposureSnapshot, RiskConfig, RiskDecision, RiskManager};
use arbot::core::strategy::{Detector, DetectorContext, FeeSchedule, SpatialConfig, SpatialDetector};
use rust_decimal_macros::dec;

fn book(exchange: &str, bid: rust_decimal::Decimal, ask: rust_decimal::Decimal, depth: rust_decimal::Decimal) -> OrderBook {
    OrderBook::new(
        ExchangeId::from(exchange),
        Symbol::from("BTC/USDT"),
        vec![PriceLevel::new(bid, depth)],
        vec![PriceLevel::new(ask, depth)],
        chrono::Utc::now(),
        Instant::now(),
        Some(1),
    )
    .unwrap()
}

#[tokio::test]
async fn spread_above_threshold_is_captured_and_books_a_profit() {
    let market = MarketState::new(StalenessPolicy::default());
    market.publish(book("binance", dec!(99.9), dec!(100.00), dec!(20)));
    market.publish(book("kraken", dec!(100.50), dec!(100.60), dec!(20)));

    let mut fees = FeeSchedule::new(dec!(0));
    fees.set(ExchangeId::from("binance"), dec!(0.10));
    fees.set(ExchangeId::from("kraken"), dec!(0.10));

    let symbols = vec![Symbol::from("BTC/USDT")];
    let ctx = DetectorContext { market: &market, symbols: &symbols, fees: &fees };
    let detector = SpatialDetector::new(SpatialConfig::default());

    let signals = detector.detect(&ctx);
    assert_eq!(signals.len(), 1, "a 0.5% gross spread net of 0.20% fees should clear the 0.25% threshold");
    let signal = &signals[0];
    assert_eq!(signal.net_spread_pct, dec!(0.28));
    assert_eq!(signal.legs[0].exchange, ExchangeId::from("binance"));
    assert_eq!(signal.legs[1].exchange, ExchangeId::from("kraken"));

    let risk = RiskManager::new(RiskConfig::default());
    let decision = risk.evaluate(signal, &ExposureSnapshot::default(), &EquitySnapshot::default(), &AnomalyContext::default(), &CircuitState::new(), chrono::Utc::now());
    assert_eq!(decision, RiskDecision::Approved { adjusted_notional_usd: signal.notional_usd, warning: None });

    let executor = PaperExecutor::new(&market, ExecutorConfig { paper_latency_ms: 0, paper_jitter_ms: 0, paper_taker_fee_pct: dec!(0.10), ..ExecutorConfig::default() });
    let report = executor.execute(signal).await.unwrap();
    assert_eq!(report.outcome, ExecutionOutcome::Filled);

    let portfolio = Portfolio::new(dec!(10_000));
    let realized_pnl = execution::realized_pnl_usd(&report.orders);
    portfolio.record_realized_pnl(realized_pnl);

    assert!(realized_pnl > dec!(0), "expected a net profit, got {realized_pnl}");
    assert_eq!(portfolio.drawdown_usd(), dec!(0));
}
