//! Single-exchange triangular arbitrage: three legs that round-trip back to
//! the starting asset.
//!
//! Paths are configured explicitly (three symbols plus a starting asset)
//! and closure is validated once, at construction, rather than attempting
//! to discover cycles from the available symbol universe at runtime.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::domain::{pct_of, Side, Signal, SignalId, SignalLeg, SignalStatus, StrategyKind, Symbol, TopOfBook};
use crate::core::strategy::traits::{Detector, DetectorContext};

#[derive(Debug, Clone, Deserialize)]
pub struct TriangularConfig {
    pub paths: Vec<PathSpec>,
    #[serde(default = "default_min_net_edge_pct")]
    pub min_net_edge_pct: Decimal,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default = "default_max_notional_usd")]
    pub max_notional_usd: Decimal,
}

const fn default_min_net_edge_pct() -> Decimal {
    Decimal::new(15, 2) // 0.15%
}
const fn default_cooldown_ms() -> u64 {
    2000
}
const fn default_max_notional_usd() -> Decimal {
    Decimal::new(500, 0)
}

/// Raw path configuration; validated into a [`ValidatedPath`] at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct PathSpec {
    pub exchange: crate::core::domain::ExchangeId,
    pub start_asset: String,
    pub legs: [Symbol; 3],
}

/// A configured path after closure validation: exactly three distinct
/// assets, each symbol sharing one asset with each of the other two, and a
/// confirmed round trip back to `start_asset`.
#[derive(Debug, Clone)]
struct ValidatedPath {
    spec: PathSpec,
}

/// Error returned when a configured path does not close into a triangle.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PathValidationError {
    #[error("path must name exactly 3 distinct assets across its legs, found {0}")]
    WrongAssetCount(usize),
    #[error("start asset {0} does not appear in any leg")]
    StartAssetNotInPath(String),
    #[error("legs do not form a closed triangle: {0}")]
    NotClosed(String),
}

fn validate(spec: &PathSpec) -> Result<ValidatedPath, PathValidationError> {
    let mut assets: Vec<&str> = Vec::with_capacity(6);
    for leg in &spec.legs {
        assets.push(leg.base());
        assets.push(leg.quote());
    }
    let mut unique: Vec<&str> = assets.clone();
    unique.sort_unstable();
    unique.dedup();
    if unique.len() != 3 {
        return Err(PathValidationError::WrongAssetCount(unique.len()));
    }
    if !assets.contains(&spec.start_asset.as_str()) {
        return Err(PathValidationError::StartAssetNotInPath(spec.start_asset.clone()));
    }
    // Each asset must appear in exactly two of the three legs for the
    // triangle to close: walk from start_asset through all three legs and
    // confirm we return to it.
    let mut current = spec.start_asset.clone();
    let mut used = [false; 3];
    for _ in 0..3 {
        let next_idx = spec
            .legs
            .iter()
            .enumerate()
            .find(|(i, leg)| !used[*i] && (leg.base() == current || leg.quote() == current));
        let Some((idx, leg)) = next_idx else {
            return Err(PathValidationError::NotClosed(format!("no unused leg touches {current}")));
        };
        used[idx] = true;
        current = if leg.base() == current { leg.quote().to_string() } else { leg.base().to_string() };
    }
    if current != spec.start_asset {
        return Err(PathValidationError::NotClosed(format!(
            "walk ended at {current}, expected {}",
            spec.start_asset
        )));
    }
    Ok(ValidatedPath { spec: spec.clone() })
}

struct CycleStep {
    symbol: Symbol,
    side: Side,
    price: Decimal,
}

impl ValidatedPath {
    /// Walk the three legs from `start_asset`, pulling top-of-book prices
    /// from `tops` (indexed by leg). Returns the net multiplicative edge
    /// (1.0 = break-even) and the concrete buy/sell steps taken, or `None`
    /// if any leg's book is unavailable or crossed.
    fn walk(&self, tops: &[Option<TopOfBook>; 3], taker_fee_pct: Decimal) -> Option<(Decimal, Vec<CycleStep>)> {
        let mut current = self.spec.start_asset.clone();
        let mut used = [false; 3];
        let mut product = Decimal::ONE;
        let mut steps = Vec::with_capacity(3);
        let fee_factor = Decimal::ONE - taker_fee_pct / Decimal::from(100);

        for _ in 0..3 {
            let (idx, leg) = self
                .spec
                .legs
                .iter()
                .enumerate()
                .find(|(i, leg)| !used[*i] && (leg.base() == current || leg.quote() == current))?;
            used[idx] = true;
            let top = tops[idx].as_ref()?;
            if top.is_crossed() {
                return None;
            }

            let (rate, side, price, next_asset) = if leg.quote() == current {
                // Spend quote, receive base: buy at the ask.
                (Decimal::ONE / top.best_ask, Side::Buy, top.best_ask, leg.base().to_string())
            } else {
                // Spend base, receive quote: sell at the bid.
                (top.best_bid, Side::Sell, top.best_bid, leg.quote().to_string())
            };

            product *= rate * fee_factor;
            steps.push(CycleStep { symbol: leg.clone(), side, price });
            current = next_asset;
        }

        (current == self.spec.start_asset).then_some((product, steps))
    }
}

/// Detects closed-loop triangular arbitrage on a single exchange.
pub struct TriangularDetector {
    paths: Vec<ValidatedPath>,
    config: TriangularConfig,
    last_signal: DashMap<usize, Instant>,
}

impl TriangularDetector {
    /// Validates every configured path up front; a misconfigured path is a
    /// startup error, not a runtime skip, since it almost always means a
    /// typo in the symbol list.
    pub fn new(config: TriangularConfig) -> Result<Self, PathValidationError> {
        let paths = config.paths.iter().map(validate).collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            paths,
            config,
            last_signal: DashMap::new(),
        })
    }

    fn in_cooldown(&self, path_idx: usize) -> bool {
        self.last_signal
            .get(&path_idx)
            .is_some_and(|ts| ts.elapsed() < Duration::from_millis(self.config.cooldown_ms))
    }
}

impl Detector for TriangularDetector {
    fn name(&self) -> &'static str {
        "triangular"
    }

    fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<Signal> {
        let mut signals = Vec::new();

        for (idx, path) in self.paths.iter().enumerate() {
            if self.in_cooldown(idx) {
                continue;
            }
            let tops: [Option<TopOfBook>; 3] = [
                ctx.market.snapshot(&path.spec.exchange, &path.spec.legs[0]),
                ctx.market.snapshot(&path.spec.exchange, &path.spec.legs[1]),
                ctx.market.snapshot(&path.spec.exchange, &path.spec.legs[2]),
            ];
            let fee_pct = ctx.fees.taker_fee_pct(&path.spec.exchange);
            let Some((product, steps)) = path.walk(&tops, fee_pct) else {
                continue;
            };

            let net_pct = (product - Decimal::ONE) * Decimal::from(100);
            if net_pct < self.config.min_net_edge_pct {
                continue;
            }

            let notional_usd = self.config.max_notional_usd;
            let legs = steps
                .into_iter()
                .map(|step| SignalLeg {
                    exchange: path.spec.exchange.clone(),
                    symbol: step.symbol,
                    side: step.side,
                    target_price: step.price,
                    max_qty: notional_usd / step.price,
                })
                .collect();

            signals.push(Signal {
                id: SignalId::new(),
                strategy: StrategyKind::Triangular,
                legs,
                gross_spread_pct: net_pct,
                net_spread_pct: net_pct,
                estimated_pnl_usd: pct_of(notional_usd, net_pct),
                notional_usd,
                detected_ts: chrono::Utc::now(),
                status: SignalStatus::Detected,
            });

            self.last_signal.insert(idx, Instant::now());
        }

        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{ExchangeId, OrderBook, PriceLevel};
    use crate::core::market::{MarketState, StalenessPolicy};
    use crate::core::strategy::traits::FeeSchedule;
    use rust_decimal_macros::dec;

    fn path_spec() -> PathSpec {
        PathSpec {
            exchange: ExchangeId::from("binance"),
            start_asset: "USDT".to_string(),
            legs: [Symbol::from("BTC/USDT"), Symbol::from("ETH/BTC"), Symbol::from("ETH/USDT")],
        }
    }

    #[test]
    fn validates_closed_triangle() {
        assert!(validate(&path_spec()).is_ok());
    }

    #[test]
    fn rejects_path_with_four_assets() {
        let bad = PathSpec {
            exchange: ExchangeId::from("binance"),
            start_asset: "USDT".to_string(),
            legs: [Symbol::from("BTC/USDT"), Symbol::from("ETH/BTC"), Symbol::from("SOL/USDT")],
        };
        assert_eq!(validate(&bad), Err(PathValidationError::WrongAssetCount(4)));
    }

    fn book(exchange: &str, symbol: &str, bid: Decimal, ask: Decimal) -> OrderBook {
        OrderBook::new(
            ExchangeId::from(exchange),
            Symbol::from(symbol),
            vec![PriceLevel::new(bid, dec!(10))],
            vec![PriceLevel::new(ask, dec!(10))],
            chrono::Utc::now(),
            Instant::now(),
            Some(1),
        )
        .unwrap()
    }

    #[test]
    fn detects_profitable_cycle() {
        let market = MarketState::new(StalenessPolicy::default());
        // 1 USDT -> 0.1 BTC -> 0.05 ETH -> 1.1 USDT: a clean 10% round trip.
        market.publish(book("binance", "BTC/USDT", dec!(9.9), dec!(10)));
        market.publish(book("binance", "ETH/BTC", dec!(1.98), dec!(2)));
        market.publish(book("binance", "ETH/USDT", dec!(22), dec!(22.1)));

        let config = TriangularConfig {
            paths: vec![path_spec()],
            min_net_edge_pct: dec!(0.01),
            cooldown_ms: 2000,
            max_notional_usd: dec!(500),
        };
        let detector = TriangularDetector::new(config).unwrap();
        let fees = FeeSchedule::new(dec!(0.0));
        let symbols = vec![];
        let ctx = DetectorContext { market: &market, symbols: &symbols, fees: &fees };

        let signals = detector.detect(&ctx);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].legs.len(), 3);
    }

    #[test]
    fn missing_book_produces_no_signal() {
        let market = MarketState::new(StalenessPolicy::default());
        market.publish(book("binance", "BTC/USDT", dec!(99.9), dec!(100)));

        let config = TriangularConfig {
            paths: vec![path_spec()],
            min_net_edge_pct: dec!(0.01),
            cooldown_ms: 2000,
            max_notional_usd: dec!(500),
        };
        let detector = TriangularDetector::new(config).unwrap();
        let fees = FeeSchedule::new(dec!(0.0));
        let symbols = vec![];
        let ctx = DetectorContext { market: &market, symbols: &symbols, fees: &fees };

        assert!(detector.detect(&ctx).is_empty());
    }
}
