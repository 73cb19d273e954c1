//! In-memory portfolio view: per-asset/per-exchange exposure, realized PnL,
//! and the high-water-mark drawdown feed the risk manager's Position Limits
//! and Drawdown Monitor stages.

use std::collections::HashMap;

use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::core::domain::ExchangeId;
use crate::core::risk::{EquitySnapshot, ExposureSnapshot};

struct Inner {
    exposure_by_asset: HashMap<String, Decimal>,
    exposure_by_exchange: HashMap<ExchangeId, Decimal>,
    total_exposure_usd: Decimal,
    realized_pnl_usd: Decimal,
    daily_pnl_usd: Decimal,
    daily_start_equity_usd: Decimal,
    high_water_mark_usd: Decimal,
    current_equity_usd: Decimal,
}

/// Tracks open exposure and realized PnL across every exchange. All state
/// lives behind a single lock: updates are infrequent relative to market
/// data, so there is no need for the sharded approach `MarketState` uses.
pub struct Portfolio {
    inner: Mutex<Inner>,
}

impl Portfolio {
    #[must_use]
    pub fn new(starting_equity_usd: Decimal) -> Self {
        Self {
            inner: Mutex::new(Inner {
                exposure_by_asset: HashMap::new(),
                exposure_by_exchange: HashMap::new(),
                total_exposure_usd: Decimal::ZERO,
                realized_pnl_usd: Decimal::ZERO,
                daily_pnl_usd: Decimal::ZERO,
                daily_start_equity_usd: starting_equity_usd,
                high_water_mark_usd: starting_equity_usd,
                current_equity_usd: starting_equity_usd,
            }),
        }
    }

    /// Record a change in notional exposure for `asset` on `exchange`
    /// (positive = opened, negative = closed/flattened).
    pub fn adjust_exposure(&self, asset: &str, exchange: &ExchangeId, delta_usd: Decimal) {
        let mut inner = self.inner.lock();
        let asset_entry = inner.exposure_by_asset.entry(asset.to_string()).or_insert(Decimal::ZERO);
        *asset_entry += delta_usd;
        let exchange_entry = inner.exposure_by_exchange.entry(exchange.clone()).or_insert(Decimal::ZERO);
        *exchange_entry += delta_usd;
        inner.total_exposure_usd += delta_usd;
    }

    /// Record realized PnL from a closed round trip, updating equity and
    /// the high-water mark.
    pub fn record_realized_pnl(&self, pnl_usd: Decimal) {
        let mut inner = self.inner.lock();
        inner.realized_pnl_usd += pnl_usd;
        inner.daily_pnl_usd += pnl_usd;
        inner.current_equity_usd += pnl_usd;
        if inner.current_equity_usd > inner.high_water_mark_usd {
            inner.high_water_mark_usd = inner.current_equity_usd;
        }
    }

    /// Snapshot of per-asset exposure and total exposure, for status reporting.
    #[must_use]
    pub fn exposure_snapshot(&self) -> (HashMap<String, Decimal>, Decimal) {
        let inner = self.inner.lock();
        (inner.exposure_by_asset.clone(), inner.total_exposure_usd)
    }

    /// Full exposure snapshot by asset, exchange, and total, for the risk
    /// manager's Position Limits stage.
    #[must_use]
    pub fn exposure_full_snapshot(&self) -> ExposureSnapshot {
        let inner = self.inner.lock();
        ExposureSnapshot {
            by_asset: inner.exposure_by_asset.clone(),
            by_exchange: inner.exposure_by_exchange.clone(),
            total_usd: inner.total_exposure_usd,
        }
    }

    /// Equity and drawdown inputs for the risk manager's Drawdown Monitor stage.
    #[must_use]
    pub fn equity_snapshot(&self) -> EquitySnapshot {
        let inner = self.inner.lock();
        EquitySnapshot {
            daily_pnl_usd: inner.daily_pnl_usd,
            daily_start_equity_usd: inner.daily_start_equity_usd,
            current_equity_usd: inner.current_equity_usd,
            high_water_mark_usd: inner.high_water_mark_usd,
        }
    }

    #[must_use]
    pub fn daily_pnl_usd(&self) -> Decimal {
        self.inner.lock().daily_pnl_usd
    }

    #[must_use]
    pub fn drawdown_usd(&self) -> Decimal {
        let inner = self.inner.lock();
        (inner.high_water_mark_usd - inner.current_equity_usd).max(Decimal::ZERO)
    }

    #[must_use]
    pub fn drawdown_pct(&self) -> Decimal {
        let inner = self.inner.lock();
        if inner.high_water_mark_usd <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (inner.high_water_mark_usd - inner.current_equity_usd).max(Decimal::ZERO) / inner.high_water_mark_usd * Decimal::from(100)
    }

    /// Called at UTC day rollover; realized and unrealized totals persist,
    /// only the daily counter and the daily starting-equity baseline reset.
    pub fn reset_daily(&self) {
        let mut inner = self.inner.lock();
        inner.daily_pnl_usd = Decimal::ZERO;
        inner.daily_start_equity_usd = inner.current_equity_usd;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn exchange(name: &str) -> ExchangeId {
        ExchangeId::from(name)
    }

    #[test]
    fn adjust_exposure_tracks_per_asset_exchange_and_total() {
        let portfolio = Portfolio::new(dec!(10000));
        portfolio.adjust_exposure("BTC", &exchange("binance"), dec!(500));
        portfolio.adjust_exposure("ETH", &exchange("kraken"), dec!(200));
        let snapshot = portfolio.exposure_full_snapshot();
        assert_eq!(snapshot.by_asset["BTC"], dec!(500));
        assert_eq!(snapshot.by_exchange[&exchange("binance")], dec!(500));
        assert_eq!(snapshot.by_exchange[&exchange("kraken")], dec!(200));
        assert_eq!(snapshot.total_usd, dec!(700));
    }

    #[test]
    fn high_water_mark_only_increases() {
        let portfolio = Portfolio::new(dec!(10000));
        portfolio.record_realized_pnl(dec!(500));
        portfolio.record_realized_pnl(dec!(-800));
        assert_eq!(portfolio.drawdown_usd(), dec!(800));
    }

    #[test]
    fn reset_daily_clears_the_daily_counter_and_rebases_the_start_equity() {
        let portfolio = Portfolio::new(dec!(10000));
        portfolio.record_realized_pnl(dec!(-100));
        assert_eq!(portfolio.daily_pnl_usd(), dec!(-100));
        portfolio.reset_daily();
        assert_eq!(portfolio.daily_pnl_usd(), dec!(0));
        assert_eq!(portfolio.drawdown_usd(), dec!(100));
        assert_eq!(portfolio.equity_snapshot().daily_start_equity_usd, dec!(9900));
    }
}
