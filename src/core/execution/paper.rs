//! Paper-mode executor: simulates fills by walking the live book instead of
//! talking to an exchange. The non-disruptive execution mode for dry runs.

use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;

use crate::core::domain::{BookSide, Fill, Order, OrderState, OrderType, Side};
use crate::core::execution::{ExecutionError, ExecutionOutcome, ExecutionReport, Executor, ExecutorConfig};
use crate::core::domain::Signal;
use crate::core::market::MarketState;

/// Fills orders against a live [`MarketState`] book walk, applying a
/// configurable taker fee and simulated latency. Used for Paper mode and for
/// scenario tests that need deterministic-but-realistic fill behavior
/// without a live connector.
pub struct PaperExecutor<'a> {
    market: &'a MarketState,
    config: ExecutorConfig,
}

impl<'a> PaperExecutor<'a> {
    #[must_use]
    pub fn new(market: &'a MarketState, config: ExecutorConfig) -> Self {
        Self { market, config }
    }

    async fn simulate_latency(&self) {
        let jitter_ms = if self.config.paper_jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.config.paper_jitter_ms)
        };
        let total_ms = self.config.paper_latency_ms + jitter_ms;
        if total_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(total_ms)).await;
        }
    }

    fn fill_leg(&self, leg: &crate::core::domain::SignalLeg, signal_id: crate::core::domain::SignalId) -> Result<Order, ExecutionError> {
        let book = self
            .market
            .snapshot_book(&leg.exchange, &leg.symbol)
            .ok_or_else(|| ExecutionError::NoBook(leg.symbol.to_string()))?;

        let mut order = Order::new(
            signal_id,
            leg.exchange.clone(),
            leg.symbol.clone(),
            leg.side,
            OrderType::Ioc,
            leg.max_qty,
            leg.target_price,
        );

        let book_side = match leg.side {
            Side::Buy => BookSide::Ask,
            Side::Sell => BookSide::Bid,
        };
        let levels: &[crate::core::domain::PriceLevel] = match book_side {
            BookSide::Bid => book.bids(),
            BookSide::Ask => book.asks(),
        };

        let mut remaining = leg.max_qty;
        let mut seq = 0u32;
        for level in levels {
            let acceptable = match leg.side {
                Side::Buy => level.price <= leg.target_price,
                Side::Sell => level.price >= leg.target_price,
            };
            if !acceptable || remaining <= Decimal::ZERO {
                break;
            }
            let take = level.qty.min(remaining);
            remaining -= take;
            seq += 1;
            let fee = take * level.price * self.config.paper_taker_fee_pct / Decimal::from(100);
            order.apply_fill(Fill {
                order_id: order.id,
                exchange_fill_id: format!("paper-{}-{}", order.id, seq),
                qty: take,
                price: level.price,
                fee,
                fee_asset: leg.symbol.quote().to_string(),
                ts: chrono::Utc::now(),
            });
        }

        if order.filled_qty == Decimal::ZERO {
            order.mark_failed();
        } else if order.remaining_qty() > Decimal::ZERO {
            order.state = OrderState::PartiallyFilled;
        }

        Ok(order)
    }
}

#[async_trait]
impl<'a> Executor for PaperExecutor<'a> {
    async fn execute(&self, signal: &Signal) -> Result<ExecutionReport, ExecutionError> {
        self.simulate_latency().await;

        let mut orders = Vec::with_capacity(signal.legs.len());
        for leg in &signal.legs {
            orders.push(self.fill_leg(leg, signal.id)?);
        }

        let outcome = classify(&orders);
        Ok(ExecutionReport { signal_id: signal.id, orders, outcome })
    }
}

/// Shared by [`PaperExecutor`] and [`crate::core::execution::LiveExecutor`]:
/// classify a set of settled orders into one of the five execution outcomes.
pub(crate) fn classify(orders: &[Order]) -> ExecutionOutcome {
    let fractions: Vec<Decimal> = orders
        .iter()
        .map(|o| if o.requested_qty > Decimal::ZERO { o.filled_qty / o.requested_qty } else { Decimal::ZERO })
        .collect();

    let all_full = fractions.iter().all(|f| *f >= Decimal::new(999, 3));
    let all_zero = fractions.iter().all(|f| *f <= Decimal::new(1, 3));

    if all_full {
        ExecutionOutcome::Filled
    } else if all_zero {
        ExecutionOutcome::AllFailed
    } else {
        let max_f = fractions.iter().copied().fold(Decimal::ZERO, Decimal::max);
        let min_f = fractions.iter().copied().fold(Decimal::ONE, Decimal::min);
        if (max_f - min_f).abs() <= Decimal::new(1, 2) {
            ExecutionOutcome::PartialBalanced
        } else if min_f <= Decimal::new(1, 3) {
            let flattened = orders
                .iter()
                .filter(|o| o.filled_qty > Decimal::ZERO)
                .map(|o| o.id)
                .collect();
            ExecutionOutcome::LegsFailed { flattened_order_ids: flattened }
        } else {
            ExecutionOutcome::PartialImbalance { hedge_order_id: None }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{ExchangeId, OrderBook, PriceLevel, SignalId, SignalLeg, SignalStatus, StrategyKind, Symbol};
    use crate::core::market::StalenessPolicy;
    use rust_decimal_macros::dec;
    use std::time::Instant;

    fn market_with_book(bid: Decimal, ask: Decimal, depth: Decimal) -> MarketState {
        let market = MarketState::new(StalenessPolicy::default());
        let book = OrderBook::new(
            ExchangeId::from("binance"),
            Symbol::from("BTC/USDT"),
            vec![PriceLevel::new(bid, depth)],
            vec![PriceLevel::new(ask, depth)],
            chrono::Utc::now(),
            Instant::now(),
            Some(1),
        )
        .unwrap();
        market.publish(book);
        market
    }

    fn one_leg_signal(exchange: &str, side: Side, target_price: Decimal, max_qty: Decimal) -> Signal {
        Signal {
            id: SignalId::new(),
            strategy: StrategyKind::Spatial,
            legs: vec![SignalLeg {
                exchange: ExchangeId::from(exchange),
                symbol: Symbol::from("BTC/USDT"),
                side,
                target_price,
                max_qty,
            }],
            gross_spread_pct: dec!(0.2),
            net_spread_pct: dec!(0.15),
            estimated_pnl_usd: dec!(1),
            notional_usd: max_qty * target_price,
            detected_ts: chrono::Utc::now(),
            status: SignalStatus::Detected,
        }
    }

    #[tokio::test]
    async fn fills_fully_when_depth_is_sufficient() {
        let market = market_with_book(dec!(99), dec!(100), dec!(5));
        let config = ExecutorConfig { paper_latency_ms: 0, paper_jitter_ms: 0, ..ExecutorConfig::default() };
        let executor = PaperExecutor::new(&market, config);
        let signal = one_leg_signal("binance", Side::Buy, dec!(100), dec!(1));

        let report = executor.execute(&signal).await.unwrap();
        assert_eq!(report.outcome, ExecutionOutcome::Filled);
        assert_eq!(report.orders[0].filled_qty, dec!(1));
    }

    #[tokio::test]
    async fn partially_fills_when_depth_is_thin() {
        let market = market_with_book(dec!(99), dec!(100), dec!(0.4));
        let config = ExecutorConfig { paper_latency_ms: 0, paper_jitter_ms: 0, ..ExecutorConfig::default() };
        let executor = PaperExecutor::new(&market, config);
        let signal = one_leg_signal("binance", Side::Buy, dec!(100), dec!(1));

        let report = executor.execute(&signal).await.unwrap();
        assert_eq!(report.orders[0].filled_qty, dec!(0.4));
        assert!(matches!(report.outcome, ExecutionOutcome::AllFailed | ExecutionOutcome::PartialBalanced));
    }

    #[tokio::test]
    async fn missing_book_surfaces_error() {
        let market = MarketState::new(StalenessPolicy::default());
        let executor = PaperExecutor::new(&market, ExecutorConfig::default());
        let signal = one_leg_signal("binance", Side::Buy, dec!(100), dec!(1));

        assert!(matches!(executor.execute(&signal).await, Err(ExecutionError::NoBook(_))));
    }
}
