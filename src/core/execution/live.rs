//! Live executor: submits every leg concurrently to its exchange connector
//! under a shared deadline, then reconciles the results.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::core::domain::{ExchangeId, Order, OrderId, OrderType, Signal, SignalId, SignalLeg};
use crate::core::exchange::{Connector, OrderSpec};
use crate::core::execution::paper::classify;
use crate::core::execution::{ExecutionError, ExecutionOutcome, ExecutionReport, Executor, ExecutorConfig};

/// Drives a signal's legs against real exchange connectors.
pub struct LiveExecutor {
    connectors: HashMap<ExchangeId, Arc<dyn Connector>>,
    config: ExecutorConfig,
}

impl LiveExecutor {
    #[must_use]
    pub fn new(connectors: HashMap<ExchangeId, Arc<dyn Connector>>, config: ExecutorConfig) -> Self {
        Self { connectors, config }
    }

    fn connector(&self, exchange: &ExchangeId) -> Result<&Arc<dyn Connector>, ExecutionError> {
        self.connectors
            .get(exchange)
            .ok_or_else(|| ExecutionError::UnknownExchange(exchange.to_string()))
    }

    async fn submit_leg(&self, signal_id: SignalId, leg: &SignalLeg) -> Result<Order, ExecutionError> {
        let connector = self.connector(&leg.exchange)?;
        let mut order = Order::new(
            signal_id,
            leg.exchange.clone(),
            leg.symbol.clone(),
            leg.side,
            OrderType::Ioc,
            leg.max_qty,
            leg.target_price,
        );

        let spec = OrderSpec {
            symbol: leg.symbol.clone(),
            side: leg.side,
            order_type: OrderType::Ioc,
            qty: leg.max_qty,
            price: leg.target_price,
            max_slippage_pct: None,
        };

        // A rejection at submission time must not abort the whole join: the
        // sibling leg may already be filled and need flattening, so this
        // leg settles as Failed instead of propagating the error.
        match connector.place_order(&signal_id.to_string(), spec).await {
            Ok(order_id) => self.poll_until_terminal(connector, order_id, &mut order).await,
            Err(err) => {
                warn!(exchange = %leg.exchange, error = %err, "order submission rejected");
                order.mark_failed();
            }
        }
        Ok(order)
    }

    async fn poll_until_terminal(&self, connector: &Arc<dyn Connector>, order_id: OrderId, order: &mut Order) {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(self.config.order_timeout_ms);
        loop {
            match connector.order_status(order_id).await {
                Ok(snapshot) => {
                    for fill in snapshot.fills {
                        order.apply_fill(fill);
                    }
                    if snapshot.state.is_terminal() {
                        order.state = snapshot.state;
                        return;
                    }
                }
                Err(err) => warn!(%order_id, error = %err, "order status poll failed"),
            }
            if tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
        }

        match connector.cancel_order(order_id).await {
            Ok(_) => order.mark_cancelled(),
            Err(err) => {
                warn!(%order_id, error = %err, "cancel on timeout failed, order may still be live");
                order.mark_failed();
            }
        }
    }

    /// Offset an unwanted filled position by submitting an opposite-side IOC
    /// order for `qty` on the same exchange and symbol, polled to a terminal
    /// state so its fills are available for PnL accounting.
    async fn flatten(&self, order: &Order) -> Option<Order> {
        let connector = self.connector(&order.exchange).ok()?;
        let mut counter = Order::new(
            order.signal_id,
            order.exchange.clone(),
            order.symbol.clone(),
            order.side.opposite(),
            OrderType::Ioc,
            order.filled_qty,
            order.requested_price,
        );
        let spec = OrderSpec {
            symbol: counter.symbol.clone(),
            side: counter.side,
            order_type: OrderType::Ioc,
            qty: counter.requested_qty,
            price: counter.requested_price,
            max_slippage_pct: None,
        };
        match connector.place_order("flatten", spec).await {
            Ok(id) => {
                self.poll_until_terminal(connector, id, &mut counter).await;
                info!(original_order = %order.id, flatten_order = %counter.id, "flattened unwanted position");
                Some(counter)
            }
            Err(err) => {
                warn!(original_order = %order.id, error = %err, "flatten order failed");
                None
            }
        }
    }

    /// Attempt to close the gap on the leg that filled the least, by
    /// submitting one more IOC order for its unfilled remainder, polled to a
    /// terminal state so its fills count toward realized PnL.
    async fn hedge_shortfall(&self, orders: &[Order]) -> Option<Order> {
        let laggard = orders
            .iter()
            .filter(|o| o.requested_qty > Decimal::ZERO)
            .min_by_key(|o| o.filled_qty / o.requested_qty)?;
        let connector = self.connector(&laggard.exchange).ok()?;
        let mut counter = Order::new(
            laggard.signal_id,
            laggard.exchange.clone(),
            laggard.symbol.clone(),
            laggard.side,
            OrderType::Ioc,
            laggard.remaining_qty(),
            laggard.requested_price,
        );
        let spec = OrderSpec {
            symbol: counter.symbol.clone(),
            side: counter.side,
            order_type: OrderType::Ioc,
            qty: counter.requested_qty,
            price: counter.requested_price,
            max_slippage_pct: None,
        };
        match connector.place_order("hedge", spec).await {
            Ok(id) => {
                self.poll_until_terminal(connector, id, &mut counter).await;
                Some(counter)
            }
            Err(err) => {
                warn!(leg_exchange = %laggard.exchange, error = %err, "hedge order failed");
                None
            }
        }
    }
}

#[async_trait]
impl Executor for LiveExecutor {
    async fn execute(&self, signal: &Signal) -> Result<ExecutionReport, ExecutionError> {
        let futs = signal.legs.iter().map(|leg| self.submit_leg(signal.id, leg));
        let results = futures_util::future::join_all(futs).await;
        let mut orders = Vec::with_capacity(results.len());
        for result in results {
            orders.push(result?);
        }

        let outcome = match classify(&orders) {
            ExecutionOutcome::LegsFailed { .. } => {
                let mut flattened = Vec::new();
                let needs_flatten: Vec<Order> = orders.iter().filter(|o| o.filled_qty > Decimal::ZERO).cloned().collect();
                for order in &needs_flatten {
                    if let Some(counter) = self.flatten(order).await {
                        flattened.push(counter.id);
                        orders.push(counter);
                    }
                }
                ExecutionOutcome::LegsFailed { flattened_order_ids: flattened }
            }
            ExecutionOutcome::PartialImbalance { .. } => {
                let hedge_order_id = match self.hedge_shortfall(&orders).await {
                    Some(counter) => {
                        let id = counter.id;
                        orders.push(counter);
                        Some(id)
                    }
                    None => None,
                };
                ExecutionOutcome::PartialImbalance { hedge_order_id }
            }
            other => other,
        };

        Ok(ExecutionReport { signal_id: signal.id, orders, outcome })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{Side as DomainSide, SignalId, SignalLeg, SignalStatus, StrategyKind, Symbol};
    use crate::core::exchange::simulated::{OrderOutcome, SimulatedConnector};
    use rust_decimal_macros::dec;

    fn signal(legs: Vec<SignalLeg>) -> Signal {
        Signal {
            id: SignalId::new(),
            strategy: StrategyKind::Spatial,
            legs,
            gross_spread_pct: dec!(0.2),
            net_spread_pct: dec!(0.15),
            estimated_pnl_usd: dec!(1),
            notional_usd: dec!(100),
            detected_ts: chrono::Utc::now(),
            status: SignalStatus::Detected,
        }
    }

    fn leg(exchange: &str, side: DomainSide) -> SignalLeg {
        SignalLeg {
            exchange: ExchangeId::from(exchange),
            symbol: Symbol::from("BTC/USDT"),
            side,
            target_price: dec!(100),
            max_qty: dec!(1),
        }
    }

    #[tokio::test]
    async fn both_legs_fill_when_both_connectors_full_fill() {
        let a = Arc::new(SimulatedConnector::new("binance", vec![])) as Arc<dyn Connector>;
        let b = Arc::new(SimulatedConnector::new("kraken", vec![])) as Arc<dyn Connector>;
        let mut connectors: HashMap<ExchangeId, Arc<dyn Connector>> = HashMap::new();
        connectors.insert(ExchangeId::from("binance"), a);
        connectors.insert(ExchangeId::from("kraken"), b);

        let executor = LiveExecutor::new(connectors, ExecutorConfig { order_timeout_ms: 500, poll_interval_ms: 10, ..ExecutorConfig::default() });
        let sig = signal(vec![leg("binance", DomainSide::Buy), leg("kraken", DomainSide::Sell)]);

        let report = executor.execute(&sig).await.unwrap();
        assert_eq!(report.outcome, ExecutionOutcome::Filled);
    }

    #[tokio::test]
    async fn one_leg_rejected_flattens_the_other() {
        let binance = SimulatedConnector::new("binance", vec![]);
        let kraken = SimulatedConnector::new("kraken", vec![]);
        kraken.queue_outcome(OrderOutcome::Reject("no balance".into()));

        let mut connectors: HashMap<ExchangeId, Arc<dyn Connector>> = HashMap::new();
        connectors.insert(ExchangeId::from("binance"), Arc::new(binance));
        connectors.insert(ExchangeId::from("kraken"), Arc::new(kraken));

        let executor = LiveExecutor::new(connectors, ExecutorConfig { order_timeout_ms: 500, poll_interval_ms: 10, ..ExecutorConfig::default() });
        let sig = signal(vec![leg("binance", DomainSide::Buy), leg("kraken", DomainSide::Sell)]);

        let report = executor.execute(&sig).await.unwrap();
        assert!(matches!(report.outcome, ExecutionOutcome::LegsFailed { .. }));
    }
}
