//! A deterministic, in-process connector used by Paper mode and tests.
//!
//! Talking to a real exchange needs live credentials and a network, so
//! `SimulatedConnector` stands in for any number of configured exchanges,
//! driven by a scripted queue of fill/reject/never-fill outcomes instead
//! of wire traffic.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::mpsc;

use crate::core::domain::{Balance, Fill, OrderId, OrderState, OrderType, Symbol};
use crate::core::exchange::{Connector, ConnectorError, ConnectorState, MarketEvent, OrderSnapshot, OrderSpec};

/// Scripted result for the next [`Connector::place_order`] call.
#[derive(Debug, Clone)]
pub enum OrderOutcome {
    /// Fill the full requested quantity at the requested price.
    FullFill,
    /// Fill only `qty`, leaving the remainder open until cancelled.
    PartialFill(Decimal),
    /// Reject the order outright, as if the exchange returned a 4xx.
    Reject(String),
    /// Accept the order but never fill or cancel it (forces the caller's
    /// `order_timeout` path).
    NeverFills,
}

struct TrackedOrder {
    state: OrderState,
    fills: Vec<Fill>,
    requested_qty: Decimal,
    price: Decimal,
}

/// In-process connector with scriptable order outcomes and a manual event feed.
pub struct SimulatedConnector {
    name: String,
    state: ConnectorState,
    tx: mpsc::Sender<MarketEvent>,
    rx: mpsc::Receiver<MarketEvent>,
    balances: Mutex<HashMap<String, Balance>>,
    outcomes: Mutex<VecDeque<OrderOutcome>>,
    orders: Mutex<HashMap<OrderId, TrackedOrder>>,
    next_fill_seq: Mutex<u64>,
}

impl SimulatedConnector {
    #[must_use]
    pub fn new(name: impl Into<String>, initial_events: Vec<MarketEvent>) -> Self {
        let (tx, rx) = mpsc::channel(1024);
        for ev in initial_events {
            let _ = tx.try_send(ev);
        }
        Self {
            name: name.into(),
            state: ConnectorState::Disconnected,
            tx,
            rx,
            balances: Mutex::new(HashMap::new()),
            outcomes: Mutex::new(VecDeque::new()),
            orders: Mutex::new(HashMap::new()),
            next_fill_seq: Mutex::new(0),
        }
    }

    /// Push a market event to be delivered on the next `events().recv()`.
    pub fn push_event(&self, event: MarketEvent) {
        let _ = self.tx.try_send(event);
    }

    /// Queue the outcome for the next order submitted to this connector.
    pub fn queue_outcome(&self, outcome: OrderOutcome) {
        self.outcomes.lock().push_back(outcome);
    }

    pub fn set_balance(&self, asset: impl Into<String>, balance: Balance) {
        self.balances.lock().insert(asset.into(), balance);
    }

    fn next_fill_id(&self) -> String {
        let mut seq = self.next_fill_seq.lock();
        *seq += 1;
        format!("{}-fill-{}", self.name, *seq)
    }
}

#[async_trait]
impl Connector for SimulatedConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> ConnectorState {
        self.state
    }

    async fn connect(&mut self) -> Result<(), ConnectorError> {
        self.state = ConnectorState::Streaming;
        Ok(())
    }

    async fn subscribe(&mut self, _symbols: &[Symbol], _depth: usize) -> Result<(), ConnectorError> {
        self.state = ConnectorState::Subscribed;
        Ok(())
    }

    fn events(&mut self) -> &mut mpsc::Receiver<MarketEvent> {
        &mut self.rx
    }

    async fn place_order(&self, _signal_id_hint: &str, spec: OrderSpec) -> Result<OrderId, ConnectorError> {
        let outcome = self.outcomes.lock().pop_front().unwrap_or(OrderOutcome::FullFill);
        let order_id = OrderId::new();

        let tracked = match outcome {
            OrderOutcome::FullFill => {
                let fill = Fill {
                    order_id,
                    exchange_fill_id: self.next_fill_id(),
                    qty: spec.qty,
                    price: spec.price,
                    fee: spec.qty * spec.price * Decimal::new(1, 3),
                    fee_asset: spec.symbol.quote().to_string(),
                    ts: chrono::Utc::now(),
                };
                TrackedOrder {
                    state: OrderState::Filled,
                    fills: vec![fill],
                    requested_qty: spec.qty,
                    price: spec.price,
                }
            }
            OrderOutcome::PartialFill(qty) => {
                let filled = qty.min(spec.qty);
                let fill = Fill {
                    order_id,
                    exchange_fill_id: self.next_fill_id(),
                    qty: filled,
                    price: spec.price,
                    fee: filled * spec.price * Decimal::new(1, 3),
                    fee_asset: spec.symbol.quote().to_string(),
                    ts: chrono::Utc::now(),
                };
                TrackedOrder {
                    state: OrderState::PartiallyFilled,
                    fills: vec![fill],
                    requested_qty: spec.qty,
                    price: spec.price,
                }
            }
            OrderOutcome::Reject(reason) => {
                return Err(ConnectorError::OrderRejected(reason));
            }
            OrderOutcome::NeverFills => TrackedOrder {
                state: OrderState::Open,
                fills: vec![],
                requested_qty: spec.qty,
                price: spec.price,
            },
        };

        self.orders.lock().insert(order_id, tracked);
        Ok(order_id)
    }

    async fn cancel_order(&self, order_id: OrderId) -> Result<bool, ConnectorError> {
        let mut orders = self.orders.lock();
        match orders.get_mut(&order_id) {
            Some(tracked) if !tracked.state.is_terminal() => {
                tracked.state = OrderState::Cancelled;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(ConnectorError::Protocol("unknown order".into())),
        }
    }

    async fn order_status(&self, order_id: OrderId) -> Result<OrderSnapshot, ConnectorError> {
        let orders = self.orders.lock();
        let tracked = orders.get(&order_id).ok_or(ConnectorError::Protocol("unknown order".into()))?;
        Ok(OrderSnapshot {
            order_id,
            state: tracked.state,
            fills: tracked.fills.clone(),
        })
    }

    async fn balances(&self) -> Result<HashMap<String, Balance>, ConnectorError> {
        Ok(self.balances.lock().clone())
    }

    async fn close(&mut self) -> Result<(), ConnectorError> {
        self.state = ConnectorState::Closing;
        Ok(())
    }
}
