//! Order and fill types tracked by the execution engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{ExchangeId, OrderId, SignalId, Symbol};
use super::money::{Price, Qty};
use super::signal::Side;

/// Order type requested at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
    Ioc,
    Market,
}

/// Lifecycle state of an [`Order`].
///
/// Terminal states are `Filled`, `Cancelled`, and `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    Pending,
    Open,
    Filled,
    PartiallyFilled,
    Cancelled,
    Failed,
}

impl OrderState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Filled | Self::Cancelled | Self::Failed)
    }
}

/// A single fill against an order. Append-only; never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: OrderId,
    /// Exchange-assigned fill identifier, used to dedupe across REST poll and
    /// user-data stream delivery of the same fill.
    pub exchange_fill_id: String,
    pub qty: Qty,
    pub price: Price,
    pub fee: Decimal,
    pub fee_asset: String,
    pub ts: DateTime<Utc>,
}

/// An order submitted to an exchange as one leg of a [`crate::core::domain::Signal`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub signal_id: SignalId,
    pub exchange: ExchangeId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub requested_qty: Qty,
    pub requested_price: Price,
    pub state: OrderState,
    pub filled_qty: Qty,
    pub fills: Vec<Fill>,
    pub created_at: DateTime<Utc>,
    pub filled_at: Option<DateTime<Utc>>,
}

impl Order {
    #[must_use]
    pub fn new(
        signal_id: SignalId,
        exchange: ExchangeId,
        symbol: Symbol,
        side: Side,
        order_type: OrderType,
        requested_qty: Qty,
        requested_price: Price,
    ) -> Self {
        Self {
            id: OrderId::new(),
            signal_id,
            exchange,
            symbol,
            side,
            order_type,
            requested_qty,
            requested_price,
            state: OrderState::Pending,
            filled_qty: Decimal::ZERO,
            fills: Vec::new(),
            created_at: Utc::now(),
            filled_at: None,
        }
    }

    /// Apply a fill, deduping by `exchange_fill_id` so the same fill observed
    /// through both the REST poller and the user-data stream is only counted once.
    ///
    /// Returns `true` if the fill was new and applied.
    pub fn apply_fill(&mut self, fill: Fill) -> bool {
        if self.fills.iter().any(|f| f.exchange_fill_id == fill.exchange_fill_id) {
            return false;
        }
        self.filled_qty += fill.qty;
        self.fills.push(fill);

        self.state = if self.filled_qty >= self.requested_qty {
            self.filled_at = Some(Utc::now());
            OrderState::Filled
        } else {
            OrderState::PartiallyFilled
        };
        true
    }

    #[must_use]
    pub fn remaining_qty(&self) -> Qty {
        (self.requested_qty - self.filled_qty).max(Decimal::ZERO)
    }

    pub fn mark_cancelled(&mut self) {
        if !self.state.is_terminal() {
            self.state = OrderState::Cancelled;
        }
    }

    pub fn mark_failed(&mut self) {
        if !self.state.is_terminal() {
            self.state = OrderState::Failed;
        }
    }

    /// Volume-weighted average fill price across all recorded fills.
    #[must_use]
    pub fn avg_fill_price(&self) -> Option<Price> {
        if self.filled_qty == Decimal::ZERO {
            return None;
        }
        let notional: Decimal = self.fills.iter().map(|f| f.price * f.qty).sum();
        Some(notional / self.filled_qty)
    }

    #[must_use]
    pub fn total_fees(&self) -> Decimal {
        self.fills.iter().map(|f| f.fee).sum()
    }
}
