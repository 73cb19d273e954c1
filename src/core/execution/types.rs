//! Execution configuration and outcome types.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::domain::{Order, OrderId, Side, SignalId};

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default = "default_order_timeout_ms")]
    pub order_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Paper-mode only: simulated network + matching latency.
    #[serde(default = "default_paper_latency_ms")]
    pub paper_latency_ms: u64,
    #[serde(default = "default_paper_jitter_ms")]
    pub paper_jitter_ms: u64,
    #[serde(default = "default_paper_taker_fee_pct")]
    pub paper_taker_fee_pct: Decimal,
}

const fn default_order_timeout_ms() -> u64 {
    5_000
}
const fn default_poll_interval_ms() -> u64 {
    200
}
const fn default_paper_latency_ms() -> u64 {
    50
}
const fn default_paper_jitter_ms() -> u64 {
    30
}
const fn default_paper_taker_fee_pct() -> Decimal {
    Decimal::new(10, 2) // 0.10%
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            order_timeout_ms: default_order_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            paper_latency_ms: default_paper_latency_ms(),
            paper_jitter_ms: default_paper_jitter_ms(),
            paper_taker_fee_pct: default_paper_taker_fee_pct(),
        }
    }
}

/// Classification of how a signal's legs settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Every leg filled completely.
    Filled,
    /// Every leg filled to the same (non-zero, non-complete) fraction.
    PartialBalanced,
    /// Legs filled to different fractions; a hedge order was attempted on
    /// the lagging leg to close the gap.
    PartialImbalance { hedge_order_id: Option<OrderId> },
    /// At least one leg filled while at least one other failed outright;
    /// filled legs were flattened to avoid carrying unintended exposure.
    LegsFailed { flattened_order_ids: Vec<OrderId> },
    /// No leg filled at all.
    AllFailed,
}

/// Result of executing one [`crate::core::domain::Signal`].
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub signal_id: SignalId,
    pub orders: Vec<Order>,
    pub outcome: ExecutionOutcome,
}

impl ExecutionReport {
    /// Realized PnL across every order in this report, including any
    /// hedge or flatten orders appended after the original legs.
    #[must_use]
    pub fn realized_pnl_usd(&self) -> Decimal {
        realized_pnl_usd(&self.orders)
    }
}

/// Sum of fill cashflows across `orders`: buys pay notional out, sells bring
/// notional in, fees always come out. Covers hedge and flatten orders the
/// same way as the original legs, since they carry the same `Side` and
/// `fills` shape.
#[must_use]
pub fn realized_pnl_usd(orders: &[Order]) -> Decimal {
    orders
        .iter()
        .map(|order| {
            let signed_notional: Decimal = order
                .fills
                .iter()
                .map(|fill| match order.side {
                    Side::Buy => -(fill.qty * fill.price),
                    Side::Sell => fill.qty * fill.price,
                })
                .sum();
            signed_notional - order.total_fees()
        })
        .sum()
}
