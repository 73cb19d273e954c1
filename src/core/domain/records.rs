//! Persisted record shapes written out to downstream storage.
//!
//! These are plain serializable rows; the actual durable store (time-series
//! tick store, relational trade log) is an external collaborator out of
//! scope for this crate. `core::ledger` appends these as JSON lines so a
//! downstream store can tail them without this crate depending on one.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{ExchangeId, SignalId, Symbol};
use super::order::OrderType;
use super::signal::{Side, SignalStatus, StrategyKind};

/// One row per emitted signal, updated as its lifecycle progresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRecord {
    pub id: SignalId,
    pub strategy: StrategyKind,
    pub buy_exchange: ExchangeId,
    pub sell_exchange: ExchangeId,
    pub symbol: Symbol,
    pub gross_spread: Decimal,
    pub net_spread: Decimal,
    pub estimated_pnl: Decimal,
    pub actual_pnl: Option<Decimal>,
    pub status: SignalStatus,
    pub detected_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
}

/// One row per submitted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    Pending,
    Filled,
    Partial,
    Cancelled,
    Failed,
}

/// Which executor produced a [`TradeRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    Backtest,
    Paper,
    Live,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub signal_id: SignalId,
    pub exchange: ExchangeId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub requested_qty: Decimal,
    pub filled_qty: Decimal,
    pub requested_price: Decimal,
    pub filled_price: Option<Decimal>,
    pub fee: Decimal,
    pub fee_asset: String,
    pub status: TradeStatus,
    pub execution_mode: ExecutionMode,
    pub latency_ms: u64,
    pub created_at: DateTime<Utc>,
    pub filled_at: Option<DateTime<Utc>>,
}

/// Point-in-time balance snapshot for one (exchange, asset) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub timestamp: DateTime<Utc>,
    pub exchange: ExchangeId,
    pub asset: String,
    pub balance: Decimal,
    pub usd_value: Decimal,
}

/// Daily rollup of signal/trade activity and PnL, keyed by UTC calendar day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPerformance {
    pub date: NaiveDate,
    pub execution_mode: ExecutionMode,
    pub total_signals: u64,
    pub executed_trades: u64,
    pub total_pnl: Decimal,
    pub total_fees: Decimal,
    pub net_pnl: Decimal,
    pub sharpe_ratio: Option<Decimal>,
    pub max_drawdown: Decimal,
    pub win_rate: Decimal,
}
