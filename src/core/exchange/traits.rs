//! The exchange connector capability set.
//!
//! Per-exchange polymorphism is captured entirely by this trait; wire
//! format differences live inside each implementation. There is no
//! inheritance beyond conforming to [`Connector`] — a new exchange is added
//! by writing one more implementation and registering it in
//! [`crate::core::exchange::registry::ExchangeRegistry`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::core::domain::{Balance, ExchangeId, Fill, OrderId, OrderState, OrderType, Price, Qty, Side, Symbol};

/// Connection lifecycle of a [`Connector`].
///
/// `Disconnected → Connecting → Subscribed → Streaming → {Reconnecting |
/// Closing}`, with a `Degraded` absorbing state entered after
/// `max_reconnect_attempts` consecutive reconnection failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    Disconnected,
    Connecting,
    Subscribed,
    Streaming,
    Reconnecting,
    Closing,
    Degraded,
}

/// A market data event pushed from a connector to the market state.
#[derive(Debug, Clone)]
pub enum MarketEvent {
    Snapshot(crate::core::domain::OrderBook),
    Incremental(crate::core::domain::OrderBook),
    Trade {
        exchange: ExchangeId,
        symbol: Symbol,
        price: Price,
        qty: Qty,
        ts: DateTime<Utc>,
    },
    /// A fill delivered via the exchange's user-data websocket, if it has one.
    OrderUpdate { order_id: OrderId, fill: Fill },
    Disconnected { reason: String },
}

/// A point-in-time view of an order's exchange-side state, returned by
/// polling [`Connector::order_status`].
#[derive(Debug, Clone)]
pub struct OrderSnapshot {
    pub order_id: OrderId,
    pub state: OrderState,
    pub fills: Vec<Fill>,
}

/// Specification for a single order submission.
#[derive(Debug, Clone)]
pub struct OrderSpec {
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub qty: Qty,
    pub price: Price,
    /// Maximum allowed adverse slippage for a marketable-limit order, as a
    /// fraction (e.g. `0.002` = 20 bps); ignored for plain `Limit` orders.
    pub max_slippage_pct: Option<rust_decimal::Decimal>,
}

/// Error taxonomy for connector operations.
#[derive(Error, Debug, Clone)]
pub enum ConnectorError {
    #[error("transient network error: {0}")]
    Transient(String),

    #[error("rate limited, retry after backoff")]
    RateLimited,

    #[error("authentication or signature error: {0}")]
    Auth(String),

    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("sequence gap detected, resync required")]
    SequenceGap,

    #[error("order rejected: {0}")]
    OrderRejected(String),

    #[error("symbol halted: {0}")]
    SymbolHalted(String),

    #[error("operation timed out")]
    Timeout,

    #[error("connector is closed")]
    Closed,
}

/// Capability set implemented by every exchange connector.
///
/// `connect`/`subscribe` establish the websocket session;
/// `place_order`/`cancel_order`/`balances` are REST calls gated
/// by the connector's [`crate::core::exchange::rate_limit::RateLimiter`].
#[async_trait]
pub trait Connector: Send + Sync {
    /// Exchange name, used for logging, metrics, and config lookup.
    fn name(&self) -> &str;

    /// Current lifecycle state.
    fn state(&self) -> ConnectorState;

    /// Establish the websocket session.
    async fn connect(&mut self) -> Result<(), ConnectorError>;

    /// Subscribe to order book (and trade) updates for `symbols` at the
    /// given depth, acking every subscription before returning.
    async fn subscribe(&mut self, symbols: &[Symbol], depth: usize) -> Result<(), ConnectorError>;

    /// Receive channel for normalized market events. Implementations own an
    /// internal reader task and forward parsed events here; this keeps the
    /// trait object-safe without an associated `Stream` type.
    fn events(&mut self) -> &mut mpsc::Receiver<MarketEvent>;

    /// Submit an order, rate-limited per the exchange's quota policy.
    async fn place_order(&self, signal_id_hint: &str, spec: OrderSpec) -> Result<OrderId, ConnectorError>;

    /// Cancel a previously submitted order. Returns `true` if the cancel
    /// was acknowledged before the order reached a terminal state.
    async fn cancel_order(&self, order_id: OrderId) -> Result<bool, ConnectorError>;

    /// Poll the exchange for an order's current state and fills. Used
    /// alongside (and deduplicated against) any fills delivered through
    /// `events()`'s `OrderUpdate` variant.
    async fn order_status(&self, order_id: OrderId) -> Result<OrderSnapshot, ConnectorError>;

    /// Query current balances for every asset held on this exchange.
    async fn balances(&self) -> Result<HashMap<String, Balance>, ConnectorError>;

    /// Close the session, cancelling any pending internal work.
    async fn close(&mut self) -> Result<(), ConnectorError>;
}
