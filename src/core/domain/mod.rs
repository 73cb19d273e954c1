//! Pure domain types shared across the pipeline.
//!
//! ## Identifiers
//!
//! - [`ExchangeId`], [`Symbol`] - configuration-level names.
//! - [`SignalId`], [`OrderId`] - generated per signal/order.
//!
//! ## Market data
//!
//! - [`OrderBook`], [`PriceLevel`], [`TopOfBook`], [`BookSide`].
//!
//! ## Pipeline types
//!
//! - [`Signal`], [`SignalLeg`], [`StrategyKind`], [`SignalStatus`], [`Side`].
//! - [`Order`], [`OrderType`], [`OrderState`], [`Fill`].
//! - [`Balance`], [`Position`], [`BalanceKey`].
//! - [`CircuitState`], [`CircuitPhase`].
//!
//! ## Persisted rows
//!
//! - [`records::SignalRecord`], [`records::TradeRecord`],
//!   [`records::PortfolioSnapshot`], [`records::DailyPerformance`].

mod balance;
mod circuit;
mod id;
mod money;
mod order;
mod order_book;
pub mod records;
mod signal;

pub use balance::{Balance, BalanceKey, Position};
pub use circuit::{CircuitPhase, CircuitState};
pub use id::{ExchangeId, OrderId, SignalId, Symbol};
pub use money::{pct_of, Price, Qty, Usd};
pub use order::{Fill, Order, OrderState, OrderType};
pub use order_book::{BookSide, OrderBook, PriceLevel, TopOfBook};
pub use signal::{Side, Signal, SignalLeg, SignalStatus, StrategyKind};
