//! Exchange abstraction layer.
//!
//! ## Adding a New Exchange
//!
//! 1. Implement [`Connector`] for the exchange's wire format.
//! 2. Wrap it in [`reconnecting::Reconnecting`] for automatic backoff.
//! 3. Register a constructor in [`registry::ExchangeRegistry`].
//! 4. Add an `exchanges.<name>` section to the config (fees, rate limit
//!    policy, websocket tuning).

pub mod rate_limit;
pub mod reconnecting;
pub mod registry;
pub mod simulated;
mod traits;

pub use rate_limit::{RateLimitPolicy, RateLimiter};
pub use reconnecting::{Reconnecting, ReconnectionConfig};
pub use registry::ExchangeRegistry;
pub use traits::{Connector, ConnectorError, ConnectorState, MarketEvent, OrderSnapshot, OrderSpec};
