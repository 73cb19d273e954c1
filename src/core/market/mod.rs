//! Shared market state: the latest book per (exchange, symbol)
//! pair, with staleness judged at read time.

mod staleness;
mod state;

pub use staleness::StalenessPolicy;
pub use state::{ChangeEvent, MarketState};
