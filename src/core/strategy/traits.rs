//! The detector capability set.
//!
//! Detectors are pure functions of a [`DetectorContext`] snapshot: they read
//! [`crate::core::market::MarketState`], never write to it, and return the
//! [`Signal`]s they found. Adding a new strategy means implementing
//! [`Detector`] and registering it with the orchestrator; it does not touch
//! any other module.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::core::domain::{ExchangeId, Signal, Symbol};
use crate::core::market::MarketState;

/// Per-exchange taker fee, expressed as a percentage (e.g. `0.1` = 10 bps).
#[derive(Debug, Clone, Default)]
pub struct FeeSchedule {
    taker_fees_pct: HashMap<ExchangeId, Decimal>,
    default_fee_pct: Decimal,
}

impl FeeSchedule {
    #[must_use]
    pub fn new(default_fee_pct: Decimal) -> Self {
        Self {
            taker_fees_pct: HashMap::new(),
            default_fee_pct,
        }
    }

    pub fn set(&mut self, exchange: ExchangeId, fee_pct: Decimal) {
        self.taker_fees_pct.insert(exchange, fee_pct);
    }

    #[must_use]
    pub fn taker_fee_pct(&self, exchange: &ExchangeId) -> Decimal {
        self.taker_fees_pct.get(exchange).copied().unwrap_or(self.default_fee_pct)
    }
}

/// Read-only view handed to every detector each cycle.
pub struct DetectorContext<'a> {
    pub market: &'a MarketState,
    pub symbols: &'a [Symbol],
    pub fees: &'a FeeSchedule,
}

/// A strategy that scans market state and emits arbitrage [`Signal`]s.
pub trait Detector: Send + Sync {
    /// Strategy name, used for logging and metrics labeling.
    fn name(&self) -> &'static str;

    /// Scan the current market snapshot and return any signals found.
    /// Implementations must enforce their own per-symbol cooldown and must
    /// never emit more than one signal per symbol per call.
    fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<Signal>;
}
