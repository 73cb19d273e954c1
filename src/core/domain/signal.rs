//! Signal types emitted by detectors and consumed by the risk manager.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{ExchangeId, SignalId, Symbol};
use super::money::{Price, Qty, Usd};

/// Which detector produced a [`Signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    Spatial,
    Triangular,
}

impl StrategyKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spatial => "spatial",
            Self::Triangular => "triangular",
        }
    }
}

/// Side of a leg order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

/// One leg of a [`Signal`]: an exchange, symbol, side, target price, and size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalLeg {
    pub exchange: ExchangeId,
    pub symbol: Symbol,
    pub side: Side,
    pub target_price: Price,
    pub max_qty: Qty,
}

impl SignalLeg {
    /// `true` iff `max_qty` satisfies the per-leg invariant `max_qty > 0`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.max_qty > Decimal::ZERO
    }
}

/// Lifecycle status of a [`Signal`], persisted alongside the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalStatus {
    Detected,
    Executed,
    Missed,
    Rejected,
}

/// A detected arbitrage opportunity, handed off single-reader from detector to risk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    pub strategy: StrategyKind,
    pub legs: Vec<SignalLeg>,
    pub gross_spread_pct: Decimal,
    pub net_spread_pct: Decimal,
    pub estimated_pnl_usd: Usd,
    pub notional_usd: Usd,
    pub detected_ts: DateTime<Utc>,
    pub status: SignalStatus,
}

impl Signal {
    /// `true` iff every leg has a positive `max_qty`, per the data-model invariant.
    #[must_use]
    pub fn legs_valid(&self) -> bool {
        !self.legs.is_empty() && self.legs.iter().all(SignalLeg::is_valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn leg(qty: Decimal) -> SignalLeg {
        SignalLeg {
            exchange: ExchangeId::from("binance"),
            symbol: Symbol::from("BTC/USDT"),
            side: Side::Buy,
            target_price: dec!(100),
            max_qty: qty,
        }
    }

    #[test]
    fn leg_is_valid_requires_positive_qty() {
        assert!(leg(dec!(1)).is_valid());
        assert!(!leg(dec!(0)).is_valid());
        assert!(!leg(dec!(-1)).is_valid());
    }

    #[test]
    fn side_opposite_round_trips() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite().opposite(), Side::Sell);
    }

    #[test]
    fn signal_legs_valid_rejects_empty_and_bad_legs() {
        let mut signal = Signal {
            id: SignalId::new(),
            strategy: StrategyKind::Spatial,
            legs: vec![],
            gross_spread_pct: dec!(0.3),
            net_spread_pct: dec!(0.25),
            estimated_pnl_usd: dec!(2),
            notional_usd: dec!(1000),
            detected_ts: Utc::now(),
            status: SignalStatus::Detected,
        };
        assert!(!signal.legs_valid());

        signal.legs = vec![leg(dec!(1)), leg(dec!(0))];
        assert!(!signal.legs_valid());

        signal.legs = vec![leg(dec!(1)), leg(dec!(2))];
        assert!(signal.legs_valid());
    }
}
