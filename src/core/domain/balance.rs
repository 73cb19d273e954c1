//! Per-exchange balances and the derived position/exposure view.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ExchangeId;
use super::money::Usd;

/// Free and locked balance of one asset on one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub free: Decimal,
    pub locked: Decimal,
}

impl Balance {
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            free: Decimal::ZERO,
            locked: Decimal::ZERO,
        }
    }

    #[must_use]
    pub fn total(&self) -> Decimal {
        self.free + self.locked
    }

    /// `true` iff both `free` and `locked` are non-negative, per the data-model invariant.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.free >= Decimal::ZERO && self.locked >= Decimal::ZERO
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::zero()
    }
}

/// Derived, process-wide exposure view: per-asset free/exposed USD value,
/// computed from balances plus open orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub total_free_usd: Usd,
    pub total_exposure_usd: Usd,
}

impl Position {
    #[must_use]
    pub const fn flat() -> Self {
        Self {
            total_free_usd: Decimal::ZERO,
            total_exposure_usd: Decimal::ZERO,
        }
    }
}

/// Keys a balance by the exchange and asset it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BalanceKey {
    pub exchange: ExchangeId,
    pub asset: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn balance_validity_requires_nonnegative_fields() {
        assert!(Balance { free: dec!(1), locked: dec!(0) }.is_valid());
        assert!(!Balance { free: dec!(-1), locked: dec!(0) }.is_valid());
        assert!(!Balance { free: dec!(0), locked: dec!(-1) }.is_valid());
    }

    #[test]
    fn balance_total_sums_free_and_locked() {
        let b = Balance { free: dec!(5), locked: dec!(2) };
        assert_eq!(b.total(), dec!(7));
    }
}
