//! Position sizing shared by every detector.

use rust_decimal::Decimal;

/// Target USD notional for a candidate trade: capped by the per-coin
/// position limit, and by ten times the shallower side's depth so a single
/// trade never claims more than a tenth of the book it would need to
/// consume.
#[must_use]
pub fn target_notional_usd(max_position_per_coin_usd: Decimal, min_depth_usd: Decimal) -> Decimal {
    max_position_per_coin_usd.min(min_depth_usd * Decimal::from(10))
}

/// Reduce a target notional down to what the shallower side of the book can
/// actually absorb.
#[must_use]
pub fn clamp_to_depth(target_notional_usd: Decimal, shallow_side_depth_usd: Decimal) -> Decimal {
    target_notional_usd.min(shallow_side_depth_usd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn target_notional_is_capped_by_position_limit() {
        assert_eq!(target_notional_usd(dec!(1000), dec!(5000)), dec!(1000));
    }

    #[test]
    fn target_notional_is_capped_by_depth() {
        assert_eq!(target_notional_usd(dec!(10000), dec!(50)), dec!(500));
    }

    #[test]
    fn clamp_to_depth_never_exceeds_shallow_side() {
        assert_eq!(clamp_to_depth(dec!(1000), dec!(300)), dec!(300));
        assert_eq!(clamp_to_depth(dec!(200), dec!(300)), dec!(200));
    }
}
