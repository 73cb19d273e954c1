//! Fixed-point price/quantity types.
//!
//! All prices and quantities are [`rust_decimal::Decimal`], which carries a
//! 96-bit mantissa and scales well past the fractional precision exchange
//! prices and quantities need. Using a single alias (rather than newtypes) keeps arithmetic
//! between prices, quantities, and USD notionals ergonomic while still
//! reading as intentional at call sites.

use rust_decimal::Decimal;

/// A price, in quote-asset units.
pub type Price = Decimal;

/// A quantity, in base-asset units.
pub type Qty = Decimal;

/// A USD-denominated notional value.
pub type Usd = Decimal;

/// Basis-point helper: `pct_of(100, dec!(0.25)) == dec!(0.25)`.
#[must_use]
pub fn pct_of(base: Decimal, pct: Decimal) -> Decimal {
    base * pct / Decimal::from(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn pct_of_computes_percentage() {
        assert_eq!(pct_of(dec!(1000), dec!(0.25)), dec!(2.5));
    }
}
