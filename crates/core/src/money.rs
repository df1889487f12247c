//! Decimal money arithmetic helpers.
//!
//! All monetary amounts in the domain are `rust_decimal::Decimal`; floating
//! point is never used for financial values.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places carried by monetary amounts.
pub const MONEY_SCALE: u32 = 2;

/// Round a monetary amount to [`MONEY_SCALE`] places, half-up.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a percentage (e.g. `2.5`) to its fractional form (`0.025`).
pub fn percent_to_fraction(rate: Decimal) -> Decimal {
    rate / Decimal::ONE_HUNDRED
}

/// `(1 + rate)^periods` by repeated multiplication.
///
/// Loan terms keep `periods` small; no float intermediates.
pub fn compound(rate: Decimal, periods: u32) -> Decimal {
    let base = Decimal::ONE + rate;
    (0..periods).fold(Decimal::ONE, |acc, _| acc * base)
}
