//! Rounding policies for ringgit amounts.
//!
//! All money is `rust_decimal::Decimal`; nothing here touches binary floats.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Gross/net rounding: half-up to 2 dp.
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Drops everything past the second decimal place.
pub fn truncate_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

/// Rounds up to the next multiple of `step` (e.g. 0.05).
pub fn ceil_to_step(value: Decimal, step: Decimal) -> Decimal {
    if step <= Decimal::ZERO {
        return value;
    }
    ((value / step).ceil() * step).round_dp(2)
}

/// Rounds up to the next whole ringgit, as the EPF schedule does.
pub fn ceil_ringgit(value: Decimal) -> Decimal {
    value.ceil().round_dp(2)
}

/// Rounds a wage up to the upper bound of its `width`-wide bracket.
pub fn ceil_to_bracket(wage: Decimal, width: Decimal) -> Decimal {
    ceil_to_step(wage, width)
}

/// Clamps negatives to zero; every monetary output field is non-negative.
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(dec!(0))
}
