//! Rounding points for money, mass and percentage values.
//!
//! Every value handed to a caller passes through one of these; intermediate
//! sums stay unrounded `Decimal`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Currency, 2 fraction digits, half-up.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Kilograms of CO2e, 2 fraction digits, half-up.
pub fn round_mass(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Percentage share, 1 fraction digit, half-up.
pub fn round_percent(value: Decimal) -> Decimal {
    round_tenths(value)
}

/// 1 fraction digit, half-up.
pub fn round_tenths(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// Whole kWh, half-up.
pub fn round_kwh(value: Decimal) -> u32 {
    let rounded = value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    floor_kwh(rounded)
}

/// Whole kWh, fraction dropped. Negative values clamp to zero.
pub fn floor_kwh(value: Decimal) -> u32 {
    if value.is_sign_negative() {
        return 0;
    }
    value.trunc().to_u32().unwrap_or(u32::MAX)
}
