//! CO2e from consumption.

use rust_decimal::Decimal;

use crate::money::round_mass;
use crate::rates::RateTable;

pub struct EmissionEstimator {
    factor: Decimal,
}

impl EmissionEstimator {
    pub fn new(rates: &RateTable) -> Self {
        Self {
            factor: rates.emission_factor,
        }
    }

    /// kg CO2e, rounded half-up to 2 digits.
    pub fn estimate_co2e(&self, consumption_kwh: u32) -> Decimal {
        round_mass(Decimal::from(consumption_kwh) * self.factor)
    }
}
