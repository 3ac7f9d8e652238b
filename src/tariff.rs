//! Tiered tariff costing with the all-or-nothing high-consumption override.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::error::ValidationError;
use crate::money::round_money;
use crate::rates::{RateTable, Tariff};

/// Why a bill was priced entirely at the high rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideReason {
    DeclaredHighConsumptionTariff,
    ConsumptionAboveThreshold,
    UnknownTariff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "reason", rename_all = "snake_case")]
pub enum PricingMode {
    Tiered,
    HighRate(OverrideReason),
}

/// kWh billed in one band and its pre-tax amount.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierCharge {
    pub name: String,
    pub kwh: u32,
    pub rate: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub mode: PricingMode,
    pub charges: Vec<TierCharge>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

pub struct TariffCostEstimator<'a> {
    rates: &'a RateTable,
}

impl<'a> TariffCostEstimator<'a> {
    pub fn new(rates: &'a RateTable) -> Self {
        Self { rates }
    }

    /// Estimated amount due including tax, rounded half-up to cents.
    pub fn estimate_cost(&self, consumption_kwh: u32, tariff: Tariff) -> Result<Decimal, ValidationError> {
        Ok(self.breakdown(consumption_kwh, tariff)?.total)
    }

    /// Same as [`Self::estimate_cost`] for a raw tariff code.
    pub fn estimate_cost_for_code(&self, consumption_kwh: u32, code: &str) -> Result<Decimal, ValidationError> {
        self.estimate_cost(consumption_kwh, Tariff::from_code(code))
    }

    pub fn pricing_mode(&self, consumption_kwh: u32, tariff: Tariff) -> PricingMode {
        if tariff == Tariff::Dac {
            PricingMode::HighRate(OverrideReason::DeclaredHighConsumptionTariff)
        } else if consumption_kwh > self.rates.high_consumption_threshold_kwh {
            PricingMode::HighRate(OverrideReason::ConsumptionAboveThreshold)
        } else if !tariff.is_known() {
            PricingMode::HighRate(OverrideReason::UnknownTariff)
        } else {
            PricingMode::Tiered
        }
    }

    pub fn breakdown(&self, consumption_kwh: u32, tariff: Tariff) -> Result<CostBreakdown, ValidationError> {
        if consumption_kwh == 0 {
            return Err(ValidationError::NonPositiveConsumption(0));
        }

        let mode = self.pricing_mode(consumption_kwh, tariff);
        let charges = match mode {
            PricingMode::HighRate(reason) => {
                debug!(consumption_kwh, %tariff, ?reason, "pricing whole consumption at high rate");
                vec![TierCharge {
                    name: "high".to_string(),
                    kwh: consumption_kwh,
                    rate: self.rates.high_rate,
                    amount: Decimal::from(consumption_kwh) * self.rates.high_rate,
                }]
            }
            PricingMode::Tiered => self.tiered_charges(consumption_kwh),
        };

        let subtotal: Decimal = charges.iter().map(|c| c.amount).sum();
        let total = round_money(subtotal * self.rates.tax_multiplier);
        Ok(CostBreakdown {
            mode,
            charges,
            subtotal,
            tax: total - subtotal,
            total,
        })
    }

    // Each band takes min(remaining, width); a band without a width takes
    // whatever is left.
    fn tiered_charges(&self, consumption_kwh: u32) -> Vec<TierCharge> {
        let mut remaining = consumption_kwh;
        self.rates
            .tiers
            .iter()
            .map(|tier| {
                let kwh = match tier.width_kwh {
                    Some(width) => remaining.min(width),
                    None => remaining,
                };
                remaining -= kwh;
                TierCharge {
                    name: tier.name.clone(),
                    kwh,
                    rate: tier.rate,
                    amount: Decimal::from(kwh) * tier.rate,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn cost(kwh: u32, code: &str) -> Decimal {
        let rates = RateTable::default();
        TariffCostEstimator::new(&rates)
            .estimate_cost_for_code(kwh, code)
            .unwrap()
    }

    #[test]
    fn basic_band_only() {
        assert_eq!(cost(100, "1C"), dec!(113.68));
    }

    #[test]
    fn into_intermediate_band() {
        assert_eq!(cost(200, "1C"), dec!(239.54));
    }

    #[test]
    fn into_excess_band() {
        assert_eq!(cost(350, "1C"), dec!(635.80));
    }

    #[test]
    fn declared_dac_uses_high_rate() {
        assert_eq!(cost(300, "DAC"), dec!(2220.24));
    }

    #[test]
    fn above_threshold_overrides_declared_tariff() {
        assert_eq!(cost(600, "1C"), dec!(4440.48));
    }

    #[test]
    fn threshold_itself_stays_tiered() {
        let rates = RateTable::default();
        let estimator = TariffCostEstimator::new(&rates);
        assert_eq!(estimator.pricing_mode(500, Tariff::T1), PricingMode::Tiered);
        assert_eq!(
            estimator.pricing_mode(501, Tariff::T1),
            PricingMode::HighRate(OverrideReason::ConsumptionAboveThreshold)
        );
    }

    #[test]
    fn unknown_tariff_prices_at_high_rate() {
        assert_eq!(cost(300, "no idea"), cost(300, "DAC"));
    }

    #[test]
    fn zero_consumption_is_rejected() {
        let rates = RateTable::default();
        assert_eq!(
            TariffCostEstimator::new(&rates).estimate_cost(0, Tariff::T1C),
            Err(ValidationError::NonPositiveConsumption(0))
        );
    }

    #[test]
    fn breakdown_splits_partial_band() {
        let rates = RateTable::default();
        let breakdown = TariffCostEstimator::new(&rates)
            .breakdown(350, Tariff::T1C)
            .unwrap();
        let kwh: Vec<u32> = breakdown.charges.iter().map(|c| c.kwh).collect();
        assert_eq!(kwh, vec![150, 130, 70]);
        assert_eq!(breakdown.subtotal, dec!(548.1));
        assert_eq!(breakdown.total, dec!(635.80));
        assert_eq!(breakdown.subtotal + breakdown.tax, breakdown.total);
    }
}
