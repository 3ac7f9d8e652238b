//! Tariff codes and the rate table every estimator reads from.

use std::fmt;
use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::EstimateError;

/// Residential tariff code as printed on the bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tariff {
    #[serde(rename = "1")]
    T1,
    #[serde(rename = "1A")]
    T1A,
    #[serde(rename = "1B")]
    T1B,
    #[serde(rename = "1C")]
    T1C,
    #[serde(rename = "1D")]
    T1D,
    #[serde(rename = "1E")]
    T1E,
    #[serde(rename = "1F")]
    T1F,
    /// Domestic high consumption.
    #[serde(rename = "DAC")]
    Dac,
    /// The customer does not know, or the code was not recognized.
    #[serde(rename = "DESCONOZCO")]
    Unknown,
}

impl Tariff {
    pub const KNOWN: [Tariff; 8] = [
        Tariff::T1,
        Tariff::T1A,
        Tariff::T1B,
        Tariff::T1C,
        Tariff::T1D,
        Tariff::T1E,
        Tariff::T1F,
        Tariff::Dac,
    ];

    /// Parse a code leniently: case-insensitive, surrounding whitespace and
    /// a leading "TARIFA" are ignored. Anything unrecognized is `Unknown`.
    pub fn from_code(raw: &str) -> Self {
        Self::recognize(raw).unwrap_or(Tariff::Unknown)
    }

    /// Like [`Tariff::from_code`] but returns `None` for unrecognized text.
    pub fn recognize(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_uppercase();
        let code = upper
            .strip_prefix("TARIFA")
            .map(str::trim_start)
            .unwrap_or(upper.as_str());
        match code {
            "1" => Some(Tariff::T1),
            "1A" => Some(Tariff::T1A),
            "1B" => Some(Tariff::T1B),
            "1C" => Some(Tariff::T1C),
            "1D" => Some(Tariff::T1D),
            "1E" => Some(Tariff::T1E),
            "1F" => Some(Tariff::T1F),
            "DAC" => Some(Tariff::Dac),
            "DESCONOZCO" => Some(Tariff::Unknown),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Tariff::T1 => "1",
            Tariff::T1A => "1A",
            Tariff::T1B => "1B",
            Tariff::T1C => "1C",
            Tariff::T1D => "1D",
            Tariff::T1E => "1E",
            Tariff::T1F => "1F",
            Tariff::Dac => "DAC",
            Tariff::Unknown => "DESCONOZCO",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Tariff::Unknown)
    }
}

impl fmt::Display for Tariff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One consumption band of the tiered schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierRate {
    pub name: String,
    /// Band width in kWh; `None` means the band runs to the override threshold.
    pub width_kwh: Option<u32>,
    pub rate: Decimal,
}

/// Reference per-kWh price quoted to the advice generator for one tariff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePrice {
    pub tariff: Tariff,
    pub price: Decimal,
}

/// Pricing and emission constants. Immutable once built; estimators borrow it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateTable {
    /// Tiers applied in order to consumption up to `high_consumption_threshold_kwh`.
    pub tiers: Vec<TierRate>,
    /// Consumption strictly above this is billed entirely at `high_rate`.
    pub high_consumption_threshold_kwh: u32,
    pub high_rate: Decimal,
    /// Applied once to the pre-tax subtotal.
    pub tax_multiplier: Decimal,
    /// kg CO2e per kWh.
    pub emission_factor: Decimal,
    pub reference_prices: Vec<ReferencePrice>,
    pub default_reference_price: Decimal,
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            tiers: vec![
                TierRate {
                    name: "basic".to_string(),
                    width_kwh: Some(150),
                    rate: dec!(0.98),
                },
                TierRate {
                    name: "intermediate".to_string(),
                    width_kwh: Some(130),
                    rate: dec!(1.19),
                },
                TierRate {
                    name: "excess".to_string(),
                    width_kwh: None,
                    rate: dec!(3.52),
                },
            ],
            high_consumption_threshold_kwh: 500,
            high_rate: dec!(6.38),
            tax_multiplier: dec!(1.16),
            emission_factor: dec!(0.444),
            reference_prices: vec![
                ReferencePrice { tariff: Tariff::T1, price: dec!(1.30) },
                ReferencePrice { tariff: Tariff::T1A, price: dec!(1.147) },
                ReferencePrice { tariff: Tariff::T1B, price: dec!(1.147) },
                ReferencePrice { tariff: Tariff::T1C, price: dec!(1.47) },
                ReferencePrice { tariff: Tariff::T1D, price: dec!(1.47) },
                ReferencePrice { tariff: Tariff::T1E, price: dec!(1.332) },
                ReferencePrice { tariff: Tariff::T1F, price: dec!(2.494) },
                ReferencePrice { tariff: Tariff::Dac, price: dec!(3.12) },
            ],
            default_reference_price: dec!(1.47),
        }
    }
}

impl RateTable {
    /// Load a table from JSON. Fields missing from the file keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, EstimateError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, EstimateError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Tax portion of the multiplier, e.g. 0.16 for 1.16.
    pub fn tax_rate(&self) -> Decimal {
        self.tax_multiplier - Decimal::ONE
    }

    pub fn reference_price(&self, tariff: Tariff) -> Decimal {
        self.reference_prices
            .iter()
            .find(|p| p.tariff == tariff)
            .map(|p| p.price)
            .unwrap_or(self.default_reference_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codes_leniently() {
        assert_eq!(Tariff::from_code("1c"), Tariff::T1C);
        assert_eq!(Tariff::from_code("  TARIFA 1F "), Tariff::T1F);
        assert_eq!(Tariff::from_code("Tarifa DAC"), Tariff::Dac);
        assert_eq!(Tariff::from_code("DESCONOZCO"), Tariff::Unknown);
        assert_eq!(Tariff::from_code("PDBT"), Tariff::Unknown);
        assert_eq!(Tariff::recognize("PDBT"), None);
    }

    #[test]
    fn codes_round_trip_through_display() {
        for tariff in Tariff::KNOWN {
            assert_eq!(Tariff::from_code(&tariff.to_string()), tariff);
        }
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let table = RateTable::from_json_str(r#"{"high_rate": "7.00"}"#).unwrap();
        assert_eq!(table.high_rate, dec!(7.00));
        assert_eq!(table.tax_multiplier, dec!(1.16));
        assert_eq!(table.tiers.len(), 3);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            RateTable::from_json_str("{not json"),
            Err(EstimateError::RateTable(_))
        ));
    }

    #[test]
    fn reference_price_falls_back_to_default() {
        let table = RateTable::default();
        assert_eq!(table.reference_price(Tariff::Dac), dec!(3.12));
        assert_eq!(table.reference_price(Tariff::Unknown), dec!(1.47));
    }
}
