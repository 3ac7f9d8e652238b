//! Normalization of fields read off a bill image by an external extractor.
//!
//! The extractor is best effort: anything it cannot read is absent. This
//! module turns its raw, loosely typed answer into [`BillFacts`] or reports
//! which required fields still have to be asked from the user.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use serde_json::Value;

use crate::bill::{BillFacts, BillingPeriod, DeclaredTiers};
use crate::error::ValidationError;
use crate::money::{floor_kwh, round_money};
use crate::rates::Tariff;

const DATE_FORMATS: [&str; 5] = ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%d/%m/%y", "%d-%m-%y"];
const PERIOD_SEPARATORS: [&str; 3] = [" - ", " al ", " a "];

/// Raw extractor output. Values may be numbers, numeric strings or null.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawBillFields {
    pub consumption: Value,
    pub previous_reading: Value,
    pub current_reading: Value,
    pub total_paid: Value,
    pub tariff: Option<String>,
    pub subsidy: Value,
    pub multiplier: Value,
    pub billing_period: Option<String>,
    pub basic_kwh: Value,
    pub intermediate_kwh: Value,
    pub excess_kwh: Value,
    pub basic_cost: Value,
    pub intermediate_cost: Value,
    pub excess_cost: Value,
}

/// Typed, normalized fields. Absent means "could not be read".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedBillFields {
    pub consumption_kwh: Option<u32>,
    pub previous_reading: Option<u32>,
    pub current_reading: Option<u32>,
    pub total_paid: Option<Decimal>,
    pub tariff: Option<Tariff>,
    pub subsidy: Option<Decimal>,
    pub multiplier: u32,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub tiers: DeclaredTiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    Tariff,
    Consumption,
    PeriodStart,
    PeriodEnd,
}

/// Outcome of turning extracted fields into bill facts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Complete(BillFacts),
    Missing(Vec<RequiredField>),
}

impl RawBillFields {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn normalize(&self) -> ExtractedBillFields {
        let (period_start, period_end) = self
            .billing_period
            .as_deref()
            .map(parse_period)
            .unwrap_or((None, None));

        ExtractedBillFields {
            consumption_kwh: lenient_kwh(&self.consumption),
            previous_reading: lenient_kwh(&self.previous_reading),
            current_reading: lenient_kwh(&self.current_reading),
            total_paid: lenient_money(&self.total_paid),
            tariff: self.tariff.as_deref().and_then(Tariff::recognize),
            subsidy: lenient_money(&self.subsidy),
            multiplier: lenient_kwh(&self.multiplier).filter(|m| *m > 0).unwrap_or(1),
            period_start,
            period_end,
            tiers: DeclaredTiers {
                basic_kwh: lenient_kwh(&self.basic_kwh),
                intermediate_kwh: lenient_kwh(&self.intermediate_kwh),
                excess_kwh: lenient_kwh(&self.excess_kwh),
                basic_cost: lenient_money(&self.basic_cost),
                intermediate_cost: lenient_money(&self.intermediate_cost),
                excess_cost: lenient_money(&self.excess_cost),
            },
        }
    }
}

impl ExtractedBillFields {
    pub fn missing_fields(&self) -> Vec<RequiredField> {
        let mut missing = Vec::new();
        if self.tariff.is_none() {
            missing.push(RequiredField::Tariff);
        }
        if self.consumption_kwh.is_none() {
            missing.push(RequiredField::Consumption);
        }
        if self.period_start.is_none() {
            missing.push(RequiredField::PeriodStart);
        }
        if self.period_end.is_none() {
            missing.push(RequiredField::PeriodEnd);
        }
        missing
    }

    /// Fails only when the fields that are present are invalid together.
    pub fn into_bill_facts(self) -> Result<Completion, ValidationError> {
        let missing = self.missing_fields();
        let (Some(tariff), Some(consumption), Some(start), Some(end)) =
            (self.tariff, self.consumption_kwh, self.period_start, self.period_end)
        else {
            return Ok(Completion::Missing(missing));
        };

        let mut bill = BillFacts::new(tariff, consumption)?
            .with_period(BillingPeriod::new(start, end)?)
            .with_tiers(self.tiers);
        bill.total_paid = self.total_paid;
        bill.previous_reading = self.previous_reading;
        bill.current_reading = self.current_reading;
        bill.multiplier = self.multiplier;
        bill.subsidy = self.subsidy;
        bill.validate()?;
        Ok(Completion::Complete(bill))
    }
}

/// Split "01/12/2024 - 31/01/2025" (or with " al " / " a ") into two dates.
/// A plain "-" only separates when surrounded by spaces, so dashed dates
/// stay intact.
pub fn parse_period(text: &str) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let text = text.trim();
    PERIOD_SEPARATORS
        .iter()
        .filter_map(|sep| text.split_once(sep))
        .min_by_key(|(left, _)| left.len())
        .map(|(left, right)| (parse_date(left), parse_date(right)))
        .unwrap_or((None, None))
}

/// Four-digit year formats also accept "24" as year 24, so those results
/// are skipped in favor of the two-digit formats.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS.iter().find_map(|format| {
        NaiveDate::parse_from_str(text, format)
            .ok()
            .filter(|date| date.year() >= 1000)
    })
}

fn lenient_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(Decimal::from)
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Value::String(s) => s.trim().replace(',', "").parse::<Decimal>().ok(),
        _ => None,
    }
}

// "280.0" reads as 280.
fn lenient_kwh(value: &Value) -> Option<u32> {
    lenient_decimal(value)
        .filter(|d| !d.is_sign_negative())
        .map(floor_kwh)
}

fn lenient_money(value: &Value) -> Option<Decimal> {
    lenient_decimal(value).map(round_money)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn parses_period_formats() {
        assert_eq!(
            parse_period("01/12/2024 - 31/01/2025"),
            (date(2024, 12, 1), date(2025, 1, 31))
        );
        assert_eq!(
            parse_period("01-12-2024 al 31-01-2025"),
            (date(2024, 12, 1), date(2025, 1, 31))
        );
        assert_eq!(
            parse_period("2024-12-01 a 2025-01-31"),
            (date(2024, 12, 1), date(2025, 1, 31))
        );
        assert_eq!(parse_period("01/12/24 - 31/01/25"), (date(2024, 12, 1), date(2025, 1, 31)));
        assert_eq!(parse_period("diciembre"), (None, None));
        assert_eq!(parse_period("01/12/2024 - ??"), (date(2024, 12, 1), None));
    }

    #[test]
    fn normalizes_lenient_values() {
        let raw = RawBillFields::from_json(
            r#"{
                "consumption": "280.0",
                "total_paid": 356.857,
                "tariff": "TARIFA 1C",
                "multiplier": null,
                "billing_period": "01/12/2024 - 31/01/2025",
                "basic_kwh": 150,
                "basic_cost": "147.00"
            }"#,
        )
        .unwrap();
        let fields = raw.normalize();
        assert_eq!(fields.consumption_kwh, Some(280));
        assert_eq!(fields.total_paid, Some(dec!(356.86)));
        assert_eq!(fields.tariff, Some(Tariff::T1C));
        assert_eq!(fields.multiplier, 1);
        assert_eq!(fields.tiers.basic_kwh, Some(150));
        assert_eq!(fields.tiers.basic_cost, Some(dec!(147.00)));
        assert_eq!(fields.previous_reading, None);
    }

    #[test]
    fn unreadable_tariff_is_absent() {
        let raw = RawBillFields {
            tariff: Some("PDBT".to_string()),
            ..RawBillFields::default()
        };
        assert_eq!(raw.normalize().tariff, None);
    }

    #[test]
    fn reports_missing_required_fields() {
        let fields = RawBillFields {
            consumption: Value::from(280),
            ..RawBillFields::default()
        }
        .normalize();
        assert_eq!(
            fields.into_bill_facts().unwrap(),
            Completion::Missing(vec![
                RequiredField::Tariff,
                RequiredField::PeriodStart,
                RequiredField::PeriodEnd
            ])
        );
    }

    #[test]
    fn complete_fields_become_bill_facts() {
        let fields = RawBillFields {
            consumption: Value::from(280),
            tariff: Some("1c".to_string()),
            billing_period: Some("01/12/2024 - 31/01/2025".to_string()),
            previous_reading: Value::from("1000"),
            current_reading: Value::from("1280"),
            ..RawBillFields::default()
        }
        .normalize();
        let Completion::Complete(bill) = fields.into_bill_facts().unwrap() else {
            panic!("expected complete bill");
        };
        assert_eq!(bill.consumption_kwh, 280);
        assert_eq!(bill.period_days(), Some(61));
        assert_eq!(bill.metered_consumption(), Some(280));
    }

    #[test]
    fn inverted_period_is_a_validation_error() {
        let fields = RawBillFields {
            consumption: Value::from(280),
            tariff: Some("1".to_string()),
            billing_period: Some("31/01/2025 - 01/12/2024".to_string()),
            ..RawBillFields::default()
        }
        .normalize();
        assert!(matches!(
            fields.into_bill_facts(),
            Err(ValidationError::InvertedPeriod { .. })
        ));
    }
}
