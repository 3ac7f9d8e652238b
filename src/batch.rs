//! CSV batch input: one bill plus its survey answers per row.

use std::io::{BufRead, BufReader, Read};

use csv::{ReaderBuilder, Trim};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::bill::{BillFacts, BillingPeriod, DeclaredTiers};
use crate::error::{EstimateError, ValidationError};
use crate::extract::parse_date;
use crate::rates::Tariff;
use crate::survey::{SurveyAnswers, SurveyFacts};

#[derive(Debug, Clone, Deserialize)]
pub struct BillRow {
    #[serde(default)]
    pub label: Option<String>,
    pub tariff: String,
    pub consumption_kwh: u32,
    #[serde(default)]
    pub period_start: Option<String>,
    #[serde(default)]
    pub period_end: Option<String>,
    #[serde(default)]
    pub total_paid: Option<Decimal>,
    #[serde(default)]
    pub previous_reading: Option<u32>,
    #[serde(default)]
    pub current_reading: Option<u32>,
    #[serde(default)]
    pub multiplier: Option<u32>,
    #[serde(default)]
    pub subsidy: Option<Decimal>,
    #[serde(default)]
    pub basic_kwh: Option<u32>,
    #[serde(default)]
    pub intermediate_kwh: Option<u32>,
    #[serde(default)]
    pub excess_kwh: Option<u32>,
    #[serde(default)]
    pub basic_cost: Option<Decimal>,
    #[serde(default)]
    pub intermediate_cost: Option<Decimal>,
    #[serde(default)]
    pub excess_cost: Option<Decimal>,
    pub occupants: u32,
    #[serde(default)]
    pub ac_units: u32,
    #[serde(default)]
    pub ac_hours_per_day: Option<u32>,
    #[serde(default)]
    pub fridges: Option<u32>,
    #[serde(default)]
    pub fridge_age: Option<String>,
    #[serde(default)]
    pub water_heating: Option<String>,
    #[serde(default)]
    pub washer: bool,
    #[serde(default)]
    pub electric_dryer: bool,
    #[serde(default)]
    pub home_office: bool,
    #[serde(default)]
    pub water_pump: bool,
}

fn date_field(field: &'static str, raw: &str) -> Result<chrono::NaiveDate, ValidationError> {
    parse_date(raw).ok_or_else(|| ValidationError::invalid_format(field, format!("unrecognized date '{raw}'")))
}

impl BillRow {
    pub fn into_inputs(self) -> Result<(BillFacts, SurveyFacts), ValidationError> {
        let mut bill = BillFacts::new(Tariff::from_code(&self.tariff), self.consumption_kwh)?;

        match (self.period_start.as_deref(), self.period_end.as_deref()) {
            (Some(start), Some(end)) => {
                let period = BillingPeriod::new(date_field("period_start", start)?, date_field("period_end", end)?)?;
                bill = bill.with_period(period);
            }
            (None, None) => {}
            (Some(_), None) => {
                return Err(ValidationError::MissingBranchField {
                    field: "period_end",
                    condition: "period_start is given",
                });
            }
            (None, Some(_)) => {
                return Err(ValidationError::MissingBranchField {
                    field: "period_start",
                    condition: "period_end is given",
                });
            }
        }
        bill.total_paid = self.total_paid;
        bill.previous_reading = self.previous_reading;
        bill.current_reading = self.current_reading;
        bill.multiplier = self.multiplier.unwrap_or(1);
        bill.subsidy = self.subsidy;
        bill.tiers = DeclaredTiers {
            basic_kwh: self.basic_kwh,
            intermediate_kwh: self.intermediate_kwh,
            excess_kwh: self.excess_kwh,
            basic_cost: self.basic_cost,
            intermediate_cost: self.intermediate_cost,
            excess_cost: self.excess_cost,
        };
        bill.validate()?;

        let survey = SurveyFacts::try_from(SurveyAnswers {
            occupants: self.occupants,
            ac_units: self.ac_units,
            ac_hours_per_day: self.ac_hours_per_day,
            fridges: self.fridges.unwrap_or(1),
            fridge_age: self.fridge_age,
            water_heating: self.water_heating,
            washer: self.washer,
            electric_dryer: self.electric_dryer,
            home_office: self.home_office,
            water_pump: self.water_pump,
        })?;

        Ok((bill, survey))
    }
}

/// Read every row, skipping `skip_lines` leading lines (disclaimers some
/// exports put above the header). Rows that fail to deserialize are kept as
/// errors so the caller can report and skip them.
pub fn read_rows<R: Read>(source: R, skip_lines: usize) -> Result<Vec<Result<BillRow, csv::Error>>, EstimateError> {
    let mut reader = BufReader::new(source);
    let mut dummy = String::new();
    for _ in 0..skip_lines {
        reader.read_line(&mut dummy)?;
        dummy.clear();
    }

    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    Ok(csv_reader.deserialize().collect())
}
