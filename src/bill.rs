//! Facts read off a utility bill and the figures derived from them.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::breakdown::Confidence;
use crate::error::ValidationError;
use crate::money::{round_money, round_tenths};
use crate::rates::Tariff;

pub const MAX_CONSUMPTION_KWH: u32 = 20_000;

const DECLARED_TAX_RATE: Decimal = dec!(0.16);
const PUBLIC_LIGHTING_RATE: Decimal = dec!(0.05);
/// Relative gap between estimate and amount paid worth a note.
const PAID_MISMATCH_SHARE: Decimal = dec!(0.25);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

impl BillingPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::InvertedPeriod { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// kWh and pre-tax amounts per band as printed on the bill, when available.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredTiers {
    pub basic_kwh: Option<u32>,
    pub intermediate_kwh: Option<u32>,
    pub excess_kwh: Option<u32>,
    pub basic_cost: Option<Decimal>,
    pub intermediate_cost: Option<Decimal>,
    pub excess_cost: Option<Decimal>,
}

impl DeclaredTiers {
    fn kwh_total(&self) -> Option<u32> {
        let parts = [self.basic_kwh, self.intermediate_kwh, self.excess_kwh];
        if parts.iter().all(Option::is_none) {
            return None;
        }
        Some(parts.iter().flatten().sum())
    }

    fn cost_total(&self) -> Decimal {
        [self.basic_cost, self.intermediate_cost, self.excess_cost]
            .iter()
            .flatten()
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillFacts {
    pub tariff: Tariff,
    pub consumption_kwh: u32,
    pub period: Option<BillingPeriod>,
    pub tiers: DeclaredTiers,
    pub total_paid: Option<Decimal>,
    pub previous_reading: Option<u32>,
    pub current_reading: Option<u32>,
    pub multiplier: u32,
    pub subsidy: Option<Decimal>,
}

impl BillFacts {
    pub fn new(tariff: Tariff, consumption_kwh: u32) -> Result<Self, ValidationError> {
        let bill = Self {
            tariff,
            consumption_kwh,
            period: None,
            tiers: DeclaredTiers::default(),
            total_paid: None,
            previous_reading: None,
            current_reading: None,
            multiplier: 1,
            subsidy: None,
        };
        bill.validate()?;
        Ok(bill)
    }

    pub fn with_period(mut self, period: BillingPeriod) -> Self {
        self.period = Some(period);
        self
    }

    pub fn with_total_paid(mut self, total: Decimal) -> Self {
        self.total_paid = Some(total);
        self
    }

    pub fn with_readings(mut self, previous: u32, current: u32) -> Self {
        self.previous_reading = Some(previous);
        self.current_reading = Some(current);
        self
    }

    pub fn with_tiers(mut self, tiers: DeclaredTiers) -> Self {
        self.tiers = tiers;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.consumption_kwh == 0 {
            return Err(ValidationError::NonPositiveConsumption(0));
        }
        if self.consumption_kwh > MAX_CONSUMPTION_KWH {
            return Err(ValidationError::out_of_range(
                "consumption_kwh",
                1,
                i64::from(MAX_CONSUMPTION_KWH),
                i64::from(self.consumption_kwh),
            ));
        }
        if self.multiplier == 0 {
            return Err(ValidationError::out_of_range("multiplier", 1, i64::from(u32::MAX), 0));
        }
        if let (Some(previous), Some(current)) = (self.previous_reading, self.current_reading) {
            if current < previous {
                return Err(ValidationError::invalid_format(
                    "current_reading",
                    format!("{current} is below the previous reading {previous}"),
                ));
            }
        }
        Ok(())
    }

    pub fn period_days(&self) -> Option<i64> {
        self.period.map(|p| p.days())
    }

    /// Amount paid per kWh; zero when the amount paid or the consumption is unknown.
    pub fn average_unit_price(&self) -> Decimal {
        match self.total_paid {
            Some(total) if self.consumption_kwh > 0 => round_money(total / Decimal::from(self.consumption_kwh)),
            _ => Decimal::ZERO,
        }
    }

    pub fn declared_energy_subtotal(&self) -> Decimal {
        self.tiers.cost_total()
    }

    pub fn declared_tax(&self) -> Decimal {
        round_money(self.declared_energy_subtotal() * DECLARED_TAX_RATE)
    }

    /// Public lighting fee (DAP).
    pub fn public_lighting_fee(&self) -> Decimal {
        round_money(self.declared_energy_subtotal() * PUBLIC_LIGHTING_RATE)
    }

    pub fn subsidy(&self) -> Decimal {
        self.subsidy.unwrap_or(Decimal::ZERO)
    }

    /// Average kWh per day over the period.
    pub fn daily_demand(&self) -> Decimal {
        match self.period_days() {
            Some(days) if days > 0 => round_tenths(Decimal::from(self.consumption_kwh) / Decimal::from(days)),
            _ => Decimal::ZERO,
        }
    }

    pub fn metered_consumption(&self) -> Option<u32> {
        let (previous, current) = (self.previous_reading?, self.current_reading?);
        current.checked_sub(previous)?.checked_mul(self.multiplier)
    }

    pub fn has_full_evidence(&self) -> bool {
        self.total_paid.is_some() && self.previous_reading.is_some() && self.current_reading.is_some()
    }

    /// Overall trust in an estimate built from this bill.
    pub fn confidence(&self) -> Confidence {
        if !self.tariff.is_known() {
            Confidence::Low
        } else if self.has_full_evidence() {
            Confidence::High
        } else {
            Confidence::Medium
        }
    }

    /// Notes about declared figures that disagree with each other or with
    /// the estimate. They never change the confidence tag.
    pub fn cross_check(&self, estimated_cost: Decimal) -> Vec<String> {
        let mut notes = Vec::new();

        if let Some(metered) = self.metered_consumption() {
            if metered != self.consumption_kwh {
                notes.push(format!(
                    "Meter readings give {metered} kWh but the bill declares {} kWh",
                    self.consumption_kwh
                ));
            }
        }

        if let Some(tier_kwh) = self.tiers.kwh_total() {
            if tier_kwh != self.consumption_kwh {
                notes.push(format!(
                    "Tier consumption adds up to {tier_kwh} kWh, not the declared {} kWh",
                    self.consumption_kwh
                ));
            }
        }

        if let Some(paid) = self.total_paid.filter(|p| !p.is_zero()) {
            let gap = (estimated_cost - paid).abs() / paid;
            if gap > PAID_MISMATCH_SHARE {
                notes.push(format!(
                    "Estimated cost {estimated_cost} differs from the {paid} paid by more than 25%"
                ));
            }
        }

        notes
    }
}
