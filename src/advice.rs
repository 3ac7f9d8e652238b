//! Contract with the external personalized-advice generator.
//!
//! The generator is an I/O-bound collaborator the caller runs (and times out)
//! on its own. This module describes what it is given, cleans up what it
//! returns, and decides whether to show its batch or the ranked fallback.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::money::{round_mass, round_money};
use crate::rates::{RateTable, Tariff};
use crate::recommend::Recommendation;
use crate::survey::SurveyFacts;

/// A usable batch has exactly this many items.
pub const BATCH_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdviceKind {
    NoInvestment,
    Investment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalizedRecommendation {
    pub title: String,
    pub description: String,
    pub kind: AdviceKind,
    pub monthly_savings: Decimal,
    pub annual_savings: Decimal,
    pub annual_co2e_reduction_kg: Decimal,
    /// Only for [`AdviceKind::Investment`].
    pub investment_cost: Option<Decimal>,
    /// Only for [`AdviceKind::Investment`].
    pub payback_months: Option<u32>,
    /// 1 is the most important.
    pub priority: u32,
}

/// What the generator is asked about.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdviceRequest {
    pub survey: SurveyFacts,
    pub tariff: Tariff,
    pub consumption_kwh: u32,
    pub reference_price_per_kwh: Decimal,
    pub emission_factor: Decimal,
}

impl AdviceRequest {
    pub fn new(rates: &RateTable, survey: SurveyFacts, tariff: Tariff, consumption_kwh: u32) -> Self {
        Self {
            survey,
            tariff,
            consumption_kwh,
            reference_price_per_kwh: rates.reference_price(tariff),
            emission_factor: rates.emission_factor,
        }
    }
}

/// Why a generator batch was not used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdviceError {
    #[error("advice generator unavailable: {0}")]
    Unavailable(String),

    #[error("advice generator returned {0} usable items, expected 5")]
    WrongCount(usize),

    #[error("advice generator returned malformed output: {0}")]
    Malformed(String),
}

fn decimal_field(item: &Value, key: &str) -> Option<Decimal> {
    match item.get(key)? {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text_field(item: &Value, key: &str, default: &str) -> String {
    item.get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

/// Clean up a raw generator reply: keep the first five items, round money
/// and mass to cents, drop investment-only fields from no-investment items
/// and default the priority to the item position.
pub fn normalize_batch(raw: &Value) -> Result<Vec<PersonalizedRecommendation>, AdviceError> {
    let items = raw
        .as_array()
        .ok_or_else(|| AdviceError::Malformed("expected a JSON array".to_string()))?;

    let batch: Vec<PersonalizedRecommendation> = items
        .iter()
        .take(BATCH_SIZE)
        .enumerate()
        .map(|(index, item)| {
            let kind = match item.get("kind").and_then(Value::as_str) {
                Some("investment") => AdviceKind::Investment,
                _ => AdviceKind::NoInvestment,
            };
            let (investment_cost, payback_months) = match kind {
                AdviceKind::Investment => (
                    decimal_field(item, "investment_cost")
                        .filter(|c| !c.is_zero())
                        .map(round_money),
                    item.get("payback_months")
                        .and_then(Value::as_u64)
                        .and_then(|m| u32::try_from(m).ok())
                        .filter(|m| *m > 0),
                ),
                AdviceKind::NoInvestment => (None, None),
            };
            let position = u32::try_from(index + 1).unwrap_or(u32::MAX);
            PersonalizedRecommendation {
                title: text_field(item, "title", "Untitled"),
                description: text_field(item, "description", ""),
                kind,
                monthly_savings: round_money(decimal_field(item, "monthly_savings").unwrap_or_default()),
                annual_savings: round_money(decimal_field(item, "annual_savings").unwrap_or_default()),
                annual_co2e_reduction_kg: round_mass(
                    decimal_field(item, "annual_co2e_reduction_kg").unwrap_or_default(),
                ),
                investment_cost,
                payback_months,
                priority: item
                    .get("priority")
                    .and_then(Value::as_u64)
                    .and_then(|p| u32::try_from(p).ok())
                    .unwrap_or(position),
            }
        })
        .collect();

    if batch.len() != BATCH_SIZE {
        return Err(AdviceError::WrongCount(batch.len()));
    }
    Ok(batch)
}

/// Recommendations shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "items", rename_all = "snake_case")]
pub enum Advice {
    Personalized(Vec<PersonalizedRecommendation>),
    Ranked(Vec<Recommendation>),
}

impl Advice {
    /// Use the generator's batch when it produced a full one, the ranked
    /// recommendations otherwise. The note explains a fallback.
    pub fn resolve(
        generated: Result<Vec<PersonalizedRecommendation>, AdviceError>,
        ranked: Vec<Recommendation>,
    ) -> (Self, Option<String>) {
        match generated {
            Ok(batch) if batch.len() == BATCH_SIZE => (Advice::Personalized(batch), None),
            Ok(batch) => Self::fallback(AdviceError::WrongCount(batch.len()), ranked),
            Err(err) => Self::fallback(err, ranked),
        }
    }

    fn fallback(err: AdviceError, ranked: Vec<Recommendation>) -> (Self, Option<String>) {
        warn!(error = %err, "falling back to rule-based recommendations");
        (
            Advice::Ranked(ranked),
            Some(format!("Personalized advice unavailable ({err}); showing rule-based recommendations")),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            Advice::Personalized(items) => items.len(),
            Advice::Ranked(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
