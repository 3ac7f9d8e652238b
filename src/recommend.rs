//! Rule-based savings recommendations.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::breakdown::{Category, Decomposition};
use crate::emission::EmissionEstimator;
use crate::money::{floor_kwh, round_money};
use crate::survey::{FridgeAge, SurveyFacts};

/// At most this many recommendations are returned.
pub const TOP_N: usize = 3;

const AC_MIN_KWH: u32 = 100;
const AC_SAVING_SHARE: Decimal = dec!(0.12);
const FRIDGE_SAVING_SHARE: Decimal = dec!(0.10);
const LIGHTING_KWH: u32 = 20;
const STANDBY_MIN_KWH: u32 = 40;
const STANDBY_KWH: u32 = 15;
const DRYER_KWH: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CostTier {
    Free,
    Low,
    Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub kwh_saved: u32,
    pub money_saved: Decimal,
    pub co2e_avoided_kg: Decimal,
    pub cost: CostTier,
    pub difficulty: Difficulty,
}

struct Candidate {
    title: &'static str,
    description: &'static str,
    kwh_saved: u32,
    cost: CostTier,
}

pub struct RecommendationRanker<'a> {
    emissions: &'a EmissionEstimator,
}

impl<'a> RecommendationRanker<'a> {
    pub fn new(emissions: &'a EmissionEstimator) -> Self {
        Self { emissions }
    }

    /// Candidates sorted by kWh saved, ties in generation order, cut to [`TOP_N`].
    pub fn rank(&self, breakdown: &Decomposition, survey: &SurveyFacts, price_per_kwh: Decimal) -> Vec<Recommendation> {
        let mut candidates = candidates(breakdown, survey);
        candidates.sort_by(|a, b| b.kwh_saved.cmp(&a.kwh_saved));
        candidates
            .into_iter()
            .take(TOP_N)
            .map(|c| Recommendation {
                title: c.title.to_string(),
                description: c.description.to_string(),
                kwh_saved: c.kwh_saved,
                money_saved: round_money(Decimal::from(c.kwh_saved) * price_per_kwh),
                co2e_avoided_kg: self.emissions.estimate_co2e(c.kwh_saved),
                cost: c.cost,
                difficulty: Difficulty::Easy,
            })
            .collect()
    }
}

fn candidates(breakdown: &Decomposition, survey: &SurveyFacts) -> Vec<Candidate> {
    let mut out = Vec::new();

    if let Some(ac) = breakdown.kwh(Category::AirConditioning).filter(|&kwh| kwh > AC_MIN_KWH) {
        out.push(Candidate {
            title: "Optimize air conditioning use",
            description: "Raise the thermostat by 2°C, clean the filters monthly and seal doors and windows.",
            kwh_saved: floor_kwh(Decimal::from(ac) * AC_SAVING_SHARE),
            cost: CostTier::Free,
        });
    }

    if survey.fridge_age() == FridgeAge::Old {
        let fridge = breakdown.kwh(Category::Refrigeration).unwrap_or(0);
        out.push(Candidate {
            title: "Check the old refrigerator",
            description: "Inspect the door seal and set the temperature to 4°C. In the medium term, consider replacing it.",
            kwh_saved: floor_kwh(Decimal::from(fridge) * FRIDGE_SAVING_SHARE),
            cost: CostTier::Low,
        });
    }

    out.push(Candidate {
        title: "Switch to LED lighting",
        description: "Replace incandescent bulbs with LEDs and turn off lights when leaving a room.",
        kwh_saved: LIGHTING_KWH,
        cost: CostTier::Low,
    });

    if breakdown.kwh(Category::Standby).is_some_and(|kwh| kwh > STANDBY_MIN_KWH) {
        out.push(Candidate {
            title: "Cut standby consumption",
            description: "Use power strips with a switch to fully turn off devices that are not in use.",
            kwh_saved: STANDBY_KWH,
            cost: CostTier::Low,
        });
    }

    if survey.has_electric_dryer() {
        out.push(Candidate {
            title: "Use the dryer less",
            description: "Air-dry clothes whenever possible and keep the dryer for emergencies.",
            kwh_saved: DRYER_KWH,
            cost: CostTier::Free,
        });
    }

    out
}
