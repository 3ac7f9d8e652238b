//! Full estimation for one bill and survey.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::advice::{Advice, AdviceError, AdviceRequest, PersonalizedRecommendation};
use crate::bill::BillFacts;
use crate::breakdown::{CategoryEntry, Confidence, ConsumptionDecomposer};
use crate::emission::EmissionEstimator;
use crate::error::EstimateError;
use crate::rates::{RateTable, Tariff};
use crate::recommend::{Recommendation, RecommendationRanker};
use crate::survey::SurveyFacts;
use crate::tariff::{CostBreakdown, OverrideReason, PricingMode, TariffCostEstimator};

/// Everything handed back for one estimation. The engine keeps no reference
/// to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimationResult {
    pub tariff: Tariff,
    pub consumption_kwh: u32,
    pub cost: Decimal,
    pub cost_breakdown: CostBreakdown,
    pub co2e_kg: Decimal,
    /// Estimated cost over consumption, unrounded.
    pub price_per_kwh: Decimal,
    pub breakdown: Vec<CategoryEntry>,
    pub recommendations: Vec<Recommendation>,
    pub assumptions: Vec<String>,
    pub confidence: Confidence,
}

impl EstimationResult {
    /// Pick between a personalized batch from the advice generator and the
    /// ranked recommendations of this result.
    pub fn advice(
        &self,
        generated: Result<Vec<PersonalizedRecommendation>, AdviceError>,
    ) -> (Advice, Option<String>) {
        Advice::resolve(generated, self.recommendations.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Estimator {
    rates: RateTable,
}

impl Estimator {
    pub fn new(rates: RateTable) -> Self {
        Self { rates }
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    pub fn estimate(&self, bill: &BillFacts, survey: &SurveyFacts) -> Result<EstimationResult, EstimateError> {
        bill.validate()?;
        let kwh = bill.consumption_kwh;

        let cost_breakdown = TariffCostEstimator::new(&self.rates).breakdown(kwh, bill.tariff)?;
        let cost = cost_breakdown.total;
        let emissions = EmissionEstimator::new(&self.rates);
        let co2e_kg = emissions.estimate_co2e(kwh);

        let decomposition = ConsumptionDecomposer::new().decompose(kwh, survey);
        let price_per_kwh = cost / Decimal::from(kwh);
        let recommendations = RecommendationRanker::new(&emissions).rank(&decomposition, survey, price_per_kwh);

        let mut assumptions = decomposition.assumptions;
        match cost_breakdown.mode {
            PricingMode::HighRate(OverrideReason::ConsumptionAboveThreshold) => assumptions.push(format!(
                "Consumption above {} kWh: billed entirely at the high-consumption rate",
                self.rates.high_consumption_threshold_kwh
            )),
            PricingMode::HighRate(OverrideReason::UnknownTariff) => {
                warn!(kwh, "tariff unknown, pricing at the high-consumption rate");
                assumptions.push("Tariff unknown: the high-consumption rate was used".to_string());
            }
            PricingMode::HighRate(OverrideReason::DeclaredHighConsumptionTariff) | PricingMode::Tiered => {}
        }
        assumptions.extend(bill.cross_check(cost));

        let confidence = bill.confidence();
        debug!(tariff = %bill.tariff, kwh, %cost, %co2e_kg, %confidence, "estimation complete");

        Ok(EstimationResult {
            tariff: bill.tariff,
            consumption_kwh: kwh,
            cost,
            cost_breakdown,
            co2e_kg,
            price_per_kwh,
            breakdown: decomposition.entries,
            recommendations,
            assumptions,
            confidence,
        })
    }

    pub fn advice_request(&self, bill: &BillFacts, survey: &SurveyFacts) -> AdviceRequest {
        AdviceRequest::new(&self.rates, *survey, bill.tariff, bill.consumption_kwh)
    }
}
