//! Household electricity cost, emission and usage estimates from a CFE bill.
//!
//! All estimates are heuristic approximations: costs follow a simplified
//! residential tariff, usage categories come from survey answers and are
//! reconciled to the billed total.

pub mod advice;
pub mod batch;
pub mod bill;
pub mod breakdown;
pub mod emission;
pub mod engine;
pub mod error;
pub mod extract;
pub mod money;
pub mod rates;
pub mod recommend;
pub mod survey;
pub mod tariff;

pub use advice::{Advice, AdviceError, AdviceKind, AdviceRequest, PersonalizedRecommendation};
pub use bill::{BillFacts, BillingPeriod, DeclaredTiers};
pub use breakdown::{Category, CategoryEntry, Confidence, ConsumptionDecomposer, Decomposition};
pub use emission::EmissionEstimator;
pub use engine::{EstimationResult, Estimator};
pub use error::{EstimateError, ValidationError};
pub use rates::{RateTable, Tariff};
pub use recommend::{CostTier, Difficulty, Recommendation, RecommendationRanker};
pub use survey::{AirConditioning, FridgeAge, Laundry, Refrigeration, SurveyAnswers, SurveyFacts, WaterHeating};
pub use tariff::{CostBreakdown, PricingMode, TariffCostEstimator};
