//! Decomposition of a bill's consumption into usage categories.
//!
//! Categories are estimated from survey heuristics and then reconciled so
//! that their kWh add up to the billed total exactly.

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::money::{floor_kwh, round_kwh, round_percent};
use crate::survey::{AirConditioning, FridgeAge, SurveyFacts, WaterHeating};

const FRIDGE_BASE_SINGLE_KWH: u32 = 100;
const FRIDGE_BASE_MULTI_KWH: u32 = 160;
const FRIDGE_OLD_FACTOR: Decimal = dec!(1.20);
const FRIDGE_NEW_FACTOR: Decimal = dec!(0.85);

const STANDBY_SHARE: Decimal = dec!(0.10);
const STANDBY_MIN_KWH: u32 = 30;

const AC_UNIT_KW: Decimal = dec!(1.2);
const BILLING_CYCLE_DAYS: u32 = 60;
const AC_MAX_SHARE: Decimal = dec!(0.60);

const WATER_HEATING_BASE_KWH: u32 = 40;
const WATER_HEATING_PER_OCCUPANT_KWH: u32 = 15;
const WATER_HEATING_MAX_KWH: u32 = 120;

const WASHER_KWH: u32 = 20;
const DRYER_KWH: u32 = 120;
const HOME_OFFICE_KWH: u32 = 80;
const WATER_PUMP_KWH: u32 = 50;

/// Order in which categories give up kWh when the estimates overshoot.
const FLEXIBLE: [Category; 4] = [
    Category::AirConditioning,
    Category::HomeOffice,
    Category::Standby,
    Category::WaterPumping,
];
const FLEXIBLE_CUT_SHARE: Decimal = dec!(0.30);
const FLEXIBLE_FLOOR_KWH: u32 = 10;
const SLACK_KWH: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Refrigeration,
    Standby,
    AirConditioning,
    WaterHeating,
    Laundry,
    HomeOffice,
    WaterPumping,
    Other,
}

impl Category {
    pub fn name(&self) -> &'static str {
        match self {
            Category::Refrigeration => "Refrigeration",
            Category::Standby => "Standby / miscellaneous",
            Category::AirConditioning => "Air conditioning",
            Category::WaterHeating => "Water heating",
            Category::Laundry => "Laundry",
            Category::HomeOffice => "Electronics / home office",
            Category::WaterPumping => "Water pumping",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryEntry {
    pub category: Category,
    pub kwh: u32,
    /// Share of the total, 0-100 with one decimal.
    pub percentage: Decimal,
    pub confidence: Confidence,
}

/// Reconciled breakdown, ordered by descending kWh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Decomposition {
    pub entries: Vec<CategoryEntry>,
    pub assumptions: Vec<String>,
    /// The survey profile could not fit the total even after trimming every
    /// flexible category, so all categories were scaled down proportionally.
    pub rescaled: bool,
}

impl Decomposition {
    pub fn get(&self, category: Category) -> Option<&CategoryEntry> {
        self.entries.iter().find(|e| e.category == category)
    }

    pub fn kwh(&self, category: Category) -> Option<u32> {
        self.get(category).map(|e| e.kwh)
    }

    pub fn total_kwh(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.kwh)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct Draft {
    category: Category,
    kwh: u32,
    confidence: Confidence,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsumptionDecomposer;

impl ConsumptionDecomposer {
    pub fn new() -> Self {
        Self
    }

    pub fn decompose(&self, total_kwh: u32, survey: &SurveyFacts) -> Decomposition {
        if total_kwh == 0 {
            return Decomposition::default();
        }

        let mut assumptions = Vec::new();
        let mut drafts = estimate_categories(total_kwh, survey, &mut assumptions);
        let rescaled = reconcile(&mut drafts, total_kwh, &mut assumptions);

        let mut entries: Vec<CategoryEntry> = drafts
            .into_iter()
            .map(|d| CategoryEntry {
                category: d.category,
                kwh: d.kwh,
                percentage: round_percent(Decimal::from(d.kwh) * dec!(100) / Decimal::from(total_kwh)),
                confidence: d.confidence,
            })
            .collect();
        entries.sort_by(|a, b| b.kwh.cmp(&a.kwh));

        Decomposition {
            entries,
            assumptions,
            rescaled,
        }
    }
}

fn estimate_categories(total_kwh: u32, survey: &SurveyFacts, notes: &mut Vec<String>) -> Vec<Draft> {
    let total = Decimal::from(total_kwh);
    let mut drafts = Vec::new();

    let base = if survey.refrigeration.count >= 2 {
        FRIDGE_BASE_MULTI_KWH
    } else {
        FRIDGE_BASE_SINGLE_KWH
    };
    let fridge_kwh = match survey.refrigeration.age {
        FridgeAge::Old => {
            notes.push("Old refrigerator: +20% estimated consumption".to_string());
            floor_kwh(Decimal::from(base) * FRIDGE_OLD_FACTOR)
        }
        FridgeAge::New => {
            notes.push("New refrigerator: -15% estimated consumption".to_string());
            floor_kwh(Decimal::from(base) * FRIDGE_NEW_FACTOR)
        }
        FridgeAge::Mid => base,
    };
    drafts.push(Draft {
        category: Category::Refrigeration,
        kwh: fridge_kwh,
        confidence: Confidence::High,
    });

    drafts.push(Draft {
        category: Category::Standby,
        kwh: STANDBY_MIN_KWH.max(round_kwh(total * STANDBY_SHARE)),
        confidence: Confidence::Low,
    });
    notes.push(format!(
        "Standby estimated as 10% of total consumption (min. {STANDBY_MIN_KWH} kWh)"
    ));

    if let AirConditioning::Present {
        units,
        hours_per_day,
    } = survey.air_conditioning
    {
        if hours_per_day > 0 {
            let raw = Decimal::from(units)
                * Decimal::from(hours_per_day)
                * AC_UNIT_KW
                * Decimal::from(BILLING_CYCLE_DAYS);
            let cap = floor_kwh(total * AC_MAX_SHARE);
            drafts.push(Draft {
                category: Category::AirConditioning,
                kwh: floor_kwh(raw).min(cap),
                confidence: Confidence::Medium,
            });
            notes.push(format!(
                "A/C: {units} unit(s) x {hours_per_day}h/day x {AC_UNIT_KW}kW x {BILLING_CYCLE_DAYS} days, capped at 60% of total"
            ));
        }
    }

    if survey.water_heating == WaterHeating::Electric {
        let kwh = WATER_HEATING_MAX_KWH
            .min(WATER_HEATING_BASE_KWH + WATER_HEATING_PER_OCCUPANT_KWH * u32::from(survey.occupants));
        drafts.push(Draft {
            category: Category::WaterHeating,
            kwh,
            confidence: Confidence::Medium,
        });
        notes.push(format!("Electric water heater for {} occupant(s)", survey.occupants));
    }

    let mut laundry_kwh = 0;
    if survey.laundry.washer {
        laundry_kwh += WASHER_KWH;
        notes.push(format!("Washer: ~{WASHER_KWH} kWh per billing cycle"));
    }
    if survey.laundry.electric_dryer {
        laundry_kwh += DRYER_KWH;
        notes.push(format!("Electric dryer: ~{DRYER_KWH} kWh per billing cycle"));
    }
    if laundry_kwh > 0 {
        drafts.push(Draft {
            category: Category::Laundry,
            kwh: laundry_kwh,
            confidence: if survey.laundry.electric_dryer {
                Confidence::Medium
            } else {
                Confidence::High
            },
        });
    }

    if survey.home_office {
        drafts.push(Draft {
            category: Category::HomeOffice,
            kwh: HOME_OFFICE_KWH,
            confidence: Confidence::Low,
        });
        notes.push(format!(
            "Home office: ~{HOME_OFFICE_KWH} kWh per billing cycle (PC and peripherals)"
        ));
    }

    if survey.water_pump {
        drafts.push(Draft {
            category: Category::WaterPumping,
            kwh: WATER_PUMP_KWH,
            confidence: Confidence::Low,
        });
        notes.push(format!("Water pump: ~{WATER_PUMP_KWH} kWh per billing cycle"));
    }

    drafts
}

fn draft_sum(drafts: &[Draft]) -> i64 {
    drafts.iter().map(|d| i64::from(d.kwh)).sum()
}

/// Bring the draft sum to exactly `total_kwh`. Returns true when the
/// proportional rescale had to run.
fn reconcile(drafts: &mut Vec<Draft>, total_kwh: u32, notes: &mut Vec<String>) -> bool {
    let total = i64::from(total_kwh);
    let sum = draft_sum(drafts);

    if sum > total {
        // Excess shrinks by the nominal cut, not by what flooring left behind.
        let mut excess = Decimal::from(sum - total);
        for category in FLEXIBLE {
            if excess <= Decimal::ZERO {
                break;
            }
            if let Some(draft) = drafts.iter_mut().find(|d| d.category == category) {
                let current = Decimal::from(draft.kwh);
                let cut = (current * FLEXIBLE_CUT_SHARE).min(excess);
                let reduced = floor_kwh(current - cut).max(FLEXIBLE_FLOOR_KWH.min(draft.kwh));
                debug!(%category, from = draft.kwh, to = reduced, "trimming flexible category");
                excess -= cut;
                draft.kwh = reduced;
            }
        }
    }

    let residual = total - draft_sum(drafts);
    if residual > SLACK_KWH {
        // Added after the flexible pass so it is never trimmed.
        drafts.push(Draft {
            category: Category::Other,
            kwh: u32::try_from(residual).unwrap_or(u32::MAX),
            confidence: Confidence::Low,
        });
        notes.push(format!("Other unidentified consumption: {residual} kWh"));
        return false;
    }
    if residual == 0 {
        return false;
    }

    let Some(standby) = drafts.iter_mut().find(|d| d.category == Category::Standby) else {
        return rescale(drafts, total_kwh, notes);
    };

    if residual > 0 {
        standby.kwh += u32::try_from(residual).unwrap_or(0);
        notes.push(format!("Rounding slack of {residual} kWh assigned to standby"));
        return false;
    }

    let overshoot = u32::try_from(-residual).unwrap_or(u32::MAX);
    let absorbed = overshoot.min(standby.kwh - FLEXIBLE_FLOOR_KWH.min(standby.kwh));
    standby.kwh -= absorbed;
    debug!(overshoot, absorbed, "standby absorbing overshoot");

    if overshoot > absorbed {
        return rescale(drafts, total_kwh, notes);
    }
    false
}

/// Largest-remainder scaling of every draft onto `total_kwh`. Ties in the
/// remainder go to the earlier category.
fn rescale(drafts: &mut [Draft], total_kwh: u32, notes: &mut Vec<String>) -> bool {
    let sum = u64::try_from(draft_sum(drafts)).unwrap_or(0);
    if sum == 0 {
        return false;
    }
    let total = u64::from(total_kwh);

    let mut remainders: Vec<(usize, u64)> = Vec::with_capacity(drafts.len());
    let mut assigned = 0u64;
    for (index, draft) in drafts.iter_mut().enumerate() {
        let scaled = u64::from(draft.kwh) * total;
        let share = scaled / sum;
        remainders.push((index, scaled % sum));
        assigned += share;
        draft.kwh = u32::try_from(share).unwrap_or(u32::MAX);
    }
    remainders.sort_by(|a, b| b.1.cmp(&a.1));
    let leftover = usize::try_from(total - assigned).unwrap_or(0);
    for &(index, _) in remainders.iter().take(leftover) {
        drafts[index].kwh += 1;
    }

    notes.push(format!(
        "Survey profile exceeds the billed {total_kwh} kWh; all categories scaled down proportionally"
    ));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::{Laundry, Refrigeration};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn decompose(total: u32, survey: &SurveyFacts) -> Decomposition {
        ConsumptionDecomposer::new().decompose(total, survey)
    }

    fn heavy_survey() -> SurveyFacts {
        SurveyFacts {
            occupants: 4,
            air_conditioning: AirConditioning::Present {
                units: 2,
                hours_per_day: 8,
            },
            refrigeration: Refrigeration {
                count: 1,
                age: FridgeAge::Old,
            },
            water_heating: WaterHeating::Electric,
            laundry: Laundry {
                washer: true,
                electric_dryer: true,
            },
            home_office: true,
            water_pump: true,
        }
    }

    #[test]
    fn residual_goes_to_other() {
        let result = decompose(400, &SurveyFacts::default());
        let rows: Vec<(Category, u32, Decimal)> = result
            .entries
            .iter()
            .map(|e| (e.category, e.kwh, e.percentage))
            .collect();
        assert_eq!(
            rows,
            vec![
                (Category::Other, 240, dec!(60.0)),
                (Category::Refrigeration, 100, dec!(25.0)),
                (Category::Standby, 40, dec!(10.0)),
                (Category::Laundry, 20, dec!(5.0)),
            ]
        );
        assert_eq!(result.get(Category::Other).unwrap().confidence, Confidence::Low);
        assert!(result
            .assumptions
            .iter()
            .any(|a| a == "Other unidentified consumption: 240 kWh"));
    }

    #[test]
    fn small_slack_is_folded_into_standby() {
        let result = decompose(155, &SurveyFacts::default());
        assert_eq!(result.kwh(Category::Other), None);
        assert_eq!(result.kwh(Category::Standby), Some(35));
        assert_eq!(result.total_kwh(), 155);
    }

    #[test]
    fn small_overshoot_is_absorbed_by_standby() {
        let result = decompose(140, &SurveyFacts::default());
        assert_eq!(result.kwh(Category::Refrigeration), Some(100));
        assert_eq!(result.kwh(Category::Standby), Some(20));
        assert_eq!(result.kwh(Category::Laundry), Some(20));
        assert!(!result.rescaled);
    }

    fn ac_and_office(hours_per_day: u8) -> SurveyFacts {
        SurveyFacts {
            air_conditioning: AirConditioning::Present {
                units: 1,
                hours_per_day,
            },
            home_office: true,
            ..SurveyFacts::default()
        }
    }

    #[test]
    fn flexible_trim_floors_the_trimmed_value() {
        // 374 estimated against 300: A/C 144 - 43.2, office 80 - 24, standby
        // 30 - 6.8. The 1 kWh left after flooring goes to standby.
        let result = decompose(300, &ac_and_office(2));
        assert_eq!(result.kwh(Category::AirConditioning), Some(100));
        assert_eq!(result.kwh(Category::HomeOffice), Some(56));
        assert_eq!(result.kwh(Category::Standby), Some(24));
        assert_eq!(result.kwh(Category::Refrigeration), Some(100));
        assert_eq!(result.get(Category::Other), None);
        assert!(!result.rescaled);
        assert!(result
            .assumptions
            .iter()
            .any(|a| a == "Rounding slack of 1 kWh assigned to standby"));
    }

    #[test]
    fn flexible_trim_stops_once_excess_is_gone() {
        // 381 estimated against 370: A/C alone gives up the 11 kWh.
        let result = decompose(370, &ac_and_office(2));
        assert_eq!(result.kwh(Category::AirConditioning), Some(133));
        assert_eq!(result.kwh(Category::HomeOffice), Some(80));
        assert_eq!(result.kwh(Category::Standby), Some(37));
        assert_eq!(result.total_kwh(), 370);
        assert_eq!(result.get(Category::Other), None);
    }

    #[test]
    fn ac_is_capped_at_sixty_percent() {
        let survey = SurveyFacts {
            air_conditioning: AirConditioning::Present {
                units: 1,
                hours_per_day: 10,
            },
            ..SurveyFacts::default()
        };
        let result = decompose(1000, &survey);
        assert_eq!(result.kwh(Category::AirConditioning), Some(600));
        assert_eq!(result.entries[0].category, Category::AirConditioning);
    }

    #[test]
    fn ac_with_zero_hours_is_absent() {
        let survey = SurveyFacts {
            air_conditioning: AirConditioning::Present {
                units: 1,
                hours_per_day: 0,
            },
            ..SurveyFacts::default()
        };
        assert_eq!(decompose(300, &survey).get(Category::AirConditioning), None);
    }

    #[test]
    fn refrigeration_base_and_age() {
        let mut survey = SurveyFacts::default();
        survey.refrigeration = Refrigeration {
            count: 2,
            age: FridgeAge::New,
        };
        assert_eq!(decompose(1000, &survey).kwh(Category::Refrigeration), Some(136));
        survey.refrigeration.age = FridgeAge::Old;
        assert_eq!(decompose(1000, &survey).kwh(Category::Refrigeration), Some(192));
    }

    #[test]
    fn laundry_confidence_depends_on_dryer() {
        let mut survey = SurveyFacts::default();
        assert_eq!(
            decompose(1000, &survey).get(Category::Laundry).unwrap().confidence,
            Confidence::High
        );
        survey.laundry.electric_dryer = true;
        let entry = decompose(1000, &survey).get(Category::Laundry).cloned().unwrap();
        assert_eq!(entry.kwh, 140);
        assert_eq!(entry.confidence, Confidence::Medium);
    }

    #[test]
    fn water_heating_is_capped() {
        let survey = SurveyFacts {
            occupants: 10,
            water_heating: WaterHeating::Electric,
            ..SurveyFacts::default()
        };
        assert_eq!(decompose(1000, &survey).kwh(Category::WaterHeating), Some(120));
    }

    #[test]
    fn overshoot_beyond_floors_rescales() {
        let result = decompose(200, &heavy_survey());
        assert!(result.rescaled);
        assert_eq!(result.total_kwh(), 200);
        assert_eq!(result.get(Category::Other), None);
    }

    #[test]
    fn tiny_total_still_reconciles() {
        let result = decompose(1, &SurveyFacts::default());
        assert_eq!(result.total_kwh(), 1);
        assert_eq!(result.kwh(Category::Refrigeration), Some(1));
        assert_eq!(result.get(Category::Refrigeration).unwrap().percentage, dec!(100.0));
    }

    #[test]
    fn zero_total_is_empty() {
        let result = decompose(0, &heavy_survey());
        assert!(result.is_empty());
        assert!(result.assumptions.is_empty());
    }

    fn survey_strategy() -> impl Strategy<Value = SurveyFacts> {
        (
            1u8..=15,
            0u8..=3,
            0u8..=24,
            1u8..=3,
            prop_oneof![Just(FridgeAge::New), Just(FridgeAge::Mid), Just(FridgeAge::Old)],
            prop_oneof![
                Just(WaterHeating::Gas),
                Just(WaterHeating::Electric),
                Just(WaterHeating::None)
            ],
            any::<(bool, bool, bool, bool)>(),
        )
            .prop_map(|(occupants, units, hours, count, age, water_heating, flags)| {
                let (washer, electric_dryer, home_office, water_pump) = flags;
                SurveyFacts {
                    occupants,
                    air_conditioning: if units == 0 {
                        AirConditioning::Absent
                    } else {
                        AirConditioning::Present {
                            units,
                            hours_per_day: hours,
                        }
                    },
                    refrigeration: Refrigeration { count, age },
                    water_heating,
                    laundry: Laundry {
                        washer,
                        electric_dryer,
                    },
                    home_office,
                    water_pump,
                }
            })
    }

    proptest! {
        #[test]
        fn prop_breakdown_sums_to_total(total in 1u32..20_000, survey in survey_strategy()) {
            let result = decompose(total, &survey);
            prop_assert_eq!(result.total_kwh(), u64::from(total));
        }

        #[test]
        fn prop_percentages_within_slack(total in 1u32..20_000, survey in survey_strategy()) {
            let result = decompose(total, &survey);
            let sum: Decimal = result.entries.iter().map(|e| e.percentage).sum();
            prop_assert!((sum - dec!(100)).abs() <= dec!(0.5), "percentages sum to {}", sum);
        }

        #[test]
        fn prop_sorted_by_kwh(total in 1u32..20_000, survey in survey_strategy()) {
            let result = decompose(total, &survey);
            prop_assert!(result.entries.windows(2).all(|w| w[0].kwh >= w[1].kwh));
        }

        #[test]
        fn prop_decompose_is_deterministic(total in 0u32..20_000, survey in survey_strategy()) {
            prop_assert_eq!(decompose(total, &survey), decompose(total, &survey));
        }
    }
}
