//! Household survey answers.
//!
//! Each question group is a tagged variant carrying only the fields that are
//! valid for its branch, so "hours only when the AC is present" is a type, not
//! a runtime convention. [`SurveyAnswers`] is the loosely typed form a CSV row
//! or form post arrives in; converting it validates the branches.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AirConditioning {
    Absent,
    Present { units: u8, hours_per_day: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FridgeAge {
    New,
    Mid,
    Old,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refrigeration {
    /// 1, or 2 meaning "two or more".
    pub count: u8,
    pub age: FridgeAge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterHeating {
    Gas,
    Electric,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Laundry {
    pub washer: bool,
    pub electric_dryer: bool,
}

/// Validated survey facts consumed by the decomposer and ranker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyFacts {
    pub occupants: u8,
    pub air_conditioning: AirConditioning,
    pub refrigeration: Refrigeration,
    pub water_heating: WaterHeating,
    pub laundry: Laundry,
    pub home_office: bool,
    pub water_pump: bool,
}

impl SurveyFacts {
    pub fn has_electric_dryer(&self) -> bool {
        self.laundry.electric_dryer
    }

    pub fn fridge_age(&self) -> FridgeAge {
        self.refrigeration.age
    }
}

impl Default for SurveyFacts {
    fn default() -> Self {
        Self {
            occupants: 1,
            air_conditioning: AirConditioning::Absent,
            refrigeration: Refrigeration {
                count: 1,
                age: FridgeAge::Mid,
            },
            water_heating: WaterHeating::Gas,
            laundry: Laundry {
                washer: true,
                electric_dryer: false,
            },
            home_office: false,
            water_pump: false,
        }
    }
}

/// Survey answers as they arrive from a form or CSV row, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyAnswers {
    pub occupants: u32,
    #[serde(default)]
    pub ac_units: u32,
    #[serde(default)]
    pub ac_hours_per_day: Option<u32>,
    #[serde(default = "default_fridges")]
    pub fridges: u32,
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

fn default_fridges() -> u32 {
    1
}

fn bounded(field: &'static str, value: u32, min: u32, max: u32) -> Result<u8, ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::out_of_range(
            field,
            i64::from(min),
            i64::from(max),
            i64::from(value),
        ));
    }
    u8::try_from(value)
        .map_err(|_| ValidationError::out_of_range(field, i64::from(min), i64::from(max), i64::from(value)))
}

fn parse_fridge_age(raw: Option<&str>) -> Result<FridgeAge, ValidationError> {
    match raw.map(|s| s.trim().to_lowercase()).as_deref() {
        None | Some("") | Some("mid") | Some("medio") | Some("no_se") => Ok(FridgeAge::Mid),
        Some("new") | Some("nuevo") => Ok(FridgeAge::New),
        Some("old") | Some("viejo") => Ok(FridgeAge::Old),
        Some(other) => Err(ValidationError::invalid_format(
            "fridge_age",
            format!("expected new, mid or old, got '{other}'"),
        )),
    }
}

fn parse_water_heating(raw: Option<&str>) -> Result<WaterHeating, ValidationError> {
    match raw.map(|s| s.trim().to_lowercase()).as_deref() {
        None | Some("") | Some("gas") => Ok(WaterHeating::Gas),
        Some("elec") | Some("electric") | Some("electrico") => Ok(WaterHeating::Electric),
        Some("none") => Ok(WaterHeating::None),
        Some(other) => Err(ValidationError::invalid_format(
            "water_heating",
            format!("expected gas, electric or none, got '{other}'"),
        )),
    }
}

impl TryFrom<SurveyAnswers> for SurveyFacts {
    type Error = ValidationError;

    fn try_from(answers: SurveyAnswers) -> Result<Self, Self::Error> {
        let occupants = bounded("occupants", answers.occupants, 1, 15)?;

        let air_conditioning = if answers.ac_units == 0 {
            AirConditioning::Absent
        } else {
            let units = bounded("ac_units", answers.ac_units, 1, 10)?;
            let hours = answers
                .ac_hours_per_day
                .ok_or(ValidationError::MissingBranchField {
                    field: "ac_hours_per_day",
                    condition: "ac_units > 0",
                })?;
            let hours_per_day = bounded("ac_hours_per_day", hours, 0, 24)?;
            AirConditioning::Present {
                units,
                hours_per_day,
            }
        };

        let count = bounded("fridges", answers.fridges, 1, 10)?;

        Ok(SurveyFacts {
            occupants,
            air_conditioning,
            refrigeration: Refrigeration {
                count,
                age: parse_fridge_age(answers.fridge_age.as_deref())?,
            },
            water_heating: parse_water_heating(answers.water_heating.as_deref())?,
            laundry: Laundry {
                washer: answers.washer,
                electric_dryer: answers.electric_dryer,
            },
            home_office: answers.home_office,
            water_pump: answers.water_pump,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers() -> SurveyAnswers {
        SurveyAnswers {
            occupants: 4,
            fridges: 1,
            ..Default::default()
        }
    }

    #[test]
    fn ac_units_without_hours_is_rejected() {
        let raw = SurveyAnswers {
            ac_units: 2,
            ..answers()
        };
        assert_eq!(
            SurveyFacts::try_from(raw),
            Err(ValidationError::MissingBranchField {
                field: "ac_hours_per_day",
                condition: "ac_units > 0",
            })
        );
    }

    #[test]
    fn hours_are_ignored_when_no_ac() {
        let raw = SurveyAnswers {
            ac_units: 0,
            ac_hours_per_day: Some(8),
            ..answers()
        };
        let facts = SurveyFacts::try_from(raw).unwrap();
        assert_eq!(facts.air_conditioning, AirConditioning::Absent);
    }

    #[test]
    fn ac_branch_carries_units_and_hours() {
        let raw = SurveyAnswers {
            ac_units: 1,
            ac_hours_per_day: Some(6),
            ..answers()
        };
        let facts = SurveyFacts::try_from(raw).unwrap();
        assert_eq!(
            facts.air_conditioning,
            AirConditioning::Present {
                units: 1,
                hours_per_day: 6
            }
        );
    }

    #[test]
    fn ranges_are_enforced() {
        let raw = SurveyAnswers {
            occupants: 0,
            ..answers()
        };
        assert!(matches!(
            SurveyFacts::try_from(raw),
            Err(ValidationError::OutOfRange { field: "occupants", .. })
        ));

        let raw = SurveyAnswers {
            ac_units: 1,
            ac_hours_per_day: Some(25),
            ..answers()
        };
        assert!(matches!(
            SurveyFacts::try_from(raw),
            Err(ValidationError::OutOfRange { field: "ac_hours_per_day", .. })
        ));
    }

    #[test]
    fn categorical_answers_accept_both_vocabularies() {
        let raw = SurveyAnswers {
            fridge_age: Some("viejo".to_string()),
            water_heating: Some("elec".to_string()),
            ..answers()
        };
        let facts = SurveyFacts::try_from(raw).unwrap();
        assert_eq!(facts.fridge_age(), FridgeAge::Old);
        assert_eq!(facts.water_heating, WaterHeating::Electric);

        let raw = SurveyAnswers {
            water_heating: Some("solar".to_string()),
            ..answers()
        };
        assert!(matches!(
            SurveyFacts::try_from(raw),
            Err(ValidationError::InvalidFormat { field: "water_heating", .. })
        ));
    }
}
