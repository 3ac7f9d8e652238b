//! Error types.

use thiserror::Error;

/// Input that cannot be estimated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("consumption must be positive, got {0} kWh")]
    NonPositiveConsumption(i64),

    #[error("field '{field}' is required when {condition}")]
    MissingBranchField {
        field: &'static str,
        condition: &'static str,
    },

    #[error("field '{field}' must be between {min} and {max}, got {actual}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        actual: i64,
    },

    #[error("billing period end {end} is not after start {start}")]
    InvertedPeriod {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: &'static str, reason: String },
}

impl ValidationError {
    pub fn out_of_range(field: &'static str, min: i64, max: i64, actual: i64) -> Self {
        ValidationError::OutOfRange {
            field,
            min,
            max,
            actual,
        }
    }

    pub fn invalid_format(field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the estimation engine and its batch front end.
#[derive(Debug, Error)]
pub enum EstimateError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("rate table could not be loaded: {0}")]
    RateTable(#[from] serde_json::Error),

    #[error("bill file could not be read: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
