//! Report form validation.
//!
//! All checks happen here, before anything reaches the store, so an invalid
//! submission never causes a partial write.

use serde::Deserialize;
use std::fmt;

use crate::categories::CategoryTable;
use crate::model::NewReport;

/// Raw `POST /report` form fields.
#[derive(Debug, Default, Deserialize)]
pub struct ReportForm {
    pub flooded: Option<String>,
    pub level_category: Option<String>,
    /// Numeric level reading, used by the mean-deviation strategy.
    pub level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    MissingFlooded,
    InvalidFlooded(String),
    UnknownCategory(String),
    InvalidLevel(String),
}

impl fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionError::MissingFlooded => write!(f, "flooded is required"),
            SubmissionError::InvalidFlooded(v) => write!(f, "flooded must be yes or no, got '{}'", v),
            SubmissionError::UnknownCategory(v) => write!(f, "unknown level category '{}'", v),
            SubmissionError::InvalidLevel(v) => write!(f, "level must be a non-negative number, got '{}'", v),
        }
    }
}

impl std::error::Error for SubmissionError {}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Turns raw form input into a storable report.
///
/// Category and level are checked for either answer; a "no" answer then
/// clears them.
pub fn validate_submission(
    form: &ReportForm,
    table: &CategoryTable,
) -> Result<NewReport, SubmissionError> {
    let flooded = match non_empty(&form.flooded) {
        None => return Err(SubmissionError::MissingFlooded),
        Some("yes") => true,
        Some("no") => false,
        Some(other) => return Err(SubmissionError::InvalidFlooded(other.to_string())),
    };

    let level_category = match non_empty(&form.level_category) {
        None => None,
        Some(key) if table.contains(key) => Some(key.to_string()),
        Some(key) => return Err(SubmissionError::UnknownCategory(key.to_string())),
    };

    let level_value = match non_empty(&form.level) {
        None => None,
        Some(raw) => match raw.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Some(v),
            _ => return Err(SubmissionError::InvalidLevel(raw.to_string())),
        },
    };

    Ok(NewReport {
        flooded,
        level_category: level_category.filter(|_| flooded),
        level_value: level_value.filter(|_| flooded),
    })
}
