/// Core data types for the community flood-report board.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no logic and no I/O, only types and their formatting.

use chrono::{DateTime, Utc};
use std::fmt;

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// A single community observation as stored in the `reports` table.
///
/// `level_category` holds a key from the category table (e.g. `"car"`).
/// Keys are validated at the submission boundary, so anything read back
/// from the store is trusted as-is; an unknown key only means the table
/// changed after the row was written.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub flooded: bool,
    pub level_category: Option<String>,
    /// Numeric water level, only used by the mean-deviation strategy.
    pub level_value: Option<f64>,
    /// Assigned by the store on insert. `None` for reports not yet persisted.
    pub created_at: Option<DateTime<Utc>>,
}

impl Report {
    /// A dry observation. Never carries a level.
    pub fn dry() -> Self {
        Report {
            flooded: false,
            level_category: None,
            level_value: None,
            created_at: None,
        }
    }

    /// A flooded observation with an optional category key.
    pub fn flooded(level_category: Option<&str>) -> Self {
        Report {
            flooded: true,
            level_category: level_category.map(String::from),
            level_value: None,
            created_at: None,
        }
    }

    /// A flooded observation with a numeric level reading.
    pub fn flooded_at_level(level_value: f64) -> Self {
        Report {
            flooded: true,
            level_category: None,
            level_value: Some(level_value),
            created_at: None,
        }
    }
}

/// A validated submission, ready to be appended to a store.
///
/// Only `web::forms` constructs these from user input, which guarantees a
/// dry submission never carries a category or level.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    pub flooded: bool,
    pub level_category: Option<String>,
    pub level_value: Option<f64>,
}

// ---------------------------------------------------------------------------
// Verdict types
// ---------------------------------------------------------------------------

/// Headline status shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloodStatus {
    Monitoring,
    Dry,
    Flooding,
}

impl fmt::Display for FloodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FloodStatus::Monitoring => write!(f, "Monitoring"),
            FloodStatus::Dry => write!(f, "Dry"),
            FloodStatus::Flooding => write!(f, "Flooding"),
        }
    }
}

/// The aggregate status computed from the current report set.
///
/// Never persisted; recomputed on every read.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub status: FloodStatus,
    pub message: String,
    pub is_flooding: bool,
    /// Mean level (2 decimals), mean-deviation strategy only.
    pub level: Option<f64>,
    /// Category label, only on high-confidence categorical verdicts.
    pub level_label: Option<String>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by a `ReportStore` backend.
///
/// These never reach an HTTP caller: `store::ReportLedger` logs them and
/// degrades to an empty read or a dropped write.
#[derive(Debug, PartialEq)]
pub enum StoreError {
    /// Could not open a connection to the backing database.
    Connect(String),
    /// Connection acquisition or a statement exceeded its time budget.
    Timeout(String),
    /// The database accepted the connection but rejected a statement.
    Query(String),
    /// The backend is not usable (e.g. a poisoned lock).
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Connect(msg) => write!(f, "Connection error: {}", msg),
            StoreError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            StoreError::Query(msg) => write!(f, "Query error: {}", msg),
            StoreError::Unavailable(msg) => write!(f, "Store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}
