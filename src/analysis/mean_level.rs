//! Numeric level consensus.
//!
//! Alternate scoring for deployments that collect a measured water level
//! instead of a category. Readings agree when every one of them lies within
//! `similarity_threshold` of their mean; the reported level is that mean
//! rounded to two decimals.

use crate::model::{FloodStatus, Report, Verdict};

use super::{ConsensusSettings, MSG_LEVEL_PENDING, MSG_LEVELS_VARY, MSG_VERIFIED, flooding_verdict};

/// Mean and spread of a set of level readings.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSpread {
    pub mean: f64,
    /// Largest absolute distance of any reading from `mean`.
    pub max_deviation: f64,
    pub readings: usize,
}

/// Summarizes the finite numeric levels of flooded reports.
///
/// Returns `None` when no flooded report carries a usable level.
pub fn level_spread<'a, I>(reports: I) -> Option<LevelSpread>
where
    I: IntoIterator<Item = &'a Report>,
{
    let levels: Vec<f64> = reports
        .into_iter()
        .filter(|r| r.flooded)
        .filter_map(|r| r.level_value)
        .filter(|v| v.is_finite())
        .collect();

    if levels.is_empty() {
        return None;
    }

    let mean = levels.iter().sum::<f64>() / levels.len() as f64;
    let max_deviation = levels
        .iter()
        .map(|v| (v - mean).abs())
        .fold(0.0_f64, f64::max);

    Some(LevelSpread {
        mean,
        max_deviation,
        readings: levels.len(),
    })
}

/// Rounds to two decimal places, half away from zero.
pub fn round_level(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Scores the level for a snapshot already known to be flooding.
pub fn score_levels(flooded: &[&Report], settings: &ConsensusSettings) -> Verdict {
    let Some(spread) = level_spread(flooded.iter().copied()) else {
        return flooding_verdict(MSG_LEVEL_PENDING);
    };

    if spread.max_deviation > settings.similarity_threshold {
        return flooding_verdict(MSG_LEVELS_VARY);
    }

    Verdict {
        status: FloodStatus::Flooding,
        message: MSG_VERIFIED.to_string(),
        is_flooding: true,
        level: Some(round_level(spread.mean)),
        level_label: None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
