/// Status consensus for the flood-report board.
///
/// Converts the current bag of community reports into one `Verdict`. The
/// shared gates (minimum report count, flooded majority) live here; the
/// level scoring that follows is delegated to one of two strategies:
///
/// - `consensus`: categorical mode among flooded reports.
/// - `mean_level`: mean of numeric readings with a deviation check.
///
/// A deployment selects exactly one strategy through configuration.
/// Everything in this module is pure: no I/O, no clock, no shared state.

pub mod consensus;
pub mod mean_level;

use serde::Deserialize;

use crate::categories::CategoryTable;
use crate::model::{FloodStatus, Report, Verdict};

// ---------------------------------------------------------------------------
// Canned messages
// ---------------------------------------------------------------------------

pub const MSG_MONITORING: &str = "Waiting for more community reports...";
pub const MSG_DRY: &str = "Most recent reports indicate normal conditions.";
pub const MSG_LEVEL_PENDING: &str = "Flooding reported. Flood level data pending.";
pub const MSG_LEVELS_VARY: &str = "Flooding reported, but measurements vary. Stay alert.";
pub const MSG_VERIFIED: &str = "Community verified flooding in the area.";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Which level-scoring rule runs once flooding is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStrategy {
    /// Most common level category must reach `consensus_ratio`.
    Categorical,
    /// Numeric readings must all sit within `similarity_threshold` of the mean.
    MeanDeviation,
}

/// Thresholds for the consensus engine. Deserialized from the
/// `[consensus]` config section; every field has a default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConsensusSettings {
    pub strategy: ScoringStrategy,
    /// Below this many reports the board stays in Monitoring.
    pub min_reports: usize,
    /// Flooded share below this is reported Dry (exclusive: equal is flooding).
    pub flood_ratio: f64,
    /// Mode share below this is reported as varying measurements.
    pub consensus_ratio: f64,
    /// Max allowed distance from the mean, in level units.
    pub similarity_threshold: f64,
}

impl Default for ConsensusSettings {
    fn default() -> Self {
        ConsensusSettings {
            strategy: ScoringStrategy::Categorical,
            min_reports: 3,
            flood_ratio: 0.6,
            consensus_ratio: 0.6,
            similarity_threshold: 0.3,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine entry point
// ---------------------------------------------------------------------------

/// Computes the verdict for a report snapshot.
///
/// Returns the verdict together with the number of reports considered.
/// Total over any input, including an empty slice, and deterministic for a
/// given snapshot order.
pub fn compute_status(
    reports: &[Report],
    settings: &ConsensusSettings,
    table: &CategoryTable,
) -> (Verdict, usize) {
    let report_count = reports.len();

    if report_count < settings.min_reports {
        return (quiet_verdict(FloodStatus::Monitoring, MSG_MONITORING), report_count);
    }

    let flooded: Vec<&Report> = reports.iter().filter(|r| r.flooded).collect();
    let flood_ratio = flooded.len() as f64 / report_count as f64;

    if flood_ratio < settings.flood_ratio {
        return (quiet_verdict(FloodStatus::Dry, MSG_DRY), report_count);
    }

    let verdict = match settings.strategy {
        ScoringStrategy::Categorical => consensus::score_categories(&flooded, settings, table),
        ScoringStrategy::MeanDeviation => mean_level::score_levels(&flooded, settings),
    };

    (verdict, report_count)
}

fn quiet_verdict(status: FloodStatus, message: &str) -> Verdict {
    Verdict {
        status,
        message: message.to_string(),
        is_flooding: false,
        level: None,
        level_label: None,
    }
}

/// Flooding verdict without a level.
pub(crate) fn flooding_verdict(message: &str) -> Verdict {
    Verdict {
        status: FloodStatus::Flooding,
        message: message.to_string(),
        is_flooding: true,
        level: None,
        level_label: None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed(flooded: usize, dry: usize) -> Vec<Report> {
        let mut reports: Vec<Report> = (0..flooded).map(|_| Report::flooded(None)).collect();
        reports.extend((0..dry).map(|_| Report::dry()));
        reports
    }

    #[test]
    fn test_empty_snapshot_is_monitoring() {
        let (verdict, count) =
            compute_status(&[], &ConsensusSettings::default(), &CategoryTable::default());
        assert_eq!(count, 0);
        assert_eq!(verdict.status, FloodStatus::Monitoring);
        assert_eq!(verdict.message, MSG_MONITORING);
        assert!(!verdict.is_flooding);
    }

    #[test]
    fn test_below_minimum_is_monitoring_even_when_all_flooded() {
        let reports = vec![Report::flooded(Some("car")), Report::flooded(Some("car"))];
        let (verdict, count) =
            compute_status(&reports, &ConsensusSettings::default(), &CategoryTable::default());
        assert_eq!(count, 2);
        assert_eq!(verdict.status, FloodStatus::Monitoring);
        assert!(verdict.level_label.is_none());
    }

    #[test]
    fn test_min_reports_is_configurable() {
        let settings = ConsensusSettings {
            min_reports: 1,
            ..ConsensusSettings::default()
        };
        let (verdict, _) =
            compute_status(&[Report::dry()], &settings, &CategoryTable::default());
        assert_eq!(verdict.status, FloodStatus::Dry);
    }

    #[test]
    fn test_flood_ratio_exactly_at_threshold_is_not_dry() {
        // 3 of 5 flooded == 0.6; the Dry branch is strictly below.
        let (verdict, _) =
            compute_status(&mixed(3, 2), &ConsensusSettings::default(), &CategoryTable::default());
        assert_eq!(verdict.status, FloodStatus::Flooding);
        assert_eq!(verdict.message, MSG_LEVEL_PENDING);
    }

    #[test]
    fn test_flood_ratio_just_below_threshold_is_dry() {
        // 2 of 4 flooded == 0.5.
        let (verdict, _) =
            compute_status(&mixed(2, 2), &ConsensusSettings::default(), &CategoryTable::default());
        assert_eq!(verdict.status, FloodStatus::Dry);
        assert_eq!(verdict.message, MSG_DRY);
        assert!(!verdict.is_flooding);
    }

    #[test]
    fn test_strategy_switch_routes_to_mean_level() {
        let settings = ConsensusSettings {
            strategy: ScoringStrategy::MeanDeviation,
            ..ConsensusSettings::default()
        };
        let reports = vec![
            Report::flooded_at_level(0.5),
            Report::flooded_at_level(0.6),
            Report::flooded_at_level(0.7),
        ];
        let (verdict, _) = compute_status(&reports, &settings, &CategoryTable::default());
        assert_eq!(verdict.level, Some(0.6));
        assert!(verdict.level_label.is_none());
    }

    #[test]
    fn test_categorical_strategy_ignores_numeric_levels() {
        let reports = vec![
            Report::flooded_at_level(0.5),
            Report::flooded_at_level(0.6),
            Report::flooded_at_level(0.7),
        ];
        let (verdict, _) =
            compute_status(&reports, &ConsensusSettings::default(), &CategoryTable::default());
        assert_eq!(verdict.message, MSG_LEVEL_PENDING);
        assert!(verdict.level.is_none());
    }
}
