//! Categorical level consensus.
//!
//! Among flooded reports that carry a level category, find the most common
//! category and check that enough reporters agree on it.
//!
//! # Tie-break
//! When two categories share the highest count, the one that appears first
//! in the snapshot wins. The store returns rows in insertion order, so in
//! practice the category that was reported earliest wins a tie. This makes
//! the winner depend on snapshot order; it is accepted behaviour and is
//! covered by tests rather than hidden behind a different ordering.

use crate::categories::CategoryTable;
use crate::model::{FloodStatus, Report, Verdict};

use super::{ConsensusSettings, MSG_LEVEL_PENDING, MSG_LEVELS_VARY, MSG_VERIFIED, flooding_verdict};

/// The winning category among a set of flooded reports.
#[derive(Debug, Clone, PartialEq)]
pub struct Majority<'a> {
    pub key: &'a str,
    /// Reports naming `key`.
    pub count: usize,
    /// Reports naming any category.
    pub categorized: usize,
}

impl Majority<'_> {
    pub fn ratio(&self) -> f64 {
        self.count as f64 / self.categorized as f64
    }
}

/// Finds the most common category among flooded reports.
///
/// Dry reports and flooded reports without a category are skipped. Returns
/// `None` when no flooded report carries a category. Ties go to the
/// category first seen in `reports` order.
pub fn majority_category<'a, I>(reports: I) -> Option<Majority<'a>>
where
    I: IntoIterator<Item = &'a Report>,
{
    // Insertion-ordered tally; category sets are tiny so a Vec beats a map.
    let mut tally: Vec<(&'a str, usize)> = Vec::new();
    let mut categorized = 0;

    for report in reports {
        if !report.flooded {
            continue;
        }
        let Some(key) = report.level_category.as_deref().filter(|k| !k.is_empty()) else {
            continue;
        };
        categorized += 1;
        match tally.iter_mut().find(|(k, _)| *k == key) {
            Some((_, count)) => *count += 1,
            None => tally.push((key, 1)),
        }
    }

    let mut best: Option<(&'a str, usize)> = None;
    for (key, count) in tally {
        // Strictly greater: an equal count never displaces an earlier key.
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((key, count));
        }
    }

    best.map(|(key, count)| Majority {
        key,
        count,
        categorized,
    })
}

/// Scores the level for a snapshot already known to be flooding.
pub fn score_categories(
    flooded: &[&Report],
    settings: &ConsensusSettings,
    table: &CategoryTable,
) -> Verdict {
    let Some(majority) = majority_category(flooded.iter().copied()) else {
        return flooding_verdict(MSG_LEVEL_PENDING);
    };

    if majority.ratio() < settings.consensus_ratio {
        return flooding_verdict(MSG_LEVELS_VARY);
    }

    match table.find(majority.key) {
        Some(category) => Verdict {
            status: FloodStatus::Flooding,
            message: category.status_message.clone(),
            is_flooding: true,
            level: None,
            level_label: Some(category.label.clone()),
        },
        None => flooding_verdict(MSG_VERIFIED),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn flooded_with(keys: &[&str]) -> Vec<Report> {
        keys.iter().map(|k| Report::flooded(Some(k))).collect()
    }

    fn score(reports: &[Report]) -> Verdict {
        let flooded: Vec<&Report> = reports.iter().filter(|r| r.flooded).collect();
        score_categories(&flooded, &ConsensusSettings::default(), &CategoryTable::default())
    }

    #[test]
    fn test_majority_counts_only_flooded_categorized_reports() {
        let mut reports = flooded_with(&["car", "car"]);
        reports.push(Report::flooded(None));
        reports.push(Report::dry());
        let majority = majority_category(&reports).expect("two categorized reports");
        assert_eq!(majority.key, "car");
        assert_eq!(majority.count, 2);
        assert_eq!(majority.categorized, 2);
    }

    #[test]
    fn test_majority_ignores_category_on_dry_report() {
        let mut stray = Report::dry();
        stray.level_category = Some("car".to_string());
        assert!(majority_category(&[stray]).is_none());
    }

    #[test]
    fn test_majority_is_none_without_categories() {
        let reports = vec![Report::flooded(None), Report::flooded(Some(""))];
        assert!(majority_category(&reports).is_none());
    }

    #[test]
    fn test_tie_goes_to_first_seen_category() {
        let reports = flooded_with(&["motorcycle", "car", "car", "motorcycle"]);
        assert_eq!(majority_category(&reports).map(|m| m.key), Some("motorcycle"));

        let reversed = flooded_with(&["car", "motorcycle", "motorcycle", "car"]);
        assert_eq!(majority_category(&reversed).map(|m| m.key), Some("car"));
    }

    #[test]
    fn test_later_category_wins_when_strictly_more_common() {
        let reports = flooded_with(&["walkable", "car", "car"]);
        assert_eq!(majority_category(&reports).map(|m| m.key), Some("car"));
    }

    #[test]
    fn test_consensus_at_threshold_sets_label_and_message() {
        let verdict = score(&flooded_with(&["car", "car", "car", "motorcycle", "walkable"]));
        assert_eq!(verdict.level_label.as_deref(), Some("Car can't pass"));
        assert_eq!(
            verdict.message,
            "Severe flooding reported. Roads are impassable for cars—avoid the area."
        );
        assert!(verdict.is_flooding);
    }

    #[test]
    fn test_consensus_below_threshold_reports_varying_measurements() {
        let verdict = score(&flooded_with(&["car", "car", "motorcycle", "motorcycle", "walkable"]));
        assert_eq!(verdict.message, MSG_LEVELS_VARY);
        assert!(verdict.level_label.is_none());
    }

    #[test]
    fn test_uncategorized_flooded_reports_do_not_dilute_consensus() {
        let mut reports = flooded_with(&["walkable", "walkable"]);
        reports.extend((0..5).map(|_| Report::flooded(None)));
        let verdict = score(&reports);
        assert_eq!(verdict.level_label.as_deref(), Some("walkable"));
    }

    #[test]
    fn test_unknown_winning_key_falls_back_to_verified_message() {
        let verdict = score(&flooded_with(&["boat", "boat", "boat"]));
        assert_eq!(verdict.status, FloodStatus::Flooding);
        assert_eq!(verdict.message, MSG_VERIFIED);
        assert!(verdict.level_label.is_none());
    }
}
