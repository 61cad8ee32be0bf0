/// Retention trim scheduling.
///
/// The report table is trimmed opportunistically after writes instead of on
/// a background timer. A trim is due only when both hold:
///
/// - at least one write landed since the last successful trim, and
/// - the cooldown has fully elapsed since that trim.
///
/// # Clock injection
/// All checks take a `now: DateTime<Utc>` parameter rather than calling
/// `Utc::now()` internally, so scheduling is deterministic in tests.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// `[retention]` config section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetentionSettings {
    /// Rows kept by a trim, newest first.
    pub keep_recent: usize,
    /// Minimum spacing between trims.
    pub cooldown_secs: i64,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        RetentionSettings {
            keep_recent: 5,
            cooldown_secs: 600,
        }
    }
}

/// Mutable trim state. Owned by `ReportLedger` and only touched under its
/// lock, together with the write that makes it dirty.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    keep_recent: usize,
    cooldown: Duration,
    last_trim: DateTime<Utc>,
    dirty: bool,
}

impl RetentionPolicy {
    /// Starts a clean policy. The first trim becomes due one cooldown after
    /// `now`.
    pub fn new_at(settings: &RetentionSettings, now: DateTime<Utc>) -> Self {
        RetentionPolicy {
            keep_recent: settings.keep_recent,
            cooldown: Duration::seconds(settings.cooldown_secs),
            last_trim: now,
            dirty: false,
        }
    }

    pub fn keep_recent(&self) -> usize {
        self.keep_recent
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn last_trim(&self) -> DateTime<Utc> {
        self.last_trim
    }

    /// Records that a write landed.
    pub fn mark_written(&mut self) {
        self.dirty = true;
    }

    /// Returns `true` if a trim should run at `now`.
    ///
    /// The cooldown boundary is inclusive: elapsed == cooldown is due.
    pub fn trim_due_at(&self, now: DateTime<Utc>) -> bool {
        self.dirty && now - self.last_trim >= self.cooldown
    }

    /// Records a successful trim. A failed trim must not be recorded, so the
    /// next write retries it.
    pub fn record_trim_at(&mut self, now: DateTime<Utc>) {
        self.last_trim = now;
        self.dirty = false;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
