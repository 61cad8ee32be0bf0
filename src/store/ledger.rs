/// The shared, locked report store.
///
/// `ReportLedger` is what request handlers hold. It pairs the configured
/// backend with its retention state behind one mutex, because
/// write-then-maybe-trim is a read-modify-write on both. It also owns the
/// degradation rules: store failures are logged here and turned into an
/// empty read or a dropped write, never an error for the caller.

use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};

use crate::logging;
use crate::model::{NewReport, Report, StoreError};

use super::{ReportStore, RetentionPolicy, RetentionSettings};

struct LedgerState {
    store: Box<dyn ReportStore>,
    retention: RetentionPolicy,
}

/// Outcome of `ReportLedger::save_report_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Report stored, no trim due.
    Saved,
    /// Report stored and a retention trim removed this many rows.
    SavedAndTrimmed(u64),
    /// Report stored but the due trim failed; it will be retried.
    SavedTrimFailed,
    /// Store unavailable; report dropped.
    Dropped,
}

impl SaveOutcome {
    pub fn is_saved(self) -> bool {
        !matches!(self, SaveOutcome::Dropped)
    }
}

pub struct ReportLedger {
    backend: &'static str,
    state: Mutex<LedgerState>,
}

impl ReportLedger {
    pub fn new(store: Box<dyn ReportStore>, retention: &RetentionSettings) -> Self {
        Self::new_at(store, retention, Utc::now())
    }

    /// Like `new`, with an injected start time for the retention clock.
    pub fn new_at(
        store: Box<dyn ReportStore>,
        retention: &RetentionSettings,
        now: DateTime<Utc>,
    ) -> Self {
        ReportLedger {
            backend: store.backend_name(),
            state: Mutex::new(LedgerState {
                store,
                retention: RetentionPolicy::new_at(retention, now),
            }),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("ledger lock poisoned".to_string()))
    }

    /// Creates the schema. Returns `false` (after logging) if the store is
    /// unreachable; the service keeps running and reads degrade.
    pub fn init_schema(&self) -> bool {
        let result = self.lock().and_then(|mut state| state.store.init_schema());
        match result {
            Ok(()) => {
                logging::info(logging::Component::Store, Some(self.backend), "Report table ready");
                true
            }
            Err(e) => {
                logging::log_store_failure(self.backend, "Schema setup", &e);
                false
            }
        }
    }

    /// Current reports, oldest first. Empty when the store is unavailable.
    pub fn load_reports(&self) -> Vec<Report> {
        let result = self.lock().and_then(|mut state| state.store.fetch_all());
        match result {
            Ok(reports) => reports,
            Err(e) => {
                logging::log_store_failure(self.backend, "Load reports", &e);
                Vec::new()
            }
        }
    }

    pub fn save_report(&self, report: &NewReport) -> SaveOutcome {
        self.save_report_at(report, Utc::now())
    }

    /// Appends a report and runs the retention trim if one is due at `now`.
    pub fn save_report_at(&self, report: &NewReport, now: DateTime<Utc>) -> SaveOutcome {
        let mut state = match self.lock() {
            Ok(state) => state,
            Err(e) => {
                logging::log_store_failure(self.backend, "Save report", &e);
                return SaveOutcome::Dropped;
            }
        };

        if let Err(e) = state.store.append(report) {
            logging::log_store_failure(self.backend, "Save report", &e);
            return SaveOutcome::Dropped;
        }

        state.retention.mark_written();
        if !state.retention.trim_due_at(now) {
            return SaveOutcome::Saved;
        }

        let keep = state.retention.keep_recent();
        match state.store.trim_retain_recent(keep) {
            Ok(deleted) => {
                state.retention.record_trim_at(now);
                logging::log_trim_summary(self.backend, deleted, keep);
                SaveOutcome::SavedAndTrimmed(deleted)
            }
            Err(e) => {
                logging::log_store_failure(self.backend, "Retention trim", &e);
                SaveOutcome::SavedTrimFailed
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
    }

    fn dry() -> NewReport {
        NewReport {
            flooded: false,
            level_category: None,
            level_value: None,
        }
    }

    /// Backend whose individual operations can be made to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_append: bool,
        fail_fetch: bool,
        fail_trim: bool,
    }

    impl ReportStore for FlakyStore {
        fn backend_name(&self) -> &'static str {
            "flaky"
        }
        fn init_schema(&mut self) -> Result<(), StoreError> {
            Err(StoreError::Connect("connection refused".to_string()))
        }
        fn append(&mut self, report: &NewReport) -> Result<(), StoreError> {
            if self.fail_append {
                return Err(StoreError::Timeout("pool timeout".to_string()));
            }
            self.inner.append(report)
        }
        fn fetch_all(&mut self) -> Result<Vec<Report>, StoreError> {
            if self.fail_fetch {
                return Err(StoreError::Timeout("statement timeout".to_string()));
            }
            self.inner.fetch_all()
        }
        fn trim_retain_recent(&mut self, keep: usize) -> Result<u64, StoreError> {
            if self.fail_trim {
                return Err(StoreError::Query("permission denied".to_string()));
            }
            self.inner.trim_retain_recent(keep)
        }
    }

    fn ledger_with(store: impl ReportStore + 'static) -> ReportLedger {
        ReportLedger::new_at(Box::new(store), &RetentionSettings::default(), fixed_now())
    }

    #[test]
    fn test_writes_inside_cooldown_never_trim() {
        let ledger = ledger_with(MemoryStore::new());
        for i in 0..8 {
            let outcome = ledger.save_report_at(&dry(), fixed_now() + Duration::seconds(i));
            assert_eq!(outcome, SaveOutcome::Saved);
        }
        assert_eq!(ledger.load_reports().len(), 8);
    }

    #[test]
    fn test_first_write_after_cooldown_trims_to_keep_recent() {
        let ledger = ledger_with(MemoryStore::new());
        for _ in 0..7 {
            ledger.save_report_at(&dry(), fixed_now());
        }
        let outcome = ledger.save_report_at(&dry(), fixed_now() + Duration::minutes(10));
        assert_eq!(outcome, SaveOutcome::SavedAndTrimmed(3));
        assert_eq!(ledger.load_reports().len(), 5);

        // Cooldown restarts from the trim.
        let outcome = ledger.save_report_at(&dry(), fixed_now() + Duration::minutes(11));
        assert_eq!(outcome, SaveOutcome::Saved);
        assert_eq!(ledger.load_reports().len(), 6);
    }

    #[test]
    fn test_failed_append_is_dropped_and_does_not_dirty() {
        let ledger = ledger_with(FlakyStore {
            fail_append: true,
            ..FlakyStore::default()
        });
        let outcome = ledger.save_report_at(&dry(), fixed_now() + Duration::hours(1));
        assert_eq!(outcome, SaveOutcome::Dropped);
        assert!(!outcome.is_saved());
        assert!(ledger.load_reports().is_empty());
    }

    #[test]
    fn test_failed_trim_keeps_row_and_retries_on_next_write() {
        let ledger = ledger_with(FlakyStore {
            fail_trim: true,
            ..FlakyStore::default()
        });
        let later = fixed_now() + Duration::minutes(20);
        assert_eq!(ledger.save_report_at(&dry(), later), SaveOutcome::SavedTrimFailed);
        // Still due: the failed trim was not recorded.
        assert_eq!(ledger.save_report_at(&dry(), later), SaveOutcome::SavedTrimFailed);
        assert_eq!(ledger.load_reports().len(), 2);
    }

    #[test]
    fn test_failed_fetch_degrades_to_empty() {
        let ledger = ledger_with(FlakyStore {
            fail_fetch: true,
            ..FlakyStore::default()
        });
        ledger.save_report_at(&dry(), fixed_now());
        assert!(ledger.load_reports().is_empty());
    }

    #[test]
    fn test_failed_schema_setup_is_reported_not_raised() {
        let ledger = ledger_with(FlakyStore::default());
        assert!(!ledger.init_schema());
        assert_eq!(ledger.backend_name(), "flaky");
    }
}
