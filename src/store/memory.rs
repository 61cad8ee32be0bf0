/// Process-local report store.
///
/// Used when no database is configured and by the test suite. Rows live for
/// the lifetime of the process.

use chrono::Utc;

use crate::model::{NewReport, Report, StoreError};

use super::ReportStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Insertion order doubles as creation order.
    rows: Vec<Report>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl ReportStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn init_schema(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    fn append(&mut self, report: &NewReport) -> Result<(), StoreError> {
        self.rows.push(Report {
            flooded: report.flooded,
            level_category: report.level_category.clone(),
            level_value: report.level_value,
            created_at: Some(Utc::now()),
        });
        Ok(())
    }

    fn fetch_all(&mut self) -> Result<Vec<Report>, StoreError> {
        Ok(self.rows.clone())
    }

    fn trim_retain_recent(&mut self, keep: usize) -> Result<u64, StoreError> {
        let excess = self.rows.len().saturating_sub(keep);
        self.rows.drain(..excess);
        Ok(excess as u64)
    }
}
