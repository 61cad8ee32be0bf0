/// Report persistence.
///
/// Every backend implements `ReportStore`; the service picks one at startup
/// from the `[store]` config section and only ever talks to it through
/// `ReportLedger`, which owns the lock and the retention state.
///
/// Submodules:
/// - `postgres`: networked PostgreSQL, persistent or per-operation connection.
/// - `sqlite`: embedded single-file database.
/// - `memory`: process-local store for development and tests.
/// - `retention`: trim scheduling state.
/// - `ledger`: the locked store shared by all request handlers.

pub mod ledger;
pub mod memory;
pub mod postgres;
pub mod retention;
pub mod sqlite;

use serde::Deserialize;

use crate::model::{NewReport, Report, StoreError};

pub use ledger::ReportLedger;
pub use memory::MemoryStore;
pub use retention::{RetentionPolicy, RetentionSettings};

// ---------------------------------------------------------------------------
// Store capability
// ---------------------------------------------------------------------------

/// Append / fetch-all / trim over the `reports` table.
///
/// Methods take `&mut self`: backends hold a single connection and callers
/// serialize access through `ReportLedger`.
pub trait ReportStore: Send {
    /// Short backend name used in log context.
    fn backend_name(&self) -> &'static str;

    /// Creates the `reports` table if it does not exist.
    fn init_schema(&mut self) -> Result<(), StoreError>;

    /// Inserts one report; `created_at` is assigned by the store.
    fn append(&mut self, report: &NewReport) -> Result<(), StoreError>;

    /// Returns every stored report, oldest first.
    fn fetch_all(&mut self) -> Result<Vec<Report>, StoreError>;

    /// Deletes all but the `keep` most recent reports by creation order.
    /// Idempotent. Returns the number of rows removed.
    fn trim_retain_recent(&mut self, keep: usize) -> Result<u64, StoreError>;
}

// ---------------------------------------------------------------------------
// Backend selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Postgres,
    Sqlite,
    Memory,
}

impl BackendKind {
    pub fn parse(name: &str) -> Option<BackendKind> {
        match name.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Some(BackendKind::Postgres),
            "sqlite" => Some(BackendKind::Sqlite),
            "memory" => Some(BackendKind::Memory),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Postgres => "postgres",
            BackendKind::Sqlite => "sqlite",
            BackendKind::Memory => "memory",
        }
    }
}

/// How the PostgreSQL backend holds its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Keep one connection open and reconnect after it drops.
    Persistent,
    /// Open a fresh connection for every operation.
    Direct,
}

/// TLS policy for PostgreSQL connections, libpq `sslmode` semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    /// Plain TCP only.
    Disable,
    /// Try TLS, fall back to plain TCP if the server refuses.
    Prefer,
    /// TLS or no connection.
    Require,
}

impl SslMode {
    pub fn parse(name: &str) -> Option<SslMode> {
        match name.trim().to_ascii_lowercase().as_str() {
            "disable" => Some(SslMode::Disable),
            "prefer" => Some(SslMode::Prefer),
            "require" => Some(SslMode::Require),
            _ => None,
        }
    }
}

/// `[store]` config section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: BackendKind,
    pub database_url: Option<String>,
    pub connection_mode: ConnectionMode,
    /// Overrides any `sslmode` in `database_url`.
    pub ssl_mode: Option<SslMode>,
    pub sqlite_path: Option<String>,
    /// Bound on connection acquisition.
    pub connect_timeout_secs: u64,
    /// Bound on any single statement.
    pub statement_timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            backend: BackendKind::Memory,
            database_url: None,
            connection_mode: ConnectionMode::Persistent,
            ssl_mode: None,
            sqlite_path: None,
            connect_timeout_secs: 10,
            statement_timeout_secs: 10,
        }
    }
}

/// Builds the configured backend. Does not touch the network: PostgreSQL
/// connects lazily on first use so an unreachable database degrades
/// per-request instead of failing startup.
pub fn open_store(settings: &StoreSettings) -> Result<Box<dyn ReportStore>, StoreError> {
    match settings.backend {
        BackendKind::Memory => Ok(Box::new(MemoryStore::new())),
        BackendKind::Sqlite => {
            let path = settings
                .sqlite_path
                .as_deref()
                .ok_or_else(|| StoreError::Unavailable("sqlite_path not configured".to_string()))?;
            let store = sqlite::SqliteStore::open(
                path,
                std::time::Duration::from_secs(settings.statement_timeout_secs),
            )?;
            Ok(Box::new(store))
        }
        BackendKind::Postgres => {
            let url = settings
                .database_url
                .as_deref()
                .ok_or_else(|| StoreError::Unavailable("database_url not configured".to_string()))?;
            let store = postgres::PostgresStore::new(
                url,
                settings.connection_mode,
                settings.ssl_mode,
                std::time::Duration::from_secs(settings.connect_timeout_secs),
                std::time::Duration::from_secs(settings.statement_timeout_secs),
            )?;
            Ok(Box::new(store))
        }
    }
}
