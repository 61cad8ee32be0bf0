/// PostgreSQL report store.
///
/// Connection acquisition is bounded by `connect_timeout` and every
/// statement by a server-side `statement_timeout`, so a slow or unreachable
/// database surfaces as a `StoreError` instead of a hung request.
///
/// TLS goes through rustls with the webpki root set unless the effective
/// `sslmode` is `disable`.

use chrono::{DateTime, Utc};
use postgres::config::SslMode as PgSslMode;
use postgres::error::SqlState;
use postgres::{Client, Config, NoTls};
use rustls::{ClientConfig, RootCertStore};
use std::sync::Arc;
use std::time::Duration;
use tokio_postgres_rustls::MakeRustlsConnect;

use crate::model::{NewReport, Report, StoreError};

use super::{ConnectionMode, ReportStore, SslMode};

pub struct PostgresStore {
    config: Config,
    mode: ConnectionMode,
    /// `None` when the effective sslmode is `disable`.
    tls: Option<MakeRustlsConnect>,
    /// Cached connection in `Persistent` mode; always `None` in `Direct` mode.
    client: Option<Client>,
}

impl PostgresStore {
    /// Parses the connection URL and applies both timeouts and the
    /// `ssl_mode` override. Does not connect.
    pub fn new(
        database_url: &str,
        mode: ConnectionMode,
        ssl_mode: Option<SslMode>,
        connect_timeout: Duration,
        statement_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let mut config: Config = database_url
            .parse()
            .map_err(|e: postgres::Error| StoreError::Connect(format!("invalid database_url: {}", e)))?;
        config.connect_timeout(connect_timeout);
        config.options(&format!(
            "-c statement_timeout={}",
            statement_timeout.as_millis()
        ));
        if let Some(ssl_mode) = ssl_mode {
            config.ssl_mode(match ssl_mode {
                SslMode::Disable => PgSslMode::Disable,
                SslMode::Prefer => PgSslMode::Prefer,
                SslMode::Require => PgSslMode::Require,
            });
        }

        let tls = match config.get_ssl_mode() {
            PgSslMode::Disable => None,
            _ => Some(rustls_connector()?),
        };

        Ok(Self {
            config,
            mode,
            tls,
            client: None,
        })
    }

    fn connect(&self) -> Result<Client, StoreError> {
        match &self.tls {
            Some(tls) => self.config.connect(tls.clone()),
            None => self.config.connect(NoTls),
        }
        .map_err(map_pg_error)
    }

    /// Runs `op` on a connection chosen by the connection mode.
    ///
    /// In `Persistent` mode a connection that reports itself closed after a
    /// failure is discarded so the next call reconnects.
    fn with_client<T>(
        &mut self,
        op: impl FnOnce(&mut Client) -> Result<T, postgres::Error>,
    ) -> Result<T, StoreError> {
        match self.mode {
            ConnectionMode::Direct => {
                let mut client = self.connect()?;
                op(&mut client).map_err(map_pg_error)
            }
            ConnectionMode::Persistent => {
                let mut client = match self.client.take() {
                    Some(client) if !client.is_closed() => client,
                    _ => self.connect()?,
                };
                let result = op(&mut client);
                if !client.is_closed() {
                    self.client = Some(client);
                }
                result.map_err(map_pg_error)
            }
        }
    }
}

fn rustls_connector() -> Result<MakeRustlsConnect, StoreError> {
    let roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| StoreError::Connect(format!("TLS setup failed: {}", e)))?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(MakeRustlsConnect::new(config))
}

fn map_pg_error(err: postgres::Error) -> StoreError {
    if let Some(db_error) = err.as_db_error() {
        if *db_error.code() == SqlState::QUERY_CANCELED {
            return StoreError::Timeout(db_error.message().to_string());
        }
        return StoreError::Query(db_error.message().to_string());
    }
    let message = err.to_string();
    if message.contains("timed out") || message.contains("timeout") {
        StoreError::Timeout(message)
    } else if err.is_closed() || message.contains("connect") {
        StoreError::Connect(message)
    } else {
        StoreError::Query(message)
    }
}

impl ReportStore for PostgresStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    fn init_schema(&mut self) -> Result<(), StoreError> {
        self.with_client(|client| {
            client.batch_execute(
                "
                CREATE TABLE IF NOT EXISTS reports (
                    id SERIAL PRIMARY KEY,
                    flooded BOOLEAN NOT NULL,
                    level_category TEXT,
                    created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
                );
                ALTER TABLE reports ADD COLUMN IF NOT EXISTS level_value DOUBLE PRECISION;
                ",
            )
        })
    }

    fn append(&mut self, report: &NewReport) -> Result<(), StoreError> {
        self.with_client(|client| {
            client.execute(
                "INSERT INTO reports (flooded, level_category, level_value) VALUES ($1, $2, $3)",
                &[&report.flooded, &report.level_category, &report.level_value],
            )
        })?;
        Ok(())
    }

    fn fetch_all(&mut self) -> Result<Vec<Report>, StoreError> {
        let rows = self.with_client(|client| {
            client.query(
                "SELECT flooded, level_category, level_value, created_at
                 FROM reports
                 ORDER BY created_at, id",
                &[],
            )
        })?;

        let mut reports = Vec::with_capacity(rows.len());
        for row in rows {
            reports.push(Report {
                flooded: row.try_get(0).map_err(map_pg_error)?,
                level_category: row.try_get(1).map_err(map_pg_error)?,
                level_value: row.try_get(2).map_err(map_pg_error)?,
                created_at: row
                    .try_get::<_, Option<DateTime<Utc>>>(3)
                    .map_err(map_pg_error)?,
            });
        }
        Ok(reports)
    }

    fn trim_retain_recent(&mut self, keep: usize) -> Result<u64, StoreError> {
        let keep = keep as i64;
        self.with_client(|client| {
            client.execute(
                "DELETE FROM reports
                 WHERE id NOT IN (
                     SELECT id FROM reports
                     ORDER BY created_at DESC, id DESC
                     LIMIT $1
                 )",
                &[&keep],
            )
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
//
// Tests that need a live server are marked #[ignore] and read DATABASE_URL
// from the environment / .env:
//   cargo test -- --ignored postgres
