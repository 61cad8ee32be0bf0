/// Service configuration.
///
/// Settings come from three layers, later ones winning:
///
/// 1. Built-in defaults (an in-memory board on `0.0.0.0:5000`).
/// 2. A TOML file, `floodboard.toml` unless `FLOODBOARD_CONFIG` points
///    elsewhere.
/// 3. Environment variables (after `.env` has been loaded by `main`).
///
/// Every section is optional, so an empty file is a valid configuration.

use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::analysis::ConsensusSettings;
use crate::categories::{CategoryTable, LevelCategory};
use crate::logging::LogLevel;
use crate::store::{BackendKind, RetentionSettings, SslMode, StoreSettings};

pub const DEFAULT_CONFIG_PATH: &str = "floodboard.toml";

/// Chat command that asks for the current status ("current status").
pub const DEFAULT_STATUS_COMMAND: &str = "สถานะปัจจุบัน";

pub const DEFAULT_LINE_API_BASE: &str = "https://api.line.me";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub listen_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            listen_addr: "0.0.0.0:5000".to_string(),
        }
    }
}

/// `[line]` section. The webhook answers 503 unless both credentials are set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LineSettings {
    pub channel_secret: Option<String>,
    pub channel_access_token: Option<String>,
    pub status_command: String,
    pub api_base: String,
}

impl Default for LineSettings {
    fn default() -> Self {
        LineSettings {
            channel_secret: None,
            channel_access_token: None,
            status_command: DEFAULT_STATUS_COMMAND.to_string(),
            api_base: DEFAULT_LINE_API_BASE.to_string(),
        }
    }
}

/// Both LINE credentials, present and non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct LineCredentials {
    pub channel_secret: String,
    pub channel_access_token: String,
}

impl LineSettings {
    pub fn credentials(&self) -> Option<LineCredentials> {
        let secret = self.channel_secret.as_deref().filter(|s| !s.is_empty())?;
        let token = self.channel_access_token.as_deref().filter(|s| !s.is_empty())?;
        Some(LineCredentials {
            channel_secret: secret.to_string(),
            channel_access_token: token.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: LogLevel,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: LogLevel::Info,
            file: None,
            timestamps: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub retention: RetentionSettings,
    pub consensus: ConsensusSettings,
    pub line: LineSettings,
    pub logging: LoggingSettings,
    /// Replaces the built-in category table when present.
    pub categories: Option<Vec<LevelCategory>>,
}

#[derive(Debug)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    Io(String),
    /// The file is not valid TOML or does not match the schema.
    Parse(String),
    /// Values parsed but are out of range or inconsistent.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Config I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Loads the config file (if any), applies process environment
    /// overrides and validates the result.
    ///
    /// A missing file at the default path falls back to defaults; a missing
    /// file named by `FLOODBOARD_CONFIG` is an error.
    pub fn load() -> Result<Config, ConfigError> {
        let explicit = std::env::var("FLOODBOARD_CONFIG").ok();
        let path = explicit.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);

        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else if explicit.is_some() {
            return Err(ConfigError::Io(format!("{}: file not found", path)));
        } else {
            Config::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Config, ConfigError> {
        let contents =
            fs::read_to_string(path).map_err(|e| ConfigError::Io(format!("{}: {}", path, e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Config, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Applies environment overrides through `lookup` so tests can supply a
    /// fixed environment.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = lookup("LISTEN_ADDR") {
            self.server.listen_addr = v;
        }
        if let Some(kind) = lookup("STORE_BACKEND").and_then(|v| BackendKind::parse(&v)) {
            self.store.backend = kind;
        }
        if let Some(v) = lookup("DATABASE_URL") {
            self.store.database_url = Some(v);
        }
        if let Some(mode) = lookup("DB_SSLMODE").and_then(|v| SslMode::parse(&v)) {
            self.store.ssl_mode = Some(mode);
        }
        if let Some(v) = lookup("SQLITE_PATH") {
            self.store.sqlite_path = Some(v);
        }
        if let Some(v) = lookup("LINE_CHANNEL_SECRET") {
            self.line.channel_secret = Some(v);
        }
        if let Some(v) = lookup("LINE_CHANNEL_ACCESS_TOKEN") {
            self.line.channel_access_token = Some(v);
        }
        if let Some(level) = lookup("LOG_LEVEL").and_then(|v| LogLevel::parse(&v)) {
            self.logging.level = level;
        }
        if let Some(v) = lookup("LOG_FILE") {
            self.logging.file = Some(v);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.consensus;
        for (name, value) in [
            ("consensus.flood_ratio", c.flood_ratio),
            ("consensus.consensus_ratio", c.consensus_ratio),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }
        if !(c.similarity_threshold.is_finite() && c.similarity_threshold >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "consensus.similarity_threshold must be a non-negative number, got {}",
                c.similarity_threshold
            )));
        }
        if c.min_reports == 0 {
            return Err(ConfigError::Invalid("consensus.min_reports must be at least 1".to_string()));
        }
        if self.retention.keep_recent == 0 {
            return Err(ConfigError::Invalid("retention.keep_recent must be at least 1".to_string()));
        }
        if self.retention.cooldown_secs < 0 {
            return Err(ConfigError::Invalid("retention.cooldown_secs must not be negative".to_string()));
        }

        match self.store.backend {
            BackendKind::Postgres if self.store.database_url.is_none() => {
                return Err(ConfigError::Invalid(
                    "store.database_url (or DATABASE_URL) is required for the postgres backend".to_string(),
                ));
            }
            BackendKind::Sqlite if self.store.sqlite_path.is_none() => {
                return Err(ConfigError::Invalid(
                    "store.sqlite_path (or SQLITE_PATH) is required for the sqlite backend".to_string(),
                ));
            }
            _ => {}
        }

        if let Some(categories) = &self.categories {
            if categories.is_empty() {
                return Err(ConfigError::Invalid("categories must not be empty when given".to_string()));
            }
            let mut seen = HashSet::new();
            for category in categories {
                if category.key.trim().is_empty() {
                    return Err(ConfigError::Invalid("category key must not be empty".to_string()));
                }
                if !seen.insert(category.key.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "duplicate category key '{}'",
                        category.key
                    )));
                }
            }
        }
        Ok(())
    }

    /// The category table in effect: configured entries or the built-ins.
    pub fn category_table(&self) -> CategoryTable {
        match &self.categories {
            Some(entries) => CategoryTable::new(entries.clone()),
            None => CategoryTable::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
