//! Centralized configuration for user-sync.
//!
//! Environment variables are loaded and validated at startup to fail fast on
//! misconfiguration. Positional arguments (`[source] [count]`) override them.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use domain::SourceKind;

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error for {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Which user source to fetch from (default: internal)
    pub source: SourceKind,
    /// Number of users to fetch (default: 10)
    pub count: i64,
    /// SQLite database path (default: api.sqlite3)
    pub db_path: PathBuf,
    /// Listing endpoint for the external source
    pub users_api_url: String,
    /// Optional request timeout for the external source
    pub users_api_timeout: Option<Duration>,
    /// Log format
    pub log_format: LogFormat,
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = parse_source(
            "USER_SOURCE",
            &lookup("USER_SOURCE").unwrap_or_else(|| "internal".into()),
        )?;

        let count = match lookup("USER_COUNT") {
            Some(s) => parse_count("USER_COUNT", &s)?,
            None => 10,
        };

        let db_path = lookup("DB_PATH")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(sqlite_adapter::DEFAULT_DB_PATH));

        let users_api_url = lookup("USERS_API_URL")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| external_users::DEFAULT_USERS_URL.into());

        let users_api_timeout = match lookup("USERS_API_TIMEOUT_SECS").filter(|s| !s.is_empty()) {
            Some(s) => Some(Duration::from_secs(s.trim().parse().map_err(|_| ConfigError {
                field: "USERS_API_TIMEOUT_SECS",
                message: format!("Expected a whole number of seconds, got '{}'", s),
            })?)),
            None => None,
        };

        let log_format =
            LogFormat::from_str(&lookup("LOG_FORMAT").unwrap_or_else(|| "pretty".into()));

        Ok(Self {
            source,
            count,
            db_path,
            users_api_url,
            users_api_timeout,
            log_format,
        })
    }

    /// Apply positional arguments: `[internal|external] [count]`.
    pub fn apply_args<I>(&mut self, args: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        if let Some(src) = args.next() {
            self.source = parse_source("source argument", &src)?;
        }
        if let Some(n) = args.next() {
            self.count = parse_count("count argument", &n)?;
        }
        if let Some(extra) = args.next() {
            return Err(ConfigError {
                field: "arguments",
                message: format!("unexpected argument '{}'", extra),
            });
        }
        Ok(())
    }
}

fn parse_source(field: &'static str, s: &str) -> Result<SourceKind, ConfigError> {
    SourceKind::parse(s).map_err(|e| ConfigError {
        field,
        message: e.to_string(),
    })
}

fn parse_count(field: &'static str, s: &str) -> Result<i64, ConfigError> {
    s.trim().parse().map_err(|_| ConfigError {
        field,
        message: format!("Expected an integer, got '{}'", s),
    })
}
