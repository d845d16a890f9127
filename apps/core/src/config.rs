//! Environment-driven configuration.
//!
//! Values come from the process environment after an optional `.env` file is
//! loaded. Every field has a default so an empty environment is valid.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use validator::Validate;

use crate::crisis::CrisisDetector;
use crate::error::{AppError, AppResult};

pub const ENV_LOG_LEVEL: &str = "CRISISWATCH_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "CRISISWATCH_LOG_FORMAT";
pub const ENV_UTC_OFFSET_MINUTES: &str = "CRISISWATCH_UTC_OFFSET_MINUTES";
pub const ENV_LEXICON_PATH: &str = "CRISISWATCH_LEXICON_PATH";
pub const ENV_SESSION_CAPACITY: &str = "CRISISWATCH_SESSION_CAPACITY";

/// Output layer for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable `fmt` output
    Pretty,
    /// Bunyan-style JSON lines
    Json,
}

impl FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(AppError::Config(format!("Unknown log format: {}", other))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    /// Default `EnvFilter` directive; `RUST_LOG` still wins when set.
    #[validate(length(min = 1))]
    pub log_level: String,
    pub log_format: LogFormat,
    /// Offset of the users' local time from UTC, in minutes.
    #[validate(range(min = -840, max = 840))]
    pub utc_offset_minutes: i32,
    /// Optional JSON lexicon replacing the built-in categories.
    pub lexicon_path: Option<PathBuf>,
    /// Maximum sessions kept by the in-memory store.
    #[validate(range(min = 1))]
    pub session_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            utc_offset_minutes: 0,
            lexicon_path: None,
            session_capacity: 1024,
        }
    }
}

impl AppConfig {
    /// Load `.env` (if present), then read and validate the environment.
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();
        Self::from_process_env()
    }

    /// Read and validate the current process environment without touching `.env`.
    pub fn from_process_env() -> AppResult<Self> {
        let defaults = Self::default();

        let config = Self {
            log_level: env::var(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_format: parse_var(ENV_LOG_FORMAT)?.unwrap_or(defaults.log_format),
            utc_offset_minutes: parse_var(ENV_UTC_OFFSET_MINUTES)?
                .unwrap_or(defaults.utc_offset_minutes),
            lexicon_path: env::var_os(ENV_LEXICON_PATH)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            session_capacity: parse_var(ENV_SESSION_CAPACITY)?
                .unwrap_or(defaults.session_capacity),
        };

        config
            .validate()
            .map_err(|e| AppError::Config(format!("Invalid configuration: {}", e)))?;

        Ok(config)
    }

    pub fn utc_offset(&self) -> AppResult<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            AppError::Config(format!("UTC offset out of range: {} minutes", self.utc_offset_minutes))
        })
    }

    /// The wall clock in the configured offset. Only boundary code calls this;
    /// the detector receives the instant as a parameter.
    pub fn local_now(&self) -> AppResult<DateTime<FixedOffset>> {
        Ok(Utc::now().with_timezone(&self.utc_offset()?))
    }

    /// Build a detector from the configured lexicon, or the built-in one.
    pub fn build_detector(&self) -> AppResult<CrisisDetector> {
        match &self.lexicon_path {
            Some(path) => CrisisDetector::from_lexicon_file(path),
            None => CrisisDetector::new(),
        }
    }
}

fn parse_var<T>(key: &str) -> AppResult<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("{}={:?}: {}", key, raw, e))),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(AppError::Config(format!("{}: {}", key, e))),
    }
}
