//! Tracing subscriber setup.
//!
//! Logs go to stderr so that command output on stdout stays machine-readable.

use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::config::{AppConfig, LogFormat};
use crate::error::{AppError, AppResult};

/// Service name stamped on JSON log records.
pub const SERVICE_NAME: &str = "crisiswatch";

fn build_filter(config: &AppConfig) -> AppResult<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| AppError::Config(format!("Invalid log filter {:?}: {}", config.log_level, e)))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(config: &AppConfig) -> AppResult<()> {
    let filter = build_filter(config)?;

    let installed = match config.log_format {
        LogFormat::Json => Registry::default()
            .with(filter)
            .with(JsonStorageLayer)
            .with(BunyanFormattingLayer::new(SERVICE_NAME.to_string(), std::io::stderr))
            .try_init(),
        LogFormat::Pretty => Registry::default()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init(),
    };

    installed.map_err(|e| AppError::Config(format!("Failed to install tracing subscriber: {}", e)))
}
