//! Explicit log subscriber construction
//!
//! The subscriber is built once at start-up and handed to the caller, which
//! scopes it to the job future. Nothing is installed globally.

use clap::ValueEnum;
use serde::Deserialize;
use std::io::IsTerminal;
use tracing::level_filters::LevelFilter;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: LevelFilter,
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(debug_enabled: bool, format: LogFormat) -> Self {
        let level = if debug_enabled {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        };
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new(false, LogFormat::Text)
    }
}

/// `RUST_LOG` may refine the filter; the configured level is the default
/// directive.
pub fn build_subscriber(config: &LoggingConfig) -> Box<dyn Subscriber + Send + Sync> {
    let filter = EnvFilter::builder()
        .with_default_directive(config.level.into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(true);

    match config.format {
        LogFormat::Text => Box::new(builder.finish()),
        LogFormat::Json => Box::new(builder.json().finish()),
    }
}
