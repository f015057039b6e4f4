//! Log output for applications embedding the SIP module
//!
//! The `[logging]` section of [`BridgeConfig`](crate::BridgeConfig) resolves
//! to a [`LoggingConfig`], installed once per process by [`setup_logging`].
//! `RUST_LOG` directives still apply on top of the configured level.

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingSection;
use crate::error::{BridgeError, BridgeResult};

/// Line format written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Resolved logging settings
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub level: Level,
    pub format: LogFormat,
    /// Append file and line to every event
    pub source_location: bool,
    /// Log when each `reconciler_input` span opens and closes, with its duration
    pub input_spans: bool,
    /// Provider name written in the start-up line
    pub provider: String,
}

impl LoggingConfig {
    /// Text output at `level`, no extras
    pub fn new(level: Level, provider: impl Into<String>) -> Self {
        Self {
            level,
            format: LogFormat::Text,
            source_location: false,
            input_spans: false,
            provider: provider.into(),
        }
    }

    /// Resolve a `[logging]` section; fails on an unknown level name
    pub fn from_section(section: &LoggingSection, provider: impl Into<String>) -> BridgeResult<Self> {
        Ok(Self {
            level: parse_log_level(&section.level)?,
            format: section.format,
            source_location: section.source_location,
            input_spans: section.input_spans,
            provider: provider.into(),
        })
    }
}

/// Install the global subscriber
///
/// Returns [`BridgeError::Config`] if the process already has one.
pub fn setup_logging(config: &LoggingConfig) -> BridgeResult<()> {
    let span_events = if config.input_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let builder = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(config.level.into()))
        .with_span_events(span_events)
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    installed.map_err(|e| BridgeError::config(format!("logging already initialised: {}", e)))?;

    tracing::info!(provider = %config.provider, level = %config.level, format = ?config.format, "Logging ready");
    Ok(())
}

/// Level name as written in config files (`"info"`, `"WARN"`, ...)
pub fn parse_log_level(level: &str) -> BridgeResult<Level> {
    level
        .trim()
        .parse::<Level>()
        .map_err(|_| BridgeError::config(format!("unknown log level '{}'", level)))
}
