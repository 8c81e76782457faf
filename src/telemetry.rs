//! Logging bootstrap for the songlake binary.

use crate::{Error, Result};

use std::str::FromStr;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Json => "json",
            LogFormat::Text => "text",
        }
    }
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" | "pretty" => Ok(LogFormat::Text),
            other => Err(Error::Config(format!(
                "invalid log format '{other}', expected one of [json, text]"
            ))),
        }
    }
}

/// Install the process-wide `tracing` subscriber. Fails if one is already
/// installed.
pub fn init_telemetry(log_level: &str, format: LogFormat) -> Result<()> {
    let level = parse_log_level(log_level)?;
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = match format {
        LogFormat::Json => builder.with_thread_ids(true).json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    installed
        .map_err(|e| Error::Config(format!("failed to initialize telemetry subscriber: {e}")))?;

    debug!(level = %level, format = format.as_str(), "Telemetry initialized");
    Ok(())
}

pub fn parse_log_level(raw: &str) -> Result<Level> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(Error::Config(format!(
            "invalid log level '{other}', expected one of [trace, debug, info, warn, error]"
        ))),
    }
}
