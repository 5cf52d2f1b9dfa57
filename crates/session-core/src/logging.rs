//! Log output
//!
//! The engine only emits `tracing` events. Applications that do not install
//! a subscriber of their own set `logging.install` in the engine
//! configuration and [`CallManager::new`](crate::CallManager::new) installs
//! one built from [`LoggingConfig`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::errors::{Result, SessionError};

/// Line format of the installed subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// `logging` section of the engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Install a global subscriber when the call manager is created
    pub install: bool,
    /// Default level; `RUST_LOG` directives take precedence
    pub level: String,
    pub format: LogFormat,
    /// Print the source file and line of every event
    pub source_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            install: false,
            level: "info".to_string(),
            format: LogFormat::Text,
            source_location: false,
        }
    }
}

impl LoggingConfig {
    pub fn installed(level: impl Into<String>) -> Self {
        Self {
            install: true,
            level: level.into(),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn validate(&self) -> Result<()> {
        parse_log_level(&self.level).map(|_| ())
    }
}

/// Install the global subscriber described by `config`.
///
/// Only one subscriber can be installed per process; later calls fail with
/// [`SessionError::Config`].
pub fn setup_logging(config: &LoggingConfig) -> Result<()> {
    let level = parse_log_level(&config.level)?;
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(config.source_location)
        .with_line_number(config.source_location);
    let installed = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| SessionError::config(format!("Cannot install log subscriber: {}", e)))?;

    tracing::debug!("Logging {} at {}", config.format, level);
    Ok(())
}

pub fn parse_log_level(level: &str) -> Result<Level> {
    Level::from_str(level.trim()).map_err(|_| SessionError::config(format!("Invalid log level: {}", level)))
}
