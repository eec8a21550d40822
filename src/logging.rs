//! Logging setup.
//!
//! Installs the global `tracing` subscriber. Only the binary calls this; the
//! filter engine and the request pipeline just emit events.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Single-line human readable output.
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Text,
        }
    }
}

impl LogConfig {
    #[must_use]
    pub fn new(debug: bool, json: bool) -> Self {
        Self {
            level: if debug { Level::DEBUG } else { Level::INFO },
            format: if json { LogFormat::Json } else { LogFormat::Text },
        }
    }

    /// Directive used when `RUST_LOG` is not set. Dependencies only report
    /// warnings and errors.
    #[must_use]
    pub fn default_directive(&self) -> String {
        let level = self.level.as_str().to_lowercase();
        format!("warn,ical_filter={level},ical_filter_proxy={level}")
    }
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over `config`.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been set.
pub fn init(config: &LogConfig) -> Result<(), LoggingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    match config.format {
        LogFormat::Text => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact());
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_current_span(true));
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}
