//! Subscriber installation for binaries.
//!
//! Console output goes to stderr in the configured format. When a log
//! directory is given, a daily-rolling JSON file is written there as well.
//! `RUST_LOG` overrides the configured level.

use crate::config::{LogFormat, LoggingConfig};
use crate::errors::PipelineError;
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// File name prefix of the rolling log file.
pub const LOG_FILE_PREFIX: &str = "stockflow.log";

/// Builds the level filter, preferring `RUST_LOG`.
///
/// # Errors
///
/// Returns `Config` if the configured level is not a valid directive.
pub fn env_filter(level: &str) -> Result<EnvFilter, PipelineError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| PipelineError::Config(format!("invalid log level '{level}': {e}")))
}

/// Installs the global subscriber.
///
/// Keep the returned guard alive until exit so buffered file output is
/// flushed.
///
/// # Errors
///
/// Returns `Config` for an invalid level or when a subscriber is already
/// installed, and `Io` if the log directory cannot be created.
pub fn init(
    config: &LoggingConfig,
    log_dir: Option<&Path>,
) -> Result<Option<WorkerGuard>, PipelineError> {
    let filter = env_filter(&config.level)?;

    let console = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| PipelineError::Config(format!("failed to install log subscriber: {e}")))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_rejected() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        assert!(env_filter("stockflow=notalevel").is_err());
        assert!(env_filter("info,stockflow=debug").is_ok());
    }
}
