//! Optional tracing setup for hosts that do not install their own subscriber.
//!
//! The library itself only emits `tracing` events; calling [`init_tracing`]
//! is up to the embedding binary.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "danci_adaptive=info";
const LOG_FILE_PREFIX: &str = "adaptive.log";

/// Keeps the non-blocking file writer alive. Drop it to flush.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    pub filter: String,
    /// Daily-rotated log files are written here when set.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            log_dir: None,
        }
    }
}

impl LoggingOptions {
    /// `ADAPTIVE_LOG` (falling back to `RUST_LOG`) for the filter;
    /// `ENABLE_FILE_LOGS` plus `LOG_DIR` for file output.
    pub fn from_env() -> Self {
        let filter = std::env::var("ADAPTIVE_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_FILTER.to_string());

        let log_dir = file_logging_enabled()
            .then(|| std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string()))
            .map(PathBuf::from);

        Self { filter, log_dir }
    }
}

pub fn file_logging_enabled() -> bool {
    std::env::var("ENABLE_FILE_LOGS")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

/// Install a global subscriber. Returns `None` when file output is off or
/// could not be set up, and does nothing if a subscriber is already set.
pub fn init_tracing(options: &LoggingOptions) -> Option<FileLogGuard> {
    let env_filter = EnvFilter::try_new(&options.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stdout_layer = fmt::layer().with_target(true);

    if let Some(log_dir) = &options.log_dir {
        match std::fs::create_dir_all(log_dir) {
            Ok(()) => {
                let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);
                let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
                let file_layer = fmt::layer()
                    .with_writer(file_writer)
                    .with_ansi(false)
                    .with_target(true);

                let installed = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(stdout_layer)
                    .with(file_layer)
                    .try_init()
                    .is_ok();

                return installed.then_some(FileLogGuard { _guard: guard });
            }
            Err(err) => {
                eprintln!("failed to create log directory {}: {err}", log_dir.display());
            }
        }
    }

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .try_init();

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_log_to_stdout_only() {
        let options = LoggingOptions::default();
        assert_eq!(options.filter, DEFAULT_FILTER);
        assert!(options.log_dir.is_none());
    }

    #[test]
    fn init_writes_into_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let options = LoggingOptions {
            filter: "debug".to_string(),
            log_dir: Some(dir.path().join("logs")),
        };
        let _guard = init_tracing(&options);
        assert!(dir.path().join("logs").is_dir());
        // A second install is a no-op rather than a panic.
        assert!(init_tracing(&LoggingOptions::default()).is_none());
    }
}
