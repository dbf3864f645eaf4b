//! Log setup shared by every tactician binary
//!
//! The front-ends own the terminal, so nothing is logged to stdout: records
//! go to `$XDG_STATE_HOME/tactician/tactician.log`, rotated daily.

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE: &str = "tactician.log";

/// Install the file subscriber. Keep the guard alive for the whole run;
/// dropping it flushes pending records.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let log_dir = Config::state_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE)
        .max_log_files(config.max_files.max(1))
        .build(&log_dir)
        .map_err(|e| Error::Config(format!("failed to create log file: {}", e)))?;
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter_for(&config.level))
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!(
        path = %Config::log_path().display(),
        level = %config.level,
        "Logging initialized"
    );
    Ok(LoggingGuard { _guard: guard })
}

/// Route records to the test harness; safe to call from every test.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `RUST_LOG` wins over the configured level; an unparsable level
/// falls back to `info`.
fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|e| {
            eprintln!("ignoring logging.level {:?}: {}", level, e);
            EnvFilter::new("info")
        })
}

pub struct LoggingGuard {
    _guard: WorkerGuard,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_path_is_under_state_dir() {
        let path = Config::log_path();
        assert!(path.starts_with(Config::state_dir()));
        assert!(path.ends_with(LOG_FILE));
    }

    #[test]
    fn test_filter_accepts_module_directives() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let filter = filter_for("warn,tactician_core::session=debug");
        assert!(filter.to_string().contains("tactician_core::session=debug"));
    }
}
