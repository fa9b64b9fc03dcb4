//! Logging infrastructure for sessionlens
//!
//! Logs are written to `~/.local/state/sessionlens/` following XDG standards,
//! one file per UTC day named `sessionlens.YYYY-MM-DD.log`.

use crate::config::{Config, LoggingConfig};
use crate::error::Error;
use chrono::{NaiveDate, Utc};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initialize the logging system
///
/// Sets up tracing with:
/// - File output to XDG state directory
/// - Daily rotation, keeping at most `max_files` files
/// - Configurable log level via config or RUST_LOG env var
pub fn init(config: &LoggingConfig) -> crate::error::Result<LoggingGuard> {
    let log_dir = Config::state_dir();

    // Create log directory if it doesn't exist
    std::fs::create_dir_all(&log_dir)?;

    let appender = file_appender(&log_dir, config.max_files)?;

    // Non-blocking writer for better performance
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    // Build the filter from config or env var
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("failed to install subscriber: {}", e)))?;

    tracing::info!(
        log_dir = %log_dir.display(),
        level = %config.level,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

const LOG_FILE_PREFIX: &str = "sessionlens";
const LOG_FILE_SUFFIX: &str = "log";

/// Daily rotating appender writing `sessionlens.YYYY-MM-DD.log` into `dir`.
fn file_appender(dir: &Path, max_files: usize) -> crate::error::Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(max_files.max(1))
        .build(dir)
        .map_err(|e| Error::Config(format!("failed to create log appender: {}", e)))
}

/// Name of the log file written on the given (UTC) day.
pub fn log_file_name(date: NaiveDate) -> String {
    format!(
        "{}.{}.{}",
        LOG_FILE_PREFIX,
        date.format("%Y-%m-%d"),
        LOG_FILE_SUFFIX
    )
}

/// Initialize logging for tests (logs to stdout)
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Guard that keeps the logging system alive
///
/// When dropped, flushes any pending log writes.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Returns the path of today's log file
pub fn log_file_path() -> PathBuf {
    Config::log_path()
}

/// Log file path for the current UTC day inside `dir`.
pub(crate) fn current_log_file(dir: &Path) -> PathBuf {
    dir.join(log_file_name(Utc::now().date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_log_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(log_file_name(date), "sessionlens.2024-01-05.log");
    }

    #[test]
    fn test_log_file_path_matches_appender_output() {
        let dir = TempDir::new().unwrap();
        let mut appender = file_appender(dir.path(), 5).unwrap();
        appender.write_all(b"hello\n").unwrap();
        appender.flush().unwrap();

        let expected = current_log_file(dir.path());
        assert!(expected.exists(), "{} should exist", expected.display());
        assert_eq!(
            log_file_path().file_name(),
            expected.file_name(),
            "log_file_path names the file the appender writes"
        );
    }
}
