//! Logging setup
//!
//! Everything goes to a daily-rotated `groupstat.log` under
//! `logging.directory` (default `~/.local/state/groupstat/`). The daemon
//! mirrors records to stderr in compact form.

use crate::config::LoggingConfig;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const LOG_FILE_PREFIX: &str = "groupstat.log";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `logging.level` when set.
pub fn init(config: &LoggingConfig, console: bool) -> Result<LoggingGuard> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_level(&config.level)?,
    };

    let log_dir = config.directory();
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);
    let (non_blocking, worker) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = console.then(|| {
        fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialized: {e}")))?;

    tracing::info!(log_dir = %log_dir.display(), level = %config.level, console, "Logging initialized");

    Ok(LoggingGuard {
        _worker: worker,
        log_dir,
    })
}

/// Parse a `logging.level` value: a bare level or a full filter directive
/// list such as `groupstat_core=debug,warn`.
pub fn parse_level(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level)
        .map_err(|e| Error::Config(format!("invalid logging.level {level:?}: {e}")))
}

/// Route logs to the test harness writer. Safe to call from every test.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Keeps the background writer alive; pending records are flushed on drop.
pub struct LoggingGuard {
    _worker: tracing_appender::non_blocking::WorkerGuard,
    log_dir: PathBuf,
}

impl LoggingGuard {
    /// Directory the rotated log files are written to.
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_accepts_directives() {
        assert!(parse_level("info").is_ok());
        assert!(parse_level("groupstat_core=debug,warn").is_ok());
    }

    #[test]
    fn test_parse_level_rejects_bad_level() {
        match parse_level("groupstat_core=loud") {
            Err(Error::Config(msg)) => assert!(msg.contains("logging.level")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_log_dir_follows_config() {
        let config = LoggingConfig {
            level: "info".to_string(),
            directory: Some(PathBuf::from("/tmp/groupstat-logs")),
        };
        assert_eq!(config.directory(), PathBuf::from("/tmp/groupstat-logs"));
        assert!(LoggingConfig::default().directory().ends_with("groupstat"));
    }
}
