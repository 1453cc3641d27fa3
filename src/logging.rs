// src/logging.rs
use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Console output for the supervisor and the one-shot tools.
pub fn init_console(config: &LoggingConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level)),
        )
        .with_target(false)
        .init();
}

/// A log destination owned by one trading loop. Dropping it flushes the writer.
pub struct LoopSink {
    pub dispatch: Dispatch,
    _guard: WorkerGuard,
}

/// Daily-rolling `<dir>/<name>.<date>.log`, keeping `max_files` files.
pub fn account_sink(config: &LoggingConfig, name: &str) -> Result<LoopSink> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(name)
        .filename_suffix("log")
        .max_log_files(config.max_files.max(1))
        .build(&config.dir)
        .with_context(|| format!("failed to open log file for {} in {}", name, config.dir))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let subscriber = tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(EnvFilter::new(&config.level))
        .finish();

    Ok(LoopSink {
        dispatch: Dispatch::new(subscriber),
        _guard: guard,
    })
}
