use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, time::SystemTime},
    prelude::*,
    EnvFilter,
};

pub const LOG_FILE_NAME: &str = "eventsink.log";
const DEFAULT_LOG_LEVEL: &str = "info";

/// `--log-level` wins, then `RUST_LOG`, then `info`.
pub fn build_filter(log_level: Option<&str>) -> EnvFilter {
    match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
    }
}

pub fn setup_logging(log_level: Option<&str>, log_dir: Option<&Path>) -> Result<()> {
    let filter = build_filter(log_level);

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {:?}", dir))?;
            let file_appender = RollingFileAppender::new(Rotation::NEVER, dir, LOG_FILE_NAME);
            Some(
                fmt::layer()
                    .with_file(true)
                    .with_line_number(true)
                    .with_thread_ids(true)
                    .with_target(true)
                    .with_level(true)
                    .with_timer(SystemTime)
                    .with_ansi(false)
                    .with_writer(file_appender),
            )
        }
        None => None,
    };

    let stderr_layer = log_dir.is_none().then(|| {
        fmt::layer()
            .with_target(false)
            .with_timer(SystemTime)
            .with_writer(std::io::stderr)
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    if let Some(dir) = log_dir {
        tracing::debug!(
            "Logging system initialized. Writing to {:?}",
            dir.join(LOG_FILE_NAME)
        );
    }

    Ok(())
}
