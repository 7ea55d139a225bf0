//! Tracing subscriber setup.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LogLevel;

/// Log file used by the console when none is configured.
pub(crate) const DEFAULT_LOG_FILE: &str = "newsrelay.log";

/// Initialize the tracing subscriber, appending to `file` or writing to stderr.
pub(crate) fn init_logging(level: LogLevel, file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level.as_str()).context("invalid log level")?;

    let file_layer = match file {
        Some(path) => {
            let handle = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("could not open log file '{}'", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(handle)),
            )
        }
        None => None,
    };

    let stderr_layer = file
        .is_none()
        .then(|| fmt::layer().with_target(true).with_writer(io::stderr));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .with(filter)
        .init();

    Ok(())
}
