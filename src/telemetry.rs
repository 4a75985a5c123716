//! Tracing setup for the terminal binary.
//!
//! The TUI owns stdout, so events go to a log file in the state directory.
//! - LEVELCHECK_LOG sets the filter (default "info", e.g. "levelcheck=debug").
//! - LEVELCHECK_LOG_FORMAT=json switches to structured JSON lines.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "LEVELCHECK_LOG";
pub const LOG_FORMAT_ENV: &str = "LEVELCHECK_LOG_FORMAT";

/// Install the global subscriber writing to `log_path`.
///
/// Returns `Ok(false)` when a subscriber was already installed.
pub fn init_tracing(log_path: &Path) -> std::io::Result<bool> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let installed = match std::env::var(LOG_FORMAT_ENV).as_deref() {
        Ok("json") => builder.json().try_init().is_ok(),
        _ => builder.try_init().is_ok(),
    };
    Ok(installed)
}
