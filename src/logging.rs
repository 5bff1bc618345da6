//! Logger initialization
//!
//! All modules log through the `log` facade; this sets up the `env_logger`
//! backend once, optionally appending to a file instead of stderr.

use anyhow::{Context, Result};
use log::LevelFilter;
use std::fs::{self, OpenOptions};
use std::path::Path;

/// Maps a `--log-level` value to a filter; unknown values fall back to info.
pub fn parse_level(level: &str) -> LevelFilter {
    match level.to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" | "warning" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

pub fn init(level: &str, log_file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(parse_level(level));
    // RUST_LOG still wins for per-module tuning
    builder.parse_default_env();

    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory {}", parent.display())
                })?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
        builder.write_style(env_logger::WriteStyle::Never);
    }

    builder
        .try_init()
        .context("Logger was already initialized")?;
    Ok(())
}
