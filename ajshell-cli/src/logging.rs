//! File logging. The terminal belongs to the TUI, so diagnostics go to a file.

use std::path::{Path, PathBuf};

use anyhow::Context;

pub const LOG_ENV: &str = "AJSHELL_LOG";
const LOG_NAME: &str = "ajshell.log";

/// `AJSHELL_LOG` if set, otherwise `ajshell.log` next to the config file
/// (or in the working directory when there is none).
pub fn log_file_path(config_path: Option<&Path>) -> PathBuf {
    if let Ok(path) = std::env::var(LOG_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    config_path
        .and_then(Path::parent)
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join(LOG_NAME)
}

pub fn init(log_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create log directory '{}'", parent.display())
            })?;
        }
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("failed to open log file '{}'", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .init();

    Ok(())
}
