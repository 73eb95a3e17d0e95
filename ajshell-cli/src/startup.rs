use std::path::{Path, PathBuf};

use tracing::warn;

use ajshell_core::config::{ConfigSource, FileConfigSource, ShellConfig};

use crate::logging;

/// Where configuration comes from for this run.
#[derive(Clone, Debug)]
pub struct ConfigLocation {
    /// `None` when no file was found; the shell then runs on defaults.
    pub path: Option<PathBuf>,
}

impl ConfigLocation {
    /// An explicit `--config` wins; otherwise search from the working directory.
    pub fn resolve(explicit: Option<PathBuf>) -> Self {
        if explicit.is_some() {
            return Self { path: explicit };
        }
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            path: ShellConfig::locate(&cwd).ok(),
        }
    }

    /// Source handed to bootstrap. Load errors are reported by bootstrap itself.
    pub fn source(&self) -> Box<dyn ConfigSource> {
        match &self.path {
            Some(path) => Box::new(FileConfigSource::Path(path.clone())),
            None => Box::new(ShellConfig::default()),
        }
    }

    /// Best-effort read used to set up collaborators before bootstrap runs.
    pub fn preview(&self) -> ShellConfig {
        let Some(path) = &self.path else {
            return ShellConfig::default();
        };
        match ShellConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config unreadable, using defaults");
                ShellConfig::default()
            }
        }
    }

    pub fn log_path(&self) -> PathBuf {
        logging::log_file_path(self.path.as_deref())
    }

    pub fn display(&self) -> String {
        self.path
            .as_deref()
            .map(Path::display)
            .map(|d| d.to_string())
            .unwrap_or_else(|| "defaults (no config file)".to_string())
    }
}
