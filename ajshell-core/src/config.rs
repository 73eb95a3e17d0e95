use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_ENV: &str = "AJSHELL_CONFIG";
pub const CONFIG_NAMES: [&str; 4] = [
    "ajshell.yml",
    "ajshell.yaml",
    ".ajshell.yml",
    ".ajshell.yaml",
];

const MAX_DEBOUNCE_MS: u64 = 5_000;

/// Auth settings consumed by the shell
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct AuthConfig {
    /// Whether the user may elevate to root
    #[serde(default)]
    pub allow_sudo: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SessionConfig {
    /// Session lifetime in seconds; 0 falls back to one hour
    #[serde(default = "default_session_max_time")]
    pub max_time: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_time: default_session_max_time(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct PaletteConfig {
    /// Quiet period before the result list is re-ranked
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Maximum number of ranked results kept for keyboard navigation
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct BootstrapConfig {
    /// Recoverable plugin failures accepted before bootstrap turns fatal
    #[serde(default = "default_tolerated_failures")]
    pub tolerated_plugin_failures: usize,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            tolerated_plugin_failures: default_tolerated_failures(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PluginsConfig {
    /// Built-in plugin ids to skip
    #[serde(default)]
    pub disabled: Vec<String>,
    /// External plugin manifests, relative to the config file
    #[serde(default)]
    pub manifests: Vec<PathBuf>,
}

fn default_session_max_time() -> u64 {
    3600
}
fn default_debounce_ms() -> u64 {
    500
}
fn default_page_size() -> usize {
    50
}
fn default_tolerated_failures() -> usize {
    1
}
fn default_language() -> String {
    "en".into()
}

/// Root configuration file structure
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ShellConfig {
    /// Machine display name (defaults to the hostname)
    #[serde(default)]
    pub name: Option<String>,

    /// Prefix joined onto every navigable url
    #[serde(default)]
    pub url_prefix: String,

    /// Colour theme name
    #[serde(default)]
    pub color: Option<String>,

    #[serde(default = "default_language")]
    pub language: String,

    /// JSON translations file
    #[serde(default)]
    pub translations: Option<PathBuf>,

    /// Skip authentication; sessions never expire
    #[serde(default)]
    pub dev_autologin: bool,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub palette: PaletteConfig,

    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    #[serde(default)]
    pub plugins: PluginsConfig,

    /// Directory the config was loaded from; relative paths resolve here
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            name: None,
            url_prefix: String::new(),
            color: None,
            language: default_language(),
            translations: None,
            dev_autologin: false,
            auth: AuthConfig::default(),
            session: SessionConfig::default(),
            palette: PaletteConfig::default(),
            bootstrap: BootstrapConfig::default(),
            plugins: PluginsConfig::default(),
            base_dir: None,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("palette.debounce_ms must be between 1 and {max}, got {value}")]
    InvalidDebounce { value: u64, max: u64 },
    #[error("palette.page_size must be greater than zero")]
    InvalidPageSize,
    #[error("url_prefix '{0}' must be empty or start with '/'")]
    InvalidUrlPrefix(String),
    #[error("no config file found, searched: {searched:?}")]
    NotFound { searched: Vec<PathBuf> },
}

impl ShellConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Load configuration from a string (useful for testing)
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: ShellConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Search for config file in standard locations
    pub fn discover(start_dir: &Path) -> Result<(PathBuf, Self), ConfigError> {
        let path = Self::locate(start_dir)?;
        let config = Self::load(&path)?;
        Ok((path, config))
    }

    /// Find the config file without reading it: `AJSHELL_CONFIG` first, then
    /// the start directory and its parents.
    pub fn locate(start_dir: &Path) -> Result<PathBuf, ConfigError> {
        let mut searched = Vec::new();

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Ok(path);
            }
            searched.push(path);
        }

        let mut dir = Some(start_dir);
        while let Some(current) = dir {
            for name in &CONFIG_NAMES {
                let path = current.join(name);
                if path.exists() {
                    return Ok(path);
                }
                searched.push(path);
            }
            dir = current.parent();
        }

        Err(ConfigError::NotFound { searched })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let debounce = self.palette.debounce_ms;
        if debounce == 0 || debounce > MAX_DEBOUNCE_MS {
            return Err(ConfigError::InvalidDebounce {
                value: debounce,
                max: MAX_DEBOUNCE_MS,
            });
        }
        if self.palette.page_size == 0 {
            return Err(ConfigError::InvalidPageSize);
        }
        if !self.url_prefix.is_empty() && !self.url_prefix.starts_with('/') {
            return Err(ConfigError::InvalidUrlPrefix(self.url_prefix.clone()));
        }
        Ok(())
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.palette.debounce_ms)
    }

    /// Session lifetime with the one-hour fallback applied
    pub fn session_max_time(&self) -> u64 {
        if self.session.max_time == 0 {
            default_session_max_time()
        } else {
            self.session.max_time
        }
    }

    /// Resolve a path from the config file against its directory
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn is_plugin_disabled(&self, id: &str) -> bool {
        self.plugins.disabled.iter().any(|d| d == id)
    }

    /// Render as a commented YAML document, as written by `ajshell init`.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        let body = serde_yaml::to_string(self)?;
        Ok(format!("# ajshell configuration\n{body}"))
    }
}

/// Supplies configuration to the bootstrap sequence.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn load(&self) -> Result<ShellConfig, ConfigError>;
}

#[async_trait]
impl ConfigSource for ShellConfig {
    async fn load(&self) -> Result<ShellConfig, ConfigError> {
        Ok(self.clone())
    }
}

/// Loads from an explicit path, or discovers from a start directory.
#[derive(Clone, Debug)]
pub enum FileConfigSource {
    Path(PathBuf),
    Discover(PathBuf),
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn load(&self) -> Result<ShellConfig, ConfigError> {
        match self {
            FileConfigSource::Path(path) => ShellConfig::load(path),
            FileConfigSource::Discover(start) => ShellConfig::discover(start).map(|(_, c)| c),
        }
    }
}
