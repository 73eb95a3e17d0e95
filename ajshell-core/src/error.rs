//! Error taxonomy for the shell.
//!
//! Only [`BootstrapError`] ever reaches the user as a blocking surface.
//! Plugin failures are isolated and empty search results are not errors.

use thiserror::Error;

use crate::config::ConfigError;
use crate::model::PluginId;

/// Fatal bootstrap failure. The shell halts and a restart is required.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BootstrapError {
    #[error("configuration failed to load: {0}")]
    Configuration(String),
    #[error("identity resolution failed: {0}")]
    Identity(String),
    #[error("core module '{plugin}' failed to register: {reason}")]
    CorePlugin { plugin: PluginId, reason: String },
    #[error("{} plugins failed (tolerated: {tolerated}): {}", failed.len(), failed.join(", "))]
    TooManyPluginFailures {
        failed: Vec<PluginId>,
        tolerated: usize,
    },
    #[error("route table construction failed: {0}")]
    Routes(String),
}

/// Recoverable, plugin-scoped registration failure.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PluginError {
    #[error("{0}")]
    Failed(String),
    #[error("requirement not met: {0}")]
    MissingRequirement(String),
    #[error("manifest error: {0}")]
    Manifest(String),
}

impl PluginError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("url '{url}' claimed by both '{first}' and '{second}'")]
    Conflict {
        url: String,
        first: PluginId,
        second: PluginId,
    },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no session")]
    NoSession,
    #[error("identity unavailable: {0}")]
    Unavailable(String),
}

impl From<ConfigError> for BootstrapError {
    fn from(e: ConfigError) -> Self {
        BootstrapError::Configuration(e.to_string())
    }
}

impl From<SessionError> for BootstrapError {
    fn from(e: SessionError) -> Self {
        BootstrapError::Identity(e.to_string())
    }
}

impl From<RouteError> for BootstrapError {
    fn from(e: RouteError) -> Self {
        BootstrapError::Routes(e.to_string())
    }
}
