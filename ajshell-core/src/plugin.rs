//! Plugin contract.
//!
//! Plugins contribute navigation entries during the registration phase of
//! bootstrap. Each registration is isolated: a plugin hands back its whole
//! contribution or an error, never a half-applied change, so one failing
//! plugin cannot corrupt what the others registered.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::bootstrap::StepOutcome;
use crate::config::ShellConfig;
use crate::error::{BootstrapError, PluginError};
use crate::model::{ShellIdentity, SidebarItem};

/// Context handed to a plugin while it registers
#[derive(Clone, Debug)]
pub struct PluginContext {
    pub plugin_id: String,
    pub config: Arc<ShellConfig>,
    pub identity: ShellIdentity,
}

/// What a plugin adds to the shell
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PluginContribution {
    pub sidebar: Vec<SidebarItem>,
}

impl PluginContribution {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn add_item(&mut self, item: SidebarItem) {
        self.sidebar.push(item);
    }

    pub fn with_item(mut self, item: SidebarItem) -> Self {
        self.sidebar.push(item);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sidebar.is_empty()
    }
}

#[async_trait]
pub trait ShellPlugin: Send + Sync {
    /// Unique identifier for this plugin
    fn id(&self) -> &str;

    /// Display name for the plugin
    fn name(&self) -> &str;

    /// Core modules are not optional: their failure halts bootstrap.
    fn is_core(&self) -> bool {
        false
    }

    async fn register(&self, ctx: &PluginContext) -> Result<PluginContribution, PluginError>;
}

/// Result of registering one plugin
#[derive(Clone, Debug)]
pub struct Registration {
    pub plugin_id: String,
    pub outcome: StepOutcome,
    pub contribution: Option<PluginContribution>,
}

/// Register a single plugin, classifying a failure by the plugin's scope.
pub async fn register_plugin(plugin: &dyn ShellPlugin, ctx: &PluginContext) -> Registration {
    let plugin_id = plugin.id().to_string();
    match plugin.register(ctx).await {
        Ok(contribution) => {
            info!(
                plugin = %plugin_id,
                items = contribution.sidebar.len(),
                "plugin registered"
            );
            Registration {
                plugin_id,
                outcome: StepOutcome::Success,
                contribution: Some(contribution),
            }
        }
        Err(err) if plugin.is_core() => Registration {
            outcome: StepOutcome::Fatal {
                error: BootstrapError::CorePlugin {
                    plugin: plugin_id.clone(),
                    reason: err.to_string(),
                },
            },
            plugin_id,
            contribution: None,
        },
        Err(err) => {
            warn!(plugin = %plugin_id, error = %err, "plugin failed to register");
            Registration {
                outcome: StepOutcome::Recoverable {
                    plugin: plugin_id.clone(),
                    reason: err.to_string(),
                },
                plugin_id,
                contribution: None,
            }
        }
    }
}

/// Ordered set of plugins offered to bootstrap
#[derive(Default)]
pub struct PluginManager {
    plugins: Vec<Box<dyn ShellPlugin>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugins(plugins: Vec<Box<dyn ShellPlugin>>) -> Self {
        Self { plugins }
    }

    pub fn add(&mut self, plugin: Box<dyn ShellPlugin>) {
        self.plugins.push(plugin);
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ShellPlugin> {
        self.plugins.iter().map(|p| p.as_ref())
    }

    /// Get plugin by ID
    pub fn get(&self, id: &str) -> Option<&dyn ShellPlugin> {
        self.plugins
            .iter()
            .find(|p| p.id() == id)
            .map(|p| p.as_ref())
    }

    /// List all plugin IDs
    pub fn plugin_ids(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Plugin with a fixed result, for bootstrap tests
    pub struct StubPlugin {
        pub id: &'static str,
        pub core: bool,
        pub fail: Option<&'static str>,
        pub url: &'static str,
    }

    impl StubPlugin {
        pub fn ok(id: &'static str, url: &'static str) -> Self {
            Self {
                id,
                core: false,
                fail: None,
                url,
            }
        }

        pub fn failing(id: &'static str, reason: &'static str) -> Self {
            Self {
                id,
                core: false,
                fail: Some(reason),
                url: "",
            }
        }

        pub fn core(mut self) -> Self {
            self.core = true;
            self
        }
    }

    #[async_trait]
    impl ShellPlugin for StubPlugin {
        fn id(&self) -> &str {
            self.id
        }

        fn name(&self) -> &str {
            self.id
        }

        fn is_core(&self) -> bool {
            self.core
        }

        async fn register(&self, _ctx: &PluginContext) -> Result<PluginContribution, PluginError> {
            if let Some(reason) = self.fail {
                return Err(PluginError::failed(reason));
            }
            Ok(PluginContribution::none().with_item(
                SidebarItem::category("tools", "Tools")
                    .with_child(SidebarItem::link(self.id, self.id, "", self.url)),
            ))
        }
    }

    pub fn context(id: &str) -> PluginContext {
        PluginContext {
            plugin_id: id.to_string(),
            config: Arc::new(ShellConfig::default()),
            identity: ShellIdentity::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn test_successful_registration_keeps_contribution() {
        let plugin = StubPlugin::ok("notepad", "/view/notepad");
        let reg = register_plugin(&plugin, &context("notepad")).await;
        assert_eq!(reg.outcome, StepOutcome::Success);
        assert_eq!(reg.contribution.unwrap().sidebar.len(), 1);
    }

    #[tokio::test]
    async fn test_optional_failure_is_recoverable() {
        let plugin = StubPlugin::failing("services", "systemctl not found");
        let reg = register_plugin(&plugin, &context("services")).await;
        assert_eq!(
            reg.outcome,
            StepOutcome::Recoverable {
                plugin: "services".into(),
                reason: "systemctl not found".into(),
            }
        );
        assert!(reg.contribution.is_none());
    }

    #[tokio::test]
    async fn test_core_failure_is_fatal() {
        let plugin = StubPlugin::failing("core", "broken").core();
        let reg = register_plugin(&plugin, &context("core")).await;
        assert!(matches!(
            reg.outcome,
            StepOutcome::Fatal {
                error: BootstrapError::CorePlugin { .. }
            }
        ));
    }

    #[test]
    fn test_manager_lookup() {
        let mut manager = PluginManager::new();
        manager.add(Box::new(StubPlugin::ok("a", "/a")));
        manager.add(Box::new(StubPlugin::ok("b", "/b")));
        assert_eq!(manager.plugin_ids(), vec!["a", "b"]);
        assert!(manager.get("b").is_some());
        assert!(manager.get("c").is_none());
    }
}
