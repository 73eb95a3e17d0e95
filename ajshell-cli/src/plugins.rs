//! Built-in plugins and YAML plugin manifests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use ajshell_core::config::ShellConfig;
use ajshell_core::error::PluginError;
use ajshell_core::model::SidebarItem;
use ajshell_core::plugin::{PluginContext, PluginContribution, PluginManager, ShellPlugin};

pub const PACKAGE_MANAGERS: &[&str] = &["apt-get", "dnf", "yum", "pacman", "zypper", "apk"];

/// What must be on `PATH` for a plugin to load
#[derive(Clone, Copy, Debug)]
enum Requirement {
    None,
    Command(&'static str),
    AnyCommand(&'static [&'static str]),
}

impl Requirement {
    fn check(&self) -> Result<(), PluginError> {
        match self {
            Requirement::None => Ok(()),
            Requirement::Command(cmd) => find_in_path(cmd)
                .map(|_| ())
                .ok_or_else(|| PluginError::MissingRequirement(format!("{cmd} not found"))),
            Requirement::AnyCommand(cmds) => {
                if cmds.iter().any(|cmd| find_in_path(cmd).is_some()) {
                    Ok(())
                } else {
                    Err(PluginError::MissingRequirement(format!(
                        "none of {} found",
                        cmds.join(", ")
                    )))
                }
            }
        }
    }
}

/// Locate an executable on `PATH`.
pub fn find_in_path(cmd: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(cmd))
        .find(|candidate| candidate.is_file())
}

struct Entry {
    id: &'static str,
    name: &'static str,
    icon: &'static str,
    url: &'static str,
}

/// Plugin compiled into the shell
pub struct BuiltinPlugin {
    id: &'static str,
    name: &'static str,
    core: bool,
    category: (&'static str, &'static str),
    entries: Vec<Entry>,
    requirement: Requirement,
}

#[async_trait]
impl ShellPlugin for BuiltinPlugin {
    fn id(&self) -> &str {
        self.id
    }

    fn name(&self) -> &str {
        self.name
    }

    fn is_core(&self) -> bool {
        self.core
    }

    /// A built-in whose host tool is missing contributes nothing rather than
    /// failing, so it never counts against the failure tolerance.
    async fn register(&self, _ctx: &PluginContext) -> Result<PluginContribution, PluginError> {
        if let Err(e) = self.requirement.check() {
            info!(plugin = self.id, reason = %e, "plugin not applicable on this host");
            return Ok(PluginContribution::none());
        }
        let (cat_id, cat_name) = self.category;
        let category = self
            .entries
            .iter()
            .fold(SidebarItem::category(cat_id, cat_name), |cat, e| {
                cat.with_child(SidebarItem::link(e.id, e.name, e.icon, e.url))
            });
        Ok(PluginContribution::none().with_item(category))
    }
}

fn builtin(
    id: &'static str,
    name: &'static str,
    category: (&'static str, &'static str),
    entries: Vec<Entry>,
    requirement: Requirement,
) -> BuiltinPlugin {
    BuiltinPlugin {
        id,
        name,
        core: false,
        category,
        entries,
        requirement,
    }
}

const GENERAL: (&str, &str) = ("general", "General");
const TOOLS: (&str, &str) = ("tools", "Tools");
const SYSTEM: (&str, &str) = ("system", "System");

pub fn builtin_plugins() -> Vec<BuiltinPlugin> {
    let mut core = builtin(
        "core",
        "Core",
        GENERAL,
        vec![
            Entry {
                id: "dashboard",
                name: "Dashboard",
                icon: "dashboard",
                url: "/view/dashboard",
            },
            Entry {
                id: "settings",
                name: "Settings",
                icon: "cog",
                url: "/view/settings",
            },
        ],
        Requirement::None,
    );
    core.core = true;

    vec![
        core,
        builtin(
            "filesystem",
            "File Manager",
            TOOLS,
            vec![Entry {
                id: "filesystem",
                name: "File Manager",
                icon: "folder",
                url: "/view/filesystem",
            }],
            Requirement::None,
        ),
        builtin(
            "terminal",
            "Terminal",
            TOOLS,
            vec![Entry {
                id: "terminal",
                name: "Terminal",
                icon: "terminal",
                url: "/view/terminal",
            }],
            Requirement::None,
        ),
        builtin(
            "notepad",
            "Notepad",
            TOOLS,
            vec![Entry {
                id: "notepad",
                name: "Notepad",
                icon: "edit",
                url: "/view/notepad",
            }],
            Requirement::None,
        ),
        builtin(
            "services",
            "Services",
            SYSTEM,
            vec![Entry {
                id: "services",
                name: "Services",
                icon: "cogs",
                url: "/view/services",
            }],
            Requirement::Command("systemctl"),
        ),
        builtin(
            "packages",
            "Packages",
            SYSTEM,
            vec![Entry {
                id: "packages",
                name: "Packages",
                icon: "gift",
                url: "/view/packages",
            }],
            Requirement::AnyCommand(PACKAGE_MANAGERS),
        ),
    ]
}

/// On-disk description of an external plugin
#[derive(Clone, Debug, Deserialize)]
pub struct PluginManifest {
    pub id: Option<String>,
    pub name: Option<String>,
    /// Executables that must be on `PATH`
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub sidebar: Vec<SidebarItem>,
}

/// Plugin loaded from a manifest file. Read and parse errors surface at
/// registration, so a broken manifest only costs its own plugin.
pub struct ManifestPlugin {
    id: String,
    path: PathBuf,
}

impl ManifestPlugin {
    /// The id defaults to the file stem until the manifest is read.
    pub fn new(path: PathBuf) -> Self {
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { id, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> Result<PluginManifest, PluginError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| PluginError::Manifest(format!("{}: {e}", self.path.display())))?;
        serde_yaml::from_str(&content)
            .map_err(|e| PluginError::Manifest(format!("{}: {e}", self.path.display())))
    }
}

#[async_trait]
impl ShellPlugin for ManifestPlugin {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    async fn register(&self, _ctx: &PluginContext) -> Result<PluginContribution, PluginError> {
        let manifest = self.read().await?;
        if let Some(id) = &manifest.id {
            if id != &self.id {
                return Err(PluginError::Manifest(format!(
                    "manifest id '{id}' does not match file name '{}'",
                    self.id
                )));
            }
        }
        for cmd in &manifest.requires {
            if find_in_path(cmd).is_none() {
                return Err(PluginError::MissingRequirement(format!("{cmd} not found")));
            }
        }
        if manifest.sidebar.is_empty() {
            return Err(PluginError::Manifest("manifest has no sidebar entries".into()));
        }
        Ok(PluginContribution {
            sidebar: manifest.sidebar,
        })
    }
}

/// Plugins offered to bootstrap: built-ins first, then manifests in config order.
pub fn plugin_manager(config: &ShellConfig) -> PluginManager {
    let mut manager = PluginManager::new();
    for plugin in builtin_plugins() {
        manager.add(Box::new(plugin));
    }
    for path in &config.plugins.manifests {
        manager.add(Box::new(ManifestPlugin::new(config.resolve_path(path))));
    }
    manager
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ajshell_core::model::ShellIdentity;

    use super::*;

    fn ctx() -> PluginContext {
        PluginContext {
            plugin_id: "test".into(),
            config: Arc::new(ShellConfig::default()),
            identity: ShellIdentity::default(),
        }
    }

    #[tokio::test]
    async fn test_core_plugin_contributes_dashboard() {
        let plugins = builtin_plugins();
        let core = plugins.iter().find(|p| p.id() == "core").unwrap();
        assert!(core.is_core());
        let contribution = core.register(&ctx()).await.unwrap();
        let general = &contribution.sidebar[0];
        assert_eq!(general.id, "general");
        assert_eq!(
            general.children[0].url.as_deref(),
            Some("/view/dashboard")
        );
    }

    #[tokio::test]
    async fn test_missing_command_contributes_nothing() {
        let plugin = builtin(
            "ghost",
            "Ghost",
            TOOLS,
            vec![Entry {
                id: "ghost",
                name: "Ghost",
                icon: "ghost",
                url: "/view/ghost",
            }],
            Requirement::Command("ajshell-no-such-binary"),
        );
        assert!(plugin.requirement.check().is_err());
        let contribution = plugin.register(&ctx()).await.unwrap();
        assert!(contribution.is_empty());
    }

    #[tokio::test]
    async fn test_manifest_missing_requirement_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ghost.yml");
        std::fs::write(
            &path,
            "requires: [ajshell-no-such-binary]\nsidebar:\n  - id: ghost\n    name: Ghost\n    url: /view/ghost\n",
        )
        .unwrap();
        let err = ManifestPlugin::new(path).register(&ctx()).await.unwrap_err();
        assert!(matches!(err, PluginError::MissingRequirement(_)));
    }

    #[tokio::test]
    async fn test_manifest_plugin_loads_sidebar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nginx.yml");
        std::fs::write(
            &path,
            r#"
id: nginx
sidebar:
  - id: web
    name: Web
    children:
      - id: nginx
        name: Nginx
        icon: globe
        url: /view/nginx
"#,
        )
        .unwrap();

        let plugin = ManifestPlugin::new(path);
        assert_eq!(plugin.id(), "nginx");
        let contribution = plugin.register(&ctx()).await.unwrap();
        assert_eq!(
            contribution.sidebar[0].children[0].url.as_deref(),
            Some("/view/nginx")
        );
    }

    #[tokio::test]
    async fn test_broken_manifest_is_recoverable_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yml");
        std::fs::write(&path, "sidebar: [this is: not valid").unwrap();

        let err = ManifestPlugin::new(path).register(&ctx()).await.unwrap_err();
        assert!(matches!(err, PluginError::Manifest(_)));

        let missing = ManifestPlugin::new(dir.path().join("absent.yml"));
        assert!(missing.register(&ctx()).await.is_err());
    }

    #[test]
    fn test_manager_includes_manifests_after_builtins() {
        let mut config = ShellConfig::default();
        config.base_dir = Some(PathBuf::from("/etc/ajshell"));
        config.plugins.manifests = vec![PathBuf::from("plugins/nginx.yml")];
        let manager = plugin_manager(&config);
        let ids = manager.plugin_ids();
        assert_eq!(ids.first(), Some(&"core"));
        assert_eq!(ids.last(), Some(&"nginx"));
    }
}
