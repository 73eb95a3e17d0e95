//! `ajshell doctor`: check configuration and plugin requirements without
//! starting the shell.

use std::path::Path;

use ajshell_core::config::ShellConfig;
use ajshell_core::i18n::Translations;

use crate::plugins::{ManifestPlugin, PACKAGE_MANAGERS, PluginManifest, find_in_path};
use crate::startup::ConfigLocation;

#[derive(Debug)]
pub struct Check {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub hint: Option<String>,
}

impl Check {
    fn ok(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            message: message.into(),
            hint: None,
        }
    }

    fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            message: message.into(),
            hint: None,
        }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

pub async fn run_doctor(location: &ConfigLocation) -> Result<(), String> {
    println!("ajshell doctor\n");

    let mut checks: Vec<Check> = Vec::new();

    println!("Configuration:");
    let config = match &location.path {
        Some(path) => match ShellConfig::load(path) {
            Ok(config) => {
                checks.push(Check::ok("config", path.display().to_string()));
                Some(config)
            }
            Err(e) => {
                checks.push(
                    Check::fail("config", e.to_string())
                        .with_hint("the shell will stop at startup until this is fixed"),
                );
                None
            }
        },
        None => {
            checks.push(
                Check::ok("config", "not found, using defaults")
                    .with_hint("run `ajshell init` to create one"),
            );
            Some(ShellConfig::default())
        }
    };
    if let Some(config) = &config {
        checks.extend(check_translations(config));
    }
    checks.push(check_log_dir(&location.log_path()));
    print_section(&checks);

    println!("Plugins:");
    let mut plugin_checks = vec![
        check_command("services", "systemctl"),
        check_any_command("packages", PACKAGE_MANAGERS),
    ];
    if let Some(config) = &config {
        let mut manifest_checks = Vec::new();
        for path in &config.plugins.manifests {
            manifest_checks.push(check_manifest(&config.resolve_path(path)).await);
        }
        // Built-ins with a missing tool are hidden, only manifests can fail bootstrap.
        let tolerated = config.bootstrap.tolerated_plugin_failures;
        let failing = manifest_checks.iter().filter(|c| !c.passed).count();
        plugin_checks.extend(manifest_checks);
        if failing > tolerated {
            plugin_checks.push(
                Check::fail(
                    "tolerance",
                    format!("{failing} plugins would fail, {tolerated} tolerated"),
                )
                .with_hint(
                    "disable plugins under plugins.disabled or raise \
                     bootstrap.tolerated_plugin_failures",
                ),
            );
        }
    }
    print_section(&plugin_checks);
    checks.extend(plugin_checks);

    let failed: Vec<_> = checks.iter().filter(|c| !c.passed).collect();
    if failed.is_empty() {
        println!("All checks passed!");
    } else {
        println!("Issues found:");
        for check in &failed {
            println!("  - {}: {}", check.name, check.message);
            if let Some(hint) = &check.hint {
                println!("    Hint: {}", hint);
            }
        }
    }

    Ok(())
}

fn print_section(checks: &[Check]) {
    for check in checks {
        print_check(check);
    }
    println!();
}

fn print_check(check: &Check) {
    let icon = if check.passed { "✓" } else { "✗" };
    let color = if check.passed { "\x1b[32m" } else { "\x1b[31m" };
    let reset = "\x1b[0m";

    println!(
        "  {}{}{} {}: {}",
        color, icon, reset, check.name, check.message
    );

    if let Some(hint) = &check.hint {
        println!("    └─ {}", hint);
    }
}

fn check_translations(config: &ShellConfig) -> Option<Check> {
    let path = config.translations.as_ref()?;
    let path = config.resolve_path(path);
    Some(match Translations::load(&path, &config.language) {
        Ok(tr) if tr.is_empty() => Check::fail(
            "translations",
            format!("no entries for '{}' in {}", config.language, path.display()),
        )
        .with_hint("titles will be shown untranslated"),
        Ok(tr) => Check::ok(
            "translations",
            format!("{} entries for '{}'", tr.len(), tr.language),
        ),
        Err(e) => Check::fail("translations", format!("{}: {e}", path.display()))
            .with_hint("titles will be shown untranslated"),
    })
}

fn check_log_dir(log_path: &Path) -> Check {
    let dir = log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    if dir.is_dir() {
        Check::ok("log", log_path.display().to_string())
    } else {
        Check::fail("log", format!("directory {} does not exist", dir.display()))
    }
}

fn check_command(plugin: &str, cmd: &str) -> Check {
    match find_in_path(cmd) {
        Some(path) => Check::ok(plugin, path.display().to_string()),
        None => Check::fail(plugin, format!("{cmd} not found"))
            .with_hint(format!("the {plugin} view stays hidden until {cmd} is installed")),
    }
}

fn check_any_command(plugin: &str, cmds: &[&str]) -> Check {
    match cmds.iter().find_map(|cmd| find_in_path(cmd)) {
        Some(path) => Check::ok(plugin, path.display().to_string()),
        None => Check::fail(plugin, format!("none of {} found", cmds.join(", ")))
            .with_hint(format!("the {plugin} view stays hidden until one is installed")),
    }
}

async fn check_manifest(path: &Path) -> Check {
    let plugin = ManifestPlugin::new(path.to_path_buf());
    let name = plugin.path().display().to_string();
    match plugin.read().await {
        Ok(manifest) if manifest.sidebar.is_empty() => {
            Check::fail(name, "manifest has no sidebar entries")
        }
        Ok(manifest) => Check::ok(
            name,
            format!(
                "{} ({} sidebar entries)",
                manifest.name.as_deref().unwrap_or(&manifest_id(&manifest, path)),
                manifest.sidebar.len()
            ),
        ),
        Err(e) => Check::fail(name, e.to_string()),
    }
}

fn manifest_id(manifest: &PluginManifest, path: &Path) -> String {
    manifest.id.clone().unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manifest_check() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("nginx.yml");
        std::fs::write(
            &good,
            "name: Nginx\nsidebar:\n  - id: nginx\n    name: Nginx\n    url: /view/nginx\n",
        )
        .unwrap();
        let check = check_manifest(&good).await;
        assert!(check.passed);
        assert_eq!(check.message, "Nginx (1 sidebar entries)");

        let empty = dir.path().join("empty.yml");
        std::fs::write(&empty, "id: empty\n").unwrap();
        assert!(!check_manifest(&empty).await.passed);
    }

    #[test]
    fn test_translations_check() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("tr.json"),
            r#"{"de": {"Terminal": "Konsole"}}"#,
        )
        .unwrap();
        let mut config = ShellConfig::default();
        config.base_dir = Some(dir.path().to_path_buf());
        config.translations = Some("tr.json".into());

        config.language = "de".into();
        assert!(check_translations(&config).unwrap().passed);

        config.language = "fr".into();
        assert!(!check_translations(&config).unwrap().passed);
    }
}
