//! `ajshell init` command - writes a default ajshell.yml

use std::fs;
use std::path::{Path, PathBuf};

use ajshell_core::config::{CONFIG_NAMES, ShellConfig};

use crate::plugins::{PACKAGE_MANAGERS, find_in_path};

/// Run the init command
pub fn run_init(yes: bool) -> Result<(), String> {
    let cwd =
        std::env::current_dir().map_err(|e| format!("Failed to get current directory: {}", e))?;
    let output_path = write_config(&cwd, yes)?;

    println!("Created: {}\n", output_path.display());
    println!("Next steps:");
    println!("  1. Review and customize ajshell.yml");
    println!("  2. Run `ajshell doctor` to check it");
    println!("  3. Run `ajshell` to start the shell");

    Ok(())
}

fn write_config(dir: &Path, yes: bool) -> Result<PathBuf, String> {
    for name in &CONFIG_NAMES {
        let path = dir.join(name);
        if path.exists() {
            if !yes {
                return Err(format!(
                    "Config file {} already exists. Use --yes to overwrite.",
                    path.display()
                ));
            }
            println!("Overwriting existing config: {}", path.display());
        }
    }

    let mut config = ShellConfig::default();
    config.plugins.disabled = unavailable_plugins();
    if !config.plugins.disabled.is_empty() {
        println!(
            "Disabling plugins with missing requirements: {}\n",
            config.plugins.disabled.join(", ")
        );
    }

    let yaml = config
        .to_yaml()
        .map_err(|e| format!("Failed to render config: {}", e))?;
    let output_path = dir.join("ajshell.yml");
    fs::write(&output_path, yaml)
        .map_err(|e| format!("Failed to write config: {}", e))?;
    Ok(output_path)
}

/// Built-in plugins whose host tools are missing, listed so the written
/// config shows which views stay hidden on this host.
fn unavailable_plugins() -> Vec<String> {
    let mut disabled = Vec::new();
    if find_in_path("systemctl").is_none() {
        disabled.push("services".to_string());
    }
    let has_pm = PACKAGE_MANAGERS
        .iter()
        .any(|cmd| find_in_path(cmd).is_some());
    if !has_pm {
        disabled.push("packages".to_string());
    }
    disabled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refuses_to_overwrite_without_yes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".ajshell.yml"), "name: keep\n").unwrap();
        let err = write_config(dir.path(), false).unwrap_err();
        assert!(err.contains("already exists"));
    }

    #[test]
    fn test_written_config_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), false).unwrap();
        let config = ShellConfig::load(&path).unwrap();
        assert_eq!(config.palette.debounce_ms, 500);
        assert_eq!(config.bootstrap.tolerated_plugin_failures, 1);
    }
}
