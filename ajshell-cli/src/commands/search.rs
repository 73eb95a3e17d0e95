//! Headless commands: run bootstrap without a terminal UI.

use anyhow::Context;
use serde::Serialize;

use ajshell_core::bootstrap::{Bootstrap, ShellSession};
use ajshell_core::rank::rank;
use ajshell_core::session::SessionProvider;

use crate::plugins::plugin_manager;
use crate::session::LocalSession;
use crate::startup::ConfigLocation;

#[derive(Debug, Serialize)]
struct SearchHit {
    title: String,
    url: String,
    icon: String,
}

async fn bootstrap(location: &ConfigLocation) -> anyhow::Result<ShellSession> {
    let preview = location.preview();
    let session = LocalSession::new(&preview);
    let plugins = plugin_manager(&preview);
    let source = location.source();

    let mut bootstrap = Bootstrap::new();
    let shell = bootstrap
        .begin(source.as_ref(), &session, &plugins)
        .await?
        .context("bootstrap did not run")?;
    for plugin in &shell.failed_plugins {
        eprintln!("warning: plugin '{plugin}' was skipped (see log)");
    }
    Ok(shell)
}

fn search(shell: &ShellSession, query: &str) -> Vec<SearchHit> {
    let mut ranked = rank(&shell.catalog.entries, query);
    ranked.truncate(shell.config.palette.page_size);
    ranked
        .into_iter()
        .map(|r| SearchHit {
            url: shell.catalog.href(&r),
            title: r.title,
            icon: r.icon,
        })
        .collect()
}

pub async fn run_search(location: &ConfigLocation, query: &str, json: bool) -> anyhow::Result<()> {
    let shell = bootstrap(location).await?;
    let hits = search(&shell, query);

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }
    if hits.is_empty() {
        println!("No matches for '{query}'");
        return Ok(());
    }
    for (i, hit) in hits.iter().enumerate() {
        println!("{:>3}. {:<30} {}", i + 1, hit.title, hit.url);
    }
    Ok(())
}

pub async fn run_identity(location: &ConfigLocation) -> anyhow::Result<()> {
    let session = LocalSession::new(&location.preview());
    let identity = session.identity().await?;
    println!("{}", serde_json::to_string_pretty(&identity)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn write_config(dir: &std::path::Path, body: &str) -> ConfigLocation {
        let path = dir.join("ajshell.yml");
        std::fs::write(&path, body).unwrap();
        ConfigLocation { path: Some(path) }
    }

    #[tokio::test]
    async fn test_search_prefixes_urls() {
        let dir = tempfile::tempdir().unwrap();
        let location = write_config(
            dir.path(),
            "url_prefix: /panel\nplugins:\n  disabled: [services, packages]\n",
        );
        let shell = bootstrap(&location).await.unwrap();
        let hits = search(&shell, "term");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "/panel/view/terminal");
    }

    #[tokio::test]
    async fn test_empty_query_lists_catalog_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let location = write_config(dir.path(), "plugins:\n  disabled: [services, packages]\n");
        let shell = bootstrap(&location).await.unwrap();
        let titles: Vec<_> = search(&shell, "").into_iter().map(|h| h.title).collect();
        assert_eq!(
            titles,
            vec!["Dashboard", "Settings", "File Manager", "Terminal", "Notepad"]
        );
    }

    #[tokio::test]
    async fn test_defaults_never_fail_on_missing_host_tools() {
        let location = ConfigLocation { path: None };
        let shell = bootstrap(&location).await.unwrap();
        assert!(shell.failed_plugins.is_empty());
        let titles: Vec<_> = search(&shell, "").into_iter().map(|h| h.title).collect();
        assert!(titles.contains(&"Dashboard".to_string()));
    }

    #[tokio::test]
    async fn test_invalid_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let location = write_config(dir.path(), "palette:\n  debounce_ms: 0\n");
        let err = bootstrap(&location).await.unwrap_err();
        assert!(err.to_string().contains("configuration"));
    }

    #[tokio::test]
    async fn test_missing_file_is_fatal() {
        let location = ConfigLocation {
            path: Some(PathBuf::from("/nonexistent/ajshell.yml")),
        };
        assert!(bootstrap(&location).await.is_err());
    }
}
