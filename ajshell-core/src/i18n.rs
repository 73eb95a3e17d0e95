//! Translation collaborator.
//!
//! Titles are ranked and displayed in their translated form, so everything
//! that shows a sidebar name goes through [`Translate`] first.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use thiserror::Error;

pub trait Translate: Send + Sync + std::fmt::Debug {
    /// Resolve a display key. Unknown keys resolve to themselves.
    fn translate(&self, key: &str) -> String;
}

/// Passthrough translator used when no translations are configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct Untranslated;

impl Translate for Untranslated {
    fn translate(&self, key: &str) -> String {
        key.to_string()
    }
}

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Lookup table for one language.
#[derive(Clone, Debug, Default)]
pub struct Translations {
    pub language: String,
    entries: HashMap<String, String>,
}

impl Translations {
    pub fn new(language: impl Into<String>, entries: HashMap<String, String>) -> Self {
        Self {
            language: language.into(),
            entries,
        }
    }

    /// Parse a `{ "<lang>": { "<key>": "<text>" } }` document and keep `language`.
    pub fn from_json(content: &str, language: &str) -> Result<Self, TranslationError> {
        let mut all: BTreeMap<String, HashMap<String, String>> = serde_json::from_str(content)?;
        let entries = all.remove(language).unwrap_or_default();
        Ok(Self::new(language, entries))
    }

    pub fn load(path: &Path, language: &str) -> Result<Self, TranslationError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content, language)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Translate for Translations {
    fn translate(&self, key: &str) -> String {
        self.entries
            .get(key)
            .filter(|text| !text.is_empty())
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

/// Languages available across a set of locale directories, sorted.
/// The gettext template (`app.pot`) is not a language.
pub fn available_languages(locale_dirs: &[PathBuf]) -> Vec<String> {
    let mut languages = BTreeSet::new();
    for dir in locale_dirs {
        let Ok(entries) = std::fs::read_dir(dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name != "app.pot" {
                languages.insert(name);
            }
        }
    }
    languages.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "de": { "File Manager": "Dateimanager", "Services": "" },
        "fr": { "File Manager": "Gestionnaire de fichiers" }
    }"#;

    #[test]
    fn test_translate_known_key() {
        let tr = Translations::from_json(DOC, "de").unwrap();
        assert_eq!(tr.translate("File Manager"), "Dateimanager");
    }

    #[test]
    fn test_missing_and_empty_keys_fall_back() {
        let tr = Translations::from_json(DOC, "de").unwrap();
        assert_eq!(tr.translate("Terminal"), "Terminal");
        assert_eq!(tr.translate("Services"), "Services");
    }

    #[test]
    fn test_unknown_language_is_passthrough() {
        let tr = Translations::from_json(DOC, "ja").unwrap();
        assert!(tr.is_empty());
        assert_eq!(tr.translate("File Manager"), "File Manager");
    }

    #[test]
    fn test_available_languages_skips_template() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        for name in ["de", "fr", "app.pot"] {
            std::fs::create_dir_all(a.path().join(name)).unwrap();
        }
        std::fs::create_dir_all(b.path().join("de")).unwrap();
        std::fs::create_dir_all(b.path().join("ru")).unwrap();

        let langs = available_languages(&[
            a.path().to_path_buf(),
            b.path().to_path_buf(),
            PathBuf::from("/nonexistent/locale"),
        ]);
        assert_eq!(langs, vec!["de", "fr", "ru"]);
    }
}
