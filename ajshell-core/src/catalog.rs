//! Navigation catalog: sidebar tree to flat, translated search catalog.

use std::sync::Arc;

use crate::i18n::Translate;
use crate::model::{SearchResult, SidebarItem};

/// Join the shell url prefix with a destination url.
pub fn join_url(prefix: &str, url: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if url.starts_with('/') {
        format!("{}{}", prefix, url)
    } else {
        format!("{}/{}", prefix, url)
    }
}

/// Flatten the sidebar into palette entries, depth first, in sidebar order.
/// Categories are not destinations; only items with a url are emitted.
pub fn flatten(sidebar: &[SidebarItem], translator: &dyn Translate) -> Vec<SearchResult> {
    let mut out = Vec::new();
    for item in sidebar {
        collect(item, translator, &mut out);
    }
    out
}

fn collect(item: &SidebarItem, translator: &dyn Translate, out: &mut Vec<SearchResult>) {
    if let Some(url) = &item.url {
        out.push(SearchResult {
            title: translator.translate(&item.name),
            url: url.clone(),
            icon: item.icon.clone(),
        });
    }
    for child in &item.children {
        collect(child, translator, out);
    }
}

/// Merge sidebar contributions: categories with the same id are combined,
/// keeping first-seen order.
pub fn merge_sidebar(contributions: impl IntoIterator<Item = SidebarItem>) -> Vec<SidebarItem> {
    let mut merged: Vec<SidebarItem> = Vec::new();
    for item in contributions {
        match merged
            .iter_mut()
            .find(|existing| existing.id == item.id && existing.is_category() && item.is_category())
        {
            Some(existing) => existing.children.extend(item.children),
            None => merged.push(item),
        }
    }
    merged
}

/// Immutable catalog snapshot shared with the palette.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub entries: Arc<[SearchResult]>,
    pub url_prefix: String,
}

impl Catalog {
    pub fn new(entries: Vec<SearchResult>, url_prefix: impl Into<String>) -> Self {
        Self {
            entries: entries.into(),
            url_prefix: url_prefix.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn href(&self, result: &SearchResult) -> String {
        join_url(&self.url_prefix, &result.url)
    }
}
