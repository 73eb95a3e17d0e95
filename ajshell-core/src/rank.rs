//! Relevance ranking of catalog entries against a palette query.

use std::cmp::Reverse;

use crate::i18n::{Translate, Untranslated};
use crate::model::SearchResult;

/// How well a title matches a query. Variants are ordered by relevance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    /// Query occurs somewhere inside the title
    Substring,
    /// Query starts one of the title's words
    WordPrefix,
    /// Title starts with the query
    Prefix,
}

/// Score a displayed title. `needle` must already be lowercased.
pub fn match_kind(title: &str, needle: &str) -> Option<MatchKind> {
    let haystack = title.to_lowercase();
    if haystack.starts_with(needle) {
        return Some(MatchKind::Prefix);
    }
    if haystack
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| !word.is_empty() && word.starts_with(needle))
    {
        return Some(MatchKind::WordPrefix);
    }
    if haystack.contains(needle) {
        return Some(MatchKind::Substring);
    }
    None
}

/// Rank a catalog whose titles are already display text.
pub fn rank(catalog: &[SearchResult], query: &str) -> Vec<SearchResult> {
    rank_with(catalog, query, &Untranslated)
}

/// Rank a catalog, resolving each title through `translator` before matching.
///
/// An empty (or whitespace-only) query returns the whole catalog in its
/// original order. Otherwise non-matching entries are dropped and the rest
/// are ordered by [`MatchKind`], keeping catalog order among equals.
pub fn rank_with(
    catalog: &[SearchResult],
    query: &str,
    translator: &dyn Translate,
) -> Vec<SearchResult> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return catalog.to_vec();
    }

    let mut scored: Vec<(MatchKind, &SearchResult)> = catalog
        .iter()
        .filter_map(|entry| {
            let title = translator.translate(&entry.title);
            match_kind(&title, &needle).map(|kind| (kind, entry))
        })
        .collect();

    // sort_by_key is stable: ties keep catalog order
    scored.sort_by_key(|(kind, _)| Reverse(*kind));
    scored.into_iter().map(|(_, entry)| entry.clone()).collect()
}
