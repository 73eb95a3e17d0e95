use std::collections::BTreeMap;

use crate::error::RouteError;
use crate::i18n::Translate;
use crate::model::{PluginId, SidebarItem};
use crate::plugin::PluginContribution;

/// Destination owned by a plugin
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteEntry {
    pub plugin_id: PluginId,
    pub title: String,
    pub icon: String,
}

/// Url to destination map, built once during bootstrap.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: BTreeMap<String, RouteEntry>,
}

impl RouteTable {
    /// Build from registered contributions. Two plugins claiming the same url
    /// is a conflict; a plugin repeating its own url keeps the first entry.
    pub fn build(
        contributions: &[(PluginId, PluginContribution)],
        translator: &dyn Translate,
    ) -> Result<Self, RouteError> {
        let mut table = Self::default();
        for (plugin_id, contribution) in contributions {
            for item in &contribution.sidebar {
                table.insert_tree(plugin_id, item, translator)?;
            }
        }
        Ok(table)
    }

    fn insert_tree(
        &mut self,
        plugin_id: &str,
        item: &SidebarItem,
        translator: &dyn Translate,
    ) -> Result<(), RouteError> {
        if let Some(url) = &item.url {
            match self.routes.get(url) {
                Some(existing) if existing.plugin_id != plugin_id => {
                    return Err(RouteError::Conflict {
                        url: url.clone(),
                        first: existing.plugin_id.clone(),
                        second: plugin_id.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    self.routes.insert(
                        url.clone(),
                        RouteEntry {
                            plugin_id: plugin_id.to_string(),
                            title: translator.translate(&item.name),
                            icon: item.icon.clone(),
                        },
                    );
                }
            }
        }
        for child in &item.children {
            self.insert_tree(plugin_id, child, translator)?;
        }
        Ok(())
    }

    pub fn resolve(&self, url: &str) -> Option<&RouteEntry> {
        self.routes.get(url)
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Untranslated;

    fn contribution(items: &[(&str, &str)]) -> PluginContribution {
        let mut category = SidebarItem::category("tools", "Tools");
        for (name, url) in items {
            category = category.with_child(SidebarItem::link(*name, *name, "", *url));
        }
        PluginContribution::none().with_item(category)
    }

    #[test]
    fn test_build_and_resolve() {
        let table = RouteTable::build(
            &[
                ("fm".into(), contribution(&[("File Manager", "/view/filesystem")])),
                ("term".into(), contribution(&[("Terminal", "/view/terminal")])),
            ],
            &Untranslated,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve("/view/terminal").unwrap().plugin_id, "term");
        assert!(table.resolve("/view/nothing").is_none());
    }

    #[test]
    fn test_conflicting_plugins() {
        let result = RouteTable::build(
            &[
                ("a".into(), contribution(&[("A", "/view/same")])),
                ("b".into(), contribution(&[("B", "/view/same")])),
            ],
            &Untranslated,
        );
        assert!(matches!(result, Err(RouteError::Conflict { .. })));
    }

    #[test]
    fn test_plugin_may_repeat_its_own_url() {
        let table = RouteTable::build(
            &[("a".into(), contribution(&[("A", "/view/a"), ("A again", "/view/a")]))],
            &Untranslated,
        )
        .unwrap();
        assert_eq!(table.resolve("/view/a").unwrap().title, "A");
    }
}
