use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type PluginId = String;

/// A navigable destination offered by the palette.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub icon: String,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, url: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            icon: icon.into(),
        }
    }
}

/// Node of the navigation tree. Categories carry children and no url,
/// leaves carry a url.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidebarItem {
    pub id: String,
    /// Translation key for the displayed name
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub children: Vec<SidebarItem>,
}

impl SidebarItem {
    pub fn category(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            icon: String::new(),
            url: None,
            children: Vec::new(),
        }
    }

    pub fn link(
        id: impl Into<String>,
        name: impl Into<String>,
        icon: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            icon: icon.into(),
            url: Some(url.into()),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: SidebarItem) -> Self {
        self.children.push(child);
        self
    }

    pub fn is_category(&self) -> bool {
        self.url.is_none()
    }
}

/// Who the shell is running as
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub user: Option<String>,
    pub uid: u32,
    pub effective: u32,
    pub elevation_allowed: bool,
    #[serde(default)]
    pub profile: BTreeMap<String, serde_json::Value>,
}

impl Identity {
    pub fn is_superuser(&self) -> bool {
        self.effective == 0
    }

    /// Elevation is only offered to non-root sessions that are allowed to sudo.
    pub fn can_elevate(&self) -> bool {
        self.elevation_allowed && !self.is_superuser()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineInfo {
    pub name: String,
    pub hostname: String,
}

/// Identity payload as served by the console backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShellIdentity {
    pub identity: Identity,
    pub machine: MachineInfo,
    pub color: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_superuser_cannot_elevate() {
        let identity = Identity {
            user: Some("root".into()),
            uid: 0,
            effective: 0,
            elevation_allowed: true,
            profile: BTreeMap::new(),
        };
        assert!(identity.is_superuser());
        assert!(!identity.can_elevate());
    }

    #[test]
    fn test_identity_json_shape() {
        let payload = ShellIdentity {
            identity: Identity {
                user: Some("alice".into()),
                uid: 1000,
                effective: 1000,
                elevation_allowed: true,
                profile: BTreeMap::new(),
            },
            machine: MachineInfo {
                name: "box".into(),
                hostname: "box.local".into(),
            },
            color: Some("blue".into()),
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["identity"]["user"], "alice");
        assert_eq!(json["identity"]["elevation_allowed"], true);
        assert_eq!(json["machine"]["hostname"], "box.local");
        assert_eq!(json["color"], "blue");
    }

    #[test]
    fn test_sidebar_builders() {
        let tree = SidebarItem::category("system", "System")
            .with_child(SidebarItem::link("services", "Services", "cog", "/view/services"));
        assert!(tree.is_category());
        assert!(!tree.children[0].is_category());
    }
}
