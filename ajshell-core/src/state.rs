use crate::bootstrap::{BootstrapState, BootstrapStep, ShellSession};
use crate::countdown::{Countdown, tick};
use crate::layout::LayoutState;
use crate::model::{PluginId, SearchResult};
use crate::routes::RouteEntry;

/// Non-blocking notice that an optional plugin was skipped
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginWarning {
    pub plugin: PluginId,
    pub reason: String,
}

/// Shared application state, written by the reducer and read by the UI.
#[derive(Debug, Default)]
pub struct AppState {
    pub bootstrap: BootstrapState,
    /// Set once bootstrap reaches `Ready`; layout commands are ignored before.
    pub app_ready: bool,
    pub current_step: Option<BootstrapStep>,
    pub layout: LayoutState,
    pub session: Option<ShellSession>,
    pub plugin_warnings: Vec<PluginWarning>,
    pub current_url: Option<String>,
    pub seconds_remaining: Option<i64>,
    pub session_expired: bool,
    pub last_event_id: u64,
}

impl AppState {
    pub fn countdown(&self) -> Option<Countdown> {
        self.seconds_remaining.and_then(tick)
    }

    pub fn toggle_navigation(&mut self) {
        if self.app_ready {
            self.layout.toggle_navigation();
        }
    }

    pub fn toggle_overlay_navigation(&mut self, force: Option<bool>) {
        if self.app_ready {
            self.layout.toggle_overlay_navigation(force);
        }
    }

    pub fn toggle_widescreen(&mut self) {
        if self.app_ready {
            self.layout.toggle_widescreen();
        }
    }

    /// Go to an already prefixed url. Navigation always closes the overlay.
    pub fn navigate(&mut self, url: impl Into<String>) {
        if !self.app_ready {
            return;
        }
        self.current_url = Some(url.into());
        self.layout.close_overlay();
    }

    /// Navigate to a catalog entry, applying the url prefix.
    pub fn select_result(&mut self, result: &SearchResult) {
        let Some(url) = self.session.as_ref().map(|s| s.catalog.href(result)) else {
            return;
        };
        self.navigate(url);
    }

    pub fn on_palette_opened(&mut self) {
        self.layout.close_overlay();
    }

    /// Drop the oldest pending plugin warning.
    pub fn dismiss_plugin_warning(&mut self) {
        if !self.plugin_warnings.is_empty() {
            self.plugin_warnings.remove(0);
        }
    }

    /// Route currently displayed, resolved without the url prefix.
    pub fn current_route(&self) -> Option<&RouteEntry> {
        let session = self.session.as_ref()?;
        let url = self.current_url.as_deref()?;
        let prefix = session.catalog.url_prefix.trim_end_matches('/');
        let path = url.strip_prefix(prefix).unwrap_or(url);
        session.routes.resolve(path)
    }
}
