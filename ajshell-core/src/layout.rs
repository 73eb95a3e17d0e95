/// Shell frame toggles. Runtime only, nothing is persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutState {
    /// Persistent sidebar (wide terminals)
    pub primary_sidebar_visible: bool,
    /// Transient sidebar drawn over the content (narrow terminals)
    pub overlay_sidebar_visible: bool,
    pub widescreen: bool,
}

impl Default for LayoutState {
    fn default() -> Self {
        Self {
            primary_sidebar_visible: true,
            overlay_sidebar_visible: false,
            widescreen: false,
        }
    }
}

impl LayoutState {
    pub fn toggle_navigation(&mut self) {
        self.primary_sidebar_visible = !self.primary_sidebar_visible;
    }

    /// Flip the overlay sidebar, or force it to `force` when given.
    pub fn toggle_overlay_navigation(&mut self, force: Option<bool>) {
        self.overlay_sidebar_visible = force.unwrap_or(!self.overlay_sidebar_visible);
    }

    pub fn toggle_widescreen(&mut self) {
        self.widescreen = !self.widescreen;
    }

    pub fn close_overlay(&mut self) {
        self.overlay_sidebar_visible = false;
    }
}
