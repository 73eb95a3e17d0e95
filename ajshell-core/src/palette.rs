//! Quick-search command palette.
//!
//! The palette is dormant (`Closed`) until opened. While open, every query
//! edit schedules a debounced re-rank of the catalog snapshot; selection is
//! keyboard driven:
//!
//! - `1`..`9` jump straight to the result at that position
//! - `Enter` takes the top-ranked result
//! - `Up`/`Down` move the cursor, `Escape` dismisses
//!
//! Digits are shortcuts while the palette is open, so they never reach the
//! query text.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::catalog::Catalog;
use crate::debounce::Debouncer;
use crate::model::SearchResult;
use crate::rank::rank;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PaletteMode {
    #[default]
    Closed,
    Open,
}

/// Keys the palette understands, independent of the terminal backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaletteKey {
    Char(char),
    Backspace,
    Enter,
    Up,
    Down,
    Escape,
}

/// What the host should do after a key was handled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaletteAction {
    /// Go to `url` (already prefixed); the palette has closed.
    Navigate { url: String, result: SearchResult },
    /// Closed without navigating.
    Dismissed,
}

pub struct PaletteController {
    mode: PaletteMode,
    query: String,
    catalog: Catalog,
    results: Vec<SearchResult>,
    selection: Option<usize>,
    debounce: Debouncer,
    page_size: usize,
    rank_passes: u64,
}

impl PaletteController {
    pub fn new(catalog: Catalog) -> Self {
        Self::with_options(catalog, DEFAULT_DEBOUNCE, DEFAULT_PAGE_SIZE)
    }

    /// Ranks against the catalog titles as displayed, so the catalog must
    /// already be translated (see [`crate::catalog::flatten`]).
    pub fn with_options(
        catalog: Catalog,
        debounce_window: Duration,
        page_size: usize,
    ) -> Self {
        Self {
            mode: PaletteMode::Closed,
            query: String::new(),
            catalog,
            results: Vec::new(),
            selection: None,
            debounce: Debouncer::new(debounce_window),
            page_size: page_size.max(1),
            rank_passes: 0,
        }
    }

    pub fn mode(&self) -> PaletteMode {
        self.mode
    }

    pub fn is_open(&self) -> bool {
        self.mode == PaletteMode::Open
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    /// Cursor into [`results`](Self::results); `None` when the list is empty.
    pub fn selection(&self) -> Option<usize> {
        self.selection
    }

    /// Number of ranking passes run so far.
    pub fn rank_passes(&self) -> u64 {
        self.rank_passes
    }

    pub fn is_rank_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    /// Time until the pending re-rank is due.
    pub fn time_until_rank(&self, now: Instant) -> Option<Duration> {
        self.debounce.time_remaining(now)
    }

    /// Replace the catalog snapshot. The ranked list is recomputed at once.
    pub fn set_catalog(&mut self, catalog: Catalog) {
        self.catalog = catalog;
        if self.is_open() {
            self.debounce.cancel();
            self.rerank();
        }
    }

    pub fn open(&mut self) {
        if self.is_open() {
            return;
        }
        self.mode = PaletteMode::Open;
        self.query.clear();
        self.selection = None;
        self.debounce.cancel();
        self.rerank();
    }

    pub fn close(&mut self) {
        self.mode = PaletteMode::Closed;
        self.query.clear();
        self.results.clear();
        self.selection = None;
        self.debounce.cancel();
    }

    /// Focus moved away from the palette.
    pub fn blur(&mut self) {
        self.close();
    }

    /// Replace the query text and schedule a re-rank after the debounce window.
    pub fn set_query(&mut self, text: impl Into<String>, now: Instant) {
        let text = text.into();
        if text != self.query && !self.results.is_empty() {
            self.selection = Some(0);
        }
        self.query = text;
        self.debounce.schedule(now);
    }

    /// Run the re-rank if its deadline has passed. Returns true if it ran.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.debounce.poll(now) {
            self.rerank();
            true
        } else {
            false
        }
    }

    /// Run a pending re-rank immediately.
    pub fn flush(&mut self) {
        if self.debounce.flush() {
            self.rerank();
        }
    }

    pub fn move_selection(&mut self, delta: isize) {
        if self.results.is_empty() {
            return;
        }
        let last = self.results.len() - 1;
        let current = self.selection.unwrap_or(0).min(last);
        let next = current.saturating_add_signed(delta).min(last);
        self.selection = Some(next);
    }

    /// Navigate to the result at `index` and close. Out of range is a no-op.
    pub fn select_at_index(&mut self, index: usize) -> Option<PaletteAction> {
        self.flush();
        let result = self.results.get(index)?.clone();
        let url = self.catalog.href(&result);
        debug!(index, url = %url, "palette selection");
        self.close();
        Some(PaletteAction::Navigate { url, result })
    }

    pub fn select_current(&mut self) -> Option<PaletteAction> {
        self.flush();
        let index = self.selection?;
        self.select_at_index(index)
    }

    pub fn handle_key(&mut self, key: PaletteKey, now: Instant) -> Option<PaletteAction> {
        if !self.is_open() {
            return None;
        }
        match key {
            PaletteKey::Escape => {
                self.close();
                Some(PaletteAction::Dismissed)
            }
            PaletteKey::Enter => self.select_at_index(0),
            PaletteKey::Char(c @ '1'..='9') => {
                let index = (c as usize) - ('1' as usize);
                self.select_at_index(index)
            }
            PaletteKey::Up => {
                self.move_selection(-1);
                None
            }
            PaletteKey::Down => {
                self.move_selection(1);
                None
            }
            PaletteKey::Backspace => {
                let mut text = self.query.clone();
                text.pop();
                self.set_query(text, now);
                None
            }
            PaletteKey::Char(c) => {
                let mut text = self.query.clone();
                text.push(c);
                self.set_query(text, now);
                None
            }
        }
    }

    fn rerank(&mut self) {
        let mut ranked = rank(&self.catalog.entries, &self.query);
        ranked.truncate(self.page_size);
        self.results = ranked;
        self.selection = match (self.results.len(), self.selection) {
            (0, _) => None,
            (len, Some(i)) => Some(i.min(len - 1)),
            (_, None) => Some(0),
        };
        self.rank_passes += 1;
        debug!(
            query = %self.query,
            results = self.results.len(),
            pass = self.rank_passes,
            "palette re-ranked"
        );
    }
}
