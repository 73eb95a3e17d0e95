//! Interactive shell: terminal setup, the event loop and key dispatch.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::{
    event::{
        self, DisableFocusChange, EnableFocusChange, Event as CEvent, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

use ajshell_core::bootstrap::{Bootstrap, BootstrapState};
use ajshell_core::countdown::CountdownTicker;
use ajshell_core::palette::{PaletteAction, PaletteController, PaletteKey};
use ajshell_core::reducer::{EventBus, reduce};
use ajshell_core::session::SessionProvider;
use ajshell_core::state::AppState;

use crate::plugins::plugin_manager;
use crate::session::LocalSession;
use crate::startup::ConfigLocation;
use crate::ui::{self, Chrome};

const EVENT_CAPACITY: usize = 1_000;
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Why the shell exited
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    Quit,
    LoggedOut,
    Expired,
}

/// Requests from key handling that need the session collaborator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    Quit,
    /// Any key after expiry leaves the shell
    Expired,
    Elevate,
    Logout,
}

/// State owned by the UI loop alone
#[derive(Default)]
pub struct App {
    palette: Option<PaletteController>,
    sidebar_cursor: usize,
    notice: Option<String>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the palette once the session is available.
    pub fn sync(&mut self, state: &AppState) {
        if self.palette.is_some() {
            return;
        }
        let Some(session) = &state.session else {
            return;
        };
        self.palette = Some(PaletteController::with_options(
            session.catalog.clone(),
            session.config.debounce_window(),
            session.config.palette.page_size,
        ));
    }

    /// Run a due re-rank. Returns how long until the next one, if pending.
    pub fn poll(&mut self, now: Instant) -> Option<Duration> {
        let palette = self.palette.as_mut()?;
        palette.poll(now);
        palette.time_until_rank(now)
    }

    pub fn blur(&mut self) {
        if let Some(palette) = self.palette.as_mut() {
            palette.blur();
        }
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub fn chrome<'a>(&'a self, log_path: &'a Path) -> Chrome<'a> {
        Chrome {
            palette: self.palette.as_ref(),
            sidebar_cursor: self.sidebar_cursor,
            notice: self.notice.as_deref(),
            log_path,
        }
    }

    pub fn handle_key(
        &mut self,
        state: &mut AppState,
        key: KeyEvent,
        now: Instant,
    ) -> Option<Effect> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Effect::Quit);
        }
        if !matches!(state.bootstrap, BootstrapState::Ready) {
            return matches!(key.code, KeyCode::Char('q') | KeyCode::Esc).then_some(Effect::Quit);
        }
        if state.session_expired {
            return Some(Effect::Expired);
        }

        if let Some(palette) = self.palette.as_mut().filter(|p| p.is_open()) {
            let palette_key = match key.code {
                KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    PaletteKey::Char(c)
                }
                KeyCode::Backspace => PaletteKey::Backspace,
                KeyCode::Enter => PaletteKey::Enter,
                KeyCode::Up => PaletteKey::Up,
                KeyCode::Down => PaletteKey::Down,
                KeyCode::Esc => PaletteKey::Escape,
                _ => return None,
            };
            if let Some(PaletteAction::Navigate { url, result }) =
                palette.handle_key(palette_key, now)
            {
                state.navigate(url);
                if let Some(index) = state
                    .session
                    .as_ref()
                    .and_then(|s| s.catalog.entries.iter().position(|e| *e == result))
                {
                    self.sidebar_cursor = index;
                }
            }
            return None;
        }

        if !state.plugin_warnings.is_empty() {
            match key.code {
                KeyCode::Enter | KeyCode::Esc => state.dismiss_plugin_warning(),
                KeyCode::Char('q') => return Some(Effect::Quit),
                _ => {}
            }
            return None;
        }

        self.notice = None;
        let links = state.session.as_ref().map(|s| s.catalog.len()).unwrap_or(0);
        match (key.code, key.modifiers) {
            (KeyCode::Char('p'), KeyModifiers::CONTROL) | (KeyCode::Char('/'), _) => {
                if let Some(palette) = self.palette.as_mut() {
                    palette.open();
                    state.on_palette_opened();
                }
            }
            (KeyCode::Char('b'), _) => state.toggle_navigation(),
            (KeyCode::Char('o'), _) => state.toggle_overlay_navigation(None),
            (KeyCode::Char('w'), _) => state.toggle_widescreen(),
            (KeyCode::Esc, _) => state.toggle_overlay_navigation(Some(false)),
            (KeyCode::Up, _) => self.sidebar_cursor = self.sidebar_cursor.saturating_sub(1),
            (KeyCode::Down, _) => {
                if self.sidebar_cursor + 1 < links {
                    self.sidebar_cursor += 1;
                }
            }
            (KeyCode::Enter, _) => {
                let result = state
                    .session
                    .as_ref()
                    .and_then(|s| s.catalog.entries.get(self.sidebar_cursor).cloned());
                if let Some(result) = result {
                    state.select_result(&result);
                }
            }
            (KeyCode::Char('e'), _) => return Some(Effect::Elevate),
            (KeyCode::Char('L'), _) => return Some(Effect::Logout),
            (KeyCode::Char('q'), _) => return Some(Effect::Quit),
            _ => {}
        }
        None
    }
}

// --- Terminal setup/teardown ---
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableFocusChange, LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

pub async fn run_tui(location: ConfigLocation) -> anyhow::Result<Exit> {
    let log_path = location.log_path();
    let preview = location.preview();
    ui::theme::init(preview.color.as_deref());
    info!(config = %location.display(), "starting shell");

    let bus = EventBus::new(EVENT_CAPACITY);
    let state = Arc::new(RwLock::new(AppState::default()));
    let session = Arc::new(LocalSession::new(&preview));

    // Reducer task; subscribed before bootstrap so no event is missed
    let state_for_reducer = state.clone();
    let mut reducer_rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match reducer_rx.recv().await {
                Ok(env) => {
                    let mut s = state_for_reducer.write().await;
                    reduce(&mut s, &env);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "reducer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Bootstrap task
    let source = location.source();
    let plugins = plugin_manager(&preview);
    let boot_session = session.clone();
    let boot_bus = bus.clone();
    tokio::spawn(async move {
        let mut bootstrap = Bootstrap::new().with_events(boot_bus);
        if let Err(e) = bootstrap
            .begin(source.as_ref(), boot_session.as_ref(), &plugins)
            .await
        {
            debug!(error = %e, "bootstrap finished with error");
        }
    });

    let mut terminal = setup_terminal()?;
    let res = tui_loop(&mut terminal, state, session, bus, &log_path).await;
    restore_terminal(terminal)?;
    res
}

async fn tui_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: Arc<RwLock<AppState>>,
    session: Arc<LocalSession>,
    bus: EventBus,
    log_path: &Path,
) -> anyhow::Result<Exit> {
    let mut app = App::new();
    let mut ticker: Option<CountdownTicker> = None;

    loop {
        let now = Instant::now();
        let rank_due = app.poll(now);

        let (start_ticker, expired) = {
            let snapshot = state.read().await;
            app.sync(&snapshot);
            terminal.draw(|f| ui::draw(f, &snapshot, &app.chrome(log_path)))?;
            (
                snapshot.app_ready && ticker.is_none() && !snapshot.session_expired,
                snapshot.session_expired,
            )
        };

        if start_ticker {
            ticker = Some(spawn_ticker(&session, &bus).await?);
        }

        let timeout = rank_due.map_or(IDLE_POLL, |d| d.min(IDLE_POLL));
        if !event::poll(timeout)? {
            continue;
        }

        let key = match event::read()? {
            CEvent::Key(key) if key.kind == KeyEventKind::Press => key,
            CEvent::FocusLost => {
                app.blur();
                continue;
            }
            _ => continue,
        };

        let effect = {
            let mut s = state.write().await;
            app.handle_key(&mut s, key, Instant::now())
        };
        match effect {
            Some(Effect::Expired) => return Ok(Exit::Expired),
            Some(Effect::Quit) => return Ok(Exit::Quit),
            Some(Effect::Logout) => {
                session.logout();
                return Ok(Exit::LoggedOut);
            }
            Some(Effect::Elevate) => {
                session.elevate();
                if session.elevation_requested() {
                    app.set_notice("Elevation requested, restart with sudo to apply");
                } else {
                    app.set_notice("Elevation is not allowed for this session");
                }
            }
            None => {}
        }

        // Activity extends the session; restart the countdown from the new value
        if ticker.is_some() && !expired {
            session.touch();
            ticker = Some(spawn_ticker(&session, &bus).await?);
        }
    }
}

async fn spawn_ticker(session: &LocalSession, bus: &EventBus) -> anyhow::Result<CountdownTicker> {
    let remaining = session.seconds_remaining().await?;
    Ok(CountdownTicker::spawn(remaining, bus.clone()))
}
