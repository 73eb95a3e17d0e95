//! Rendering. Everything here reads state; nothing mutates it.

pub mod theme;

use std::path::Path;

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

use ajshell_core::bootstrap::BootstrapState;
use ajshell_core::catalog::join_url;
use ajshell_core::i18n::Translate;
use ajshell_core::model::SidebarItem;
use ajshell_core::palette::PaletteController;
use ajshell_core::state::AppState;

use theme::styles;

const SIDEBAR_WIDTH: u16 = 28;
/// Content width outside widescreen mode
const NARROW_CONTENT: u16 = 100;

/// UI-loop state the renderer needs besides `AppState`
pub struct Chrome<'a> {
    pub palette: Option<&'a PaletteController>,
    /// Index into the catalog of the highlighted sidebar link
    pub sidebar_cursor: usize,
    pub notice: Option<&'a str>,
    pub log_path: &'a Path,
}

pub fn draw(f: &mut Frame, state: &AppState, chrome: &Chrome) {
    let area = f.area();
    match &state.bootstrap {
        BootstrapState::FatalError { diagnostic } => {
            draw_fatal(f, area, diagnostic, chrome.log_path)
        }
        BootstrapState::Loading | BootstrapState::PluginRecovered { .. } => {
            draw_loading(f, area, state)
        }
        BootstrapState::Ready => {
            draw_shell(f, area, state, chrome);
            if state.session_expired {
                draw_expired(f, area);
            } else if let Some(palette) = chrome.palette.filter(|p| p.is_open()) {
                draw_palette(f, area, palette);
            } else if !state.plugin_warnings.is_empty() {
                draw_plugin_warning(f, area, state);
            }
        }
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_loading(f: &mut Frame, area: Rect, state: &AppState) {
    let step = state
        .current_step
        .map(|s| s.label())
        .unwrap_or("Starting");
    let mut lines = vec![
        Line::from(Span::styled("ajshell", styles::accent_bold())),
        Line::from(""),
        Line::from(Span::styled(format!("{step}..."), styles::text())),
    ];
    if !state.plugin_warnings.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("{} plugin(s) skipped", state.plugin_warnings.len()),
            styles::warn(),
        )));
    }
    let rect = centered(area, 40, lines.len() as u16 + 2);
    f.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(styles::border_subtle()),
        ),
        rect,
    );
}

fn draw_fatal(f: &mut Frame, area: Rect, diagnostic: &str, log_path: &Path) {
    let lines = vec![
        Line::from(Span::styled("The shell failed to start", styles::error())),
        Line::from(""),
        Line::from(Span::styled(diagnostic.to_string(), styles::text())),
        Line::from(""),
        Line::from(Span::styled(
            format!("Details: {}", log_path.display()),
            styles::text_dim(),
        )),
        Line::from(Span::styled("Restart ajshell to retry. q to quit", styles::key_hint())),
    ];
    let rect = centered(area, 72, 10);
    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: true }).block(
            Block::default()
                .title(" Error ")
                .borders(Borders::ALL)
                .border_style(styles::error()),
        ),
        rect,
    );
}

fn draw_shell(f: &mut Frame, area: Rect, state: &AppState, chrome: &Chrome) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    draw_header(f, outer[0], state);

    let layout = state.layout;
    let sidebar_width = if layout.primary_sidebar_visible {
        SIDEBAR_WIDTH.min(outer[1].width / 2)
    } else {
        0
    };
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(sidebar_width), Constraint::Min(1)])
        .split(outer[1]);

    if sidebar_width > 0 {
        draw_sidebar(f, body[0], state, chrome.sidebar_cursor);
    }

    let content = if layout.widescreen || body[1].width <= NARROW_CONTENT {
        body[1]
    } else {
        Rect {
            width: NARROW_CONTENT,
            ..body[1]
        }
    };
    draw_content(f, content, state);

    if layout.overlay_sidebar_visible {
        let overlay = Rect {
            width: SIDEBAR_WIDTH.min(outer[1].width),
            ..outer[1]
        };
        f.render_widget(Clear, overlay);
        draw_sidebar(f, overlay, state, chrome.sidebar_cursor);
    }

    draw_footer(f, outer[2], chrome.notice);
}

fn draw_header(f: &mut Frame, area: Rect, state: &AppState) {
    let Some(session) = &state.session else {
        return;
    };
    let identity = &session.identity.identity;
    let user = identity.user.as_deref().unwrap_or("?");
    let mut spans = vec![
        Span::styled(format!(" {} ", session.identity.machine.name), styles::accent_bold()),
        Span::styled(format!(" {user}"), styles::text()),
    ];
    if identity.is_superuser() {
        spans.push(Span::styled(" (root)", styles::warn()));
    } else if identity.can_elevate() {
        spans.push(Span::styled("  e: elevate", styles::key_hint()));
    }
    if let Some(countdown) = state.countdown() {
        spans.push(Span::styled(
            format!("  session ends in {}", countdown.label()),
            styles::warn(),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// One visible sidebar line: a category header or a link
struct SidebarRow {
    label: String,
    depth: usize,
    url: Option<String>,
}

/// Rows in the same depth-first order the catalog was flattened in, so the
/// n-th link row is the n-th catalog entry.
fn sidebar_rows(
    items: &[SidebarItem],
    translator: &dyn Translate,
    depth: usize,
    out: &mut Vec<SidebarRow>,
) {
    for item in items {
        out.push(SidebarRow {
            label: translator.translate(&item.name),
            depth,
            url: item.url.clone(),
        });
        sidebar_rows(&item.children, translator, depth + 1, out);
    }
}

fn draw_sidebar(f: &mut Frame, area: Rect, state: &AppState, cursor: usize) {
    let Some(session) = &state.session else {
        return;
    };
    let mut rows = Vec::new();
    sidebar_rows(&session.sidebar, session.translator.as_ref(), 0, &mut rows);

    let mut items = Vec::new();
    let mut selected = None;
    let mut link_index = 0usize;
    for row in rows {
        let indent = "  ".repeat(row.depth);
        let Some(url) = &row.url else {
            items.push(ListItem::new(Line::from(Span::styled(
                format!("{indent}{}", row.label),
                styles::text_muted(),
            ))));
            continue;
        };
        if link_index == cursor {
            selected = Some(items.len());
        }
        let href = join_url(&session.catalog.url_prefix, url);
        let style = if state.current_url.as_deref() == Some(href.as_str()) {
            styles::accent()
        } else {
            styles::text()
        };
        items.push(ListItem::new(Line::from(Span::styled(
            format!("{indent}{}", row.label),
            style,
        ))));
        link_index += 1;
    }

    let mut list_state = ListState::default();
    list_state.select(selected);
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::RIGHT)
                .border_style(styles::border_subtle()),
        )
        .highlight_style(styles::selection());
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_content(f: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_subtle());
    let lines = match state.current_route() {
        Some(route) => vec![
            Line::from(Span::styled(route.title.clone(), styles::title())),
            Line::from(""),
            Line::from(Span::styled(
                format!("provided by {}", route.plugin_id),
                styles::text_dim(),
            )),
            Line::from(Span::styled(
                state.current_url.clone().unwrap_or_default(),
                styles::text_muted(),
            )),
        ],
        None => vec![Line::from(Span::styled(
            "Nothing here yet. Ctrl+P to search",
            styles::text_dim(),
        ))],
    };
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_footer(f: &mut Frame, area: Rect, notice: Option<&str>) {
    let line = match notice {
        Some(notice) => Line::from(Span::styled(format!(" {notice}"), styles::warn())),
        None => {
            let mut spans = Vec::new();
            for (key, label) in [
                ("^P", "search"),
                ("b", "sidebar"),
                ("o", "overlay"),
                ("w", "wide"),
                ("L", "logout"),
                ("q", "quit"),
            ] {
                spans.push(Span::styled(format!(" {key}"), styles::key_hint()));
                spans.push(Span::styled(format!(" {label} "), styles::text_dim()));
            }
            Line::from(spans)
        }
    };
    f.render_widget(Paragraph::new(line), area);
}

fn draw_palette(f: &mut Frame, area: Rect, palette: &PaletteController) {
    let results = palette.results();
    let height = (results.len() as u16 + 4).clamp(6, area.height.saturating_sub(4).max(6));
    let width = ((u32::from(area.width) * 60 / 100) as u16).clamp(30, 70);
    let mut rect = centered(area, width, height);
    rect.y = (area.y + area.height / 6).min(area.bottom().saturating_sub(rect.height));
    f.render_widget(Clear, rect);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_focused())
        .title(" Search ");
    let inner = block.inner(rect);
    f.render_widget(block, rect);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);

    let input = Line::from(vec![
        Span::styled("> ", styles::accent()),
        Span::styled(palette.query().to_string(), styles::text()),
    ]);
    f.render_widget(Paragraph::new(input), parts[0]);
    f.set_cursor_position((
        parts[0].x + 2 + palette.query().chars().count() as u16,
        parts[0].y,
    ));

    if results.is_empty() {
        f.render_widget(
            Paragraph::new(Span::styled("No matches", styles::text_muted())),
            parts[1],
        );
        return;
    }
    let items: Vec<ListItem> = results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let shortcut = if i < 9 {
                format!("{} ", i + 1)
            } else {
                "  ".to_string()
            };
            ListItem::new(Line::from(vec![
                Span::styled(shortcut, styles::key_hint()),
                Span::styled(r.title.clone(), styles::text()),
                Span::styled(format!("  {}", r.url), styles::text_muted()),
            ]))
        })
        .collect();
    let mut list_state = ListState::default();
    list_state.select(palette.selection());
    f.render_stateful_widget(
        List::new(items).highlight_style(styles::selection()),
        parts[1],
        &mut list_state,
    );
}

fn draw_plugin_warning(f: &mut Frame, area: Rect, state: &AppState) {
    let Some(warning) = state.plugin_warnings.first() else {
        return;
    };
    let lines = vec![
        Line::from(Span::styled(
            format!("Plugin '{}' could not be loaded", warning.plugin),
            styles::warn(),
        )),
        Line::from(Span::styled(warning.reason.clone(), styles::text())),
        Line::from(""),
        Line::from(Span::styled("Enter/Esc to dismiss", styles::key_hint())),
    ];
    let rect = centered(area, 60, 6);
    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: true }).block(
            Block::default()
                .title(" Warning ")
                .borders(Borders::ALL)
                .border_style(styles::warn()),
        ),
        rect,
    );
}

fn draw_expired(f: &mut Frame, area: Rect) {
    let rect = centered(area, 44, 4);
    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(vec![
            Line::from(Span::styled("Session expired", styles::error())),
            Line::from(Span::styled("press any key to exit", styles::key_hint())),
        ])
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(styles::error())),
        rect,
    );
}
