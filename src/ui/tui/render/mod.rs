mod ai;
mod chart;
mod command_palette;
mod detail;
mod header;
mod jongga;
mod layout;
mod logs;
mod macro_panel;
mod signals;
mod themes;

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::cache::Snapshot;
use crate::ui::ui_manager::RenderState;
use crate::ui::{AppState, Page};

use self::ai::render_ai_page;
use self::command_palette::render_command_palette;
use self::detail::render_detail_overlay;
use self::header::render_header;
use self::jongga::render_jongga_page;
use self::logs::render_logs;
use self::macro_panel::render_macro_page;
use self::signals::render_signals_page;
use self::themes::render_themes_page;

pub(crate) fn render_root(frame: &mut Frame<'_>, app: &mut AppState, render_state: &RenderState) {
    // Re-measured every frame; stays `None` unless the overlay draws a chart
    app.chart_area = None;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(8),
            Constraint::Length(6),
        ])
        .split(frame.size());

    render_header(frame, chunks[0], app);

    match app.page {
        Page::Signals => render_signals_page(frame, chunks[1], app),
        Page::Macro => render_macro_page(frame, chunks[1], app),
        Page::Ai => render_ai_page(frame, chunks[1], app),
        Page::Themes => render_themes_page(frame, chunks[1], app),
        Page::Jongga => render_jongga_page(frame, chunks[1], app),
    }

    render_logs(frame, chunks[2], app, render_state);
    render_command_palette(frame, chunks[3], app, render_state);

    if app.detail.is_some() {
        render_detail_overlay(frame, app);
    }
}

/// Panel title with the resource's freshness appended
fn panel_title<T>(title: &str, snapshot: &Snapshot<T>) -> String {
    let mut text = format!(" {} ", title);
    if snapshot.is_loading() {
        text.push_str("⟳ ");
    }
    if snapshot.data.is_some() && snapshot.error.is_some() {
        text.push_str("(stale) ");
    } else if let Some(updated) = snapshot.updated_at {
        text.push_str(&format!("· {} ", updated.format("%H:%M:%S")));
    }
    text
}

/// Draws the loading or error state when a resource has no data yet.
///
/// Returns `true` when it drew something and the caller should stop.
fn render_unavailable<T>(frame: &mut Frame<'_>, area: Rect, block: Block<'_>, snapshot: &Snapshot<T>) -> bool {
    if snapshot.data.is_some() {
        return false;
    }

    let lines = match &snapshot.error {
        Some(error) => vec![
            Line::from(Span::styled(
                "Failed to load data",
                Style::default().fg(Color::Red),
            )),
            Line::from(Span::styled(
                error.to_string(),
                Style::default().fg(Color::Gray),
            )),
            Line::from(""),
            Line::from(vec![
                Span::raw("Press "),
                Span::styled("r", Style::default().fg(Color::Cyan)),
                Span::raw(" to retry"),
            ]),
        ],
        None => vec![Line::from(Span::styled(
            "Loading...",
            Style::default().fg(Color::Gray),
        ))],
    };

    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        area,
    );
    true
}

fn titled_block(title: String) -> Block<'static> {
    Block::default().title(title).borders(Borders::ALL)
}

/// Foreground color, or the terminal default when colors are disabled
fn tint(app: &AppState, color: Color) -> Style {
    if app.enable_colors {
        Style::default().fg(color)
    } else {
        Style::default()
    }
}
