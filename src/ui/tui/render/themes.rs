use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{List, ListItem, ListState};

use crate::format::PLACEHOLDER;
use crate::ui::AppState;

use super::{panel_title, render_unavailable, tint, titled_block};

pub(super) fn render_themes_page(frame: &mut Frame<'_>, area: Rect, app: &AppState) {
    let block = titled_block(panel_title("Themes", &app.themes));
    if render_unavailable(frame, area, block.clone(), &app.themes) {
        return;
    }

    let themes = app
        .themes
        .data
        .as_deref()
        .map(|t| t.themes.as_slice())
        .unwrap_or(&[]);

    if themes.is_empty() {
        frame.render_widget(
            ratatui::widgets::Paragraph::new("No theme analysis yet")
                .style(Style::default().fg(Color::Gray))
                .block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = themes
        .iter()
        .map(|theme| {
            let outlook = theme.outlook.as_deref().unwrap_or(PLACEHOLDER);
            let outlook_color = match outlook.to_ascii_lowercase().as_str() {
                "positive" | "bullish" | "strong" => Color::Green,
                "negative" | "bearish" | "weak" => Color::Red,
                _ => Color::Yellow,
            };

            let mut lines = vec![Line::from(vec![
                Span::styled(
                    theme.name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::styled(outlook.to_string(), tint(app, outlook_color)),
            ])];
            if let Some(analysis) = &theme.analysis {
                lines.push(Line::from(Span::styled(
                    format!("  {}", analysis),
                    Style::default().fg(Color::Gray),
                )));
            }
            if !theme.key_stocks.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("  Key: {}", theme.key_stocks.join(", ")),
                    Style::default().fg(Color::Cyan),
                )));
            }
            ListItem::new(lines)
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(app.selected_row.min(themes.len() - 1)));

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("▶ ");

    frame.render_stateful_widget(list, area, &mut state);
}
