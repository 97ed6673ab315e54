use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, Borders, List, ListItem};

use crate::ui::AppState;
use crate::ui::ui_manager::RenderState;

fn line_style(line: &str) -> Style {
    if line.contains("Error") || line.contains("failed") {
        Style::default().fg(Color::Red)
    } else if line.contains("[help]") {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

pub(super) fn render_logs(
    frame: &mut Frame<'_>,
    area: Rect,
    app: &AppState,
    render_state: &RenderState,
) {
    let total = app.log_messages.len();
    let offset = app.log_scroll_offset.min(total.saturating_sub(1));

    let title = if offset > 0 {
        format!(" Activity (older +{offset}) ")
    } else {
        " Activity ".to_string()
    };
    let block = Block::default().title(title).borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 {
        return;
    }

    let mut rows_remaining = inner.height as usize;
    let mut items: Vec<ListItem> = Vec::new();

    // The latest status message is pinned while following the tail
    if offset == 0 {
        let pinned = render_state
            .error_message
            .as_ref()
            .map(|e| (e, Color::Red))
            .or_else(|| render_state.info_message.as_ref().map(|i| (i, Color::LightBlue)));
        if let Some((message, color)) = pinned {
            items.push(ListItem::new(Span::styled(
                message.clone(),
                Style::default().fg(color),
            )));
            rows_remaining = rows_remaining.saturating_sub(1);
        }
    }

    if rows_remaining > 0 && total > 0 {
        let end = total.saturating_sub(offset);
        let start = end.saturating_sub(rows_remaining);
        items.extend(
            app.log_messages
                .range(start..end)
                .map(|line| ListItem::new(Span::styled(line.clone(), line_style(line)))),
        );
    }

    if items.is_empty() {
        items.push(ListItem::new(Span::styled(
            "No activity yet",
            Style::default().fg(Color::Gray),
        )));
    }

    frame.render_widget(List::new(items), inner);
}
