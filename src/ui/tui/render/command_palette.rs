use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::ui::ui_manager::RenderState;
use crate::ui::{AppState, InputMode};

fn key_hint(key: &'static str, label: &'static str) -> [Span<'static>; 2] {
    [
        Span::styled(key, Style::default().fg(Color::Cyan)),
        Span::raw(label),
    ]
}

pub(super) fn render_command_palette(
    frame: &mut Frame<'_>,
    area: Rect,
    app: &AppState,
    render_state: &RenderState,
) {
    let title = match app.input_mode {
        InputMode::Normal => " Keys ",
        InputMode::Command => " Command Entry ",
        InputMode::Detail => " Detail ",
    };

    let block = Block::default().title(title).borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.input_mode != InputMode::Command {
        let mut hints: Vec<Span> = match app.input_mode {
            InputMode::Detail => [
                key_hint("r", ": Re-analyze   "),
                key_hint("j/k", ": Scroll log   "),
                key_hint("Esc", ": Close"),
            ]
            .into_iter()
            .flatten()
            .collect(),
            _ => [
                key_hint("Tab/1-5", ": Page   "),
                key_hint("↑/↓", ": Select   "),
                key_hint("Enter", ": Detail   "),
                key_hint("r", ": Refresh   "),
                key_hint("j/k", ": Scroll log   "),
                key_hint("/", ": Commands   "),
                key_hint("q", ": Quit"),
            ]
            .into_iter()
            .flatten()
            .collect(),
        };

        if let Some(msg) = &render_state.notice {
            hints.push(Span::raw("   |   "));
            hints.push(Span::styled(
                msg.clone(),
                Style::default().fg(Color::LightBlue),
            ));
        }

        let paragraph =
            Paragraph::new(Text::from(vec![Line::from(hints)])).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);

    let input_line = Paragraph::new(Line::from(vec![
        Span::styled(">", Style::default().fg(Color::Cyan)),
        Span::raw(" "),
        Span::raw(app.command_buffer.clone()),
    ]));
    frame.render_widget(input_line, layout[0]);

    // ">" plus the trailing space
    let prompt_offset = 2u16;
    let max_cursor_x = layout[0]
        .x
        .saturating_add(layout[0].width.saturating_sub(1));
    let cursor_x = layout[0]
        .x
        .saturating_add(prompt_offset)
        .saturating_add(app.command_buffer.chars().count() as u16)
        .min(max_cursor_x);
    frame.set_cursor(cursor_x, layout[0].y);

    let items: Vec<ListItem> = if app.filtered_commands.is_empty() {
        vec![ListItem::new(Span::styled(
            "No matching commands",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        app.filtered_commands
            .iter()
            .map(|cmd| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        cmd.trigger,
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(" "),
                    Span::styled(cmd.usage, Style::default().fg(Color::Gray)),
                    Span::raw("  "),
                    Span::raw(cmd.description),
                ]))
            })
            .collect()
    };

    let mut state = ListState::default();
    if !app.filtered_commands.is_empty() {
        state.select(Some(
            app.selected_command_index
                .min(app.filtered_commands.len() - 1),
        ));
    }

    let list = List::new(items)
        .highlight_style(
            Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    frame.render_stateful_widget(list, layout[1], &mut state);
}
