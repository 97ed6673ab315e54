use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Cell, Paragraph, Row, Table};

use crate::api::Signal;
use crate::format::{
    PLACEHOLDER, SeverityBand, change_color, format_flow, format_percent, format_price, placeholder,
};
use crate::ui::AppState;

use super::{panel_title, render_unavailable, tint, titled_block};

pub(super) fn render_signals_page(frame: &mut Frame<'_>, area: Rect, app: &AppState) {
    let mut title = panel_title("Signals", &app.signals);
    if let Some(response) = app.signals.data.as_deref() {
        title.push_str(&format!("[{}] ", response.count.max(response.signals.len())));
    }
    let block = titled_block(title);

    if render_unavailable(frame, area, block.clone(), &app.signals) {
        return;
    }

    let signals = app.sorted_signals();
    if signals.is_empty() {
        let message = app
            .signals
            .data
            .as_deref()
            .and_then(|r| r.message.clone())
            .unwrap_or_else(|| "No signals".to_string());
        frame.render_widget(
            Paragraph::new(message)
                .style(Style::default().fg(Color::Gray))
                .alignment(Alignment::Center)
                .block(block),
            area,
        );
        return;
    }

    let widths = [
        Constraint::Length(3),
        Constraint::Length(8),
        Constraint::Min(10),
        Constraint::Length(11),
        Constraint::Length(9),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(6),
        Constraint::Length(6),
    ];

    let header = Row::new(["#", "Ticker", "Name", "Price", "Return", "Foreign", "Inst", "Score", "AI"])
        .style(
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::BOLD),
        );

    let rows: Vec<Row> = signals
        .iter()
        .enumerate()
        .map(|(idx, signal)| {
            let mut row = signal_row(app, idx, signal);
            if app.selected_row == idx {
                row = row.style(
                    Style::default()
                        .fg(Color::White)
                        .bg(Color::DarkGray)
                        .add_modifier(Modifier::BOLD),
                );
            }
            row
        })
        .collect();

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .column_spacing(1);

    frame.render_widget(table, area);
}

fn signal_row<'a>(app: &AppState, idx: usize, signal: &'a Signal) -> Row<'a> {
    let foreign = format_flow(signal.foreign_5d);
    let inst = format_flow(signal.inst_5d);
    let score = signal.composite_score();
    let score_style = match score {
        Some(score) => tint(app, SeverityBand::from_score(score).color()),
        None => Style::default(),
    };
    let action = signal
        .gpt_recommendation
        .as_ref()
        .map(|r| r.action.as_str())
        .unwrap_or(PLACEHOLDER);

    Row::new(vec![
        Cell::from((idx + 1).to_string()),
        Cell::from(signal.ticker.as_str()),
        Cell::from(signal.name.as_str()),
        Cell::from(format_price(signal.display_price())),
        Cell::from(format_percent(signal.return_pct)).style(tint(app, change_color(signal.return_pct))),
        Cell::from(foreign.text).style(tint(app, foreign.direction.color())),
        Cell::from(inst.text).style(tint(app, inst.direction.color())),
        Cell::from(placeholder(score, |s| format!("{:.0}", s))).style(score_style),
        Cell::from(action),
    ])
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::test_support::{bare, buffer_lines, terminal};
    use super::*;
    use crate::api::SignalsResponse;
    use crate::config::Config;

    fn draw(app: &AppState) -> Vec<String> {
        let mut terminal = terminal(100, 12);
        terminal
            .draw(|frame| render_signals_page(frame, frame.size(), app))
            .unwrap();
        buffer_lines(terminal.backend().buffer())
    }

    #[test]
    fn test_empty_list_shows_message_and_no_rows() {
        let mut app = AppState::new(&Config::default());
        app.signals.data = Some(Arc::new(
            serde_json::from_value::<SignalsResponse>(serde_json::json!({"signals": [], "count": 0}))
                .unwrap(),
        ));

        let lines = draw(&app);
        assert!(lines.iter().any(|l| l.contains("No signals")));
        assert!(!lines.iter().any(|l| l.contains("Ticker")));
        assert_eq!(app.row_count(), 0);
    }

    #[test]
    fn test_missing_fields_render_placeholder() {
        let mut app = AppState::new(&Config::default());
        app.signals.data = Some(Arc::new(SignalsResponse {
            signals: vec![bare("005930", "Samsung")],
            count: 1,
            ..Default::default()
        }));

        let lines = draw(&app);
        let row = lines
            .iter()
            .find(|l| l.contains("005930"))
            .expect("signal row drawn");
        assert!(row.contains("Samsung"));
        assert!(row.contains(PLACEHOLDER));
        assert!(!lines.iter().any(|l| l.contains("NaN")));
    }
}
