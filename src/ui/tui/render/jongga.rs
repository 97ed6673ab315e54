use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Cell, Paragraph, Row, Table};

use crate::api::Grade;
use crate::format::{PLACEHOLDER, format_grouped, format_price, placeholder};
use crate::ui::AppState;

use super::{panel_title, render_unavailable, tint, titled_block};

fn grade_color(grade: Grade) -> Color {
    match grade {
        Grade::S => Color::Magenta,
        Grade::A => Color::Green,
        Grade::B => Color::Yellow,
        Grade::C => Color::Gray,
        Grade::Unrated => Color::DarkGray,
    }
}

pub(super) fn render_jongga_page(frame: &mut Frame<'_>, area: Rect, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(4)])
        .split(area);

    render_status_line(frame, chunks[0], app);

    let block = titled_block(panel_title("Closing Bet Screener", &app.jongga));
    if render_unavailable(frame, chunks[1], block.clone(), &app.jongga) {
        return;
    }
    let Some(report) = app.jongga.data.as_deref() else {
        return;
    };

    if report.signals.is_empty() {
        frame.render_widget(
            Paragraph::new("No screener picks. Run one with /jongga run <capital>")
                .style(Style::default().fg(Color::Gray))
                .block(block),
            chunks[1],
        );
        return;
    }

    let header = Row::new([
        "Grade", "Ticker", "Name", "Score", "Entry", "Target", "Stop", "Qty", "Amount",
    ])
    .style(
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = report
        .signals
        .iter()
        .enumerate()
        .map(|(idx, pick)| {
            let mut row = Row::new(vec![
                Cell::from(pick.grade.label())
                    .style(tint(app, grade_color(pick.grade)).add_modifier(Modifier::BOLD)),
                Cell::from(pick.ticker.as_str()),
                Cell::from(pick.name.as_str()),
                Cell::from(placeholder(pick.score, |s| format!("{:.0}", s))),
                Cell::from(format_price(pick.entry_price)),
                Cell::from(format_price(pick.target_price)),
                Cell::from(format_price(pick.stop_price)),
                Cell::from(placeholder(pick.quantity, |q| q.to_string())),
                Cell::from(format_price(pick.position_amount)),
            ]);
            if app.selected_row == idx {
                row = row.style(
                    Style::default()
                        .fg(Color::White)
                        .bg(Color::Blue)
                        .add_modifier(Modifier::BOLD),
                );
            }
            row
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(5),
            Constraint::Length(8),
            Constraint::Min(10),
            Constraint::Length(6),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Length(13),
        ],
    )
    .header(header)
    .block(block)
    .column_spacing(1);

    frame.render_widget(table, chunks[1]);
}

fn render_status_line(frame: &mut Frame<'_>, area: Rect, app: &AppState) {
    let mut spans = Vec::new();

    if let Some(report) = app.jongga.data.as_deref() {
        for (grade, count) in report.grade_counts() {
            spans.push(Span::styled(
                format!("{}:{} ", grade.label(), count),
                tint(app, grade_color(grade)),
            ));
        }
        spans.push(Span::raw(format!(
            " {}  capital {} ",
            report.date.as_deref().unwrap_or(PLACEHOLDER),
            placeholder(report.capital, format_grouped),
        )));
    }

    let running = app.jongga_running
        || app
            .jongga_status
            .data
            .as_deref()
            .is_some_and(|status| status.running);
    if running {
        spans.push(Span::styled(
            "● running ",
            tint(app, Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    } else if let Some(status) = app.jongga_status.data.as_deref() {
        spans.push(Span::styled(
            format!(
                "last run {} ",
                status.last_run.as_deref().unwrap_or(PLACEHOLDER)
            ),
            Style::default().fg(Color::Gray),
        ));
        if let Some(message) = &status.message {
            spans.push(Span::styled(message.clone(), Style::default().fg(Color::Gray)));
        }
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).block(titled_block(panel_title("Status", &app.jongga_status))),
        area,
    );
}
