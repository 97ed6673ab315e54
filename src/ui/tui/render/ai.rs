use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Cell, Paragraph, Row, Table, Wrap};

use crate::api::Recommendation;
use crate::format::{PLACEHOLDER, format_price, placeholder};
use crate::ui::AppState;

use super::{panel_title, render_unavailable, tint, titled_block};

pub(super) fn render_ai_page(frame: &mut Frame<'_>, area: Rect, app: &AppState) {
    let block = titled_block(panel_title("AI Analysis", &app.ai_analysis));
    if render_unavailable(frame, area, block.clone(), &app.ai_analysis) {
        return;
    }
    let Some(analysis) = app.ai_analysis.data.as_deref() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(4)])
        .split(area);

    let sentiment = analysis.sentiment.as_deref().unwrap_or(PLACEHOLDER);
    let sentiment_color = match sentiment.to_ascii_lowercase().as_str() {
        "bullish" | "positive" => Color::Green,
        "bearish" | "negative" => Color::Red,
        _ => Color::Yellow,
    };

    let mut lines = vec![Line::from(vec![
        Span::raw("Sentiment: "),
        Span::styled(
            sentiment.to_string(),
            tint(app, sentiment_color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(
                "   {}",
                analysis
                    .signal_date
                    .as_deref()
                    .or(analysis.generated_at.as_deref())
                    .unwrap_or_default()
            ),
            Style::default().fg(Color::Gray),
        ),
    ])];
    for text in [&analysis.market_summary, &analysis.commentary].into_iter().flatten() {
        lines.push(Line::from(text.clone()));
    }

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        chunks[0],
    );

    let header = Row::new(["#", "Ticker", "Name", "Price", "GPT", "Gemini"]).style(
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = analysis
        .signals
        .iter()
        .enumerate()
        .map(|(idx, pick)| {
            let mut row = Row::new(vec![
                Cell::from((idx + 1).to_string()),
                Cell::from(pick.ticker.as_str()),
                Cell::from(pick.name.as_str()),
                Cell::from(format_price(pick.display_price())),
                recommendation_cell(app, pick.gpt_recommendation.as_ref()),
                recommendation_cell(app, pick.gemini_recommendation.as_ref()),
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
            Constraint::Length(3),
            Constraint::Length(8),
            Constraint::Min(10),
            Constraint::Length(11),
            Constraint::Length(12),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(titled_block(format!(" Picks [{}] ", analysis.signals.len())))
    .column_spacing(1);

    frame.render_widget(table, chunks[1]);
}

pub(super) fn action_color(action: &str) -> Color {
    match action.to_ascii_uppercase().as_str() {
        "BUY" | "STRONG_BUY" => Color::Green,
        "SELL" | "STRONG_SELL" => Color::Red,
        _ => Color::Yellow,
    }
}

fn recommendation_cell<'a>(app: &AppState, recommendation: Option<&Recommendation>) -> Cell<'a> {
    match recommendation {
        Some(rec) => Cell::from(format!(
            "{} {}",
            rec.action,
            placeholder(rec.confidence_pct(), |c| format!("{:.0}%", c))
        ))
        .style(tint(app, action_color(&rec.action))),
        None => Cell::from(PLACEHOLDER),
    }
}
