use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::api::MarketGate;
use crate::format::{change_color, format_percent};
use crate::ui::{AppState, Page};

use super::tint;

pub(super) fn render_header(frame: &mut Frame<'_>, area: Rect, app: &AppState) {
    let mut spans = vec![
        Span::styled(
            " KRDash ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
    ];

    for (idx, page) in Page::ALL.iter().enumerate() {
        let label = format!("{}:{} ", idx + 1, page.title());
        if *page == app.page {
            spans.push(Span::styled(
                label,
                Style::default()
                    .fg(Color::White)
                    .bg(Color::Blue)
                    .add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::styled(label, Style::default().fg(Color::Gray)));
        }
    }

    spans.push(Span::raw("  "));
    spans.push(match app.market_status.data.as_deref() {
        Some(status) if status.is_open => Span::styled("● Open ", tint(app, Color::Green)),
        Some(_) => Span::styled("● Closed ", tint(app, Color::Yellow)),
        None if app.market_status.error.is_some() => {
            Span::styled("● Offline ", tint(app, Color::Red))
        }
        None => Span::styled("● ... ", Style::default().fg(Color::Gray)),
    });

    if let Some(gate) = app.market_gate.data.as_deref() {
        spans.extend(gate_spans(app, gate));
    }

    let block = Block::default().borders(Borders::ALL).title(" Market ");
    let paragraph = Paragraph::new(Line::from(spans))
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn gate_spans(app: &AppState, gate: &MarketGate) -> Vec<Span<'static>> {
    let gate_color = match gate.status.to_ascii_uppercase().as_str() {
        "GREEN" => Color::Green,
        "YELLOW" => Color::Yellow,
        "RED" => Color::Red,
        _ => Color::Gray,
    };

    let mut spans = vec![Span::styled(
        format!("Gate {} ", gate.status),
        tint(app, gate_color).add_modifier(Modifier::BOLD),
    )];

    for (label, index) in [("KOSPI", gate.kospi.as_ref()), ("KOSDAQ", gate.kosdaq.as_ref())] {
        let change = MarketGate::index_change(index);
        spans.push(Span::raw(format!("{} ", label)));
        spans.push(Span::styled(
            format!("{} ", format_percent(change)),
            tint(app, change_color(change)),
        ));
    }

    if let Some(rate) = gate.usd_krw {
        spans.push(Span::styled(
            format!("USD/KRW {:.1}", rate),
            Style::default().fg(Color::Gray),
        ));
    }

    spans
}
