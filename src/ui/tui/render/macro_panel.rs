use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap};

use crate::api::MacroIndicators;
use crate::format::{
    PLACEHOLDER, SeverityBand, abbreviate, change_color, format_grouped, format_percent,
    placeholder, score_bar,
};
use crate::ui::AppState;

use super::{panel_title, render_unavailable, tint, titled_block};

pub(super) fn render_macro_page(frame: &mut Frame<'_>, area: Rect, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(4)])
        .split(area);

    render_indicators(frame, chunks[0], app);
    render_sectors(frame, chunks[1], app);
}

fn render_indicators(frame: &mut Frame<'_>, area: Rect, app: &AppState) {
    let block = titled_block(panel_title("Macro Indicators", &app.macro_indicators));
    if render_unavailable(frame, area, block.clone(), &app.macro_indicators) {
        return;
    }
    let Some(indicators) = app.macro_indicators.data.as_deref() else {
        return;
    };

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(inner);

    render_card(frame, cards[0], "USD/KRW", exchange_lines(app, indicators));
    render_card(frame, cards[1], "Rate Spread", spread_lines(app, indicators));
    render_card(frame, cards[2], "FX Reserves", reserve_lines(app, indicators));
    render_card(frame, cards[3], "Crisis", crisis_lines(app, indicators));
}

fn render_card(frame: &mut Frame<'_>, area: Rect, title: &str, lines: Vec<Line<'static>>) {
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL);
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

fn risk_span(app: &AppState, level: Option<&str>) -> Span<'static> {
    match level {
        Some(level) => {
            let color = SeverityBand::from_risk_level(level)
                .map(SeverityBand::risk_color)
                .unwrap_or(Color::Gray);
            Span::styled(level.to_string(), tint(app, color))
        }
        None => Span::raw(PLACEHOLDER),
    }
}

fn error_line(error: &str) -> Line<'static> {
    Line::from(Span::styled(
        error.to_string(),
        Style::default().fg(Color::DarkGray),
    ))
}

fn exchange_lines(app: &AppState, indicators: &MacroIndicators) -> Vec<Line<'static>> {
    let Some(fx) = indicators.exchange_rate.as_ref() else {
        return vec![Line::from(PLACEHOLDER)];
    };
    if let Some(error) = &fx.error {
        return vec![error_line(error)];
    }
    vec![
        Line::from(placeholder(fx.rate, |r| format!("{:.2}", r))),
        Line::from(Span::styled(
            format_percent(fx.change_pct),
            tint(app, change_color(fx.change_pct)),
        )),
        Line::from(risk_span(app, fx.risk_level.as_deref())),
    ]
}

fn spread_lines(app: &AppState, indicators: &MacroIndicators) -> Vec<Line<'static>> {
    let Some(spread) = indicators.interest_spread.as_ref() else {
        return vec![Line::from(PLACEHOLDER)];
    };
    if let Some(error) = &spread.error {
        return vec![error_line(error)];
    }
    vec![
        Line::from(format!(
            "US {} / KR {}",
            placeholder(spread.us_rate, |r| format!("{:.2}%", r)),
            placeholder(spread.kr_rate, |r| format!("{:.2}%", r)),
        )),
        Line::from(placeholder(spread.spread_bp, |bp| format!("{:+.0}bp", bp))),
        Line::from(risk_span(app, spread.capital_risk.as_deref())),
    ]
}

fn reserve_lines(app: &AppState, indicators: &MacroIndicators) -> Vec<Line<'static>> {
    let Some(reserves) = indicators.fx_reserves.as_ref() else {
        return vec![Line::from(PLACEHOLDER)];
    };
    if let Some(error) = &reserves.error {
        return vec![error_line(error)];
    }
    let unit = reserves.unit.clone().unwrap_or_default();
    vec![
        Line::from(format!(
            "{} {}",
            placeholder(reserves.current_reserves, format_grouped),
            unit
        )),
        Line::from(Span::styled(
            format_percent(reserves.change_pct),
            tint(app, change_color(reserves.change_pct)),
        )),
        Line::from(risk_span(app, reserves.risk_level.as_deref())),
    ]
}

fn crisis_lines(app: &AppState, indicators: &MacroIndicators) -> Vec<Line<'static>> {
    let Some(crisis) = indicators.crisis.as_ref() else {
        return vec![Line::from(PLACEHOLDER)];
    };
    let band_color = crisis
        .crisis_score
        .map(|score| SeverityBand::from_score(score).risk_color())
        .unwrap_or(Color::Gray);

    vec![
        Line::from(vec![
            Span::styled(
                placeholder(crisis.crisis_score, |s| format!("{:.0}", s)),
                tint(app, band_color).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::styled(
                crisis.crisis_score.map(|s| score_bar(s, 10)).unwrap_or_default(),
                tint(app, band_color),
            ),
        ]),
        Line::from(risk_span(app, crisis.crisis_level.as_deref())),
        Line::from(crisis.message.clone().unwrap_or_default()),
    ]
}

fn render_sectors(frame: &mut Frame<'_>, area: Rect, app: &AppState) {
    let block = titled_block(panel_title("Sector Performance", &app.sectors));
    if render_unavailable(frame, area, block.clone(), &app.sectors) {
        return;
    }

    let sectors = app
        .sectors
        .data
        .as_deref()
        .map(|s| s.sectors.as_slice())
        .unwrap_or(&[]);

    let header = Row::new(["Sector", "Change", "Volume"]).style(
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = sectors
        .iter()
        .enumerate()
        .map(|(idx, sector)| {
            let mut row = Row::new(vec![
                Cell::from(sector.name.clone()),
                Cell::from(format_percent(sector.change_pct))
                    .style(tint(app, change_color(sector.change_pct))),
                Cell::from(placeholder(sector.volume, abbreviate)),
            ]);
            if app.selected_row == idx {
                row = row.style(Style::default().add_modifier(Modifier::REVERSED));
            }
            row
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(16),
            Constraint::Length(10),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(block)
    .column_spacing(1);

    frame.render_widget(table, area);
}
