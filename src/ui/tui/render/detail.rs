use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::api::{Recommendation, Signal};
use crate::detail::ReanalysisState;
use crate::format::{
    PLACEHOLDER, SeverityBand, change_color, format_flow, format_percent, format_price,
    placeholder, score_bar,
};
use crate::ui::AppState;

use super::ai::action_color;
use super::chart::render_chart;
use super::layout::centered_rect;
use super::tint;

/// Smallest chart area that counts as a mounted container
const MIN_CHART_HEIGHT: u16 = 3;

pub(super) fn render_detail_overlay(frame: &mut Frame<'_>, app: &mut AppState) {
    let Some(detail) = app.detail.as_ref() else {
        return;
    };

    let popup = centered_rect(90, 85, frame.size());
    frame.render_widget(Clear, popup);

    let signal = detail.signal();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(
            " {} ({}) [Esc]close [r]re-analyze ",
            if signal.name.is_empty() { PLACEHOLDER } else { signal.name.as_str() },
            signal.ticker
        ));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(MIN_CHART_HEIGHT + 2),
            Constraint::Length(6),
        ])
        .split(inner);

    render_summary(frame, sections[0], app, signal);

    let chart_block = Block::default()
        .borders(Borders::ALL)
        .title(" Daily Chart ");
    let chart_inner = chart_block.inner(sections[1]);
    frame.render_widget(chart_block, sections[1]);
    render_chart(frame, chart_inner, app.chart.phase(), app.chart.chart());

    render_recommendations(frame, sections[2], app, signal, detail.reanalysis());

    app.chart_area = (chart_inner.width > 0 && chart_inner.height >= MIN_CHART_HEIGHT)
        .then_some(chart_inner);
}

fn render_summary(frame: &mut Frame<'_>, area: Rect, app: &AppState, signal: &Signal) {
    let foreign = format_flow(signal.foreign_5d);
    let inst = format_flow(signal.inst_5d);
    let score = signal.composite_score();
    let band_color = score
        .map(|s| SeverityBand::from_score(s).color())
        .unwrap_or(Color::Gray);

    let lines = vec![
        Line::from(vec![
            Span::styled(
                format_price(signal.display_price()),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::styled(
                format_percent(signal.return_pct),
                tint(app, change_color(signal.return_pct)),
            ),
            Span::raw(format!(
                "   entry {}   {} · {}",
                format_price(signal.entry_price),
                signal.market.as_deref().unwrap_or(PLACEHOLDER),
                signal.theme.as_deref().unwrap_or(PLACEHOLDER),
            )),
        ]),
        Line::from(vec![
            Span::raw("Score "),
            Span::styled(
                placeholder(score, |s| format!("{:>3.0} {}", s, score_bar(s, 20))),
                tint(app, band_color),
            ),
            Span::raw(format!(
                "   VCP {}  contraction {}",
                placeholder(signal.score, |s| format!("{:.0}", s)),
                placeholder(signal.contraction_ratio, |r| format!("{:.2}", r)),
            )),
        ]),
        Line::from(vec![
            Span::raw("Foreign 5d "),
            Span::styled(foreign.text, tint(app, foreign.direction.color())),
            Span::raw("   Inst 5d "),
            Span::styled(inst.text, tint(app, inst.direction.color())),
        ]),
        Line::from(format!(
            "Stop {}   TP1 {}   TP2 {}",
            format_price(signal.stop_loss),
            format_price(signal.tp1),
            format_price(signal.tp2),
        )),
    ];

    frame.render_widget(Paragraph::new(lines), area);
}

fn render_recommendations(
    frame: &mut Frame<'_>,
    area: Rect,
    app: &AppState,
    signal: &Signal,
    reanalysis: &ReanalysisState,
) {
    let title = match reanalysis {
        ReanalysisState::Idle => " Recommendations ".to_string(),
        ReanalysisState::Running => " Recommendations ⟳ re-analyzing... ".to_string(),
        ReanalysisState::Done => " Recommendations (updated) ".to_string(),
        ReanalysisState::Failed(_) => " Recommendations ".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);

    render_recommendation(frame, columns[0], app, "GPT", signal.gpt_recommendation.as_ref());
    render_recommendation(
        frame,
        columns[1],
        app,
        "Gemini",
        signal.gemini_recommendation.as_ref(),
    );

    if let ReanalysisState::Failed(message) = reanalysis {
        frame.render_widget(
            Paragraph::new(format!("Re-analysis failed: {}", message))
                .style(Style::default().fg(Color::Red)),
            rows[1],
        );
    }
}

fn render_recommendation(
    frame: &mut Frame<'_>,
    area: Rect,
    app: &AppState,
    source: &str,
    recommendation: Option<&Recommendation>,
) {
    let lines = match recommendation {
        Some(rec) => vec![
            Line::from(vec![
                Span::styled(format!("{} ", source), Style::default().fg(Color::Gray)),
                Span::styled(
                    rec.action.clone(),
                    tint(app, action_color(&rec.action)).add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(
                    " {}",
                    placeholder(rec.confidence_pct(), |c| format!("{:.0}%", c))
                )),
            ]),
            Line::from(rec.reason.clone().unwrap_or_default()),
        ],
        None => vec![Line::from(vec![
            Span::styled(format!("{} ", source), Style::default().fg(Color::Gray)),
            Span::raw(PLACEHOLDER),
        ])],
    };

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), area);
}
