use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::Paragraph;

use crate::chart::{Candle, ChartFault, ChartPhase, TerminalChart};
use crate::format::format_grouped;

/// Draws the chart area for the current controller phase
pub(super) fn render_chart(
    frame: &mut Frame<'_>,
    area: Rect,
    phase: &ChartPhase,
    chart: Option<&TerminalChart>,
) {
    match phase {
        ChartPhase::Closed | ChartPhase::AwaitingContainer | ChartPhase::Initializing => {
            render_chart_placeholder(frame, area, "Preparing chart...", Color::Gray);
        }
        ChartPhase::Loading => {
            render_chart_placeholder(frame, area, "Loading price history...", Color::Gray);
        }
        ChartPhase::Ready => {
            if let Some(chart) = chart {
                render_candles(frame, area, chart);
            }
        }
        ChartPhase::Error(ChartFault::Construction(message)) => {
            render_chart_placeholder(
                frame,
                area,
                &format!("Chart unavailable: {} (close and reopen)", message),
                Color::Red,
            );
        }
        ChartPhase::Error(ChartFault::Data(message)) => {
            // The instance stays up; show whatever it holds above the error
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(1), Constraint::Length(1)])
                .split(area);
            match chart {
                Some(chart) if !chart.candles().is_empty() => render_candles(frame, rows[0], chart),
                _ => render_chart_placeholder(frame, rows[0], "", Color::Gray),
            }
            frame.render_widget(
                Paragraph::new(message.as_str())
                    .style(Style::default().fg(Color::Red))
                    .alignment(Alignment::Center),
                rows[1],
            );
        }
    }
}

fn render_candles(frame: &mut Frame<'_>, area: Rect, chart: &TerminalChart) {
    if area.width < 12 || area.height < 4 {
        render_chart_placeholder(frame, area, "Chart area too small", Color::Gray);
        return;
    }

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(9), Constraint::Min(2)])
        .split(area);
    let price_axis_area = horizontal[0];
    let right_area = horizontal[1];

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(2), Constraint::Length(1)])
        .split(right_area);
    let chart_area = vertical[0];
    let time_axis_area = vertical[1];

    if chart_area.width < 4 || chart_area.height < 3 {
        render_chart_placeholder(frame, area, "Chart area too small", Color::Gray);
        return;
    }

    let Some(view) = chart.view(chart_area.width) else {
        render_chart_placeholder(frame, area, "No price history", Color::Gray);
        return;
    };

    let mut min_price = view.min_price;
    let mut max_price = view.max_price;
    if (max_price - min_price).abs() < f64::EPSILON {
        max_price = min_price + 1.0;
    } else {
        let padding = (max_price - min_price) * 0.05;
        min_price -= padding;
        max_price += padding;
    }

    draw_candlesticks(frame, chart_area, &view.samples, min_price, max_price);

    // Price axis labels (max, mid, min)
    {
        let buffer = frame.buffer_mut();
        let label_style = Style::default().fg(Color::Gray);
        let width = price_axis_area.width;

        buffer.set_string(
            price_axis_area.x,
            price_axis_area.y,
            price_label(max_price, width),
            label_style,
        );

        if price_axis_area.height > 2 {
            let mid_y = price_axis_area.y + price_axis_area.height / 2;
            buffer.set_string(
                price_axis_area.x,
                mid_y,
                price_label((min_price + max_price) / 2.0, width),
                label_style,
            );
        }

        let bottom_y = price_axis_area.y + price_axis_area.height.saturating_sub(1);
        buffer.set_string(
            price_axis_area.x,
            bottom_y,
            price_label(min_price, width),
            label_style,
        );
    }

    let candles = chart.candles();
    let time_text = match (candles.first(), candles.last()) {
        (Some(first), Some(last)) => format!(
            "{} → {} ({} days)",
            first.date.format("%Y-%m-%d"),
            last.date.format("%Y-%m-%d"),
            candles.len()
        ),
        _ => "Price history unavailable".to_string(),
    };

    frame.render_widget(
        Paragraph::new(time_text).alignment(Alignment::Center),
        time_axis_area,
    );
}

fn draw_candlesticks(
    frame: &mut Frame<'_>,
    area: Rect,
    samples: &[Candle],
    min_price: f64,
    max_price: f64,
) {
    if area.width < 2 || area.height < 2 {
        return;
    }

    let price_span = (max_price - min_price).max(f64::EPSILON);
    let denom = (samples.len().saturating_sub(1)).max(1) as f64;
    let width_f = (area.width - 1) as f64;

    let buffer = frame.buffer_mut();

    for (idx, sample) in samples.iter().enumerate() {
        let rel_x = if samples.len() == 1 {
            0.0
        } else {
            idx as f64 / denom
        };
        let x = (area.x + (rel_x * width_f).round() as u16).min(area.x + area.width - 1);

        // KRX convention: rising red, falling blue
        let style = if sample.is_rising() {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::Blue)
        };

        let mut y_high = price_to_y(sample.high, min_price, price_span, area);
        let mut y_low = price_to_y(sample.low, min_price, price_span, area);
        if y_high > y_low {
            std::mem::swap(&mut y_high, &mut y_low);
        }

        for y in y_high..=y_low {
            if within(area, x, y) {
                buffer.get_mut(x, y).set_style(style).set_symbol("│");
            }
        }

        let mut y_open = price_to_y(sample.open, min_price, price_span, area);
        let mut y_close = price_to_y(sample.close, min_price, price_span, area);
        if y_open > y_close {
            std::mem::swap(&mut y_open, &mut y_close);
        }

        let x_right = x.saturating_add(1);
        let body = if y_open == y_close { "─" } else { "█" };

        for y in y_open..=y_close {
            for column in [x, x_right] {
                if within(area, column, y) {
                    buffer.get_mut(column, y).set_style(style).set_symbol(body);
                }
            }
        }
    }
}

fn price_to_y(price: f64, min_price: f64, price_span: f64, area: Rect) -> u16 {
    if area.height <= 1 {
        return area.y;
    }
    let normalized = ((price - min_price) / price_span).clamp(0.0, 1.0);
    let offset = ((1.0 - normalized) * (area.height - 1) as f64).round() as u16;
    area.y + offset.min(area.height - 1)
}

fn within(area: Rect, x: u16, y: u16) -> bool {
    x >= area.x && x < area.x + area.width && y >= area.y && y < area.y + area.height
}

fn price_label(value: f64, width: u16) -> String {
    let mut label = format_grouped(value);
    let max_len = width as usize;
    if max_len > 0 && label.len() > max_len {
        label.truncate(max_len);
    }
    label
}

fn render_chart_placeholder(frame: &mut Frame<'_>, area: Rect, message: &str, color: Color) {
    frame.render_widget(
        Paragraph::new(message.to_string())
            .style(Style::default().fg(color))
            .alignment(Alignment::Center),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_to_y_maps_extremes() {
        let area = Rect::new(0, 5, 20, 11);
        assert_eq!(price_to_y(200.0, 100.0, 100.0, area), 5);
        assert_eq!(price_to_y(100.0, 100.0, 100.0, area), 15);
        assert_eq!(price_to_y(150.0, 100.0, 100.0, area), 10);
        assert_eq!(price_to_y(500.0, 100.0, 100.0, area), 5);
    }

    #[test]
    fn test_price_label_groups_and_truncates() {
        assert_eq!(price_label(71200.4, 9), "71,200");
        assert_eq!(price_label(1_234_567.0, 5), "1,234");
    }
}
