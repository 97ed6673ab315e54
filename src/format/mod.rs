//! Presentation helpers
//!
//! Pure functions that turn optional backend numbers into display text and
//! severity classes. Missing values always render as [`PLACEHOLDER`].

use ratatui::style::Color;

/// Text shown for an absent optional field
pub const PLACEHOLDER: &str = "-";

const MILLION: f64 = 1_000_000.0;
const THOUSAND: f64 = 1_000.0;

/// Render an optional value, falling back to the placeholder
pub fn placeholder<T, F>(value: Option<T>, render: F) -> String
where
    F: FnOnce(T) -> String,
{
    value.map(render).unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// Group the integer part with commas: `71200.0` -> `71,200`
pub fn format_grouped(value: f64) -> String {
    if !value.is_finite() {
        return PLACEHOLDER.to_string();
    }

    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// KRW price with currency symbol, placeholder when absent
pub fn format_price(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => format!("₩{}", format_grouped(v)),
        None => PLACEHOLDER.to_string(),
    }
}

/// Signed percentage with two decimals: `1.234` -> `+1.23%`
pub fn format_percent(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => format!("{:+.2}%", v),
        None => PLACEHOLDER.to_string(),
    }
}

/// Abbreviate a non-negative magnitude: `1_500_000` -> `1.5M`, `2_300` -> `2.3K`
pub fn abbreviate(magnitude: f64) -> String {
    let magnitude = magnitude.abs();
    // Thresholds compare the rounded figure, so 999_950 reads 1.0M rather than 1000.0K
    if (magnitude / 100.0).round() >= MILLION / 100.0 {
        format!("{:.1}M", magnitude / MILLION)
    } else if magnitude.round() >= THOUSAND {
        format!("{:.1}K", magnitude / THOUSAND)
    } else {
        format!("{:.0}", magnitude)
    }
}

/// Direction of an investor supply flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDirection {
    Inflow,
    Outflow,
    Flat,
}

impl FlowDirection {
    pub fn color(self) -> Color {
        match self {
            FlowDirection::Inflow => Color::Green,
            FlowDirection::Outflow => Color::Red,
            FlowDirection::Flat => Color::Gray,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowDisplay {
    pub text: String,
    pub direction: FlowDirection,
}

/// Abbreviated supply flow with sign and colour direction
pub fn format_flow(value: Option<f64>) -> FlowDisplay {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return FlowDisplay {
            text: PLACEHOLDER.to_string(),
            direction: FlowDirection::Flat,
        };
    };

    let body = abbreviate(value);
    if value > 0.0 {
        FlowDisplay {
            text: format!("+{body}"),
            direction: FlowDirection::Inflow,
        }
    } else if value < 0.0 {
        FlowDisplay {
            text: format!("-{body}"),
            direction: FlowDirection::Outflow,
        }
    } else {
        FlowDisplay {
            text: body,
            direction: FlowDirection::Flat,
        }
    }
}

/// Colour for a signed change, KRX convention: rising red, falling blue
pub fn change_color(value: Option<f64>) -> Color {
    match value {
        Some(v) if v > 0.0 => Color::Red,
        Some(v) if v < 0.0 => Color::Blue,
        _ => Color::Gray,
    }
}

/// Three-band severity of a 0-100 composite score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SeverityBand {
    Low,
    Middle,
    High,
}

impl SeverityBand {
    pub const HIGH_CUT: f64 = 80.0;
    pub const MIDDLE_CUT: f64 = 50.0;

    pub fn from_score(score: f64) -> Self {
        if score >= Self::HIGH_CUT {
            SeverityBand::High
        } else if score >= Self::MIDDLE_CUT {
            SeverityBand::Middle
        } else {
            SeverityBand::Low
        }
    }

    /// Band of a backend risk label (normal / elevated / warning / critical)
    pub fn from_risk_level(level: &str) -> Option<Self> {
        match level.to_ascii_lowercase().as_str() {
            "normal" | "low" | "safe" => Some(SeverityBand::Low),
            "elevated" | "medium" | "caution" => Some(SeverityBand::Middle),
            "warning" | "critical" | "high" | "danger" => Some(SeverityBand::High),
            _ => None,
        }
    }

    pub fn color(self) -> Color {
        match self {
            SeverityBand::High => Color::Green,
            SeverityBand::Middle => Color::Yellow,
            SeverityBand::Low => Color::DarkGray,
        }
    }

    /// Colour when a high band means danger rather than strength
    pub fn risk_color(self) -> Color {
        match self {
            SeverityBand::High => Color::Red,
            SeverityBand::Middle => Color::Yellow,
            SeverityBand::Low => Color::Green,
        }
    }
}

/// Text progress bar for a 0-100 score, `width` cells wide
pub fn score_bar(score: f64, width: usize) -> String {
    let ratio = (score / 100.0).clamp(0.0, 1.0);
    let filled = (ratio * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_abbreviation() {
        let inflow = format_flow(Some(1_500_000.0));
        assert_eq!(inflow.text, "+1.5M");
        assert_eq!(inflow.direction, FlowDirection::Inflow);

        let outflow = format_flow(Some(-2_300.0));
        assert_eq!(outflow.text, "-2.3K");
        assert_eq!(outflow.direction, FlowDirection::Outflow);
        assert_eq!(outflow.direction.color(), Color::Red);

        assert_eq!(format_flow(Some(-950.0)).text, "-950");
        assert_eq!(format_flow(Some(0.0)).direction, FlowDirection::Flat);
    }

    #[test]
    fn test_abbreviation_promotes_after_rounding() {
        assert_eq!(abbreviate(999_949.0), "999.9K");
        assert_eq!(abbreviate(999_950.0), "1.0M");
        assert_eq!(abbreviate(999_999.0), "1.0M");
        assert_eq!(abbreviate(1_000_000.0), "1.0M");
        assert_eq!(abbreviate(999.4), "999");
        assert_eq!(abbreviate(999.6), "1.0K");
        assert_eq!(format_flow(Some(-999_960.0)).text, "-1.0M");
    }

    #[test]
    fn test_change_color_follows_krx_convention() {
        assert_eq!(change_color(Some(1.25)), Color::Red);
        assert_eq!(change_color(Some(-0.4)), Color::Blue);
        assert_eq!(change_color(Some(0.0)), Color::Gray);
        assert_eq!(change_color(None), Color::Gray);
    }

    #[test]
    fn test_severity_band_boundaries() {
        assert_eq!(SeverityBand::from_score(0.0), SeverityBand::Low);
        assert_eq!(SeverityBand::from_score(49.99), SeverityBand::Low);
        assert_eq!(SeverityBand::from_score(50.0), SeverityBand::Middle);
        assert_eq!(SeverityBand::from_score(79.99), SeverityBand::Middle);
        assert_eq!(SeverityBand::from_score(80.0), SeverityBand::High);
        assert_eq!(SeverityBand::from_score(100.0), SeverityBand::High);
    }

    #[test]
    fn test_absent_values_render_placeholder() {
        assert_eq!(format_price(None), PLACEHOLDER);
        assert_eq!(format_percent(None), PLACEHOLDER);
        assert_eq!(format_percent(Some(f64::NAN)), PLACEHOLDER);
        assert_eq!(format_flow(None).text, PLACEHOLDER);
        assert_eq!(placeholder(None::<f64>, |v| v.to_string()), PLACEHOLDER);
    }

    #[test]
    fn test_grouping_and_percent() {
        assert_eq!(format_grouped(71200.0), "71,200");
        assert_eq!(format_grouped(-1234567.4), "-1,234,567");
        assert_eq!(format_grouped(999.0), "999");
        assert_eq!(format_price(Some(1_000.0)), "₩1,000");
        assert_eq!(format_percent(Some(1.234)), "+1.23%");
        assert_eq!(format_percent(Some(-0.5)), "-0.50%");
    }

    #[test]
    fn test_risk_levels_and_bar() {
        assert_eq!(SeverityBand::from_risk_level("Critical"), Some(SeverityBand::High));
        assert_eq!(SeverityBand::from_risk_level("normal"), Some(SeverityBand::Low));
        assert_eq!(SeverityBand::from_risk_level("unknown"), None);
        assert_eq!(score_bar(50.0, 4), "██░░");
        assert_eq!(score_bar(150.0, 2), "██");
    }
}
