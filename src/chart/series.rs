//! Historical series preparation

use chrono::NaiveDate;
use tracing::debug;

use crate::api::HistoryPoint;

/// One trading-period candle ready for the chart
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn is_rising(&self) -> bool {
        self.close >= self.open
    }
}

/// Parse, filter and sort backend history points ascending by date.
///
/// Rows with an unparsable date or non-finite prices are dropped. The sort
/// is stable, so rows sharing a date keep their source order.
pub fn prepare_series(points: &[HistoryPoint]) -> Vec<Candle> {
    let mut candles: Vec<Candle> = points.iter().filter_map(to_candle).collect();

    let dropped = points.len() - candles.len();
    if dropped > 0 {
        debug!("Dropped {} unusable history rows", dropped);
    }

    candles.sort_by_key(|candle| candle.date);
    candles
}

fn to_candle(point: &HistoryPoint) -> Option<Candle> {
    let date = parse_date(&point.date)?;
    let prices = [point.open, point.high, point.low, point.close];
    if prices.iter().any(|p| !p.is_finite()) {
        return None;
    }

    Some(Candle {
        date,
        open: point.open,
        high: point.high.max(point.open).max(point.close),
        low: point.low.min(point.open).min(point.close),
        close: point.close,
        volume: if point.volume.is_finite() { point.volume } else { 0.0 },
    })
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(date: &str, close: f64) -> HistoryPoint {
        HistoryPoint {
            date: date.to_string(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 100.0,
        }
    }

    #[test]
    fn test_series_sorted_ascending() {
        let points = vec![
            point("2024-03-04", 3.0),
            point("2024-01-02", 1.0),
            point("2024-02-01T00:00:00", 2.0),
            point("2024-01-02", 1.5),
        ];

        let candles = prepare_series(&points);

        assert_eq!(candles.len(), 4);
        assert!(candles.windows(2).all(|w| w[0].date <= w[1].date));
        assert_eq!(candles[0].close, 1.0);
        assert_eq!(candles[1].close, 1.5);
        assert_eq!(candles[3].close, 3.0);
    }

    #[test]
    fn test_unusable_rows_dropped() {
        let mut bad_price = point("2024-01-03", 1.0);
        bad_price.high = f64::NAN;
        let points = vec![point("not a date", 1.0), bad_price, point("2024-01-04", 2.0)];

        let candles = prepare_series(&points);

        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
    }

    #[test]
    fn test_empty_input() {
        assert!(prepare_series(&[]).is_empty());
    }
}
