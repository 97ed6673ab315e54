//! Chart surface abstraction and the terminal implementation

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::debug;

use super::series::Candle;

/// Chart construction failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChartError {
    #[error("chart area too narrow ({width} columns, need {min})")]
    TooNarrow { width: u16, min: u16 },

    #[error("chart backend failure: {0}")]
    Backend(String),
}

/// A live, imperatively managed chart bound to one render area
pub trait ChartSurface {
    fn set_data(&mut self, candles: Vec<Candle>);

    /// Make the whole loaded series visible
    fn fit_content(&mut self);

    fn resize(&mut self, width: u16);

    /// Release the surface; calling it again is a no-op
    fn dispose(&mut self);

    fn width(&self) -> u16;

    fn is_disposed(&self) -> bool;
}

/// Creates chart surfaces for a container of a given width
pub trait ChartFactory {
    type Chart: ChartSurface;

    fn create(&mut self, width: u16) -> Result<Self::Chart, ChartError>;
}

/// Factory for [`TerminalChart`]; tracks how many charts are alive
#[derive(Debug, Clone)]
pub struct TerminalChartFactory {
    min_width: u16,
    live: Arc<AtomicUsize>,
}

impl TerminalChartFactory {
    pub fn new(min_width: u16) -> Self {
        Self {
            min_width,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn live_instances(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl ChartFactory for TerminalChartFactory {
    type Chart = TerminalChart;

    fn create(&mut self, width: u16) -> Result<TerminalChart, ChartError> {
        if width < self.min_width {
            return Err(ChartError::TooNarrow {
                width,
                min: self.min_width,
            });
        }

        self.live.fetch_add(1, Ordering::SeqCst);
        debug!("Created terminal chart, width {}", width);
        Ok(TerminalChart {
            candles: Vec::new(),
            visible: 0..0,
            width,
            disposed: false,
            live: self.live.clone(),
        })
    }
}

/// Candles reduced to fit the available columns, with the price extent
#[derive(Debug, Clone, PartialEq)]
pub struct ChartView {
    pub samples: Vec<Candle>,
    pub min_price: f64,
    pub max_price: f64,
}

/// Candlestick chart rendered into the terminal buffer
#[derive(Debug)]
pub struct TerminalChart {
    candles: Vec<Candle>,
    visible: Range<usize>,
    width: u16,
    disposed: bool,
    live: Arc<AtomicUsize>,
}

impl TerminalChart {
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn visible_range(&self) -> Range<usize> {
        self.visible.clone()
    }

    /// Visible candles bucketed so each sample gets two columns
    pub fn view(&self, columns: u16) -> Option<ChartView> {
        if self.disposed {
            return None;
        }

        let visible = self.candles.get(self.visible.clone())?;
        if visible.is_empty() {
            return None;
        }

        let slots = usize::from(columns.min(self.width) / 2).max(1);
        let per_bucket = visible.len().div_ceil(slots);
        let samples: Vec<Candle> = visible.chunks(per_bucket).filter_map(merge_bucket).collect();

        let min_price = samples.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
        let max_price = samples.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);

        Some(ChartView {
            samples,
            min_price,
            max_price,
        })
    }
}

fn merge_bucket(bucket: &[Candle]) -> Option<Candle> {
    let first = bucket.first()?;
    let last = bucket.last()?;
    Some(Candle {
        date: last.date,
        open: first.open,
        high: bucket.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max),
        low: bucket.iter().map(|c| c.low).fold(f64::INFINITY, f64::min),
        close: last.close,
        volume: bucket.iter().map(|c| c.volume).sum(),
    })
}

impl ChartSurface for TerminalChart {
    fn set_data(&mut self, candles: Vec<Candle>) {
        self.candles = candles;
        self.visible = self.visible.start.min(self.candles.len())..self.candles.len();
    }

    fn fit_content(&mut self) {
        self.visible = 0..self.candles.len();
    }

    fn resize(&mut self, width: u16) {
        self.width = width;
    }

    fn dispose(&mut self) {
        if !self.disposed {
            self.disposed = true;
            self.candles.clear();
            self.visible = 0..0;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn width(&self) -> u16 {
        self.width
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Drop for TerminalChart {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn candles(n: usize) -> Vec<Candle> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64;
                Candle {
                    date: start + chrono::Days::new(i as u64),
                    open: base,
                    high: base + 2.0,
                    low: base - 2.0,
                    close: base + 1.0,
                    volume: 10.0,
                }
            })
            .collect()
    }

    #[test]
    fn test_create_rejects_narrow_area() {
        let mut factory = TerminalChartFactory::new(8);
        assert_eq!(
            factory.create(4).unwrap_err(),
            ChartError::TooNarrow { width: 4, min: 8 }
        );
        assert_eq!(factory.live_instances(), 0);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut factory = TerminalChartFactory::new(8);
        let mut chart = factory.create(40).unwrap();
        assert_eq!(factory.live_instances(), 1);

        chart.dispose();
        chart.dispose();
        drop(chart);
        assert_eq!(factory.live_instances(), 0);
    }

    #[test]
    fn test_view_buckets_to_columns() {
        let mut factory = TerminalChartFactory::new(8);
        let mut chart = factory.create(20).unwrap();
        chart.set_data(candles(100));
        chart.fit_content();

        let view = chart.view(20).unwrap();
        assert_eq!(view.samples.len(), 10);
        assert_eq!(view.samples[0].open, 100.0);
        assert_eq!(view.samples[0].volume, 100.0);
        assert_eq!(view.min_price, 98.0);
        assert_eq!(view.max_price, 201.0);
        assert!(view.samples.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_view_empty_without_data() {
        let mut factory = TerminalChartFactory::new(8);
        let chart = factory.create(20).unwrap();
        assert!(chart.view(20).is_none());
    }
}
