//! Detail chart: series preparation, surfaces, lifecycle controller and driver

pub mod controller;
pub mod driver;
pub mod series;
pub mod surface;

pub use controller::{ChartController, ChartEffect, ChartFault, ChartPhase, ChartSettings};
pub use driver::{ChartDriver, ChartEvent, HistorySource};
pub use series::{Candle, prepare_series};
pub use surface::{
    ChartError, ChartFactory, ChartSurface, ChartView, TerminalChart, TerminalChartFactory,
};
