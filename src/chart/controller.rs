//! Chart lifecycle controller
//!
//! Owns at most one live chart for the detail overlay. The controller is a
//! synchronous state machine: every input returns the side effects the
//! caller must run (timers, history fetches, resize listener changes), and
//! async completions come back tagged with the generation that requested
//! them so stale ones can be dropped.

use std::time::Duration;
use tracing::{debug, info, warn};

use super::series::prepare_series;
use super::surface::{ChartFactory, ChartSurface};
use crate::api::HistoryPoint;
use crate::config::ChartConfig;

/// Why the chart is in its error state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartFault {
    /// The surface could not be created; terminal until reopened
    Construction(String),
    /// History could not be loaded; the chart stays visible
    Data(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartPhase {
    Closed,
    AwaitingContainer,
    Initializing,
    Loading,
    Ready,
    Error(ChartFault),
}

/// Work requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartEffect {
    ScheduleInit { generation: u64, delay: Duration },
    CancelInit,
    FetchHistory {
        generation: u64,
        ticker: String,
        period: String,
    },
    AttachResize,
    DetachResize,
}

#[derive(Debug, Clone)]
pub struct ChartSettings {
    pub init_delay: Duration,
    pub fallback_width: u16,
    pub history_period: String,
}

impl From<&ChartConfig> for ChartSettings {
    fn from(config: &ChartConfig) -> Self {
        Self {
            init_delay: config.init_delay(),
            fallback_width: config.fallback_width,
            history_period: config.history_period.clone(),
        }
    }
}

pub struct ChartController<F: ChartFactory> {
    factory: F,
    settings: ChartSettings,
    phase: ChartPhase,
    selection: Option<String>,
    /// Width of the mounted container, `None` while unmounted
    container: Option<u16>,
    instance: Option<F::Chart>,
    generation: u64,
    init_pending: bool,
    resize_attached: bool,
}

impl<F: ChartFactory> ChartController<F> {
    pub fn new(factory: F, settings: ChartSettings) -> Self {
        Self {
            factory,
            settings,
            phase: ChartPhase::Closed,
            selection: None,
            container: None,
            instance: None,
            generation: 0,
            init_pending: false,
            resize_attached: false,
        }
    }

    pub fn phase(&self) -> &ChartPhase {
        &self.phase
    }

    pub fn chart(&self) -> Option<&F::Chart> {
        self.instance.as_ref()
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn resize_listening(&self) -> bool {
        self.resize_attached
    }

    pub fn container_width(&self) -> Option<u16> {
        self.container
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Show the chart for `ticker`, replacing any current selection
    pub fn open(&mut self, ticker: &str) -> Vec<ChartEffect> {
        let mut effects = self.teardown();

        info!("Opening chart for {}", ticker);
        self.selection = Some(ticker.to_string());
        self.phase = ChartPhase::AwaitingContainer;

        if self.container.is_some() {
            effects.extend(self.begin_init());
        }
        effects
    }

    pub fn close(&mut self) -> Vec<ChartEffect> {
        let effects = self.teardown();
        if self.selection.take().is_some() {
            info!("Chart closed");
        }
        self.phase = ChartPhase::Closed;
        effects
    }

    /// The render area became visible with the given width
    pub fn container_mounted(&mut self, width: u16) -> Vec<ChartEffect> {
        let remount = self.container.is_some();
        self.container = Some(width);

        if remount {
            let effective = self.effective_width(width);
            if let Some(chart) = self.instance.as_mut() {
                chart.resize(effective);
            }
            return Vec::new();
        }

        debug!("Chart container mounted, width {}", width);
        if self.phase == ChartPhase::AwaitingContainer {
            self.begin_init()
        } else {
            Vec::new()
        }
    }

    /// The render area went away; the chart is rebuilt on the next mount
    pub fn container_unmounted(&mut self) -> Vec<ChartEffect> {
        if self.container.take().is_none() {
            return Vec::new();
        }
        debug!("Chart container unmounted");

        match self.phase {
            ChartPhase::Closed | ChartPhase::Error(ChartFault::Construction(_)) => Vec::new(),
            _ => {
                let effects = self.teardown();
                self.phase = ChartPhase::AwaitingContainer;
                effects
            }
        }
    }

    /// The deferred construction timer fired
    pub fn init_elapsed(&mut self, generation: u64) -> Vec<ChartEffect> {
        if generation != self.generation || !self.init_pending {
            debug!("Ignoring stale chart init (generation {})", generation);
            return Vec::new();
        }
        self.init_pending = false;

        let (Some(width), Some(ticker)) = (self.container, self.selection.clone()) else {
            self.phase = ChartPhase::AwaitingContainer;
            return Vec::new();
        };

        self.dispose_instance();

        match self.factory.create(self.effective_width(width)) {
            Ok(chart) => {
                self.instance = Some(chart);
                self.phase = ChartPhase::Loading;

                let mut effects = Vec::new();
                if !self.resize_attached {
                    self.resize_attached = true;
                    effects.push(ChartEffect::AttachResize);
                }
                effects.push(ChartEffect::FetchHistory {
                    generation: self.generation,
                    ticker,
                    period: self.settings.history_period.clone(),
                });
                effects
            }
            Err(e) => {
                warn!("Chart construction failed for {}: {}", ticker, e);
                self.phase = ChartPhase::Error(ChartFault::Construction(e.to_string()));
                Vec::new()
            }
        }
    }

    /// History for `generation` arrived
    pub fn history_loaded(
        &mut self,
        generation: u64,
        result: Result<Vec<HistoryPoint>, String>,
    ) -> Vec<ChartEffect> {
        if generation != self.generation || self.phase != ChartPhase::Loading {
            debug!("Ignoring stale history (generation {})", generation);
            return Vec::new();
        }

        let Some(chart) = self.instance.as_mut() else {
            return Vec::new();
        };

        match result {
            Ok(points) => {
                let candles = prepare_series(&points);
                if candles.is_empty() {
                    self.phase =
                        ChartPhase::Error(ChartFault::Data("No price history available".to_string()));
                } else {
                    debug!("Loaded {} candles into chart", candles.len());
                    chart.set_data(candles);
                    chart.fit_content();
                    self.phase = ChartPhase::Ready;
                }
            }
            Err(message) => {
                warn!("Chart history failed: {}", message);
                self.phase = ChartPhase::Error(ChartFault::Data(message));
            }
        }
        Vec::new()
    }

    /// Terminal resize; updates the live chart's width only
    pub fn resize(&mut self, width: u16) -> bool {
        if !self.resize_attached {
            return false;
        }
        if self.container.is_some() {
            self.container = Some(width);
        }

        let width = self.effective_width(width);
        match self.instance.as_mut() {
            Some(chart) => {
                chart.resize(width);
                true
            }
            None => false,
        }
    }

    fn begin_init(&mut self) -> Vec<ChartEffect> {
        self.generation += 1;
        self.init_pending = true;
        self.phase = ChartPhase::Initializing;
        vec![ChartEffect::ScheduleInit {
            generation: self.generation,
            delay: self.settings.init_delay,
        }]
    }

    /// Dispose, cancel the pending timer and drop the resize listener
    fn teardown(&mut self) -> Vec<ChartEffect> {
        let mut effects = Vec::new();

        self.dispose_instance();
        if self.init_pending {
            self.init_pending = false;
            effects.push(ChartEffect::CancelInit);
        }
        if self.resize_attached {
            self.resize_attached = false;
            effects.push(ChartEffect::DetachResize);
        }
        self.generation += 1;
        effects
    }

    fn dispose_instance(&mut self) {
        if let Some(mut chart) = self.instance.take() {
            chart.dispose();
        }
    }

    fn effective_width(&self, width: u16) -> u16 {
        if width == 0 {
            self.settings.fallback_width
        } else {
            width
        }
    }
}

impl<F: ChartFactory> Drop for ChartController<F> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::surface::{ChartError, TerminalChartFactory};

    fn settings() -> ChartSettings {
        ChartSettings {
            init_delay: Duration::from_millis(150),
            fallback_width: 80,
            history_period: "1y".to_string(),
        }
    }

    fn point(date: &str, close: f64) -> HistoryPoint {
        HistoryPoint {
            date: date.to_string(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }

    fn scheduled_generation(effects: &[ChartEffect]) -> u64 {
        effects
            .iter()
            .find_map(|e| match e {
                ChartEffect::ScheduleInit { generation, .. } => Some(*generation),
                _ => None,
            })
            .expect("init scheduled")
    }

    #[test]
    fn test_open_waits_for_container() {
        let mut ctl = ChartController::new(TerminalChartFactory::new(8), settings());

        assert!(ctl.open("005930").is_empty());
        assert_eq!(ctl.phase(), &ChartPhase::AwaitingContainer);

        let effects = ctl.container_mounted(60);
        assert_eq!(ctl.phase(), &ChartPhase::Initializing);
        assert!(matches!(
            effects.as_slice(),
            [ChartEffect::ScheduleInit { delay, .. }] if *delay == Duration::from_millis(150)
        ));
        assert!(ctl.chart().is_none());
    }

    #[test]
    fn test_full_cycle_reaches_ready() {
        let mut ctl = ChartController::new(TerminalChartFactory::new(8), settings());
        ctl.open("005930");
        let generation = scheduled_generation(&ctl.container_mounted(60));

        let effects = ctl.init_elapsed(generation);
        assert_eq!(ctl.phase(), &ChartPhase::Loading);
        assert_eq!(
            effects,
            vec![
                ChartEffect::AttachResize,
                ChartEffect::FetchHistory {
                    generation,
                    ticker: "005930".to_string(),
                    period: "1y".to_string(),
                },
            ]
        );

        ctl.history_loaded(
            generation,
            Ok(vec![point("2024-02-01", 2.0), point("2024-01-01", 1.0)]),
        );
        assert_eq!(ctl.phase(), &ChartPhase::Ready);
        let chart = ctl.chart().unwrap();
        assert_eq!(chart.candles()[0].close, 1.0);
        assert_eq!(chart.visible_range(), 0..2);
    }

    #[test]
    fn test_zero_width_uses_fallback() {
        let mut ctl = ChartController::new(TerminalChartFactory::new(8), settings());
        ctl.open("005930");
        let generation = scheduled_generation(&ctl.container_mounted(0));
        ctl.init_elapsed(generation);

        assert_eq!(ctl.chart().map(|c| c.width()), Some(80));
    }

    #[test]
    fn test_close_cancels_pending_init() {
        let mut ctl = ChartController::new(TerminalChartFactory::new(8), settings());
        ctl.open("005930");
        let generation = scheduled_generation(&ctl.container_mounted(60));

        assert_eq!(ctl.close(), vec![ChartEffect::CancelInit]);
        assert_eq!(ctl.phase(), &ChartPhase::Closed);

        // a timer that still fires must not build anything
        assert!(ctl.init_elapsed(generation).is_empty());
        assert!(ctl.chart().is_none());
        assert_eq!(ctl.factory().live_instances(), 0);
    }

    #[test]
    fn test_reopen_keeps_single_instance() {
        let mut ctl = ChartController::new(TerminalChartFactory::new(8), settings());
        ctl.container_mounted(60);

        for ticker in ["005930", "000660", "005930"] {
            let generation = scheduled_generation(&ctl.open(ticker));
            ctl.init_elapsed(generation);
            assert_eq!(ctl.factory().live_instances(), 1);
        }

        let effects = ctl.close();
        assert_eq!(effects, vec![ChartEffect::DetachResize]);
        assert_eq!(ctl.factory().live_instances(), 0);
    }

    #[test]
    fn test_stale_history_ignored_after_selection_change() {
        let mut ctl = ChartController::new(TerminalChartFactory::new(8), settings());
        ctl.container_mounted(60);
        let first = scheduled_generation(&ctl.open("005930"));
        ctl.init_elapsed(first);

        let second = scheduled_generation(&ctl.open("000660"));
        ctl.init_elapsed(second);

        ctl.history_loaded(first, Ok(vec![point("2024-01-01", 1.0)]));
        assert_eq!(ctl.phase(), &ChartPhase::Loading);

        ctl.history_loaded(second, Ok(vec![point("2024-01-01", 9.0)]));
        assert_eq!(ctl.phase(), &ChartPhase::Ready);
        assert_eq!(ctl.chart().unwrap().candles()[0].close, 9.0);
    }

    #[test]
    fn test_empty_history_keeps_instance() {
        let mut ctl = ChartController::new(TerminalChartFactory::new(8), settings());
        ctl.container_mounted(60);
        let generation = scheduled_generation(&ctl.open("005930"));
        ctl.init_elapsed(generation);

        ctl.history_loaded(generation, Ok(Vec::new()));

        assert!(matches!(ctl.phase(), ChartPhase::Error(ChartFault::Data(_))));
        assert!(ctl.chart().is_some());
        assert_eq!(ctl.factory().live_instances(), 1);
    }

    #[test]
    fn test_construction_failure_is_terminal_until_reopen() {
        let mut ctl = ChartController::new(TerminalChartFactory::new(8), settings());
        ctl.open("005930");
        let generation = scheduled_generation(&ctl.container_mounted(4));

        assert!(ctl.init_elapsed(generation).is_empty());
        let expected = ChartError::TooNarrow { width: 4, min: 8 }.to_string();
        assert_eq!(
            ctl.phase(),
            &ChartPhase::Error(ChartFault::Construction(expected))
        );

        // remounting does not retry
        ctl.container_unmounted();
        assert!(ctl.container_mounted(60).is_empty());
        assert!(matches!(ctl.phase(), ChartPhase::Error(ChartFault::Construction(_))));

        // reopening does
        assert!(!ctl.open("005930").is_empty());
        assert_eq!(ctl.phase(), &ChartPhase::Initializing);
    }

    #[test]
    fn test_resize_updates_width_only() {
        let mut ctl = ChartController::new(TerminalChartFactory::new(8), settings());
        assert!(!ctl.resize(100));

        ctl.container_mounted(60);
        let generation = scheduled_generation(&ctl.open("005930"));
        ctl.init_elapsed(generation);
        ctl.history_loaded(generation, Ok(vec![point("2024-01-01", 1.0)]));

        assert!(ctl.resize(100));
        assert_eq!(ctl.chart().map(|c| c.width()), Some(100));
        assert_eq!(ctl.phase(), &ChartPhase::Ready);
        assert_eq!(ctl.generation(), generation);
        assert_eq!(ctl.factory().live_instances(), 1);
    }

    #[test]
    fn test_unmount_disposes_and_waits_for_remount() {
        let mut ctl = ChartController::new(TerminalChartFactory::new(8), settings());
        ctl.container_mounted(60);
        let generation = scheduled_generation(&ctl.open("005930"));
        ctl.init_elapsed(generation);

        assert_eq!(ctl.container_unmounted(), vec![ChartEffect::DetachResize]);
        assert_eq!(ctl.phase(), &ChartPhase::AwaitingContainer);
        assert_eq!(ctl.factory().live_instances(), 0);

        ctl.container_mounted(70);
        assert_eq!(ctl.phase(), &ChartPhase::Initializing);
    }

    #[test]
    fn test_remount_resizes_live_chart() {
        let mut ctl = ChartController::new(TerminalChartFactory::new(8), settings());
        ctl.container_mounted(60);
        let generation = scheduled_generation(&ctl.open("005930"));
        ctl.init_elapsed(generation);

        assert!(ctl.container_mounted(0).is_empty());
        assert_eq!(ctl.chart().map(|c| c.width()), Some(80));
        assert!(ctl.container_mounted(72).is_empty());
        assert_eq!(ctl.chart().map(|c| c.width()), Some(72));
        assert_eq!(ctl.factory().live_instances(), 1);
    }

    #[test]
    fn test_drop_releases_instance() {
        let factory = TerminalChartFactory::new(8);
        let counter = factory.clone();
        {
            let mut ctl = ChartController::new(factory, settings());
            ctl.container_mounted(60);
            let generation = scheduled_generation(&ctl.open("005930"));
            ctl.init_elapsed(generation);
            assert_eq!(counter.live_instances(), 1);
        }
        assert_eq!(counter.live_instances(), 0);
    }
}
