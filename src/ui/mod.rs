//! User Interface module
//!
//! Provides both TUI (Terminal User Interface) and simple CLI output capabilities.

/// TUI application state and rendering
pub mod tui;

/// Simple CLI output functions
pub mod cli;

/// UI event loop
pub mod ui_manager;

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use chrono::Local;
use ratatui::layout::Rect;
use serde_json::json;
use tracing::warn;

use crate::api::{
    AiAnalysis, JonggaReport, JonggaStatus, MacroIndicators, MarketGate, MarketStatus,
    SectorPerformance, Signal, SignalsResponse, ThemeList,
};
use crate::cache::Snapshot;
use crate::chart::{ChartController, ChartEffect, ChartSettings, TerminalChartFactory};
use crate::config::Config;
use crate::detail::DetailView;
use crate::session::command_router::{CommandRouter, CommandSpec};

/// Dashboard pages, in tab order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Signals,
    Macro,
    Ai,
    Themes,
    Jongga,
}

impl Page {
    pub const ALL: [Page; 5] = [Page::Signals, Page::Macro, Page::Ai, Page::Themes, Page::Jongga];

    pub fn title(self) -> &'static str {
        match self {
            Page::Signals => "Signals",
            Page::Macro => "Macro",
            Page::Ai => "AI Analysis",
            Page::Themes => "Themes",
            Page::Jongga => "Jongga V2",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|p| *p == self).unwrap_or(0)
    }

    pub fn next(self) -> Page {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Page {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for Page {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "signals" | "vcp" => Ok(Page::Signals),
            "macro" => Ok(Page::Macro),
            "ai" | "ai-analysis" => Ok(Page::Ai),
            "themes" | "theme" => Ok(Page::Themes),
            "jongga" | "jongga-v2" => Ok(Page::Jongga),
            other => Err(format!("Unknown page: {}", other)),
        }
    }
}

/// Input mode for the TUI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Command,
    Detail,
}

/// Application state for UI components
pub struct AppState {
    pub should_quit: bool,
    pub page: Page,
    pub input_mode: InputMode,
    pub selected_row: usize,
    pub enable_colors: bool,

    pub signals: Snapshot<SignalsResponse>,
    pub market_status: Snapshot<MarketStatus>,
    pub market_gate: Snapshot<MarketGate>,
    pub macro_indicators: Snapshot<MacroIndicators>,
    pub sectors: Snapshot<SectorPerformance>,
    pub ai_analysis: Snapshot<AiAnalysis>,
    pub themes: Snapshot<ThemeList>,
    pub jongga: Snapshot<JonggaReport>,
    pub jongga_status: Snapshot<JonggaStatus>,
    pub jongga_running: bool,

    pub detail: Option<DetailView>,
    pub chart: ChartController<TerminalChartFactory>,
    /// Chart area measured by the last render; `None` when not on screen
    pub chart_area: Option<Rect>,

    pub log_messages: VecDeque<String>,
    pub log_scroll_offset: usize,
    log_capacity: usize,

    pub command_buffer: String,
    pub filtered_commands: Vec<&'static CommandSpec>,
    pub selected_command_index: usize,
}

impl AppState {
    /// Create new application state
    pub fn new(config: &Config) -> Self {
        Self {
            should_quit: false,
            page: Page::Signals,
            input_mode: InputMode::Normal,
            selected_row: 0,
            enable_colors: config.ui.enable_colors,
            signals: Snapshot::default(),
            market_status: Snapshot::default(),
            market_gate: Snapshot::default(),
            macro_indicators: Snapshot::default(),
            sectors: Snapshot::default(),
            ai_analysis: Snapshot::default(),
            themes: Snapshot::default(),
            jongga: Snapshot::default(),
            jongga_status: Snapshot::default(),
            jongga_running: false,
            detail: None,
            chart: ChartController::new(
                TerminalChartFactory::new(config.chart.min_width),
                ChartSettings::from(&config.chart),
            ),
            chart_area: None,
            log_messages: VecDeque::new(),
            log_scroll_offset: 0,
            log_capacity: config.ui.log_capacity.max(1),
            command_buffer: String::new(),
            filtered_commands: Vec::new(),
            selected_command_index: 0,
        }
    }

    /// Move to next page
    pub fn next_page(&mut self) {
        self.show_page(self.page.next());
    }

    /// Move to previous page
    pub fn previous_page(&mut self) {
        self.show_page(self.page.previous());
    }

    pub fn show_page(&mut self, page: Page) {
        if self.page != page {
            self.page = page;
            self.selected_row = 0;
        }
    }

    /// Signals ordered by composite score, highest first; unscored last
    pub fn sorted_signals(&self) -> Vec<&Signal> {
        let mut signals: Vec<&Signal> = match &self.signals.data {
            Some(response) => response.signals.iter().collect(),
            None => Vec::new(),
        };
        signals.sort_by(|a, b| {
            let a = a.composite_score().unwrap_or(f64::NEG_INFINITY);
            let b = b.composite_score().unwrap_or(f64::NEG_INFINITY);
            b.total_cmp(&a)
        });
        signals
    }

    /// Ranked picks from the AI analysis
    pub fn ai_picks(&self) -> &[Signal] {
        self.ai_analysis
            .data
            .as_deref()
            .map(|analysis| analysis.signals.as_slice())
            .unwrap_or(&[])
    }

    /// Rows on the current page that can be selected
    pub fn row_count(&self) -> usize {
        match self.page {
            Page::Signals => self.signals.data.as_ref().map_or(0, |r| r.signals.len()),
            Page::Macro => self.sectors.data.as_ref().map_or(0, |s| s.sectors.len()),
            Page::Ai => self.ai_picks().len(),
            Page::Themes => self.themes.data.as_ref().map_or(0, |t| t.themes.len()),
            Page::Jongga => self.jongga.data.as_ref().map_or(0, |j| j.signals.len()),
        }
    }

    pub fn select_next(&mut self) {
        let count = self.row_count();
        if count > 0 {
            self.selected_row = (self.selected_row + 1).min(count - 1);
        }
    }

    pub fn select_previous(&mut self) {
        self.selected_row = self.selected_row.saturating_sub(1);
    }

    /// Keep the selection inside the current row count after data changes
    pub fn normalize_selection(&mut self) {
        let count = self.row_count();
        if count == 0 {
            self.selected_row = 0;
        } else if self.selected_row >= count {
            self.selected_row = count - 1;
        }
    }

    /// Signal behind the selected row, if the page has one
    pub fn selected_signal(&self) -> Option<Signal> {
        match self.page {
            Page::Signals => self.sorted_signals().get(self.selected_row).map(|s| (*s).clone()),
            Page::Ai => self.ai_picks().get(self.selected_row).cloned(),
            Page::Jongga => {
                let pick = self.jongga.data.as_ref()?.signals.get(self.selected_row)?;
                self.find_signal(&pick.ticker)
                    .or_else(|| bare_signal(&pick.ticker, &pick.name))
            }
            Page::Macro | Page::Themes => None,
        }
    }

    /// Look a ticker up in the signal list, then in the AI picks
    pub fn find_signal(&self, ticker: &str) -> Option<Signal> {
        self.signals
            .data
            .as_ref()
            .and_then(|r| r.signals.iter().find(|s| s.ticker == ticker))
            .or_else(|| self.ai_picks().iter().find(|s| s.ticker == ticker))
            .cloned()
    }

    /// Signal for `ticker` from the caches, or a bare record to chart it
    pub fn signal_for(&self, ticker: &str) -> Option<Signal> {
        self.find_signal(ticker).or_else(|| bare_signal(ticker, ""))
    }

    /// Open the detail overlay; the caller runs the returned chart effects
    pub fn open_detail(&mut self, signal: Signal) -> Vec<ChartEffect> {
        let ticker = signal.ticker.clone();
        self.detail = Some(DetailView::open(signal));
        self.input_mode = InputMode::Detail;
        self.chart.open(&ticker)
    }

    pub fn close_detail(&mut self) -> Vec<ChartEffect> {
        self.detail = None;
        self.chart_area = None;
        if self.input_mode == InputMode::Detail {
            self.input_mode = InputMode::Normal;
        }
        self.chart.close()
    }

    pub fn push_log(&mut self, message: impl Into<String>) {
        let line = format!("{} {}", Local::now().format("%H:%M:%S"), message.into());
        self.log_messages.push_back(line);
        while self.log_messages.len() > self.log_capacity {
            self.log_messages.pop_front();
        }
        // Keep the viewport anchored when scrolled back
        if self.log_scroll_offset > 0 {
            self.log_scroll_offset = (self.log_scroll_offset + 1).min(self.max_log_offset());
        }
    }

    fn max_log_offset(&self) -> usize {
        self.log_messages.len().saturating_sub(1)
    }

    pub fn scroll_logs_up(&mut self) {
        self.log_scroll_offset = (self.log_scroll_offset + 1).min(self.max_log_offset());
    }

    pub fn scroll_logs_down(&mut self) {
        self.log_scroll_offset = self.log_scroll_offset.saturating_sub(1);
    }

    pub fn activate_command_mode(&mut self, preset: Option<&str>) {
        self.input_mode = InputMode::Command;
        self.command_buffer = preset.unwrap_or_default().to_string();
        self.update_command_suggestions();
    }

    pub fn clear_command(&mut self) {
        self.command_buffer.clear();
    }

    pub fn update_command_suggestions(&mut self) {
        self.filtered_commands = CommandRouter::suggestions(&self.command_buffer);
        if self.selected_command_index >= self.filtered_commands.len() {
            self.selected_command_index = 0;
        }
    }

    pub fn reset_command_suggestions(&mut self) {
        self.filtered_commands.clear();
        self.selected_command_index = 0;
    }

    pub fn select_next_suggestion(&mut self) {
        if !self.filtered_commands.is_empty() {
            self.selected_command_index =
                (self.selected_command_index + 1) % self.filtered_commands.len();
        }
    }

    pub fn select_previous_suggestion(&mut self) {
        let len = self.filtered_commands.len();
        if len > 0 {
            self.selected_command_index = (self.selected_command_index + len - 1) % len;
        }
    }

    /// Replace the typed trigger with the highlighted suggestion
    pub fn apply_selected_suggestion(&mut self) {
        if let Some(spec) = self.filtered_commands.get(self.selected_command_index) {
            self.command_buffer = format!("{} ", spec.trigger);
            self.update_command_suggestions();
        }
    }
}

/// Minimal signal record for a ticker the caches do not know
fn bare_signal(ticker: &str, name: &str) -> Option<Signal> {
    match serde_json::from_value(json!({ "ticker": ticker, "name": name })) {
        Ok(signal) => Some(signal),
        Err(e) => {
            warn!("Cannot build signal for {}: {}", ticker, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartPhase;
    use std::sync::Arc;

    fn signal(ticker: &str, final_score: Option<f64>) -> Signal {
        serde_json::from_value(json!({
            "ticker": ticker,
            "name": ticker,
            "final_score": final_score,
        }))
        .unwrap()
    }

    fn app_with_signals(signals: Vec<Signal>) -> AppState {
        let mut app = AppState::new(&Config::default());
        app.signals.data = Some(Arc::new(SignalsResponse {
            count: signals.len(),
            signals,
            ..Default::default()
        }));
        app
    }

    #[test]
    fn test_page_navigation_wraps() {
        let mut app = AppState::new(&Config::default());
        assert_eq!(app.page, Page::Signals);

        app.previous_page();
        assert_eq!(app.page, Page::Jongga);

        app.next_page();
        app.next_page();
        assert_eq!(app.page, Page::Macro);
        assert_eq!("ai-analysis".parse::<Page>(), Ok(Page::Ai));
        assert!("watchlist".parse::<Page>().is_err());
    }

    #[test]
    fn test_signals_sorted_by_composite_score() {
        let app = app_with_signals(vec![
            signal("000660", Some(55.0)),
            signal("035420", None),
            signal("005930", Some(82.0)),
        ]);

        let tickers: Vec<&str> = app.sorted_signals().iter().map(|s| s.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["005930", "000660", "035420"]);
    }

    #[test]
    fn test_selection_clamps_to_rows() {
        let mut app = app_with_signals(vec![signal("005930", Some(82.0))]);
        app.select_next();
        app.select_next();
        assert_eq!(app.selected_row, 0);

        let empty = app_with_signals(Vec::new());
        assert_eq!(empty.row_count(), 0);
        assert!(empty.selected_signal().is_none());
    }

    #[test]
    fn test_open_and_close_detail_drive_chart() {
        let mut app = app_with_signals(vec![signal("005930", Some(82.0))]);
        let selected = app.selected_signal().unwrap();

        app.open_detail(selected);
        assert_eq!(app.input_mode, InputMode::Detail);
        assert_eq!(app.chart.phase(), &ChartPhase::AwaitingContainer);
        assert_eq!(app.chart.selection(), Some("005930"));

        app.close_detail();
        assert!(app.detail.is_none());
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.chart.phase(), &ChartPhase::Closed);
    }

    #[test]
    fn test_unknown_ticker_gets_bare_signal() {
        let app = app_with_signals(Vec::new());
        let bare = app.signal_for("035720").unwrap();
        assert_eq!(bare.ticker, "035720");
        assert!(bare.current_price.is_none());
    }

    #[test]
    fn test_log_capacity_and_scroll() {
        let mut config = Config::default();
        config.ui.log_capacity = 3;
        let mut app = AppState::new(&config);

        for i in 0..5 {
            app.push_log(format!("line {}", i));
        }
        assert_eq!(app.log_messages.len(), 3);
        assert!(app.log_messages.back().unwrap().ends_with("line 4"));

        app.scroll_logs_up();
        app.scroll_logs_up();
        app.scroll_logs_up();
        assert_eq!(app.log_scroll_offset, 2);
        app.scroll_logs_down();
        assert_eq!(app.log_scroll_offset, 1);
    }

    #[test]
    fn test_command_suggestions() {
        let mut app = AppState::new(&Config::default());
        app.activate_command_mode(Some("/pa"));
        assert_eq!(app.filtered_commands.len(), 1);

        app.apply_selected_suggestion();
        assert_eq!(app.command_buffer, "/page ");
    }
}
