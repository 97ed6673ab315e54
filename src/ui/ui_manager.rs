//! UI Manager for interactive terminal interface

use anyhow::Result;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crossterm::event::{self, Event, MouseEventKind};

use crate::api::ApiClient;
use crate::cache::{CacheEvent, MarketStore, Phase, ResourceKey};
use crate::chart::{ChartDriver, ChartEvent, ChartFault, ChartPhase};
use crate::config::Config;
use crate::detail::ReanalysisState;
use crate::session::action_channel::SessionEvent;
use crate::session::command_router::{CommandRouter, InteractiveCommand};

use super::AppState;
use super::tui::{Tui, UiAction, handle_key_event};

/// UI Manager for managing the terminal interface
pub struct UIManager {
    /// Shared resource cache
    store: MarketStore,
    /// Cache change notifications
    cache_rx: Option<mpsc::UnboundedReceiver<CacheEvent>>,
    /// Event sender for session events (UI -> Session)
    session_event_tx: mpsc::UnboundedSender<SessionEvent>,
    /// Event sender for UI events (Session -> UI)
    ui_event_tx: mpsc::UnboundedSender<SessionEvent>,
    /// Event receiver for UI events
    event_rx: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    /// Runs chart timers and history fetches
    chart_driver: ChartDriver<ApiClient>,
    /// Chart effect completions
    chart_event_rx: Option<mpsc::UnboundedReceiver<ChartEvent>>,
    /// Application state
    app_state: AppState,
    /// UI rendering state
    render_state: RenderState,
    /// Active configuration snapshot
    config: Config,
    /// TUI terminal handle
    tui: Option<Tui>,
    /// Desired refresh cadence
    refresh_interval: Duration,
    /// Time of the last successful render
    last_render: Instant,
    /// Terminal was resized since the last frame
    pending_resize: bool,
}

/// UI rendering state
#[derive(Debug, Clone)]
pub struct RenderState {
    pub should_quit: bool,
    pub should_redraw: bool,
    pub error_message: Option<String>,
    pub info_message: Option<String>,
    /// Latest status-line notice; a newer one replaces it
    pub notice: Option<String>,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            should_quit: false,
            should_redraw: true,
            error_message: None,
            info_message: None,
            notice: None,
        }
    }
}

impl RenderState {
    fn queue_message(&mut self, message: impl Into<String>) {
        self.notice = Some(message.into());
        self.should_redraw = true;
    }
}

impl UIManager {
    /// Create a new UIManager
    pub fn new(
        store: MarketStore,
        cache_rx: mpsc::UnboundedReceiver<CacheEvent>,
        session_event_tx: mpsc::UnboundedSender<SessionEvent>,
        config: Config,
    ) -> Self {
        // Create event channels
        let (ui_event_tx, ui_event_rx) = mpsc::unbounded_channel();
        let (chart_event_tx, chart_event_rx) = mpsc::unbounded_channel();

        let refresh_interval = Duration::from_millis(config.ui.refresh_rate_ms.clamp(16, 1000));
        let chart_driver = ChartDriver::new(store.client().clone(), chart_event_tx);

        Self {
            store,
            cache_rx: Some(cache_rx),
            session_event_tx,
            ui_event_tx,
            event_rx: Some(ui_event_rx),
            chart_driver,
            chart_event_rx: Some(chart_event_rx),
            app_state: AppState::new(&config),
            render_state: RenderState::default(),
            config,
            tui: None,
            refresh_interval,
            last_render: Instant::now(),
            pending_resize: false,
        }
    }

    /// Get UI event sender (Session -> UI)
    pub fn ui_event_sender(&self) -> mpsc::UnboundedSender<SessionEvent> {
        self.ui_event_tx.clone()
    }

    /// Run the UI manager
    pub async fn run(&mut self) -> Result<()> {
        info!("Starting UI manager");

        // Initialize UI components
        self.initialize_ui().await?;

        // Main UI loop
        let result = self.run_ui_loop().await;

        self.shutdown().await?;
        info!("UI manager stopped");
        result
    }

    /// Initialize UI components
    async fn initialize_ui(&mut self) -> Result<()> {
        info!("Initializing UI components");

        for key in ResourceKey::ALL {
            self.refresh_snapshot(key).await;
        }

        let message = "Dashboard ready. Press '/' for commands, Enter for details.";
        self.render_state.queue_message(message);
        self.app_state.push_log(message);
        self.render_state.should_redraw = true;

        Ok(())
    }

    /// Main UI rendering loop
    async fn run_ui_loop(&mut self) -> Result<()> {
        info!("Starting UI rendering loop");

        let ui_shutdown_tx = self.ui_event_tx.clone();
        let session_shutdown_tx = self.session_event_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                return;
            }

            tracing::info!("Ctrl+C received, initiating shutdown");
            let _ = ui_shutdown_tx.send(SessionEvent::ShutdownRequested);
            let _ = session_shutdown_tx.send(SessionEvent::ShutdownRequested);
        });

        self.tui =
            Some(Tui::new().map_err(|e| anyhow::anyhow!("Failed to initialise terminal: {}", e))?);
        self.render_state.should_redraw = true;
        self.last_render = Instant::now()
            .checked_sub(self.refresh_interval)
            .unwrap_or_else(Instant::now);

        while !self.render_state.should_quit && !self.app_state.should_quit {
            // Process async events from the session layer, cache and chart
            self.process_events().await?;

            // Handle terminal input (non-blocking)
            self.poll_terminal_events()?;

            // Render on dirty state or cadence tick
            let now = Instant::now();
            if self.render_state.should_redraw
                || now.duration_since(self.last_render) >= self.refresh_interval
            {
                if let Some(tui) = self.tui.as_mut() {
                    tui.draw(&mut self.app_state, &self.render_state)
                        .map_err(|e| anyhow::anyhow!("Failed to render frame: {}", e))?;
                }
                self.render_state.should_redraw = false;
                self.last_render = now;

                // The frame just measured the chart area
                self.sync_chart_container();
            }

            // Prevent busy loop
            tokio::time::sleep(Duration::from_millis(16)).await;
        }

        Ok(())
    }

    /// Report chart area mount/unmount and resizes to the chart controller
    fn sync_chart_container(&mut self) {
        let chart = &mut self.app_state.chart;
        let effects = match (self.app_state.chart_area, chart.container_width()) {
            (Some(area), None) => chart.container_mounted(area.width),
            (None, Some(_)) => chart.container_unmounted(),
            (Some(area), Some(width)) if self.pending_resize && area.width != width => {
                if self.chart_driver.resize_listening() && chart.resize(area.width) {
                    debug!("Chart resized to {} columns", area.width);
                    self.render_state.should_redraw = true;
                }
                Vec::new()
            }
            _ => Vec::new(),
        };
        self.pending_resize = false;

        if !effects.is_empty() {
            self.chart_driver.execute(effects);
            self.render_state.should_redraw = true;
        }
    }

    /// Poll for keyboard/terminal events and translate into session actions
    fn poll_terminal_events(&mut self) -> Result<()> {
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(key_event) => {
                    let action = handle_key_event(&mut self.app_state, key_event);
                    self.render_state.should_redraw = true;
                    self.handle_ui_action(action);
                }
                Event::Resize(_, _) => {
                    self.pending_resize = true;
                    self.render_state.should_redraw = true;
                }
                Event::Mouse(mouse_event) => match mouse_event.kind {
                    MouseEventKind::ScrollUp => {
                        self.app_state.scroll_logs_up();
                        self.render_state.should_redraw = true;
                    }
                    MouseEventKind::ScrollDown => {
                        self.app_state.scroll_logs_down();
                        self.render_state.should_redraw = true;
                    }
                    _ => {}
                },
                Event::FocusGained | Event::FocusLost | Event::Paste(_) => {}
            }
        }

        if self.app_state.should_quit {
            self.render_state.should_quit = true;
        }

        Ok(())
    }

    fn handle_ui_action(&mut self, action: UiAction) {
        match action {
            UiAction::None => {}
            UiAction::QuitRequested => {
                self.render_state.should_quit = true;
                let _ = self.session_event_tx.send(SessionEvent::ShutdownRequested);
            }
            UiAction::SubmitCommand(cmd) => {
                if let Err(e) = self.process_user_command(&cmd) {
                    let message = format!("Command error: {}", e);
                    self.render_state.error_message = Some(message.clone());
                    self.app_state.push_log(message);
                }
            }
            UiAction::OpenDetail => match self.app_state.selected_signal() {
                Some(signal) => {
                    let effects = self.app_state.open_detail(signal);
                    self.chart_driver.execute(effects);
                }
                None => self
                    .render_state
                    .queue_message("Nothing to open on this page"),
            },
            UiAction::CloseDetail => {
                let effects = self.app_state.close_detail();
                self.chart_driver.execute(effects);
            }
            UiAction::Reanalyze(ticker) => {
                self.app_state
                    .push_log(format!("Re-analysis requested for {}", ticker));
                let command = InteractiveCommand::Analyze { ticker };
                if let Err(e) = self.session_event_tx.send(SessionEvent::UserCommand { command }) {
                    error!("Failed to send re-analysis request: {}", e);
                }
            }
        }
    }

    /// Process incoming events
    async fn process_events(&mut self) -> Result<()> {
        // Process session events
        let mut events_to_process = Vec::new();
        if let Some(event_rx) = &mut self.event_rx {
            while let Ok(event) = event_rx.try_recv() {
                events_to_process.push(event);
            }
        }

        let processed_session = !events_to_process.is_empty();
        for event in events_to_process {
            self.handle_event(event).await?;
        }

        // Cache changes: re-read each touched resource once
        let mut changed = BTreeSet::new();
        let mut failed = Vec::new();
        if let Some(cache_rx) = &mut self.cache_rx {
            while let Ok(event) = cache_rx.try_recv() {
                if event.phase == Phase::Error {
                    failed.push(event.key);
                }
                changed.insert(event.key);
            }
        }

        let processed_cache = !changed.is_empty();
        for key in changed {
            match key.parse::<ResourceKey>() {
                Ok(key) => self.refresh_snapshot(key).await,
                Err(e) => warn!("Cache event for unknown resource: {}", e),
            }
        }
        for key in failed {
            self.app_state.push_log(format!("Refresh of {} failed", key));
        }

        // Chart timer and history completions
        let mut chart_events = Vec::new();
        if let Some(chart_event_rx) = &mut self.chart_event_rx {
            while let Ok(event) = chart_event_rx.try_recv() {
                chart_events.push(event);
            }
        }

        let processed_chart = !chart_events.is_empty();
        for event in chart_events {
            self.handle_chart_event(event);
        }

        if processed_session || processed_cache || processed_chart {
            self.render_state.should_redraw = true;
        }

        Ok(())
    }

    /// Copy the latest snapshot of one resource into the app state
    async fn refresh_snapshot(&mut self, key: ResourceKey) {
        let app = &mut self.app_state;
        match key {
            ResourceKey::Signals => app.signals = self.store.signals.snapshot().await,
            ResourceKey::MarketStatus => {
                app.market_status = self.store.market_status.snapshot().await
            }
            ResourceKey::MarketGate => app.market_gate = self.store.market_gate.snapshot().await,
            ResourceKey::Macro => {
                app.macro_indicators = self.store.macro_indicators.snapshot().await
            }
            ResourceKey::Sectors => app.sectors = self.store.sectors.snapshot().await,
            ResourceKey::AiAnalysis => app.ai_analysis = self.store.ai_analysis.snapshot().await,
            ResourceKey::Themes => app.themes = self.store.themes.snapshot().await,
            ResourceKey::Jongga => app.jongga = self.store.jongga.snapshot().await,
            ResourceKey::JonggaStatus => {
                app.jongga_status = self.store.jongga_status.snapshot().await
            }
        }
        app.normalize_selection();
    }

    fn handle_chart_event(&mut self, event: ChartEvent) {
        let before = self.app_state.chart.phase().clone();
        let effects = match event {
            ChartEvent::InitElapsed { generation } => self.app_state.chart.init_elapsed(generation),
            ChartEvent::HistoryLoaded { generation, result } => {
                self.app_state.chart.history_loaded(generation, result)
            }
        };
        self.chart_driver.execute(effects);

        let after = self.app_state.chart.phase().clone();
        if before != after {
            if let ChartPhase::Error(fault) = &after {
                let ticker = self.app_state.chart.selection().unwrap_or_default().to_string();
                let message = match fault {
                    ChartFault::Construction(e) => format!("Chart for {} failed: {}", ticker, e),
                    ChartFault::Data(e) => format!("Chart history for {} failed: {}", ticker, e),
                };
                self.app_state.push_log(message);
            }
        }
    }

    /// Process user command from input
    fn process_user_command(&mut self, input: &str) -> Result<()> {
        debug!("Processing user command: {}", input);

        match CommandRouter::parse_interactive_command(input) {
            Ok(Some(InteractiveCommand::Quit)) => {
                info!("User requested quit");
                self.render_state.should_quit = true;
                self.session_event_tx
                    .send(SessionEvent::ShutdownRequested)
                    .map_err(|e| anyhow::anyhow!("Failed to send shutdown request: {}", e))?;
                self.app_state.push_log("Shutdown requested via command");
            }
            Ok(Some(command)) => {
                // Forward other commands to session manager
                self.session_event_tx
                    .send(SessionEvent::UserCommand { command })
                    .map_err(|e| anyhow::anyhow!("Failed to send user command: {}", e))?;
            }
            Ok(None) => {
                debug!("Empty command");
            }
            Err(e) => {
                let message = format!("Command error: {}", e);
                self.render_state.error_message = Some(message.clone());
                self.render_state.queue_message(message);
                error!("Command parsing error: {}", e);
            }
        }

        Ok(())
    }

    /// Handle session event
    pub async fn handle_event(&mut self, event: SessionEvent) -> Result<()> {
        debug!("Handling UI event: {:?}", event);
        self.render_state.should_redraw = true;

        match event {
            SessionEvent::ShutdownRequested => {
                self.render_state
                    .queue_message("Shutdown requested. Exiting dashboard...");
                self.render_state.should_quit = true;
                self.app_state
                    .push_log("Shutdown requested by session manager");
                info!("UI received shutdown request");
            }
            SessionEvent::Error { message } => {
                let formatted = format!("Error: {}", message);
                self.render_state.error_message = Some(formatted.clone());
                self.render_state.queue_message(formatted.clone());
                self.app_state.push_log(formatted);
            }
            SessionEvent::Info { message } => {
                self.render_state.info_message = Some(message.clone());
                self.render_state.queue_message(message.clone());
                self.app_state.push_log(message);
            }
            SessionEvent::HelpInfo { lines } => {
                if !lines.is_empty() {
                    self.render_state
                        .queue_message("Help listed in the activity panel (j/k to scroll)");
                }
                for line in lines {
                    self.app_state.push_log(format!("[help] {}", line));
                }
            }
            SessionEvent::ConfigInfo { config } => {
                self.app_state
                    .push_log(format!("[config] API {}", config.api.base_url));
                self.app_state.push_log(format!(
                    "[config] Jongga API {}",
                    config.api.jongga_base_url
                ));
                self.app_state.push_log(format!(
                    "[config] Poll signals {}s, status {}s, macro {}s, jongga {}s",
                    config.poll.signals_secs,
                    config.poll.market_status_secs,
                    config.poll.macro_secs,
                    config.poll.jongga_secs
                ));
                self.app_state.push_log(format!(
                    "[config] Chart delay {}ms, fallback width {}, period {}",
                    config.chart.init_delay_ms, config.chart.fallback_width, config.chart.history_period
                ));
                self.render_state
                    .queue_message("Configuration listed in the activity panel");
                self.refresh_interval =
                    Duration::from_millis(config.ui.refresh_rate_ms.clamp(16, 1000));
                self.app_state.enable_colors = config.ui.enable_colors;
                self.config = config;
            }
            SessionEvent::RefreshCompleted { key, result } => match result {
                Ok(()) => self.render_state.queue_message(format!("Refreshed {}", key)),
                Err(message) => {
                    let formatted = format!("Refresh of {} failed: {}", key, message);
                    self.render_state.error_message = Some(formatted.clone());
                    self.app_state.push_log(formatted);
                }
            },
            SessionEvent::ReanalysisFinished { ticker, result } => {
                self.handle_reanalysis(ticker, result);
            }
            SessionEvent::JonggaRunStarted { capital } => {
                self.app_state.jongga_running = true;
                let message = format!("Screener run started with capital {}", capital);
                self.render_state.queue_message(message.clone());
                self.app_state.push_log(message);
            }
            SessionEvent::JonggaRunFinished { result } => {
                self.app_state.jongga_running = false;
                let message = match result {
                    Ok(run) => format!(
                        "Screener run finished: {} ({} picks)",
                        run.message
                            .or(run.status)
                            .unwrap_or_else(|| "ok".to_string()),
                        run.count.map_or_else(|| "-".to_string(), |c| c.to_string())
                    ),
                    Err(e) => format!("Screener run failed: {}", e),
                };
                self.render_state.queue_message(message.clone());
                self.app_state.push_log(message);
            }
            SessionEvent::ShowPage { page } => {
                if self.app_state.detail.is_some() {
                    let effects = self.app_state.close_detail();
                    self.chart_driver.execute(effects);
                }
                self.app_state.show_page(page);
            }
            SessionEvent::OpenDetail { ticker } => match self.app_state.signal_for(&ticker) {
                Some(signal) => {
                    let effects = self.app_state.open_detail(signal);
                    self.chart_driver.execute(effects);
                }
                None => self
                    .render_state
                    .queue_message(format!("Cannot open {}", ticker)),
            },
            SessionEvent::UserCommand { command } => {
                debug!("Ignoring user command routed to UI: {:?}", command);
            }
        }

        Ok(())
    }

    fn handle_reanalysis(
        &mut self,
        ticker: String,
        result: Result<serde_json::Map<String, serde_json::Value>, String>,
    ) {
        let summary = match &result {
            Ok(patch) => {
                let action = patch
                    .get("action")
                    .or_else(|| patch.get("gpt_recommendation").and_then(|r| r.get("action")))
                    .and_then(|a| a.as_str())
                    .unwrap_or("updated");
                format!("Re-analysis for {}: {}", ticker, action)
            }
            Err(e) => format!("Re-analysis for {} failed: {}", ticker, e),
        };

        let applied = match self.app_state.detail.as_mut() {
            Some(detail) => detail.apply_reanalysis(&ticker, result),
            None => false,
        };

        if applied {
            if let Some(ReanalysisState::Failed(_)) =
                self.app_state.detail.as_ref().map(|d| d.reanalysis())
            {
                self.render_state.queue_message(summary.clone());
            }
        }
        self.app_state.push_log(summary);
    }

    /// Graceful shutdown
    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Shutting down UI manager");

        self.render_state.should_quit = true;
        self.app_state.should_quit = true;

        // Dispose the chart and stop its timers
        let effects = self.app_state.close_detail();
        self.chart_driver.execute(effects);

        if let Some(mut tui) = self.tui.take() {
            if let Err(e) = tui.restore() {
                warn!("Failed to restore terminal during shutdown: {}", e);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notices_replace_each_other() {
        let mut state = RenderState {
            should_redraw: false,
            ..RenderState::default()
        };

        for n in 0..500 {
            state.queue_message(format!("Refreshed {}", n));
        }

        assert_eq!(state.notice.as_deref(), Some("Refreshed 499"));
        assert!(state.should_redraw);
    }
}
