//! Session Manager for interactive terminal session lifecycle management

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use futures_util::{StreamExt, stream::FuturesUnordered};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::api::ApiClient;
use crate::cache::{CacheEvent, MarketStore, PollHandle, ResourceKey};
use crate::cli::Cli;
use crate::config::Config;
use crate::ui::ui_manager::UIManager;

use super::action_channel::{ActionChannel, SessionEvent};
use super::command_router::{CommandRouter, InteractiveCommand};

/// Session state tracking
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Starting,
    Running,
    ShuttingDown,
    Terminated,
}

/// Session statistics for monitoring
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub started_at: DateTime<Local>,
    pub commands_processed: u64,
    pub events_processed: u64,
    pub errors_encountered: u64,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            started_at: Local::now(),
            commands_processed: 0,
            events_processed: 0,
            errors_encountered: 0,
        }
    }
}

/// Main session manager for the interactive dashboard
pub struct SessionManager {
    /// Application configuration
    app_config: Config,
    /// CLI arguments
    cli: Cli,
    /// Session state
    state: SessionState,
    /// Session statistics
    stats: SessionStats,
    /// Polled backend resources
    store: MarketStore,
    /// Active pollers; dropping them stops polling
    pollers: Vec<PollHandle>,
    /// Cache change notifications, handed to the UI on startup
    cache_rx: Option<mpsc::UnboundedReceiver<CacheEvent>>,
    /// UI task handle (optional)
    ui_task: Option<tokio::task::JoinHandle<()>>,
    /// UI event sender (Session -> UI)
    ui_event_tx: Option<mpsc::UnboundedSender<SessionEvent>>,
    /// Command router
    command_router: CommandRouter,
    /// Action channel
    action_channel: ActionChannel,
}

impl SessionManager {
    /// Create a new SessionManager
    pub fn new(cli: &Cli, app_config: Config) -> Result<Self> {
        info!("Creating new SessionManager");

        let client = ApiClient::new(&app_config.api).context("Failed to create API client")?;
        info!("Backend API at {}", client.base_url());

        let (cache_tx, cache_rx) = mpsc::unbounded_channel();
        let store = MarketStore::new(client, &app_config.poll, cache_tx);

        Ok(Self {
            app_config,
            cli: cli.clone(),
            state: SessionState::Starting,
            stats: SessionStats::default(),
            store,
            pollers: Vec::new(),
            cache_rx: Some(cache_rx),
            ui_task: None,
            ui_event_tx: None,
            command_router: CommandRouter::new(),
            action_channel: ActionChannel::new(),
        })
    }

    /// Initialize the session
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing interactive session");

        self.initialize_ui().await?;

        self.pollers = self.store.start_polling();

        self.forward_to_ui(SessionEvent::HelpInfo {
            lines: CommandRouter::help_messages(),
        });

        self.state = SessionState::Running;
        info!("Session initialized successfully");

        Ok(())
    }

    /// Initialize UI manager
    async fn initialize_ui(&mut self) -> Result<()> {
        info!("Initializing UI manager");

        let cache_rx = self
            .cache_rx
            .take()
            .context("UI manager already initialized")?;

        let mut ui_manager = UIManager::new(
            self.store.clone(),
            cache_rx,
            self.action_channel.event_tx(),
            self.app_config.clone(),
        );

        // Store UI event sender
        self.ui_event_tx = Some(ui_manager.ui_event_sender());

        // Spawn UI task
        self.ui_task = Some(tokio::spawn(async move {
            if let Err(e) = ui_manager.run().await {
                error!("UI manager error: {:#}", e);
            }
        }));

        Ok(())
    }

    /// Run the main session loop
    pub async fn run(&mut self) -> Result<()> {
        info!("Starting interactive session loop (log level {})", self.cli.effective_log_level());

        while self.state != SessionState::Terminated {
            tokio::select! {
                // Handle commands from command router
                Some(command) = self.command_router.next_command() => {
                    self.handle_command(command).await?;
                }

                // Handle events from action channel (including user commands)
                Some(event) = self.action_channel.next_event() => {
                    self.handle_event(event).await?;
                }

                else => {
                    warn!("Session channels closed");
                    self.shutdown().await?;
                }
            }
        }

        info!("Session loop terminated");
        Ok(())
    }

    /// Handle user command
    async fn handle_command(&mut self, command: InteractiveCommand) -> Result<()> {
        debug!("Handling command: {:?}", command);

        self.stats.commands_processed += 1;

        match command {
            InteractiveCommand::Refresh { target } => self.handle_refresh(target),
            InteractiveCommand::Analyze { ticker } => self.handle_analyze(ticker),
            InteractiveCommand::JonggaRun { capital } => self.handle_jongga_run(capital),
            InteractiveCommand::Open { ticker } => {
                self.forward_to_ui(SessionEvent::OpenDetail { ticker });
                Ok(())
            }
            InteractiveCommand::Page { page } => {
                self.forward_to_ui(SessionEvent::ShowPage { page });
                Ok(())
            }
            InteractiveCommand::Config => {
                self.forward_to_ui(SessionEvent::ConfigInfo {
                    config: self.app_config.clone(),
                });
                Ok(())
            }
            InteractiveCommand::Help => {
                self.forward_to_ui(SessionEvent::HelpInfo {
                    lines: CommandRouter::help_messages(),
                });
                Ok(())
            }
            InteractiveCommand::Quit => {
                info!("User requested quit");
                self.shutdown().await
            }
        }
    }

    /// Revalidate one resource or every resource, off the session loop
    fn handle_refresh(&self, target: Option<ResourceKey>) -> Result<()> {
        let keys: Vec<ResourceKey> = match target {
            Some(key) => vec![key],
            None => ResourceKey::ALL.to_vec(),
        };
        // Only an explicit AI refresh asks the backend to regenerate
        let force_ai = target == Some(ResourceKey::AiAnalysis);
        info!("Manual refresh requested for {} resources", keys.len());

        let store = self.store.clone();
        let action_channel = self.action_channel.clone();

        tokio::spawn(async move {
            let mut tasks: FuturesUnordered<_> = keys
                .into_iter()
                .map(|key| {
                    let store = store.clone();
                    async move {
                        let result = if force_ai {
                            store.regenerate_ai_analysis().await
                        } else {
                            store.refresh(key).await
                        };
                        (key, result.map_err(|e| e.to_string()))
                    }
                })
                .collect();

            while let Some((key, result)) = tasks.next().await {
                if let Err(e) = action_channel.send_event(SessionEvent::RefreshCompleted { key, result }) {
                    error!("Failed to emit RefreshCompleted for {}: {}", key, e);
                }
            }
        });

        Ok(())
    }

    /// Request a re-analysis; the reply goes to the detail view
    fn handle_analyze(&self, ticker: String) -> Result<()> {
        info!("Re-analysis requested for {}", ticker);

        let client = self.store.client().clone();
        let action_channel = self.action_channel.clone();

        tokio::spawn(async move {
            let result = client
                .analyze_stock(&ticker)
                .await
                .map_err(|e| e.to_string());
            if let Err(e) = action_channel.send_event(SessionEvent::ReanalysisFinished { ticker, result }) {
                error!("Failed to emit ReanalysisFinished: {}", e);
            }
        });

        Ok(())
    }

    /// Run the screener and revalidate its resources when it finishes
    fn handle_jongga_run(&self, capital: u64) -> Result<()> {
        info!("Jongga screener run requested with capital {}", capital);
        self.forward_to_ui(SessionEvent::JonggaRunStarted { capital });

        let store = self.store.clone();
        let action_channel = self.action_channel.clone();

        tokio::spawn(async move {
            let result = store.run_jongga(capital).await.map_err(|e| e.to_string());
            if let Err(e) = action_channel.send_event(SessionEvent::JonggaRunFinished { result }) {
                error!("Failed to emit JonggaRunFinished: {}", e);
            }
        });

        Ok(())
    }

    /// Handle session event
    async fn handle_event(&mut self, event: SessionEvent) -> Result<()> {
        debug!("Handling session event: {:?}", event);

        self.stats.events_processed += 1;

        match event {
            SessionEvent::ShutdownRequested => {
                self.shutdown().await?;
            }
            SessionEvent::Error { message } => {
                error!("Session error: {}", message);
                self.stats.errors_encountered += 1;
                self.forward_to_ui(SessionEvent::Error { message });
            }
            SessionEvent::UserCommand { command } => {
                self.command_router.send_command(command)?;
            }
            SessionEvent::RefreshCompleted { key, result } => {
                if let Err(message) = &result {
                    warn!("Refresh of {} failed: {}", key, message);
                    self.stats.errors_encountered += 1;
                }
                self.forward_to_ui(SessionEvent::RefreshCompleted { key, result });
            }
            other => {
                self.forward_to_ui(other);
            }
        }

        Ok(())
    }

    /// Forward an event to the UI if the channel is available
    fn forward_to_ui(&self, event: SessionEvent) {
        if let Some(ui_event_tx) = &self.ui_event_tx {
            if let Err(e) = ui_event_tx.send(event) {
                error!("Failed to forward event to UI: {}", e);
            }
        }
    }

    /// Graceful shutdown
    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Initiating graceful shutdown");
        self.state = SessionState::ShuttingDown;

        // Stop polling
        let pollers = std::mem::take(&mut self.pollers);
        debug!("Stopping {} pollers", pollers.len());
        drop(pollers);

        // Notify UI to shutdown and wait for task completion
        if let Some(ui_event_tx) = self.ui_event_tx.take() {
            if let Err(e) = ui_event_tx.send(SessionEvent::ShutdownRequested) {
                error!("Failed to notify UI of shutdown: {}", e);
            }
        }

        if let Some(ui_task) = self.ui_task.take() {
            if let Err(e) = ui_task.await {
                error!("UI task terminated with error: {}", e);
            }
        }

        self.state = SessionState::Terminated;
        let uptime = Local::now() - self.stats.started_at;
        info!(
            "Shutdown completed after {}s: {} commands, {} events, {} errors",
            uptime.num_seconds(),
            self.stats.commands_processed,
            self.stats.events_processed,
            self.stats.errors_encountered
        );
        Ok(())
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if self.state != SessionState::Terminated {
            warn!("SessionManager dropped without proper shutdown");
        }
    }
}
