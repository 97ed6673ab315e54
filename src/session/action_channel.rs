//! Action Channel for asynchronous event processing

use anyhow::Result;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::api::JonggaRunResult;
use crate::cache::ResourceKey;
use crate::config::Config;
use crate::session::command_router::InteractiveCommand;
use crate::ui::Page;

/// Session events for communication between components
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Shutdown request
    ShutdownRequested,
    /// Error event
    Error { message: String },
    /// Informational message for the status line
    Info { message: String },
    /// Help lines for the log panel
    HelpInfo { lines: Vec<String> },
    /// Configuration information
    ConfigInfo { config: Config },
    /// User command from interactive input
    UserCommand { command: InteractiveCommand },
    /// Manual refresh finished
    RefreshCompleted {
        key: ResourceKey,
        result: Result<(), String>,
    },
    /// Re-analysis reply for a ticker
    ReanalysisFinished {
        ticker: String,
        result: Result<Map<String, Value>, String>,
    },
    /// Screener run accepted by the session
    JonggaRunStarted { capital: u64 },
    /// Screener run finished
    JonggaRunFinished {
        result: Result<JonggaRunResult, String>,
    },
    /// Switch the visible page
    ShowPage { page: Page },
    /// Open the detail overlay for a ticker
    OpenDetail { ticker: String },
}

/// Action channel for event processing
pub struct ActionChannel {
    /// Event sender
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    /// Event receiver
    event_rx: Option<mpsc::UnboundedReceiver<SessionEvent>>,
}

impl Clone for ActionChannel {
    fn clone(&self) -> Self {
        Self {
            event_tx: self.event_tx.clone(),
            event_rx: None, // Receivers cannot be cloned
        }
    }
}

impl ActionChannel {
    /// Create a new ActionChannel
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Send event to channel
    pub fn send_event(&self, event: SessionEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .map_err(|e| anyhow::anyhow!("Failed to send event: {}", e))
    }

    /// Get next event from channel
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        if let Some(event_rx) = &mut self.event_rx {
            event_rx.recv().await
        } else {
            None
        }
    }

    /// Get event sender for external use
    pub fn event_tx(&self) -> mpsc::UnboundedSender<SessionEvent> {
        self.event_tx.clone()
    }
}

impl Default for ActionChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::block_on;

    #[tokio::test]
    async fn test_clone_shares_sender_only() {
        let mut channel = ActionChannel::new();
        let clone = channel.clone();

        clone
            .send_event(SessionEvent::Error {
                message: "boom".to_string(),
            })
            .unwrap();

        match channel.next_event().await {
            Some(SessionEvent::Error { message }) => assert_eq!(message, "boom"),
            other => panic!("unexpected event: {:?}", other),
        }

        let mut clone = clone;
        assert!(clone.next_event().await.is_none());
    }

    #[test]
    fn test_events_arrive_in_send_order() {
        let mut channel = ActionChannel::new();

        block_on(async {
            channel
                .send_event(SessionEvent::ShowPage { page: Page::Macro })
                .unwrap();
            channel.send_event(SessionEvent::ShutdownRequested).unwrap();

            assert!(matches!(
                channel.next_event().await,
                Some(SessionEvent::ShowPage { page: Page::Macro })
            ));
            assert!(matches!(
                channel.next_event().await,
                Some(SessionEvent::ShutdownRequested)
            ));
        });
    }
}
