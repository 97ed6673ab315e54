//! Runs chart controller effects on the tokio runtime

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::controller::ChartEffect;
use crate::api::{ApiClient, ApiError, HistoryPoint};

/// Completion of an effect, fed back into the controller
#[derive(Debug, Clone, PartialEq)]
pub enum ChartEvent {
    InitElapsed {
        generation: u64,
    },
    HistoryLoaded {
        generation: u64,
        result: Result<Vec<HistoryPoint>, String>,
    },
}

/// Where the chart gets its history from
pub trait HistorySource: Send + Sync + 'static {
    fn history(&self, ticker: String, period: String)
    -> BoxFuture<'static, Result<Vec<HistoryPoint>, ApiError>>;
}

impl HistorySource for ApiClient {
    fn history(
        &self,
        ticker: String,
        period: String,
    ) -> BoxFuture<'static, Result<Vec<HistoryPoint>, ApiError>> {
        let client = self.clone();
        async move { client.history(&ticker, &period).await }.boxed()
    }
}

pub struct ChartDriver<S: HistorySource> {
    source: S,
    events: mpsc::UnboundedSender<ChartEvent>,
    init_task: Option<JoinHandle<()>>,
    fetch_task: Option<JoinHandle<()>>,
    resize_listening: bool,
}

impl<S: HistorySource> ChartDriver<S> {
    pub fn new(source: S, events: mpsc::UnboundedSender<ChartEvent>) -> Self {
        Self {
            source,
            events,
            init_task: None,
            fetch_task: None,
            resize_listening: false,
        }
    }

    /// Whether terminal resizes should be forwarded to the controller
    pub fn resize_listening(&self) -> bool {
        self.resize_listening
    }

    pub fn execute(&mut self, effects: Vec<ChartEffect>) {
        for effect in effects {
            match effect {
                ChartEffect::ScheduleInit { generation, delay } => {
                    self.cancel_init();
                    let events = self.events.clone();
                    self.init_task = Some(tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = events.send(ChartEvent::InitElapsed { generation });
                    }));
                }
                ChartEffect::CancelInit => self.cancel_init(),
                ChartEffect::FetchHistory {
                    generation,
                    ticker,
                    period,
                } => {
                    if let Some(previous) = self.fetch_task.take() {
                        previous.abort();
                    }
                    debug!("Fetching {} history for {}", period, ticker);
                    let request = self.source.history(ticker, period);
                    let events = self.events.clone();
                    self.fetch_task = Some(tokio::spawn(async move {
                        let result = request.await.map_err(|e| e.to_string());
                        let _ = events.send(ChartEvent::HistoryLoaded { generation, result });
                    }));
                }
                ChartEffect::AttachResize => self.resize_listening = true,
                ChartEffect::DetachResize => self.resize_listening = false,
            }
        }
    }

    fn cancel_init(&mut self) {
        if let Some(task) = self.init_task.take() {
            task.abort();
        }
    }
}

impl<S: HistorySource> Drop for ChartDriver<S> {
    fn drop(&mut self) {
        self.cancel_init();
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct FixedHistory(Vec<HistoryPoint>);

    impl HistorySource for FixedHistory {
        fn history(
            &self,
            _ticker: String,
            _period: String,
        ) -> BoxFuture<'static, Result<Vec<HistoryPoint>, ApiError>> {
            let points = self.0.clone();
            async move { Ok(points) }.boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut driver = ChartDriver::new(FixedHistory(Vec::new()), tx);

        driver.execute(vec![
            ChartEffect::ScheduleInit {
                generation: 1,
                delay: Duration::from_millis(150),
            },
            ChartEffect::CancelInit,
            ChartEffect::ScheduleInit {
                generation: 2,
                delay: Duration::from_millis(150),
            },
        ]);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(rx.try_recv(), Ok(ChartEvent::InitElapsed { generation: 2 }));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_history_result_tagged_with_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut driver = ChartDriver::new(FixedHistory(Vec::new()), tx);

        driver.execute(vec![
            ChartEffect::AttachResize,
            ChartEffect::FetchHistory {
                generation: 7,
                ticker: "005930".to_string(),
                period: "1y".to_string(),
            },
        ]);
        assert!(driver.resize_listening());

        assert_eq!(
            rx.recv().await,
            Some(ChartEvent::HistoryLoaded {
                generation: 7,
                result: Ok(Vec::new()),
            })
        );
    }
}
