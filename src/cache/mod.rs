//! Polling cache layer
//!
//! Each [`Resource`] keeps the last good value for one named backend
//! resource, revalidates it on a fixed interval and on demand, and shares
//! a single in-flight request between concurrent callers.

pub mod store;

pub use store::{MarketStore, ResourceKey};

use chrono::{DateTime, Local};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::api::ApiError;

type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;
type InFlight<T> = Shared<BoxFuture<'static, Result<Arc<T>, ApiError>>>;

/// Request state of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Success,
    Error,
}

/// Point-in-time view of a resource.
///
/// `data` survives failed revalidations, so `data` and `error` can both be set.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub phase: Phase,
    pub data: Option<Arc<T>>,
    pub error: Option<ApiError>,
    pub updated_at: Option<DateTime<Local>>,
}

impl<T> Snapshot<T> {
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    /// True when there is nothing to show but an error
    pub fn is_failed_empty(&self) -> bool {
        self.data.is_none() && self.error.is_some()
    }
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            data: None,
            error: None,
            updated_at: None,
        }
    }
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            phase: self.phase,
            data: self.data.clone(),
            error: self.error.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// Change notification for a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvent {
    pub key: &'static str,
    pub phase: Phase,
}

/// The request currently allowed to write state, tagged with its generation
struct InFlightSlot<T> {
    generation: u64,
    request: Option<InFlight<T>>,
}

/// A polled, revalidating cache entry
pub struct Resource<T> {
    key: &'static str,
    interval: Duration,
    fetcher: Fetcher<T>,
    state: Arc<RwLock<Snapshot<T>>>,
    inflight: Arc<Mutex<InFlightSlot<T>>>,
    events: Option<mpsc::UnboundedSender<CacheEvent>>,
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            interval: self.interval,
            fetcher: self.fetcher.clone(),
            state: self.state.clone(),
            inflight: self.inflight.clone(),
            events: self.events.clone(),
        }
    }
}

impl<T> Resource<T>
where
    T: Send + Sync + 'static,
{
    pub fn new<F, Fut>(key: &'static str, interval: Duration, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        Self {
            key,
            interval,
            fetcher: Arc::new(move || fetch().boxed()),
            state: Arc::new(RwLock::new(Snapshot::default())),
            inflight: Arc::new(Mutex::new(InFlightSlot {
                generation: 0,
                request: None,
            })),
            events: None,
        }
    }

    /// Publish phase changes on `tx`
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<CacheEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn snapshot(&self) -> Snapshot<T> {
        self.state.read().await.clone()
    }

    /// Fetch now, or join the request already in flight for this key
    pub async fn revalidate(&self) -> Result<Arc<T>, ApiError> {
        let request = {
            let mut slot = self.inflight.lock().await;
            match slot.request.clone() {
                Some(existing) => {
                    debug!("Joining in-flight request for {}", self.key);
                    existing
                }
                None => self.start_fetch(&mut slot),
            }
        };

        request.await
    }

    /// Manual revalidation after an action known to change server state.
    ///
    /// Always issues a new request; a request already in flight was sent
    /// before the action, so its response is discarded.
    pub async fn mutate(&self) -> Result<Arc<T>, ApiError> {
        info!("Manual revalidation of {}", self.key);
        let request = {
            let mut slot = self.inflight.lock().await;
            if slot.request.is_some() {
                debug!("Superseding in-flight request for {}", self.key);
            }
            self.start_fetch(&mut slot)
        };

        request.await
    }

    /// Replace the cached value without a request; supersedes any request in flight
    pub async fn set(&self, data: T) -> Arc<T> {
        let data = Arc::new(data);
        {
            let mut slot = self.inflight.lock().await;
            slot.generation += 1;
            slot.request = None;

            let mut state = self.state.write().await;
            state.data = Some(data.clone());
            state.error = None;
            state.phase = Phase::Success;
            state.updated_at = Some(Local::now());
        }
        self.emit(Phase::Success);
        data
    }

    /// Revalidate immediately and then every `interval` until the handle drops
    pub fn spawn_polling(&self) -> PollHandle {
        let resource = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(resource.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = resource.revalidate().await {
                    warn!("Polling {} failed: {}", resource.key, e);
                }
            }
        });

        debug!("Polling {} every {:?}", self.key, self.interval);
        PollHandle {
            key: self.key,
            handle,
        }
    }

    fn start_fetch(&self, slot: &mut InFlightSlot<T>) -> InFlight<T> {
        slot.generation += 1;
        let request = self.clone().run_fetch(slot.generation).boxed().shared();
        slot.request = Some(request.clone());
        // Drive to completion even if every caller goes away
        tokio::spawn(request.clone());
        request
    }

    async fn run_fetch(self, generation: u64) -> Result<Arc<T>, ApiError> {
        {
            let slot = self.inflight.lock().await;
            if slot.generation == generation {
                self.state.write().await.phase = Phase::Loading;
                self.emit(Phase::Loading);
            }
        }

        let outcome = (self.fetcher)().await.map(Arc::new);

        let phase = {
            let mut slot = self.inflight.lock().await;
            if slot.generation != generation {
                debug!("Discarding superseded response for {}", self.key);
                return outcome;
            }
            slot.request = None;

            let mut state = self.state.write().await;
            match &outcome {
                Ok(data) => {
                    state.data = Some(data.clone());
                    state.error = None;
                    state.phase = Phase::Success;
                    state.updated_at = Some(Local::now());
                }
                Err(e) => {
                    // keep the last good value
                    state.error = Some(e.clone());
                    state.phase = Phase::Error;
                }
            }
            state.phase
        };

        self.emit(phase);

        outcome
    }

    fn emit(&self, phase: Phase) {
        if let Some(tx) = &self.events {
            let _ = tx.send(CacheEvent {
                key: self.key,
                phase,
            });
        }
    }
}

/// Background polling task; aborted when dropped
pub struct PollHandle {
    key: &'static str,
    handle: JoinHandle<()>,
}

impl PollHandle {
    pub fn key(&self) -> &'static str {
        self.key
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(
        delay: Duration,
        fail_from: usize,
    ) -> (Resource<usize>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let resource = Resource::new("test", Duration::from_secs(60), move || {
            let counter = counter.clone();
            async move {
                tokio::time::sleep(delay).await;
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n >= fail_from {
                    Err(ApiError::Status {
                        target: "test".to_string(),
                        status: StatusCode::BAD_GATEWAY,
                    })
                } else {
                    Ok(n)
                }
            }
        });
        (resource, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_revalidations_are_coalesced() {
        let (resource, calls) = counting(Duration::from_millis(100), usize::MAX);

        let (a, b) = tokio::join!(resource.revalidate(), resource.revalidate());

        assert_eq!(*a.unwrap(), 1);
        assert_eq!(*b.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // a later call issues a fresh request
        assert_eq!(*resource.revalidate().await.unwrap(), 2);
    }

    /// First call is slow and returns "old", later calls are quick and return "new"
    fn staged() -> Resource<&'static str> {
        let calls = Arc::new(AtomicUsize::new(0));
        Resource::new("staged", Duration::from_secs(60), move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok("old")
                } else {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok("new")
                }
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutate_supersedes_request_in_flight() {
        let resource = staged();
        let poll = tokio::spawn({
            let resource = resource.clone();
            async move { resource.revalidate().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(*resource.mutate().await.unwrap(), "new");
        // the earlier caller still gets its own response
        assert_eq!(*poll.await.unwrap().unwrap(), "old");

        let snapshot = resource.snapshot().await;
        assert_eq!(snapshot.data.as_deref(), Some(&"new"));
        assert_eq!(snapshot.phase, Phase::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_is_not_overwritten_by_older_request() {
        let resource = staged();
        let poll = tokio::spawn({
            let resource = resource.clone();
            async move { resource.revalidate().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        resource.set("manual").await;
        assert_eq!(*poll.await.unwrap().unwrap(), "old");

        let snapshot = resource.snapshot().await;
        assert_eq!(snapshot.data.as_deref(), Some(&"manual"));
        assert_eq!(snapshot.phase, Phase::Success);

        // the superseded request is not joined by later callers
        assert_eq!(*resource.revalidate().await.unwrap(), "new");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_stale_value() {
        let (resource, _) = counting(Duration::ZERO, 2);
        assert_eq!(resource.snapshot().await.phase, Phase::Idle);

        resource.revalidate().await.unwrap();
        assert!(resource.revalidate().await.is_err());

        let snapshot = resource.snapshot().await;
        assert_eq!(snapshot.phase, Phase::Error);
        assert_eq!(snapshot.data.as_deref(), Some(&1));
        assert!(snapshot.error.is_some());
        assert!(!snapshot.is_failed_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_runs_on_interval_until_dropped() {
        let (resource, calls) = counting(Duration::ZERO, usize::MAX);

        let handle = resource.spawn_polling();
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        drop(handle);
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_events_report_phase_changes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (resource, _) = counting(Duration::ZERO, usize::MAX);
        let resource = resource.with_events(tx);

        resource.revalidate().await.unwrap();

        assert_eq!(rx.recv().await.map(|e| e.phase), Some(Phase::Loading));
        assert_eq!(rx.recv().await.map(|e| e.phase), Some(Phase::Success));
    }
}
