//! Registry of the dashboard's polled resources

use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

use super::{CacheEvent, PollHandle, Resource};
use crate::api::{
    AiAnalysis, ApiClient, ApiError, JonggaReport, JonggaRunResult, JonggaStatus, MacroIndicators,
    MarketGate, MarketStatus, SectorPerformance, SignalsResponse, ThemeList,
};
use crate::config::PollConfig;

/// Logical name of a cached backend resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    Signals,
    MarketStatus,
    MarketGate,
    Macro,
    Sectors,
    AiAnalysis,
    Themes,
    Jongga,
    JonggaStatus,
}

impl ResourceKey {
    pub const ALL: [ResourceKey; 9] = [
        ResourceKey::Signals,
        ResourceKey::MarketStatus,
        ResourceKey::MarketGate,
        ResourceKey::Macro,
        ResourceKey::Sectors,
        ResourceKey::AiAnalysis,
        ResourceKey::Themes,
        ResourceKey::Jongga,
        ResourceKey::JonggaStatus,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKey::Signals => "signals",
            ResourceKey::MarketStatus => "market-status",
            ResourceKey::MarketGate => "market-gate",
            ResourceKey::Macro => "macro-indicators",
            ResourceKey::Sectors => "sector-performance",
            ResourceKey::AiAnalysis => "ai-analysis",
            ResourceKey::Themes => "themes",
            ResourceKey::Jongga => "jongga-v2",
            ResourceKey::JonggaStatus => "jongga-v2/status",
        }
    }

    pub fn interval(self, poll: &PollConfig) -> Duration {
        let secs = match self {
            ResourceKey::Signals => poll.signals_secs,
            ResourceKey::MarketStatus => poll.market_status_secs,
            ResourceKey::MarketGate => poll.market_gate_secs,
            ResourceKey::Macro => poll.macro_secs,
            ResourceKey::Sectors => poll.sectors_secs,
            ResourceKey::AiAnalysis => poll.ai_analysis_secs,
            ResourceKey::Themes => poll.themes_secs,
            ResourceKey::Jongga => poll.jongga_secs,
            ResourceKey::JonggaStatus => poll.jongga_status_secs,
        };
        Duration::from_secs(secs)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let key = match normalized.as_str() {
            "signals" => ResourceKey::Signals,
            "market-status" | "status" => ResourceKey::MarketStatus,
            "market-gate" | "gate" => ResourceKey::MarketGate,
            "macro-indicators" | "macro" => ResourceKey::Macro,
            "sector-performance" | "sectors" => ResourceKey::Sectors,
            "ai-analysis" | "ai" => ResourceKey::AiAnalysis,
            "themes" => ResourceKey::Themes,
            "jongga-v2" | "jongga" => ResourceKey::Jongga,
            "jongga-v2/status" | "jongga-status" => ResourceKey::JonggaStatus,
            other => return Err(format!("Unknown resource: {}", other)),
        };
        Ok(key)
    }
}

/// All polled resources, sharing one client and one event channel
#[derive(Clone)]
pub struct MarketStore {
    client: ApiClient,
    pub signals: Resource<SignalsResponse>,
    pub market_status: Resource<MarketStatus>,
    pub market_gate: Resource<MarketGate>,
    pub macro_indicators: Resource<MacroIndicators>,
    pub sectors: Resource<SectorPerformance>,
    pub ai_analysis: Resource<AiAnalysis>,
    pub themes: Resource<ThemeList>,
    pub jongga: Resource<JonggaReport>,
    pub jongga_status: Resource<JonggaStatus>,
}

macro_rules! resource {
    ($client:expr, $poll:expr, $events:expr, $key:expr, |$c:ident| $call:expr) => {{
        let client = $client.clone();
        Resource::new($key.as_str(), $key.interval($poll), move || {
            let $c = client.clone();
            async move { $call.await }
        })
        .with_events($events.clone())
    }};
}

impl MarketStore {
    pub fn new(
        client: ApiClient,
        poll: &PollConfig,
        events: mpsc::UnboundedSender<CacheEvent>,
    ) -> Self {
        Self {
            signals: resource!(client, poll, events, ResourceKey::Signals, |c| c.signals()),
            market_status: resource!(client, poll, events, ResourceKey::MarketStatus, |c| c
                .market_status()),
            market_gate: resource!(client, poll, events, ResourceKey::MarketGate, |c| c
                .market_gate()),
            macro_indicators: resource!(client, poll, events, ResourceKey::Macro, |c| c
                .macro_indicators()),
            sectors: resource!(client, poll, events, ResourceKey::Sectors, |c| c
                .sector_performance()),
            ai_analysis: resource!(client, poll, events, ResourceKey::AiAnalysis, |c| c
                .ai_analysis(false)),
            themes: resource!(client, poll, events, ResourceKey::Themes, |c| c.themes()),
            jongga: resource!(client, poll, events, ResourceKey::Jongga, |c| c.jongga_latest()),
            jongga_status: resource!(client, poll, events, ResourceKey::JonggaStatus, |c| c
                .jongga_status()),
            client,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Start one poller per resource; polling stops when the handles drop
    pub fn start_polling(&self) -> Vec<PollHandle> {
        info!("Starting pollers for {} resources", ResourceKey::ALL.len());
        vec![
            self.signals.spawn_polling(),
            self.market_status.spawn_polling(),
            self.market_gate.spawn_polling(),
            self.macro_indicators.spawn_polling(),
            self.sectors.spawn_polling(),
            self.ai_analysis.spawn_polling(),
            self.themes.spawn_polling(),
            self.jongga.spawn_polling(),
            self.jongga_status.spawn_polling(),
        ]
    }

    /// Manually revalidate one resource
    pub async fn refresh(&self, key: ResourceKey) -> Result<(), ApiError> {
        match key {
            ResourceKey::Signals => self.signals.mutate().await.map(drop),
            ResourceKey::MarketStatus => self.market_status.mutate().await.map(drop),
            ResourceKey::MarketGate => self.market_gate.mutate().await.map(drop),
            ResourceKey::Macro => self.macro_indicators.mutate().await.map(drop),
            ResourceKey::Sectors => self.sectors.mutate().await.map(drop),
            ResourceKey::AiAnalysis => self.ai_analysis.mutate().await.map(drop),
            ResourceKey::Themes => self.themes.mutate().await.map(drop),
            ResourceKey::Jongga => self.jongga.mutate().await.map(drop),
            ResourceKey::JonggaStatus => self.jongga_status.mutate().await.map(drop),
        }
    }

    /// Ask the backend to regenerate the AI analysis and cache the result
    pub async fn regenerate_ai_analysis(&self) -> Result<(), ApiError> {
        let fresh = self.client.ai_analysis(true).await?;
        self.ai_analysis.set(fresh).await;
        Ok(())
    }

    /// Run the closing-bet screener, then revalidate both jongga resources
    pub async fn run_jongga(&self, capital: u64) -> Result<JonggaRunResult, ApiError> {
        let result = self.client.jongga_run(capital).await?;

        let (latest, status) = tokio::join!(self.jongga.mutate(), self.jongga_status.mutate());
        latest?;
        status?;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_key_parsing() {
        for key in ResourceKey::ALL {
            assert_eq!(key.as_str().parse::<ResourceKey>(), Ok(key));
        }
        assert_eq!("macro".parse::<ResourceKey>(), Ok(ResourceKey::Macro));
        assert!("watchlist".parse::<ResourceKey>().is_err());
    }

    #[test]
    fn test_default_intervals() {
        let poll = PollConfig::default();
        assert_eq!(ResourceKey::Signals.interval(&poll), Duration::from_secs(300));
        assert_eq!(ResourceKey::MarketStatus.interval(&poll), Duration::from_secs(60));
        assert_eq!(ResourceKey::Macro.interval(&poll), Duration::from_secs(60));
    }
}
