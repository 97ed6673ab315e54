//! REST client for the signal backend

use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, HeaderMap, HeaderValue, PRAGMA};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use super::error::ApiError;
use super::types::{
    AiAnalysis, HistoryPoint, JonggaReport, JonggaRunResult, JonggaStatus, MacroIndicators,
    MarketGate, MarketStatus, SectorPerformance, SignalsResponse, ThemeList,
};
use crate::config::ApiConfig;

/// Backend REST client.
///
/// One request per call: no retry, no timeout, no local caching. Every
/// request asks intermediaries not to cache so reads reflect server state.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    jongga_base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::transport(&config.base_url, e))?;

        Ok(Self {
            base_url: trim_base(&config.base_url),
            jongga_base_url: trim_base(&config.jongga_base_url),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /signals`
    pub async fn signals(&self) -> Result<SignalsResponse, ApiError> {
        let response: SignalsResponse = self.get_json(&self.url("signals")).await?;
        debug!("Fetched {} signals", response.signals.len());
        Ok(response)
    }

    /// `GET /market-status`
    pub async fn market_status(&self) -> Result<MarketStatus, ApiError> {
        self.get_json(&self.url("market-status")).await
    }

    /// `GET /market-gate`
    pub async fn market_gate(&self) -> Result<MarketGate, ApiError> {
        self.get_json(&self.url("market-gate")).await
    }

    /// `GET /ai-analysis`, optionally forcing the backend to regenerate
    pub async fn ai_analysis(&self, force_refresh: bool) -> Result<AiAnalysis, ApiError> {
        let query: &[(&str, &str)] = if force_refresh { &[("refresh", "true")] } else { &[] };
        self.get_query(&self.url("ai-analysis"), query).await
    }

    /// `GET /macro-indicators`
    pub async fn macro_indicators(&self) -> Result<MacroIndicators, ApiError> {
        self.get_json(&self.url("macro-indicators")).await
    }

    /// `GET /sector-performance`
    pub async fn sector_performance(&self) -> Result<SectorPerformance, ApiError> {
        self.get_json(&self.url("sector-performance")).await
    }

    /// `GET /history/{ticker}?period=..`; order of the returned points is not guaranteed
    pub async fn history(&self, ticker: &str, period: &str) -> Result<Vec<HistoryPoint>, ApiError> {
        let ticker = ticker.trim();
        if ticker.is_empty() {
            return Err(ApiError::InvalidRequest("ticker must not be empty".to_string()));
        }
        // Tickers become a path segment
        if !ticker.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ApiError::InvalidRequest(format!("malformed ticker {:?}", ticker)));
        }

        let url = self.url(&format!("history/{ticker}"));
        let points: Vec<HistoryPoint> = self.get_query(&url, &[("period", period)]).await?;
        debug!("Fetched {} history points for {}", points.len(), ticker);
        Ok(points)
    }

    /// `POST /analyze-stock`; returns the raw object so callers can shallow-merge it
    pub async fn analyze_stock(&self, ticker: &str) -> Result<Map<String, Value>, ApiError> {
        let ticker = ticker.trim();
        if ticker.is_empty() {
            return Err(ApiError::InvalidRequest("ticker must not be empty".to_string()));
        }

        let result: Map<String, Value> = self
            .post_json(&self.url("analyze-stock"), &json!({ "ticker": ticker }))
            .await?;
        info!("Re-analysis completed for {}", ticker);
        Ok(result)
    }

    /// `GET /themes`
    pub async fn themes(&self) -> Result<ThemeList, ApiError> {
        self.get_json(&self.url("themes")).await
    }

    /// `GET jongga-v2`
    pub async fn jongga_latest(&self) -> Result<JonggaReport, ApiError> {
        self.get_json(&self.jongga_url("")).await
    }

    /// `GET jongga-v2/status`
    pub async fn jongga_status(&self) -> Result<JonggaStatus, ApiError> {
        self.get_json(&self.jongga_url("/status")).await
    }

    /// `POST jongga-v2/run`; the screener runs synchronously on the server
    pub async fn jongga_run(&self, capital: u64) -> Result<JonggaRunResult, ApiError> {
        if capital == 0 {
            return Err(ApiError::InvalidRequest("capital must be greater than 0".to_string()));
        }

        let result: JonggaRunResult = self
            .post_json(&self.jongga_url("/run"), &json!({ "capital": capital }))
            .await?;
        info!("Jongga screener run finished: {:?}", result.status);
        Ok(result)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn jongga_url(&self, suffix: &str) -> String {
        format!("{}/jongga-v2{}", self.jongga_base_url, suffix)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        self.get_query(url, &[]).await
    }

    async fn get_query<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| ApiError::transport(url, e))?;

        Self::decode(url, response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!("POST {}", url);

        let payload = serde_json::to_vec(body).map_err(|e| ApiError::encode(url, e))?;
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| ApiError::transport(url, e))?;

        Self::decode(url, response).await
    }

    async fn decode<T: DeserializeOwned>(url: &str, response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                target: url.to_string(),
                status,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::transport(url, e))?;

        serde_json::from_slice(&body).map_err(|e| ApiError::decode(url, e))
    }
}

fn trim_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: base.to_string(),
            jongga_base_url: "http://127.0.0.1:5001/api/".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let api = client("http://localhost:5001/api/kr/");
        assert_eq!(api.base_url(), "http://localhost:5001/api/kr");
        assert_eq!(api.url("signals"), "http://localhost:5001/api/kr/signals");
        assert_eq!(api.jongga_url("/run"), "http://127.0.0.1:5001/api/jongga-v2/run");
    }

    #[tokio::test]
    async fn test_empty_ticker_rejected_without_request() {
        let api = client("http://localhost:1");
        let err = api.history("  ", "1y").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_unencodable_body_is_an_encode_error() {
        use std::collections::BTreeMap;

        let api = client("http://localhost:1");
        let body = BTreeMap::from([((1u8, 2u8), 3u8)]);
        let err = api
            .post_json::<_, Value>(&api.url("analyze-stock"), &body)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Encode { .. }));
        assert!(err.target().unwrap_or_default().ends_with("/analyze-stock"));
    }
}
