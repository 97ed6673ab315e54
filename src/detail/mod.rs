//! Detail overlay state
//!
//! The overlay works on its own copy of the selected signal. Re-analysis
//! results are shallow-merged onto that copy only; the list the signal came
//! from is never touched, and the copy is discarded when the overlay closes.

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::api::Signal;

/// Progress of the user-triggered re-analysis
#[derive(Debug, Clone, PartialEq)]
pub enum ReanalysisState {
    Idle,
    Running,
    Done,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct DetailView {
    original: Signal,
    merged: Signal,
    reanalysis: ReanalysisState,
}

impl DetailView {
    pub fn open(signal: Signal) -> Self {
        Self {
            merged: signal.clone(),
            original: signal,
            reanalysis: ReanalysisState::Idle,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.original.ticker
    }

    /// The signal as displayed, including merged re-analysis fields
    pub fn signal(&self) -> &Signal {
        &self.merged
    }

    /// The signal as it was when the overlay opened
    pub fn original(&self) -> &Signal {
        &self.original
    }

    pub fn reanalysis(&self) -> &ReanalysisState {
        &self.reanalysis
    }

    /// Mark a re-analysis as started; `None` when one is already running
    pub fn begin_reanalysis(&mut self) -> Option<String> {
        if self.reanalysis == ReanalysisState::Running {
            return None;
        }
        self.reanalysis = ReanalysisState::Running;
        Some(self.original.ticker.clone())
    }

    /// Apply a re-analysis outcome; results for another ticker are ignored
    pub fn apply_reanalysis(&mut self, ticker: &str, result: Result<Map<String, Value>, String>) -> bool {
        if ticker != self.original.ticker {
            return false;
        }

        match result {
            Ok(patch) => match self.merged.merged_with(&normalize_patch(patch)) {
                Ok(merged) => {
                    info!("Merged re-analysis for {}", ticker);
                    self.merged = merged;
                    self.reanalysis = ReanalysisState::Done;
                }
                Err(e) => {
                    warn!("Re-analysis for {} returned unusable data: {}", ticker, e);
                    self.reanalysis = ReanalysisState::Failed(e.to_string());
                }
            },
            Err(message) => {
                warn!("Re-analysis for {} failed: {}", ticker, message);
                self.reanalysis = ReanalysisState::Failed(message);
            }
        }
        true
    }
}

/// A bare `{action, confidence, reason}` reply is treated as the primary
/// advisory recommendation
fn normalize_patch(patch: Map<String, Value>) -> Map<String, Value> {
    let is_flat_recommendation =
        patch.contains_key("action") && !patch.contains_key("gpt_recommendation");
    if !is_flat_recommendation {
        return patch;
    }

    let mut wrapped = Map::new();
    wrapped.insert("gpt_recommendation".to_string(), Value::Object(patch));
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn samsung() -> Signal {
        serde_json::from_value(json!({
            "ticker": "005930",
            "name": "삼성전자",
            "theme": "반도체",
            "current_price": 71200,
            "entry_price": 70000,
            "gpt_recommendation": {"action": "HOLD", "confidence": 55, "reason": "관망"},
            "gemini_recommendation": {"action": "HOLD", "confidence": 60, "reason": "중립"}
        }))
        .unwrap()
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_flat_recommendation_updates_only_advice() {
        let mut view = DetailView::open(samsung());
        assert_eq!(view.begin_reanalysis().as_deref(), Some("005930"));

        let applied = view.apply_reanalysis(
            "005930",
            Ok(object(json!({"action": "BUY", "confidence": 0.8, "reason": "외국인 순매수 지속"}))),
        );

        assert!(applied);
        assert_eq!(view.reanalysis(), &ReanalysisState::Done);
        let shown = view.signal();
        let rec = shown.gpt_recommendation.as_ref().unwrap();
        assert_eq!(rec.action, "BUY");
        assert_eq!(rec.confidence_pct(), Some(80.0));
        assert_eq!(shown.current_price, Some(71200.0));
        assert_eq!(shown.theme.as_deref(), Some("반도체"));
        assert_eq!(shown.gemini_recommendation, view.original().gemini_recommendation);
        assert_eq!(view.original().gpt_recommendation.as_ref().unwrap().action, "HOLD");
    }

    #[test]
    fn test_full_record_merges_shallowly() {
        let mut view = DetailView::open(samsung());
        view.begin_reanalysis();

        view.apply_reanalysis(
            "005930",
            Ok(object(json!({
                "ticker": "005930",
                "current_price": 72000,
                "gemini_recommendation": {"action": "BUY", "confidence": 70, "reason": "실적 개선"}
            }))),
        );

        let shown = view.signal();
        assert_eq!(shown.current_price, Some(72000.0));
        assert_eq!(shown.gemini_recommendation.as_ref().unwrap().action, "BUY");
        assert_eq!(shown.gpt_recommendation.as_ref().unwrap().action, "HOLD");
        assert_eq!(shown.entry_price, Some(70000.0));
    }

    #[test]
    fn test_failure_is_local() {
        let mut view = DetailView::open(samsung());
        view.begin_reanalysis();
        assert!(view.begin_reanalysis().is_none());

        view.apply_reanalysis("005930", Err("HTTP 500".to_string()));

        assert_eq!(view.reanalysis(), &ReanalysisState::Failed("HTTP 500".to_string()));
        assert_eq!(view.signal(), view.original());
    }

    #[test]
    fn test_result_for_other_ticker_ignored() {
        let mut view = DetailView::open(samsung());
        view.begin_reanalysis();

        assert!(!view.apply_reanalysis("000660", Ok(object(json!({"action": "SELL"})))));
        assert_eq!(view.reanalysis(), &ReanalysisState::Running);
    }
}
