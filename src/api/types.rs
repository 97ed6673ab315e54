//! Backend payload types
//!
//! Every optional field is modelled as `Option` (or defaulted) because the
//! backend routinely omits fields or replaces a whole indicator with an
//! `{"error": ...}` object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::ApiError;

/// Advisory recommendation from one of the two external sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Recommendation {
    #[serde(default)]
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Recommendation {
    /// Confidence on a 0-100 scale; the backend mixes 0-1 and 0-100 values
    pub fn confidence_pct(&self) -> Option<f64> {
        self.confidence
            .filter(|c| c.is_finite())
            .map(|c| if c <= 1.0 { c * 100.0 } else { c })
    }
}

/// Five-layer composite breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NiceLayers {
    #[serde(rename = "L1_technical", default)]
    pub technical: f64,
    #[serde(rename = "L2_supply", default)]
    pub supply: f64,
    #[serde(rename = "L3_sentiment", default)]
    pub sentiment: f64,
    #[serde(rename = "L4_macro", default)]
    pub macro_layer: f64,
    #[serde(rename = "L5_institutional", default)]
    pub institutional: f64,
    #[serde(default)]
    pub total: f64,
    #[serde(default = "NiceLayers::default_max_total")]
    pub max_total: f64,
}

impl NiceLayers {
    fn default_max_total() -> f64 {
        300.0
    }
}

/// A scored trading signal for one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub ticker: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_5d: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inst_5d: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contraction_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nice_layers: Option<NiceLayers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tp1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tp2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpt_recommendation: Option<Recommendation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_recommendation: Option<Recommendation>,
    /// Fields this client does not model, kept so merges never drop them
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Signal {
    /// Composite score normalised to 0-100
    pub fn composite_score(&self) -> Option<f64> {
        let from_layers = self.nice_layers.as_ref().and_then(|layers| {
            (layers.max_total > 0.0).then(|| (layers.total / layers.max_total) * 100.0)
        });

        from_layers
            .or(self.final_score)
            .filter(|score| score.is_finite())
            .map(|score| score.clamp(0.0, 100.0))
    }

    /// Display price: live price when known, else the entry price
    pub fn display_price(&self) -> Option<f64> {
        self.current_price.or(self.entry_price)
    }

    /// Shallow merge: keys present in `patch` overwrite, absent keys are kept
    pub fn merged_with(&self, patch: &Map<String, Value>) -> Result<Signal, ApiError> {
        let mut base = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => return Err(ApiError::decode("signal merge", e)),
        };

        for (key, value) in patch {
            base.insert(key.clone(), value.clone());
        }

        serde_json::from_value(Value::Object(base)).map_err(|e| ApiError::decode("signal merge", e))
    }
}

/// `GET /signals`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SignalsResponse {
    #[serde(default)]
    pub signals: Vec<Signal>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub total_filtered: Option<usize>,
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `GET /market-status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MarketStatus {
    #[serde(default)]
    pub is_open: bool,
    #[serde(default)]
    pub message: String,
}

/// `GET /market-gate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MarketGate {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub kospi: Option<Value>,
    #[serde(default)]
    pub kosdaq: Option<Value>,
    #[serde(default)]
    pub usd_krw: Option<f64>,
    #[serde(default)]
    pub gate_score: Option<f64>,
    #[serde(default)]
    pub recommendation: Option<String>,
}

impl MarketGate {
    /// Daily change of an index snapshot, when the backend provides one
    pub fn index_change(index: Option<&Value>) -> Option<f64> {
        index?.get("change_pct")?.as_f64()
    }
}

/// `GET /ai-analysis`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AiAnalysis {
    #[serde(default)]
    pub market_summary: Option<String>,
    #[serde(default)]
    pub commentary: Option<String>,
    #[serde(default)]
    pub sentiment: Option<String>,
    /// Ranked picks, best first
    #[serde(default, alias = "picks")]
    pub signals: Vec<Signal>,
    #[serde(default)]
    pub signal_date: Option<String>,
    #[serde(default)]
    pub generated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExchangeRate {
    #[serde(default)]
    pub rate: Option<f64>,
    #[serde(default)]
    pub change_pct: Option<f64>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InterestSpread {
    #[serde(default)]
    pub us_rate: Option<f64>,
    #[serde(default)]
    pub kr_rate: Option<f64>,
    #[serde(default)]
    pub spread_bp: Option<f64>,
    #[serde(default)]
    pub capital_risk: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FxReserves {
    #[serde(default)]
    pub current_reserves: Option<f64>,
    #[serde(default)]
    pub change: Option<f64>,
    #[serde(default)]
    pub change_pct: Option<f64>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Composite macro stress indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CrisisIndicator {
    #[serde(default)]
    pub crisis_score: Option<f64>,
    #[serde(default)]
    pub crisis_level: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `GET /macro-indicators`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MacroIndicators {
    #[serde(default)]
    pub exchange_rate: Option<ExchangeRate>,
    #[serde(default)]
    pub interest_spread: Option<InterestSpread>,
    #[serde(default)]
    pub fx_reserves: Option<FxReserves>,
    #[serde(default)]
    pub crisis: Option<CrisisIndicator>,
    #[serde(default)]
    pub generated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Sector {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub change_pct: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
}

/// `GET /sector-performance`; accepts both a bare list and `{"sectors": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(from = "SectorPayload")]
pub struct SectorPerformance {
    pub sectors: Vec<Sector>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SectorPayload {
    Wrapped {
        #[serde(default)]
        sectors: Vec<Sector>,
    },
    Bare(Vec<Sector>),
}

impl From<SectorPayload> for SectorPerformance {
    fn from(payload: SectorPayload) -> Self {
        match payload {
            SectorPayload::Wrapped { sectors } | SectorPayload::Bare(sectors) => Self { sectors },
        }
    }
}

/// One trading-period record from `GET /history/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ThemeAnalysis {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub outlook: Option<String>,
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub key_stocks: Vec<String>,
}

/// `GET /themes`; accepts both a bare list and `{"themes": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(from = "ThemePayload")]
pub struct ThemeList {
    pub themes: Vec<ThemeAnalysis>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ThemePayload {
    Wrapped {
        #[serde(default)]
        themes: Vec<ThemeAnalysis>,
    },
    Bare(Vec<ThemeAnalysis>),
}

impl From<ThemePayload> for ThemeList {
    fn from(payload: ThemePayload) -> Self {
        match payload {
            ThemePayload::Wrapped { themes } | ThemePayload::Bare(themes) => Self { themes },
        }
    }
}

/// Closing-bet screener grade, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
    #[serde(other)]
    Unrated,
}

impl Grade {
    pub fn label(self) -> &'static str {
        match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::Unrated => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JonggaSignal {
    pub ticker: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "JonggaSignal::default_grade")]
    pub grade: Grade,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub entry_price: Option<f64>,
    #[serde(default)]
    pub target_price: Option<f64>,
    #[serde(default)]
    pub stop_price: Option<f64>,
    #[serde(default)]
    pub quantity: Option<u64>,
    #[serde(default)]
    pub position_amount: Option<f64>,
}

impl JonggaSignal {
    fn default_grade() -> Grade {
        Grade::Unrated
    }
}

/// `GET jongga-v2`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct JonggaReport {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub capital: Option<f64>,
    #[serde(default)]
    pub signals: Vec<JonggaSignal>,
    #[serde(default)]
    pub generated_at: Option<String>,
}

impl JonggaReport {
    /// Signal count per grade in S, A, B, C order
    pub fn grade_counts(&self) -> [(Grade, usize); 4] {
        [Grade::S, Grade::A, Grade::B, Grade::C]
            .map(|grade| (grade, self.signals.iter().filter(|s| s.grade == grade).count()))
    }
}

/// `GET jongga-v2/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct JonggaStatus {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub last_run: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST jongga-v2/run`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct JonggaRunResult {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub count: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_signal() -> Signal {
        serde_json::from_value(json!({
            "ticker": "005930",
            "name": "삼성전자",
            "theme": "반도체",
            "current_price": 71200,
            "foreign_5d": 1500000,
            "time_stop": "",
            "gpt_recommendation": {"action": "HOLD", "confidence": 50, "reason": "관망"}
        }))
        .unwrap()
    }

    #[test]
    fn test_signal_tolerates_missing_fields() {
        let signal: Signal = serde_json::from_value(json!({"ticker": "000660"})).unwrap();
        assert_eq!(signal.name, "");
        assert!(signal.current_price.is_none());
        assert!(signal.composite_score().is_none());
    }

    #[test]
    fn test_merge_overwrites_present_and_keeps_absent() {
        let signal = sample_signal();
        let patch = json!({
            "gpt_recommendation": {"action": "BUY", "confidence": 0.8, "reason": "수급 개선"}
        });

        let merged = signal.merged_with(patch.as_object().unwrap()).unwrap();

        let rec = merged.gpt_recommendation.as_ref().unwrap();
        assert_eq!(rec.action, "BUY");
        assert_eq!(rec.confidence_pct(), Some(80.0));
        assert_eq!(merged.current_price, Some(71200.0));
        assert_eq!(merged.theme.as_deref(), Some("반도체"));
        assert_eq!(merged.extra.get("time_stop"), Some(&json!("")));
        // the source value is untouched
        assert_eq!(signal.gpt_recommendation.unwrap().action, "HOLD");
    }

    #[test]
    fn test_composite_score_prefers_layers() {
        let mut signal = sample_signal();
        signal.final_score = Some(42.0);
        assert_eq!(signal.composite_score(), Some(42.0));

        signal.nice_layers = Some(NiceLayers {
            technical: 100.0,
            supply: 30.0,
            sentiment: 50.0,
            macro_layer: 35.0,
            institutional: 25.0,
            total: 240.0,
            max_total: 300.0,
        });
        assert_eq!(signal.composite_score(), Some(80.0));
    }

    #[test]
    fn test_sector_payload_shapes() {
        let wrapped: SectorPerformance =
            serde_json::from_value(json!({"sectors": [{"name": "IT", "change_pct": 1.2}]}))
                .unwrap();
        let bare: SectorPerformance =
            serde_json::from_value(json!([{"name": "IT", "change_pct": 1.2}])).unwrap();
        assert_eq!(wrapped, bare);
    }

    #[test]
    fn test_unknown_grade_is_unrated() {
        let signal: JonggaSignal =
            serde_json::from_value(json!({"ticker": "005930", "grade": "D"})).unwrap();
        assert_eq!(signal.grade, Grade::Unrated);

        let report = JonggaReport {
            signals: vec![
                serde_json::from_value(json!({"ticker": "1", "grade": "S"})).unwrap(),
                serde_json::from_value(json!({"ticker": "2", "grade": "A"})).unwrap(),
                serde_json::from_value(json!({"ticker": "3", "grade": "A"})).unwrap(),
            ],
            ..JonggaReport::default()
        };
        assert_eq!(report.grade_counts()[1], (Grade::A, 2));
    }
}
