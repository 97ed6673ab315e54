//! End-to-end chart lifecycle: controller, effect driver and a mock history endpoint

use std::time::Duration;

use chrono::NaiveDate;
use krdash::api::ApiClient;
use krdash::chart::{
    ChartController, ChartDriver, ChartEvent, ChartFault, ChartPhase, ChartSettings,
    TerminalChartFactory,
};
use krdash::config::{ApiConfig, ChartConfig};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    factory: TerminalChartFactory,
    controller: ChartController<TerminalChartFactory>,
    driver: ChartDriver<ApiClient>,
    events: mpsc::UnboundedReceiver<ChartEvent>,
}

impl Harness {
    fn new(server: &MockServer) -> Self {
        let client = ApiClient::new(&ApiConfig {
            base_url: format!("{}/api/kr", server.uri()),
            jongga_base_url: format!("{}/api/kr", server.uri()),
        })
        .expect("client should build");

        let config = ChartConfig {
            init_delay_ms: 20,
            ..ChartConfig::default()
        };
        let factory = TerminalChartFactory::new(config.min_width);
        let controller = ChartController::new(factory.clone(), ChartSettings::from(&config));
        let (tx, events) = mpsc::unbounded_channel();

        Self {
            factory,
            controller,
            driver: ChartDriver::new(client, tx),
            events,
        }
    }

    fn open(&mut self, ticker: &str) {
        let effects = self.controller.open(ticker);
        self.driver.execute(effects);
    }

    fn mount(&mut self, width: u16) {
        let effects = self.controller.container_mounted(width);
        self.driver.execute(effects);
    }

    /// Feed completions back until `done` holds or nothing arrives for a second
    async fn pump_until(&mut self, done: impl Fn(&ChartPhase) -> bool) {
        while !done(self.controller.phase()) {
            let event = tokio::time::timeout(Duration::from_secs(1), self.events.recv())
                .await
                .expect("chart event should arrive")
                .expect("driver channel open");

            let effects = match event {
                ChartEvent::InitElapsed { generation } => self.controller.init_elapsed(generation),
                ChartEvent::HistoryLoaded { generation, result } => {
                    self.controller.history_loaded(generation, result)
                }
            };
            self.driver.execute(effects);
        }
    }
}

fn bar(date: &str, close: f64) -> Value {
    json!({"date": date, "open": close - 100.0, "high": close + 200.0, "low": close - 300.0, "close": close})
}

async fn mount_history(server: &MockServer, ticker: &str, body: Value, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(format!("/api/kr/history/{ticker}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body).set_delay(delay))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_open_loads_sorted_history_into_one_chart() {
    let server = MockServer::start().await;
    mount_history(
        &server,
        "005930",
        json!([
            bar("2026-10-17", 71800.0),
            bar("not-a-date", 1.0),
            bar("2026-10-15", 70100.0),
            bar("2026-10-16", 71000.0)
        ]),
        Duration::ZERO,
    )
    .await;

    let mut harness = Harness::new(&server);
    harness.open("005930");
    assert_eq!(harness.controller.phase(), &ChartPhase::AwaitingContainer);

    harness.mount(60);
    assert_eq!(harness.controller.phase(), &ChartPhase::Initializing);

    harness.pump_until(|p| *p == ChartPhase::Ready).await;

    let chart = harness.controller.chart().expect("chart instance");
    let dates: Vec<NaiveDate> = chart.candles().iter().map(|c| c.date).collect();
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
        ]
    );
    assert!(harness.driver.resize_listening());
    assert_eq!(harness.factory.live_instances(), 1);
}

#[tokio::test]
async fn test_switching_ticker_mid_load_shows_only_new_data() {
    let server = MockServer::start().await;
    mount_history(
        &server,
        "005930",
        json!([bar("2026-10-16", 71000.0)]),
        Duration::from_millis(300),
    )
    .await;
    mount_history(
        &server,
        "000660",
        json!([bar("2026-10-16", 185000.0), bar("2026-10-17", 187500.0)]),
        Duration::ZERO,
    )
    .await;

    let mut harness = Harness::new(&server);
    harness.open("005930");
    harness.mount(60);
    harness.pump_until(|p| *p == ChartPhase::Loading).await;

    harness.open("000660");
    assert_eq!(harness.factory.live_instances(), 0);
    harness.pump_until(|p| *p == ChartPhase::Ready).await;

    assert_eq!(harness.controller.selection(), Some("000660"));
    let closes: Vec<f64> = harness
        .controller
        .chart()
        .expect("chart instance")
        .candles()
        .iter()
        .map(|c| c.close)
        .collect();
    assert_eq!(closes, vec![185000.0, 187500.0]);
    assert_eq!(harness.factory.live_instances(), 1);

    // a late reply for the first ticker must not replace the data
    tokio::time::sleep(Duration::from_millis(400)).await;
    while let Ok(event) = harness.events.try_recv() {
        if let ChartEvent::HistoryLoaded { generation, result } = event {
            harness.controller.history_loaded(generation, result);
        }
    }
    assert_eq!(harness.controller.phase(), &ChartPhase::Ready);
    assert_eq!(
        harness.controller.chart().map(|c| c.candles().len()),
        Some(2)
    );
}

#[tokio::test]
async fn test_history_failure_keeps_chart_visible() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/kr/history/035720"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut harness = Harness::new(&server);
    harness.open("035720");
    harness.mount(40);
    harness
        .pump_until(|p| matches!(p, ChartPhase::Error(_)))
        .await;

    assert!(matches!(
        harness.controller.phase(),
        ChartPhase::Error(ChartFault::Data(_))
    ));
    assert!(harness.controller.chart().is_some());
    assert_eq!(harness.factory.live_instances(), 1);
}

#[tokio::test]
async fn test_close_before_init_never_builds_a_chart() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let mut harness = Harness::new(&server);
    harness.open("005930");
    harness.mount(60);

    let effects = harness.controller.close();
    harness.driver.execute(effects);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(harness.events.try_recv().is_err());
    assert_eq!(harness.controller.phase(), &ChartPhase::Closed);
    assert_eq!(harness.factory.live_instances(), 0);
    assert!(!harness.driver.resize_listening());
}
