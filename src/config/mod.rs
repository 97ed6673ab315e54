//! Configuration management module
//!
//! Handles loading, validation, and management of application configuration.
//! The backend base URLs are resolved once at startup and never mutated.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Logging level
    pub log_level: String,

    /// File-based logging configuration
    pub log: LogConfig,

    /// Backend endpoints
    pub api: ApiConfig,

    /// Per-resource polling intervals
    #[serde(default)]
    pub poll: PollConfig,

    /// Detail chart behaviour
    #[serde(default)]
    pub chart: ChartConfig,

    /// UI-specific configuration
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Root for signal, macro, history and analysis endpoints
    pub base_url: String,

    /// Root for the jongga-v2 endpoints
    pub jongga_base_url: String,
}

/// Refresh interval per resource key, in seconds
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollConfig {
    pub signals_secs: u64,
    pub market_status_secs: u64,
    pub market_gate_secs: u64,
    pub macro_secs: u64,
    pub sectors_secs: u64,
    pub ai_analysis_secs: u64,
    pub themes_secs: u64,
    pub jongga_secs: u64,
    pub jongga_status_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Delay before building a chart, lets the overlay finish opening
    pub init_delay_ms: u64,

    /// Width used when the chart area measures zero columns
    pub fallback_width: u16,

    /// Narrowest chart the terminal surface accepts
    pub min_width: u16,

    /// History period requested for the detail chart
    pub history_period: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UiConfig {
    /// Redraw cadence in milliseconds
    pub refresh_rate_ms: u64,

    /// Enable colors in headless output
    pub enable_colors: bool,

    /// Number of log lines kept for the log panel
    pub log_capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Absolute or relative path to the rolling log file
    pub file_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log: LogConfig::default(),
            api: ApiConfig::default(),
            poll: PollConfig::default(),
            chart: ChartConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5001/api/kr".to_string(),
            jongga_base_url: "http://127.0.0.1:5001/api/kr".to_string(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            signals_secs: 300,
            market_status_secs: 60,
            market_gate_secs: 60,
            macro_secs: 60,
            sectors_secs: 60,
            ai_analysis_secs: 300,
            themes_secs: 600,
            jongga_secs: 300,
            jongga_status_secs: 30,
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            init_delay_ms: 150,
            fallback_width: 80,
            min_width: 8,
            history_period: "1y".to_string(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            refresh_rate_ms: 250,
            enable_colors: true,
            log_capacity: 200,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file_path: "logs/krdash.log".to_string(),
        }
    }
}

impl ChartConfig {
    pub fn init_delay(&self) -> Duration {
        Duration::from_millis(self.init_delay_ms)
    }
}

const HISTORY_PERIODS: [&str; 4] = ["1mo", "3mo", "6mo", "1y"];

impl Config {
    /// Load configuration from file with environment variable overrides
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        config.apply_env_overrides();

        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        // KRDASH_API_BASE_URL - backend root
        if let Ok(base_url) = env::var("KRDASH_API_BASE_URL") {
            if !base_url.trim().is_empty() {
                self.api.base_url = base_url;
            }
        }

        // KRDASH_JONGGA_BASE_URL - jongga-v2 root
        if let Ok(base_url) = env::var("KRDASH_JONGGA_BASE_URL") {
            if !base_url.trim().is_empty() {
                self.api.jongga_base_url = base_url;
            }
        }

        // KRDASH_LOG_LEVEL - logging level
        if let Ok(log_level) = env::var("KRDASH_LOG_LEVEL") {
            self.log_level = log_level;
        }

        // KRDASH_LOG_FILE_PATH - logging destination file
        if let Ok(file_path) = env::var("KRDASH_LOG_FILE_PATH") {
            if !file_path.trim().is_empty() {
                self.log.file_path = file_path;
            }
        }

        // KRDASH_POLL_SIGNALS_SECS - signal list refresh
        if let Ok(secs) = env::var("KRDASH_POLL_SIGNALS_SECS") {
            if let Ok(value) = secs.parse::<u64>() {
                self.poll.signals_secs = value;
            }
        }

        // KRDASH_POLL_MACRO_SECS - macro indicator refresh
        if let Ok(secs) = env::var("KRDASH_POLL_MACRO_SECS") {
            if let Ok(value) = secs.parse::<u64>() {
                self.poll.macro_secs = value;
            }
        }

        // KRDASH_CHART_INIT_DELAY_MS - deferred chart construction
        if let Ok(delay) = env::var("KRDASH_CHART_INIT_DELAY_MS") {
            if let Ok(value) = delay.parse::<u64>() {
                self.chart.init_delay_ms = value;
            }
        }

        // KRDASH_UI_ENABLE_COLORS - enable colors
        if let Ok(enable_colors) = env::var("KRDASH_UI_ENABLE_COLORS") {
            self.ui.enable_colors = enable_colors.parse().unwrap_or(self.ui.enable_colors);
        }
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load_from_file(path).unwrap_or_else(|err| {
            tracing::warn!("Failed to load config: {:#}, using defaults", err);
            let mut config = Self::default();
            config.apply_env_overrides();
            config.or_defaults()
        })
    }

    /// Keep this configuration only if it validates, otherwise fall back to defaults
    fn or_defaults(self) -> Self {
        match self.validate() {
            Ok(()) => self,
            Err(err) => {
                tracing::warn!("Invalid configuration: {:#}, ignoring overrides", err);
                Self::default()
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("api.base_url", &self.api.base_url),
            ("api.jongga_base_url", &self.api.jongga_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("{} must be an http(s) URL, got {:?}", name, url);
            }
        }

        let intervals = [
            ("poll.signals_secs", self.poll.signals_secs),
            ("poll.market_status_secs", self.poll.market_status_secs),
            ("poll.market_gate_secs", self.poll.market_gate_secs),
            ("poll.macro_secs", self.poll.macro_secs),
            ("poll.sectors_secs", self.poll.sectors_secs),
            ("poll.ai_analysis_secs", self.poll.ai_analysis_secs),
            ("poll.themes_secs", self.poll.themes_secs),
            ("poll.jongga_secs", self.poll.jongga_secs),
            ("poll.jongga_status_secs", self.poll.jongga_status_secs),
        ];
        for (name, secs) in intervals {
            if secs == 0 {
                anyhow::bail!("{} must be greater than 0", name);
            }
        }

        if self.chart.fallback_width < self.chart.min_width {
            anyhow::bail!(
                "chart.fallback_width ({}) must be at least chart.min_width ({})",
                self.chart.fallback_width,
                self.chart.min_width
            );
        }

        if !HISTORY_PERIODS.contains(&self.chart.history_period.as_str()) {
            anyhow::bail!(
                "chart.history_period must be one of {:?}",
                HISTORY_PERIODS
            );
        }

        if self.ui.refresh_rate_ms == 0 {
            anyhow::bail!("ui.refresh_rate_ms must be greater than 0");
        }

        if self.log.file_path.trim().is_empty() {
            anyhow::bail!("Log file path must not be empty");
        }

        Ok(())
    }

    /// Normalize a ticker to the six-digit KRX code
    pub fn normalize_ticker(ticker: &str) -> String {
        let trimmed = ticker.trim();
        if !trimmed.is_empty() && trimmed.len() < 6 && trimmed.chars().all(|c| c.is_ascii_digit()) {
            format!("{:0>6}", trimmed)
        } else {
            trimmed.to_uppercase()
        }
    }

    /// Display formatted configuration
    pub fn display(&self) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        println!("Current configuration:");
        println!("{}", content);
        Ok(())
    }

    /// Handle configuration command
    pub fn handle_command(config_file: &str, action: &Option<crate::cli::ConfigAction>) -> Result<()> {
        match action {
            Some(crate::cli::ConfigAction::Show) | None => {
                let config = Config::load_or_default(config_file);
                config.display()?;
            }
            Some(crate::cli::ConfigAction::Reset) => {
                let default_config = Config::default();
                default_config.save_to_file(config_file)?;
                println!("Configuration reset to defaults in {}", config_file);
                default_config.display()?;
            }
        }
        Ok(())
    }
}
