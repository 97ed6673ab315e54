//! Command Line Interface module
//!
//! Implements the CLI commands and argument parsing for KRDash.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "krdash")]
#[command(about = "KRDash Signal Dashboard")]
#[command(long_about = "A terminal dashboard for KR-market trading signals, macro indicators and charts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    #[arg(long, default_value = "config.toml")]
    pub config_file: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the interactive dashboard
    #[command(hide = true)]
    Dashboard,

    /// Print the current signal list
    Signals,

    /// Print macro indicators and sector performance
    Macro,

    /// Print price history for a ticker
    History {
        /// Six-digit KRX ticker
        ticker: String,

        /// History period (1mo, 3mo, 6mo, 1y)
        #[arg(long, default_value = "1y")]
        period: String,
    },

    /// Request a fresh AI re-analysis for a ticker
    Analyze {
        /// Six-digit KRX ticker
        ticker: String,
    },

    /// Closing-bet screener (jongga v2)
    Jongga {
        #[command(subcommand)]
        action: Option<JonggaAction>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Dashboard
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum JonggaAction {
    /// Show the latest screener result
    Show,

    /// Show screener run status
    Status,

    /// Run the screener now
    Run {
        /// Capital to allocate, in KRW
        #[arg(long)]
        capital: u64,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the actual command, using default if none provided
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or_default()
    }

    /// Check if we're running the interactive dashboard
    pub fn is_dashboard_mode(&self) -> bool {
        matches!(self.command(), Commands::Dashboard)
    }

    /// Adjust log level based on verbose flag
    pub fn effective_log_level(&self) -> String {
        if self.verbose {
            "debug".to_string()
        } else {
            self.log_level.clone()
        }
    }
}
