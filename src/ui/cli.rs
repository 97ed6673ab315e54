//! Simple CLI output implementation
//!
//! Prints one-shot views of backend resources for the non-interactive
//! subcommands.

use anyhow::{Context, Result, bail};
use colored::{ColoredString, Colorize};

use crate::api::{
    ApiClient, Grade, JonggaReport, JonggaStatus, MacroIndicators, SectorPerformance, Signal,
};
use crate::chart::prepare_series;
use crate::cli::{Commands, JonggaAction};
use crate::config::Config;
use crate::format::{
    FlowDirection, PLACEHOLDER, format_flow, format_grouped, format_percent, format_price,
    placeholder,
};

/// Run a non-interactive subcommand against the backend
pub async fn run_headless(command: &Commands, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.api).context("Failed to build API client")?;

    match command {
        Commands::Signals => {
            let response = client.signals().await.context("Failed to load signals")?;
            display_signals(&response.signals, response.message.as_deref());
        }
        Commands::Macro => {
            let indicators = client
                .macro_indicators()
                .await
                .context("Failed to load macro indicators")?;
            let sectors = client
                .sector_performance()
                .await
                .context("Failed to load sector performance")?;
            display_macro(&indicators, &sectors);
        }
        Commands::History { ticker, period } => {
            let points = client
                .history(ticker, period)
                .await
                .with_context(|| format!("Failed to load history for {}", ticker))?;
            display_history(ticker, period, &points);
        }
        Commands::Analyze { ticker } => {
            let reply = client
                .analyze_stock(ticker)
                .await
                .with_context(|| format!("Re-analysis for {} failed", ticker))?;
            println!("🔎 Re-analysis for {}", ticker.bold());
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        Commands::Jongga { action } => match action.clone().unwrap_or(JonggaAction::Show) {
            JonggaAction::Show => {
                let report = client
                    .jongga_latest()
                    .await
                    .context("Failed to load screener result")?;
                display_jongga(&report);
            }
            JonggaAction::Status => {
                let status = client
                    .jongga_status()
                    .await
                    .context("Failed to load screener status")?;
                display_jongga_status(&status);
            }
            JonggaAction::Run { capital } => {
                let result = client
                    .jongga_run(capital)
                    .await
                    .context("Failed to start screener run")?;
                println!(
                    "🚀 Screener run: {} ({} picks)",
                    result
                        .message
                        .or(result.status)
                        .unwrap_or_else(|| "accepted".to_string()),
                    placeholder(result.count, |c| c.to_string())
                );
            }
        },
        Commands::Dashboard | Commands::Config { .. } => {
            bail!("{:?} is not a headless command", command);
        }
    }

    Ok(())
}

fn signed(text: String, value: Option<f64>) -> ColoredString {
    // KRX convention: rising red, falling blue
    match value {
        Some(v) if v > 0.0 => text.red(),
        Some(v) if v < 0.0 => text.blue(),
        _ => text.normal(),
    }
}

fn flow(value: Option<f64>) -> ColoredString {
    let display = format_flow(value);
    match display.direction {
        FlowDirection::Inflow => display.text.green(),
        FlowDirection::Outflow => display.text.red(),
        FlowDirection::Flat => display.text.normal(),
    }
}

/// Signals ordered by composite score, best first
pub fn display_signals(signals: &[Signal], message: Option<&str>) {
    println!("📋 Signals");
    if signals.is_empty() {
        println!("   {}", message.unwrap_or("No signals"));
        return;
    }

    let mut ordered: Vec<&Signal> = signals.iter().collect();
    ordered.sort_by(|a, b| match (a.composite_score(), b.composite_score()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    println!(
        "   {:>3} {:<8} {:<16} {:>12} {:>8} {:>9} {:>9} {:>5}",
        "#", "Ticker", "Name", "Price", "Return", "Foreign", "Inst", "Score"
    );
    for (i, signal) in ordered.iter().enumerate() {
        let name: String = signal.name.chars().take(16).collect();
        println!(
            "   {:>3} {:<8} {:<16} {:>12} {:>8} {:>9} {:>9} {:>5}",
            i + 1,
            signal.ticker,
            name,
            format_price(signal.display_price()),
            signed(format_percent(signal.return_pct), signal.return_pct),
            flow(signal.foreign_5d),
            flow(signal.inst_5d),
            placeholder(signal.composite_score(), |s| format!("{:.0}", s)),
        );
    }
}

fn display_macro(indicators: &MacroIndicators, sectors: &SectorPerformance) {
    println!("🌐 Macro indicators");

    match &indicators.exchange_rate {
        Some(fx) if fx.error.is_some() => {
            println!("   USD/KRW       {}", fx.error.as_deref().unwrap_or_default().red())
        }
        Some(fx) => println!(
            "   USD/KRW       {} {} [{}]",
            placeholder(fx.rate, |r| format!("{:.2}", r)),
            signed(format_percent(fx.change_pct), fx.change_pct),
            fx.risk_level.as_deref().unwrap_or(PLACEHOLDER)
        ),
        None => println!("   USD/KRW       {}", PLACEHOLDER),
    }

    match &indicators.interest_spread {
        Some(spread) if spread.error.is_some() => println!(
            "   Rate spread   {}",
            spread.error.as_deref().unwrap_or_default().red()
        ),
        Some(spread) => println!(
            "   Rate spread   US {} / KR {} = {} [{}]",
            placeholder(spread.us_rate, |r| format!("{:.2}%", r)),
            placeholder(spread.kr_rate, |r| format!("{:.2}%", r)),
            placeholder(spread.spread_bp, |bp| format!("{:+.0}bp", bp)),
            spread.capital_risk.as_deref().unwrap_or(PLACEHOLDER)
        ),
        None => println!("   Rate spread   {}", PLACEHOLDER),
    }

    match &indicators.fx_reserves {
        Some(reserves) if reserves.error.is_some() => println!(
            "   FX reserves   {}",
            reserves.error.as_deref().unwrap_or_default().red()
        ),
        Some(reserves) => println!(
            "   FX reserves   {} {} {}",
            placeholder(reserves.current_reserves, format_grouped),
            reserves.unit.as_deref().unwrap_or_default(),
            signed(format_percent(reserves.change_pct), reserves.change_pct)
        ),
        None => println!("   FX reserves   {}", PLACEHOLDER),
    }

    match &indicators.crisis {
        Some(crisis) => println!(
            "   Crisis        {} {}",
            placeholder(crisis.crisis_score, |s| format!("{:.0}/100", s)),
            crisis.crisis_level.as_deref().unwrap_or(PLACEHOLDER)
        ),
        None => println!("   Crisis        {}", PLACEHOLDER),
    }

    println!();
    println!("📊 Sectors");
    if sectors.sectors.is_empty() {
        println!("   (No sector data)");
    }
    for sector in &sectors.sectors {
        println!(
            "   {:<20} {:>8}",
            sector.name,
            signed(format_percent(sector.change_pct), sector.change_pct)
        );
    }
}

fn display_history(ticker: &str, period: &str, points: &[crate::api::HistoryPoint]) {
    let candles = prepare_series(points);
    println!("🕯️  {} ({}) {} candles", ticker.bold(), period, candles.len());
    if candles.is_empty() {
        println!("   (No price history)");
        return;
    }

    println!(
        "   {:<10} {:>10} {:>10} {:>10} {:>10} {:>14}",
        "Date", "Open", "High", "Low", "Close", "Volume"
    );
    for candle in &candles {
        let close = format_grouped(candle.close);
        println!(
            "   {:<10} {:>10} {:>10} {:>10} {:>10} {:>14}",
            candle.date.format("%Y-%m-%d"),
            format_grouped(candle.open),
            format_grouped(candle.high),
            format_grouped(candle.low),
            if candle.is_rising() { close.red() } else { close.blue() },
            format_grouped(candle.volume),
        );
    }
}

fn grade_label(grade: Grade) -> ColoredString {
    match grade {
        Grade::S => grade.label().magenta().bold(),
        Grade::A => grade.label().red().bold(),
        Grade::B => grade.label().yellow(),
        Grade::C => grade.label().normal(),
        Grade::Unrated => grade.label().dimmed(),
    }
}

fn display_jongga(report: &JonggaReport) {
    let counts = report
        .grade_counts()
        .iter()
        .map(|(grade, count)| format!("{} {}", grade.label(), count))
        .collect::<Vec<_>>()
        .join(" · ");
    println!(
        "🎯 Closing-bet screener {}  capital {}  [{}]",
        report.date.as_deref().unwrap_or(PLACEHOLDER),
        placeholder(report.capital, format_grouped),
        counts
    );

    if report.signals.is_empty() {
        println!("   (No picks)");
        return;
    }

    for signal in &report.signals {
        println!(
            "   {:>1} {:<8} {:<16} entry {:>10} target {:>10} stop {:>10} qty {}",
            grade_label(signal.grade),
            signal.ticker,
            signal.name.chars().take(16).collect::<String>(),
            format_price(signal.entry_price),
            format_price(signal.target_price),
            format_price(signal.stop_price),
            placeholder(signal.quantity, |q| q.to_string()),
        );
    }
}

fn display_jongga_status(status: &JonggaStatus) {
    let state = if status.running {
        "running".yellow()
    } else {
        "idle".green()
    };
    println!("🎯 Screener {}", state);
    println!(
        "   Last run: {}",
        status.last_run.as_deref().unwrap_or(PLACEHOLDER)
    );
    if let Some(message) = &status.message {
        println!("   {}", message);
    }
}
