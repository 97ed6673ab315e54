use krdash::cli::{Cli, Commands};
use krdash::config::Config;
use krdash::session::SessionManager;
use krdash::{AppResult, init_file_logging, init_logging, ui};

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse_args();

    // Load configuration
    let config = Config::load_or_default(&cli.config_file);

    // CLI flags win over the configured level
    let log_level = if cli.verbose || cli.log_level != "info" {
        cli.effective_log_level()
    } else {
        config.log_level.clone()
    };

    match cli.command() {
        Commands::Dashboard => {
            // The TUI owns the terminal, so logs go to a file
            let _log_guard = init_file_logging(&log_level, &config.log.file_path)?;

            tracing::info!("KRDash Signal Dashboard starting...");
            tracing::debug!("CLI arguments: {:?}", cli);

            let mut session_manager = SessionManager::new(&cli, config)?;
            session_manager.initialize().await?;
            session_manager.run().await?;
        }
        Commands::Config { action } => {
            init_logging(&log_level)?;
            Config::handle_command(&cli.config_file, &action)?;
        }
        command => {
            init_logging(&log_level)?;
            ui::cli::run_headless(&command, &config).await?;
        }
    }

    Ok(())
}
