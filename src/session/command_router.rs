//! Command Router for interactive command processing

use anyhow::Result;
use tokio::sync::mpsc;

use crate::cache::ResourceKey;
use crate::config::Config;
use crate::ui::Page;

/// Interactive commands for the terminal session
#[derive(Debug, Clone, PartialEq)]
pub enum InteractiveCommand {
    /// Revalidate one resource, or all when `None`
    Refresh { target: Option<ResourceKey> },
    /// Request a fresh AI re-analysis
    Analyze { ticker: String },
    /// Open the detail overlay for a ticker
    Open { ticker: String },
    /// Switch page
    Page { page: Page },
    /// Run the closing-bet screener
    JonggaRun { capital: u64 },
    /// Show the active configuration
    Config,
    /// Show help
    Help,
    /// Quit the application
    Quit,
}

/// Palette entry for a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub trigger: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
}

pub const COMMAND_SPECS: &[CommandSpec] = &[
    CommandSpec {
        trigger: "/refresh",
        usage: "[resource|all]",
        description: "Revalidate cached data now",
    },
    CommandSpec {
        trigger: "/open",
        usage: "<ticker>",
        description: "Open the detail view for a ticker",
    },
    CommandSpec {
        trigger: "/analyze",
        usage: "<ticker>",
        description: "Request a fresh AI re-analysis",
    },
    CommandSpec {
        trigger: "/page",
        usage: "<signals|macro|ai|themes|jongga>",
        description: "Switch page",
    },
    CommandSpec {
        trigger: "/jongga",
        usage: "run <capital>",
        description: "Run the closing-bet screener",
    },
    CommandSpec {
        trigger: "/config",
        usage: "",
        description: "Show configuration",
    },
    CommandSpec {
        trigger: "/help",
        usage: "",
        description: "Show this help",
    },
    CommandSpec {
        trigger: "/quit",
        usage: "",
        description: "Exit the application",
    },
];

/// Command router for processing interactive commands
pub struct CommandRouter {
    /// Command input channel
    command_tx: mpsc::UnboundedSender<InteractiveCommand>,
    /// Command input receiver
    command_rx: Option<mpsc::UnboundedReceiver<InteractiveCommand>>,
}

impl CommandRouter {
    /// Create a new CommandRouter
    pub fn new() -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        Self {
            command_tx,
            command_rx: Some(command_rx),
        }
    }

    /// Send command to router
    pub fn send_command(&self, command: InteractiveCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|e| anyhow::anyhow!("Failed to send command: {}", e))
    }

    /// Get next command from input
    pub async fn next_command(&mut self) -> Option<InteractiveCommand> {
        if let Some(command_rx) = &mut self.command_rx {
            command_rx.recv().await
        } else {
            None
        }
    }

    /// Parse interactive command from string input
    pub fn parse_interactive_command(input: &str) -> Result<Option<InteractiveCommand>> {
        let input = input.trim();

        if input.is_empty() {
            return Ok(None);
        }

        let parts: Vec<&str> = input.split_whitespace().collect();

        match parts[0] {
            "/refresh" | "/r" => match parts.get(1) {
                None | Some(&"all") => Ok(Some(InteractiveCommand::Refresh { target: None })),
                Some(name) => {
                    let key = name.parse::<ResourceKey>().map_err(|e| anyhow::anyhow!(e))?;
                    Ok(Some(InteractiveCommand::Refresh { target: Some(key) }))
                }
            },
            "/analyze" => {
                if parts.len() < 2 {
                    return Err(anyhow::anyhow!("Usage: /analyze <ticker>"));
                }
                Ok(Some(InteractiveCommand::Analyze {
                    ticker: Config::normalize_ticker(parts[1]),
                }))
            }
            "/open" | "/show" => {
                if parts.len() < 2 {
                    return Err(anyhow::anyhow!("Usage: /open <ticker>"));
                }
                Ok(Some(InteractiveCommand::Open {
                    ticker: Config::normalize_ticker(parts[1]),
                }))
            }
            "/page" => {
                if parts.len() < 2 {
                    return Err(anyhow::anyhow!(
                        "Usage: /page <signals|macro|ai|themes|jongga>"
                    ));
                }
                let page = parts[1].parse::<Page>().map_err(|e| anyhow::anyhow!(e))?;
                Ok(Some(InteractiveCommand::Page { page }))
            }
            "/jongga" => {
                if parts.len() == 3 && parts[1] == "run" {
                    let capital = parts[2]
                        .replace(',', "")
                        .parse::<u64>()
                        .ok()
                        .filter(|c| *c > 0)
                        .ok_or_else(|| anyhow::anyhow!("Invalid capital: {}", parts[2]))?;
                    Ok(Some(InteractiveCommand::JonggaRun { capital }))
                } else if parts.len() == 1 {
                    Ok(Some(InteractiveCommand::Page { page: Page::Jongga }))
                } else {
                    Err(anyhow::anyhow!("Usage: /jongga run <capital>"))
                }
            }
            "/config" => Ok(Some(InteractiveCommand::Config)),
            "/help" | "?" => Ok(Some(InteractiveCommand::Help)),
            "/quit" | "/exit" | "/q" => Ok(Some(InteractiveCommand::Quit)),
            _ => Err(anyhow::anyhow!(
                "Unknown command: {}. Type '/help' for available commands.",
                parts[0]
            )),
        }
    }

    /// Interactive command help lines
    pub fn help_messages() -> Vec<String> {
        let mut lines = vec!["KRDash Interactive Commands:".to_string()];
        for spec in COMMAND_SPECS {
            let head = format!("{} {}", spec.trigger, spec.usage);
            lines.push(format!("  {:<44} - {}", head.trim_end(), spec.description));
        }
        lines.push("Keys: Tab/Shift+Tab page, ↑/↓ select, Enter detail, r re-analyze, Esc close".to_string());
        lines
    }

    /// Palette entries matching the typed prefix
    pub fn suggestions(prefix: &str) -> Vec<&'static CommandSpec> {
        let head = prefix.split_whitespace().next().unwrap_or("");
        COMMAND_SPECS
            .iter()
            .filter(|spec| spec.trigger.starts_with(head))
            .collect()
    }
}

impl Default for CommandRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Option<InteractiveCommand> {
        CommandRouter::parse_interactive_command(input).unwrap()
    }

    #[test]
    fn test_refresh_targets() {
        assert_eq!(
            parse("/refresh"),
            Some(InteractiveCommand::Refresh { target: None })
        );
        assert_eq!(
            parse("/refresh macro"),
            Some(InteractiveCommand::Refresh {
                target: Some(ResourceKey::Macro)
            })
        );
        assert!(CommandRouter::parse_interactive_command("/refresh watchlist").is_err());
    }

    #[test]
    fn test_ticker_commands_normalize() {
        assert_eq!(
            parse("/analyze 5930"),
            Some(InteractiveCommand::Analyze {
                ticker: "005930".to_string()
            })
        );
        assert_eq!(
            parse("/open 000660"),
            Some(InteractiveCommand::Open {
                ticker: "000660".to_string()
            })
        );
        assert!(CommandRouter::parse_interactive_command("/analyze").is_err());
    }

    #[test]
    fn test_jongga_run_capital() {
        assert_eq!(
            parse("/jongga run 50,000,000"),
            Some(InteractiveCommand::JonggaRun {
                capital: 50_000_000
            })
        );
        assert!(CommandRouter::parse_interactive_command("/jongga run 0").is_err());
        assert_eq!(
            parse("/jongga"),
            Some(InteractiveCommand::Page { page: Page::Jongga })
        );
    }

    #[test]
    fn test_empty_and_unknown() {
        assert_eq!(parse("   "), None);
        assert_eq!(parse("/q"), Some(InteractiveCommand::Quit));
        assert!(CommandRouter::parse_interactive_command("/add BTCUSDT").is_err());
    }

    #[test]
    fn test_suggestions_filter_by_prefix() {
        let matches = CommandRouter::suggestions("/re");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].trigger, "/refresh");
        assert_eq!(CommandRouter::suggestions("").len(), COMMAND_SPECS.len());
    }
}
