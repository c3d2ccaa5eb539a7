use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gk_core::{ApprovalGate, ApprovalStore, Session};
use gk_tools::create_default_tools;

mod agent;
mod audit_log;
mod chat;
mod config;
mod interface;
mod render;
mod setup;

use audit_log::AuditLogger;
use chat::{AutoDecision, ChatLoop};
use config::Config;

/// Log level for tracing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Most verbose: every store transition
    Trace,
    /// Verbose: flag changes, tool routing
    Debug,
    /// Standard: decisions and turn flow
    Info,
    /// Quiet: only warnings and errors
    Warn,
    /// Minimal: only errors
    Error,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Parser)]
#[command(name = "gk")]
#[command(author, version, long_about = None)]
#[command(about = "Gatekeep: human approval for agent tool calls")]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_enum, default_value = "warn", global = true)]
    pub log_level: LogLevel,

    /// Enable debug logging (shorthand for --log-level debug)
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Write logs to file (JSON-lines format)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Append approval events to this JSON-lines file (overrides config)
    #[arg(long, global = true)]
    pub audit_file: Option<PathBuf>,

    /// Gate sensitive tools behind approval (overrides config)
    #[arg(long, global = true, conflicts_with = "no_approval")]
    pub approval: bool,

    /// Run sensitive tools immediately (overrides config)
    #[arg(long, global = true)]
    pub no_approval: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    /// Approval mode from the flags, if either was given.
    fn approval_override(&self) -> Option<bool> {
        if self.approval {
            Some(true)
        } else if self.no_approval {
            Some(false)
        } else {
            None
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session (default)
    Chat,
    /// Run one message and settle its approvals
    Ask {
        /// Message for the agent
        message: String,

        /// Decide every pending request without asking
        #[arg(long, value_enum)]
        auto: Option<AutoDecision>,
    },
    /// List available tools
    Tools,
    /// Show current configuration
    Config,
    /// Initialize configuration file in ~/.config/gk
    Setup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Resolve log level: --debug overrides --log-level
    let log_level = if cli.debug {
        LogLevel::Debug
    } else {
        cli.log_level
    };

    let filter = EnvFilter::new(log_level.as_filter());

    if let Some(log_path) = &cli.log_file {
        // Log file specified: write JSON to file
        let file = std::fs::File::create(log_path)
            .with_context(|| format!("Failed to create log file: {:?}", log_path))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::sync::Mutex::new(file)))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    // Handle setup before config is loaded
    if matches!(&cli.command, Some(Commands::Setup)) {
        return setup::run();
    }

    let config = Config::load()?;

    match &cli.command {
        Some(Commands::Ask { message, auto }) => {
            let chat = build_chat(&cli, &config)?;
            chat.ask(message, *auto).await
        }
        Some(Commands::Tools) => list_tools(&cli, &config),
        Some(Commands::Config) => show_config(&cli, &config),
        Some(Commands::Setup) => unreachable!(),
        Some(Commands::Chat) | None => {
            let chat = build_chat(&cli, &config)?;
            chat.run().await
        }
    }
}

fn approval_enabled(cli: &Cli, config: &Config) -> bool {
    cli.approval_override().unwrap_or(config.approval.enabled)
}

fn build_session(cli: &Cli, config: &Config) -> Result<Session> {
    let enabled = approval_enabled(cli, config);
    let gate = ApprovalGate::new(Arc::new(ApprovalStore::new()), enabled);
    let tools_config = config.tools.to_tools_config()?;
    let tools = create_default_tools(&tools_config, &gate).context("Failed to set up tools")?;
    debug!(enabled, tools = tools.len(), "Session ready");
    Ok(Session::new(gate, tools))
}

fn build_chat(cli: &Cli, config: &Config) -> Result<ChatLoop> {
    let session = build_session(cli, config)?;
    let audit_path = cli.audit_file.clone().or_else(|| config.audit_file());
    let audit = match audit_path {
        Some(path) => Some(
            AuditLogger::new(&path)
                .with_context(|| format!("Failed to open audit file: {}", path.display()))?,
        ),
        None => None,
    };
    Ok(ChatLoop::new(session, audit))
}

fn list_tools(cli: &Cli, config: &Config) -> Result<()> {
    let session = build_session(cli, config)?;
    if session.tools().is_empty() {
        println!("No tools enabled.");
        return Ok(());
    }

    println!("Available tools:\n");
    render::print_tools(session.tools())?;
    Ok(())
}

fn show_config(cli: &Cli, config: &Config) -> Result<()> {
    println!("Configuration:");
    println!("  File: {}", Config::config_path()?.display());

    println!("\nApproval:");
    println!("  Enabled: {}", approval_enabled(cli, config));
    let audit = cli.audit_file.clone().or_else(|| config.audit_file());
    match audit {
        Some(path) => println!("  Audit file: {}", path.display()),
        None => println!("  Audit file: (none)"),
    }

    let tools = config.tools.to_tools_config()?;
    println!("\nTools:");
    println!("  Root: {}", tools.root.display());
    println!("  Allow write: {}", tools.allow_write);
    match &tools.notes_db {
        Some(path) => println!("  Notes database: {}", path.display()),
        None => println!("  Notes database: (in memory)"),
    }
    println!("  Calculator: {}", tools.enable_calculator);
    println!("  Clock: {}", tools.enable_clock);
    println!("  Files: {}", tools.enable_files);
    println!("  Notes: {}", tools.enable_notes);
    println!("  Text analyzer: {}", tools.enable_text);
    println!("  Random facts: {}", tools.enable_facts);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_chat() {
        let cli = Cli::try_parse_from(["gk"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, LogLevel::Warn);
        assert_eq!(cli.approval_override(), None);
    }

    #[test]
    fn test_ask_with_auto() {
        let cli =
            Cli::try_parse_from(["gk", "ask", "calculate 1 + 1", "--auto", "approve"]).unwrap();
        match cli.command {
            Some(Commands::Ask { message, auto }) => {
                assert_eq!(message, "calculate 1 + 1");
                assert_eq!(auto, Some(AutoDecision::Approve));
            }
            _ => panic!("Expected Ask"),
        }
    }

    #[test]
    fn test_approval_flags() {
        let cli = Cli::try_parse_from(["gk", "--no-approval", "tools"]).unwrap();
        assert_eq!(cli.approval_override(), Some(false));

        let cli = Cli::try_parse_from(["gk", "chat", "--approval"]).unwrap();
        assert_eq!(cli.approval_override(), Some(true));

        assert!(Cli::try_parse_from(["gk", "--approval", "--no-approval"]).is_err());
    }

    #[test]
    fn test_approval_override_beats_config() {
        let mut config = Config::default();
        config.approval.enabled = false;

        let cli = Cli::try_parse_from(["gk", "--approval"]).unwrap();
        assert!(approval_enabled(&cli, &config));

        let cli = Cli::try_parse_from(["gk"]).unwrap();
        assert!(!approval_enabled(&cli, &config));
    }
}
