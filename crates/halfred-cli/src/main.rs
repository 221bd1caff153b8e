//! Halfred CLI - inspect the safety and routing core.
//!
//! Classifies commands, runs the confirmation flow against a terminal
//! prompt without executing anything, and shows the resolved configuration.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

pub mod approval_handler;
mod commands;
pub mod config_bridge;
mod theme;

use commands::{OutputFormat, classify, config, gate};
use halfred_safety::{
    AutomationAction, AutomationKind, Command, CommandClassifier, FilesystemCommand, FsOperation,
};
use halfred_telemetry::{SessionContext, SessionLog};
use std::collections::BTreeMap;
use tracing::Instrument;

/// Halfred - voice assistant safety and routing core
#[derive(Parser)]
#[command(name = "halfred")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format: pretty (default) or json
    #[arg(long, global = true, default_value = "pretty")]
    format: String,

    /// Path to a configuration file
    #[arg(short, long, global = true, env = "HALFRED_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a command without running it
    Classify {
        #[command(subcommand)]
        command: ClassifyCommands,
    },

    /// Run the confirmation flow for a command without running it
    Gate {
        #[command(subcommand)]
        command: GateCommands,
    },

    /// View and validate configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ClassifyCommands {
    /// Classify a shell command line
    Shell(ShellArgs),
    /// Classify a filesystem operation
    Fs {
        /// Operation
        #[arg(value_enum)]
        operation: FsOpArg,
        /// Target paths
        #[arg(required = true)]
        paths: Vec<String>,
        /// Proposed content for write/edit
        #[arg(long)]
        content: Option<String>,
        /// Destination for move
        #[arg(long)]
        destination: Option<String>,
    },
    /// Classify a desktop automation action
    Automation {
        /// Action kind (click, type, screenshot, ...)
        kind: String,
        /// Target x coordinate
        #[arg(long, allow_hyphen_values = true)]
        x: Option<i32>,
        /// Target y coordinate
        #[arg(long, allow_hyphen_values = true)]
        y: Option<i32>,
        /// Text to type
        #[arg(long)]
        text: Option<String>,
        /// Key combination
        #[arg(long)]
        hotkey: Option<String>,
        /// Window title
        #[arg(long)]
        window: Option<String>,
    },
}

#[derive(Subcommand)]
enum GateCommands {
    /// Ask for confirmation of a shell command line
    Shell(ShellArgs),
}

#[derive(clap::Args)]
struct ShellArgs {
    /// Working directory the command would run in
    #[arg(long)]
    cwd: Option<PathBuf>,
    /// The command line; quote it to keep pipes and redirections
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

impl ShellArgs {
    fn to_command(&self) -> Result<Command> {
        Ok(Command::Shell {
            command: classify::shell_line(&self.command)?,
            working_directory: self.cwd.clone(),
            timeout_secs: None,
        })
    }
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show resolved configuration with source annotations
    Show {
        /// Show only a specific section (safety, router, logging)
        #[arg(short, long)]
        section: Option<String>,
    },
    /// Validate the current configuration
    Validate,
    /// Show config file paths and environment overrides
    Paths,
}

#[derive(Clone, Copy, ValueEnum)]
enum FsOpArg {
    Read,
    Write,
    Edit,
    CreateDirectory,
    Move,
    Delete,
    List,
    Search,
    Metadata,
}

impl From<FsOpArg> for FsOperation {
    fn from(arg: FsOpArg) -> Self {
        match arg {
            FsOpArg::Read => Self::Read,
            FsOpArg::Write => Self::Write,
            FsOpArg::Edit => Self::Edit,
            FsOpArg::CreateDirectory => Self::CreateDirectory,
            FsOpArg::Move => Self::Move,
            FsOpArg::Delete => Self::Delete,
            FsOpArg::List => Self::List,
            FsOpArg::Search => Self::Search,
            FsOpArg::Metadata => Self::Metadata,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let explicit = cli.config.as_deref();

    // Logging from config, with --verbose override.
    let resolved = halfred_config::Config::load(explicit).ok();
    let log_config = if let Some(r) = &resolved {
        let mut lc = config_bridge::to_log_config(&r.config.logging);
        if cli.verbose {
            "debug".clone_into(&mut lc.level);
        }
        lc
    } else {
        // Fallback if config loading fails.
        let level = if cli.verbose { "debug" } else { "warn" };
        halfred_telemetry::LogConfig::new(level).with_format(halfred_telemetry::LogFormat::Compact)
    };
    if let Err(e) = halfred_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let output_format = match cli.format.as_str() {
        "json" => OutputFormat::Json,
        _ => OutputFormat::Pretty,
    };

    match cli.command {
        Commands::Classify { command } => handle_classify(command, explicit, output_format)?,
        Commands::Gate { command } => handle_gate(command, explicit, output_format).await?,
        Commands::Config { command } => handle_config(command, explicit, output_format)?,
    }

    Ok(())
}

fn classifier(explicit: Option<&Path>) -> Result<CommandClassifier> {
    let resolved = config::load(explicit)?;
    let policy = config_bridge::to_safety_policy(&resolved.config.safety)
        .context("invalid safety policy")?;
    Ok(CommandClassifier::new(policy))
}

fn handle_classify(
    command: ClassifyCommands,
    explicit: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let target = match command {
        ClassifyCommands::Shell(args) => args.to_command()?,
        ClassifyCommands::Fs {
            operation,
            paths,
            content,
            destination,
        } => Command::Filesystem(FilesystemCommand {
            operation: operation.into(),
            paths,
            content,
            destination,
            edits: Vec::new(),
        }),
        ClassifyCommands::Automation {
            kind,
            x,
            y,
            text,
            hotkey,
            window,
        } => {
            let kind = AutomationKind::parse(&kind)
                .with_context(|| format!("unknown automation kind '{kind}'"))?;
            Command::Automation(AutomationAction {
                kind,
                x,
                y,
                text,
                hotkey,
                window,
                description: None,
            })
        },
    };
    classify::classify_command(&classifier(explicit)?, &target, format);
    Ok(())
}

async fn handle_gate(
    command: GateCommands,
    explicit: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let resolved = config::load(explicit)?;
    let gate = config_bridge::to_gate(&resolved.config.safety).context("invalid safety policy")?;
    let mut session = SessionContext::new("cli");
    let log = match &resolved.config.logging.session_log_dir {
        Some(dir) => Some(
            SessionLog::create(dir, &session, BTreeMap::new())
                .context("failed to open session log")?,
        ),
        None => None,
    };
    let turn = session.next_turn();
    let result = match command {
        GateCommands::Shell(args) => {
            let target = args.to_command()?;
            gate::gate_command(gate, &target, format, log.as_ref())
                .instrument(turn.span())
                .await
        },
    };
    if let Some(log) = log {
        log.close().context("failed to close session log")?;
    }
    result
}

fn handle_config(
    command: ConfigCommands,
    explicit: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    match command {
        ConfigCommands::Show { section } => {
            config::show_config(explicit, format, section.as_deref())
        },
        ConfigCommands::Validate => config::validate_config(explicit),
        ConfigCommands::Paths => config::show_paths(explicit),
    }
}
