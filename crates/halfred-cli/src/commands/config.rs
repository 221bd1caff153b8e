//! CLI handlers for the `halfred config` subcommand.

use anyhow::{Context, Result};
use halfred_config::{Config, ResolvedConfig, ShowFormat, env, loader};
use std::path::Path;

use super::OutputFormat;
use crate::config_bridge;
use crate::theme::Theme;

/// Load the resolved configuration.
pub(crate) fn load(explicit: Option<&Path>) -> Result<ResolvedConfig> {
    Config::load(explicit).context("failed to load configuration")
}

/// Show the resolved configuration with source annotations.
///
/// The global `--format json` switches the output to JSON.
pub(crate) fn show_config(
    explicit: Option<&Path>,
    format: OutputFormat,
    section: Option<&str>,
) -> Result<()> {
    let resolved = load(explicit)?;
    let show_format = match format {
        OutputFormat::Json => ShowFormat::Json,
        OutputFormat::Pretty => ShowFormat::Toml,
    };
    let output = resolved
        .show(show_format, section)
        .map_err(|e| anyhow::anyhow!("failed to format config: {e}"))?;
    println!("{output}");
    Ok(())
}

/// Validate the configuration and build every domain setting from it.
pub(crate) fn validate_config(explicit: Option<&Path>) -> Result<()> {
    let resolved = load(explicit)?;
    let config = &resolved.config;

    config_bridge::to_safety_policy(&config.safety).context("invalid safety policy")?;
    let gate = config_bridge::to_gate_config(&config.safety);
    let context = config_bridge::to_context_config(&config.router);
    let router = config_bridge::to_router_config(&config.router);
    let logging = config_bridge::to_log_config(&config.logging);

    println!("{}", Theme::success("Configuration is valid."));
    println!();
    println!(
        "{}",
        Theme::kv("confirmation", if gate.require_confirmation { "required" } else { "off" })
    );
    println!(
        "{}",
        Theme::kv(
            "context window",
            &format!(
                "{} turns, summarize at {}",
                context.max_turns, context.summarize_threshold
            )
        )
    );
    println!(
        "{}",
        Theme::kv(
            "escalation timeout",
            &router
                .escalation_timeout
                .map_or_else(|| "none".to_string(), |t| format!("{}s", t.as_secs()))
        )
    );
    println!("{}", Theme::kv("log level", &logging.level));

    if !resolved.loaded_files.is_empty() {
        println!();
        println!("{}", Theme::header("Loaded files:"));
        for path in &resolved.loaded_files {
            println!("  - {path}");
        }
    }
    Ok(())
}

/// Show the config file paths and environment overrides that are checked.
pub(crate) fn show_paths(explicit: Option<&Path>) -> Result<()> {
    println!("{}", Theme::header("Configuration files (in precedence order):"));
    println!("  1. {}", Theme::dimmed("built-in defaults"));
    let user = loader::home_directory()
        .ok()
        .map(|home| home.join(loader::USER_DIR).join("config.toml"));
    match user {
        Some(path) => {
            let status = if path.exists() { "found" } else { "not found" };
            println!("  2. {}  [{status}]", path.display());
        },
        None => println!("  2. {}", Theme::warning("no home directory")),
    }
    if let Some(path) = explicit {
        let status = if path.exists() { "found" } else { "not found" };
        println!("  3. {}  [{status}]", path.display());
    }

    println!();
    println!("{}", Theme::header("Environment overrides (highest precedence):"));
    for (var, field) in env::supported_overrides() {
        println!("  {var:<32} -> {field}");
    }
    Ok(())
}
