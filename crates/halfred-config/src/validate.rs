//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges and that cross-field invariants hold.

use regex::Regex;

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_safety(config)?;
    validate_router(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_safety(config: &Config) -> ConfigResult<()> {
    let s = &config.safety;

    if s.diff_max_lines == 0 {
        return Err(invalid("safety.diff_max_lines", "must be at least 1"));
    }

    for pattern in &s.extra_dangerous_patterns {
        if let Err(e) = Regex::new(pattern) {
            return Err(invalid(
                "safety.extra_dangerous_patterns",
                format!("pattern '{pattern}' does not compile: {e}"),
            ));
        }
    }

    if let Some(cmd) = s.extra_safe_commands.iter().find(|c| c.trim().is_empty()) {
        return Err(invalid(
            "safety.extra_safe_commands",
            format!("empty command name '{cmd}'"),
        ));
    }

    if let Some(path) = s.protected_paths.iter().find(|p| !p.starts_with('/')) {
        return Err(invalid(
            "safety.protected_paths",
            format!("'{path}' is not an absolute path"),
        ));
    }

    Ok(())
}

fn validate_router(config: &Config) -> ConfigResult<()> {
    let r = &config.router;

    if r.max_turns == 0 {
        return Err(invalid("router.max_turns", "must be at least 1"));
    }
    if r.summarize_threshold <= r.max_turns {
        return Err(invalid(
            "router.summarize_threshold",
            format!(
                "must be greater than router.max_turns ({}), got {}",
                r.max_turns, r.summarize_threshold
            ),
        ));
    }
    if r.summarization_attempts == 0 {
        return Err(invalid("router.summarization_attempts", "must be at least 1"));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if l.level.trim().is_empty() {
        return Err(invalid("logging.level", "must not be empty"));
    }
    if !LOG_LEVELS.contains(&l.level.to_ascii_lowercase().as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unknown level '{}'; expected one of: {}",
                l.level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }
    if !LOG_FORMATS.contains(&l.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unknown format '{}'; expected one of: {}",
                l.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }
    Ok(())
}
