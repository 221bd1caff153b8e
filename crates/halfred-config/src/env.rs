//! `HALFRED_*` environment overrides.
//!
//! Environment variables are the highest-precedence layer: they replace
//! whatever the files set.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources};

#[derive(Debug, Clone, Copy)]
enum ValueKind {
    Str,
    Int,
    Bool,
}

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    section: &'static str,
    key: &'static str,
    kind: ValueKind,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "HALFRED_LOG_LEVEL",
        section: "logging",
        key: "level",
        kind: ValueKind::Str,
    },
    EnvMapping {
        var_name: "HALFRED_LOG_FORMAT",
        section: "logging",
        key: "format",
        kind: ValueKind::Str,
    },
    EnvMapping {
        var_name: "HALFRED_REQUIRE_CONFIRMATION",
        section: "safety",
        key: "require_confirmation",
        kind: ValueKind::Bool,
    },
    EnvMapping {
        var_name: "HALFRED_ESCALATION_TIMEOUT_SECS",
        section: "router",
        key: "escalation_timeout_secs",
        kind: ValueKind::Int,
    },
    EnvMapping {
        var_name: "HALFRED_MAX_TURNS",
        section: "router",
        key: "max_turns",
        kind: ValueKind::Int,
    },
];

/// Names of all supported environment variables.
#[must_use]
pub fn supported_vars() -> Vec<&'static str> {
    ENV_MAPPINGS.iter().map(|m| m.var_name).collect()
}

/// Each supported variable with the dotted field it overrides.
#[must_use]
pub fn supported_overrides() -> Vec<(&'static str, String)> {
    ENV_MAPPINGS
        .iter()
        .map(|m| (m.var_name, format!("{}.{}", m.section, m.key)))
        .collect()
}

/// Apply `HALFRED_*` overrides to the merged tree.
///
/// Returns the number of overrides applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if a numeric or boolean variable does
/// not parse.
pub fn apply_env_overrides<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<usize> {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };
        let value = coerce(mapping, raw.trim())?;
        debug!(
            var = mapping.var_name,
            field = %format!("{}.{}", mapping.section, mapping.key),
            "applying environment override"
        );

        let Some(root) = merged.as_table_mut() else {
            continue;
        };
        let section = root
            .entry(mapping.section)
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
        if let Some(table) = section.as_table_mut() {
            table.insert(mapping.key.to_owned(), value);
            sources.insert(
                format!("{}.{}", mapping.section, mapping.key),
                ConfigLayer::Environment,
            );
            count = count.saturating_add(1);
        }
    }

    Ok(count)
}

fn coerce(mapping: &EnvMapping, raw: &str) -> ConfigResult<toml::Value> {
    let invalid = |expected: &str| ConfigError::EnvError {
        var_name: mapping.var_name.to_owned(),
        message: format!("expected {expected}, got '{raw}'"),
    };
    match mapping.kind {
        ValueKind::Str => Ok(toml::Value::String(raw.to_owned())),
        ValueKind::Int => raw
            .parse::<i64>()
            .map(toml::Value::Integer)
            .map_err(|_| invalid("an integer")),
        ValueKind::Bool => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(toml::Value::Boolean(true)),
            "0" | "false" | "no" | "off" => Ok(toml::Value::Boolean(false)),
            _ => Err(invalid("a boolean")),
        },
    }
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}
