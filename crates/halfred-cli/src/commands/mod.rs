//! CLI commands.

pub(crate) mod classify;
pub(crate) mod config;
pub(crate) mod gate;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Pretty,
    Json,
}
