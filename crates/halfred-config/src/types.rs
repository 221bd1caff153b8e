//! Configuration types for Halfred.
//!
//! These types mirror the domain types of `halfred-safety`, `halfred-router`
//! and `halfred-telemetry` without depending on them. Every struct implements
//! [`Default`] with the values from `defaults.toml`, so a bare `[section]`
//! header produces a working configuration.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Command classification and confirmation.
    pub safety: SafetySection,
    /// Escalation routing and context management.
    pub router: RouterSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// SafetySection
// ---------------------------------------------------------------------------

/// Command classification and confirmation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetySection {
    /// Ask a human before running non-safe commands. Turning this off makes
    /// every command auto-run.
    pub require_confirmation: bool,
    /// Seconds to wait for a human decision. `0` waits until cancelled.
    pub confirmation_timeout_secs: u64,
    /// Seconds allowed for each context capture (screenshot, diff). `0`
    /// disables the bound.
    pub capture_timeout_secs: u64,
    /// Diff lines shown before truncation.
    pub diff_max_lines: usize,
    /// Executables added to the read-only allow-list.
    pub extra_safe_commands: Vec<String>,
    /// Regexes over the raw command line that force `Dangerous`.
    pub extra_dangerous_patterns: Vec<String>,
    /// Path prefixes where redirection is `Dangerous`.
    pub protected_paths: Vec<String>,
}

impl Default for SafetySection {
    fn default() -> Self {
        Self {
            require_confirmation: true,
            confirmation_timeout_secs: 0,
            capture_timeout_secs: 5,
            diff_max_lines: 50,
            extra_safe_commands: Vec::new(),
            extra_dangerous_patterns: Vec::new(),
            protected_paths: [
                "/etc", "/dev", "/boot", "/sys", "/proc", "/usr", "/bin", "/sbin", "/lib",
                "/System", "/Library",
            ]
            .iter()
            .map(|p| (*p).to_owned())
            .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// RouterSection
// ---------------------------------------------------------------------------

/// Escalation router settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSection {
    /// Rolling window: turns included in every snapshot.
    pub max_turns: usize,
    /// Stored turn count that triggers summarization.
    pub summarize_threshold: usize,
    /// Summarizer attempts before dropping turns.
    pub summarization_attempts: u32,
    /// Seconds allowed for one summarizer call. `0` disables the bound.
    pub summarization_timeout_secs: u64,
    /// Seconds allowed for one escalation round-trip. `0` disables the bound.
    pub escalation_timeout_secs: u64,
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            max_turns: 10,
            summarize_threshold: 20,
            summarization_attempts: 2,
            summarization_timeout_secs: 10,
            escalation_timeout_secs: 120,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["halfred_router=debug"]`).
    pub directives: Vec<String>,
    /// Write daily-rotated log files here instead of stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    /// Write one JSON-lines event log per session here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_log_dir: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "pretty".to_owned(),
            directives: Vec::new(),
            directory: None,
            session_log_dir: None,
        }
    }
}
