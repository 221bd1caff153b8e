//! Bridge from `halfred_config::Config` to domain types.
//!
//! The config crate carries plain data so that it does not depend on the
//! domain crates. These conversions are the one place the two meet.

use std::time::Duration;

use halfred_config::{LoggingSection, RouterSection, SafetySection};
use halfred_router::{ContextConfig, RouterConfig};
use halfred_safety::{
    CommandClassifier, ConfirmationGate, DiffCapture, GateConfig, SafetyPolicy, SafetyResult,
};
use halfred_telemetry::{LogConfig, LogFormat};
use std::sync::Arc;

/// Build the classifier policy: defaults plus configured extras.
///
/// # Errors
///
/// Returns an error if an extra dangerous pattern does not compile.
pub fn to_safety_policy(section: &SafetySection) -> SafetyResult<SafetyPolicy> {
    let mut policy = SafetyPolicy::default()
        .with_safe_commands(section.extra_safe_commands.iter().cloned())
        .with_protected_paths(section.protected_paths.iter().cloned());
    for pattern in &section.extra_dangerous_patterns {
        policy = policy.with_dangerous_pattern(pattern)?;
    }
    Ok(policy)
}

/// Gate settings. A zero timeout waits until cancelled.
#[must_use]
pub fn to_gate_config(section: &SafetySection) -> GateConfig {
    let mut config = GateConfig::default();
    config.capture_timeout = secs_bound(section.capture_timeout_secs);
    let config = if section.require_confirmation {
        config
    } else {
        config.without_confirmation()
    };
    match section.confirmation_timeout_secs {
        0 => config,
        secs => config.with_timeout(Duration::from_secs(secs)),
    }
}

/// A ready gate with diff capture attached. No handler is registered.
///
/// # Errors
///
/// Returns an error if the policy cannot be built.
pub fn to_gate(section: &SafetySection) -> SafetyResult<Arc<ConfirmationGate>> {
    let classifier = CommandClassifier::new(to_safety_policy(section)?);
    let gate = ConfirmationGate::new(classifier, to_gate_config(section))
        .with_capture(Arc::new(DiffCapture::new(section.diff_max_lines)));
    Ok(Arc::new(gate))
}

/// Context window settings.
#[must_use]
pub fn to_context_config(section: &RouterSection) -> ContextConfig {
    ContextConfig {
        max_turns: section.max_turns,
        summarize_threshold: section.summarize_threshold,
        summarization_attempts: section.summarization_attempts,
        summarization_timeout: secs_bound(section.summarization_timeout_secs),
    }
}

fn secs_bound(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Escalation settings.
#[must_use]
pub fn to_router_config(section: &RouterSection) -> RouterConfig {
    RouterConfig::default().with_timeout_secs(section.escalation_timeout_secs)
}

/// Logging settings. Unknown formats fall back to pretty; validation
/// rejects them before this point.
#[must_use]
pub fn to_log_config(section: &LoggingSection) -> LogConfig {
    let format = section.format.parse().unwrap_or(LogFormat::Pretty);
    let mut config = LogConfig::new(section.level.to_lowercase()).with_format(format);
    for directive in &section.directives {
        config = config.with_directive(directive.clone());
    }
    if let Some(dir) = &section.directory {
        config = config.with_file_logging(dir);
    }
    config
}
