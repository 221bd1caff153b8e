//! CLI handler for `halfred gate` - runs the confirmation flow without
//! executing anything.

use anyhow::Result;
use halfred_safety::{Approval, Command, ConfirmationGate, GateOutcome};
use halfred_telemetry::SessionLog;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::OutputFormat;
use crate::approval_handler::TerminalConfirmationHandler;
use crate::theme::Theme;

fn approval_label(approval: Approval) -> &'static str {
    match approval {
        Approval::Automatic => "safe, no confirmation needed",
        Approval::ConfirmationDisabled => "confirmation disabled in config",
        Approval::Confirmed { .. } => "approved by user",
    }
}

/// Render a gate outcome.
pub(crate) fn render(outcome: &GateOutcome, format: OutputFormat) -> String {
    let tier = outcome.classification().tier;
    match (format, outcome) {
        (OutputFormat::Json, GateOutcome::Proceed { approval, .. }) => json!({
            "outcome": "approved",
            "tier": tier,
            "detail": approval_label(*approval),
        })
        .to_string(),
        (OutputFormat::Json, GateOutcome::Blocked { reason, .. }) => {
            json!({ "outcome": "denied", "tier": tier, "detail": reason }).to_string()
        },
        (OutputFormat::Json, GateOutcome::Aborted { reason, .. }) => {
            json!({ "outcome": "aborted", "tier": tier, "detail": reason }).to_string()
        },
        (OutputFormat::Pretty, GateOutcome::Proceed { approval, .. }) => Theme::success(&format!(
            "would run ({}, {})",
            Theme::tier(tier),
            approval_label(*approval)
        )),
        (OutputFormat::Pretty, GateOutcome::Blocked { reason, .. }) => {
            Theme::warning(&format!("blocked: {reason}"))
        },
        (OutputFormat::Pretty, GateOutcome::Aborted { reason, .. }) => {
            Theme::error(&format!("task aborted: {reason}"))
        },
    }
}

/// Record a gate outcome in the session log.
pub(crate) fn record(log: &SessionLog, command: &Command, outcome: &GateOutcome) {
    let tier = outcome.classification().tier.to_string();
    let (label, reason) = match outcome {
        GateOutcome::Proceed { .. } => ("approved", None),
        GateOutcome::Blocked { reason, .. } => ("denied", Some(reason.clone())),
        GateOutcome::Aborted { reason, .. } => ("aborted", Some(reason.clone())),
    };
    log.confirmation(command.summary(), tier, label, reason);
}

/// Pass `command` through `gate` with a terminal handler and print the
/// outcome.
pub(crate) async fn gate_command(
    gate: Arc<ConfirmationGate>,
    command: &Command,
    format: OutputFormat,
    log: Option<&SessionLog>,
) -> Result<()> {
    gate.register_handler(Arc::new(TerminalConfirmationHandler::new()))
        .await;
    let task = CancellationToken::new();
    let outcome = gate.check(command, &task).await;
    if let Some(log) = log {
        record(log, command, &outcome);
    }
    println!("{}", render(&outcome, format));
    Ok(())
}
