//! Test fixtures for common types.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use halfred_router::{ConversationContext, EscalationRequest, SessionMetadata};
use halfred_safety::{
    AutomationAction, AutomationKind, Command, CommandClassifier, ConfirmationGate,
    ConfirmationHandler, FilesystemCommand, FsOperation, GateConfig,
};
use halfred_tools::ToolInvocation;

/// A shell command with no working directory or timeout.
#[must_use]
pub fn test_shell(command: &str) -> Command {
    Command::shell(command)
}

/// A filesystem command on one path.
#[must_use]
pub fn test_fs(operation: FsOperation, path: &str) -> Command {
    Command::Filesystem(FilesystemCommand::new(operation, path))
}

/// A desktop automation command with coordinates where the kind needs them.
#[must_use]
pub fn test_automation(kind: AutomationKind) -> Command {
    let action = AutomationAction::new(kind).with_description(format!("test {}", kind.as_str()));
    let action = match kind {
        AutomationKind::Click | AutomationKind::DoubleClick | AutomationKind::MouseMove => {
            action.at(640, 360)
        },
        AutomationKind::Type => action.with_text("hello"),
        AutomationKind::Hotkey => action.with_hotkey("ctrl+s"),
        AutomationKind::WindowFocus => action.with_window("Terminal"),
        _ => action,
    };
    Command::Automation(action)
}

/// A shell tool call as the backend would make it.
#[must_use]
pub fn test_bash_call(command: &str) -> ToolInvocation {
    ToolInvocation::new("pty__pty_bash_execute", json!({ "command": command }))
}

/// A non-imperative tool call.
#[must_use]
pub fn test_search_call(query: &str) -> ToolInvocation {
    ToolInvocation::new("search__web_search", json!({ "query": query }))
}

/// An empty conversation snapshot.
#[must_use]
pub fn test_context() -> ConversationContext {
    ConversationContext {
        recent_turns: Vec::new(),
        summary: None,
        metadata: SessionMetadata {
            session_start: Utc::now(),
            total_turns: 0,
            clarification_count: 0,
        },
    }
}

/// An escalation request over an empty snapshot.
#[must_use]
pub fn test_escalation_request(request: &str) -> EscalationRequest {
    EscalationRequest::new(request, test_context())
}

/// A gate with the default policy and `handler` registered.
pub async fn test_gate(handler: impl ConfirmationHandler + 'static) -> Arc<ConfirmationGate> {
    let gate = ConfirmationGate::new(CommandClassifier::default(), GateConfig::default());
    gate.register_handler(Arc::new(handler)).await;
    Arc::new(gate)
}
