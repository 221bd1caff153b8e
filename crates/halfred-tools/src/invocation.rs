//! Tool invocations and their mapping onto safety commands.

use halfred_safety::{
    AutomationAction, AutomationKind, Command, FilesystemCommand, FsOperation, TextEdit,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use crate::error::{ToolError, ToolResult};

/// Separator between a tool server's name and its tool, e.g. `fs__write_file`.
pub const NAMESPACE_SEPARATOR: &str = "__";

/// Shell execution tool names.
const SHELL_TOOLS: &[&str] = &["pty_bash_execute", "bash", "execute_command", "run_command"];

/// The desktop automation entry point taking an `action_type` argument.
const SAFE_ACTION_TOOL: &str = "safe_action";

/// A tool call requested by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Tool name, possibly namespaced by server.
    pub name: String,
    /// JSON arguments.
    pub arguments: Value,
}

impl ToolInvocation {
    /// Create an invocation.
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Create an invocation from a raw JSON argument string as produced by
    /// function-calling models. An empty string means no arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArguments`] if the string is not JSON.
    pub fn from_json(name: impl Into<String>, arguments: &str) -> ToolResult<Self> {
        let name = name.into();
        let arguments = if arguments.trim().is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(arguments)
                .map_err(|e| ToolError::invalid(&name, format!("arguments are not JSON: {e}")))?
        };
        Ok(Self { name, arguments })
    }

    /// The server namespace, if the name carries one.
    #[must_use]
    pub fn server(&self) -> Option<&str> {
        self.name
            .split_once(NAMESPACE_SEPARATOR)
            .map(|(server, _)| server)
    }

    /// The tool name with any server namespace stripped.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        self.name
            .split_once(NAMESPACE_SEPARATOR)
            .map_or(self.name.as_str(), |(_, tool)| tool)
    }

    fn str_arg(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|k| self.arguments.get(*k).and_then(Value::as_str))
    }

    fn int_arg(&self, key: &str) -> ToolResult<Option<i32>> {
        let Some(value) = self.arguments.get(key).filter(|v| !v.is_null()) else {
            return Ok(None);
        };
        value
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| ToolError::invalid(&self.name, format!("{key} must be an integer")))
    }
}

/// Map a tool invocation onto the command it would run.
///
/// Returns `Ok(None)` for tools that are not imperative.
///
/// # Errors
///
/// Returns [`ToolError::InvalidArguments`] when a known imperative tool is
/// missing required arguments.
pub fn command_for_tool(invocation: &ToolInvocation) -> ToolResult<Option<Command>> {
    let tool = invocation.tool_name();

    if SHELL_TOOLS.contains(&tool) {
        return shell_command(invocation).map(Some);
    }
    if let Some(operation) = FsOperation::from_tool_name(tool) {
        return filesystem_command(invocation, operation).map(Some);
    }
    if tool == SAFE_ACTION_TOOL {
        let kind_name = invocation
            .str_arg(&["action_type"])
            .ok_or_else(|| ToolError::invalid(&invocation.name, "action_type is required"))?;
        let kind = AutomationKind::parse(kind_name).ok_or_else(|| {
            ToolError::invalid(
                &invocation.name,
                format!("unknown action_type '{kind_name}'"),
            )
        })?;
        return automation_command(invocation, kind).map(Some);
    }
    if let Some(kind) = AutomationKind::parse(tool) {
        return automation_command(invocation, kind).map(Some);
    }
    Ok(None)
}

fn shell_command(invocation: &ToolInvocation) -> ToolResult<Command> {
    let command = invocation
        .str_arg(&["command"])
        .ok_or_else(|| ToolError::invalid(&invocation.name, "command is required"))?;
    let working_directory = invocation
        .str_arg(&["working_directory", "cwd"])
        .map(PathBuf::from);
    let timeout_secs = invocation
        .arguments
        .get("timeout_seconds")
        .and_then(Value::as_u64);
    Ok(Command::Shell {
        command: command.trim().to_string(),
        working_directory,
        timeout_secs,
    })
}

fn filesystem_command(invocation: &ToolInvocation, operation: FsOperation) -> ToolResult<Command> {
    let mut paths: Vec<String> = invocation
        .arguments
        .get("paths")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if let Some(path) = invocation.str_arg(&["path", "file_path", "source"]) {
        paths.push(path.to_string());
    }

    let needs_path = !matches!(operation, FsOperation::List | FsOperation::Search);
    if paths.is_empty() && needs_path {
        return Err(ToolError::invalid(&invocation.name, "path is required"));
    }

    let content = invocation
        .str_arg(&["content", "data", "text"])
        .map(str::to_string);
    if operation == FsOperation::Write && content.is_none() {
        return Err(ToolError::invalid(&invocation.name, "content is required"));
    }
    let edits: Vec<TextEdit> = match invocation.arguments.get("edits") {
        Some(raw) => serde_json::from_value(raw.clone()).map_err(|e| {
            ToolError::invalid(&invocation.name, format!("edits must be [{{oldText, newText}}]: {e}"))
        })?,
        None => Vec::new(),
    };
    if operation == FsOperation::Edit && content.is_none() && edits.is_empty() {
        return Err(ToolError::invalid(&invocation.name, "edits are required"));
    }
    let destination = invocation.str_arg(&["destination"]).map(str::to_string);
    if operation == FsOperation::Move && destination.is_none() {
        return Err(ToolError::invalid(&invocation.name, "destination is required"));
    }

    Ok(Command::Filesystem(FilesystemCommand {
        operation,
        paths,
        content,
        destination,
        edits,
    }))
}

fn automation_command(invocation: &ToolInvocation, kind: AutomationKind) -> ToolResult<Command> {
    let action = AutomationAction {
        kind,
        x: invocation.int_arg("x")?,
        y: invocation.int_arg("y")?,
        text: invocation.str_arg(&["text"]).map(str::to_string),
        hotkey: invocation.str_arg(&["hotkey", "keys"]).map(str::to_string),
        window: invocation
            .str_arg(&["window_title", "window"])
            .map(str::to_string),
        description: invocation.str_arg(&["description"]).map(str::to_string),
    };
    action
        .validate()
        .map_err(|e| ToolError::invalid(&invocation.name, e.to_string()))?;
    Ok(Command::Automation(action))
}
