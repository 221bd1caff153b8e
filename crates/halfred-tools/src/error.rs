use halfred_safety::SafetyError;

/// Tool boundary errors.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Arguments are missing or malformed.
    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments {
        /// The tool that was called.
        tool: String,
        /// What is wrong.
        message: String,
    },

    /// The human aborted the enclosing task.
    #[error("Task aborted by user: {reason}")]
    Aborted {
        /// The reason given.
        reason: String,
    },

    /// Error from the safety layer.
    #[error(transparent)]
    Safety(#[from] SafetyError),
}

impl ToolError {
    pub(crate) fn invalid(tool: &str, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for tool boundary operations.
pub type ToolResult<T> = Result<T, ToolError>;
