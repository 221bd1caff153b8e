//! Router error types.

use halfred_tools::ToolError;
use thiserror::Error;

/// Errors at the router's I/O seams.
///
/// None of these block a user-facing turn: summarization failures degrade
/// to dropping turns, judge failures escalate, backend failures are
/// reported to the user as recoverable.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The summarization service failed.
    #[error("Summarization failed: {0}")]
    Summarization(String),

    /// The turn judge failed.
    #[error("Turn judge failed: {0}")]
    Judge(String),

    /// The backend executor failed.
    #[error("Backend error: {0}")]
    Backend(String),

    /// A tool call inside the backend failed at the safety boundary.
    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;
