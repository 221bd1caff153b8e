/// Errors raised by the safety layer.
///
/// Classification itself never produces an error; these cover the
/// confirmation flow and policy construction.
#[derive(Debug, thiserror::Error)]
pub enum SafetyError {
    /// No confirmation handler could answer the request.
    #[error("confirmation unavailable: {0}")]
    ConfirmationUnavailable(String),

    /// The user asked to abort the whole task.
    #[error("aborted by user: {reason}")]
    Aborted {
        /// The reason given for the abort.
        reason: String,
    },

    /// A context capture (screenshot, diff) failed.
    #[error("capture '{provider}' failed: {message}")]
    Capture {
        /// Name of the capture provider.
        provider: &'static str,
        /// What went wrong.
        message: String,
    },

    /// A configured dangerous pattern is not a valid regular expression.
    #[error("invalid dangerous pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern text.
        pattern: String,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// Command arguments failed validation.
    #[error("invalid command arguments: {0}")]
    InvalidArguments(String),

    /// A confirmation flow was asked to make an illegal state transition.
    #[error("invalid confirmation flow transition: {from} -> {to}")]
    InvalidTransition {
        /// State the flow was in.
        from: crate::flow::FlowState,
        /// State that was requested.
        to: crate::flow::FlowState,
    },

    /// I/O failure while gathering context.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for safety operations.
pub type SafetyResult<T> = Result<T, SafetyError>;
