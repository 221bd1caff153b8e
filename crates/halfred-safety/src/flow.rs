//! Confirmation flow state machine.
//!
//! ```text
//! Proposed -> Captured -> Presented -> { Approved | Denied | Aborted }
//! ```
//!
//! Any non-terminal state may also jump straight to `Denied`: that is the
//! fail-closed path for cancellation and handler failures.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{SafetyError, SafetyResult};
use crate::request::{ConfirmationDecision, RequestId};

/// A state of the confirmation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    /// Classification obtained.
    Proposed,
    /// Best-effort context capture attempted.
    Captured,
    /// Shown to the human; awaiting an answer.
    Presented,
    /// The command may run.
    Approved,
    /// The command is skipped.
    Denied,
    /// The enclosing task is cancelled.
    Aborted,
}

impl FlowState {
    /// Whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Denied | Self::Aborted)
    }

    fn can_advance_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Proposed, Self::Captured)
            | (Self::Captured, Self::Presented)
            | (Self::Presented, Self::Approved | Self::Aborted) => true,
            (from, Self::Denied) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl From<&ConfirmationDecision> for FlowState {
    fn from(decision: &ConfirmationDecision) -> Self {
        match decision {
            ConfirmationDecision::Approved => Self::Approved,
            ConfirmationDecision::Denied { .. } => Self::Denied,
            ConfirmationDecision::Aborted { .. } => Self::Aborted,
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Proposed => "proposed",
            Self::Captured => "captured",
            Self::Presented => "presented",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// One run of the flow for one request, with its full state history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationFlow {
    request_id: RequestId,
    history: Vec<FlowState>,
}

impl ConfirmationFlow {
    /// Start a flow in `Proposed`.
    #[must_use]
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            history: vec![FlowState::Proposed],
        }
    }

    /// The request this flow belongs to.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> FlowState {
        self.history.last().copied().unwrap_or(FlowState::Proposed)
    }

    /// Every state visited, in order.
    #[must_use]
    pub fn history(&self) -> &[FlowState] {
        &self.history
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::InvalidTransition`] if `next` is not reachable
    /// from the current state.
    pub fn advance(&mut self, next: FlowState) -> SafetyResult<()> {
        let from = self.state();
        if !from.can_advance_to(next) {
            return Err(SafetyError::InvalidTransition { from, to: next });
        }
        tracing::trace!(request_id = %self.request_id, %from, to = %next, "confirmation flow");
        self.history.push(next);
        Ok(())
    }

    /// Resolve from `Presented` with a human decision.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::InvalidTransition`] if the flow is not awaiting
    /// a decision.
    pub fn resolve(&mut self, decision: &ConfirmationDecision) -> SafetyResult<()> {
        self.advance(FlowState::from(decision))
    }
}
