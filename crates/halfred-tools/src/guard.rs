//! Tool guard - gates tool invocations on behalf of one task.

use halfred_safety::{Classification, Command, ConfirmationGate, GateOutcome, Guarded};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{ToolError, ToolResult};
use crate::invocation::{ToolInvocation, command_for_tool};

/// What the guard decided for a single invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolVerdict {
    /// The tool is not imperative and runs without classification.
    Passthrough,
    /// The tool maps onto a command that may run.
    Proceed {
        /// The mapped command.
        command: Command,
        /// Its classification.
        classification: Classification,
    },
    /// The human declined. The backend should be told and may continue.
    Blocked {
        /// The mapped command.
        command: Command,
        /// Its classification.
        classification: Classification,
        /// Why it was blocked.
        reason: String,
    },
}

impl ToolVerdict {
    /// Whether the tool may run.
    #[must_use]
    pub fn may_run(&self) -> bool {
        !matches!(self, Self::Blocked { .. })
    }
}

/// Gates every tool call of one escalated task.
///
/// The guard shares the task's cancellation token: an aborted confirmation
/// cancels it, and cancelling it while a confirmation is pending denies the
/// call.
#[derive(Debug, Clone)]
pub struct ToolGuard {
    gate: Arc<ConfirmationGate>,
    task: CancellationToken,
}

impl ToolGuard {
    /// Create a guard for the task identified by `task`.
    #[must_use]
    pub fn new(gate: Arc<ConfirmationGate>, task: CancellationToken) -> Self {
        Self { gate, task }
    }

    /// The task's cancellation token.
    #[must_use]
    pub fn task(&self) -> &CancellationToken {
        &self.task
    }

    /// The underlying gate.
    #[must_use]
    pub fn gate(&self) -> &Arc<ConfirmationGate> {
        &self.gate
    }

    /// Decide whether `invocation` may run.
    ///
    /// # Errors
    ///
    /// - [`ToolError::InvalidArguments`] if an imperative tool's arguments do
    ///   not describe a command.
    /// - [`ToolError::Aborted`] if the human aborted the task. The task token
    ///   is cancelled by then.
    pub async fn authorize(&self, invocation: &ToolInvocation) -> ToolResult<ToolVerdict> {
        if self.task.is_cancelled() {
            return Err(ToolError::Aborted {
                reason: "task already cancelled".to_string(),
            });
        }

        let Some(command) = command_for_tool(invocation)? else {
            debug!(tool = %invocation.name, "non-imperative tool, passing through");
            return Ok(ToolVerdict::Passthrough);
        };

        match self.gate.check(&command, &self.task).await {
            GateOutcome::Proceed { classification, .. } => Ok(ToolVerdict::Proceed {
                command,
                classification,
            }),
            GateOutcome::Blocked {
                classification,
                reason,
            } => {
                info!(tool = %invocation.name, %reason, "tool call blocked");
                Ok(ToolVerdict::Blocked {
                    command,
                    classification,
                    reason,
                })
            },
            GateOutcome::Aborted { reason, .. } => Err(ToolError::Aborted { reason }),
        }
    }

    /// Authorize `invocation` and run `action` only if allowed.
    ///
    /// Non-imperative tools run with a `Safe` classification.
    ///
    /// # Errors
    ///
    /// Same as [`authorize`](Self::authorize).
    pub async fn run<T, F, Fut>(
        &self,
        invocation: &ToolInvocation,
        action: F,
    ) -> ToolResult<Guarded<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        match self.authorize(invocation).await? {
            ToolVerdict::Passthrough => Ok(Guarded::Executed {
                value: action().await,
                classification: Classification::safe(),
            }),
            ToolVerdict::Proceed { classification, .. } => Ok(Guarded::Executed {
                value: action().await,
                classification,
            }),
            ToolVerdict::Blocked {
                classification,
                reason,
                ..
            } => Ok(Guarded::Blocked {
                classification,
                reason,
            }),
        }
    }
}
