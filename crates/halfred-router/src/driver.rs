//! Escalation driver - runs one escalated request against the backend.
//!
//! The driver owns the task-level cancellation token for the request. It is
//! a child of the caller's interrupt token, so an interrupt cancels the task,
//! and an aborted confirmation cancels only the task. The wait is bounded by
//! an optional timeout. With a [`SessionLog`] attached, every chunk and
//! every failed outcome is recorded in the session's event log.

use futures::StreamExt;
use halfred_safety::ConfirmationGate;
use halfred_telemetry::SessionLog;
use halfred_tools::{ToolError, ToolGuard};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{BackendChunk, BackendExecutor, ChunkKind};
use crate::error::RouterError;
use crate::router::EscalationRequest;

/// Escalation settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Upper bound on one escalation round-trip. `None` waits forever.
    pub escalation_timeout: Option<Duration>,
}

impl RouterConfig {
    /// Timeout from whole seconds; zero disables it.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.escalation_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }
}

/// How an escalation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationOutcome {
    /// The backend finished.
    Completed {
        /// Final response text.
        response: String,
        /// Tool calls started.
        tool_calls: usize,
        /// Recoverable errors the backend reported.
        errors: Vec<String>,
    },
    /// The backend failed.
    Failed {
        /// What went wrong.
        error: String,
    },
    /// The user interrupted.
    Interrupted,
    /// The human aborted the task from a confirmation prompt.
    Aborted {
        /// Reason given.
        reason: String,
    },
    /// The backend did not finish in time.
    TimedOut {
        /// The bound that was exceeded.
        after: Duration,
    },
}

impl EscalationOutcome {
    /// Whether the backend finished.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// What to tell the user when the escalation did not complete.
    ///
    /// Interruptions say nothing: the user is already speaking.
    #[must_use]
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Completed { .. } | Self::Interrupted => None,
            Self::Failed { .. } => {
                Some("Sorry, something went wrong on my end. Let me try that again.".to_string())
            },
            Self::Aborted { .. } => Some("Okay, I've stopped that task.".to_string()),
            Self::TimedOut { .. } => {
                Some("That's taking longer than expected. Let me try again.".to_string())
            },
        }
    }
}

/// Runs escalated requests.
pub struct EscalationDriver {
    executor: Arc<dyn BackendExecutor>,
    gate: Arc<ConfirmationGate>,
    config: RouterConfig,
    session_log: Option<Arc<SessionLog>>,
}

impl EscalationDriver {
    /// Create a driver.
    #[must_use]
    pub fn new(
        executor: Arc<dyn BackendExecutor>,
        gate: Arc<ConfirmationGate>,
        config: RouterConfig,
    ) -> Self {
        Self {
            executor,
            gate,
            config,
            session_log: None,
        }
    }

    /// Record chunks and failed outcomes in `log`.
    #[must_use]
    pub fn with_session_log(mut self, log: Arc<SessionLog>) -> Self {
        self.session_log = Some(log);
        self
    }

    /// The effective configuration.
    #[must_use]
    pub fn config(&self) -> RouterConfig {
        self.config
    }

    /// Run `request` to an outcome, passing every chunk to `on_chunk`.
    ///
    /// Cancelling `interrupt` ends the run as [`EscalationOutcome::Interrupted`];
    /// any confirmation still pending at that point resolves to a denial.
    pub async fn run<F>(
        &self,
        request: EscalationRequest,
        interrupt: &CancellationToken,
        mut on_chunk: F,
    ) -> EscalationOutcome
    where
        F: FnMut(&BackendChunk),
    {
        let task = interrupt.child_token();
        let guard = ToolGuard::new(Arc::clone(&self.gate), task.clone());
        let request_id = request.id;
        debug!(%request_id, timeout = ?self.config.escalation_timeout, "escalating");

        let work = self.consume(request, guard, &mut on_chunk);
        let bounded = async {
            match self.config.escalation_timeout {
                Some(limit) => tokio::time::timeout(limit, work).await.map_err(|_| limit),
                None => Ok(work.await),
            }
        };

        let outcome = tokio::select! {
            biased;
            () = task.cancelled() => {
                if interrupt.is_cancelled() {
                    EscalationOutcome::Interrupted
                } else {
                    EscalationOutcome::Aborted {
                        reason: "task aborted by user".to_string(),
                    }
                }
            },
            result = bounded => match result {
                Ok(outcome) => outcome,
                Err(after) => {
                    task.cancel();
                    EscalationOutcome::TimedOut { after }
                },
            },
        };

        match &outcome {
            EscalationOutcome::Completed { tool_calls, errors, .. } => {
                info!(%request_id, tool_calls, errors = errors.len(), "escalation completed");
            },
            EscalationOutcome::Failed { error } => {
                warn!(%request_id, %error, "escalation failed");
            },
            EscalationOutcome::Interrupted => info!(%request_id, "escalation interrupted"),
            EscalationOutcome::Aborted { reason } => {
                info!(%request_id, %reason, "escalation aborted");
            },
            EscalationOutcome::TimedOut { after } => {
                warn!(%request_id, after_secs = after.as_secs(), "escalation timed out");
            },
        }
        if let Some(log) = &self.session_log {
            record_outcome(log, &outcome);
        }
        outcome
    }

    async fn consume<F>(
        &self,
        request: EscalationRequest,
        guard: ToolGuard,
        on_chunk: &mut F,
    ) -> EscalationOutcome
    where
        F: FnMut(&BackendChunk),
    {
        let mut stream = match self.executor.execute(request, guard).await {
            Ok(stream) => stream,
            Err(e) => return failure(e),
        };

        let mut response = String::new();
        let mut tool_calls: usize = 0;
        let mut errors = Vec::new();

        while let Some(item) = stream.next().await {
            let chunk = match item {
                Ok(chunk) => chunk,
                Err(e) => return failure(e),
            };
            on_chunk(&chunk);
            if let Some(log) = &self.session_log {
                record_chunk(log, &chunk);
            }

            match chunk.kind {
                ChunkKind::TextDelta => response.push_str(&chunk.content),
                ChunkKind::ToolStart => tool_calls = tool_calls.saturating_add(1),
                ChunkKind::Error => errors.push(chunk.content),
                ChunkKind::Complete => {
                    if !chunk.content.is_empty() {
                        response = chunk.content;
                    }
                    break;
                },
                ChunkKind::ToolEnd | ChunkKind::Reasoning => {},
            }
        }

        EscalationOutcome::Completed {
            response,
            tool_calls,
            errors,
        }
    }
}

fn record_chunk(log: &SessionLog, chunk: &BackendChunk) {
    match chunk.kind {
        ChunkKind::TextDelta => log.text_delta(&chunk.content),
        ChunkKind::ToolStart => log.tool_start(
            chunk.content.clone(),
            chunk.metadata.clone().unwrap_or_default(),
        ),
        ChunkKind::ToolEnd => log.tool_end(chunk.content.clone(), true),
        ChunkKind::Error => log.error(chunk.content.clone(), Some("backend")),
        ChunkKind::Complete if chunk.content.is_empty() => log.flush_text(),
        ChunkKind::Complete => log.assistant_message(chunk.content.clone()),
        ChunkKind::Reasoning => {},
    }
}

fn record_outcome(log: &SessionLog, outcome: &EscalationOutcome) {
    log.flush_text();
    match outcome {
        EscalationOutcome::Failed { error } => log.error(error.clone(), Some("escalation")),
        EscalationOutcome::TimedOut { after } => log.error(
            format!("escalation timed out after {}s", after.as_secs()),
            Some("escalation"),
        ),
        EscalationOutcome::Completed { .. }
        | EscalationOutcome::Interrupted
        | EscalationOutcome::Aborted { .. } => {},
    }
}

fn failure(error: RouterError) -> EscalationOutcome {
    match error {
        RouterError::Tool(ToolError::Aborted { reason }) => EscalationOutcome::Aborted { reason },
        other => EscalationOutcome::Failed {
            error: other.to_string(),
        },
    }
}

impl std::fmt::Debug for EscalationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscalationDriver")
            .field("config", &self.config)
            .field("session_log", &self.session_log)
            .finish_non_exhaustive()
    }
}
