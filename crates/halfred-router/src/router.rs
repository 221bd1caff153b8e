//! Escalation router - per-request lifecycle and clarification bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::{ContextManager, ConversationContext};
use crate::driver::EscalationOutcome;
use crate::judge::{TurnJudge, Verdict};
use crate::turn::Role;

/// Where the current user request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPhase {
    /// Waiting for or processing a fresh request.
    Received,
    /// One clarification question is outstanding.
    Clarifying,
    /// Answered by the fast path.
    ResolvedLocally,
    /// Handed to the backend.
    Escalated,
}

impl RequestPhase {
    /// Whether the request is resolved.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::ResolvedLocally | Self::Escalated)
    }
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::Clarifying => "clarifying",
            Self::ResolvedLocally => "resolved_locally",
            Self::Escalated => "escalated",
        };
        f.write_str(s)
    }
}

/// A request handed to the backend executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationRequest {
    /// Unique request id.
    pub id: Uuid,
    /// The user's request text.
    pub request: String,
    /// Context snapshot taken when the request was escalated.
    pub context: ConversationContext,
    /// Guidance from the judge.
    pub hint: Option<String>,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
}

impl EscalationRequest {
    /// Create a request with a fresh id.
    #[must_use]
    pub fn new(request: impl Into<String>, context: ConversationContext) -> Self {
        Self {
            id: Uuid::new_v4(),
            request: request.into(),
            context,
            hint: None,
            created_at: Utc::now(),
        }
    }

    /// Attach judge guidance.
    #[must_use]
    pub fn with_hint(mut self, hint: Option<String>) -> Self {
        self.hint = hint;
        self
    }
}

/// Outcome of [`EscalationRouter::decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Answer on the fast path.
    HandleLocally,
    /// Ask the user this question.
    AskClarification(String),
    /// Run this request on the backend.
    Escalate(EscalationRequest),
}

impl RouteDecision {
    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::HandleLocally => "local",
            Self::AskClarification(_) => "clarify",
            Self::Escalate(_) => "escalate",
        }
    }
}

/// Decides the route of every user turn and owns the conversation context.
///
/// At most one clarification is asked per request: a second clarification
/// verdict from the judge is turned into an escalation. The clarification
/// counter is reset at the single point where a request resolves.
pub struct EscalationRouter {
    context: ContextManager,
    judge: Arc<dyn TurnJudge>,
    phase: RequestPhase,
}

impl EscalationRouter {
    /// Create a router over `context`.
    #[must_use]
    pub fn new(context: ContextManager, judge: Arc<dyn TurnJudge>) -> Self {
        Self {
            context,
            judge,
            phase: RequestPhase::Received,
        }
    }

    /// Current request phase.
    #[must_use]
    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    /// Read access to the context manager.
    #[must_use]
    pub fn context(&self) -> &ContextManager {
        &self.context
    }

    /// Snapshot of the conversation.
    #[must_use]
    pub fn get_context(&self) -> ConversationContext {
        self.context.get_context()
    }

    /// Route one user turn.
    ///
    /// The turn is recorded before the judge sees it. A judge failure
    /// escalates, since the backend can do everything the fast path can.
    pub async fn decide(&mut self, turn_text: &str) -> RouteDecision {
        if self.phase.is_terminal() {
            self.phase = RequestPhase::Received;
        }

        self.context.add_turn(Role::User, turn_text).await;
        let snapshot = self.context.get_context();

        let verdict = match self.judge.judge(turn_text, &snapshot).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(error = %e, "turn judge failed, escalating");
                Verdict::Escalate { hint: None }
            },
        };

        let verdict = match verdict {
            Verdict::Clarify { .. } if self.context.clarification_count() >= 1 => {
                debug!("clarification already asked for this request, escalating instead");
                Verdict::Escalate { hint: None }
            },
            other => other,
        };

        let decision = match verdict {
            Verdict::Local => {
                self.resolve(RequestPhase::ResolvedLocally);
                RouteDecision::HandleLocally
            },
            Verdict::Clarify { question } => {
                self.context.increment_clarification();
                self.context.add_turn(Role::Assistant, question.clone()).await;
                self.phase = RequestPhase::Clarifying;
                RouteDecision::AskClarification(question)
            },
            Verdict::Escalate { hint } => {
                let request = EscalationRequest::new(turn_text, snapshot).with_hint(hint);
                self.resolve(RequestPhase::Escalated);
                RouteDecision::Escalate(request)
            },
        };

        info!(
            route = decision.label(),
            phase = %self.phase,
            turns = self.context.turn_count(),
            "turn routed"
        );
        decision
    }

    fn resolve(&mut self, phase: RequestPhase) {
        self.context.reset_clarification();
        self.phase = phase;
    }

    /// Record the eventual response to the current request as an assistant
    /// turn.
    pub async fn record_response(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        self.context.add_turn(Role::Assistant, text).await;
    }

    /// The user interrupted the in-flight request. Returns to `Received`
    /// with a clean counter.
    pub fn interrupt(&mut self) {
        debug!(phase = %self.phase, "request interrupted");
        self.context.reset_clarification();
        self.phase = RequestPhase::Received;
    }

    /// Settle an escalation. Records the response when there is one and
    /// returns to `Received` for anything other than success.
    pub async fn finish_escalation(&mut self, outcome: &EscalationOutcome) {
        match outcome {
            EscalationOutcome::Completed { response, .. } => {
                self.record_response(response).await;
            },
            other => {
                if let EscalationOutcome::TimedOut { after } = other {
                    warn!(after_secs = after.as_secs(), "escalation timed out");
                }
                if let Some(message) = other.user_message() {
                    self.record_response(&message).await;
                }
                self.context.reset_clarification();
                self.phase = RequestPhase::Received;
            },
        }
    }
}

impl fmt::Debug for EscalationRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EscalationRouter")
            .field("context", &self.context)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}
