//! Turn judge seam.
//!
//! Whether a turn can be answered locally is decided by an external
//! collaborator, usually the realtime model's own reasoning. The router only
//! enforces the bookkeeping around that judgment.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::ConversationContext;
use crate::error::RouterResult;

/// What the judge thinks should happen with a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// The fast path can answer.
    Local,
    /// The request is ambiguous; ask the user this.
    Clarify {
        /// Question to put to the user.
        question: String,
    },
    /// Hand the request to the backend.
    Escalate {
        /// Optional guidance for the backend (e.g. the judge's reading of
        /// the request).
        hint: Option<String>,
    },
}

/// Decides whether a turn is handled locally, clarified, or escalated.
///
/// The context passed in already contains `turn` as its last user turn.
#[async_trait]
pub trait TurnJudge: Send + Sync {
    /// Judge one user turn.
    async fn judge(&self, turn: &str, context: &ConversationContext) -> RouterResult<Verdict>;
}
