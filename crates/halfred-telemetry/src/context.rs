//! Session context for correlating the turns of one conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One conversation session.
///
/// Held by the turn-processing loop. Every processed turn gets a
/// [`TurnContext`] whose span carries the session id and turn number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    /// Unique session identifier.
    pub session_id: Uuid,
    /// Frontend that opened the session (e.g. `"voice"`, `"cli"`).
    pub source: String,
    /// When the session started.
    pub started_at: DateTime<Utc>,
    /// Turns processed so far.
    pub turns: u64,
}

impl SessionContext {
    /// Start a new session.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            source: source.into(),
            started_at: Utc::now(),
            turns: 0,
        }
    }

    /// Begin the next turn.
    pub fn next_turn(&mut self) -> TurnContext {
        self.turns = self.turns.saturating_add(1);
        TurnContext {
            session_id: self.session_id,
            turn: self.turns,
            started_at: Utc::now(),
        }
    }

    /// Span covering the whole session.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "session",
            session_id = %self.session_id,
            source = %self.source,
        )
    }

    /// First eight characters of the session id, for log lines and prompts.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.session_id.simple().to_string().chars().take(8).collect()
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new("unknown")
    }
}

/// One processed turn within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnContext {
    /// Session the turn belongs to.
    pub session_id: Uuid,
    /// 1-based turn number.
    pub turn: u64,
    /// When processing of the turn started.
    pub started_at: DateTime<Utc>,
}

impl TurnContext {
    /// Span for this turn. Instrument the turn's future with it.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!("turn", session_id = %self.session_id, turn = self.turn)
    }

    /// Milliseconds since the turn started.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }
}
