//! Rolling conversation context and auto-summarization.
//!
//! The [`ContextManager`] keeps the turn history of one session. Turns
//! accumulate until the stored count reaches the summarization threshold;
//! then everything older than the rolling window is handed to the
//! [`Summarizer`] and replaced by a summary string. Snapshots handed out by
//! [`ContextManager::get_context`] never hold more than the window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::summarizer::Summarizer;
use crate::turn::{ChatMessage, ConversationTurn, Role};

/// Context window settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Rolling window: turns included in every snapshot.
    pub max_turns: usize,
    /// Stored turn count that triggers summarization.
    pub summarize_threshold: usize,
    /// Summarizer calls before falling back to dropping turns.
    pub summarization_attempts: u32,
    /// Upper bound on one summarizer call. An attempt that overruns counts
    /// as failed. `None` waits as long as the summarizer takes.
    #[serde(default = "default_summarization_timeout")]
    pub summarization_timeout: Option<Duration>,
}

/// Default bound on a single summarizer call.
pub const DEFAULT_SUMMARIZATION_TIMEOUT: Duration = Duration::from_secs(10);

fn default_summarization_timeout() -> Option<Duration> {
    Some(DEFAULT_SUMMARIZATION_TIMEOUT)
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_turns: 10,
            summarize_threshold: 20,
            summarization_attempts: 2,
            summarization_timeout: default_summarization_timeout(),
        }
    }
}

impl ContextConfig {
    /// Clamp into a usable shape: a window of at least one turn, a
    /// threshold above the window, and at least one attempt.
    #[must_use]
    pub fn normalized(self) -> Self {
        let max_turns = self.max_turns.max(1);
        Self {
            max_turns,
            summarize_threshold: self
                .summarize_threshold
                .max(max_turns.saturating_add(1)),
            summarization_attempts: self.summarization_attempts.max(1),
            summarization_timeout: self.summarization_timeout,
        }
    }
}

/// Session bookkeeping carried in every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// When the context manager was created.
    pub session_start: DateTime<Utc>,
    /// Turns currently stored, which may exceed the window.
    pub total_turns: usize,
    /// Clarifications asked for the current request.
    pub clarification_count: u32,
}

/// Immutable snapshot of the conversation, safe to hand to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    /// Most recent turns, oldest first, at most the window bound.
    pub recent_turns: Vec<ConversationTurn>,
    /// Rolling summary of evicted turns.
    pub summary: Option<String>,
    /// Session bookkeeping.
    pub metadata: SessionMetadata,
}

impl ConversationContext {
    /// Render as backend messages: the summary first as a system message,
    /// then the window turns.
    #[must_use]
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        let summary = self
            .summary
            .as_ref()
            .map(|s| ChatMessage::system(format!("Previous conversation summary:\n{s}")));
        summary
            .into_iter()
            .chain(self.recent_turns.iter().map(ConversationTurn::to_message))
            .collect()
    }

    /// Clarifications asked for the current request.
    #[must_use]
    pub fn clarification_count(&self) -> u32 {
        self.metadata.clarification_count
    }
}

/// What happened to the overflow during [`ContextManager::add_turn`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compaction {
    /// The evicted turns were summarized.
    Summarized {
        /// Turns folded into the summary.
        evicted: usize,
        /// Summarizer calls it took.
        attempts: u32,
    },
    /// Every attempt failed; the evicted turns were dropped.
    Dropped {
        /// Turns dropped.
        evicted: usize,
        /// Last summarizer error.
        error: String,
    },
}

/// Owns the turn history, rolling summary, and clarification counter.
///
/// Mutating methods take `&mut self`, so there is exactly one writer at a
/// time. Share it behind a `tokio::sync::Mutex` if turns are processed from
/// more than one task.
pub struct ContextManager {
    config: ContextConfig,
    summarizer: Arc<dyn Summarizer>,
    turns: Vec<ConversationTurn>,
    summary: Option<String>,
    clarification_count: u32,
    session_start: DateTime<Utc>,
}

impl ContextManager {
    /// Create an empty context. `config` is normalized first.
    #[must_use]
    pub fn new(config: ContextConfig, summarizer: Arc<dyn Summarizer>) -> Self {
        let normalized = config.normalized();
        if normalized != config {
            debug!(?config, ?normalized, "context config adjusted");
        }
        Self {
            config: normalized,
            summarizer,
            turns: Vec::new(),
            summary: None,
            clarification_count: 0,
            session_start: Utc::now(),
        }
    }

    /// The effective configuration.
    #[must_use]
    pub fn config(&self) -> ContextConfig {
        self.config
    }

    /// Turns currently stored.
    #[must_use]
    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    /// The rolling summary.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Clarifications asked for the current request.
    #[must_use]
    pub fn clarification_count(&self) -> u32 {
        self.clarification_count
    }

    /// Append a turn, compacting the history if it reached the threshold.
    ///
    /// Never fails: when summarization keeps failing the oldest turns are
    /// dropped and an omission marker goes into the summary.
    pub async fn add_turn(&mut self, role: Role, content: impl Into<String>) -> Option<Compaction> {
        self.turns.push(ConversationTurn::new(role, content));
        if self.turns.len() < self.config.summarize_threshold {
            return None;
        }
        Some(self.compact().await)
    }

    async fn compact(&mut self) -> Compaction {
        let evict = self.turns.len().saturating_sub(self.config.max_turns);
        let evicted: Vec<ConversationTurn> = self.turns.drain(..evict).collect();
        let evicted_count = evicted.len();

        let mut attempts: u32 = 0;
        let mut last_error = String::new();
        while attempts < self.config.summarization_attempts {
            attempts = attempts.saturating_add(1);
            match self.summarize_once(&evicted).await {
                Ok(text) if !text.trim().is_empty() => {
                    self.merge_summary(text.trim());
                    info!(
                        evicted = evicted_count,
                        attempts,
                        remaining = self.turns.len(),
                        "summarized old context"
                    );
                    return Compaction::Summarized {
                        evicted: evicted_count,
                        attempts,
                    };
                },
                Ok(_) => last_error = "summarizer returned an empty summary".to_string(),
                Err(e) => last_error = e,
            }
            warn!(attempt = attempts, error = %last_error, "summarization attempt failed");
        }

        warn!(
            evicted = evicted_count,
            error = %last_error,
            "summarization failed, dropping oldest turns"
        );
        self.merge_summary(&format!("[{evicted_count} earlier turns omitted]"));
        Compaction::Dropped {
            evicted: evicted_count,
            error: last_error,
        }
    }

    async fn summarize_once(&self, turns: &[ConversationTurn]) -> Result<String, String> {
        let call = self.summarizer.summarize(turns);
        let result = match self.config.summarization_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| format!("summarizer timed out after {}ms", limit.as_millis()))?,
            None => call.await,
        };
        result.map_err(|e| e.to_string())
    }

    fn merge_summary(&mut self, new: &str) {
        self.summary = Some(match self.summary.take() {
            Some(old) => format!("{old}\n\nLater: {new}"),
            None => new.to_string(),
        });
    }

    /// Count one clarification question for the current request.
    pub fn increment_clarification(&mut self) {
        self.clarification_count = self.clarification_count.saturating_add(1);
    }

    /// Reset the clarification counter. Called when a request is resolved.
    pub fn reset_clarification(&mut self) {
        self.clarification_count = 0;
    }

    /// Snapshot of the summary, the last `max_turns` turns, and metadata.
    #[must_use]
    pub fn get_context(&self) -> ConversationContext {
        let start = self.turns.len().saturating_sub(self.config.max_turns);
        ConversationContext {
            recent_turns: self.turns.get(start..).unwrap_or_default().to_vec(),
            summary: self.summary.clone(),
            metadata: SessionMetadata {
                session_start: self.session_start,
                total_turns: self.turns.len(),
                clarification_count: self.clarification_count,
            },
        }
    }
}

impl std::fmt::Debug for ContextManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextManager")
            .field("config", &self.config)
            .field("turns", &self.turns.len())
            .field("has_summary", &self.summary.is_some())
            .field("clarification_count", &self.clarification_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RouterError, RouterResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` calls, then returns a fixed summary.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    impl Flaky {
        fn new(failures: u32) -> Arc<Self> {
            Arc::new(Self {
                failures,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl Summarizer for Flaky {
        async fn summarize(&self, turns: &[ConversationTurn]) -> RouterResult<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(RouterError::Summarization("model unavailable".into()));
            }
            Ok(format!("{} turns about numbers", turns.len()))
        }
    }

    fn small() -> ContextConfig {
        ContextConfig {
            max_turns: 3,
            summarize_threshold: 5,
            summarization_attempts: 2,
            summarization_timeout: Some(Duration::from_secs(1)),
        }
    }

    async fn fill(ctx: &mut ContextManager, n: usize) -> Vec<Option<Compaction>> {
        let mut out = Vec::new();
        for i in 0..n {
            out.push(ctx.add_turn(Role::User, format!("turn {i}")).await);
        }
        out
    }

    // ---- config ----

    #[test]
    fn test_config_normalized() {
        let bad = ContextConfig {
            max_turns: 0,
            summarize_threshold: 0,
            summarization_attempts: 0,
            summarization_timeout: None,
        };
        assert_eq!(
            bad.normalized(),
            ContextConfig {
                max_turns: 1,
                summarize_threshold: 2,
                summarization_attempts: 1,
                summarization_timeout: None,
            }
        );
        assert_eq!(ContextConfig::default().normalized(), ContextConfig::default());
    }

    // ---- window and summarization ----

    #[tokio::test]
    async fn test_below_threshold_keeps_everything() {
        let mut ctx = ContextManager::new(small(), Flaky::new(0));
        let results = fill(&mut ctx, 4).await;
        assert!(results.iter().all(Option::is_none));
        assert_eq!(ctx.turn_count(), 4);
        assert!(ctx.summary().is_none());

        // The snapshot is bounded by the window even before compaction.
        let snap = ctx.get_context();
        assert_eq!(snap.recent_turns.len(), 3);
        assert_eq!(snap.recent_turns[0].content(), "turn 1");
        assert_eq!(snap.metadata.total_turns, 4);
    }

    #[tokio::test]
    async fn test_threshold_triggers_summary() {
        let mut ctx = ContextManager::new(small(), Flaky::new(0));
        let results = fill(&mut ctx, 5).await;

        assert_eq!(
            results[4],
            Some(Compaction::Summarized {
                evicted: 2,
                attempts: 1
            })
        );
        assert_eq!(ctx.turn_count(), 3);
        assert_eq!(ctx.summary(), Some("2 turns about numbers"));
    }

    #[tokio::test]
    async fn test_summaries_merge() {
        let mut ctx = ContextManager::new(small(), Flaky::new(0));
        fill(&mut ctx, 5).await;
        fill(&mut ctx, 2).await;
        assert_eq!(ctx.turn_count(), 3);
        assert_eq!(
            ctx.summary(),
            Some("2 turns about numbers\n\nLater: 2 turns about numbers")
        );
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let summarizer = Flaky::new(1);
        let mut ctx = ContextManager::new(small(), summarizer.clone());
        let results = fill(&mut ctx, 5).await;

        assert_eq!(
            results[4],
            Some(Compaction::Summarized {
                evicted: 2,
                attempts: 2
            })
        );
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_drops_turns_with_marker() {
        let mut ctx = ContextManager::new(small(), Flaky::new(u32::MAX));
        let results = fill(&mut ctx, 5).await;

        assert!(matches!(
            results[4],
            Some(Compaction::Dropped { evicted: 2, .. })
        ));
        assert_eq!(ctx.turn_count(), 3);
        assert_eq!(ctx.summary(), Some("[2 earlier turns omitted]"));
    }

    #[tokio::test]
    async fn test_empty_summary_counts_as_failure() {
        struct Blank;
        #[async_trait]
        impl Summarizer for Blank {
            async fn summarize(&self, _turns: &[ConversationTurn]) -> RouterResult<String> {
                Ok("   ".into())
            }
        }

        let mut ctx = ContextManager::new(small(), Arc::new(Blank));
        fill(&mut ctx, 5).await;
        assert_eq!(ctx.summary(), Some("[2 earlier turns omitted]"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_summarizer_times_out_and_drops() {
        struct Stalled(AtomicU32);
        #[async_trait]
        impl Summarizer for Stalled {
            async fn summarize(&self, _turns: &[ConversationTurn]) -> RouterResult<String> {
                self.0.fetch_add(1, Ordering::SeqCst);
                std::future::pending().await
            }
        }

        let summarizer = Arc::new(Stalled(AtomicU32::new(0)));
        let mut ctx = ContextManager::new(small(), summarizer.clone());
        let results = fill(&mut ctx, 5).await;

        assert!(matches!(
            &results[4],
            Some(Compaction::Dropped { evicted: 2, error }) if error.contains("timed out")
        ));
        assert_eq!(summarizer.0.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.summary(), Some("[2 earlier turns omitted]"));
    }

    #[test]
    fn test_config_without_timeout_deserializes_bounded() {
        let config: ContextConfig = serde_json::from_str(
            r#"{"max_turns":3,"summarize_threshold":5,"summarization_attempts":1}"#,
        )
        .unwrap();
        assert_eq!(
            config.summarization_timeout,
            Some(DEFAULT_SUMMARIZATION_TIMEOUT)
        );
    }

    // ---- snapshot ----

    #[tokio::test]
    async fn test_to_messages() {
        let mut ctx = ContextManager::new(small(), Flaky::new(0));
        fill(&mut ctx, 5).await;
        ctx.add_turn(Role::Assistant, "done").await;

        let messages = ctx.get_context().to_messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.starts_with("Previous conversation summary:\n"));
        assert_eq!(messages[3], ChatMessage {
            role: Role::Assistant,
            content: "done".into()
        });
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let mut ctx = ContextManager::new(small(), Flaky::new(0));
        ctx.add_turn(Role::User, "first").await;
        let snap = ctx.get_context();
        ctx.add_turn(Role::User, "second").await;
        ctx.increment_clarification();

        assert_eq!(snap.recent_turns.len(), 1);
        assert_eq!(snap.clarification_count(), 0);
    }

    // ---- clarification ----

    #[test]
    fn test_clarification_counter() {
        let mut ctx = ContextManager::new(small(), Flaky::new(0));
        ctx.increment_clarification();
        assert_eq!(ctx.clarification_count(), 1);
        assert_eq!(ctx.get_context().clarification_count(), 1);
        ctx.reset_clarification();
        assert_eq!(ctx.clarification_count(), 0);
    }
}
