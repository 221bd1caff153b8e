//! Mock implementations for testing.
//!
//! All mocks use `std::sync::Mutex` internally so builder methods work
//! without a tokio runtime. They are cheap to clone; clones share state, so
//! a test can keep one handle and give the other to the code under test.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use halfred_router::{
    BackendChunk, BackendExecutor, ChunkStream, ConversationContext, ConversationTurn,
    EscalationRequest, RouterError, RouterResult, Summarizer, TurnJudge, Verdict,
};
use halfred_safety::{
    CaptureProvider, CapturedArtifact, Command, ConfirmationDecision, ConfirmationHandler,
    ConfirmationRequest, Highlighter, SafetyError, SafetyResult, ScreenRegion,
};
use halfred_tools::{ToolGuard, ToolInvocation, ToolVerdict};

fn pop<T>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
    queue.lock().ok().and_then(|mut q| q.pop_front())
}

fn push<T>(queue: &Mutex<VecDeque<T>>, item: T) {
    if let Ok(mut q) = queue.lock() {
        q.push_back(item);
    }
}

// ---------------------------------------------------------------------------
// Confirmation handlers
// ---------------------------------------------------------------------------

/// Scripted confirmation handler.
///
/// Answers with queued decisions in order, then with the default decision
/// (a denial unless changed). Every request is recorded.
#[derive(Debug, Clone)]
pub struct MockConfirmationHandler {
    decisions: Arc<Mutex<VecDeque<ConfirmationDecision>>>,
    default_decision: ConfirmationDecision,
    requests: Arc<Mutex<Vec<ConfirmationRequest>>>,
}

impl MockConfirmationHandler {
    /// Create a handler that denies everything.
    #[must_use]
    pub fn new() -> Self {
        Self {
            decisions: Arc::new(Mutex::new(VecDeque::new())),
            default_decision: ConfirmationDecision::denied("no scripted answer"),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a handler that approves everything.
    #[must_use]
    pub fn approving() -> Self {
        Self::new().with_default_decision(ConfirmationDecision::Approved)
    }

    /// Queue a decision.
    #[must_use]
    pub fn with_decision(self, decision: ConfirmationDecision) -> Self {
        push(&self.decisions, decision);
        self
    }

    /// Set the decision used once the queue is empty.
    #[must_use]
    pub fn with_default_decision(mut self, decision: ConfirmationDecision) -> Self {
        self.default_decision = decision;
        self
    }

    /// Queue a decision after construction.
    pub fn queue_decision(&self, decision: ConfirmationDecision) {
        push(&self.decisions, decision);
    }

    /// Requests seen so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ConfirmationRequest> {
        self.requests
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }

    /// Number of requests seen so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|g| g.len()).unwrap_or_default()
    }
}

impl Default for MockConfirmationHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfirmationHandler for MockConfirmationHandler {
    async fn confirm(&self, request: &ConfirmationRequest) -> SafetyResult<ConfirmationDecision> {
        if let Ok(mut g) = self.requests.lock() {
            g.push(request.clone());
        }
        Ok(pop(&self.decisions).unwrap_or_else(|| self.default_decision.clone()))
    }
}

/// Handler whose channel is down: every call fails.
#[derive(Debug, Clone, Default)]
pub struct FailingConfirmationHandler {
    calls: Arc<AtomicUsize>,
}

impl FailingConfirmationHandler {
    /// Create a failing handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfirmationHandler for FailingConfirmationHandler {
    async fn confirm(&self, _request: &ConfirmationRequest) -> SafetyResult<ConfirmationDecision> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SafetyError::ConfirmationUnavailable(
            "speaker disconnected".to_string(),
        ))
    }
}

/// Handler that never answers, like a human who walked away.
///
/// [`wait_until_asked`](Self::wait_until_asked) resolves once a prompt is
/// pending, so tests can interrupt at the right moment.
#[derive(Debug, Clone, Default)]
pub struct PendingConfirmationHandler {
    asked: Arc<Notify>,
}

impl PendingConfirmationHandler {
    /// Create a handler that never answers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until a confirmation is pending.
    pub async fn wait_until_asked(&self) {
        self.asked.notified().await;
    }
}

#[async_trait]
impl ConfirmationHandler for PendingConfirmationHandler {
    async fn confirm(&self, _request: &ConfirmationRequest) -> SafetyResult<ConfirmationDecision> {
        self.asked.notify_one();
        std::future::pending().await
    }
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

/// Capture provider with a fixed result.
#[derive(Debug, Clone)]
pub struct MockCaptureProvider {
    result: Result<CapturedArtifact, String>,
    stalls: bool,
    calls: Arc<AtomicUsize>,
}

impl MockCaptureProvider {
    /// A provider that always returns `artifact`.
    #[must_use]
    pub fn returning(artifact: CapturedArtifact) -> Self {
        Self {
            result: Ok(artifact),
            stalls: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A provider that always fails with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            result: Err(message.into()),
            stalls: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A provider that never finishes, like a screenshot tool that hangs.
    #[must_use]
    pub fn stalled() -> Self {
        Self {
            stalls: true,
            ..Self::failing("stalled")
        }
    }

    /// Number of captures attempted.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureProvider for MockCaptureProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn applies_to(&self, _command: &Command) -> bool {
        true
    }

    async fn capture(&self, _command: &Command) -> SafetyResult<CapturedArtifact> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.stalls {
            std::future::pending::<()>().await;
        }
        self.result.clone().map_err(|message| SafetyError::Capture {
            provider: "mock",
            message,
        })
    }
}

/// Highlighter that records every region it was asked to mark.
#[derive(Debug, Clone, Default)]
pub struct MockHighlighter {
    regions: Arc<Mutex<Vec<ScreenRegion>>>,
}

impl MockHighlighter {
    /// A highlighter that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Regions highlighted so far.
    #[must_use]
    pub fn regions(&self) -> Vec<ScreenRegion> {
        self.regions.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Highlighter for MockHighlighter {
    async fn highlight(&self, region: ScreenRegion, _duration: Duration) -> SafetyResult<()> {
        if let Ok(mut g) = self.regions.lock() {
            g.push(region);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Router collaborators
// ---------------------------------------------------------------------------

/// Scripted summarizer.
///
/// Queued results are used first; afterwards it answers
/// `"<n> earlier turns"`, or fails when built with
/// [`failing`](Self::failing).
#[derive(Debug, Clone)]
pub struct MockSummarizer {
    results: Arc<Mutex<VecDeque<Result<String, String>>>>,
    fail_by_default: bool,
    calls: Arc<AtomicUsize>,
}

impl MockSummarizer {
    /// A summarizer that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            results: Arc::new(Mutex::new(VecDeque::new())),
            fail_by_default: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A summarizer that always fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_by_default: true,
            ..Self::new()
        }
    }

    /// Queue a summary.
    #[must_use]
    pub fn with_summary(self, summary: impl Into<String>) -> Self {
        push(&self.results, Ok(summary.into()));
        self
    }

    /// Queue a failure.
    #[must_use]
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        push(&self.results, Err(message.into()));
        self
    }

    /// Number of calls so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, turns: &[ConversationTurn]) -> RouterResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match pop(&self.results) {
            Some(result) => result.map_err(RouterError::Summarization),
            None if self.fail_by_default => {
                Err(RouterError::Summarization("summarizer offline".to_string()))
            },
            None => Ok(format!("{} earlier turns", turns.len())),
        }
    }
}

/// Scripted turn judge.
///
/// Answers with queued verdicts, then with [`Verdict::Local`]. Records the
/// turns and snapshots it was shown.
#[derive(Debug, Clone, Default)]
pub struct MockJudge {
    verdicts: Arc<Mutex<VecDeque<Verdict>>>,
    seen: Arc<Mutex<Vec<(String, ConversationContext)>>>,
}

impl MockJudge {
    /// Create a judge that answers locally.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a verdict.
    #[must_use]
    pub fn with_verdict(self, verdict: Verdict) -> Self {
        push(&self.verdicts, verdict);
        self
    }

    /// Queue a clarification verdict.
    #[must_use]
    pub fn with_clarify(self, question: impl Into<String>) -> Self {
        self.with_verdict(Verdict::Clarify {
            question: question.into(),
        })
    }

    /// Queue an escalation verdict.
    #[must_use]
    pub fn with_escalate(self) -> Self {
        self.with_verdict(Verdict::Escalate { hint: None })
    }

    /// Turns judged so far, with the snapshot each was judged against.
    #[must_use]
    pub fn seen(&self) -> Vec<(String, ConversationContext)> {
        self.seen.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TurnJudge for MockJudge {
    async fn judge(&self, turn: &str, context: &ConversationContext) -> RouterResult<Verdict> {
        if let Ok(mut g) = self.seen.lock() {
            g.push((turn.to_string(), context.clone()));
        }
        Ok(pop(&self.verdicts).unwrap_or(Verdict::Local))
    }
}

/// Scripted backend executor.
///
/// Runs its tool calls through the guard first, reporting each as a
/// `tool_start` followed by `tool_end` (ran) or `error` (blocked), then
/// replays its chunks. A guard error ends the execution with that error.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    tool_calls: Vec<ToolInvocation>,
    chunks: Vec<BackendChunk>,
    hang: bool,
    requests: Arc<Mutex<Vec<EscalationRequest>>>,
    verdicts: Arc<Mutex<Vec<ToolVerdict>>>,
    executed: Arc<AtomicUsize>,
}

impl MockBackend {
    /// A backend that immediately completes with no output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that answers `text` and completes.
    #[must_use]
    pub fn answering(text: impl Into<String>) -> Self {
        Self::new()
            .with_chunk(BackendChunk::text(text))
            .with_chunk(BackendChunk::complete(""))
    }

    /// Add a tool call made before the chunks are replayed.
    #[must_use]
    pub fn with_tool_call(mut self, invocation: ToolInvocation) -> Self {
        self.tool_calls.push(invocation);
        self
    }

    /// Add a chunk to replay.
    #[must_use]
    pub fn with_chunk(mut self, chunk: BackendChunk) -> Self {
        self.chunks.push(chunk);
        self
    }

    /// Never finish the stream after the tool calls.
    #[must_use]
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<EscalationRequest> {
        self.requests.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Guard verdicts for the tool calls made so far.
    #[must_use]
    pub fn verdicts(&self) -> Vec<ToolVerdict> {
        self.verdicts.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Tool calls that were allowed to run.
    #[must_use]
    pub fn executed_count(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendExecutor for MockBackend {
    async fn execute(&self, request: EscalationRequest, tools: ToolGuard) -> RouterResult<ChunkStream> {
        if let Ok(mut g) = self.requests.lock() {
            g.push(request);
        }

        let mut out = Vec::new();
        for call in &self.tool_calls {
            let verdict = tools.authorize(call).await?;
            out.push(BackendChunk::tool_start(call.name.clone()));
            match &verdict {
                ToolVerdict::Blocked { reason, .. } => out.push(BackendChunk::error(reason.clone())),
                _ => {
                    self.executed.fetch_add(1, Ordering::SeqCst);
                    out.push(BackendChunk::tool_end("ok"));
                },
            }
            if let Ok(mut g) = self.verdicts.lock() {
                g.push(verdict);
            }
        }

        if self.hang {
            return Ok(stream::iter(out.into_iter().map(Ok))
                .chain(stream::pending())
                .boxed());
        }
        out.extend(self.chunks.iter().cloned());
        Ok(stream::iter(out.into_iter().map(Ok)).boxed())
    }
}
