//! Confirmation gate - runs the confirmation flow for non-safe commands.
//!
//! The [`ConfirmationGate`] coordinates between:
//! - The [`CommandClassifier`] (is confirmation needed at all?)
//! - The [`CaptureProvider`]s (screenshots, diffs)
//! - The [`ConfirmationHandler`] trait (UI implementations)
//!
//! # Gate Flow
//!
//! 1. Classify the command; `Safe` proceeds immediately
//! 2. Run every applicable capture provider, logging failures and
//!    bounding each one by the capture timeout
//! 3. Present the request to the handler and wait, racing the task's
//!    cancellation token and an optional timeout
//! 4. Map the decision onto a [`GateOutcome`]
//!
//! Every failure on the way (no handler, handler error, timeout,
//! cancellation) resolves to a denial. A capture that stalls only drops its
//! artifact; cancellation during capture denies.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::capture::CaptureProvider;
use crate::classifier::{Classification, CommandClassifier};
use crate::command::Command;
use crate::error::{SafetyError, SafetyResult};
use crate::flow::{ConfirmationFlow, FlowState};
use crate::request::{CapturedArtifact, ConfirmationDecision, ConfirmationRequest, RequestId};

/// Trait for UI implementations that ask a human to confirm a command.
///
/// Frontends (terminal, voice) implement this to provide their own UX.
///
/// # Example
///
/// ```rust,ignore
/// use halfred_safety::{ConfirmationDecision, ConfirmationHandler, ConfirmationRequest, SafetyResult};
///
/// struct VoiceHandler;
///
/// #[async_trait::async_trait]
/// impl ConfirmationHandler for VoiceHandler {
///     async fn confirm(&self, request: &ConfirmationRequest) -> SafetyResult<ConfirmationDecision> {
///         // Read the prompt aloud and listen for "yes"...
///         Ok(ConfirmationDecision::Approved)
///     }
/// }
/// ```
#[async_trait]
pub trait ConfirmationHandler: Send + Sync {
    /// Present the request and wait for an answer.
    ///
    /// An error means the human could not be reached; the gate treats it as
    /// a denial.
    async fn confirm(&self, request: &ConfirmationRequest) -> SafetyResult<ConfirmationDecision>;

    /// Whether the handler can receive requests right now.
    fn is_available(&self) -> bool {
        true
    }
}

/// Gate settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    /// When `false`, every command proceeds without asking.
    pub require_confirmation: bool,
    /// Upper bound on the wait for a human. `None` waits until cancelled.
    pub timeout: Option<Duration>,
    /// Upper bound on each capture provider. `None` waits until cancelled.
    pub capture_timeout: Option<Duration>,
}

/// Default bound on a single capture provider.
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            require_confirmation: true,
            timeout: None,
            capture_timeout: Some(DEFAULT_CAPTURE_TIMEOUT),
        }
    }
}

impl GateConfig {
    /// Bound the wait for a human decision.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Bound each capture provider; a provider that overruns is skipped.
    #[must_use]
    pub fn with_capture_timeout(mut self, timeout: Duration) -> Self {
        self.capture_timeout = Some(timeout);
        self
    }

    /// Turn confirmation off entirely.
    #[must_use]
    pub fn without_confirmation(mut self) -> Self {
        self.require_confirmation = false;
        self
    }
}

/// How a command was cleared to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approval {
    /// Classified `Safe`.
    Automatic,
    /// Confirmation is switched off in config.
    ConfirmationDisabled,
    /// A human approved this request.
    Confirmed {
        /// The approved request.
        request_id: RequestId,
    },
}

/// Result of passing a command through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// The command may run.
    Proceed {
        /// Classification of the command.
        classification: Classification,
        /// How it was cleared.
        approval: Approval,
    },
    /// The command must not run; the task continues.
    Blocked {
        /// Classification of the command.
        classification: Classification,
        /// Why it was blocked.
        reason: String,
    },
    /// The command must not run and the whole task is cancelled.
    Aborted {
        /// Classification of the command.
        classification: Classification,
        /// Why the task was aborted.
        reason: String,
    },
}

impl GateOutcome {
    /// Whether the command may run.
    #[must_use]
    pub fn is_proceed(&self) -> bool {
        matches!(self, Self::Proceed { .. })
    }

    /// Whether the enclosing task was aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }

    /// Classification of the command.
    #[must_use]
    pub fn classification(&self) -> &Classification {
        match self {
            Self::Proceed { classification, .. }
            | Self::Blocked { classification, .. }
            | Self::Aborted { classification, .. } => classification,
        }
    }
}

/// Result of [`ConfirmationGate::execute_guarded`] when the task survives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guarded<T> {
    /// The action ran.
    Executed {
        /// What the action returned.
        value: T,
        /// Classification of the command.
        classification: Classification,
    },
    /// The action was skipped. Not an error.
    Blocked {
        /// Classification of the command.
        classification: Classification,
        /// Why it was skipped.
        reason: String,
    },
}

impl<T> Guarded<T> {
    /// The value if the action ran.
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Executed { value, .. } => Some(value),
            Self::Blocked { .. } => None,
        }
    }
}

impl<T> fmt::Display for Guarded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Executed { .. } => write!(f, "executed"),
            Self::Blocked { reason, .. } => write!(f, "blocked: {reason}"),
        }
    }
}

/// The confirmation gate.
pub struct ConfirmationGate {
    classifier: CommandClassifier,
    handler: RwLock<Option<Arc<dyn ConfirmationHandler>>>,
    captures: Vec<Arc<dyn CaptureProvider>>,
    config: GateConfig,
}

impl ConfirmationGate {
    /// Create a gate with no handler and no capture providers.
    #[must_use]
    pub fn new(classifier: CommandClassifier, config: GateConfig) -> Self {
        Self {
            classifier,
            handler: RwLock::new(None),
            captures: Vec::new(),
            config,
        }
    }

    /// Add a capture provider.
    #[must_use]
    pub fn with_capture(mut self, provider: Arc<dyn CaptureProvider>) -> Self {
        self.captures.push(provider);
        self
    }

    /// Register the confirmation handler (UI frontend).
    pub async fn register_handler(&self, handler: Arc<dyn ConfirmationHandler>) {
        *self.handler.write().await = Some(handler);
    }

    /// The classifier in use.
    #[must_use]
    pub fn classifier(&self) -> &CommandClassifier {
        &self.classifier
    }

    /// The gate settings.
    #[must_use]
    pub fn config(&self) -> GateConfig {
        self.config
    }

    /// Decide whether `command` may run.
    ///
    /// `task` is the enclosing task's cancellation token. Cancelling it while
    /// the human is deciding denies the command; an `Aborted` decision
    /// cancels it.
    pub async fn check(&self, command: &Command, task: &CancellationToken) -> GateOutcome {
        let classification = self.classifier.classify(command);

        if !classification.requires_confirmation() {
            return GateOutcome::Proceed {
                classification,
                approval: Approval::Automatic,
            };
        }
        if !self.config.require_confirmation {
            debug!(
                kind = command.kind(),
                tier = %classification.tier,
                "confirmation disabled, proceeding"
            );
            return GateOutcome::Proceed {
                classification,
                approval: Approval::ConfirmationDisabled,
            };
        }

        let (request_id, decision, _flow) = self
            .run_flow(command, classification.clone(), task)
            .await;

        match decision {
            ConfirmationDecision::Approved => GateOutcome::Proceed {
                classification,
                approval: Approval::Confirmed { request_id },
            },
            ConfirmationDecision::Denied { reason } => GateOutcome::Blocked {
                classification,
                reason,
            },
            ConfirmationDecision::Aborted { reason } => {
                warn!(%request_id, %reason, "task aborted at confirmation");
                task.cancel();
                GateOutcome::Aborted {
                    classification,
                    reason,
                }
            },
        }
    }

    /// Run the confirmation flow for an already classified command.
    ///
    /// Returns the decision together with the flow's state history.
    pub async fn run_flow(
        &self,
        command: &Command,
        classification: Classification,
        task: &CancellationToken,
    ) -> (RequestId, ConfirmationDecision, ConfirmationFlow) {
        let request_id = RequestId::new();
        let mut flow = ConfirmationFlow::new(request_id);

        let captured = tokio::select! {
            biased;
            () = task.cancelled() => {
                return deny(flow, request_id, "interrupted while capturing context");
            },
            captured = self.capture_all(command, request_id) => captured,
        };
        step(&mut flow, FlowState::Captured);

        let mut request = ConfirmationRequest::new(command.clone(), classification)
            .with_captured(captured);
        request.id = request_id;

        let handler = {
            let guard = self.handler.read().await;
            guard.as_ref().map(Arc::clone)
        };
        let handler = match handler {
            Some(h) if h.is_available() => h,
            Some(_) => {
                return deny(flow, request_id, "confirmation handler unavailable");
            },
            None => {
                return deny(flow, request_id, "no confirmation handler registered");
            },
        };

        step(&mut flow, FlowState::Presented);
        let decision = tokio::select! {
            biased;
            () = task.cancelled() => {
                warn!(%request_id, "confirmation interrupted, denying");
                ConfirmationDecision::denied("interrupted before a decision was made")
            },
            result = self.await_decision(handler.as_ref(), &request) => match result {
                Ok(decision) => decision,
                Err(e) => {
                    warn!(%request_id, error = %e, "confirmation unavailable, denying");
                    ConfirmationDecision::denied(e.to_string())
                },
            },
        };

        info!(%request_id, tier = %request.classification.tier, %decision, "confirmation resolved");
        step(&mut flow, FlowState::from(&decision));
        (request_id, decision, flow)
    }

    async fn capture_all(&self, command: &Command, request_id: RequestId) -> Vec<CapturedArtifact> {
        let mut captured = Vec::new();
        for provider in self.captures.iter().filter(|p| p.applies_to(command)) {
            let attempt = provider.capture(command);
            let result = match self.config.capture_timeout {
                Some(limit) => match tokio::time::timeout(limit, attempt).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(
                            %request_id,
                            provider = provider.name(),
                            timeout_ms = limit.as_millis(),
                            "context capture timed out, continuing without it"
                        );
                        continue;
                    },
                },
                None => attempt.await,
            };
            match result {
                Ok(artifact) => captured.push(artifact),
                Err(e) => warn!(
                    %request_id,
                    provider = provider.name(),
                    error = %e,
                    "context capture failed, continuing without it"
                ),
            }
        }
        captured
    }

    async fn await_decision(
        &self,
        handler: &dyn ConfirmationHandler,
        request: &ConfirmationRequest,
    ) -> SafetyResult<ConfirmationDecision> {
        let answer = handler.confirm(request);
        let result = match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, answer).await.unwrap_or_else(|_| {
                Err(SafetyError::ConfirmationUnavailable(format!(
                    "timed out after {}ms",
                    limit.as_millis()
                )))
            }),
            None => answer.await,
        };
        result.map_err(|e| match e {
            SafetyError::ConfirmationUnavailable(_) => e,
            other => SafetyError::ConfirmationUnavailable(other.to_string()),
        })
    }

    /// Run `action` only if `command` passes the gate.
    ///
    /// A denial is a normal result ([`Guarded::Blocked`]); an abort is an
    /// error so it unwinds the calling task.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::Aborted`] if the human aborted the task.
    pub async fn execute_guarded<T, F, Fut>(
        &self,
        command: &Command,
        task: &CancellationToken,
        action: F,
    ) -> SafetyResult<Guarded<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        match self.check(command, task).await {
            GateOutcome::Proceed { classification, .. } => Ok(Guarded::Executed {
                value: action().await,
                classification,
            }),
            GateOutcome::Blocked {
                classification,
                reason,
            } => Ok(Guarded::Blocked {
                classification,
                reason,
            }),
            GateOutcome::Aborted { reason, .. } => Err(SafetyError::Aborted { reason }),
        }
    }
}

impl fmt::Debug for ConfirmationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfirmationGate")
            .field("classifier", &self.classifier)
            .field("captures", &self.captures.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn step(flow: &mut ConfirmationFlow, next: FlowState) {
    if let Err(e) = flow.advance(next) {
        tracing::error!(error = %e, "confirmation flow out of order");
    }
}

fn deny(
    mut flow: ConfirmationFlow,
    request_id: RequestId,
    reason: &str,
) -> (RequestId, ConfirmationDecision, ConfirmationFlow) {
    warn!(%request_id, %reason, "confirmation unavailable, denying");
    step(&mut flow, FlowState::Denied);
    let decision = ConfirmationDecision::denied(format!("confirmation unavailable: {reason}"));
    (request_id, decision, flow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{AutomationAction, AutomationKind, FilesystemCommand, FsOperation};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Answers every request with a fixed decision and records what it saw.
    struct FixedHandler {
        decision: ConfirmationDecision,
        seen: Mutex<Vec<ConfirmationRequest>>,
    }

    impl FixedHandler {
        fn new(decision: ConfirmationDecision) -> Arc<Self> {
            Arc::new(Self {
                decision,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ConfirmationHandler for FixedHandler {
        async fn confirm(
            &self,
            request: &ConfirmationRequest,
        ) -> SafetyResult<ConfirmationDecision> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(self.decision.clone())
        }
    }

    struct BrokenHandler;

    #[async_trait]
    impl ConfirmationHandler for BrokenHandler {
        async fn confirm(&self, _: &ConfirmationRequest) -> SafetyResult<ConfirmationDecision> {
            Err(SafetyError::ConfirmationUnavailable("ui crashed".into()))
        }
    }

    struct NeverAnswers;

    #[async_trait]
    impl ConfirmationHandler for NeverAnswers {
        async fn confirm(&self, _: &ConfirmationRequest) -> SafetyResult<ConfirmationDecision> {
            std::future::pending().await
        }
    }

    struct FailingScreenshot;

    #[async_trait]
    impl CaptureProvider for FailingScreenshot {
        fn name(&self) -> &'static str {
            "screenshot"
        }

        fn applies_to(&self, command: &Command) -> bool {
            matches!(command, Command::Automation(_))
        }

        async fn capture(&self, _: &Command) -> SafetyResult<CapturedArtifact> {
            Err(SafetyError::Capture {
                provider: "screenshot",
                message: "no display".into(),
            })
        }
    }

    struct StalledScreenshot;

    #[async_trait]
    impl CaptureProvider for StalledScreenshot {
        fn name(&self) -> &'static str {
            "screenshot"
        }

        fn applies_to(&self, command: &Command) -> bool {
            matches!(command, Command::Automation(_))
        }

        async fn capture(&self, _: &Command) -> SafetyResult<CapturedArtifact> {
            std::future::pending().await
        }
    }

    fn gate() -> ConfirmationGate {
        ConfirmationGate::new(CommandClassifier::default(), GateConfig::default())
    }

    fn click() -> Command {
        AutomationAction::new(AutomationKind::Click).at(10, 10).into()
    }

    // ---- Safe path ----

    #[tokio::test]
    async fn test_safe_command_proceeds_without_handler() {
        let outcome = gate().check(&Command::shell("ls"), &CancellationToken::new()).await;
        assert!(matches!(
            outcome,
            GateOutcome::Proceed {
                approval: Approval::Automatic,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_confirmation_disabled_proceeds() {
        let gate = ConfirmationGate::new(
            CommandClassifier::default(),
            GateConfig::default().without_confirmation(),
        );
        let outcome = gate.check(&Command::shell("rm -rf x"), &CancellationToken::new()).await;
        assert!(matches!(
            outcome,
            GateOutcome::Proceed {
                approval: Approval::ConfirmationDisabled,
                ..
            }
        ));
    }

    // ---- Decisions ----

    #[tokio::test]
    async fn test_approved_proceeds() {
        let gate = gate();
        gate.register_handler(FixedHandler::new(ConfirmationDecision::Approved)).await;
        let outcome = gate.check(&click(), &CancellationToken::new()).await;
        assert!(outcome.is_proceed());
    }

    #[tokio::test]
    async fn test_denied_blocks_without_cancelling_task() {
        let gate = gate();
        gate.register_handler(FixedHandler::new(ConfirmationDecision::denied("nope")))
            .await;
        let task = CancellationToken::new();
        let outcome = gate.check(&click(), &task).await;
        assert!(matches!(outcome, GateOutcome::Blocked { ref reason, .. } if reason == "nope"));
        assert!(!task.is_cancelled());
    }

    #[tokio::test]
    async fn test_abort_cancels_task() {
        let gate = gate();
        gate.register_handler(FixedHandler::new(ConfirmationDecision::aborted("stop")))
            .await;
        let task = CancellationToken::new();
        let outcome = gate.check(&click(), &task).await;
        assert!(outcome.is_aborted());
        assert!(task.is_cancelled());
    }

    // ---- Fail closed ----

    #[tokio::test]
    async fn test_no_handler_denies() {
        let outcome = gate().check(&click(), &CancellationToken::new()).await;
        assert!(matches!(outcome, GateOutcome::Blocked { .. }));
    }

    #[tokio::test]
    async fn test_handler_error_denies() {
        let gate = gate();
        gate.register_handler(Arc::new(BrokenHandler)).await;
        let outcome = gate.check(&click(), &CancellationToken::new()).await;
        assert!(
            matches!(outcome, GateOutcome::Blocked { ref reason, .. } if reason.contains("ui crashed"))
        );
    }

    #[tokio::test]
    async fn test_timeout_denies() {
        let gate = ConfirmationGate::new(
            CommandClassifier::default(),
            GateConfig::default().with_timeout(Duration::from_millis(20)),
        );
        gate.register_handler(Arc::new(NeverAnswers)).await;
        let outcome = gate.check(&click(), &CancellationToken::new()).await;
        assert!(
            matches!(outcome, GateOutcome::Blocked { ref reason, .. } if reason.contains("timed out"))
        );
    }

    #[tokio::test]
    async fn test_cancellation_while_presented_denies() {
        let gate = gate();
        gate.register_handler(Arc::new(NeverAnswers)).await;
        let task = CancellationToken::new();
        let canceller = task.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let (_, decision, flow) = gate
            .run_flow(&click(), crate::classify(&click()), &task)
            .await;
        assert!(matches!(decision, ConfirmationDecision::Denied { .. }));
        assert_eq!(
            flow.history(),
            &[
                FlowState::Proposed,
                FlowState::Captured,
                FlowState::Presented,
                FlowState::Denied
            ]
        );
    }

    // ---- Capture ----

    #[tokio::test]
    async fn test_capture_failure_still_presents() {
        let handler = FixedHandler::new(ConfirmationDecision::Approved);
        let gate = gate().with_capture(Arc::new(FailingScreenshot));
        gate.register_handler(handler.clone()).await;

        let outcome = gate.check(&click(), &CancellationToken::new()).await;
        assert!(outcome.is_proceed());
        let seen = handler.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].captured.is_empty());
    }

    #[tokio::test]
    async fn test_diff_capture_reaches_handler() {
        let handler = FixedHandler::new(ConfirmationDecision::Approved);
        let gate = gate().with_capture(Arc::new(crate::DiffCapture::default()));
        gate.register_handler(handler.clone()).await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.txt").to_string_lossy().to_string();
        let command: Command = FilesystemCommand::new(FsOperation::Write, &path)
            .with_content("hi")
            .into();
        gate.check(&command, &CancellationToken::new()).await;

        let seen = handler.seen.lock().unwrap();
        assert!(matches!(
            &seen[0].captured[0],
            CapturedArtifact::Diff { text } if text.starts_with("[NEW FILE]")
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_capture_is_skipped_after_timeout() {
        let handler = FixedHandler::new(ConfirmationDecision::Approved);
        let gate = ConfirmationGate::new(
            CommandClassifier::default(),
            GateConfig::default().with_capture_timeout(Duration::from_millis(50)),
        )
        .with_capture(Arc::new(StalledScreenshot));
        gate.register_handler(handler.clone()).await;

        let outcome = gate.check(&click(), &CancellationToken::new()).await;
        assert!(outcome.is_proceed());
        let seen = handler.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].captured.is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_during_capture_denies() {
        let handler = FixedHandler::new(ConfirmationDecision::Approved);
        let mut config = GateConfig::default();
        config.capture_timeout = None;
        let gate = ConfirmationGate::new(CommandClassifier::default(), config)
            .with_capture(Arc::new(StalledScreenshot));
        gate.register_handler(handler.clone()).await;

        let task = CancellationToken::new();
        let canceller = task.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let (_, decision, flow) = gate
            .run_flow(&click(), crate::classify(&click()), &task)
            .await;
        assert!(
            matches!(decision, ConfirmationDecision::Denied { ref reason } if reason.contains("interrupted while capturing"))
        );
        assert_eq!(flow.history(), &[FlowState::Proposed, FlowState::Denied]);
        assert!(handler.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_default_capture_timeout_is_bounded() {
        assert_eq!(
            GateConfig::default().capture_timeout,
            Some(DEFAULT_CAPTURE_TIMEOUT)
        );
    }

    // ---- Guarded execution ----

    #[tokio::test]
    async fn test_denied_action_never_runs() {
        let gate = gate();
        gate.register_handler(FixedHandler::new(ConfirmationDecision::denied("no")))
            .await;
        let ran = AtomicBool::new(false);
        let result = gate
            .execute_guarded(&click(), &CancellationToken::new(), || async {
                ran.store(true, Ordering::SeqCst);
            })
            .await
            .unwrap();
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(result.to_string(), "blocked: no");
    }

    #[tokio::test]
    async fn test_aborted_action_never_runs_and_errors() {
        let gate = gate();
        gate.register_handler(FixedHandler::new(ConfirmationDecision::aborted("halt")))
            .await;
        let ran = AtomicBool::new(false);
        let result = gate
            .execute_guarded(&click(), &CancellationToken::new(), || async {
                ran.store(true, Ordering::SeqCst);
            })
            .await;
        assert!(matches!(result, Err(SafetyError::Aborted { .. })));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_approved_action_runs() {
        let gate = gate();
        gate.register_handler(FixedHandler::new(ConfirmationDecision::Approved)).await;
        let result = gate
            .execute_guarded(&click(), &CancellationToken::new(), || async { 42 })
            .await
            .unwrap();
        assert_eq!(result.into_value(), Some(42));
    }
}
