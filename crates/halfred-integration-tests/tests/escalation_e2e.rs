//! Escalation end to end: router decision, driver, backend tool calls
//! through the confirmation gate, and settling the outcome.

use std::sync::Arc;
use std::time::Duration;

use halfred_router::{
    BackendChunk, ChunkKind, ContextConfig, ContextManager, EscalationDriver, EscalationOutcome,
    EscalationRequest, EscalationRouter, RequestPhase, RouteDecision, RouterConfig,
};
use halfred_safety::{ConfirmationDecision, RiskTier};
use halfred_test::{
    MockBackend, MockConfirmationHandler, MockJudge, MockSummarizer, PendingConfirmationHandler,
    init_test_logging, test_bash_call, test_gate, test_search_call,
};
use halfred_tools::ToolVerdict;
use tokio_util::sync::CancellationToken;

fn escalating_router() -> EscalationRouter {
    let context = ContextManager::new(ContextConfig::default(), Arc::new(MockSummarizer::new()));
    EscalationRouter::new(context, Arc::new(MockJudge::new().with_escalate()))
}

async fn escalate(router: &mut EscalationRouter, turn: &str) -> EscalationRequest {
    match router.decide(turn).await {
        RouteDecision::Escalate(request) => request,
        other => panic!("expected escalation, got {other:?}"),
    }
}

async fn driver(
    backend: &MockBackend,
    handler: MockConfirmationHandler,
    config: RouterConfig,
) -> EscalationDriver {
    EscalationDriver::new(Arc::new(backend.clone()), test_gate(handler).await, config)
}

// ---------------------------------------------------------------------------
// Tool calls through the gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_denied_tool_call_never_runs_and_task_continues() {
    init_test_logging();
    let mut router = escalating_router();
    let backend = MockBackend::new()
        .with_tool_call(test_bash_call("rm -rf ~/x"))
        .with_chunk(BackendChunk::text("I left the folder alone."))
        .with_chunk(BackendChunk::complete(""));
    let handler = MockConfirmationHandler::new();
    let driver = driver(&backend, handler.clone(), RouterConfig::default()).await;

    let request = escalate(&mut router, "clean up my home folder").await;
    let mut kinds = Vec::new();
    let outcome = driver
        .run(request, &CancellationToken::new(), |chunk| kinds.push(chunk.kind))
        .await;

    assert_eq!(backend.executed_count(), 0);
    assert_eq!(handler.request_count(), 1);
    assert_eq!(
        handler.requests()[0].classification.tier,
        RiskTier::Dangerous
    );
    assert_eq!(
        kinds,
        vec![
            ChunkKind::ToolStart,
            ChunkKind::Error,
            ChunkKind::TextDelta,
            ChunkKind::Complete
        ]
    );
    let EscalationOutcome::Completed {
        response,
        tool_calls,
        errors,
    } = &outcome
    else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(response, "I left the folder alone.");
    assert_eq!(*tool_calls, 1);
    assert_eq!(errors.len(), 1);

    router.finish_escalation(&outcome).await;
    assert_eq!(router.phase(), RequestPhase::Escalated);
    let last = router.get_context().recent_turns.last().cloned().unwrap();
    assert_eq!(last.content(), "I left the folder alone.");
}

#[tokio::test]
async fn test_approved_tool_call_runs() {
    let mut router = escalating_router();
    let backend = MockBackend::answering("Done.").with_tool_call(test_bash_call("rm -rf ~/x"));
    let driver = driver(
        &backend,
        MockConfirmationHandler::approving(),
        RouterConfig::default(),
    )
    .await;

    let request = escalate(&mut router, "clean up my home folder").await;
    let outcome = driver.run(request, &CancellationToken::new(), |_| {}).await;

    assert!(outcome.is_completed());
    assert_eq!(backend.executed_count(), 1);
    assert!(matches!(backend.verdicts()[0], ToolVerdict::Proceed { .. }));
}

#[tokio::test]
async fn test_read_only_tools_skip_the_gate() {
    let mut router = escalating_router();
    let backend = MockBackend::answering("Here's what I found.")
        .with_tool_call(test_search_call("weather lisbon"))
        .with_tool_call(test_bash_call("ls -la"));
    let handler = MockConfirmationHandler::new();
    let driver = driver(&backend, handler.clone(), RouterConfig::default()).await;

    let request = escalate(&mut router, "what's the weather").await;
    let outcome = driver.run(request, &CancellationToken::new(), |_| {}).await;

    assert!(outcome.is_completed());
    assert_eq!(handler.request_count(), 0);
    assert_eq!(backend.executed_count(), 2);
    assert_eq!(backend.verdicts()[0], ToolVerdict::Passthrough);
}

#[tokio::test]
async fn test_abort_cancels_task_not_session() {
    let mut router = escalating_router();
    let backend = MockBackend::answering("never sent")
        .with_tool_call(test_bash_call("rm -rf ~/x"))
        .with_tool_call(test_bash_call("rm -rf ~/y"));
    let handler = MockConfirmationHandler::new().with_decision(ConfirmationDecision::aborted("stop"));
    let driver = driver(&backend, handler.clone(), RouterConfig::default()).await;
    let interrupt = CancellationToken::new();

    let request = escalate(&mut router, "clean up everything").await;
    let outcome = driver.run(request, &interrupt, |_| {}).await;

    assert!(matches!(outcome, EscalationOutcome::Aborted { .. }), "{outcome:?}");
    assert!(!interrupt.is_cancelled());
    assert_eq!(backend.executed_count(), 0);
    assert_eq!(handler.request_count(), 1);

    router.finish_escalation(&outcome).await;
    assert_eq!(router.phase(), RequestPhase::Received);
    let last = router.get_context().recent_turns.last().cloned().unwrap();
    assert_eq!(last.content(), outcome.user_message().unwrap());
}

// ---------------------------------------------------------------------------
// Timeouts and interrupts
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_timeout_returns_to_received() {
    let mut router = escalating_router();
    let backend = MockBackend::new().hanging();
    let driver = driver(
        &backend,
        MockConfirmationHandler::new(),
        RouterConfig::default().with_timeout_secs(5),
    )
    .await;

    let request = escalate(&mut router, "summarize my inbox").await;
    let outcome = driver.run(request, &CancellationToken::new(), |_| {}).await;
    assert_eq!(
        outcome,
        EscalationOutcome::TimedOut {
            after: Duration::from_secs(5)
        }
    );

    router.finish_escalation(&outcome).await;
    assert_eq!(router.phase(), RequestPhase::Received);
    assert_eq!(router.context().clarification_count(), 0);
}

#[tokio::test]
async fn test_interrupt_during_confirmation_denies_and_stops() {
    let mut router = escalating_router();
    let backend = MockBackend::answering("never sent").with_tool_call(test_bash_call("rm -rf ~/x"));
    let handler = PendingConfirmationHandler::new();
    let driver = EscalationDriver::new(
        Arc::new(backend.clone()),
        test_gate(handler.clone()).await,
        RouterConfig::default(),
    );
    let interrupt = CancellationToken::new();

    let request = escalate(&mut router, "clean up my home folder").await;
    let (outcome, ()) = tokio::join!(driver.run(request, &interrupt, |_| {}), async {
        handler.wait_until_asked().await;
        interrupt.cancel();
    });

    assert_eq!(outcome, EscalationOutcome::Interrupted);
    assert_eq!(outcome.user_message(), None);
    assert_eq!(backend.executed_count(), 0);

    router.finish_escalation(&outcome).await;
    assert_eq!(router.phase(), RequestPhase::Received);
}

#[tokio::test]
async fn test_backend_sees_conversation_snapshot() {
    let context = ContextManager::new(ContextConfig::default(), Arc::new(MockSummarizer::new()));
    let judge = MockJudge::new()
        .with_clarify("Which city?")
        .with_escalate();
    let mut router = EscalationRouter::new(context, Arc::new(judge));
    let backend = MockBackend::answering("Booked.");
    let driver = driver(
        &backend,
        MockConfirmationHandler::new(),
        RouterConfig::default(),
    )
    .await;

    router.decide("book a hotel").await;
    let request = escalate(&mut router, "Porto").await;
    driver.run(request, &CancellationToken::new(), |_| {}).await;

    let seen = backend.requests();
    assert_eq!(seen.len(), 1);
    let contents: Vec<&str> = seen[0]
        .context
        .recent_turns
        .iter()
        .map(|t| t.content())
        .collect();
    assert_eq!(contents, vec!["book a hotel", "Which city?", "Porto"]);
}
