//! Routing scenarios: local answers, clarification, escalation and the
//! rolling context window.

use std::sync::Arc;

use halfred_router::{
    Compaction, ContextConfig, ContextManager, EscalationRouter, RequestPhase, Role,
    RouteDecision, Verdict,
};
use halfred_test::{MockJudge, MockSummarizer, init_test_logging};

fn router(judge: MockJudge) -> EscalationRouter {
    let context = ContextManager::new(ContextConfig::default(), Arc::new(MockSummarizer::new()));
    EscalationRouter::new(context, Arc::new(judge))
}

fn small_window(summarizer: MockSummarizer) -> ContextManager {
    ContextManager::new(
        ContextConfig {
            max_turns: 4,
            summarize_threshold: 8,
            summarization_attempts: 2,
            ..ContextConfig::default()
        },
        Arc::new(summarizer),
    )
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_local_then_escalate_keeps_counter_clear() {
    init_test_logging();
    let judge = MockJudge::new()
        .with_verdict(Verdict::Local)
        .with_escalate();
    let mut router = router(judge.clone());

    let first = router.decide("what time is it").await;
    assert_eq!(first, RouteDecision::HandleLocally);
    assert_eq!(router.phase(), RequestPhase::ResolvedLocally);
    router.record_response("It's 3pm.").await;

    let second = router.decide("book me a flight to Lisbon").await;
    let RouteDecision::Escalate(request) = second else {
        panic!("expected escalation, got {second:?}");
    };
    assert_eq!(request.request, "book me a flight to Lisbon");
    assert_eq!(router.phase(), RequestPhase::Escalated);
    assert_eq!(router.context().clarification_count(), 0);

    // The backend sees the earlier exchange plus the new turn.
    let turns: Vec<&str> = request
        .context
        .recent_turns
        .iter()
        .map(|t| t.content())
        .collect();
    assert_eq!(
        turns,
        vec!["what time is it", "It's 3pm.", "book me a flight to Lisbon"]
    );
}

#[tokio::test]
async fn test_second_clarification_becomes_escalation() {
    let judge = MockJudge::new()
        .with_clarify("Which file?")
        .with_clarify("Which folder?");
    let mut router = router(judge);

    let first = router.decide("delete the old one").await;
    assert_eq!(first, RouteDecision::AskClarification("Which file?".into()));
    assert_eq!(router.phase(), RequestPhase::Clarifying);
    assert_eq!(router.context().clarification_count(), 1);

    let second = router.decide("the report").await;
    assert!(matches!(second, RouteDecision::Escalate(_)), "{second:?}");
    assert_eq!(router.phase(), RequestPhase::Escalated);
    assert_eq!(router.context().clarification_count(), 0);
}

#[tokio::test]
async fn test_clarification_then_local_answer() {
    let judge = MockJudge::new()
        .with_clarify("Which timer?")
        .with_verdict(Verdict::Local);
    let mut router = router(judge.clone());

    router.decide("cancel the timer").await;
    let decision = router.decide("the pasta one").await;
    assert_eq!(decision, RouteDecision::HandleLocally);
    assert_eq!(router.context().clarification_count(), 0);

    // The judge saw the question it asked as part of the history.
    let seen = judge.seen();
    let (_, snapshot) = &seen[1];
    assert!(snapshot
        .recent_turns
        .iter()
        .any(|t| t.role() == Role::Assistant && t.content() == "Which timer?"));
    assert_eq!(snapshot.clarification_count(), 1);
}

#[tokio::test]
async fn test_clarification_counter_never_exceeds_one() {
    let mut judge = MockJudge::new();
    for i in 0..12 {
        judge = judge.with_clarify(format!("question {i}"));
    }
    let mut router = router(judge);

    for i in 0..12 {
        router.decide(&format!("turn {i}")).await;
        assert!(router.context().clarification_count() <= 1);
    }
}

#[tokio::test]
async fn test_interrupt_returns_to_received() {
    let mut router = router(MockJudge::new().with_clarify("Which one?"));
    router.decide("open it").await;
    assert_eq!(router.phase(), RequestPhase::Clarifying);

    router.interrupt();
    assert_eq!(router.phase(), RequestPhase::Received);
    assert_eq!(router.context().clarification_count(), 0);
}

#[tokio::test]
async fn test_escalation_hint_is_forwarded() {
    let judge = MockJudge::new().with_verdict(Verdict::Escalate {
        hint: Some("needs web search".into()),
    });
    let mut router = router(judge);

    let RouteDecision::Escalate(request) = router.decide("latest news on the launch").await else {
        panic!("expected escalation");
    };
    assert_eq!(request.hint.as_deref(), Some("needs web search"));
}

// ---------------------------------------------------------------------------
// Rolling window
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_threshold_compacts_to_window() {
    let summarizer = MockSummarizer::new();
    let mut context = small_window(summarizer.clone());

    let mut compactions = Vec::new();
    for i in 0..30 {
        if let Some(c) = context.add_turn(Role::User, format!("turn {i}")).await {
            compactions.push(c);
            assert_eq!(context.turn_count(), 4);
        }
        assert!(context.turn_count() < 8);
        assert!(context.get_context().recent_turns.len() <= 4);
    }

    assert!(!compactions.is_empty());
    assert!(
        compactions
            .iter()
            .all(|c| matches!(c, Compaction::Summarized { evicted: 4, attempts: 1 }))
    );
    assert_eq!(summarizer.call_count(), compactions.len());
    assert!(context.summary().is_some_and(|s| !s.is_empty()));

    // The newest turn is always last in the snapshot.
    let snapshot = context.get_context();
    assert_eq!(snapshot.recent_turns.last().map(|t| t.content()), Some("turn 29"));
}

#[tokio::test]
async fn test_failing_summarizer_still_bounds_history() {
    let summarizer = MockSummarizer::failing();
    let mut context = small_window(summarizer.clone());

    for i in 0..8 {
        context.add_turn(Role::User, format!("turn {i}")).await;
    }

    assert_eq!(context.turn_count(), 4);
    assert_eq!(summarizer.call_count(), 2);
    assert_eq!(context.summary(), Some("[4 earlier turns omitted]"));
}

#[tokio::test]
async fn test_retry_recovers_from_one_failure() {
    let summarizer = MockSummarizer::new()
        .with_failure("rate limited")
        .with_summary("user planned a trip");
    let mut context = small_window(summarizer);

    let mut last = None;
    for i in 0..8 {
        last = context.add_turn(Role::User, format!("turn {i}")).await;
    }

    assert_eq!(
        last,
        Some(Compaction::Summarized {
            evicted: 4,
            attempts: 2
        })
    );
    assert_eq!(context.summary(), Some("user planned a trip"));
}

#[tokio::test]
async fn test_summary_leads_backend_messages() {
    let mut context = small_window(MockSummarizer::new().with_summary("talked about cats"));
    for i in 0..8 {
        context.add_turn(Role::User, format!("turn {i}")).await;
    }

    let messages = context.get_context().to_messages();
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[0].role, Role::System);
    assert!(messages[0].content.contains("talked about cats"));
}
