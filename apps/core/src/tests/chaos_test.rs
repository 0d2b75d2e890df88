use crate::actors::supervisor::{PipelineActors, PipelineOptions, TherapySupervisor};
use crate::brain::{CrisisCategory, LlmAssessment, RiskLevel};
use crate::models::{ReviewOutcome, TurnRequest};
use crate::tests::actor_tests::{MockLlmActor, ANALYSIS_LOW};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;

fn supervisor_with(
    analyzer: MockLlmActor,
    primary: MockLlmActor,
    reviewer: MockLlmActor,
    call_timeout: Duration,
) -> TherapySupervisor {
    TherapySupervisor::with_actors(
        PipelineActors {
            analyzer: Arc::new(analyzer),
            primary: Arc::new(primary),
            reviewer: Arc::new(reviewer),
        },
        PipelineOptions {
            call_timeout,
            ..PipelineOptions::default()
        },
    )
}

#[tokio::test]
async fn test_total_outage_still_detects_crisis() {
    let supervisor = supervisor_with(
        MockLlmActor::failing(),
        MockLlmActor::failing(),
        MockLlmActor::failing(),
        Duration::from_millis(200),
    );

    let outcome = supervisor
        .process_turn(TurnRequest::new("أفكر في الانتحار", "s1", 1))
        .await
        .expect("Turn should complete during a full outage");

    assert_eq!(outcome.analysis.crisis_assessment.risk_level, RiskLevel::Critical);
    assert!(outcome
        .analysis
        .crisis_assessment
        .indicators
        .contains(&CrisisCategory::SuicideIdeation));
    assert_eq!(outcome.analysis.emotional_state, LlmAssessment::safe_default().emotional_state);
    assert!(outcome.response.is_fallback());
    assert_eq!(
        outcome.response.text,
        crate::brain::FallbackResponder::default().respond("crisis").text
    );
    assert_eq!(outcome.review, ReviewOutcome::Skipped);
    assert!(outcome.incident.is_some());
}

#[tokio::test]
async fn test_slow_models_are_cut_off() {
    let supervisor = supervisor_with(
        MockLlmActor::new(ANALYSIS_LOW).with_delay(5_000),
        MockLlmActor::new("late reply").with_delay(5_000),
        MockLlmActor::new("APPROVED").with_delay(5_000),
        Duration::from_millis(100),
    );

    let start = Instant::now();
    let outcome = supervisor
        .process_turn(TurnRequest::new("ما أقدر أنام", "s1", 1))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert!(
        elapsed < Duration::from_secs(2),
        "Turn took {:?}, timeouts were not applied",
        elapsed
    );
    assert_eq!(outcome.analysis.confidence, 0.0);
    assert!(outcome.response.is_fallback());
}

#[tokio::test]
async fn test_slow_reviewer_falls_back_after_good_generation() {
    let supervisor = supervisor_with(
        MockLlmActor::new(ANALYSIS_LOW),
        MockLlmActor::new("أنا أسمعك."),
        MockLlmActor::new("APPROVED").with_delay(5_000),
        Duration::from_millis(100),
    );

    let outcome = supervisor
        .process_turn(TurnRequest::new("ما أقدر أنام", "s1", 1))
        .await
        .unwrap();

    assert!(outcome.response.is_fallback());
    assert!(matches!(outcome.review, ReviewOutcome::Failed { .. }));
}

#[tokio::test]
async fn test_concurrent_turns_are_independent() {
    let supervisor = Arc::new(supervisor_with(
        MockLlmActor::new(ANALYSIS_LOW).with_delay(20),
        MockLlmActor::new("أنا معك.").with_delay(20),
        MockLlmActor::new("APPROVED").with_delay(20),
        Duration::from_secs(2),
    ));

    let mut handles = Vec::new();
    for i in 0..10u32 {
        let supervisor = supervisor.clone();
        handles.push(tokio::spawn(async move {
            let transcript = if i % 2 == 0 { "أريد أن أموت" } else { "مرحبا" };
            supervisor
                .process_turn(TurnRequest::new(transcript, format!("session-{}", i), 1))
                .await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.analysis.is_crisis, i % 2 == 0);
        assert!(!outcome.response.is_fallback());
    }
}

#[tokio::test]
async fn test_turns_after_shutdown_use_fallback() {
    let supervisor = supervisor_with(
        MockLlmActor::new(ANALYSIS_LOW),
        MockLlmActor::new("أنا معك."),
        MockLlmActor::new("APPROVED"),
        Duration::from_millis(200),
    );
    supervisor.shutdown().await;

    let outcome = supervisor
        .process_turn(TurnRequest::new("لا أمل", "s1", 3))
        .await
        .unwrap();

    assert!(outcome.analysis.is_crisis);
    assert!(outcome.response.is_fallback());
}
