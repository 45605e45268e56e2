#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Workflow entry points end to end, against a recording worker executor.

mod common;

use common::{healthy_orchestrator, unhealthy_orchestrator, RecordingExecutor};
use crewforge_agent::WorkerRole;
use crewforge_core::{ErrorType, WorkflowKind};
use crewforge_orchestrator::{
    Dependency, HealthProbe, HttpProbe, ProbeOutcome, WorkerStatus,
};
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn full_pipeline_runs_every_stage_in_order_with_cumulative_context() {
    let executor = RecordingExecutor::new();
    let orchestrator = healthy_orchestrator(executor.clone());

    let result = orchestrator
        .run_full_pipeline("user-42", json!({"platforms": ["tiktok"]}))
        .await;

    assert!(result.is_success(), "{:?}", result.error());
    assert_eq!(result.workflow, WorkflowKind::FullPipeline);
    assert_eq!(result.payload(), Some("performance_tracker output"));
    assert_eq!(result.param("entity_id"), Some(&json!("user-42")));
    assert_eq!(
        executor.roles(),
        vec![
            WorkerRole::TrendScout,
            WorkerRole::ContentAnalyzer,
            WorkerRole::ContentCreator,
            WorkerRole::PublishManager,
            WorkerRole::PerformanceTracker,
        ]
    );

    let calls = executor.calls();
    assert!(calls[0].context.is_none());
    assert!(calls[0].description.contains("user-42"));
    for (stage, call) in calls.iter().enumerate().skip(1) {
        let context = call.context.as_deref().unwrap();
        for earlier in &calls[..stage] {
            assert!(
                context.contains(&format!("{} output", earlier.role)),
                "stage {stage} is missing context from {}",
                earlier.role
            );
        }
    }
}

#[tokio::test]
async fn unhealthy_dependency_blocks_before_any_worker_runs() {
    let executor = RecordingExecutor::new();
    let orchestrator = unhealthy_orchestrator(executor.clone());

    let result = orchestrator.discover(None, None).await;

    assert_eq!(result.status(), "error");
    assert_eq!(result.error_type(), Some(ErrorType::ServiceUnavailable));
    assert!(result.error().unwrap().contains("crew-social-tools"));
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn failing_stage_stops_the_run_and_keeps_the_message() {
    let executor = RecordingExecutor::failing_at(WorkerRole::ContentCreator);
    let orchestrator = healthy_orchestrator(executor.clone());

    let result = orchestrator.run_full_pipeline("user-1", json!({})).await;

    assert_eq!(result.error_type(), Some(ErrorType::AgentExecution));
    assert!(result.error().unwrap().contains("content_creator backend exploded"));
    assert_eq!(
        executor.roles(),
        vec![
            WorkerRole::TrendScout,
            WorkerRole::ContentAnalyzer,
            WorkerRole::ContentCreator,
        ]
    );

    let creator = orchestrator
        .monitor()
        .get_state(WorkerRole::ContentCreator)
        .await
        .unwrap();
    assert_eq!(creator.status, WorkerStatus::Error);
}

#[tokio::test]
async fn discovery_echoes_explicit_parameters() {
    let executor = RecordingExecutor::new();
    let orchestrator = healthy_orchestrator(executor.clone());

    let result = orchestrator
        .discover(Some(vec!["youtube".into()]), Some(vec!["tech".into()]))
        .await;

    assert!(result.is_success());
    assert_eq!(result.params, json!({"platforms": ["youtube"], "niches": ["tech"]}));
    let calls = executor.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].description.contains("across youtube"));
    assert!(calls[0].description.contains("niches: tech"));
    assert_eq!(calls[1].context.as_deref(), Some("trend_scout output"));
}

#[tokio::test]
async fn discovery_with_empty_lists_uses_defaults() {
    let orchestrator = healthy_orchestrator(RecordingExecutor::new());
    let result = orchestrator.discover(Some(vec![]), None).await;
    assert_eq!(
        result.params,
        json!({"platforms": ["youtube", "tiktok", "instagram"], "niches": ["general"]})
    );
}

#[tokio::test]
async fn analysis_defaults_period_and_metrics() {
    let executor = RecordingExecutor::new();
    let orchestrator = healthy_orchestrator(executor.clone());

    let result = orchestrator.analyze_performance(None, None).await;

    assert!(result.is_success());
    assert_eq!(result.param("period"), Some(&json!("24h")));
    assert_eq!(
        result.param("metrics"),
        Some(&json!(["views", "engagement", "retention"]))
    );
    assert_eq!(
        executor.roles(),
        vec![WorkerRole::ContentAnalyzer, WorkerRole::PerformanceTracker]
    );
}

#[tokio::test]
async fn creation_interpolates_content_type() {
    let executor = RecordingExecutor::new();
    let orchestrator = healthy_orchestrator(executor.clone());

    let result = orchestrator
        .create(json!({"trend": "duets"}), Some("carousel".into()))
        .await;

    assert!(result.is_success());
    assert_eq!(result.param("content_type"), Some(&json!("carousel")));
    assert!(executor.calls()[0].description.contains("viral carousel content"));
}

#[tokio::test]
async fn workflow_outcomes_feed_the_worker_monitor() {
    let orchestrator = healthy_orchestrator(RecordingExecutor::new());
    orchestrator.discover(None, None).await;

    let scout = orchestrator
        .monitor()
        .get_state(WorkerRole::TrendScout)
        .await
        .unwrap();
    assert_eq!(scout.metrics.tasks_completed, 1);
    assert_eq!(scout.status, WorkerStatus::Idle);

    let rates = orchestrator.monitor().local_success_rates().await;
    assert_eq!(rates.get("discovery"), Some(&1.0));
}

#[tokio::test]
async fn http_probe_healthy_on_2xx() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let probe = HttpProbe::new().unwrap();
    let dep = Dependency::required("tools", format!("{}/health", server.uri()));
    assert_eq!(probe.probe(&dep).await, ProbeOutcome::Healthy);
}

#[tokio::test]
async fn http_probe_unhealthy_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let probe = HttpProbe::new().unwrap();
    let dep = Dependency::required("tools", format!("{}/health", server.uri()));
    match probe.probe(&dep).await {
        ProbeOutcome::Unhealthy(reason) => assert!(reason.contains("500")),
        ProbeOutcome::Healthy => panic!("500 must be unhealthy"),
    }
}

#[tokio::test]
async fn http_probe_unhealthy_when_unreachable() {
    let probe = HttpProbe::new().unwrap();
    let dep = Dependency::required("tools", "http://127.0.0.1:1/health");
    assert!(!probe.probe(&dep).await.is_healthy());
}

#[tokio::test]
async fn health_check_gives_up_on_slow_dependency_after_five_seconds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(6)))
        .mount(&server)
        .await;

    let probe = HttpProbe::new().unwrap();
    let dep = Dependency::required("tools", format!("{}/health", server.uri()));
    let started = Instant::now();
    let outcome = probe.probe(&dep).await;
    let elapsed = started.elapsed();

    match outcome {
        ProbeOutcome::Unhealthy(reason) => {
            assert!(reason.contains("timed out after 5 seconds"), "reason: {reason}")
        }
        ProbeOutcome::Healthy => panic!("a slow dependency must be unhealthy"),
    }
    assert!(elapsed >= Duration::from_secs(5));
    assert!(elapsed < Duration::from_secs(6));
}
