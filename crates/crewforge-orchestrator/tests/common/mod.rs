//! Shared fixtures: a recording worker executor and orchestrator builders.

#![allow(dead_code, clippy::unwrap_used)]

use async_trait::async_trait;
use crewforge_agent::{TaskRequest, WorkerExecutor, WorkerProfile, WorkerRole};
use crewforge_core::{CrewforgeError, CrewforgeResult, ToolMode, ToolSet};
use crewforge_orchestrator::{
    Dependency, HealthGate, HealthProbe, Orchestrator, ProbeOutcome, WorkerRegistry,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// One recorded worker invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub role: WorkerRole,
    pub description: String,
    pub context: Option<String>,
}

/// Answers every task with `"<role> output"`, recording what it was asked.
#[derive(Default)]
pub struct RecordingExecutor {
    pub calls: Mutex<Vec<Invocation>>,
    fail_role: Option<WorkerRole>,
}

impl RecordingExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_at(role: WorkerRole) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_role: Some(role),
        })
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().clone()
    }

    pub fn roles(&self) -> Vec<WorkerRole> {
        self.calls.lock().iter().map(|c| c.role).collect()
    }
}

#[async_trait]
impl WorkerExecutor for RecordingExecutor {
    async fn execute(
        &self,
        profile: &WorkerProfile,
        request: &TaskRequest,
    ) -> CrewforgeResult<String> {
        self.calls.lock().push(Invocation {
            role: profile.role,
            description: request.description.clone(),
            context: request.context.clone(),
        });
        if self.fail_role == Some(profile.role) {
            return Err(CrewforgeError::AgentExecution(format!(
                "{} backend exploded",
                profile.role
            )));
        }
        Ok(format!("{} output", profile.role))
    }
}

/// Probe with a fixed answer for every dependency.
pub struct StaticProbe(pub ProbeOutcome);

#[async_trait]
impl HealthProbe for StaticProbe {
    async fn probe(&self, _: &Dependency) -> ProbeOutcome {
        self.0.clone()
    }
}

pub fn tools_dependency() -> Dependency {
    Dependency::required("crew-social-tools", "http://tools.internal/health")
}

pub fn orchestrator_with(executor: Arc<dyn WorkerExecutor>, health: HealthGate) -> Orchestrator {
    let tools = ToolSet::standard(ToolMode::MultiPlatform, "http://tools.internal");
    let registry = WorkerRegistry::create_workers(&tools, executor).unwrap();
    Orchestrator::with_max_rpm(registry, health, vec![tools_dependency()], 0)
}

pub fn healthy_orchestrator(executor: Arc<dyn WorkerExecutor>) -> Orchestrator {
    orchestrator_with(
        executor,
        HealthGate::new(Arc::new(StaticProbe(ProbeOutcome::Healthy))),
    )
}

pub fn unhealthy_orchestrator(executor: Arc<dyn WorkerExecutor>) -> Orchestrator {
    orchestrator_with(
        executor,
        HealthGate::new(Arc::new(StaticProbe(ProbeOutcome::Unhealthy(
            "not reachable".into(),
        )))),
    )
}
