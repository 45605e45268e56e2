use crate::engine::CrewExecutor;
use crate::graph::{
    AnalysisParams, CreationParams, DiscoveryParams, PipelineParams, TaskGraphBuilder,
    WorkflowParams,
};
use crate::health::{Dependency, HealthGate};
use crate::monitor::WorkerMonitor;
use crate::registry::{standard_crews, WorkerRegistry, DEFAULT_MAX_RPM};
use crate::types::{Crew, CrewKind};
use crewforge_core::{CrewforgeError, CrewforgeResult, WorkflowResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// The workflow entry points.
///
/// Constructed once at start-up and shared by reference with the HTTP layer
/// and the automation scheduler. Every entry point runs the health gate
/// before building any task and always returns a [`WorkflowResult`].
pub struct Orchestrator {
    registry: WorkerRegistry,
    builder: TaskGraphBuilder,
    crews: HashMap<CrewKind, Arc<Crew>>,
    executor: CrewExecutor,
    health: HealthGate,
    dependencies: Vec<Dependency>,
    monitor: Arc<WorkerMonitor>,
}

impl Orchestrator {
    pub fn new(registry: WorkerRegistry, health: HealthGate, dependencies: Vec<Dependency>) -> Self {
        Self::with_max_rpm(registry, health, dependencies, DEFAULT_MAX_RPM)
    }

    pub fn with_max_rpm(
        registry: WorkerRegistry,
        health: HealthGate,
        dependencies: Vec<Dependency>,
        max_rpm: u32,
    ) -> Self {
        let monitor = Arc::new(WorkerMonitor::new());
        Self {
            builder: TaskGraphBuilder::new(registry.clone()),
            registry,
            crews: standard_crews(max_rpm),
            executor: CrewExecutor::new(monitor.clone()),
            health,
            dependencies,
            monitor,
        }
    }

    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    pub fn monitor(&self) -> &Arc<WorkerMonitor> {
        &self.monitor
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn crew(&self, kind: CrewKind) -> Option<&Arc<Crew>> {
        self.crews.get(&kind)
    }

    /// Discover trends. Missing or empty lists use the default platforms and niches.
    pub async fn discover(
        &self,
        platforms: Option<Vec<String>>,
        niches: Option<Vec<String>>,
    ) -> WorkflowResult {
        self.run(WorkflowParams::Discovery(DiscoveryParams::new(platforms, niches)))
            .await
    }

    /// Draft content from trend data.
    pub async fn create(&self, trend_data: Value, content_type: Option<String>) -> WorkflowResult {
        self.run(WorkflowParams::Creation(CreationParams::new(
            trend_data,
            content_type,
        )))
        .await
    }

    /// Analyse content performance over `period` for `metrics`.
    pub async fn analyze_performance(
        &self,
        period: Option<String>,
        metrics: Option<Vec<String>>,
    ) -> WorkflowResult {
        self.analyze(AnalysisParams::new(period, metrics)).await
    }

    pub async fn analyze(&self, params: AnalysisParams) -> WorkflowResult {
        self.run(WorkflowParams::PerformanceAnalysis(params)).await
    }

    /// Discovery through tracking setup for one entity.
    pub async fn run_full_pipeline(&self, entity_id: &str, campaign_config: Value) -> WorkflowResult {
        self.run(WorkflowParams::FullPipeline(PipelineParams {
            entity_id: entity_id.to_string(),
            campaign_config,
        }))
        .await
    }

    /// Shared path for every entry point: gate, build, execute, wrap.
    pub async fn run(&self, params: WorkflowParams) -> WorkflowResult {
        let kind = params.kind();
        let echo = params.echo();
        let start = Instant::now();

        if let Err(e) = self.health.check_required(&self.dependencies).await {
            warn!(workflow = %kind, error = %e, "Workflow blocked by health gate");
            return WorkflowResult::failure(kind, echo, &e);
        }

        let outcome = self.execute(&params).await;
        self.monitor
            .record_workflow(kind, start.elapsed(), outcome.is_ok())
            .await;

        match outcome {
            Ok(raw) => {
                info!(
                    workflow = %kind,
                    entity_id = params.entity_id().unwrap_or("-"),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Workflow succeeded"
                );
                WorkflowResult::success(kind, echo, raw)
            }
            Err(e) => {
                error!(
                    workflow = %kind,
                    entity_id = params.entity_id().unwrap_or("-"),
                    error = %e,
                    "Workflow failed"
                );
                WorkflowResult::failure(kind, echo, &e)
            }
        }
    }

    async fn execute(&self, params: &WorkflowParams) -> CrewforgeResult<String> {
        let kind = params.kind();
        let crew_kind = CrewKind::for_workflow(kind);
        let crew = self.crews.get(&crew_kind).ok_or_else(|| {
            CrewforgeError::Orchestrator(format!("no {crew_kind} crew configured"))
        })?;
        let graph = self.builder.build(params)?;
        let output = self.executor.run(crew, graph).await?;
        Ok(output.raw)
    }
}
