use crate::store::WorkflowStore;
use crate::tracker::WorkflowTracker;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use crewforge_agent::WorkerRole;
use crewforge_core::WorkflowKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::warn;

/// Success rate below which a workflow type is reported.
pub const MIN_SUCCESS_RATE: f64 = 0.8;

/// Average execution time, in seconds, above which a workflow type is reported.
pub fn execution_threshold_secs(workflow: &str) -> f64 {
    match workflow {
        "discovery" => 120.0,
        "creation" => 600.0,
        "performance_analysis" => 180.0,
        "full_pipeline" => 1800.0,
        _ => 300.0,
    }
}

fn default_success_rate(kind: WorkflowKind) -> f64 {
    match kind {
        WorkflowKind::Discovery => 0.95,
        WorkflowKind::Creation => 0.88,
        WorkflowKind::PerformanceAnalysis => 0.92,
        WorkflowKind::FullPipeline => 0.85,
    }
}

fn default_execution_secs(kind: WorkflowKind) -> f64 {
    match kind {
        WorkflowKind::Discovery => 45.2,
        WorkflowKind::Creation => 180.5,
        WorkflowKind::PerformanceAnalysis => 30.8,
        WorkflowKind::FullPipeline => 420.1,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Idle,
    Working,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerMetrics {
    pub tasks_completed: u32,
    pub errors: u32,
    pub duration_ms: u64,
}

/// Live state of one worker role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerState {
    pub role: WorkerRole,
    pub current_run: Option<String>,
    pub status: WorkerStatus,
    pub metrics: WorkerMetrics,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
struct WorkflowStats {
    runs: u32,
    successes: u32,
    total_secs: f64,
}

/// Tracks per-role worker state and per-workflow execution durations.
pub struct WorkerMonitor {
    states: RwLock<HashMap<WorkerRole, WorkerState>>,
    workflows: RwLock<HashMap<WorkflowKind, WorkflowStats>>,
}

impl WorkerMonitor {
    pub fn new() -> Self {
        let states = WorkerRole::ALL
            .into_iter()
            .map(|role| {
                (
                    role,
                    WorkerState {
                        role,
                        current_run: None,
                        status: WorkerStatus::Idle,
                        metrics: WorkerMetrics::default(),
                    },
                )
            })
            .collect();
        Self {
            states: RwLock::new(states),
            workflows: RwLock::new(HashMap::new()),
        }
    }

    /// Mark a worker as executing a task for `run_id`.
    pub async fn start_task(&self, role: WorkerRole, run_id: &str) {
        let mut states = self.states.write().await;
        if let Some(state) = states.get_mut(&role) {
            state.current_run = Some(run_id.to_string());
            state.status = WorkerStatus::Working;
        }
    }

    pub async fn finish_task(&self, role: WorkerRole, elapsed: Duration) {
        let mut states = self.states.write().await;
        if let Some(state) = states.get_mut(&role) {
            state.current_run = None;
            state.status = WorkerStatus::Idle;
            state.metrics.tasks_completed += 1;
            state.metrics.duration_ms += elapsed.as_millis() as u64;
        }
    }

    /// Record a failed invocation. The role stays in `Error` until its next task starts.
    pub async fn record_error(&self, role: WorkerRole, elapsed: Duration) {
        let mut states = self.states.write().await;
        if let Some(state) = states.get_mut(&role) {
            state.current_run = None;
            state.status = WorkerStatus::Error;
            state.metrics.errors += 1;
            state.metrics.duration_ms += elapsed.as_millis() as u64;
        }
    }

    pub async fn record_workflow(&self, kind: WorkflowKind, elapsed: Duration, success: bool) {
        let mut workflows = self.workflows.write().await;
        let stats = workflows.entry(kind).or_default();
        stats.runs += 1;
        stats.total_secs += elapsed.as_secs_f64();
        if success {
            stats.successes += 1;
        }
    }

    pub async fn get_state(&self, role: WorkerRole) -> Option<WorkerState> {
        self.states.read().await.get(&role).cloned()
    }

    /// Worker states in canonical role order.
    pub async fn snapshot(&self) -> Vec<WorkerState> {
        let states = self.states.read().await;
        WorkerRole::ALL
            .iter()
            .filter_map(|role| states.get(role).cloned())
            .collect()
    }

    /// Mean recorded execution time per workflow kind, falling back to a
    /// baseline for kinds that have not run yet.
    pub async fn average_execution_secs(&self) -> BTreeMap<String, f64> {
        let workflows = self.workflows.read().await;
        WorkflowKind::ALL
            .into_iter()
            .map(|kind| {
                let avg = match workflows.get(&kind) {
                    Some(stats) if stats.runs > 0 => stats.total_secs / f64::from(stats.runs),
                    _ => default_execution_secs(kind),
                };
                (kind.to_string(), avg)
            })
            .collect()
    }

    /// In-process success rates for kinds that have run at least once.
    pub async fn local_success_rates(&self) -> BTreeMap<String, f64> {
        self.workflows
            .read()
            .await
            .iter()
            .filter(|(_, s)| s.runs > 0)
            .map(|(kind, s)| (kind.to_string(), f64::from(s.successes) / f64::from(s.runs)))
            .collect()
    }
}

impl Default for WorkerMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerHealth {
    Healthy,
    Degraded,
}

/// One periodic sample of pipeline health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub timestamp: DateTime<Utc>,
    pub active_workflows: usize,
    pub worker_health: BTreeMap<WorkerRole, WorkerHealth>,
    pub success_rates: BTreeMap<String, f64>,
    pub average_execution_secs: BTreeMap<String, f64>,
}

/// Samples workflow outcomes and flags threshold breaches. Reports only.
pub struct PerformanceMonitor {
    tracker: WorkflowTracker,
    workers: Arc<WorkerMonitor>,
    store: Arc<dyn WorkflowStore>,
    window: ChronoDuration,
}

impl PerformanceMonitor {
    pub fn new(
        tracker: WorkflowTracker,
        workers: Arc<WorkerMonitor>,
        store: Arc<dyn WorkflowStore>,
    ) -> Self {
        Self {
            tracker,
            workers,
            store,
            window: ChronoDuration::days(7),
        }
    }

    pub async fn sample(&self) -> PerformanceSnapshot {
        let worker_health = self
            .workers
            .snapshot()
            .await
            .into_iter()
            .map(|state| {
                let health = match state.status {
                    WorkerStatus::Error => WorkerHealth::Degraded,
                    _ => WorkerHealth::Healthy,
                };
                (state.role, health)
            })
            .collect();

        PerformanceSnapshot {
            timestamp: Utc::now(),
            active_workflows: self.tracker.active_count(),
            worker_health,
            success_rates: self.success_rates().await,
            average_execution_secs: self.workers.average_execution_secs().await,
        }
    }

    /// Trailing-window success rates from the store. A store with no data
    /// yields this process's own rates, with baselines for kinds that have not
    /// run; a failing store yields zeros so the outage itself gets reported.
    async fn success_rates(&self) -> BTreeMap<String, f64> {
        match self
            .store
            .workflow_success_rates(Utc::now() - self.window)
            .await
        {
            Ok(Some(rates)) => rates.into_iter().collect(),
            Ok(None) => {
                let mut rates: BTreeMap<String, f64> = WorkflowKind::ALL
                    .into_iter()
                    .map(|k| (k.to_string(), default_success_rate(k)))
                    .collect();
                rates.extend(self.workers.local_success_rates().await);
                rates
            }
            Err(e) => {
                warn!(error = %e, "Could not load workflow success rates");
                WorkflowKind::ALL
                    .into_iter()
                    .map(|k| (k.to_string(), 0.0))
                    .collect()
            }
        }
    }
}

/// Issues worth an operator's attention in `snapshot`.
pub fn detect_issues(snapshot: &PerformanceSnapshot) -> Vec<String> {
    let mut issues = Vec::new();
    for (workflow, rate) in &snapshot.success_rates {
        if *rate < MIN_SUCCESS_RATE {
            issues.push(format!(
                "Low success rate for {workflow}: {:.1}%",
                rate * 100.0
            ));
        }
    }
    for (workflow, avg) in &snapshot.average_execution_secs {
        if *avg > execution_threshold_secs(workflow) {
            issues.push(format!("High execution time for {workflow}: {avg:.1}s"));
        }
    }
    issues
}
