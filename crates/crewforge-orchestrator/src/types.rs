use crate::rate_limit::RateCeiling;
use crewforge_agent::{TaskRequest, WorkerExecutor, WorkerProfile, WorkerRole};
use crewforge_core::{CrewforgeError, CrewforgeResult, WorkflowKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A specialist worker: an immutable profile bound to a reasoning backend.
///
/// One instance per role lives for the whole process and is shared, read-only,
/// by every task assigned to that role.
pub struct Worker {
    profile: WorkerProfile,
    executor: Arc<dyn WorkerExecutor>,
}

impl Worker {
    pub fn new(profile: WorkerProfile, executor: Arc<dyn WorkerExecutor>) -> Self {
        Self { profile, executor }
    }

    pub fn role(&self) -> WorkerRole {
        self.profile.role
    }

    pub fn profile(&self) -> &WorkerProfile {
        &self.profile
    }

    /// Execute one task request through the reasoning backend.
    pub async fn invoke(&self, request: &TaskRequest) -> CrewforgeResult<String> {
        self.executor.execute(&self.profile, request).await
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("role", &self.profile.role)
            .field("tools", &self.profile.tools.len())
            .finish_non_exhaustive()
    }
}

/// Position of a task inside its graph.
pub type TaskIndex = usize;

/// One unit of work bound to a worker.
#[derive(Debug, Clone)]
pub struct Task {
    pub description: String,
    pub worker: Arc<Worker>,
    pub expected_output: String,
    /// Upstream tasks whose outputs become this task's input context.
    pub context: Vec<TaskIndex>,
}

impl Task {
    pub fn new(
        description: impl Into<String>,
        worker: Arc<Worker>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            worker,
            expected_output: expected_output.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: Vec<TaskIndex>) -> Self {
        self.context = context;
        self
    }

    pub fn role(&self) -> WorkerRole {
        self.worker.role()
    }
}

/// An ordered, validated task list for one workflow invocation.
///
/// Context links may only point strictly backwards, so list order is always a
/// valid execution order and cycles cannot be expressed.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    workflow: WorkflowKind,
    tasks: Vec<Task>,
}

impl TaskGraph {
    pub fn new(workflow: WorkflowKind, tasks: Vec<Task>) -> CrewforgeResult<Self> {
        if tasks.is_empty() {
            return Err(CrewforgeError::InvalidGraph(format!(
                "{workflow} graph has no tasks"
            )));
        }
        for (index, task) in tasks.iter().enumerate() {
            if let Some(bad) = task.context.iter().find(|&&dep| dep >= index) {
                return Err(CrewforgeError::InvalidGraph(format!(
                    "task {index} references task {bad}, which does not precede it"
                )));
            }
        }
        Ok(Self { workflow, tasks })
    }

    pub fn workflow(&self) -> WorkflowKind {
        self.workflow
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// The standard worker groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrewKind {
    Discovery,
    Creation,
    Publication,
    FullPipeline,
}

impl CrewKind {
    pub const ALL: [CrewKind; 4] = [
        CrewKind::Discovery,
        CrewKind::Creation,
        CrewKind::Publication,
        CrewKind::FullPipeline,
    ];

    /// Worker roles that belong to this crew, in order.
    pub fn members(self) -> Vec<WorkerRole> {
        match self {
            CrewKind::Discovery => vec![WorkerRole::TrendScout, WorkerRole::ContentAnalyzer],
            CrewKind::Creation => vec![WorkerRole::ContentCreator, WorkerRole::ContentAnalyzer],
            CrewKind::Publication => vec![
                WorkerRole::ContentAnalyzer,
                WorkerRole::PerformanceTracker,
            ],
            CrewKind::FullPipeline => WorkerRole::ALL.to_vec(),
        }
    }

    /// The crew that runs a given workflow.
    pub fn for_workflow(workflow: WorkflowKind) -> Self {
        match workflow {
            WorkflowKind::Discovery => CrewKind::Discovery,
            WorkflowKind::Creation => CrewKind::Creation,
            WorkflowKind::PerformanceAnalysis => CrewKind::Publication,
            WorkflowKind::FullPipeline => CrewKind::FullPipeline,
        }
    }
}

impl std::fmt::Display for CrewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrewKind::Discovery => write!(f, "discovery"),
            CrewKind::Creation => write!(f, "creation"),
            CrewKind::Publication => write!(f, "publication"),
            CrewKind::FullPipeline => write!(f, "full_pipeline"),
        }
    }
}

/// How a crew runs its task list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Process {
    /// One task at a time, strictly in list order.
    #[default]
    Sequential,
}

/// A named worker group.
///
/// A crew holds no task list: each invocation brings its own [`TaskGraph`], so
/// concurrent runs against the same crew never alias mutable state. The rate
/// ceiling is the only state shared between runs.
pub struct Crew {
    kind: CrewKind,
    members: Vec<WorkerRole>,
    process: Process,
    memory: bool,
    ceiling: RateCeiling,
}

impl Crew {
    pub fn new(kind: CrewKind, max_rpm: u32) -> Self {
        Self {
            kind,
            members: kind.members(),
            process: Process::Sequential,
            memory: false,
            ceiling: RateCeiling::new(max_rpm),
        }
    }

    pub fn kind(&self) -> CrewKind {
        self.kind
    }

    pub fn members(&self) -> &[WorkerRole] {
        &self.members
    }

    pub fn process(&self) -> Process {
        self.process
    }

    /// Cross-task semantic memory. Always off: it would need an embedding backend.
    pub fn memory(&self) -> bool {
        self.memory
    }

    pub fn max_rpm(&self) -> u32 {
        self.ceiling.max_per_minute()
    }

    pub fn has_member(&self, role: WorkerRole) -> bool {
        self.members.contains(&role)
    }

    pub(crate) fn ceiling(&self) -> &RateCeiling {
        &self.ceiling
    }
}

impl std::fmt::Debug for Crew {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crew")
            .field("kind", &self.kind)
            .field("members", &self.members)
            .field("process", &self.process)
            .field("max_rpm", &self.max_rpm())
            .finish()
    }
}

/// Aggregate output of one crew run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrewOutput {
    /// Raw output of the final task. Intermediate outputs only feed context.
    pub raw: String,
    pub tasks_completed: usize,
    pub duration: Duration,
}
