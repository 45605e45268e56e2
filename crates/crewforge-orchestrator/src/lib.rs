//! Workflow orchestration for the crewforge content pipeline.
//!
//! Builds fixed task graphs for each named workflow, runs them on crews of
//! specialist workers behind a pre-flight health gate, and fans workflows out
//! across many users under bounded concurrency with non-AI fallbacks.
//!
//! # Main types
//!
//! - [`Orchestrator`] — Workflow entry points; always returns a structured result.
//! - [`WorkerRegistry`] — The five specialist workers, built once per process.
//! - [`TaskGraphBuilder`] — Turns workflow parameters into an ordered task graph.
//! - [`CrewExecutor`] — Runs a task graph sequentially on a crew.
//! - [`HealthGate`] — Probes required external services before any work starts.
//! - [`ConcurrencyScheduler`] — Batched and semaphore-bounded fan-out.
//! - [`FallbackController`] — Routes failed AI jobs to legacy routines.
//! - [`AutomationScheduler`] — Cron-driven recurring jobs over the user base.
//! - [`PerformanceMonitor`] — Periodic health sampling and threshold checks.

/// Recurring AI jobs over the user base.
pub mod automation;
/// Sequential crew execution.
pub mod engine;
/// Fallback routing for failed jobs.
pub mod fallback;
/// Batched and bounded fan-out.
pub mod fanout;
/// Workflow parameters and task-graph templates.
pub mod graph;
/// Pre-flight dependency health checks.
pub mod health;
/// Worker metrics and performance sampling.
pub mod monitor;
/// Per-crew request ceilings.
pub mod rate_limit;
/// Worker construction and standard crews.
pub mod registry;
/// Cron and interval trigger driver.
pub mod scheduler;
/// Persistence and notification seams.
pub mod store;
/// In-flight workflow run tracking.
pub mod tracker;
/// Workers, tasks, graphs, and crews.
pub mod types;
/// Workflow entry points.
pub mod workflows;

pub use automation::{AutomationConfig, AutomationJob, AutomationScheduler};
pub use engine::CrewExecutor;
pub use fallback::{
    FallbackController, FallbackOutcome, FallbackRoutine, GuardOutcome, WebhookFallback,
};
pub use fanout::{ConcurrencyScheduler, EntityKey, EntityOutcome, FanOutReport};
pub use graph::{
    AnalysisParams, CreationParams, DiscoveryParams, PipelineParams, TaskGraphBuilder,
    WorkflowParams,
};
pub use health::{Dependency, HealthGate, HealthProbe, HttpProbe, ProbeOutcome};
pub use monitor::{
    detect_issues, PerformanceMonitor, PerformanceSnapshot, WorkerHealth, WorkerMonitor,
    WorkerStatus,
};
pub use rate_limit::RateCeiling;
pub use registry::{standard_crews, WorkerRegistry, DEFAULT_MAX_RPM};
pub use scheduler::{CronSchedule, IntervalSchedule, JobAction, ScheduledJob, Scheduler};
pub use store::{LogNotifier, MemoryStore, Notifier, WorkflowStore};
pub use tracker::{RunGuard, WorkflowRun, WorkflowTracker};
pub use types::{Crew, CrewKind, CrewOutput, Process, Task, TaskGraph, Worker};
pub use workflows::Orchestrator;
