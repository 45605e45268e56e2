use crate::monitor::WorkerMonitor;
use crate::types::{Crew, CrewOutput, Process, Task, TaskGraph};
use crewforge_agent::TaskRequest;
use crewforge_core::{CrewforgeError, CrewforgeResult};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

/// Per-invocation execution context: one crew paired with a fresh task list
/// and its own output slots. Nothing here is shared with other runs.
struct CrewRun<'a> {
    run_id: String,
    crew: &'a Crew,
    graph: TaskGraph,
    outputs: Vec<Option<String>>,
}

impl<'a> CrewRun<'a> {
    fn new(crew: &'a Crew, graph: TaskGraph) -> Self {
        let outputs = vec![None; graph.len()];
        Self {
            run_id: Uuid::new_v4().to_string(),
            crew,
            graph,
            outputs,
        }
    }

    /// Upstream outputs for `task`, joined in declaration order.
    fn context_for(&self, task: &Task) -> Option<String> {
        if task.context.is_empty() {
            return None;
        }
        let parts: Vec<&str> = task
            .context
            .iter()
            .filter_map(|&i| self.outputs.get(i).and_then(|o| o.as_deref()))
            .collect();
        Some(parts.join("\n\n"))
    }
}

/// Runs task graphs against crews.
pub struct CrewExecutor {
    monitor: Arc<WorkerMonitor>,
}

impl CrewExecutor {
    pub fn new(monitor: Arc<WorkerMonitor>) -> Self {
        Self { monitor }
    }

    pub fn monitor(&self) -> &Arc<WorkerMonitor> {
        &self.monitor
    }

    /// Execute `graph` on `crew`, strictly in list order.
    ///
    /// Each task receives the outputs of its declared upstream tasks as
    /// context. The first failing task aborts the run; completed outputs are
    /// discarded. On success the aggregate output is the final task's output.
    pub async fn run(&self, crew: &Crew, graph: TaskGraph) -> CrewforgeResult<CrewOutput> {
        let start = Instant::now();

        if let Some(task) = graph.tasks().iter().find(|t| !crew.has_member(t.role())) {
            return Err(CrewforgeError::InvalidGraph(format!(
                "worker {} is not a member of the {} crew",
                task.role(),
                crew.kind()
            )));
        }

        let mut run = CrewRun::new(crew, graph);
        info!(
            run_id = %run.run_id,
            crew = %crew.kind(),
            workflow = %run.graph.workflow(),
            tasks = run.graph.len(),
            "Crew run starting"
        );

        match run.crew.process() {
            Process::Sequential => self.run_sequential(&mut run).await?,
        }

        let raw = run
            .outputs
            .last()
            .cloned()
            .flatten()
            .ok_or_else(|| CrewforgeError::Orchestrator("crew run produced no output".into()))?;

        let duration = start.elapsed();
        info!(
            run_id = %run.run_id,
            crew = %crew.kind(),
            duration_ms = duration.as_millis() as u64,
            "Crew run complete"
        );

        Ok(CrewOutput {
            raw,
            tasks_completed: run.outputs.len(),
            duration,
        })
    }

    async fn run_sequential(&self, run: &mut CrewRun<'_>) -> CrewforgeResult<()> {
        for index in 0..run.graph.len() {
            let task = &run.graph.tasks()[index];
            let request = TaskRequest {
                description: task.description.clone(),
                expected_output: task.expected_output.clone(),
                context: run.context_for(task),
            };
            let role = task.role();
            let worker = task.worker.clone();

            run.crew.ceiling().acquire().await;
            self.monitor.start_task(role, &run.run_id).await;
            info!(run_id = %run.run_id, task_index = index, role = %role, "Executing task");

            let started = Instant::now();
            match worker.invoke(&request).await {
                Ok(output) => {
                    self.monitor.finish_task(role, started.elapsed()).await;
                    run.outputs[index] = Some(output);
                }
                Err(e) => {
                    self.monitor.record_error(role, started.elapsed()).await;
                    error!(
                        run_id = %run.run_id,
                        task_index = index,
                        role = %role,
                        error = %e,
                        "Task failed, aborting crew run"
                    );
                    return Err(match e {
                        CrewforgeError::AgentExecution(_) => e,
                        other => CrewforgeError::AgentExecution(other.to_string()),
                    });
                }
            }
        }
        Ok(())
    }
}
