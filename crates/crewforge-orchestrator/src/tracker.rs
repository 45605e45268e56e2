use chrono::{DateTime, Utc};
use crewforge_core::WorkflowKind;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// An in-flight workflow run. Not an audit record: it disappears on completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub run_id: String,
    pub workflow: WorkflowKind,
    pub entity_id: String,
    pub started_at: DateTime<Utc>,
}

/// Registry of workflow runs currently executing, shared by every fan-out branch.
#[derive(Debug, Clone, Default)]
pub struct WorkflowTracker {
    runs: Arc<Mutex<HashMap<String, WorkflowRun>>>,
}

impl WorkflowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a run. It stays live until the returned guard is dropped,
    /// whichever way the run ends.
    pub fn begin(&self, workflow: WorkflowKind, entity_id: &str) -> RunGuard {
        let run = WorkflowRun {
            run_id: format!("{workflow}_{entity_id}_{}", Uuid::new_v4().simple()),
            workflow,
            entity_id: entity_id.to_string(),
            started_at: Utc::now(),
        };
        let run_id = run.run_id.clone();
        self.runs.lock().insert(run_id.clone(), run);
        RunGuard {
            runs: self.runs.clone(),
            run_id,
        }
    }

    pub fn active_count(&self) -> usize {
        self.runs.lock().len()
    }
}

/// Removes its run from the tracker on drop.
#[derive(Debug)]
pub struct RunGuard {
    runs: Arc<Mutex<HashMap<String, WorkflowRun>>>,
    run_id: String,
}

impl RunGuard {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.runs.lock().remove(&self.run_id);
    }
}
