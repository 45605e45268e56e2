use crate::profile::WorkerProfile;
use async_trait::async_trait;
use crewforge_core::CrewforgeResult;
use serde::{Deserialize, Serialize};

/// One task invocation as seen by the reasoning backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub description: String,
    /// Contract string guiding the worker. Not a schema.
    pub expected_output: String,
    /// Concatenated outputs of the task's upstream dependencies.
    pub context: Option<String>,
}

impl TaskRequest {
    /// The user-turn text sent to the backend.
    pub fn prompt(&self) -> String {
        let mut prompt = format!(
            "{}\n\nExpected output: {}",
            self.description.trim(),
            self.expected_output
        );
        if let Some(context) = &self.context {
            prompt.push_str("\n\nContext from previous tasks:\n");
            prompt.push_str(context);
        }
        prompt
    }
}

/// The reasoning backend that actually executes a task description.
///
/// Implementations enforce their own iteration and retry caps; the
/// orchestration core imposes no timeout on them.
#[async_trait]
pub trait WorkerExecutor: Send + Sync {
    /// Execute `request` on behalf of the worker described by `profile`,
    /// returning its raw text output.
    async fn execute(&self, profile: &WorkerProfile, request: &TaskRequest)
        -> CrewforgeResult<String>;
}
