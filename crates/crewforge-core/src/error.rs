use serde::{Deserialize, Serialize};

/// Top-level error type for crewforge.
///
/// Each variant corresponds to a failure class the orchestration core can
/// produce. Errors are recovered into a [`WorkflowResult`](crate::WorkflowResult)
/// at the workflow-entry boundary and never escape a scheduled trigger.
#[derive(Debug, thiserror::Error)]
pub enum CrewforgeError {
    /// A required external dependency failed its health probe.
    #[error("{message}")]
    ServiceUnavailable {
        /// Name of the dependency that failed.
        service: String,
        /// Human-readable diagnostic.
        message: String,
    },

    /// A worker invocation inside a crew run failed.
    #[error("Agent execution error: {0}")]
    AgentExecution(String),

    /// A task graph referenced a task that is not strictly earlier in the list.
    #[error("Invalid task graph: {0}")]
    InvalidGraph(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// An error from an outbound HTTP request (reasoning backend, probes).
    #[error("HTTP error: {0}")]
    Http(String),

    /// An error raised by a persistence collaborator.
    #[error("Store error: {0}")]
    Store(String),

    /// An error from the orchestration layer itself.
    #[error("Orchestrator error: {0}")]
    Orchestrator(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`CrewforgeError`].
pub type CrewforgeResult<T> = Result<T, CrewforgeError>;

impl CrewforgeError {
    /// Build a [`CrewforgeError::ServiceUnavailable`], using the default
    /// message when none is supplied.
    pub fn service_unavailable(service: impl Into<String>, message: Option<String>) -> Self {
        let service = service.into();
        let message = message.unwrap_or_else(|| format!("Service '{service}' is unavailable"));
        Self::ServiceUnavailable { service, message }
    }

    /// Classification tag carried by error results.
    pub fn error_type(&self) -> ErrorType {
        match self {
            Self::ServiceUnavailable { .. } => ErrorType::ServiceUnavailable,
            Self::AgentExecution(_) => ErrorType::AgentExecution,
            _ => ErrorType::Internal,
        }
    }
}

/// Error classification tag exposed over the external interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// A required dependency was unreachable.
    ServiceUnavailable,
    /// A worker invocation failed mid-run.
    AgentExecution,
    /// Anything else.
    Internal,
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorType::ServiceUnavailable => write!(f, "service_unavailable"),
            ErrorType::AgentExecution => write!(f, "agent_execution"),
            ErrorType::Internal => write!(f, "internal"),
        }
    }
}
