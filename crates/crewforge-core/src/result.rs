use crate::error::{CrewforgeError, ErrorType};
use crate::workflow::WorkflowKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of one workflow invocation.
///
/// Callers always receive one of these, whatever happened underneath. The
/// outcome enum makes "payload and error both set" unrepresentable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    /// Which workflow produced this result.
    pub workflow: WorkflowKind,
    /// Echo of the input parameters, after defaults were applied.
    pub params: serde_json::Value,
    /// When the result was produced.
    pub timestamp: DateTime<Utc>,
    /// Success payload or error details, tagged by `status`.
    #[serde(flatten)]
    pub outcome: WorkflowOutcome,
}

/// The `status`-discriminated half of a [`WorkflowResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WorkflowOutcome {
    /// The crew completed; `payload` is the final task's raw output.
    Success {
        /// Opaque worker output. Structure extraction is a boundary concern.
        payload: String,
    },
    /// The workflow failed and was converted into a structured result.
    Error {
        /// Diagnostic message, with the underlying failure preserved.
        error: String,
        /// Classification tag.
        error_type: ErrorType,
    },
}

impl WorkflowResult {
    /// A successful result carrying the crew's aggregate output.
    pub fn success(
        workflow: WorkflowKind,
        params: serde_json::Value,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            workflow,
            params,
            timestamp: Utc::now(),
            outcome: WorkflowOutcome::Success {
                payload: payload.into(),
            },
        }
    }

    /// An error result built from the error that ended the workflow.
    pub fn failure(workflow: WorkflowKind, params: serde_json::Value, err: &CrewforgeError) -> Self {
        Self {
            workflow,
            params,
            timestamp: Utc::now(),
            outcome: WorkflowOutcome::Error {
                error: err.to_string(),
                error_type: err.error_type(),
            },
        }
    }

    /// `"success"` or `"error"`.
    pub fn status(&self) -> &'static str {
        match self.outcome {
            WorkflowOutcome::Success { .. } => "success",
            WorkflowOutcome::Error { .. } => "error",
        }
    }

    /// Whether the workflow succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, WorkflowOutcome::Success { .. })
    }

    /// The success payload, if any.
    pub fn payload(&self) -> Option<&str> {
        match &self.outcome {
            WorkflowOutcome::Success { payload } => Some(payload),
            WorkflowOutcome::Error { .. } => None,
        }
    }

    /// The error message, if any.
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            WorkflowOutcome::Error { error, .. } => Some(error),
            WorkflowOutcome::Success { .. } => None,
        }
    }

    /// The error classification, if any.
    pub fn error_type(&self) -> Option<ErrorType> {
        match &self.outcome {
            WorkflowOutcome::Error { error_type, .. } => Some(*error_type),
            WorkflowOutcome::Success { .. } => None,
        }
    }

    /// Look up one echoed parameter.
    pub fn param(&self, key: &str) -> Option<&serde_json::Value> {
        self.params.get(key)
    }
}
