use crate::error::CrewforgeError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A named end-to-end use case mapped to a fixed task-graph template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    /// Discover trending topics for a set of platforms and niches.
    Discovery,
    /// Draft content from trend data.
    Creation,
    /// Analyse published content performance.
    PerformanceAnalysis,
    /// Discovery through tracking setup, end to end.
    FullPipeline,
}

impl WorkflowKind {
    /// Every workflow kind, in pipeline order.
    pub const ALL: [WorkflowKind; 4] = [
        WorkflowKind::Discovery,
        WorkflowKind::Creation,
        WorkflowKind::PerformanceAnalysis,
        WorkflowKind::FullPipeline,
    ];

    /// Stable snake_case name used in logs, metrics, and the HTTP surface.
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowKind::Discovery => "discovery",
            WorkflowKind::Creation => "creation",
            WorkflowKind::PerformanceAnalysis => "performance_analysis",
            WorkflowKind::FullPipeline => "full_pipeline",
        }
    }
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowKind {
    type Err = CrewforgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkflowKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CrewforgeError::Config(format!("Unknown workflow: {s}")))
    }
}
