use crewforge_core::ToolHandle;
use serde::{Deserialize, Serialize};

/// Specialist roles known to the worker registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerRole {
    /// Discovers trending content and opportunities.
    TrendScout,
    /// Analyses content performance and patterns.
    ContentAnalyzer,
    /// Drafts content from trend insights.
    ContentCreator,
    /// Plans publication schedules and distribution.
    PublishManager,
    /// Sets up performance tracking.
    PerformanceTracker,
}

impl WorkerRole {
    /// Every role, in pipeline order.
    pub const ALL: [WorkerRole; 5] = [
        WorkerRole::TrendScout,
        WorkerRole::ContentAnalyzer,
        WorkerRole::ContentCreator,
        WorkerRole::PublishManager,
        WorkerRole::PerformanceTracker,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkerRole::TrendScout => "trend_scout",
            WorkerRole::ContentAnalyzer => "content_analyzer",
            WorkerRole::ContentCreator => "content_creator",
            WorkerRole::PublishManager => "publish_manager",
            WorkerRole::PerformanceTracker => "performance_tracker",
        }
    }
}

impl std::fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of one specialist worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerProfile {
    pub role: WorkerRole,
    /// Display title handed to the reasoning backend.
    pub title: String,
    pub goal: String,
    pub backstory: String,
    pub tools: Vec<ToolHandle>,
    /// Cap on reasoning iterations inside one task invocation.
    pub max_iterations: u32,
    /// Cap on backend retries inside one task invocation.
    pub max_retries: u32,
}

impl WorkerProfile {
    /// System prompt assembled from title, backstory, goal, and tool list.
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are the {}.\n\n{}\n\nYour goal: {}",
            self.title, self.backstory, self.goal
        );
        if !self.tools.is_empty() {
            prompt.push_str("\n\nTools available to you:");
            for tool in &self.tools {
                prompt.push_str(&format!("\n- {}: {}", tool.name, tool.description));
            }
        }
        prompt
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> WorkerProfile {
        WorkerProfile {
            role: WorkerRole::ContentCreator,
            title: "Viral Content Creator".into(),
            goal: "Create compelling content".into(),
            backstory: "A creative specialist.".into(),
            tools: vec![ToolHandle::new("file_writer", "Write an artifact")],
            max_iterations: 4,
            max_retries: 2,
        }
    }

    #[test]
    fn test_system_prompt_mentions_goal_and_tools() {
        let prompt = profile().system_prompt();
        assert!(prompt.starts_with("You are the Viral Content Creator."));
        assert!(prompt.contains("Your goal: Create compelling content"));
        assert!(prompt.contains("- file_writer: Write an artifact"));
    }

    #[test]
    fn test_role_names() {
        assert_eq!(WorkerRole::TrendScout.to_string(), "trend_scout");
        assert_eq!(WorkerRole::ALL.len(), 5);
        assert!(profile().has_tool("file_writer"));
        assert!(!profile().has_tool("reddit_scan"));
    }
}
