use crate::types::{Crew, CrewKind, Worker};
use crewforge_agent::{WorkerExecutor, WorkerProfile, WorkerRole};
use crewforge_core::{CrewforgeError, CrewforgeResult, ToolSet, FILE_WRITER};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Default per-crew ceiling on worker invocations per minute.
pub const DEFAULT_MAX_RPM: u32 = 30;

/// Owns the one [`Worker`] instance per role for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct WorkerRegistry {
    workers: HashMap<WorkerRole, Arc<Worker>>,
}

impl WorkerRegistry {
    /// Build every known role against `tools`.
    ///
    /// Fails immediately if a role's required tool is missing from the set.
    /// No network calls are made.
    pub fn create_workers(
        tools: &ToolSet,
        executor: Arc<dyn WorkerExecutor>,
    ) -> CrewforgeResult<Self> {
        let mut workers = HashMap::new();
        for role in WorkerRole::ALL {
            let profile = profile_for(role, tools)?;
            workers.insert(role, Arc::new(Worker::new(profile, executor.clone())));
        }
        info!(
            workers = workers.len(),
            mode = ?tools.mode(),
            "Worker registry initialised"
        );
        Ok(Self { workers })
    }

    pub fn get(&self, role: WorkerRole) -> CrewforgeResult<Arc<Worker>> {
        self.workers
            .get(&role)
            .cloned()
            .ok_or_else(|| CrewforgeError::Config(format!("no worker registered for role {role}")))
    }

    /// Workers in canonical role order.
    pub fn workers(&self) -> Vec<Arc<Worker>> {
        WorkerRole::ALL
            .iter()
            .filter_map(|role| self.workers.get(role).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

/// The four standard crews, each with its own rate ceiling.
pub fn standard_crews(max_rpm: u32) -> HashMap<CrewKind, Arc<Crew>> {
    CrewKind::ALL
        .into_iter()
        .map(|kind| (kind, Arc::new(Crew::new(kind, max_rpm))))
        .collect()
}

fn profile_for(role: WorkerRole, tools: &ToolSet) -> CrewforgeResult<WorkerProfile> {
    let (title, goal, backstory, max_iterations) = match role {
        WorkerRole::TrendScout => ("Viral Trend Scout", SCOUT_GOAL, SCOUT_BACKSTORY, 3),
        WorkerRole::ContentAnalyzer => (
            "Content Performance Analyst",
            ANALYZER_GOAL,
            ANALYZER_BACKSTORY,
            3,
        ),
        WorkerRole::ContentCreator => ("Viral Content Creator", CREATOR_GOAL, CREATOR_BACKSTORY, 4),
        WorkerRole::PublishManager => (
            "Content Publication Manager",
            PUBLISHER_GOAL,
            PUBLISHER_BACKSTORY,
            3,
        ),
        WorkerRole::PerformanceTracker => (
            "Performance Analytics Specialist",
            TRACKER_GOAL,
            TRACKER_BACKSTORY,
            3,
        ),
    };

    let required: Vec<&str> = match role {
        WorkerRole::TrendScout => tools.mode().discovery_tools().to_vec(),
        _ => vec![FILE_WRITER],
    };
    let bound = tools.require(&required).map_err(|e| {
        CrewforgeError::Config(format!("cannot build worker {role}: {e}"))
    })?;

    Ok(WorkerProfile {
        role,
        title: title.to_string(),
        goal: goal.to_string(),
        backstory: backstory.to_string(),
        tools: bound,
        max_iterations,
        max_retries: 2,
    })
}

const SCOUT_GOAL: &str =
    "Discover trending content, viral patterns, and emerging opportunities across platforms";

const SCOUT_BACKSTORY: &str = "\
You are an expert trend analyst who lives and breathes viral content. You spot \
trends before they explode, understand what makes content shareable, and find \
untapped opportunities. You constantly monitor YouTube, TikTok, Instagram, and \
emerging platforms for signals.";

const ANALYZER_GOAL: &str =
    "Analyze content performance, identify successful patterns, and provide data-driven insights";

const ANALYZER_BACKSTORY: &str = "\
You are a data scientist specialised in viral content analytics. You can dissect \
any piece of content to understand why it succeeded or failed, identify patterns \
in audience engagement, and predict viral potential from engagement metrics, \
timing data, and audience demographics.";

const CREATOR_GOAL: &str =
    "Create compelling, viral-ready content based on trending insights and performance data";

const CREATOR_BACKSTORY: &str = "\
You specialise in viral content creation. You understand the psychology of \
shareability, the craft of hook writing, and the mechanics of engagement. You \
adapt trending formats and optimise content for reach across platforms.";

const PUBLISHER_GOAL: &str =
    "Optimize content scheduling, distribution strategy, and platform-specific formatting";

const PUBLISHER_BACKSTORY: &str = "\
You are a content distribution strategist who knows the best posting times on \
every platform and how each platform's ranking works. You run the publication \
pipeline from scheduling to cross-platform formatting.";

const TRACKER_GOAL: &str =
    "Monitor content performance, track ROI, and provide optimization recommendations";

const TRACKER_BACKSTORY: &str = "\
You are an analytics specialist focused on measuring and improving content \
performance. You track the metrics that matter, identify what is working, and \
give specific recommendations grounded in engagement signals.";

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crewforge_agent::TaskRequest;
    use crewforge_core::ToolMode;

    struct Noop;

    #[async_trait]
    impl WorkerExecutor for Noop {
        async fn execute(&self, _: &WorkerProfile, _: &TaskRequest) -> CrewforgeResult<String> {
            Ok(String::new())
        }
    }

    #[test]
    fn test_create_workers_builds_every_role() {
        let tools = ToolSet::standard(ToolMode::MultiPlatform, "http://tools:8001");
        let registry = WorkerRegistry::create_workers(&tools, Arc::new(Noop)).unwrap();
        assert_eq!(registry.len(), 5);

        let scout = registry.get(WorkerRole::TrendScout).unwrap();
        assert_eq!(scout.profile().tools.len(), 7);
        assert!(scout.profile().has_tool("reddit_scan"));
        assert!(!scout.profile().has_tool(FILE_WRITER));

        let creator = registry.get(WorkerRole::ContentCreator).unwrap();
        assert_eq!(creator.profile().max_iterations, 4);
        assert_eq!(creator.profile().tools.len(), 1);
        assert!(creator.profile().has_tool(FILE_WRITER));
    }

    #[test]
    fn test_youtube_only_mode_binds_youtube_tools() {
        let tools = ToolSet::standard(ToolMode::YoutubeOnly, "http://tools:8001");
        let registry = WorkerRegistry::create_workers(&tools, Arc::new(Noop)).unwrap();
        let scout = registry.get(WorkerRole::TrendScout).unwrap();
        assert!(scout.profile().has_tool("youtube_channel_search"));
        assert!(!scout.profile().has_tool("twitter_search"));
    }

    #[test]
    fn test_missing_tool_fails_at_construction() {
        let mut tools = ToolSet::standard(ToolMode::MultiPlatform, "http://tools:8001");
        tools.remove("reddit_scan");
        let err = WorkerRegistry::create_workers(&tools, Arc::new(Noop)).unwrap_err();
        assert!(matches!(err, CrewforgeError::Config(_)));
        assert!(err.to_string().contains("reddit_scan"));
    }

    #[test]
    fn test_missing_file_writer_fails() {
        let mut tools = ToolSet::standard(ToolMode::MultiPlatform, "http://tools:8001");
        tools.remove(FILE_WRITER);
        assert!(WorkerRegistry::create_workers(&tools, Arc::new(Noop)).is_err());
    }

    #[test]
    fn test_workers_share_one_instance_per_role() {
        let tools = ToolSet::standard(ToolMode::MultiPlatform, "http://tools:8001");
        let registry = WorkerRegistry::create_workers(&tools, Arc::new(Noop)).unwrap();
        let a = registry.get(WorkerRole::ContentAnalyzer).unwrap();
        let b = registry.get(WorkerRole::ContentAnalyzer).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.workers()[0].role(), WorkerRole::TrendScout);
    }

    #[test]
    fn test_standard_crews() {
        let crews = standard_crews(DEFAULT_MAX_RPM);
        assert_eq!(crews.len(), 4);
        assert_eq!(crews[&CrewKind::Discovery].max_rpm(), 30);
        assert_eq!(crews[&CrewKind::FullPipeline].members().len(), 5);
    }
}
