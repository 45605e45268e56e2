use crate::registry::WorkerRegistry;
use crate::types::{Task, TaskGraph};
use crewforge_agent::WorkerRole;
use crewforge_core::{CrewforgeResult, WorkflowKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_PLATFORMS: [&str; 3] = ["youtube", "tiktok", "instagram"];
pub const DEFAULT_NICHES: [&str; 1] = ["general"];
pub const DEFAULT_CONTENT_TYPE: &str = "video";
pub const DEFAULT_METRICS: [&str; 3] = ["views", "engagement", "retention"];
pub const DEFAULT_PERIOD: &str = "24h";

fn or_default(values: Option<Vec<String>>, default: &[&str]) -> Vec<String> {
    match values {
        Some(v) if !v.is_empty() => v,
        _ => default.iter().map(|s| s.to_string()).collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryParams {
    pub platforms: Vec<String>,
    pub niches: Vec<String>,
}

impl DiscoveryParams {
    /// Missing or empty lists fall back to the default platforms and niches.
    pub fn new(platforms: Option<Vec<String>>, niches: Option<Vec<String>>) -> Self {
        Self {
            platforms: or_default(platforms, &DEFAULT_PLATFORMS),
            niches: or_default(niches, &DEFAULT_NICHES),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreationParams {
    pub trend_data: Value,
    pub content_type: String,
}

impl CreationParams {
    pub fn new(trend_data: Value, content_type: Option<String>) -> Self {
        Self {
            trend_data,
            content_type: content_type
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    pub period: String,
    pub metrics: Vec<String>,
    /// A specific content item to analyse, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

impl AnalysisParams {
    pub fn new(period: Option<String>, metrics: Option<Vec<String>>) -> Self {
        Self {
            period: period
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PERIOD.to_string()),
            metrics: or_default(metrics, &DEFAULT_METRICS),
            content: None,
        }
    }

    pub fn with_content(mut self, content: Value) -> Self {
        self.content = Some(content);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    pub entity_id: String,
    pub campaign_config: Value,
}

/// Run-time parameters for one workflow invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowParams {
    Discovery(DiscoveryParams),
    Creation(CreationParams),
    PerformanceAnalysis(AnalysisParams),
    FullPipeline(PipelineParams),
}

impl WorkflowParams {
    pub fn kind(&self) -> WorkflowKind {
        match self {
            WorkflowParams::Discovery(_) => WorkflowKind::Discovery,
            WorkflowParams::Creation(_) => WorkflowKind::Creation,
            WorkflowParams::PerformanceAnalysis(_) => WorkflowKind::PerformanceAnalysis,
            WorkflowParams::FullPipeline(_) => WorkflowKind::FullPipeline,
        }
    }

    /// The parameters as echoed back in a [`crewforge_core::WorkflowResult`].
    pub fn echo(&self) -> Value {
        let echoed = match self {
            WorkflowParams::Discovery(p) => serde_json::to_value(p),
            WorkflowParams::Creation(p) => serde_json::to_value(p),
            WorkflowParams::PerformanceAnalysis(p) => serde_json::to_value(p),
            WorkflowParams::FullPipeline(p) => serde_json::to_value(p),
        };
        echoed.unwrap_or(Value::Null)
    }

    /// Owning entity, for in-flight tracking.
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            WorkflowParams::FullPipeline(p) => Some(&p.entity_id),
            _ => None,
        }
    }
}

/// Builds the fixed task template of each workflow, bound to registry workers.
#[derive(Debug, Clone)]
pub struct TaskGraphBuilder {
    registry: WorkerRegistry,
}

impl TaskGraphBuilder {
    pub fn new(registry: WorkerRegistry) -> Self {
        Self { registry }
    }

    pub fn build(&self, params: &WorkflowParams) -> CrewforgeResult<TaskGraph> {
        let tasks = match params {
            WorkflowParams::Discovery(p) => self.discovery(p)?,
            WorkflowParams::Creation(p) => self.creation(p)?,
            WorkflowParams::PerformanceAnalysis(p) => self.analysis(p)?,
            WorkflowParams::FullPipeline(p) => self.full_pipeline(p)?,
        };
        TaskGraph::new(params.kind(), tasks)
    }

    fn discovery(&self, p: &DiscoveryParams) -> CrewforgeResult<Vec<Task>> {
        let scout = Task::new(
            format!(
                "Discover trending content and viral opportunities across {} \
                 for the following niches: {}.\n\n\
                 Your analysis should include:\n\
                 1. Current trending topics and hashtags\n\
                 2. Viral content formats and patterns\n\
                 3. Emerging opportunities and gaps\n\
                 4. Audience engagement signals\n\
                 5. Timing and frequency insights\n\n\
                 Focus on content with high engagement rates and viral potential.",
                p.platforms.join(", "),
                p.niches.join(", ")
            ),
            self.registry.get(WorkerRole::TrendScout)?,
            "Comprehensive trend analysis report with specific opportunities",
        );
        let analysis = Task::new(
            "Analyze the discovered trends to identify:\n\
             1. Content patterns that consistently perform well\n\
             2. Optimal posting times and frequencies\n\
             3. Audience behavior insights\n\
             4. Platform-specific optimization opportunities\n\
             5. Competitive landscape analysis\n\n\
             Provide data-driven recommendations for content strategy.",
            self.registry.get(WorkerRole::ContentAnalyzer)?,
            "Detailed analysis report with actionable recommendations",
        )
        .with_context(vec![0]);
        Ok(vec![scout, analysis])
    }

    fn creation(&self, p: &CreationParams) -> CrewforgeResult<Vec<Task>> {
        let create = Task::new(
            format!(
                "Create viral {} content based on the following trend insights:\n{}\n\n\
                 Your content should include:\n\
                 1. A hook that grabs attention in the first 3 seconds\n\
                 2. Trending elements and patterns identified in research\n\
                 3. Platform-optimized format and structure\n\
                 4. A clear call-to-action for engagement\n\
                 5. Relevant hashtags and timing recommendations\n\n\
                 Keep the content original while using proven viral patterns.",
                p.content_type, p.trend_data
            ),
            self.registry.get(WorkerRole::ContentCreator)?,
            format!(
                "Complete {} content package with optimization details",
                p.content_type
            ),
        );
        let optimise = Task::new(
            "Review and optimize the created content for viral potential:\n\
             1. Analyze hook effectiveness and engagement triggers\n\
             2. Verify platform compliance and best practices\n\
             3. Suggest A/B testing variations\n\
             4. Predict a viral potential score\n\
             5. Recommend a distribution strategy",
            self.registry.get(WorkerRole::ContentAnalyzer)?,
            "Content optimization report with viral potential assessment",
        )
        .with_context(vec![0]);
        Ok(vec![create, optimise])
    }

    fn analysis(&self, p: &AnalysisParams) -> CrewforgeResult<Vec<Task>> {
        let subject = match &p.content {
            Some(content) => format!("the following content item:\n{content}"),
            None => "all content published".to_string(),
        };
        let analyse = Task::new(
            format!(
                "Analyze the performance of {subject}\nover the last {}, \
                 focusing on these metrics: {}.\n\n\
                 Identify top performers, underperformers, and the patterns \
                 that separate them.",
                p.period,
                p.metrics.join(", ")
            ),
            self.registry.get(WorkerRole::ContentAnalyzer)?,
            "Performance analysis with per-metric findings",
        );
        let track = Task::new(
            "Turn the performance analysis into a tracking report:\n\
             1. Summarise each metric against its recent trend\n\
             2. Flag content that needs attention\n\
             3. Recommend concrete optimizations",
            self.registry.get(WorkerRole::PerformanceTracker)?,
            "Performance report with optimization recommendations",
        )
        .with_context(vec![0]);
        Ok(vec![analyse, track])
    }

    fn full_pipeline(&self, p: &PipelineParams) -> CrewforgeResult<Vec<Task>> {
        let stages = [
            (
                WorkerRole::TrendScout,
                format!(
                    "Discover trending opportunities for user {} with configuration:\n{}\n\n\
                     Focus on trends that align with the user's niche and audience.",
                    p.entity_id, p.campaign_config
                ),
                "Personalized trend opportunities report",
            ),
            (
                WorkerRole::ContentAnalyzer,
                "Analyze discovered trends and the user's historical performance to \
                 identify the most promising content opportunities and optimization \
                 strategies."
                    .to_string(),
                "Strategic content recommendations with performance predictions",
            ),
            (
                WorkerRole::ContentCreator,
                "Create optimized viral content based on the trend analysis and \
                 performance insights. Generate multiple variations for A/B testing."
                    .to_string(),
                "Complete content package with variations",
            ),
            (
                WorkerRole::PublishManager,
                "Create an optimized publication schedule and distribution strategy. \
                 Set up cross-platform posting and engagement monitoring."
                    .to_string(),
                "Publication schedule and distribution plan",
            ),
            (
                WorkerRole::PerformanceTracker,
                "Set up performance tracking and monitoring for the campaign. \
                 Define success metrics and optimization triggers."
                    .to_string(),
                "Performance monitoring and optimization framework",
            ),
        ];

        // Each stage sees every earlier stage, not just its predecessor.
        stages
            .into_iter()
            .enumerate()
            .map(|(index, (role, description, expected))| -> CrewforgeResult<Task> {
                Ok(Task::new(description, self.registry.get(role)?, expected)
                    .with_context((0..index).collect()))
            })
            .collect()
    }
}
