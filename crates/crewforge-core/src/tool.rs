use crate::error::{CrewforgeError, CrewforgeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the output-writing tool every creative role is bound to.
pub const FILE_WRITER: &str = "file_writer";

const MULTI_PLATFORM_DISCOVERY: &[&str] = &[
    "twitter_search",
    "youtube_search",
    "reddit_scan",
    "instagram_fetch",
    "social_aggregator",
    "ddg_search",
    "web_scraper",
];

const YOUTUBE_ONLY_DISCOVERY: &[&str] = &[
    "youtube_video_search",
    "youtube_channel_search",
    "web_scraper",
];

/// Which family of content-search tools the process is configured with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolMode {
    /// Social search tools backed by the crew-social-tools service.
    #[default]
    MultiPlatform,
    /// Video-platform RAG search tools only.
    YoutubeOnly,
}

impl ToolMode {
    /// Content-search tools the discovery role must be bound to in this mode.
    pub fn discovery_tools(self) -> &'static [&'static str] {
        match self {
            ToolMode::MultiPlatform => MULTI_PLATFORM_DISCOVERY,
            ToolMode::YoutubeOnly => YOUTUBE_ONLY_DISCOVERY,
        }
    }
}

/// An opaque handle to an external tool a worker may call.
///
/// The orchestration core never invokes tools itself; it only binds handles
/// to workers and passes them to the reasoning backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolHandle {
    /// Unique tool name.
    pub name: String,
    /// What the tool does, as shown to the reasoning backend.
    pub description: String,
    /// Remote endpoint, for tools served by an external service.
    pub endpoint: Option<String>,
}

impl ToolHandle {
    /// A local tool with no remote endpoint.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            endpoint: None,
        }
    }

    /// Attach a remote endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

/// The catalogue of tool handles supplied to the worker registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSet {
    mode: ToolMode,
    tools: BTreeMap<String, ToolHandle>,
}

impl ToolSet {
    /// An empty tool set in the given mode.
    pub fn new(mode: ToolMode) -> Self {
        Self {
            mode,
            tools: BTreeMap::new(),
        }
    }

    /// The standard tool set for a mode. Social tools point at `crew_tools_url`.
    pub fn standard(mode: ToolMode, crew_tools_url: &str) -> Self {
        let base = crew_tools_url.trim_end_matches('/');
        let set = Self::new(mode)
            .with_tool(ToolHandle::new(
                "web_scraper",
                "Scrape the readable content of a web page",
            ))
            .with_tool(ToolHandle::new(
                FILE_WRITER,
                "Write a generated artifact to the output directory",
            ));

        match mode {
            ToolMode::MultiPlatform => set
                .with_tool(
                    ToolHandle::new("twitter_search", "Search recent posts on Twitter/X")
                        .with_endpoint(format!("{base}/v1/twitter/search")),
                )
                .with_tool(
                    ToolHandle::new("youtube_search", "Look up trending YouTube videos")
                        .with_endpoint(format!("{base}/v1/youtube/lookup")),
                )
                .with_tool(
                    ToolHandle::new("reddit_scan", "Scan subreddits for rising posts")
                        .with_endpoint(format!("{base}/v1/reddit/scan")),
                )
                .with_tool(
                    ToolHandle::new("instagram_fetch", "Fetch public Instagram posts")
                        .with_endpoint(format!("{base}/v1/instagram/fetch")),
                )
                .with_tool(
                    ToolHandle::new("ddg_search", "General web search")
                        .with_endpoint(format!("{base}/v1/search/ddg")),
                )
                .with_tool(
                    ToolHandle::new(
                        "social_aggregator",
                        "Query several social platforms in one call",
                    )
                    .with_endpoint(base.to_string()),
                ),
            ToolMode::YoutubeOnly => set
                .with_tool(ToolHandle::new(
                    "youtube_video_search",
                    "Semantic search over YouTube video content",
                ))
                .with_tool(ToolHandle::new(
                    "youtube_channel_search",
                    "Semantic search over a YouTube channel",
                )),
        }
    }

    /// Add or replace a tool.
    pub fn with_tool(mut self, tool: ToolHandle) -> Self {
        self.insert(tool);
        self
    }

    /// Add or replace a tool in place.
    pub fn insert(&mut self, tool: ToolHandle) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Remove a tool by name.
    pub fn remove(&mut self, name: &str) -> Option<ToolHandle> {
        self.tools.remove(name)
    }

    /// The configured mode.
    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&ToolHandle> {
        self.tools.get(name)
    }

    /// Number of tools in the set.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Resolve every named tool, failing with a config error listing all
    /// missing names.
    pub fn require(&self, names: &[&str]) -> CrewforgeResult<Vec<ToolHandle>> {
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|n| !self.tools.contains_key(*n))
            .collect();
        if !missing.is_empty() {
            return Err(CrewforgeError::Config(format!(
                "Missing required tools: {}",
                missing.join(", ")
            )));
        }
        Ok(names
            .iter()
            .filter_map(|n| self.tools.get(*n).cloned())
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_multi_platform_has_all_discovery_tools() {
        let set = ToolSet::standard(ToolMode::MultiPlatform, "http://localhost:8001/");
        let tools = set.require(ToolMode::MultiPlatform.discovery_tools()).unwrap();
        assert_eq!(tools.len(), 7);
        assert!(set.get(FILE_WRITER).is_some());
        assert_eq!(
            set.get("twitter_search").unwrap().endpoint.as_deref(),
            Some("http://localhost:8001/v1/twitter/search")
        );
    }

    #[test]
    fn test_standard_youtube_only() {
        let set = ToolSet::standard(ToolMode::YoutubeOnly, "http://unused");
        assert!(set.require(ToolMode::YoutubeOnly.discovery_tools()).is_ok());
        assert!(set.get("twitter_search").is_none());
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_require_reports_every_missing_tool() {
        let set = ToolSet::new(ToolMode::MultiPlatform)
            .with_tool(ToolHandle::new("web_scraper", "scrape"));
        let err = set.require(&["web_scraper", "reddit_scan", FILE_WRITER]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("reddit_scan"));
        assert!(msg.contains(FILE_WRITER));
        assert!(!msg.contains("web_scraper"));
    }

    #[test]
    fn test_require_preserves_requested_order() {
        let set = ToolSet::standard(ToolMode::MultiPlatform, "http://x");
        let names: Vec<String> = set
            .require(&[FILE_WRITER, "ddg_search"])
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec![FILE_WRITER.to_string(), "ddg_search".to_string()]);
    }
}
