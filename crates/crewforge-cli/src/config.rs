//! `crewforge.toml` loading.
//!
//! Every section and field is optional; a missing file yields the defaults.

use crewforge_agent::ModelConfig;
use crewforge_core::{CrewforgeError, CrewforgeResult, ToolMode};
use crewforge_orchestrator::{AutomationConfig, Dependency, DEFAULT_MAX_RPM};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable consulted when `[model].api_key` is blank.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CrewforgeConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub services: ServicesConfig,
    pub features: FeatureFlags,
    pub scheduler: SchedulerSettings,
    pub fallbacks: FallbackUrls,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "default_crew_tools_url")]
    pub crew_tools_url: String,
    /// Whether an unhealthy tools service blocks workflows.
    #[serde(default = "default_true")]
    pub crew_tools_required: bool,
    #[serde(default = "default_max_rpm")]
    pub max_rpm: u32,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            crew_tools_url: default_crew_tools_url(),
            crew_tools_required: true,
            max_rpm: default_max_rpm(),
        }
    }
}

impl ServicesConfig {
    pub fn dependencies(&self) -> Vec<Dependency> {
        let url = format!("{}/health", self.crew_tools_url.trim_end_matches('/'));
        let dependency = if self.crew_tools_required {
            Dependency::required("crew-social-tools", url)
        } else {
            Dependency::optional("crew-social-tools", url)
        };
        vec![dependency]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureFlags {
    #[serde(default = "default_true")]
    pub fallback_enabled: bool,
    #[serde(default)]
    pub youtube_only_mode: bool,
    #[serde(default = "default_true")]
    pub ai_workflows_enabled: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            fallback_enabled: true,
            youtube_only_mode: false,
            ai_workflows_enabled: true,
        }
    }
}

impl FeatureFlags {
    pub fn tool_mode(&self) -> ToolMode {
        if self.youtube_only_mode {
            ToolMode::YoutubeOnly
        } else {
            ToolMode::MultiPlatform
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub batch_size: usize,
    pub batch_pause_secs: u64,
    pub max_concurrent_analysis: usize,
    pub analysis_window_hours: i64,
    pub analysis_limit: usize,
    pub pipeline_user_pause_secs: u64,
    pub onboarding_window_hours: i64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_pause_secs: 2,
            max_concurrent_analysis: 5,
            analysis_window_hours: 6,
            analysis_limit: 20,
            pipeline_user_pause_secs: 10,
            onboarding_window_hours: 1,
        }
    }
}

impl SchedulerSettings {
    pub fn to_automation(&self) -> AutomationConfig {
        AutomationConfig {
            batch_size: self.batch_size,
            batch_pause: Duration::from_secs(self.batch_pause_secs),
            max_concurrent_analysis: self.max_concurrent_analysis,
            analysis_window: chrono::Duration::hours(self.analysis_window_hours),
            analysis_limit: self.analysis_limit,
            pipeline_user_pause: Duration::from_secs(self.pipeline_user_pause_secs),
            onboarding_window: chrono::Duration::hours(self.onboarding_window_hours),
        }
    }
}

/// Legacy automation endpoints triggered when an AI job fails.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FallbackUrls {
    pub trend_discovery: Option<String>,
    pub content_creation: Option<String>,
    pub performance_analysis: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8002
}
fn default_crew_tools_url() -> String {
    "http://localhost:8001".to_string()
}
fn default_max_rpm() -> u32 {
    DEFAULT_MAX_RPM
}
fn default_true() -> bool {
    true
}

impl CrewforgeConfig {
    /// Read and parse `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> CrewforgeResult<Self> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            let config = Self::parse(&raw)?;
            info!(path = %path.display(), "Configuration loaded");
            config
        } else {
            warn!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };
        config.resolve_api_key(std::env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    pub fn parse(raw: &str) -> CrewforgeResult<Self> {
        toml::from_str(raw).map_err(|e| CrewforgeError::Config(e.to_string()))
    }

    /// Fill a blank model API key from the environment.
    pub fn resolve_api_key(&mut self, from_env: Option<String>) {
        if self.model.api_key.trim().is_empty() {
            if let Some(key) = from_env.filter(|k| !k.trim().is_empty()) {
                self.model.api_key = key;
            }
        }
    }
}
