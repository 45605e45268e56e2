use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiscoveryRequest {
    pub platforms: Option<Vec<String>>,
    pub niches: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryResponse {
    pub status: &'static str,
    pub trends_discovered: usize,
    pub trends: Value,
    pub metadata: DiscoveryMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryMetadata {
    pub timestamp: DateTime<Utc>,
    pub platforms: Value,
    pub niches: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreationRequest {
    #[serde(default = "empty_object")]
    pub trend_data: Value,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl Default for CreationRequest {
    fn default() -> Self {
        Self {
            trend_data: empty_object(),
            content_type: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreationResponse {
    pub status: &'static str,
    pub content_created: usize,
    pub content: Value,
    pub metadata: CreationMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreationMetadata {
    pub content_type: Value,
    pub timestamp: DateTime<Utc>,
}

/// Accepts `analysis_period` as an alias of `period`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalysisRequest {
    #[serde(alias = "analysis_period")]
    pub period: Option<String>,
    pub metrics: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    pub status: &'static str,
    pub period: Value,
    pub metrics_analyzed: Value,
    pub report: Value,
    pub timestamp: DateTime<Utc>,
}

/// Accepts `user_id` as an alias of `entity_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineRequest {
    #[serde(alias = "user_id")]
    pub entity_id: String,
    #[serde(default = "empty_object")]
    pub campaign_config: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineResponse {
    pub status: &'static str,
    pub workflow: PipelineWorkflow,
    pub metadata: PipelineMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineWorkflow {
    pub result: Value,
    pub campaign_config: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineMetadata {
    pub entity_id: String,
    pub timestamp: DateTime<Utc>,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}
