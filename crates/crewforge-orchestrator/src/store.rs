use crate::monitor::PerformanceSnapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crewforge_core::{CrewforgeError, CrewforgeResult, WorkflowKind};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub premium: bool,
    #[serde(default)]
    pub ai_enabled: bool,
    #[serde(default)]
    pub onboarded: bool,
}

impl UserRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            premium: false,
            ai_enabled: false,
            onboarded: false,
        }
    }

    pub fn premium_with_ai(mut self) -> Self {
        self.premium = true;
        self.ai_enabled = true;
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub content_niches: Option<Vec<String>>,
    pub target_platforms: Option<Vec<String>>,
    pub content_style: Option<String>,
    pub posting_frequency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRequest {
    pub id: String,
    pub user_id: String,
    pub content_type: Option<String>,
    pub status: String,
}

/// A published content item awaiting performance analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub user_id: String,
    pub published_at: DateTime<Utc>,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendRecord {
    pub user_id: String,
    pub trends: Value,
    pub platforms: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserActivity {
    pub user_id: String,
    pub activity_type: String,
    pub title: String,
    pub status: String,
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub user_id: String,
    pub content: Value,
    pub content_type: String,
    pub source: String,
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub content_id: String,
    pub status: String,
    pub report: Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiUsage {
    pub user_id: String,
    pub pipeline_executions: u32,
    pub last_pipeline_run: DateTime<Utc>,
    pub execution_result: String,
}

/// Persistence collaborator consulted by the automation workflows and the
/// performance monitor.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn all_users(&self) -> CrewforgeResult<Vec<UserRecord>>;
    async fn user_preferences(&self, user_id: &str) -> CrewforgeResult<Option<UserPreferences>>;
    async fn store_trend_data(&self, record: TrendRecord) -> CrewforgeResult<()>;
    async fn create_user_activity(&self, activity: UserActivity) -> CrewforgeResult<()>;

    async fn pending_content_requests(&self) -> CrewforgeResult<Vec<ContentRequest>>;
    async fn latest_trend_data(&self, user_id: &str) -> CrewforgeResult<Option<Value>>;
    async fn store_generated_content(&self, content: GeneratedContent) -> CrewforgeResult<()>;
    async fn update_content_request_status(
        &self,
        request_id: &str,
        status: &str,
        result: Value,
    ) -> CrewforgeResult<()>;

    async fn recent_content_for_analysis(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> CrewforgeResult<Vec<ContentItem>>;
    async fn store_analysis(&self, record: AnalysisRecord) -> CrewforgeResult<()>;

    async fn users_needing_onboarding(&self, since: DateTime<Utc>)
        -> CrewforgeResult<Vec<UserRecord>>;
    async fn mark_user_onboarded(&self, user_id: &str) -> CrewforgeResult<()>;

    async fn premium_users_with_ai(&self) -> CrewforgeResult<Vec<UserRecord>>;
    async fn campaign_config(&self, user_id: &str) -> CrewforgeResult<Option<Value>>;
    async fn update_ai_usage(&self, usage: AiUsage) -> CrewforgeResult<()>;

    /// Success rate per workflow type since `since`, or `None` if the store
    /// has no data yet.
    async fn workflow_success_rates(
        &self,
        since: DateTime<Utc>,
    ) -> CrewforgeResult<Option<HashMap<String, f64>>>;
    async fn store_performance_snapshot(&self, snapshot: &PerformanceSnapshot)
        -> CrewforgeResult<()>;
}

/// Delivers user-facing messages (summaries, recommendations).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: &str, subject: &str, body: &Value) -> CrewforgeResult<()>;
}

/// Notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user_id: &str, subject: &str, _body: &Value) -> CrewforgeResult<()> {
        info!(user_id, subject, "Notification sent");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    users: Vec<UserRecord>,
    preferences: HashMap<String, UserPreferences>,
    trends: Vec<TrendRecord>,
    activities: Vec<UserActivity>,
    requests: Vec<ContentRequest>,
    request_results: HashMap<String, Value>,
    generated: Vec<GeneratedContent>,
    content: Vec<ContentItem>,
    analyses: Vec<AnalysisRecord>,
    campaigns: HashMap<String, Value>,
    ai_usage: Vec<AiUsage>,
    success_rates: Option<HashMap<String, f64>>,
    snapshots: Vec<PerformanceSnapshot>,
}

/// In-process [`WorkflowStore`] used by the CLI and tests.
///
/// `set_offline(true)` makes every call fail with a store error, for
/// exercising fallback paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self) -> CrewforgeResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(CrewforgeError::Store("store is offline".to_string()))
        } else {
            Ok(())
        }
    }

    pub fn add_user(&self, user: UserRecord) {
        self.state.write().users.push(user);
    }

    pub fn set_preferences(&self, user_id: &str, prefs: UserPreferences) {
        self.state.write().preferences.insert(user_id.to_string(), prefs);
    }

    pub fn add_content_request(&self, request: ContentRequest) {
        self.state.write().requests.push(request);
    }

    pub fn add_content(&self, item: ContentItem) {
        self.state.write().content.push(item);
    }

    pub fn set_campaign_config(&self, user_id: &str, config: Value) {
        self.state.write().campaigns.insert(user_id.to_string(), config);
    }

    pub fn set_success_rates(&self, rates: HashMap<WorkflowKind, f64>) {
        self.state.write().success_rates = Some(
            rates
                .into_iter()
                .map(|(kind, rate)| (kind.to_string(), rate))
                .collect(),
        );
    }

    pub fn trends(&self) -> Vec<TrendRecord> {
        self.state.read().trends.clone()
    }

    pub fn activities(&self) -> Vec<UserActivity> {
        self.state.read().activities.clone()
    }

    pub fn generated(&self) -> Vec<GeneratedContent> {
        self.state.read().generated.clone()
    }

    pub fn content_requests(&self) -> Vec<ContentRequest> {
        self.state.read().requests.clone()
    }

    pub fn analyses(&self) -> Vec<AnalysisRecord> {
        self.state.read().analyses.clone()
    }

    pub fn ai_usage(&self) -> Vec<AiUsage> {
        self.state.read().ai_usage.clone()
    }

    pub fn snapshots(&self) -> Vec<PerformanceSnapshot> {
        self.state.read().snapshots.clone()
    }

    pub fn user(&self, user_id: &str) -> Option<UserRecord> {
        self.state.read().users.iter().find(|u| u.id == user_id).cloned()
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn all_users(&self) -> CrewforgeResult<Vec<UserRecord>> {
        self.check()?;
        Ok(self.state.read().users.clone())
    }

    async fn user_preferences(&self, user_id: &str) -> CrewforgeResult<Option<UserPreferences>> {
        self.check()?;
        Ok(self.state.read().preferences.get(user_id).cloned())
    }

    async fn store_trend_data(&self, record: TrendRecord) -> CrewforgeResult<()> {
        self.check()?;
        self.state.write().trends.push(record);
        Ok(())
    }

    async fn create_user_activity(&self, activity: UserActivity) -> CrewforgeResult<()> {
        self.check()?;
        self.state.write().activities.push(activity);
        Ok(())
    }

    async fn pending_content_requests(&self) -> CrewforgeResult<Vec<ContentRequest>> {
        self.check()?;
        Ok(self
            .state
            .read()
            .requests
            .iter()
            .filter(|r| r.status == "pending")
            .cloned()
            .collect())
    }

    async fn latest_trend_data(&self, user_id: &str) -> CrewforgeResult<Option<Value>> {
        self.check()?;
        Ok(self
            .state
            .read()
            .trends
            .iter()
            .rev()
            .find(|t| t.user_id == user_id)
            .map(|t| t.trends.clone()))
    }

    async fn store_generated_content(&self, content: GeneratedContent) -> CrewforgeResult<()> {
        self.check()?;
        self.state.write().generated.push(content);
        Ok(())
    }

    async fn update_content_request_status(
        &self,
        request_id: &str,
        status: &str,
        result: Value,
    ) -> CrewforgeResult<()> {
        self.check()?;
        let mut state = self.state.write();
        let request = state
            .requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or_else(|| CrewforgeError::Store(format!("unknown content request {request_id}")))?;
        request.status = status.to_string();
        state.request_results.insert(request_id.to_string(), result);
        Ok(())
    }

    async fn recent_content_for_analysis(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> CrewforgeResult<Vec<ContentItem>> {
        self.check()?;
        Ok(self
            .state
            .read()
            .content
            .iter()
            .filter(|c| c.published_at >= since)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn store_analysis(&self, record: AnalysisRecord) -> CrewforgeResult<()> {
        self.check()?;
        self.state.write().analyses.push(record);
        Ok(())
    }

    async fn users_needing_onboarding(
        &self,
        since: DateTime<Utc>,
    ) -> CrewforgeResult<Vec<UserRecord>> {
        self.check()?;
        Ok(self
            .state
            .read()
            .users
            .iter()
            .filter(|u| !u.onboarded && u.created_at >= since)
            .cloned()
            .collect())
    }

    async fn mark_user_onboarded(&self, user_id: &str) -> CrewforgeResult<()> {
        self.check()?;
        if let Some(user) = self.state.write().users.iter_mut().find(|u| u.id == user_id) {
            user.onboarded = true;
        }
        Ok(())
    }

    async fn premium_users_with_ai(&self) -> CrewforgeResult<Vec<UserRecord>> {
        self.check()?;
        Ok(self
            .state
            .read()
            .users
            .iter()
            .filter(|u| u.premium && u.ai_enabled)
            .cloned()
            .collect())
    }

    async fn campaign_config(&self, user_id: &str) -> CrewforgeResult<Option<Value>> {
        self.check()?;
        Ok(self.state.read().campaigns.get(user_id).cloned())
    }

    async fn update_ai_usage(&self, usage: AiUsage) -> CrewforgeResult<()> {
        self.check()?;
        self.state.write().ai_usage.push(usage);
        Ok(())
    }

    async fn workflow_success_rates(
        &self,
        _since: DateTime<Utc>,
    ) -> CrewforgeResult<Option<HashMap<String, f64>>> {
        self.check()?;
        Ok(self.state.read().success_rates.clone())
    }

    async fn store_performance_snapshot(
        &self,
        snapshot: &PerformanceSnapshot,
    ) -> CrewforgeResult<()> {
        self.check()?;
        self.state.write().snapshots.push(snapshot.clone());
        Ok(())
    }
}
