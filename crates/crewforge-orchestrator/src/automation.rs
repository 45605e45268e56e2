use crate::fallback::{FallbackController, GuardOutcome};
use crate::fanout::{ConcurrencyScheduler, EntityKey, EntityOutcome, DEFAULT_BATCH_PAUSE};
use crate::graph::AnalysisParams;
use crate::monitor::{detect_issues, PerformanceMonitor, PerformanceSnapshot};
use crate::scheduler::{CronSchedule, JobAction, ScheduledJob};
use crate::store::{
    AiUsage, AnalysisRecord, ContentItem, ContentRequest, GeneratedContent, Notifier, TrendRecord,
    UserActivity, UserRecord, WorkflowStore,
};
use crate::tracker::WorkflowTracker;
use crate::workflows::Orchestrator;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use crewforge_core::{
    count_items, parse_payload, CrewforgeError, CrewforgeResult, WorkflowKind, WorkflowResult,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// The recurring jobs the automation scheduler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationJob {
    TrendDiscovery,
    ContentCreation,
    PerformanceAnalysis,
    Onboarding,
    FullPipeline,
    PerformanceMonitoring,
}

impl AutomationJob {
    pub const ALL: [AutomationJob; 6] = [
        AutomationJob::TrendDiscovery,
        AutomationJob::ContentCreation,
        AutomationJob::PerformanceAnalysis,
        AutomationJob::Onboarding,
        AutomationJob::FullPipeline,
        AutomationJob::PerformanceMonitoring,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AutomationJob::TrendDiscovery => "trend_discovery",
            AutomationJob::ContentCreation => "content_creation",
            AutomationJob::PerformanceAnalysis => "performance_analysis",
            AutomationJob::Onboarding => "onboarding",
            AutomationJob::FullPipeline => "full_pipeline",
            AutomationJob::PerformanceMonitoring => "performance_monitoring",
        }
    }

    /// 7-field cron expression (sec min hour dom month dow year), UTC.
    pub fn cron_expression(self) -> &'static str {
        match self {
            AutomationJob::TrendDiscovery => "0 0 */4 * * * *",
            AutomationJob::ContentCreation => "0 0 */6 * * * *",
            AutomationJob::PerformanceAnalysis => "0 0 */2 * * * *",
            AutomationJob::Onboarding => "0 */30 * * * * *",
            AutomationJob::FullPipeline => "0 0 8 * * * *",
            AutomationJob::PerformanceMonitoring => "0 0 * * * * *",
        }
    }
}

impl std::fmt::Display for AutomationJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tuning for the automation jobs.
#[derive(Debug, Clone)]
pub struct AutomationConfig {
    /// Users per discovery group.
    pub batch_size: usize,
    pub batch_pause: Duration,
    /// Cap on concurrently running analysis workflows.
    pub max_concurrent_analysis: usize,
    /// How far back to look for published content to analyse.
    pub analysis_window: ChronoDuration,
    pub analysis_limit: usize,
    /// Pause between users in the daily full-pipeline run.
    pub pipeline_user_pause: Duration,
    /// Users created within this window are onboarded.
    pub onboarding_window: ChronoDuration,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_pause: DEFAULT_BATCH_PAUSE,
            max_concurrent_analysis: 5,
            analysis_window: ChronoDuration::hours(6),
            analysis_limit: 20,
            pipeline_user_pause: Duration::from_secs(10),
            onboarding_window: ChronoDuration::hours(1),
        }
    }
}

/// Discovery parameters resolved from a user's stored preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: String,
    pub niches: Vec<String>,
    pub platforms: Vec<String>,
}

impl EntityKey for UserProfile {
    fn entity_id(&self) -> String {
        self.user_id.clone()
    }
}

impl EntityKey for ContentItem {
    fn entity_id(&self) -> String {
        self.id.clone()
    }
}

/// Runs the recurring AI workflows against the user base.
///
/// Every job body goes through the [`FallbackController`], so nothing a job
/// does can take the scheduler down.
pub struct AutomationScheduler {
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn WorkflowStore>,
    notifier: Arc<dyn Notifier>,
    fanout: ConcurrencyScheduler,
    tracker: WorkflowTracker,
    fallback: FallbackController,
    performance: PerformanceMonitor,
    config: AutomationConfig,
    last_snapshot: Mutex<Option<PerformanceSnapshot>>,
}

impl AutomationScheduler {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        store: Arc<dyn WorkflowStore>,
        notifier: Arc<dyn Notifier>,
        fallback: FallbackController,
        config: AutomationConfig,
    ) -> Self {
        let tracker = WorkflowTracker::new();
        let performance = PerformanceMonitor::new(
            tracker.clone(),
            orchestrator.monitor().clone(),
            store.clone(),
        );
        Self {
            fanout: ConcurrencyScheduler::new(config.batch_pause),
            orchestrator,
            store,
            notifier,
            tracker,
            fallback,
            performance,
            config,
            last_snapshot: Mutex::new(None),
        }
    }

    pub fn tracker(&self) -> &WorkflowTracker {
        &self.tracker
    }

    pub fn fallback(&self) -> &FallbackController {
        &self.fallback
    }

    pub fn config(&self) -> &AutomationConfig {
        &self.config
    }

    /// The most recent performance sample, if monitoring has run.
    pub fn last_snapshot(&self) -> Option<PerformanceSnapshot> {
        self.last_snapshot.lock().clone()
    }

    /// Run one job to completion under the fallback guard.
    pub async fn run_job(&self, job: AutomationJob) -> GuardOutcome {
        info!(job = %job, "Automation job started");
        let outcome = match job {
            AutomationJob::TrendDiscovery => self.fallback.guard(job, self.trend_discovery()).await,
            AutomationJob::ContentCreation => {
                self.fallback.guard(job, self.content_creation()).await
            }
            AutomationJob::PerformanceAnalysis => {
                self.fallback.guard(job, self.performance_analysis()).await
            }
            AutomationJob::Onboarding => self.fallback.guard(job, self.onboarding()).await,
            AutomationJob::FullPipeline => self.fallback.guard(job, self.full_pipeline()).await,
            AutomationJob::PerformanceMonitoring => {
                self.fallback.guard(job, self.monitor_performance()).await
            }
        };
        if outcome.is_completed() {
            info!(job = %job, "Automation job completed");
        }
        outcome
    }

    /// One cron-triggered [`ScheduledJob`] per [`AutomationJob`].
    pub fn scheduled_jobs(self: &Arc<Self>) -> CrewforgeResult<Vec<ScheduledJob>> {
        AutomationJob::ALL
            .into_iter()
            .map(|job| {
                let schedule = CronSchedule::parse(job.cron_expression())?;
                Ok(ScheduledJob::new(
                    job.as_str(),
                    Arc::new(schedule),
                    Arc::new(AutomationAction {
                        scheduler: self.clone(),
                        job,
                    }),
                ))
            })
            .collect()
    }

    async fn trend_discovery(&self) -> CrewforgeResult<()> {
        let users = self.store.all_users().await?;
        info!(users = users.len(), "Starting trend discovery");

        let mut profiles = Vec::with_capacity(users.len());
        for user in &users {
            profiles.push(self.user_profile(&user.id).await);
        }

        let orchestrator = self.orchestrator.clone();
        let tracker = self.tracker.clone();
        let this = self;
        let report = self
            .fanout
            .fan_out(
                profiles,
                self.config.batch_size,
                move |profile: UserProfile| {
                    let orchestrator = orchestrator.clone();
                    let tracker = tracker.clone();
                    async move {
                        let _run = tracker.begin(WorkflowKind::Discovery, &profile.user_id);
                        let result = orchestrator
                            .discover(Some(profile.platforms), Some(profile.niches))
                            .await;
                        require_success(result)
                    }
                },
                move |outcomes| this.record_trends(outcomes),
            )
            .await;

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "Trend discovery finished"
        );
        Ok(())
    }

    async fn record_trends(&self, outcomes: Vec<EntityOutcome<WorkflowResult>>) {
        for outcome in outcomes {
            let Ok(result) = outcome.result else {
                continue;
            };
            let user_id = outcome.entity_id;
            let trends = parse_payload(result.payload().unwrap_or_default());
            let platforms = string_list(result.param("platforms"));
            let trends_found = count_items(&trends);

            let record = TrendRecord {
                user_id: user_id.clone(),
                trends,
                platforms: platforms.clone(),
                timestamp: result.timestamp,
                source: "ai_crew_discovery".into(),
            };
            if let Err(e) = self.store.store_trend_data(record).await {
                error!(user_id = %user_id, error = %e, "Failed to store trend data");
                continue;
            }

            let activity = UserActivity {
                user_id: user_id.clone(),
                activity_type: "trend_discovery".into(),
                title: "AI Trend Discovery Completed".into(),
                status: "completed".into(),
                metadata: json!({
                    "platforms": platforms,
                    "trends_found": trends_found,
                    "workflow": result.workflow,
                }),
            };
            if let Err(e) = self.store.create_user_activity(activity).await {
                warn!(user_id = %user_id, error = %e, "Failed to record discovery activity");
            }
        }
    }

    /// Preferences drive discovery; a failed lookup degrades to a minimal
    /// profile instead of skipping the user.
    async fn user_profile(&self, user_id: &str) -> UserProfile {
        match self.store.user_preferences(user_id).await {
            Ok(prefs) => {
                let prefs = prefs.unwrap_or_default();
                UserProfile {
                    user_id: user_id.to_string(),
                    niches: non_empty_or(prefs.content_niches, &["general"]),
                    platforms: non_empty_or(prefs.target_platforms, &["tiktok", "instagram"]),
                }
            }
            Err(e) => {
                warn!(user_id, error = %e, "Could not load user preferences, using minimal profile");
                UserProfile {
                    user_id: user_id.to_string(),
                    niches: vec!["general".into()],
                    platforms: vec!["tiktok".into()],
                }
            }
        }
    }

    async fn content_creation(&self) -> CrewforgeResult<()> {
        let requests = self.store.pending_content_requests().await?;
        info!(requests = requests.len(), "Processing content requests");

        for request in &requests {
            if let Err(e) = self.fulfil_request(request).await {
                error!(request_id = %request.id, error = %e, "Content request failed");
            }
        }
        Ok(())
    }

    async fn fulfil_request(&self, request: &ContentRequest) -> CrewforgeResult<()> {
        let Some(trend_data) = self.store.latest_trend_data(&request.user_id).await? else {
            warn!(
                request_id = %request.id,
                user_id = %request.user_id,
                "No trend data for user, skipping content request"
            );
            return Ok(());
        };

        let result = {
            let _run = self.tracker.begin(WorkflowKind::Creation, &request.user_id);
            self.orchestrator
                .create(trend_data, request.content_type.clone())
                .await
        };
        let result = require_success(result)?;

        let content_type = result
            .param("content_type")
            .and_then(Value::as_str)
            .unwrap_or("video")
            .to_string();
        let generated = GeneratedContent {
            user_id: request.user_id.clone(),
            content: parse_payload(result.payload().unwrap_or_default()),
            content_type,
            source: "ai_crew_creation".into(),
            metadata: json!({
                "generated_at": result.timestamp,
                "workers_used": ["content_creator", "content_analyzer"],
            }),
        };
        if let Err(e) = self.store.store_generated_content(generated).await {
            error!(request_id = %request.id, error = %e, "Failed to store generated content");
        }

        self.store
            .update_content_request_status(&request.id, "completed", serde_json::to_value(&result)?)
            .await?;
        info!(request_id = %request.id, "Content request completed");
        Ok(())
    }

    async fn performance_analysis(&self) -> CrewforgeResult<()> {
        let since = Utc::now() - self.config.analysis_window;
        let items = self
            .store
            .recent_content_for_analysis(since, self.config.analysis_limit)
            .await?;
        info!(items = items.len(), "Analysing recent content");

        let period = format!("{}h", self.config.analysis_window.num_hours());
        let orchestrator = self.orchestrator.clone();
        let tracker = self.tracker.clone();
        let outcomes = self
            .fanout
            .fan_out_bounded(items, self.config.max_concurrent_analysis, move |item| {
                let orchestrator = orchestrator.clone();
                let tracker = tracker.clone();
                let params = AnalysisParams::new(Some(period.clone()), None).with_content(json!({
                    "id": item.id,
                    "user_id": item.user_id,
                    "published_at": item.published_at,
                    "body": item.body,
                }));
                async move {
                    let _run = tracker.begin(WorkflowKind::PerformanceAnalysis, &item.id);
                    require_success(orchestrator.analyze(params).await)
                }
            })
            .await;

        for outcome in outcomes {
            match outcome.result {
                Ok(result) => {
                    let record = AnalysisRecord {
                        content_id: outcome.entity_id.clone(),
                        status: result.status().to_string(),
                        report: parse_payload(result.payload().unwrap_or_default()),
                        timestamp: result.timestamp,
                    };
                    if let Err(e) = self.store.store_analysis(record).await {
                        error!(content_id = %outcome.entity_id, error = %e, "Failed to store analysis");
                    }
                }
                Err(e) => {
                    error!(content_id = %outcome.entity_id, error = %e, "Content analysis failed");
                }
            }
        }
        Ok(())
    }

    async fn onboarding(&self) -> CrewforgeResult<()> {
        let since = Utc::now() - self.config.onboarding_window;
        let users = self.store.users_needing_onboarding(since).await?;
        info!(users = users.len(), "Onboarding new users");

        for user in &users {
            if let Err(e) = self.onboard(user).await {
                error!(user_id = %user.id, error = %e, "Onboarding failed");
            }
        }
        Ok(())
    }

    async fn onboard(&self, user: &UserRecord) -> CrewforgeResult<()> {
        let result = {
            let _run = self.tracker.begin(WorkflowKind::FullPipeline, &user.id);
            self.orchestrator
                .run_full_pipeline(&user.id, onboarding_config(&user.id))
                .await
        };
        let result = require_success(result)?;

        self.store.mark_user_onboarded(&user.id).await?;
        self.notifier
            .notify(
                &user.id,
                "onboarding_recommendations",
                &json!({
                    "type": "onboarding_recommendations",
                    "recommendations": parse_payload(result.payload().unwrap_or_default()),
                    "timestamp": result.timestamp,
                }),
            )
            .await?;
        info!(user_id = %user.id, "User onboarded");
        Ok(())
    }

    async fn full_pipeline(&self) -> CrewforgeResult<()> {
        let users = self.store.premium_users_with_ai().await?;
        info!(users = users.len(), "Running daily full pipeline");

        for (index, user) in users.iter().enumerate() {
            if index > 0 && !self.config.pipeline_user_pause.is_zero() {
                tokio::time::sleep(self.config.pipeline_user_pause).await;
            }
            if let Err(e) = self.pipeline_for(user).await {
                error!(user_id = %user.id, error = %e, "Daily pipeline failed");
            }
        }
        Ok(())
    }

    async fn pipeline_for(&self, user: &UserRecord) -> CrewforgeResult<()> {
        let campaign = self.campaign_config(&user.id).await;
        let result = {
            let _run = self.tracker.begin(WorkflowKind::FullPipeline, &user.id);
            self.orchestrator.run_full_pipeline(&user.id, campaign).await
        };
        let result = require_success(result)?;

        let usage = AiUsage {
            user_id: user.id.clone(),
            pipeline_executions: 1,
            last_pipeline_run: Utc::now(),
            execution_result: result.status().to_string(),
        };
        if let Err(e) = self.store.update_ai_usage(usage).await {
            warn!(user_id = %user.id, error = %e, "Failed to update AI usage");
        }

        self.notifier
            .notify(
                &user.id,
                "daily_pipeline_summary",
                &json!({
                    "type": "daily_pipeline_summary",
                    "summary": parse_payload(result.payload().unwrap_or_default()),
                    "timestamp": result.timestamp,
                }),
            )
            .await?;
        info!(user_id = %user.id, "Daily pipeline completed");
        Ok(())
    }

    async fn campaign_config(&self, user_id: &str) -> Value {
        match self.store.campaign_config(user_id).await {
            Ok(Some(config)) => config,
            Ok(None) => json!({
                "platforms": ["tiktok", "instagram"],
                "content_goals": ["viral_growth"],
                "frequency": "daily",
                "budget": "standard",
            }),
            Err(e) => {
                warn!(user_id, error = %e, "Could not load campaign config, using basic campaign");
                json!({
                    "platforms": ["tiktok"],
                    "content_goals": ["engagement"],
                    "frequency": "daily",
                    "budget": "basic",
                })
            }
        }
    }

    async fn monitor_performance(&self) -> CrewforgeResult<()> {
        let snapshot = self.performance.sample().await;
        let issues = detect_issues(&snapshot);
        for issue in &issues {
            warn!(issue = %issue, "Performance issue detected");
        }
        info!(
            active_workflows = snapshot.active_workflows,
            issues = issues.len(),
            "Performance sample taken"
        );

        *self.last_snapshot.lock() = Some(snapshot.clone());
        self.store.store_performance_snapshot(&snapshot).await
    }
}

impl std::fmt::Debug for AutomationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutomationScheduler")
            .field("config", &self.config)
            .field("active_runs", &self.tracker.active_count())
            .field("fallback_enabled", &self.fallback.is_enabled())
            .finish()
    }
}

struct AutomationAction {
    scheduler: Arc<AutomationScheduler>,
    job: AutomationJob,
}

#[async_trait]
impl JobAction for AutomationAction {
    async fn fire(&self) {
        self.scheduler.run_job(self.job).await;
    }
}

/// Default campaign shape for a newly registered user.
pub fn onboarding_config(user_id: &str) -> Value {
    json!({
        "user_id": user_id,
        "onboarding_type": "new_user",
        "content_goals": ["engagement", "follower_growth"],
        "platforms": ["tiktok", "instagram"],
        "content_types": ["educational", "entertaining"],
        "frequency": "daily",
    })
}

fn require_success(result: WorkflowResult) -> CrewforgeResult<WorkflowResult> {
    match result.error() {
        None => Ok(result),
        Some(error) => Err(CrewforgeError::Orchestrator(format!(
            "{} workflow failed: {error}",
            result.workflow
        ))),
    }
}

fn non_empty_or(values: Option<Vec<String>>, default: &[&str]) -> Vec<String> {
    match values {
        Some(values) if !values.is_empty() => values,
        _ => default.iter().map(|s| s.to_string()).collect(),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
