use crate::automation::AutomationJob;
use async_trait::async_trait;
use crewforge_core::{CrewforgeError, CrewforgeResult};
use futures_util::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// A non-AI degraded path for one class of workflow.
#[async_trait]
pub trait FallbackRoutine: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self) -> CrewforgeResult<()>;
}

/// Triggers a legacy automation endpoint (e.g. the traditional trend monitor)
/// with a JSON POST.
pub struct WebhookFallback {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl WebhookFallback {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> CrewforgeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CrewforgeError::Http(e.to_string()))?;
        Ok(Self {
            name: name.into(),
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl FallbackRoutine for WebhookFallback {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> CrewforgeResult<()> {
        let resp = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "job": self.name }))
            .send()
            .await
            .map_err(|e| CrewforgeError::Http(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(CrewforgeError::Http(format!(
                "fallback {} returned status {}",
                self.name,
                resp.status()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackOutcome {
    /// Fallbacks are switched off process-wide.
    Disabled,
    /// The job has no fallback routine.
    NotConfigured,
    Succeeded { routine: String },
    Failed { routine: String, error: String },
}

/// What happened to one guarded job run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Completed,
    PrimaryFailed {
        error: String,
        fallback: FallbackOutcome,
    },
}

impl GuardOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, GuardOutcome::Completed)
    }
}

/// Wraps AI-driven jobs so a failure routes to the job's fallback routine
/// and never escapes to the caller.
pub struct FallbackController {
    enabled: AtomicBool,
    routines: HashMap<AutomationJob, Arc<dyn FallbackRoutine>>,
}

impl FallbackController {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            routines: HashMap::new(),
        }
    }

    pub fn with_routine(mut self, job: AutomationJob, routine: Arc<dyn FallbackRoutine>) -> Self {
        self.routines.insert(job, routine);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn has_routine(&self, job: AutomationJob) -> bool {
        self.routines.contains_key(&job)
    }

    /// Run `primary`. On error or panic, run the job's fallback if enabled.
    /// Fallback failures are logged and swallowed.
    pub async fn guard<F>(&self, job: AutomationJob, primary: F) -> GuardOutcome
    where
        F: Future<Output = CrewforgeResult<()>>,
    {
        let error = match AssertUnwindSafe(primary).catch_unwind().await {
            Ok(Ok(())) => return GuardOutcome::Completed,
            Ok(Err(e)) => e.to_string(),
            Err(panic) => panic_message(panic.as_ref()),
        };
        error!(job = %job, error = %error, "AI workflow failed");

        let fallback = self.run_fallback(job).await;
        GuardOutcome::PrimaryFailed { error, fallback }
    }

    async fn run_fallback(&self, job: AutomationJob) -> FallbackOutcome {
        if !self.is_enabled() {
            return FallbackOutcome::Disabled;
        }
        let Some(routine) = self.routines.get(&job) else {
            return FallbackOutcome::NotConfigured;
        };
        let routine_name = routine.name().to_string();
        info!(job = %job, routine = %routine_name, fallback = true, "Running fallback routine");

        match AssertUnwindSafe(routine.run()).catch_unwind().await {
            Ok(Ok(())) => FallbackOutcome::Succeeded {
                routine: routine_name,
            },
            Ok(Err(e)) => {
                warn!(job = %job, routine = %routine_name, fallback = true, error = %e, "Fallback routine failed");
                FallbackOutcome::Failed {
                    routine: routine_name,
                    error: e.to_string(),
                }
            }
            Err(panic) => {
                let error = panic_message(panic.as_ref());
                warn!(job = %job, routine = %routine_name, fallback = true, error = %error, "Fallback routine panicked");
                FallbackOutcome::Failed {
                    routine: routine_name,
                    error,
                }
            }
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Counting {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl FallbackRoutine for Counting {
        fn name(&self) -> &str {
            "legacy"
        }

        async fn run(&self) -> CrewforgeResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(CrewforgeError::Http("legacy down".into()))
            } else {
                Ok(())
            }
        }
    }

    async fn explode() -> CrewforgeResult<()> {
        panic!("unexpected")
    }

    fn routine(fail: bool) -> Arc<Counting> {
        Arc::new(Counting {
            calls: AtomicUsize::new(0),
            fail,
        })
    }

    #[tokio::test]
    async fn test_success_skips_fallback() {
        let r = routine(false);
        let controller =
            FallbackController::new(true).with_routine(AutomationJob::TrendDiscovery, r.clone());
        let outcome = controller
            .guard(AutomationJob::TrendDiscovery, async { Ok(()) })
            .await;
        assert!(outcome.is_completed());
        assert_eq!(r.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_runs_fallback_when_enabled() {
        let r = routine(false);
        let controller =
            FallbackController::new(true).with_routine(AutomationJob::TrendDiscovery, r.clone());
        let outcome = controller
            .guard(AutomationJob::TrendDiscovery, async {
                Err(CrewforgeError::Store("db down".into()))
            })
            .await;
        assert_eq!(
            outcome,
            GuardOutcome::PrimaryFailed {
                error: "Store error: db down".into(),
                fallback: FallbackOutcome::Succeeded {
                    routine: "legacy".into()
                },
            }
        );
        assert_eq!(r.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_never_runs_fallback() {
        let r = routine(false);
        let controller =
            FallbackController::new(false).with_routine(AutomationJob::ContentCreation, r.clone());
        let outcome = controller
            .guard(AutomationJob::ContentCreation, async {
                Err(CrewforgeError::Store("db down".into()))
            })
            .await;
        assert!(matches!(
            outcome,
            GuardOutcome::PrimaryFailed {
                fallback: FallbackOutcome::Disabled,
                ..
            }
        ));
        assert_eq!(r.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panic_is_contained_and_fallback_failure_swallowed() {
        let r = routine(true);
        let controller =
            FallbackController::new(true).with_routine(AutomationJob::PerformanceAnalysis, r.clone());
        let outcome = controller
            .guard(AutomationJob::PerformanceAnalysis, explode())
            .await;
        match outcome {
            GuardOutcome::PrimaryFailed { error, fallback } => {
                assert!(error.contains("unexpected"));
                assert!(matches!(fallback, FallbackOutcome::Failed { .. }));
            }
            GuardOutcome::Completed => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn test_job_without_routine() {
        let controller = FallbackController::new(true);
        let outcome = controller
            .guard(AutomationJob::Onboarding, async {
                Err(CrewforgeError::Store("x".into()))
            })
            .await;
        assert!(matches!(
            outcome,
            GuardOutcome::PrimaryFailed {
                fallback: FallbackOutcome::NotConfigured,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_webhook_posts_job_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/trend-monitor"))
            .and(body_json(serde_json::json!({ "job": "traditional_trend_discovery" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let webhook = WebhookFallback::new(
            "traditional_trend_discovery",
            format!("{}/trend-monitor", server.uri()),
        )
        .unwrap();
        assert_eq!(webhook.name(), "traditional_trend_discovery");
        webhook.run().await.unwrap();
    }

    #[tokio::test]
    async fn test_webhook_error_status_fails_the_routine() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let webhook = WebhookFallback::new("legacy", server.uri()).unwrap();
        let err = webhook.run().await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
