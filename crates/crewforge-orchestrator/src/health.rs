use async_trait::async_trait;
use crewforge_core::{CrewforgeError, CrewforgeResult};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Hard timeout for a single health probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// An external service a workflow depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    /// Health endpoint to probe.
    pub url: String,
    /// Whether an unhealthy probe blocks workflow execution.
    pub required: bool,
}

impl Dependency {
    pub fn required(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, url)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy,
    Unhealthy(String),
}

impl ProbeOutcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeOutcome::Healthy)
    }
}

/// How a dependency is probed.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, dependency: &Dependency) -> ProbeOutcome;
}

/// Probes a dependency with a GET request. Timeouts, connection failures and
/// non-2xx responses are all unhealthy.
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new() -> CrewforgeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|e| CrewforgeError::Http(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn probe(&self, dependency: &Dependency) -> ProbeOutcome {
        match self.client.get(&dependency.url).send().await {
            Ok(resp) if resp.status().is_success() => ProbeOutcome::Healthy,
            Ok(resp) => ProbeOutcome::Unhealthy(format!(
                "health check returned status {}",
                resp.status()
            )),
            Err(e) if e.is_timeout() => ProbeOutcome::Unhealthy(format!(
                "health check timed out after {} seconds",
                PROBE_TIMEOUT.as_secs()
            )),
            Err(e) if e.is_connect() => {
                ProbeOutcome::Unhealthy(format!("not reachable at {}", dependency.url))
            }
            Err(e) => ProbeOutcome::Unhealthy(format!("health check failed: {e}")),
        }
    }
}

/// Pre-flight availability check run before any crew execution.
#[derive(Clone)]
pub struct HealthGate {
    probe: Option<Arc<dyn HealthProbe>>,
}

impl HealthGate {
    pub fn new(probe: Arc<dyn HealthProbe>) -> Self {
        Self { probe: Some(probe) }
    }

    /// A gate with no probing mechanism. Every dependency is assumed healthy.
    pub fn fail_open() -> Self {
        Self { probe: None }
    }

    /// HTTP-probing gate. Falls back to [`HealthGate::fail_open`] if no HTTP
    /// client can be constructed.
    pub fn http() -> Self {
        match HttpProbe::new() {
            Ok(probe) => Self::new(Arc::new(probe)),
            Err(e) => {
                warn!(error = %e, "HTTP client unavailable, health checks will fail open");
                Self::fail_open()
            }
        }
    }

    pub fn is_fail_open(&self) -> bool {
        self.probe.is_none()
    }

    /// Probe every dependency concurrently and report health by name.
    ///
    /// Returns [`CrewforgeError::ServiceUnavailable`] for the first required
    /// dependency (in list order) that is unhealthy.
    pub async fn check_required(
        &self,
        dependencies: &[Dependency],
    ) -> CrewforgeResult<HashMap<String, bool>> {
        let Some(probe) = &self.probe else {
            warn!("No health probe configured, skipping service health checks");
            return Ok(dependencies
                .iter()
                .map(|d| (d.name.clone(), true))
                .collect());
        };

        let outcomes = join_all(dependencies.iter().map(|d| probe.probe(d))).await;

        let mut health = HashMap::new();
        let mut failure = None;
        for (dep, outcome) in dependencies.iter().zip(outcomes) {
            health.insert(dep.name.clone(), outcome.is_healthy());
            if let ProbeOutcome::Unhealthy(reason) = outcome {
                error!(service = %dep.name, url = %dep.url, reason = %reason, "Dependency unhealthy");
                if dep.required && failure.is_none() {
                    failure = Some(CrewforgeError::service_unavailable(
                        dep.name.clone(),
                        Some(format!(
                            "{} service is unavailable at {}: {reason}",
                            dep.name, dep.url
                        )),
                    ));
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(health),
        }
    }
}

impl std::fmt::Debug for HealthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthGate")
            .field("fail_open", &self.is_fail_open())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crewforge_core::ErrorType;

    struct Fixed(HashMap<String, ProbeOutcome>);

    #[async_trait]
    impl HealthProbe for Fixed {
        async fn probe(&self, dependency: &Dependency) -> ProbeOutcome {
            self.0
                .get(&dependency.name)
                .cloned()
                .unwrap_or(ProbeOutcome::Healthy)
        }
    }

    fn gate(unhealthy: &[&str]) -> HealthGate {
        HealthGate::new(Arc::new(Fixed(
            unhealthy
                .iter()
                .map(|n| (n.to_string(), ProbeOutcome::Unhealthy("down".into())))
                .collect(),
        )))
    }

    #[tokio::test]
    async fn test_all_healthy() {
        let deps = vec![Dependency::required("tools", "http://tools/health")];
        let health = gate(&[]).check_required(&deps).await.unwrap();
        assert_eq!(health["tools"], true);
    }

    #[tokio::test]
    async fn test_required_unhealthy_is_service_unavailable() {
        let deps = vec![Dependency::required("tools", "http://tools/health")];
        let err = gate(&["tools"]).check_required(&deps).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::ServiceUnavailable);
        assert!(err.to_string().contains("tools service is unavailable"));
    }

    #[tokio::test]
    async fn test_optional_unhealthy_is_reported_not_raised() {
        let deps = vec![
            Dependency::required("tools", "http://tools/health"),
            Dependency::optional("cache", "http://cache/health"),
        ];
        let health = gate(&["cache"]).check_required(&deps).await.unwrap();
        assert_eq!(health["cache"], false);
        assert_eq!(health["tools"], true);
    }

    #[tokio::test]
    async fn test_fail_open_assumes_healthy() {
        let deps = vec![Dependency::required("tools", "http://127.0.0.1:1/health")];
        let gate = HealthGate::fail_open();
        assert!(gate.is_fail_open());
        let health = gate.check_required(&deps).await.unwrap();
        assert_eq!(health["tools"], true);
    }
}
