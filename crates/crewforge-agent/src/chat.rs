use crate::config::{LlmProvider, ModelConfig};
use crate::executor::{TaskRequest, WorkerExecutor};
use crate::profile::WorkerProfile;
use crate::retry::is_retryable_status;
use async_trait::async_trait;
use crewforge_core::{CrewforgeError, CrewforgeResult};
use std::time::Duration;
use tracing::{info, warn};

/// OpenAI-compatible chat completions executor.
///
/// Works with OpenAI, OpenRouter, Groq, and any other provider that implements
/// the chat completions API. Transient failures are retried up to the
/// worker's `max_retries` with capped exponential backoff.
pub struct ChatExecutor {
    config: ModelConfig,
    http: reqwest::Client,
}

/// One failed backend call, classified where the status code and transport
/// error are still at hand.
struct FailedCall {
    error: CrewforgeError,
    retryable: bool,
}

impl FailedCall {
    fn fatal(error: CrewforgeError) -> Self {
        Self {
            error,
            retryable: false,
        }
    }
}

impl ChatExecutor {
    /// Build an executor whose HTTP client enforces the configured request timeout.
    pub fn new(config: ModelConfig) -> CrewforgeResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CrewforgeError::Http(e.to_string()))?;
        Ok(Self { config, http })
    }

    fn build_body(&self, profile: &WorkerProfile, request: &TaskRequest) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model_id,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": [
                { "role": "system", "content": profile.system_prompt() },
                { "role": "user", "content": request.prompt() },
            ],
        })
    }

    fn add_provider_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json");

        if matches!(self.config.provider, LlmProvider::OpenRouter) {
            request.header("X-Title", "crewforge")
        } else {
            request
        }
    }

    async fn complete_once(&self, body: &serde_json::Value) -> Result<String, FailedCall> {
        let url = format!("{}/v1/chat/completions", self.config.base_url());
        let resp = self
            .add_provider_headers(self.http.post(&url))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FailedCall {
                        error: CrewforgeError::Http(format!(
                            "request timeout after {}ms: {e}",
                            self.config.request_timeout_ms
                        )),
                        retryable: true,
                    }
                } else {
                    FailedCall::fatal(CrewforgeError::Http(e.to_string()))
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let error_body = resp
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(FailedCall {
                error: CrewforgeError::Http(format!("Chat API error {status}: {error_body}")),
                retryable: is_retryable_status(status.as_u16()),
            });
        }

        let resp_body: serde_json::Value = resp.json().await.map_err(|e| FailedCall {
            retryable: e.is_timeout(),
            error: CrewforgeError::Http(e.to_string()),
        })?;
        parse_chat_response(&resp_body).map_err(FailedCall::fatal)
    }
}

#[async_trait]
impl WorkerExecutor for ChatExecutor {
    async fn execute(
        &self,
        profile: &WorkerProfile,
        request: &TaskRequest,
    ) -> CrewforgeResult<String> {
        let body = self.build_body(profile, request);
        let policy = &self.config.retry_policy;
        let mut attempt = 0;

        loop {
            match self.complete_once(&body).await {
                Ok(text) => return Ok(text),
                Err(failed) if failed.retryable && attempt < profile.max_retries => {
                    let delay = policy.backoff_ms(attempt);
                    info!(
                        role = %profile.role,
                        attempt,
                        delay_ms = delay,
                        error = %failed.error,
                        "Retryable backend error, backing off"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(failed) => {
                    warn!(role = %profile.role, attempt, error = %failed.error, "Backend call failed");
                    return Err(failed.error);
                }
            }
        }
    }
}

/// Extract the assistant text from a chat completions response body.
pub fn parse_chat_response(body: &serde_json::Value) -> CrewforgeResult<String> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| CrewforgeError::Http(format!("Chat API returned no content: {body}")))
}
