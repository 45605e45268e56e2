use crate::models::{
    AnalysisRequest, AnalysisResponse, CreationMetadata, CreationRequest, CreationResponse,
    DiscoveryMetadata, DiscoveryRequest, DiscoveryResponse, PipelineMetadata, PipelineRequest,
    PipelineResponse, PipelineWorkflow,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use crewforge_core::{count_items, parse_payload, ErrorType, WorkflowResult};
use crewforge_orchestrator::Orchestrator;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

/// A workflow error result rendered as an HTTP response.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    /// `{"detail": {"error", "error_type"}}` with 503 for service
    /// unavailability and 500 for everything else.
    pub fn from_result(result: &WorkflowResult) -> Self {
        let error_type = result.error_type().unwrap_or(ErrorType::Internal);
        Self {
            status: status_for(error_type),
            body: json!({
                "detail": {
                    "error": result.error().unwrap_or("Agent execution failed"),
                    "error_type": error_type,
                }
            }),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn status_for(error_type: ErrorType) -> StatusCode {
    match error_type {
        ErrorType::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// The success payload, or the error response to return instead.
fn success_payload(result: &WorkflowResult) -> Result<Value, ApiError> {
    match result.payload() {
        Some(raw) => Ok(parse_payload(raw)),
        None => {
            warn!(
                workflow = %result.workflow,
                error = result.error().unwrap_or_default(),
                "Workflow request failed"
            );
            Err(ApiError::from_result(result))
        }
    }
}

fn param(result: &WorkflowResult, key: &str) -> Value {
    result.param(key).cloned().unwrap_or(Value::Null)
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "service": "crewforge"}))
}

pub async fn discovery(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(request): Json<DiscoveryRequest>,
) -> Result<Json<DiscoveryResponse>, ApiError> {
    let result = orchestrator
        .discover(request.platforms, request.niches)
        .await;
    let trends = success_payload(&result)?;

    Ok(Json(DiscoveryResponse {
        status: "success",
        trends_discovered: count_items(&trends),
        trends,
        metadata: DiscoveryMetadata {
            timestamp: result.timestamp,
            platforms: param(&result, "platforms"),
            niches: param(&result, "niches"),
        },
    }))
}

pub async fn creation(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(request): Json<CreationRequest>,
) -> Result<Json<CreationResponse>, ApiError> {
    let result = orchestrator
        .create(request.trend_data, request.content_type)
        .await;
    let content = success_payload(&result)?;

    Ok(Json(CreationResponse {
        status: "success",
        content_created: count_items(&content),
        content,
        metadata: CreationMetadata {
            content_type: param(&result, "content_type"),
            timestamp: result.timestamp,
        },
    }))
}

/// Unlike the other endpoints, an error here keeps the flat result shape so
/// callers can still read back the period they asked for.
pub async fn performance_analysis(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(request): Json<AnalysisRequest>,
) -> Response {
    let result = orchestrator
        .analyze_performance(request.period, request.metrics)
        .await;

    match result.payload() {
        Some(raw) => Json(AnalysisResponse {
            status: "success",
            period: param(&result, "period"),
            metrics_analyzed: param(&result, "metrics"),
            report: parse_payload(raw),
            timestamp: result.timestamp,
        })
        .into_response(),
        None => {
            let error_type = result.error_type().unwrap_or(ErrorType::Internal);
            warn!(
                workflow = %result.workflow,
                error = result.error().unwrap_or_default(),
                "Performance analysis request failed"
            );
            (
                status_for(error_type),
                Json(json!({
                    "status": "error",
                    "error": result.error(),
                    "error_type": error_type,
                    "period": param(&result, "period"),
                    "timestamp": result.timestamp,
                })),
            )
                .into_response()
        }
    }
}

pub async fn full_pipeline(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(request): Json<PipelineRequest>,
) -> Result<Json<PipelineResponse>, ApiError> {
    let result = orchestrator
        .run_full_pipeline(&request.entity_id, request.campaign_config.clone())
        .await;
    let workflow = success_payload(&result)?;

    Ok(Json(PipelineResponse {
        status: "success",
        workflow: PipelineWorkflow {
            result: workflow,
            campaign_config: request.campaign_config,
        },
        metadata: PipelineMetadata {
            entity_id: request.entity_id,
            timestamp: result.timestamp,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crewforge_core::{CrewforgeError, WorkflowKind};

    #[test]
    fn test_service_unavailable_maps_to_503() {
        let result = WorkflowResult::failure(
            WorkflowKind::Discovery,
            json!({}),
            &CrewforgeError::service_unavailable("crew-social-tools", None),
        );
        let err = ApiError::from_result(&result);
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.body()["detail"]["error_type"], "service_unavailable");
    }

    #[test]
    fn test_agent_failure_maps_to_500() {
        let result = WorkflowResult::failure(
            WorkflowKind::Creation,
            json!({}),
            &CrewforgeError::AgentExecution("boom".into()),
        );
        let err = ApiError::from_result(&result);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body()["detail"]["error"], "Agent execution error: boom");
    }
}
