use crate::routes;
use axum::{
    routing::{get, post},
    Router,
};
use crewforge_orchestrator::Orchestrator;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// The workflow HTTP server.
pub struct GatewayServer;

impl GatewayServer {
    /// Build the router over a shared orchestrator.
    pub fn build(orchestrator: Arc<Orchestrator>) -> Router {
        Router::new()
            .route("/health", get(routes::health))
            .route("/workflows/discovery", post(routes::discovery))
            .route("/workflows/creation", post(routes::creation))
            .route(
                "/workflows/performance-analysis",
                post(routes::performance_analysis),
            )
            .route("/workflows/full-pipeline", post(routes::full_pipeline))
            .with_state(orchestrator)
    }

    /// Bind `addr` and serve until the task is cancelled or the listener fails.
    pub async fn serve(orchestrator: Arc<Orchestrator>, addr: SocketAddr) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "Gateway listening");
        axum::serve(listener, Self::build(orchestrator)).await
    }
}
