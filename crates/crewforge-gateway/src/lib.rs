//! HTTP surface for the crewforge workflows.
//!
//! Every endpoint runs one workflow through the shared [`Orchestrator`] and
//! maps its structured result onto a JSON response. Error results become
//! HTTP 503 when a required dependency is down and HTTP 500 otherwise.
//!
//! [`Orchestrator`]: crewforge_orchestrator::Orchestrator

/// Request and response bodies.
pub mod models;
/// Route handlers.
pub mod routes;
/// Router construction and serving.
pub mod server;

pub use routes::ApiError;
pub use server::GatewayServer;
