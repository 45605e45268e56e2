//! Core types and error definitions for the crewforge pipeline orchestrator.
//!
//! This crate provides the foundational types shared across all crewforge
//! crates: the error taxonomy, the structured workflow result handed back to
//! every caller, workflow identifiers, and the tool handles bound to workers.
//!
//! # Main types
//!
//! - [`CrewforgeError`] — Unified error enum for all crewforge subsystems.
//! - [`CrewforgeResult`] — Convenience alias for `Result<T, CrewforgeError>`.
//! - [`WorkflowKind`] — The named end-to-end use cases (discovery, creation, ...).
//! - [`WorkflowResult`] — Status-discriminated result of one workflow invocation.
//! - [`ToolSet`] — The catalogue of external tool handles available to workers.

/// Error taxonomy.
pub mod error;
/// Boundary helpers for opaque worker output.
pub mod payload;
/// Structured workflow results.
pub mod result;
/// External tool handles and tool modes.
pub mod tool;
/// Workflow identifiers.
pub mod workflow;

pub use error::{CrewforgeError, CrewforgeResult, ErrorType};
pub use payload::{count_items, parse_payload};
pub use result::{WorkflowOutcome, WorkflowResult};
pub use tool::{ToolHandle, ToolMode, ToolSet, FILE_WRITER};
pub use workflow::WorkflowKind;
