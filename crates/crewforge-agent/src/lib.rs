//! Worker profiles and the reasoning-backend seam.
//!
//! The orchestration core treats the reasoning engine as a black box: given a
//! task description it eventually returns text or fails. [`WorkerExecutor`] is
//! that seam. [`ChatExecutor`] is the production implementation, speaking the
//! OpenAI-compatible chat completions API.

pub mod chat;
pub mod config;
pub mod executor;
pub mod profile;
pub mod retry;

pub use chat::ChatExecutor;
pub use config::{LlmProvider, ModelConfig};
pub use executor::{TaskRequest, WorkerExecutor};
pub use profile::{WorkerProfile, WorkerRole};
pub use retry::RetryPolicy;
