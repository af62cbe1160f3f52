//! Core infrastructure for Canvasflow.
//!
//! Configuration loading and the retry/timeout helpers shared by every
//! external call.

mod config;
mod retry;

pub use config::{AiConfig, Config, DocumentsConfig, StoreConfig, WorkflowConfig};
pub use retry::{retry_async, AttemptError, RetryConfig, RetryResult};
