#![allow(clippy::format_push_string)]
#![allow(clippy::unused_self)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::trivially_copy_pass_by_ref)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

//! # Canvasflow
//!
//! Routes a free-text request through a graph of classification and
//! generation stages. The result is either a direct answer or a generated
//! code/document artifact shown on a "canvas" next to the answer.
//!
//! Requests like "update the sales_chart file" locate the artifact generated
//! earlier and revise it in place, keeping its history.
//!
//! ## Modules
//!
//! - [`workflow`]: stage graph, classification, generation, response
//! - [`store`]: content records with layered lookup, identifier registry
//! - [`ai`]: completion providers (OpenAI, Claude, Ollama) with retry and fallback
//! - [`integrations`]: document service client, web search
//! - [`core`]: configuration and retry helpers
//!
//! ## Quick Start
//!
//! ```bash
//! export OPENAI_API_KEY=...
//! canvasflow ask "write a python function that checks for primes"
//! canvasflow ask "update the prime_checker code to use a sieve"
//! canvasflow recent
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unnecessary_map_or)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::use_self)]

pub mod ai;
pub mod core;
pub mod integrations;
pub mod store;
pub mod workflow;

// Re-export commonly used types
pub use ai::{CompletionClient, CompletionProvider, CompletionRequest};
pub use core::Config;
pub use store::{ContentRecord, RecordMetadata, Store};
pub use workflow::{ChatRequest, Orchestrator, StageId, WorkflowResponse};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "canvasflow";
