//! # Hearth Core
//!
//! Domain types, traits, and error definitions for the Hearth on-device
//! conversational agent engine. This crate has **zero framework dependencies**
//! — it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The two external collaborators — the inference engine and the retrieval
//! store — are defined as traits here and implemented (or mocked) elsewhere.
//! Everything the orchestration loop touches flows through these seams:
//! - Swapping inference backends without touching the loop
//! - Testing the full loop with scripted mock services
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod llm;
pub mod result_format;
pub mod retrieval;
pub mod tool;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use error::{Error, LlmError, RagError, Result, ToolError};
pub use llm::LlmService;
pub use result_format::ToolResultFormat;
pub use retrieval::{RetrievalStore, RetrievedChunk};
pub use tool::{Tool, ToolArgs, ToolCall, ToolRegistry};
pub use turn::{Role, Turn};
