//! On-device knowledge base: document ingestion (chunking), persistence,
//! and full-text retrieval.
//!
//! Uses SQLite with FTS5 for keyword search when available; falls back to
//! `LIKE` when the linked SQLite build does not include the FTS5 module.
//! Also hosts the per-conversation session documents where the orchestration
//! loop persists tool-result blocks between turns.

pub mod chunk;
pub mod store;

pub use chunk::{chunk_text, DocumentChunk, MAX_CHUNK_CHARS, OVERLAP_CHARS, TARGET_CHUNK_CHARS};
pub use store::KnowledgeBaseStore;
