//! RetrievalStore trait — the abstraction over the knowledge base.
//!
//! The orchestration loop treats retrieval as a query→chunks function plus a
//! per-conversation scratch document where each turn's combined tool-result
//! block is persisted, so follow-up turns can retrieve earlier results.

use async_trait::async_trait;

use crate::error::RagError;

/// A chunk of retrieved context, as surfaced to the prompt builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedChunk {
    /// Unique chunk id — used to deduplicate across session and general
    /// retrieval (session chunks take precedence in ordering).
    pub id: String,
    pub title: String,
    pub text: String,
}

#[async_trait]
pub trait RetrievalStore: Send + Sync {
    /// Whether any documents are indexed at all. When false the loop skips
    /// retrieval entirely.
    async fn has_documents(&self) -> bool;

    /// Top-k chunks for a free-text query.
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> std::result::Result<Vec<RetrievedChunk>, RagError>;

    /// All chunks of the session document for a conversation key, in chunk
    /// order. Empty if the conversation has no session document yet.
    async fn retrieve_for_session(
        &self,
        session_key: &str,
    ) -> std::result::Result<Vec<RetrievedChunk>, RagError>;

    /// Replace the session document for a conversation key with the given
    /// tool-result block.
    async fn store_session_results(
        &self,
        session_key: &str,
        content: &str,
    ) -> std::result::Result<(), RagError>;
}
