//! SQLite-backed knowledge base with FTS5 full-text search.
//!
//! Two tables:
//! - `documents` — one row per ingested document
//! - `chunks` — the retrievable units, kept in sync with an FTS5
//!   external-content virtual table via triggers
//!
//! Availability of FTS5 is probed at migration time; when the linked SQLite
//! lacks the module the store degrades to `LIKE` matching at runtime.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use hearth_core::error::RagError;
use hearth_core::retrieval::{RetrievalStore, RetrievedChunk};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

use crate::chunk::{chunk_text, DocumentChunk};

pub struct KnowledgeBaseStore {
    pool: SqlitePool,
    fts5_available: AtomicBool,
}

impl KnowledgeBaseStore {
    /// Open (or create) the knowledge base at the given path.
    /// Pass `":memory:"` for an in-process ephemeral database (tests).
    pub async fn new(path: &str) -> Result<Self, RagError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| RagError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // One connection: keeps `:memory:` databases coherent and the store
        // is single-conversation-writer anyway.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| RagError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self {
            pool,
            fts5_available: AtomicBool::new(true),
        };
        store.run_migrations().await?;
        info!("Knowledge base initialized at {path}");
        Ok(store)
    }

    pub fn fts5_available(&self) -> bool {
        self.fts5_available.load(Ordering::Relaxed)
    }

    fn disable_fts5(&self) {
        self.fts5_available.store(false, Ordering::Relaxed);
    }

    /// The id of the per-conversation session document for a chat key.
    pub fn session_document_id(session_key: &str) -> String {
        let mut hasher = DefaultHasher::new();
        session_key.hash(&mut hasher);
        format!("session_{:x}", hasher.finish() & 0x7FFF_FFFF)
    }

    async fn run_migrations(&self) -> Result<(), RagError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                id       TEXT PRIMARY KEY,
                path     TEXT NOT NULL,
                title    TEXT NOT NULL,
                added_at REAL NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RagError::MigrationFailed(format!("documents table: {e}")))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chunks (
                id          TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                source      TEXT NOT NULL,
                title       TEXT NOT NULL,
                text        TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RagError::MigrationFailed(format!("chunks table: {e}")))?;

        // Probe for the FTS5 module before creating anything that needs it.
        if sqlx::query("SELECT fts5_version()")
            .fetch_one(&self.pool)
            .await
            .is_err()
        {
            warn!("SQLite build has no FTS5 module; falling back to LIKE retrieval");
            self.disable_fts5();
            return Ok(());
        }

        let fts_statements = [
            "CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts USING fts5(
                text, content='chunks', content_rowid='rowid'
            )",
            "CREATE TRIGGER IF NOT EXISTS chunks_ai AFTER INSERT ON chunks BEGIN
                INSERT INTO chunks_fts(rowid, text) VALUES (new.rowid, new.text);
            END",
            "CREATE TRIGGER IF NOT EXISTS chunks_ad AFTER DELETE ON chunks BEGIN
                INSERT INTO chunks_fts(chunks_fts, rowid, text)
                VALUES ('delete', old.rowid, old.text);
            END",
        ];
        for statement in fts_statements {
            if let Err(e) = sqlx::query(statement).execute(&self.pool).await {
                warn!("FTS5 setup failed, disabling: {e}");
                self.disable_fts5();
                return Ok(());
            }
        }
        debug!("Knowledge base migrations complete");
        Ok(())
    }

    /// Add a document: chunk and index. Overwrites if the id exists.
    pub async fn add_document(
        &self,
        document_id: &str,
        path: &str,
        title: &str,
        text: &str,
    ) -> Result<(), RagError> {
        self.remove_document(document_id).await?;

        let added_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        sqlx::query("INSERT OR REPLACE INTO documents (id, path, title, added_at) VALUES (?, ?, ?, ?)")
            .bind(document_id)
            .bind(path)
            .bind(title)
            .bind(added_at)
            .execute(&self.pool)
            .await
            .map_err(|e| RagError::Storage(format!("insert document: {e}")))?;

        for (index, chunk) in chunk_text(text) {
            let chunk_id = format!("{document_id}_{index}");
            sqlx::query(
                "INSERT INTO chunks (id, document_id, chunk_index, source, title, text)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&chunk_id)
            .bind(document_id)
            .bind(index as i64)
            .bind(path)
            .bind(title)
            .bind(&chunk)
            .execute(&self.pool)
            .await
            .map_err(|e| RagError::Storage(format!("insert chunk: {e}")))?;
        }
        Ok(())
    }

    pub async fn remove_document(&self, document_id: &str) -> Result<(), RagError> {
        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(|e| RagError::Storage(format!("delete chunks: {e}")))?;
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(|e| RagError::Storage(format!("delete document: {e}")))?;
        Ok(())
    }

    /// Retrieve top-K chunks: FTS5 when available, then `LIKE` fallback.
    pub async fn retrieve_chunks(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<DocumentChunk>, RagError> {
        let trimmed = query.trim();
        if trimmed.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        if self.fts5_available() {
            match self.retrieve_fts5(trimmed, top_k).await {
                Ok(chunks) if !chunks.is_empty() => return Ok(chunks),
                Ok(_) => {}
                Err(e) => {
                    if e.to_string().contains("no such table") {
                        self.disable_fts5();
                    }
                    debug!("FTS5 retrieval failed, using fallback: {e}");
                }
            }
        }
        self.retrieve_like(trimmed, top_k).await
    }

    async fn retrieve_fts5(&self, query: &str, top_k: usize) -> Result<Vec<DocumentChunk>, RagError> {
        let escaped = query.replace('"', "\"\"");
        let rows = sqlx::query(
            "SELECT c.id, c.document_id, c.source, c.title, c.chunk_index, c.text
             FROM chunks c
             WHERE c.rowid IN (SELECT rowid FROM chunks_fts WHERE chunks_fts MATCH ? LIMIT ?)",
        )
        .bind(&escaped)
        .bind(top_k as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RagError::QueryFailed(e.to_string()))?;
        rows.iter().map(Self::row_to_chunk).collect()
    }

    async fn retrieve_like(&self, query: &str, top_k: usize) -> Result<Vec<DocumentChunk>, RagError> {
        let like = format!("%{query}%");
        let rows = sqlx::query(
            "SELECT id, document_id, source, title, chunk_index, text
             FROM chunks WHERE text LIKE ? LIMIT ?",
        )
        .bind(&like)
        .bind(top_k as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RagError::QueryFailed(e.to_string()))?;
        rows.iter().map(Self::row_to_chunk).collect()
    }

    /// All chunks of one document, in chunk order.
    pub async fn chunks_for_document(
        &self,
        document_id: &str,
    ) -> Result<Vec<DocumentChunk>, RagError> {
        let rows = sqlx::query(
            "SELECT id, document_id, source, title, chunk_index, text
             FROM chunks WHERE document_id = ? ORDER BY chunk_index",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RagError::QueryFailed(e.to_string()))?;
        rows.iter().map(Self::row_to_chunk).collect()
    }

    pub async fn document_count(&self) -> Result<i64, RagError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM documents")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RagError::QueryFailed(e.to_string()))?;
        row.try_get("n")
            .map_err(|e| RagError::QueryFailed(e.to_string()))
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> Result<DocumentChunk, RagError> {
        let get = |col: &str| -> Result<String, RagError> {
            row.try_get::<String, _>(col)
                .map_err(|e| RagError::QueryFailed(format!("{col} column: {e}")))
        };
        let chunk_index: i64 = row
            .try_get("chunk_index")
            .map_err(|e| RagError::QueryFailed(format!("chunk_index column: {e}")))?;
        Ok(DocumentChunk {
            id: get("id")?,
            document_id: get("document_id")?,
            source: get("source")?,
            title: get("title")?,
            chunk_index: chunk_index as usize,
            text: get("text")?,
        })
    }
}

#[async_trait]
impl RetrievalStore for KnowledgeBaseStore {
    async fn has_documents(&self) -> bool {
        self.document_count().await.map(|n| n > 0).unwrap_or(false)
    }

    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>, RagError> {
        Ok(self
            .retrieve_chunks(query, top_k)
            .await?
            .into_iter()
            .map(to_retrieved)
            .collect())
    }

    async fn retrieve_for_session(
        &self,
        session_key: &str,
    ) -> Result<Vec<RetrievedChunk>, RagError> {
        let document_id = Self::session_document_id(session_key);
        Ok(self
            .chunks_for_document(&document_id)
            .await?
            .into_iter()
            .map(to_retrieved)
            .collect())
    }

    async fn store_session_results(
        &self,
        session_key: &str,
        content: &str,
    ) -> Result<(), RagError> {
        let document_id = Self::session_document_id(session_key);
        self.add_document(&document_id, "", "Session", content).await
    }
}

fn to_retrieved(chunk: DocumentChunk) -> RetrievedChunk {
    RetrievedChunk {
        id: chunk.id,
        title: chunk.title,
        text: chunk.text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_store() -> KnowledgeBaseStore {
        KnowledgeBaseStore::new(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn add_and_retrieve_document() {
        let store = open_store().await;
        store
            .add_document(
                "doc1",
                "/docs/rust.md",
                "Rust",
                "Rust is a systems programming language focused on safety.",
            )
            .await
            .unwrap();

        assert!(store.has_documents().await);
        let chunks = store.retrieve_chunks("systems", 5).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].document_id, "doc1");
        assert_eq!(chunks[0].title, "Rust");
    }

    #[tokio::test]
    async fn empty_store_has_no_documents() {
        let store = open_store().await;
        assert!(!store.has_documents().await);
        assert!(store.retrieve_chunks("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_document_overwrites_by_id() {
        let store = open_store().await;
        store
            .add_document("doc1", "", "First", "original text about otters")
            .await
            .unwrap();
        store
            .add_document("doc1", "", "Second", "replacement text about beavers")
            .await
            .unwrap();

        assert!(store.retrieve_chunks("otters", 5).await.unwrap().is_empty());
        let chunks = store.retrieve_chunks("beavers", 5).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].title, "Second");
        assert_eq!(store.document_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn remove_document_clears_chunks() {
        let store = open_store().await;
        store
            .add_document("doc1", "", "Doc", "searchable content here")
            .await
            .unwrap();
        store.remove_document("doc1").await.unwrap();
        assert!(!store.has_documents().await);
        assert!(store
            .retrieve_chunks("searchable", 5)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn long_document_chunks_in_order() {
        let store = open_store().await;
        let text = format!("{}\n\n{}", "alpha ".repeat(300), "omega ".repeat(300));
        store.add_document("doc1", "", "Long", &text).await.unwrap();

        let chunks = store.chunks_for_document("doc1").await.unwrap();
        assert!(chunks.len() >= 2);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
        }
    }

    #[tokio::test]
    async fn session_results_round_trip() {
        let store = open_store().await;
        store
            .store_session_results("/chats/one.md", "Result of get_plan: Current plan: …")
            .await
            .unwrap();

        let chunks = store.retrieve_for_session("/chats/one.md").await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("Result of get_plan"));
        assert_eq!(chunks[0].title, "Session");

        // A different conversation sees nothing.
        assert!(store
            .retrieve_for_session("/chats/two.md")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn session_results_keep_only_latest_block() {
        let store = open_store().await;
        store
            .store_session_results("/chats/one.md", "first block")
            .await
            .unwrap();
        store
            .store_session_results("/chats/one.md", "second block")
            .await
            .unwrap();

        let chunks = store.retrieve_for_session("/chats/one.md").await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "second block");
    }

    #[test]
    fn session_document_id_is_stable_and_distinct() {
        let a1 = KnowledgeBaseStore::session_document_id("/chats/a.md");
        let a2 = KnowledgeBaseStore::session_document_id("/chats/a.md");
        let b = KnowledgeBaseStore::session_document_id("/chats/b.md");
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        assert!(a1.starts_with("session_"));
    }
}
