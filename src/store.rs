//! Corpus store adapter.
//!
//! [`ChunkStore`] is the boundary to the hosting application's storage:
//! a simple relational table of chunks plus a content catalog. The engine
//! only needs a handful of operations; anything resembling a real
//! inverted index or vector database is explicitly out of scope.
//!
//! Ranking reads a full snapshot through [`ChunkStore::list_chunks`] and
//! iterates it twice (BM25 statistics, then scoring), so implementations
//! must return a consistent snapshot per call; a materialized copy is
//! fine. Writes go through [`ChunkStore::upsert_chunk`], keyed by the
//! `(contentHash, sourceModuleId, contentType)` identity, which makes
//! reindexing idempotent and lets readers and the indexer run without
//! explicit locking.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::errors::RagError;
use crate::types::{Chunk, ChunkFields, ChunkKey, ResolvedSource, SourceDocument};

// ============================================================================
// Trait
// ============================================================================

/// Storage boundary for chunks, source documents, and the reindex
/// watermark.
pub trait ChunkStore: Send + Sync {
    /// All chunks, ordered by ascending id. One call returns one
    /// consistent snapshot.
    fn list_chunks(&self) -> Result<Vec<Chunk>, RagError>;

    /// Insert or update a chunk by its identity key. Returns the stored
    /// row, with its id assigned on first insert.
    fn upsert_chunk(&self, key: ChunkKey, fields: ChunkFields) -> Result<Chunk, RagError>;

    /// Look up a chunk by store id.
    fn chunk_by_id(&self, id: i64) -> Result<Option<Chunk>, RagError>;

    /// Source documents modified strictly after `since`.
    fn source_documents_modified_after(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<SourceDocument>, RagError>;

    /// Resolve a source to a title and view URL.
    ///
    /// When `activity_id` is given, implementations should prefer the
    /// activity-level resource; the caller falls back to a module-level
    /// resolution (`activity_id = None`) itself if this returns `None`.
    fn resolve_source(
        &self,
        source_module_id: i64,
        activity_id: Option<i64>,
    ) -> Result<Option<ResolvedSource>, RagError>;

    /// The timestamp of the last successful reindex run, if any.
    fn load_watermark(&self) -> Result<Option<DateTime<Utc>>, RagError>;

    /// Persist the reindex watermark.
    fn store_watermark(&self, watermark: DateTime<Utc>) -> Result<(), RagError>;
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Default)]
struct MemoryState {
    chunks: Vec<Chunk>,
    next_id: i64,
    sources: Vec<SourceDocument>,
    catalog: HashMap<(i64, Option<i64>), ResolvedSource>,
    watermark: Option<DateTime<Utc>>,
}

/// In-memory [`ChunkStore`] backed by a `Vec` under a mutex.
///
/// The reference implementation used by the test suite and suitable for
/// corpora that fit in memory. Ids are assigned monotonically starting
/// at 1; an upsert on an existing identity key updates the row in place.
#[derive(Default)]
pub struct MemoryChunkStore {
    state: Mutex<MemoryState>,
}

impl MemoryChunkStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source document for the indexer to pick up.
    pub fn add_source_document(&self, doc: SourceDocument) {
        self.state.lock().expect("store poisoned").sources.push(doc);
    }

    /// Register a catalog entry resolving `(source_module_id, activity_id)`
    /// to a title and URL. Use `activity_id = None` for the module-level
    /// entry.
    pub fn register_source(
        &self,
        source_module_id: i64,
        activity_id: Option<i64>,
        resolved: ResolvedSource,
    ) {
        self.state
            .lock()
            .expect("store poisoned")
            .catalog
            .insert((source_module_id, activity_id), resolved);
    }

    /// Number of stored chunks.
    pub fn chunk_count(&self) -> usize {
        self.state.lock().expect("store poisoned").chunks.len()
    }
}

impl ChunkStore for MemoryChunkStore {
    fn list_chunks(&self) -> Result<Vec<Chunk>, RagError> {
        let state = self.state.lock().expect("store poisoned");
        let mut chunks = state.chunks.clone();
        chunks.sort_by_key(|c| c.id);
        Ok(chunks)
    }

    fn upsert_chunk(&self, key: ChunkKey, fields: ChunkFields) -> Result<Chunk, RagError> {
        let mut state = self.state.lock().expect("store poisoned");
        let now = Utc::now();

        let existing = state.chunks.iter_mut().find(|c| {
            c.content_hash == key.content_hash
                && c.source_module_id == key.source_module_id
                && c.content_type == key.content_type
        });

        if let Some(chunk) = existing {
            chunk.content = fields.content;
            chunk.embedding = fields.embedding;
            chunk.title = fields.title;
            chunk.source_module_type = fields.source_module_type;
            chunk.activity_id = fields.activity_id;
            chunk.updated_at = now;
            return Ok(chunk.clone());
        }

        state.next_id += 1;
        let chunk = Chunk {
            id: state.next_id,
            content: fields.content,
            embedding: fields.embedding,
            content_hash: key.content_hash,
            source_module_id: key.source_module_id,
            source_module_type: fields.source_module_type,
            content_type: key.content_type,
            title: fields.title,
            activity_id: fields.activity_id,
            created_at: now,
            updated_at: now,
        };
        state.chunks.push(chunk.clone());
        Ok(chunk)
    }

    fn chunk_by_id(&self, id: i64) -> Result<Option<Chunk>, RagError> {
        let state = self.state.lock().expect("store poisoned");
        Ok(state.chunks.iter().find(|c| c.id == id).cloned())
    }

    fn source_documents_modified_after(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<SourceDocument>, RagError> {
        let state = self.state.lock().expect("store poisoned");
        Ok(state
            .sources
            .iter()
            .filter(|d| d.modified_at > since)
            .cloned()
            .collect())
    }

    fn resolve_source(
        &self,
        source_module_id: i64,
        activity_id: Option<i64>,
    ) -> Result<Option<ResolvedSource>, RagError> {
        let state = self.state.lock().expect("store poisoned");
        Ok(state.catalog.get(&(source_module_id, activity_id)).cloned())
    }

    fn load_watermark(&self) -> Result<Option<DateTime<Utc>>, RagError> {
        Ok(self.state.lock().expect("store poisoned").watermark)
    }

    fn store_watermark(&self, watermark: DateTime<Utc>) -> Result<(), RagError> {
        self.state.lock().expect("store poisoned").watermark = Some(watermark);
        Ok(())
    }
}
