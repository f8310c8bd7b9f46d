//! Common types shared across the engine: persisted chunks, ranking
//! results, citations, and reindex reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Chunks
// ============================================================================

/// A persisted content chunk: the unit of indexing and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Stable integer identity, assigned by the store on first insert.
    pub id: i64,
    /// Chunk content, bounded by the configured chunk size.
    pub content: String,
    /// Dense embedding vector. Empty only transiently (before the first
    /// successful embedding); an empty vector scores zero cosine and the
    /// chunk is still BM25-scored.
    #[serde(default)]
    pub embedding: Vec<f32>,
    /// Deterministic hash of `content` (lowercase hex).
    pub content_hash: String,
    /// Identifier of the owning source document (e.g. a course id).
    pub source_module_id: i64,
    /// Category of the owning source, e.g. "course", "page", "forum".
    pub source_module_type: String,
    /// Finer content tag, e.g. "course_summary", "page_content".
    pub content_type: String,
    /// Display name of the owning source.
    pub title: String,
    /// Optional finer-grained sub-identifier (e.g. an activity id).
    pub activity_id: Option<i64>,
    /// When the chunk row was first inserted.
    pub created_at: DateTime<Utc>,
    /// When the chunk row was last updated.
    pub updated_at: DateTime<Utc>,
}

/// The upsert identity of a chunk.
///
/// `(contentHash, sourceModuleId, contentType)` is unique: re-indexing
/// the same content for the same source and content type updates the
/// existing row in place, never duplicates it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkKey {
    /// Deterministic hash of the chunk content.
    pub content_hash: String,
    /// Identifier of the owning source document.
    pub source_module_id: i64,
    /// Finer content tag.
    pub content_type: String,
}

/// The writable fields of a chunk, passed to an upsert alongside its
/// [`ChunkKey`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkFields {
    /// Chunk content.
    pub content: String,
    /// Dense embedding vector.
    pub embedding: Vec<f32>,
    /// Display name of the owning source.
    pub title: String,
    /// Category of the owning source.
    pub source_module_type: String,
    /// Optional sub-identifier.
    pub activity_id: Option<i64>,
}

// ============================================================================
// Source documents
// ============================================================================

/// A source document from the hosting system's content catalog, as seen
/// by the incremental indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDocument {
    /// Identifier of the source (becomes `sourceModuleId` on its chunks).
    pub id: i64,
    /// Display name.
    pub title: String,
    /// Full text content, chunked at index time.
    pub content: String,
    /// Category of the source, e.g. "course".
    pub module_type: String,
    /// Content tag applied to the chunks, e.g. "course_summary".
    pub content_type: String,
    /// Optional sub-identifier.
    pub activity_id: Option<i64>,
    /// Last modification time, compared against the watermark.
    pub modified_at: DateTime<Utc>,
}

/// A resolved source reference: human-readable title plus a view URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSource {
    /// Display title of the source.
    pub title: String,
    /// URL pointing at the source.
    pub url: String,
}

// ============================================================================
// Ranking results
// ============================================================================

/// A chunk scored by the hybrid ranker, with its component scores.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedChunk {
    /// The scored chunk, with full metadata so callers can build
    /// attribution without a second round trip.
    pub chunk: Chunk,
    /// Cosine similarity of the query and chunk embeddings.
    pub cosine: f64,
    /// BM25 score of the chunk for the query.
    pub bm25: f64,
    /// `weights.cosine * cosine + weights.bm25 * bm25`.
    pub hybrid: f64,
}

// ============================================================================
// Citations
// ============================================================================

/// Display title of the sentinel citation for unresolvable sources.
pub const UNKNOWN_SOURCE_TITLE: &str = "Unknown Source";

/// A structured, source-attributed fragment of a generated answer.
///
/// `id == 0` with `view_url == None` is the "Unknown Source" sentinel.
/// The parser never drops sentinels; filtering them is caller policy
/// (see [`Citation::is_grounded`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    /// Store identity of the cited chunk, or 0 when unresolved.
    pub id: i64,
    /// Resolved source title, or [`UNKNOWN_SOURCE_TITLE`].
    pub title: String,
    /// The answer line with its marker stripped.
    pub content: String,
    /// Resolved view URL, or `None` when the source is unknown or has
    /// no addressable location.
    pub view_url: Option<String>,
}

impl Citation {
    /// The "Unknown Source" sentinel for a line that could not be
    /// attributed.
    pub fn unknown(content: impl Into<String>) -> Self {
        Self {
            id: 0,
            title: UNKNOWN_SOURCE_TITLE.to_string(),
            content: content.into(),
            view_url: None,
        }
    }

    /// Whether this citation resolved to a known source.
    pub fn is_grounded(&self) -> bool {
        self.id != 0
    }
}

/// The end-to-end response returned to the outermost caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagResponse {
    /// Per-line citations, sentinels included.
    pub answer: Vec<Citation>,
    /// Tokens consumed by the prompt.
    pub prompt_token_count: u64,
    /// Tokens produced by the completion.
    pub response_token_count: u64,
    /// Total tokens for the call.
    pub total_token_count: u64,
}

impl RagResponse {
    /// The citations that resolved to a known source, for callers that
    /// only want grounded attribution.
    pub fn grounded_citations(&self) -> impl Iterator<Item = &Citation> {
        self.answer.iter().filter(|c| c.is_grounded())
    }
}

// ============================================================================
// Reindex results
// ============================================================================

/// Outcome of one incremental reindex run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReindexReport {
    /// Chunks upserted into the store.
    pub chunks_written: usize,
    /// Source documents whose batches completed.
    pub sources_processed: usize,
    /// Per-batch and per-chunk failures. A non-empty list with
    /// `watermark_advanced == false` means the next scheduled run will
    /// retry from the previous watermark.
    pub errors: Vec<String>,
    /// Whether the watermark was advanced to this run's start time.
    pub watermark_advanced: bool,
}
