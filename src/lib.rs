//! # terusrag
//!
//! Hybrid retrieval and ranking engine for retrieval-augmented question
//! answering over a chunked content corpus.
//!
//! Retrieval fuses two signals over the same corpus snapshot: Okapi BM25
//! lexical relevance and cosine similarity between dense embeddings,
//! combined linearly (0.7 dense / 0.3 lexical by default). Answers come
//! back as per-line citations resolved against the store, with an
//! "Unknown Source" sentinel for anything the model failed to attribute.
//!
//! ## Main Types
//!
//! - [`RagEngine`] – the entry point: retrieve, ask, reindex
//! - [`EngineConfig`] – validated configuration with serde defaults
//! - [`ChunkStore`] – storage boundary, with [`MemoryChunkStore`] as the
//!   in-memory reference implementation
//! - [`ModelProvider`] – embedding and completion backend
//! - [`RagError`] – domain-specific error type
//!
//! ## Modules
//!
//! - [`bm25`] – Okapi BM25 statistics and scoring
//! - [`similarity`] – cosine similarity primitive
//! - [`chunker`] – codepoint-bounded chunking and content hashing
//! - [`ranker`] – the two-pass hybrid ranking scan
//! - [`prompt`] – prompt assembly and optional query optimization
//! - [`answer`] – bracketed-marker citation parsing
//! - [`indexer`] – watermark-driven incremental indexing
//! - [`engine`] – the [`RagEngine`] facade
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use terusrag::{EngineConfig, MemoryChunkStore, RagEngine};
//!
//! let store = Arc::new(MemoryChunkStore::new());
//! let engine = RagEngine::new(EngineConfig::default(), provider, store)?;
//!
//! engine.reindex(None)?;
//! let response = engine.ask("What does the course cover?")?;
//! for citation in response.grounded_citations() {
//!     println!("[{}] {}", citation.id, citation.content);
//! }
//! ```

// Modules
pub mod answer;
pub mod bm25;
pub mod chunker;
pub mod config;
pub mod engine;
pub mod errors;
pub mod indexer;
pub mod prompt;
pub mod provider;
pub mod ranker;
pub mod similarity;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use answer::AnswerParser;
pub use bm25::{Bm25Index, Bm25Params, Tokenizer, TokenizerConfig};
pub use chunker::{chunk_text, content_hash, TextChunk};
pub use config::{EngineConfig, HybridWeights, ProviderKind};
pub use engine::RagEngine;
pub use errors::RagError;
pub use indexer::Indexer;
pub use provider::{Completion, ModelProvider};
pub use ranker::HybridRanker;
pub use similarity::cosine_similarity;
pub use store::{ChunkStore, MemoryChunkStore};
pub use types::{
    Chunk, ChunkFields, ChunkKey, Citation, RagResponse, RankedChunk, ReindexReport,
    ResolvedSource, SourceDocument, UNKNOWN_SOURCE_TITLE,
};
