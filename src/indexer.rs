//! Incremental indexing.
//!
//! A reindex run asks the store for every source document modified after
//! the persisted watermark, chunks and embeds them in batches, and
//! upserts the resulting chunks by identity key. The watermark only
//! advances to the run's start time when at least one batch succeeded
//! and none failed, so a partially failed run is retried in full by the
//! next scheduled run.
//!
//! Batch failures are contained: one failed embedding batch is recorded
//! in the report and the run moves on to the next batch. The run itself
//! only errors on store-level failures.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::chunker::{chunk_text, content_hash};
use crate::config::EngineConfig;
use crate::errors::RagError;
use crate::provider::ModelProvider;
use crate::store::ChunkStore;
use crate::types::{ChunkFields, ChunkKey, ReindexReport, SourceDocument};

/// One chunk of a source document, pending embedding and upsert.
struct PendingChunk<'a> {
    doc: &'a SourceDocument,
    content: String,
}

/// Drives incremental reindex runs against a store and provider.
pub struct Indexer<'a> {
    config: &'a EngineConfig,
    provider: &'a dyn ModelProvider,
    store: &'a dyn ChunkStore,
}

impl<'a> Indexer<'a> {
    pub fn new(
        config: &'a EngineConfig,
        provider: &'a dyn ModelProvider,
        store: &'a dyn ChunkStore,
    ) -> Self {
        Self {
            config,
            provider,
            store,
        }
    }

    /// Run one incremental reindex.
    ///
    /// `since` overrides the persisted watermark; pass `None` for a
    /// normal scheduled run. A store with no watermark yet is scanned
    /// from the epoch, i.e. a full first index.
    ///
    /// Returns a report even when batches failed; only store failures
    /// abort the run.
    pub fn reindex(&self, since: Option<DateTime<Utc>>) -> Result<ReindexReport, RagError> {
        let started_at = Utc::now();
        let since = match since {
            Some(explicit) => explicit,
            None => self
                .store
                .load_watermark()?
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        };

        let documents = self.store.source_documents_modified_after(since)?;
        info!(
            since = %since,
            documents = documents.len(),
            "reindex run started"
        );

        let mut report = ReindexReport::default();
        if documents.is_empty() {
            return Ok(report);
        }

        let mut any_batch_ok = false;
        let mut any_batch_failed = false;

        for batch in documents.chunks(self.config.index_batch_size) {
            match self.process_batch(batch) {
                Ok(written) => {
                    report.chunks_written += written;
                    report.sources_processed += batch.len();
                    any_batch_ok = true;
                }
                Err(err) => {
                    warn!(error = %err, "reindex batch failed");
                    report.errors.push(err.to_string());
                    any_batch_failed = true;
                }
            }
        }

        if any_batch_ok && !any_batch_failed {
            self.store.store_watermark(started_at)?;
            report.watermark_advanced = true;
        }

        info!(
            chunks_written = report.chunks_written,
            sources_processed = report.sources_processed,
            failed_batches = report.errors.len(),
            watermark_advanced = report.watermark_advanced,
            "reindex run finished"
        );
        Ok(report)
    }

    /// Chunk, embed, and upsert one batch of source documents. Returns
    /// the number of chunks written.
    fn process_batch(&self, documents: &[SourceDocument]) -> Result<usize, RagError> {
        let mut pending: Vec<PendingChunk<'_>> = Vec::new();
        for doc in documents {
            for chunk in chunk_text(&doc.content, self.config.chunk_size) {
                pending.push(PendingChunk {
                    doc,
                    content: chunk.content,
                });
            }
        }
        if pending.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = pending.iter().map(|p| p.content.clone()).collect();
        let embeddings = self.embed_with_retry(&texts)?;
        if embeddings.len() != pending.len() {
            return Err(RagError::EmbeddingShapeMismatch {
                expected: pending.len(),
                actual: embeddings.len(),
            });
        }

        let mut written = 0;
        for (item, embedding) in pending.into_iter().zip(embeddings) {
            if embedding.is_empty() {
                warn!(
                    source_id = item.doc.id,
                    "provider returned an empty embedding; chunk skipped"
                );
                continue;
            }
            self.store.upsert_chunk(
                ChunkKey {
                    content_hash: content_hash(&item.content),
                    source_module_id: item.doc.id,
                    content_type: item.doc.content_type.clone(),
                },
                ChunkFields {
                    content: item.content,
                    embedding,
                    title: item.doc.title.clone(),
                    source_module_type: item.doc.module_type.clone(),
                    activity_id: item.doc.activity_id,
                },
            )?;
            written += 1;
        }

        debug!(chunks = written, documents = documents.len(), "batch indexed");
        Ok(written)
    }

    /// Embed a batch, retrying transient failures with doubling backoff.
    fn embed_with_retry(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let mut backoff = Duration::from_millis(self.config.embed_backoff_ms);
        let mut last_error = None;

        for attempt in 1..=self.config.embed_attempts {
            match self.provider.embed(texts) {
                Ok(embeddings) => return Ok(embeddings),
                Err(err) => {
                    warn!(
                        attempt,
                        max_attempts = self.config.embed_attempts,
                        error = %err,
                        "embedding batch failed"
                    );
                    last_error = Some(err);
                    if attempt < self.config.embed_attempts {
                        std::thread::sleep(backoff);
                        backoff *= 2;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| RagError::EmbeddingFailed {
            reason: "no embedding attempts were made".to_string(),
        }))
    }
}
