//! Hybrid retrieval: BM25 + cosine, fused linearly.
//!
//! Ranking is a two-pass scan over one corpus snapshot. Pass one builds
//! the BM25 statistics; pass two scores every chunk with both signals and
//! fuses them. The snapshot is read exactly once, so a concurrent reindex
//! cannot produce a torn ranking. Both passes walk the snapshot in
//! batches of `scanBatchSize`; pass two scores each batch in parallel.

use std::cmp::Ordering;

use rayon::prelude::*;
use tracing::debug;

use crate::bm25::Bm25Index;
use crate::config::EngineConfig;
use crate::errors::RagError;
use crate::provider::ModelProvider;
use crate::similarity::cosine_similarity;
use crate::store::ChunkStore;
use crate::types::RankedChunk;

/// Scores a corpus snapshot against one query and returns the top-k
/// chunks by hybrid score.
pub struct HybridRanker<'a> {
    config: &'a EngineConfig,
    provider: &'a dyn ModelProvider,
    store: &'a dyn ChunkStore,
}

impl<'a> HybridRanker<'a> {
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

    /// Rank the corpus for `query` and return at most `k` chunks.
    ///
    /// Results are ordered by hybrid score descending; ties break on
    /// ascending chunk id, so equal-scoring corpora rank identically
    /// across runs. An empty corpus yields an empty result, not an
    /// error.
    ///
    /// # Errors
    ///
    /// Fails if the provider cannot embed the query or the store cannot
    /// be read. A chunk with a missing embedding is not an error: its
    /// cosine contribution is zero and its BM25 score still counts.
    pub fn rank(&self, query: &str, k: usize) -> Result<Vec<RankedChunk>, RagError> {
        let embeddings = self.provider.embed(&[query.to_string()])?;
        let query_embedding = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| RagError::EmbeddingFailed {
                reason: "provider returned no vector for the query".to_string(),
            })?;

        let chunks = self.store.list_chunks()?;
        if chunks.is_empty() {
            debug!("ranking skipped: empty corpus");
            return Ok(Vec::new());
        }

        let batch_size = self.config.scan_batch_size;

        // Pass 1: corpus statistics.
        let mut index = Bm25Index::new(self.config.bm25, self.config.tokenizer.clone());
        for batch in chunks.chunks(batch_size) {
            for chunk in batch {
                index.add_document(chunk.id, &chunk.content);
            }
        }

        // Pass 2: per-chunk scoring and fusion.
        let weights = self.config.weights;
        let mut ranked: Vec<RankedChunk> = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(batch_size) {
            let scored: Vec<RankedChunk> = batch
                .par_iter()
                .map(|chunk| {
                    let cosine = cosine_similarity(&query_embedding, &chunk.embedding);
                    let bm25 = index.score(query, chunk.id);
                    RankedChunk {
                        chunk: chunk.clone(),
                        cosine,
                        bm25,
                        hybrid: weights.fuse(cosine, bm25),
                    }
                })
                .collect();
            ranked.extend(scored);
        }

        ranked.sort_by(|a, b| {
            b.hybrid
                .partial_cmp(&a.hybrid)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        ranked.truncate(k);

        debug!(
            corpus_size = index.corpus_size(),
            returned = ranked.len(),
            "ranking complete"
        );
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::chunker::content_hash;
    use crate::provider::Completion;
    use crate::store::MemoryChunkStore;
    use crate::types::{ChunkFields, ChunkKey};

    /// Provider returning canned embeddings by exact text match; unknown
    /// texts get a default vector.
    struct FixedEmbedder {
        embeddings: Mutex<HashMap<String, Vec<f32>>>,
    }

    impl FixedEmbedder {
        fn new(entries: &[(&str, Vec<f32>)]) -> Self {
            Self {
                embeddings: Mutex::new(
                    entries
                        .iter()
                        .map(|(text, v)| (text.to_string(), v.clone()))
                        .collect(),
                ),
            }
        }
    }

    impl ModelProvider for FixedEmbedder {
        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
            let map = self.embeddings.lock().unwrap();
            Ok(texts
                .iter()
                .map(|t| map.get(t).cloned().unwrap_or_else(|| vec![0.0, 1.0]))
                .collect())
        }

        fn complete(&self, _prompt: &str) -> Result<Completion, RagError> {
            Err(RagError::CompletionFailed {
                reason: "not used in ranking tests".to_string(),
            })
        }
    }

    fn seed(store: &MemoryChunkStore, content: &str, embedding: Vec<f32>) -> i64 {
        store
            .upsert_chunk(
                ChunkKey {
                    content_hash: content_hash(content),
                    source_module_id: 1,
                    content_type: "course_summary".to_string(),
                },
                ChunkFields {
                    content: content.to_string(),
                    embedding,
                    title: "T".to_string(),
                    source_module_type: "course".to_string(),
                    activity_id: None,
                },
            )
            .unwrap()
            .id
    }

    #[test]
    fn test_empty_corpus_returns_empty() {
        let store = MemoryChunkStore::new();
        let provider = FixedEmbedder::new(&[("q", vec![1.0, 0.0])]);
        let config = EngineConfig::default();
        let ranker = HybridRanker::new(&config, &provider, &store);
        assert!(ranker.rank("q", 5).unwrap().is_empty());
    }

    #[test]
    fn test_dense_signal_orders_results() {
        // Unit vectors against query [1, 0]: cosines 0.8, 0.2, 0.5. The
        // contents share no terms with the query, so BM25 is zero and the
        // dense signal decides the order.
        let store = MemoryChunkStore::new();
        let a = seed(&store, "alpha", vec![0.8, 0.6]);
        let b = seed(&store, "beta", vec![0.2, 0.979_795_9]);
        let c = seed(&store, "gamma", vec![0.5, 0.866_025_4]);
        let provider = FixedEmbedder::new(&[("query", vec![1.0, 0.0])]);
        let config = EngineConfig::default();
        let ranker = HybridRanker::new(&config, &provider, &store);

        let ranked = ranker.rank("query", 5).unwrap();
        let ids: Vec<i64> = ranked.iter().map(|r| r.chunk.id).collect();
        assert_eq!(ids, vec![a, c, b]);
        assert!((ranked[0].cosine - 0.8).abs() < 1e-6);
        assert!((ranked[0].hybrid - 0.7 * 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_lexical_signal_breaks_dense_tie() {
        let store = MemoryChunkStore::new();
        let matching = seed(&store, "gradient descent convergence", vec![1.0, 0.0]);
        let other = seed(&store, "unrelated cooking recipe", vec![1.0, 0.0]);
        let provider = FixedEmbedder::new(&[("gradient", vec![1.0, 0.0])]);
        let config = EngineConfig::default();
        let ranker = HybridRanker::new(&config, &provider, &store);

        let ranked = ranker.rank("gradient", 5).unwrap();
        assert_eq!(ranked[0].chunk.id, matching);
        assert!(ranked[0].bm25 > 0.0);
        assert_eq!(ranked[1].chunk.id, other);
        assert_eq!(ranked[1].bm25, 0.0);
    }

    #[test]
    fn test_strong_lexical_match_outranks_dense_favorite() {
        // The fusion is unnormalized: a chunk the dense signal dislikes
        // (cosine 0.1) still wins when it matches every query term,
        // because BM25 is unbounded.
        let store = MemoryChunkStore::new();
        let dense_favorite = seed(&store, "unrelated text entirely", vec![0.9, 0.435_889_9]);
        let lexical_match = seed(
            &store,
            "gradient descent convergence rate",
            vec![0.1, 0.994_987_4],
        );
        let provider =
            FixedEmbedder::new(&[("gradient descent convergence rate", vec![1.0, 0.0])]);
        let config = EngineConfig::default();
        let ranker = HybridRanker::new(&config, &provider, &store);

        let ranked = ranker.rank("gradient descent convergence rate", 2).unwrap();
        assert_eq!(ranked[0].chunk.id, lexical_match);
        assert_eq!(ranked[1].chunk.id, dense_favorite);
        assert!(ranked[0].hybrid > ranked[1].hybrid);
        assert!(ranked[0].cosine < ranked[1].cosine);
        assert!(ranked[0].bm25 > 0.0);
    }

    #[test]
    fn test_tie_breaks_on_ascending_id() {
        let store = MemoryChunkStore::new();
        let first = seed(&store, "alpha", vec![1.0, 0.0]);
        let second = seed(&store, "beta", vec![1.0, 0.0]);
        let provider = FixedEmbedder::new(&[("query", vec![1.0, 0.0])]);
        let config = EngineConfig::default();
        let ranker = HybridRanker::new(&config, &provider, &store);

        let ids: Vec<i64> = ranker
            .rank("query", 5)
            .unwrap()
            .iter()
            .map(|r| r.chunk.id)
            .collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[test]
    fn test_top_k_truncation() {
        let store = MemoryChunkStore::new();
        for i in 0..10 {
            seed(&store, &format!("document number {i}"), vec![1.0, 0.0]);
        }
        let provider = FixedEmbedder::new(&[("query", vec![1.0, 0.0])]);
        let config = EngineConfig::default();
        let ranker = HybridRanker::new(&config, &provider, &store);
        assert_eq!(ranker.rank("query", 3).unwrap().len(), 3);
    }

    #[test]
    fn test_missing_embedding_still_bm25_scored() {
        let store = MemoryChunkStore::new();
        let id = seed(&store, "gradient descent", vec![]);
        let provider = FixedEmbedder::new(&[("gradient", vec![1.0, 0.0])]);
        let config = EngineConfig::default();
        let ranker = HybridRanker::new(&config, &provider, &store);

        let ranked = ranker.rank("gradient", 5).unwrap();
        assert_eq!(ranked[0].chunk.id, id);
        assert_eq!(ranked[0].cosine, 0.0);
        assert!(ranked[0].bm25 > 0.0);
        assert!((ranked[0].hybrid - 0.3 * ranked[0].bm25).abs() < 1e-12);
    }

    #[test]
    fn test_batched_scan_matches_single_batch() {
        let store = MemoryChunkStore::new();
        for i in 0..7 {
            seed(&store, &format!("term{i} shared corpus text"), vec![1.0, 0.0]);
        }
        let provider = FixedEmbedder::new(&[("shared", vec![1.0, 0.0])]);

        let whole = EngineConfig::default();
        let tiny = EngineConfig {
            scan_batch_size: 2,
            ..Default::default()
        };

        let a = HybridRanker::new(&whole, &provider, &store)
            .rank("shared", 7)
            .unwrap();
        let b = HybridRanker::new(&tiny, &provider, &store)
            .rank("shared", 7)
            .unwrap();
        let ids_a: Vec<i64> = a.iter().map(|r| r.chunk.id).collect();
        let ids_b: Vec<i64> = b.iter().map(|r| r.chunk.id).collect();
        assert_eq!(ids_a, ids_b);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.hybrid, y.hybrid);
        }
    }
}
