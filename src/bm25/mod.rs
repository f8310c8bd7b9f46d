//! BM25 lexical relevance scoring.
//!
//! Implements the Okapi BM25 scoring function:
//!
//! ```text
//! score(D, Q) = Σ IDF(q_i) * (f(q_i, D) * (k1 + 1)) / (f(q_i, D) + k1 * (1 - b + b * |D| / avgdl))
//! ```
//!
//! Where:
//! - f(q_i, D) = frequency of query term q_i in document D
//! - |D| = document length (in tokens)
//! - avgdl = average document length in the corpus
//! - k1 = term frequency saturation parameter (default: 1.2)
//! - b = document length normalization parameter (default: 0.75)
//!
//! The statistics here are query-scoped: the [`HybridRanker`](crate::ranker::HybridRanker)
//! rebuilds a [`Bm25Index`] from the current corpus snapshot on every
//! ranking operation and discards it afterwards. Recomputing per query is
//! a deliberate freshness trade-off, not an optimization target, so the
//! index is never persisted.

mod tokenizer;

pub use tokenizer::{Tokenizer, TokenizerConfig};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ============================================================================
// Parameters
// ============================================================================

/// BM25 scoring parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bm25Params {
    /// Term frequency saturation parameter.
    /// Higher values give more weight to term frequency.
    /// Default: 1.2
    #[serde(default = "default_k1")]
    pub k1: f64,

    /// Document length normalization parameter.
    /// 0 = no normalization, 1 = full normalization.
    /// Default: 0.75
    #[serde(default = "default_b")]
    pub b: f64,
}

fn default_k1() -> f64 {
    1.2
}

fn default_b() -> f64 {
    0.75
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: default_k1(),
            b: default_b(),
        }
    }
}

// ============================================================================
// Index
// ============================================================================

/// Query-scoped BM25 statistics over a corpus snapshot.
///
/// Holds per-token document frequencies with per-document term counts,
/// per-document token lengths, corpus size, and the average document
/// length. Scores one document at a time on demand; there is no inverted
/// posting list or top-k search, since the ranker scans every chunk
/// anyway.
#[derive(Debug, Clone)]
pub struct Bm25Index {
    params: Bm25Params,
    tokenizer: Tokenizer,
    /// token -> (document id -> term frequency)
    doc_frequencies: HashMap<String, HashMap<i64, usize>>,
    /// document id -> token count
    doc_lengths: HashMap<i64, usize>,
    corpus_size: usize,
    total_tokens: usize,
}

impl Bm25Index {
    /// Create a new empty index.
    pub fn new(params: Bm25Params, tokenizer_config: TokenizerConfig) -> Self {
        Self {
            params,
            tokenizer: Tokenizer::new(tokenizer_config),
            doc_frequencies: HashMap::new(),
            doc_lengths: HashMap::new(),
            corpus_size: 0,
            total_tokens: 0,
        }
    }

    /// Add one document to the statistics.
    pub fn add_document(&mut self, doc_id: i64, text: &str) {
        let tokens = self.tokenizer.tokenize(text);
        let doc_len = tokens.len();

        for token in tokens {
            *self
                .doc_frequencies
                .entry(token)
                .or_default()
                .entry(doc_id)
                .or_insert(0) += 1;
        }

        self.doc_lengths.insert(doc_id, doc_len);
        self.corpus_size += 1;
        self.total_tokens += doc_len;
    }

    /// Build an index from an iterator of `(doc_id, text)` pairs.
    pub fn build<'a, I>(params: Bm25Params, tokenizer_config: TokenizerConfig, docs: I) -> Self
    where
        I: IntoIterator<Item = (i64, &'a str)>,
    {
        let mut index = Self::new(params, tokenizer_config);
        for (doc_id, text) in docs {
            index.add_document(doc_id, text);
        }
        index
    }

    /// Average document length in tokens (0.0 for an empty corpus).
    pub fn avg_doc_length(&self) -> f64 {
        if self.corpus_size == 0 {
            0.0
        } else {
            self.total_tokens as f64 / self.corpus_size as f64
        }
    }

    /// Number of documents in the corpus.
    pub fn corpus_size(&self) -> usize {
        self.corpus_size
    }

    /// Number of documents containing `token`.
    pub fn document_frequency(&self, token: &str) -> usize {
        self.doc_frequencies.get(token).map_or(0, HashMap::len)
    }

    /// BM25 score of `doc_id` for `query`.
    ///
    /// Zero-score policy (never an error): an empty corpus, an unknown
    /// document id, or a zero average document length all return exactly
    /// `0.0` so the ranker can treat "no lexical signal" uniformly.
    ///
    /// Query tokens are deduplicated: each term contributes once no
    /// matter how often it repeats in the query. The idf uses the
    /// smoothed form `ln((N - n + 0.5)/(n + 0.5) + 1)`, which stays
    /// non-negative even for terms present in every document.
    pub fn score(&self, query: &str, doc_id: i64) -> f64 {
        if self.corpus_size == 0 {
            return 0.0;
        }
        let Some(&doc_len) = self.doc_lengths.get(&doc_id) else {
            return 0.0;
        };
        let avg_doc_len = self.avg_doc_length();
        if avg_doc_len == 0.0 {
            return 0.0;
        }

        let k1 = self.params.k1;
        let b = self.params.b;
        let n_docs = self.corpus_size as f64;
        let mut score = 0.0;

        for token in self.tokenizer.tokenize_unique(query) {
            let postings = self.doc_frequencies.get(&token);
            let n = postings.map_or(0, HashMap::len) as f64;
            let f = postings.and_then(|p| p.get(&doc_id)).copied().unwrap_or(0) as f64;

            let idf = ((n_docs - n + 0.5) / (n + 0.5) + 1.0).ln();
            let denominator = f + k1 * (1.0 - b + b * (doc_len as f64 / avg_doc_len));
            if denominator == 0.0 {
                continue;
            }

            score += idf * f * (k1 + 1.0) / denominator;
        }

        score
    }
}
