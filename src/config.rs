//! Engine configuration.
//!
//! Everything is an explicit [`EngineConfig`] value handed to
//! [`RagEngine::new`](crate::engine::RagEngine::new); nothing is read
//! from ambient settings or globals, and every field has a serde
//! default so partial JSON configs deserialize cleanly.

use serde::{Deserialize, Serialize};

use crate::bm25::{Bm25Params, TokenizerConfig};
use crate::errors::RagError;

// ============================================================================
// Provider selection
// ============================================================================

/// Which model provider the engine is wired to.
///
/// Selection only: the HTTP clients behind
/// [`ModelProvider`](crate::provider::ModelProvider) live outside the
/// engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Gemini-style API.
    Gemini,
    /// OpenAI-style API.
    OpenAi,
    /// Ollama-style local API.
    Ollama,
}

impl Default for ProviderKind {
    fn default() -> Self {
        ProviderKind::Gemini
    }
}

// ============================================================================
// Hybrid weighting
// ============================================================================

/// Weights for the linear fusion of cosine and BM25 scores.
///
/// The combination is deliberately unnormalized: BM25 is unbounded while
/// cosine stays in `[-1, 1]`, so a strong lexical match can dominate.
/// That is a documented property of the design, not a defect.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridWeights {
    /// Weight of the dense (cosine) score. Default: 0.7
    #[serde(default = "default_cosine_weight")]
    pub cosine: f64,

    /// Weight of the lexical (BM25) score. Default: 0.3
    #[serde(default = "default_bm25_weight")]
    pub bm25: f64,
}

fn default_cosine_weight() -> f64 {
    0.7
}

fn default_bm25_weight() -> f64 {
    0.3
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            cosine: default_cosine_weight(),
            bm25: default_bm25_weight(),
        }
    }
}

impl HybridWeights {
    /// Fuse a cosine score and a BM25 score into a hybrid score.
    pub fn fuse(&self, cosine: f64, bm25: f64) -> f64 {
        self.cosine * cosine + self.bm25 * bm25
    }
}

// ============================================================================
// Engine configuration
// ============================================================================

/// Configuration for the retrieval engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Active model provider.
    #[serde(default)]
    pub provider: ProviderKind,

    /// Maximum chunk size in codepoints. Default: 512
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Number of chunks returned by ranking. Default: 5
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Hybrid score fusion weights.
    #[serde(default)]
    pub weights: HybridWeights,

    /// BM25 scoring parameters.
    #[serde(default)]
    pub bm25: Bm25Params,

    /// BM25 tokenizer configuration, shared by documents and queries.
    #[serde(default)]
    pub tokenizer: TokenizerConfig,

    /// Rewrite the user question before retrieval. Default: false
    #[serde(default)]
    pub prompt_optimization: bool,

    /// System prompt prepended to every completion request.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Chunks scanned per batch during ranking. Default: 500
    #[serde(default = "default_scan_batch_size")]
    pub scan_batch_size: usize,

    /// Source documents embedded per batch during reindexing. Default: 100
    #[serde(default = "default_index_batch_size")]
    pub index_batch_size: usize,

    /// Attempts per embedding batch during reindexing. Default: 3
    #[serde(default = "default_embed_attempts")]
    pub embed_attempts: u32,

    /// Initial backoff between embedding retries, in milliseconds;
    /// doubles per attempt. Default: 500
    #[serde(default = "default_embed_backoff_ms")]
    pub embed_backoff_ms: u64,
}

fn default_chunk_size() -> usize {
    512
}

fn default_top_k() -> usize {
    5
}

fn default_system_prompt() -> String {
    "You are a helpful assistant answering questions about course materials. \
     Answer using only the provided context. Start each line of your answer \
     with the bracketed source id of the context entry it is based on, for \
     example: [42] The course covers linear algebra."
        .to_string()
}

fn default_scan_batch_size() -> usize {
    500
}

fn default_index_batch_size() -> usize {
    100
}

fn default_embed_attempts() -> u32 {
    3
}

fn default_embed_backoff_ms() -> u64 {
    500
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            chunk_size: default_chunk_size(),
            top_k: default_top_k(),
            weights: HybridWeights::default(),
            bm25: Bm25Params::default(),
            tokenizer: TokenizerConfig::default(),
            prompt_optimization: false,
            system_prompt: default_system_prompt(),
            scan_batch_size: default_scan_batch_size(),
            index_batch_size: default_index_batch_size(),
            embed_attempts: default_embed_attempts(),
            embed_backoff_ms: default_embed_backoff_ms(),
        }
    }
}

impl EngineConfig {
    /// Validate the configuration, returning warnings for questionable values.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `chunkSize`, `topK`, `scanBatchSize`, or `indexBatchSize` is 0
    /// - `embedAttempts` is 0
    /// - a fusion weight is negative
    /// - `bm25.k1` is negative or `bm25.b` is outside `[0, 1]`
    ///
    /// # Warnings
    ///
    /// - fusion weights not summing to 1.0 (valid, but the scores drift
    ///   away from the documented 0.7/0.3 behavior)
    pub fn validate(&self) -> Result<Vec<String>, RagError> {
        let mut warnings = Vec::new();

        if self.chunk_size == 0 {
            return Err(RagError::InvalidConfiguration {
                message: "chunkSize must be positive".to_string(),
                hint: "Set chunkSize to at least 1 (recommended: 512)".to_string(),
            });
        }
        if self.top_k == 0 {
            return Err(RagError::InvalidConfiguration {
                message: "topK must be positive".to_string(),
                hint: "Set topK to at least 1 (recommended: 5)".to_string(),
            });
        }
        if self.scan_batch_size == 0 {
            return Err(RagError::InvalidConfiguration {
                message: "scanBatchSize must be positive".to_string(),
                hint: "Set scanBatchSize to at least 1 (recommended: 500)".to_string(),
            });
        }
        if self.index_batch_size == 0 {
            return Err(RagError::InvalidConfiguration {
                message: "indexBatchSize must be positive".to_string(),
                hint: "Set indexBatchSize to at least 1 (recommended: 100)".to_string(),
            });
        }
        if self.embed_attempts == 0 {
            return Err(RagError::InvalidConfiguration {
                message: "embedAttempts must be positive".to_string(),
                hint: "Set embedAttempts to at least 1 (recommended: 3)".to_string(),
            });
        }
        if self.weights.cosine < 0.0 {
            return Err(RagError::InvalidConfiguration {
                message: "weights.cosine cannot be negative".to_string(),
                hint: "Set weights.cosine to 0.0 or higher (recommended: 0.7)".to_string(),
            });
        }
        if self.weights.bm25 < 0.0 {
            return Err(RagError::InvalidConfiguration {
                message: "weights.bm25 cannot be negative".to_string(),
                hint: "Set weights.bm25 to 0.0 or higher (recommended: 0.3)".to_string(),
            });
        }
        if self.bm25.k1 < 0.0 {
            return Err(RagError::InvalidConfiguration {
                message: "bm25.k1 cannot be negative".to_string(),
                hint: "Set bm25.k1 to 0.0 or higher (recommended: 1.2)".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.bm25.b) {
            return Err(RagError::InvalidConfiguration {
                message: "bm25.b must be within [0, 1]".to_string(),
                hint: "Set bm25.b between 0.0 and 1.0 (recommended: 0.75)".to_string(),
            });
        }

        let weight_sum = self.weights.cosine + self.weights.bm25;
        if (weight_sum - 1.0).abs() > 0.01 {
            warnings.push(format!(
                "fusion weights sum to {} (cosine={}, bm25={}); weights summing to 1.0 \
                 are recommended",
                weight_sum, self.weights.cosine, self.weights.bm25
            ));
        }

        Ok(warnings)
    }
}
