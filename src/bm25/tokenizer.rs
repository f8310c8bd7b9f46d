//! Word-boundary tokenizer for BM25.
//!
//! Document and query tokens must come from the same pipeline so they
//! align at scoring time. The tokenizer is case-sensitive by default and
//! does no stemming or stop-word removal; lowercasing is an opt-in flag
//! for corpora where queries and documents disagree on casing.

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Tokenizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizerConfig {
    /// Lowercase tokens before counting.
    /// Default: false (case-sensitive, matching the corpus's own text).
    #[serde(default = "default_lowercase")]
    pub lowercase: bool,

    /// Minimum token length to include.
    /// Default: 1 (every word counts toward document length).
    #[serde(default = "default_min_token_length")]
    pub min_token_length: usize,
}

fn default_lowercase() -> bool {
    false
}

fn default_min_token_length() -> usize {
    1
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            lowercase: default_lowercase(),
            min_token_length: default_min_token_length(),
        }
    }
}

/// Unicode word-boundary tokenizer.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    config: TokenizerConfig,
}

impl Tokenizer {
    /// Create a new tokenizer with the given configuration.
    pub fn new(config: TokenizerConfig) -> Self {
        Self { config }
    }

    /// Tokenize text into a vector of tokens.
    ///
    /// Uses Unicode word segmentation, so punctuation is dropped and
    /// multi-byte scripts segment correctly.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.unicode_words()
            .filter(|word| word.chars().count() >= self.config.min_token_length)
            .map(|word| {
                if self.config.lowercase {
                    word.to_lowercase()
                } else {
                    word.to_string()
                }
            })
            .collect()
    }

    /// Tokenize a query and deduplicate tokens, preserving first-occurrence
    /// order so score summation stays deterministic.
    pub fn tokenize_unique(&self, text: &str) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.tokenize(text)
            .into_iter()
            .filter(|token| seen.insert(token.clone()))
            .collect()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(TokenizerConfig::default())
    }
}
