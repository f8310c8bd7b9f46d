//! Model provider abstraction.
//!
//! The engine talks to exactly one [`ModelProvider`] for both embeddings
//! and completions. Transport, authentication, and endpoint wiring live
//! behind the trait; the engine only sees vectors and text.

use serde::{Deserialize, Serialize};

use crate::errors::RagError;

/// A completion produced by the active provider, with token accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    /// The generated text.
    pub text: String,
    /// Tokens consumed by the prompt, as reported by the provider.
    pub prompt_tokens: u64,
    /// Tokens produced by the completion.
    pub response_tokens: u64,
    /// Total tokens for the call.
    pub total_tokens: u64,
}

/// Embedding and completion backend.
///
/// Both operations are synchronous from the engine's point of view;
/// implementations retry or pool connections internally as they see fit.
/// The indexer adds its own retry-with-backoff on top of [`embed`]
/// because a failed batch there would otherwise stall incremental
/// indexing (see [`Indexer`](crate::indexer::Indexer)).
///
/// [`embed`]: ModelProvider::embed
pub trait ModelProvider: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    ///
    /// Every returned vector must have the provider's fixed embedding
    /// dimension; the caller rejects mismatched shapes.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Run one completion against the given prompt.
    fn complete(&self, prompt: &str) -> Result<Completion, RagError>;
}
