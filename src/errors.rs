//! Error types for the terusrag engine.

use thiserror::Error;

/// Domain-specific errors for retrieval, indexing, and answer parsing.
///
/// Error policy follows the engine design: numeric degeneracies (empty
/// corpus, zero vector norms, zero average document length) are absorbed
/// as zero scores deep inside the scoring primitives and never surface
/// here. Citation ids that cannot be resolved become the "Unknown Source"
/// sentinel, not an error. Only provider and store failures propagate.
#[derive(Error, Debug)]
pub enum RagError {
    /// A configuration value is invalid.
    ///
    /// Used for validation errors detected at construction time
    /// (e.g., `chunkSize = 0`).
    #[error("Invalid configuration: {message}. {hint}")]
    InvalidConfiguration {
        /// Description of the invalid configuration.
        message: String,
        /// Actionable hint on how to fix it.
        hint: String,
    },

    /// The embedding provider call failed.
    ///
    /// This aborts a ranking operation outright; there is no BM25-only
    /// degraded mode. During indexing the caller retries before giving
    /// up on the batch.
    #[error("Embedding request failed: {reason}")]
    EmbeddingFailed {
        /// Description of the failure (transport, format, ...).
        reason: String,
    },

    /// The embedding provider returned the wrong number of vectors.
    #[error("Embedding response shape mismatch: expected {expected} vectors, got {actual}")]
    EmbeddingShapeMismatch {
        /// Number of input texts.
        expected: usize,
        /// Number of vectors in the response.
        actual: usize,
    },

    /// The chat/completion provider call failed.
    #[error("Completion request failed: {reason}")]
    CompletionFailed {
        /// Description of the failure.
        reason: String,
    },

    /// The corpus store adapter failed.
    #[error("Chunk store error: {message}")]
    Store {
        /// Description of the store failure.
        message: String,
    },

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error (provider payloads, config).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A wrapped generic error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_configuration_message() {
        let err = RagError::InvalidConfiguration {
            message: "chunkSize must be positive".to_string(),
            hint: "Set chunkSize to at least 1 (recommended: 512)".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("chunkSize must be positive"));
        assert!(text.contains("recommended: 512"));
    }

    #[test]
    fn test_shape_mismatch_message() {
        let err = RagError::EmbeddingShapeMismatch {
            expected: 3,
            actual: 1,
        };
        assert!(err.to_string().contains("expected 3"));
        assert!(err.to_string().contains("got 1"));
    }

    #[test]
    fn test_anyhow_conversion() {
        fn fails() -> Result<(), RagError> {
            Err(anyhow::anyhow!("backend exploded"))?;
            Ok(())
        }
        let err = fails().unwrap_err();
        assert!(matches!(err, RagError::Other(_)));
    }
}
