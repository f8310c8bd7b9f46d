//! Content chunking and content-addressable chunk identity.
//!
//! Splits arbitrary text into contiguous, non-overlapping chunks of at
//! most `max_chunk_size` codepoints, preserving original order. Chunk
//! sizes observed in practice range 512–1024. Both functions are pure.

use sha2::{Digest, Sha256};

/// A bounded-size slice of a source document, with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The chunk content, at most `max_chunk_size` codepoints.
    pub content: String,
    /// Zero-based position of this chunk within the source text.
    pub index: usize,
}

/// Split `text` into chunks of at most `max_chunk_size` codepoints.
///
/// The boundary is measured in codepoints, not bytes, so multi-byte
/// characters are never split. Concatenating the chunks in order
/// reproduces `text` exactly; the final chunk may be shorter. Empty
/// input yields an empty vector.
///
/// # Panics
///
/// Panics if `max_chunk_size` is zero. [`EngineConfig::validate`]
/// rejects a zero chunk size before any chunking happens.
///
/// [`EngineConfig::validate`]: crate::config::EngineConfig::validate
pub fn chunk_text(text: &str, max_chunk_size: usize) -> Vec<TextChunk> {
    assert!(max_chunk_size > 0, "max_chunk_size must be positive");

    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chunk_size)
        .enumerate()
        .map(|(index, window)| TextChunk {
            content: window.iter().collect(),
            index,
        })
        .collect()
}

/// Deterministic one-way hash of chunk content, as lowercase hex.
///
/// Used as the content-addressable part of the chunk identity key
/// `(contentHash, sourceModuleId, contentType)`.
pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}
