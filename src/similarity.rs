//! Cosine similarity between dense embedding vectors.
//!
//! The sole similarity primitive of the engine; no other distance metric
//! is supported.

/// Cosine similarity of two vectors, in `[-1, 1]`.
///
/// Computed over the index intersection of the two vectors (the shorter
/// length wins), so a truncated or dimension-mismatched embedding degrades
/// gracefully instead of faulting. Returns `0.0` when either vector's norm
/// over the intersection is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let x = f64::from(x);
        let y = f64::from(y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let norm_a = norm_a.sqrt();
    let norm_b = norm_b.sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
