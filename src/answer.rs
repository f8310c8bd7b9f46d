//! Structured answer parsing and source attribution.
//!
//! The completion is asked to start every answer line with the bracketed
//! store id of the context entry it used (see
//! [`build_prompt`](crate::prompt::build_prompt)). This module walks the
//! completion text line by line, extracts those markers, and resolves
//! each one to a titled, linkable citation through the store.
//!
//! Unattributable lines are never dropped: they become "Unknown Source"
//! sentinels (`id == 0`, no URL) so the caller sees the full answer and
//! decides its own filtering policy.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::errors::RagError;
use crate::store::ChunkStore;
use crate::types::Citation;

/// A bracketed store id, e.g. `[42]`. The first occurrence in a line
/// wins; models occasionally emit the marker mid-line or trailing, and
/// anchoring to line start would lose those.
static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+)\]").expect("static marker pattern"));

/// Resolves bracketed source markers in completion text to citations.
pub struct AnswerParser<'a> {
    store: &'a dyn ChunkStore,
}

impl<'a> AnswerParser<'a> {
    pub fn new(store: &'a dyn ChunkStore) -> Self {
        Self { store }
    }

    /// Parse completion text into one citation per non-empty line.
    ///
    /// A line's first `[<digits>]` marker names the cited chunk; the
    /// marker is removed from the citation content. Lines without a
    /// marker, markers naming no stored chunk, and the literal `[0]`
    /// all yield the "Unknown Source" sentinel.
    ///
    /// # Errors
    ///
    /// Only store read failures surface as errors; malformed model
    /// output degrades to sentinels instead.
    pub fn parse(&self, text: &str) -> Result<Vec<Citation>, RagError> {
        let mut citations = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let Some(captures) = MARKER_RE.captures(line) else {
                citations.push(Citation::unknown(line));
                continue;
            };

            let content = MARKER_RE.replace(line, "").trim().to_string();
            let id: i64 = match captures[1].parse() {
                Ok(id) if id > 0 => id,
                _ => {
                    citations.push(Citation::unknown(content));
                    continue;
                }
            };

            citations.push(self.resolve(id, content)?);
        }

        debug!(
            lines = citations.len(),
            grounded = citations.iter().filter(|c| c.is_grounded()).count(),
            "answer parsed"
        );
        Ok(citations)
    }

    /// Resolve a cited chunk id to a titled citation.
    ///
    /// Resolution prefers the activity-level catalog entry, falls back
    /// to the module-level one, and finally to the chunk's own stored
    /// title without a URL. An id naming no chunk yields the sentinel.
    fn resolve(&self, id: i64, content: String) -> Result<Citation, RagError> {
        let Some(chunk) = self.store.chunk_by_id(id)? else {
            return Ok(Citation::unknown(content));
        };

        let mut resolved = self
            .store
            .resolve_source(chunk.source_module_id, chunk.activity_id)?;
        if resolved.is_none() && chunk.activity_id.is_some() {
            resolved = self.store.resolve_source(chunk.source_module_id, None)?;
        }

        Ok(match resolved {
            Some(source) => Citation {
                id,
                title: source.title,
                content,
                view_url: Some(source.url),
            },
            None => Citation {
                id,
                title: chunk.title,
                content,
                view_url: None,
            },
        })
    }
}
