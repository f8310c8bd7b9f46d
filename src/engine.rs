//! The engine facade: retrieval, question answering, and reindexing
//! behind one handle.

use std::sync::Arc;

use tracing::{info, warn};

use crate::answer::AnswerParser;
use crate::config::EngineConfig;
use crate::errors::RagError;
use crate::indexer::Indexer;
use crate::prompt;
use crate::provider::ModelProvider;
use crate::ranker::HybridRanker;
use crate::store::ChunkStore;
use crate::types::{RagResponse, RankedChunk, ReindexReport};

/// Retrieval-augmented answering over a chunk store.
///
/// One engine owns one provider and one store and is cheap to share:
/// every operation takes `&self` and the underlying handles are
/// reference-counted.
pub struct RagEngine {
    config: EngineConfig,
    provider: Arc<dyn ModelProvider>,
    store: Arc<dyn ChunkStore>,
}

impl RagEngine {
    /// Create an engine, validating the configuration up front.
    ///
    /// Validation warnings (for example fusion weights not summing to
    /// 1.0) are logged, not fatal.
    pub fn new(
        config: EngineConfig,
        provider: Arc<dyn ModelProvider>,
        store: Arc<dyn ChunkStore>,
    ) -> Result<Self, RagError> {
        for warning in config.validate()? {
            warn!(%warning, "engine configuration warning");
        }
        Ok(Self {
            config,
            provider,
            store,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Retrieve the top-k chunks for a query, without a completion.
    pub fn retrieve(&self, query: &str) -> Result<Vec<RankedChunk>, RagError> {
        HybridRanker::new(&self.config, self.provider.as_ref(), self.store.as_ref())
            .rank(query, self.config.top_k)
    }

    /// Answer a question from the indexed corpus.
    ///
    /// Optionally rewrites the question (`promptOptimization`), retrieves
    /// the top-k chunks, asks the provider for a completion over them,
    /// and parses the completion into per-line citations. The rewritten
    /// question, when enabled, is used both for retrieval and in the
    /// completion prompt.
    pub fn ask(&self, question: &str) -> Result<RagResponse, RagError> {
        let query = if self.config.prompt_optimization {
            prompt::optimize(question)
        } else {
            question.to_string()
        };

        let context = HybridRanker::new(&self.config, self.provider.as_ref(), self.store.as_ref())
            .rank(&query, self.config.top_k)?;
        let request = prompt::build_prompt(&self.config.system_prompt, &context, &query);
        let completion = self.provider.complete(&request)?;
        let answer = AnswerParser::new(self.store.as_ref()).parse(&completion.text)?;

        info!(
            context_chunks = context.len(),
            citations = answer.len(),
            total_tokens = completion.total_tokens,
            "question answered"
        );
        Ok(RagResponse {
            answer,
            prompt_token_count: completion.prompt_tokens,
            response_token_count: completion.response_tokens,
            total_token_count: completion.total_tokens,
        })
    }

    /// Run one incremental reindex; see [`Indexer::reindex`].
    pub fn reindex(
        &self,
        since: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<ReindexReport, RagError> {
        Indexer::new(&self.config, self.provider.as_ref(), self.store.as_ref()).reindex(since)
    }
}
