//! End-to-end engine flow: index a small corpus through a scripted
//! provider, ask a question, and check ranking, attribution, and the
//! incremental watermark behavior.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use terusrag::{
    Completion, EngineConfig, MemoryChunkStore, ModelProvider, RagEngine, RagError,
    ResolvedSource, SourceDocument, UNKNOWN_SOURCE_TITLE,
};

/// Scripted provider: embeddings come from an exact-text lookup with a
/// fixed fallback vector, completions from a FIFO queue.
struct ScriptedProvider {
    embeddings: HashMap<String, Vec<f32>>,
    completions: Mutex<VecDeque<Completion>>,
    embed_calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(embeddings: &[(&str, Vec<f32>)]) -> Self {
        Self {
            embeddings: embeddings
                .iter()
                .map(|(text, v)| (text.to_string(), v.clone()))
                .collect(),
            completions: Mutex::new(VecDeque::new()),
            embed_calls: AtomicUsize::new(0),
        }
    }

    fn queue_completion(&self, text: &str) {
        self.completions.lock().unwrap().push_back(Completion {
            text: text.to_string(),
            prompt_tokens: 120,
            response_tokens: 40,
            total_tokens: 160,
        });
    }

    fn embed_call_count(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }
}

impl ModelProvider for ScriptedProvider {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| {
                self.embeddings
                    .get(t)
                    .cloned()
                    .unwrap_or_else(|| vec![0.0, 1.0])
            })
            .collect())
    }

    fn complete(&self, _prompt: &str) -> Result<Completion, RagError> {
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| RagError::CompletionFailed {
                reason: "no scripted completion queued".to_string(),
            })
    }
}

fn source(id: i64, title: &str, content: &str) -> SourceDocument {
    SourceDocument {
        id,
        title: title.to_string(),
        content: content.to_string(),
        module_type: "course".to_string(),
        content_type: "course_summary".to_string(),
        activity_id: None,
        modified_at: Utc::now(),
    }
}

#[test]
fn ask_returns_cited_answer_over_indexed_corpus() {
    let store = Arc::new(MemoryChunkStore::new());
    store.add_source_document(source(7, "Linear Algebra", "Matrices and vector spaces"));
    store.add_source_document(source(8, "Cooking Basics", "Pasta and simple sauces"));
    store.register_source(
        7,
        None,
        ResolvedSource {
            title: "Linear Algebra".to_string(),
            url: "https://example.test/course/7".to_string(),
        },
    );

    // Unit vectors: the algebra chunk is closest to the query.
    let provider = Arc::new(ScriptedProvider::new(&[
        ("what does the algebra course cover?", vec![1.0, 0.0]),
        ("Matrices and vector spaces", vec![0.8, 0.6]),
        ("Pasta and simple sauces", vec![0.2, 0.979_795_9]),
    ]));
    provider.queue_completion(
        "[1] The course covers matrices and vector spaces.\n\
         It also includes weekly problem sets.",
    );

    let engine = RagEngine::new(EngineConfig::default(), provider.clone(), store).unwrap();
    let report = engine.reindex(None).unwrap();
    assert_eq!(report.chunks_written, 2);
    assert!(report.watermark_advanced);

    let response = engine.ask("what does the algebra course cover?").unwrap();
    assert_eq!(response.answer.len(), 2);

    let cited = &response.answer[0];
    assert_eq!(cited.id, 1);
    assert_eq!(cited.title, "Linear Algebra");
    assert_eq!(cited.content, "The course covers matrices and vector spaces.");
    assert_eq!(cited.view_url.as_deref(), Some("https://example.test/course/7"));

    let uncited = &response.answer[1];
    assert_eq!(uncited.id, 0);
    assert_eq!(uncited.title, UNKNOWN_SOURCE_TITLE);
    assert!(uncited.view_url.is_none());

    assert_eq!(response.grounded_citations().count(), 1);
    assert_eq!(response.prompt_token_count, 120);
    assert_eq!(response.response_token_count, 40);
    assert_eq!(response.total_token_count, 160);
}

#[test]
fn retrieve_orders_by_hybrid_score() {
    let store = Arc::new(MemoryChunkStore::new());
    store.add_source_document(source(1, "A", "alpha topic"));
    store.add_source_document(source(2, "B", "beta topic"));
    store.add_source_document(source(3, "C", "gamma topic"));

    let provider = Arc::new(ScriptedProvider::new(&[
        ("query", vec![1.0, 0.0]),
        ("alpha topic", vec![0.8, 0.6]),
        ("beta topic", vec![0.2, 0.979_795_9]),
        ("gamma topic", vec![0.5, 0.866_025_4]),
    ]));

    let engine = RagEngine::new(EngineConfig::default(), provider, store).unwrap();
    engine.reindex(None).unwrap();

    let ranked = engine.retrieve("query").unwrap();
    let titles: Vec<&str> = ranked.iter().map(|r| r.chunk.title.as_str()).collect();
    assert_eq!(titles, vec!["A", "C", "B"]);
    assert!(ranked[0].hybrid > ranked[1].hybrid);
    assert!(ranked[1].hybrid > ranked[2].hybrid);
}

#[test]
fn mixed_signals_rank_lexical_match_above_dense_favorite() {
    // Three chunks of one course: dense similarities 0.8 / 0.2 / 0.5.
    // The second chunk matches every query term, so its BM25 score
    // lifts it past the dense favorite; the third has neither signal.
    let store = Arc::new(MemoryChunkStore::new());
    store.add_source_document(source(7, "Intro to X", "matrices and vectors"));
    store.add_source_document(source(7, "Intro to X", "gradient descent convergence rate analysis"));
    store.add_source_document(source(7, "Intro to X", "probability theory"));

    let provider = Arc::new(ScriptedProvider::new(&[
        ("gradient descent convergence rate", vec![1.0, 0.0]),
        ("matrices and vectors", vec![0.8, 0.6]),
        (
            "gradient descent convergence rate analysis",
            vec![0.2, 0.979_795_9],
        ),
        ("probability theory", vec![0.5, 0.866_025_4]),
    ]));

    let config = EngineConfig {
        top_k: 2,
        ..Default::default()
    };
    let engine = RagEngine::new(config, provider, store).unwrap();
    engine.reindex(None).unwrap();

    let ranked = engine.retrieve("gradient descent convergence rate").unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].chunk.content, "gradient descent convergence rate analysis");
    assert_eq!(ranked[1].chunk.content, "matrices and vectors");
    assert!(ranked[0].bm25 > 0.0);
    assert_eq!(ranked[1].bm25, 0.0);
}

#[test]
fn second_reindex_only_picks_up_new_documents() {
    let store = Arc::new(MemoryChunkStore::new());
    store.add_source_document(source(1, "First", "first document"));
    let provider = Arc::new(ScriptedProvider::new(&[]));

    let engine = RagEngine::new(EngineConfig::default(), provider.clone(), store.clone()).unwrap();
    let first = engine.reindex(None).unwrap();
    assert_eq!(first.chunks_written, 1);
    assert!(first.watermark_advanced);

    // Nothing changed: the watermark filters everything out and the
    // provider is never called.
    let calls_before = provider.embed_call_count();
    let second = engine.reindex(None).unwrap();
    assert_eq!(second.chunks_written, 0);
    assert_eq!(provider.embed_call_count(), calls_before);

    store.add_source_document(source(2, "Second", "second document"));
    let third = engine.reindex(None).unwrap();
    assert_eq!(third.chunks_written, 1);
    assert_eq!(store.chunk_count(), 2);
}

#[test]
fn reindexing_unchanged_content_does_not_duplicate_chunks() {
    let store = Arc::new(MemoryChunkStore::new());
    store.add_source_document(source(1, "Stable", "stable content"));
    let provider = Arc::new(ScriptedProvider::new(&[]));

    let engine = RagEngine::new(EngineConfig::default(), provider, store.clone()).unwrap();
    engine.reindex(Some(chrono::DateTime::<Utc>::UNIX_EPOCH)).unwrap();
    engine.reindex(Some(chrono::DateTime::<Utc>::UNIX_EPOCH)).unwrap();
    assert_eq!(store.chunk_count(), 1);
}

#[test]
fn unresolvable_citation_falls_back_to_chunk_title() {
    let store = Arc::new(MemoryChunkStore::new());
    store.add_source_document(source(5, "Orphan Module", "content without a catalog entry"));
    let provider = Arc::new(ScriptedProvider::new(&[]));
    provider.queue_completion("[1] A claim from the orphan module.");

    let engine = RagEngine::new(EngineConfig::default(), provider, store).unwrap();
    engine.reindex(None).unwrap();

    let response = engine.ask("anything").unwrap();
    let citation = &response.answer[0];
    assert!(citation.is_grounded());
    assert_eq!(citation.title, "Orphan Module");
    assert!(citation.view_url.is_none());
}
