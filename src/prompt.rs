//! Prompt construction and optional query optimization.
//!
//! [`build_prompt`] assembles the completion prompt: system instructions,
//! a context block of ranked chunks tagged with their bracketed store
//! ids, then the question. The bracketed ids are what the answer parser
//! later matches against, so the format here and the regex in
//! [`answer`](crate::answer) move together.
//!
//! [`optimize`] is the opt-in query rewrite (`promptOptimization`):
//! strip conversational lead-ins, emphasize the most frequent non-stopword
//! terms, and append a focus hint when the question is mostly stopwords.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::types::RankedChunk;

// ============================================================================
// Prompt assembly
// ============================================================================

/// Build the completion prompt from the system instructions, the ranked
/// context chunks, and the user question.
///
/// Each context entry is prefixed with its bracketed store id plus its
/// source metadata, one entry per chunk, in rank order.
pub fn build_prompt(system_prompt: &str, context: &[RankedChunk], question: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str(system_prompt);
    prompt.push_str("\n\nContext:\n");

    for ranked in context {
        let chunk = &ranked.chunk;
        prompt.push_str(&format!(
            "[{}] [Source Module ID: {}]",
            chunk.id, chunk.source_module_id
        ));
        if let Some(activity_id) = chunk.activity_id {
            prompt.push_str(&format!(" [Activity ID: {activity_id}]"));
        }
        prompt.push_str(&format!(
            " [Type: {}] [Module Type: {}] [Source Title: {}]\n{}\n\n",
            chunk.content_type, chunk.source_module_type, chunk.title, chunk.content
        ));
    }

    prompt.push_str(&format!("Question: {question}\nAnswer:"));
    prompt
}

// ============================================================================
// Query optimization
// ============================================================================

/// Non-stopword density below which a focus hint is appended.
const FOCUS_HINT_DENSITY: f64 = 0.5;

/// Key terms emphasized and listed in the focus hint.
const KEY_TERM_LIMIT: usize = 5;

/// Optimized prompts longer than this are truncated.
const MAX_OPTIMIZED_LENGTH: usize = 2000;

/// Conversational lead-ins that carry no retrieval signal.
const REDUNDANT_PHRASES: &[&str] = &[
    "I was wondering if",
    "please tell me about",
    "I want to know",
    "could you tell me",
    "I would like to know",
    "can you explain",
    "I need information on",
    "I'm interested in learning about",
];

/// Common English stopwords, used for key-term extraction and the
/// density measure.
const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "am", "an", "and", "any", "are", "as", "at",
    "be", "because", "been", "before", "being", "below", "between", "both", "but", "by", "can",
    "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from", "further",
    "had", "has", "have", "having", "he", "her", "here", "hers", "him", "his", "how", "i", "if",
    "in", "into", "is", "it", "its", "just", "me", "more", "most", "my", "no", "nor", "not",
    "now", "of", "off", "on", "once", "only", "or", "other", "our", "out", "over", "own", "same",
    "she", "should", "so", "some", "such", "than", "that", "the", "their", "them", "then",
    "there", "these", "they", "this", "those", "through", "to", "too", "under", "until", "up",
    "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "why", "will",
    "with", "you", "your",
];

static REDUNDANT_PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = REDUNDANT_PHRASES
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&alternation)
        .case_insensitive(true)
        .build()
        .expect("static phrase pattern")
});

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

/// Lowercase tokens of `text`: letters, digits, and apostrophes, split on
/// everything else.
fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '\'' {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().map(str::to_string).collect()
}

/// The most frequent non-stopword tokens, frequency descending. Ties
/// break alphabetically so the output is deterministic.
fn key_terms(tokens: &[String]) -> Vec<String> {
    let mut frequencies: HashMap<&str, usize> = HashMap::new();
    for token in tokens {
        if !is_stopword(token) {
            *frequencies.entry(token.as_str()).or_insert(0) += 1;
        }
    }
    let mut terms: Vec<(&str, usize)> = frequencies.into_iter().collect();
    terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    terms
        .into_iter()
        .take(KEY_TERM_LIMIT)
        .map(|(term, _)| term.to_string())
        .collect()
}

/// Rewrite a question for retrieval.
///
/// Strips conversational lead-ins, wraps the top key terms in `**`
/// emphasis, and appends a focus hint listing those terms when the
/// question's non-stopword density falls below 0.5. Falls back to the
/// original text whenever rewriting would leave nothing useful.
pub fn optimize(question: &str) -> String {
    let tokens = tokenize(question);
    if tokens.is_empty() {
        return question.to_string();
    }

    let non_stopword_count = tokens.iter().filter(|t| !is_stopword(t)).count();
    let density = non_stopword_count as f64 / tokens.len() as f64;
    let terms = key_terms(&tokens);

    let mut optimized = REDUNDANT_PHRASE_RE.replace_all(question, "").trim().to_string();
    if optimized.is_empty() {
        // Nothing but lead-in; rewriting would erase the question.
        return question.to_string();
    }

    for term in &terms {
        if term.chars().count() > 2 {
            let pattern = format!(r"\b{}\b", regex::escape(term));
            if let Ok(re) = RegexBuilder::new(&pattern).case_insensitive(true).build() {
                optimized = re.replace_all(&optimized, "**$0**").into_owned();
            }
        }
    }

    if density < FOCUS_HINT_DENSITY && !terms.is_empty() {
        optimized.push_str(&format!(
            " Focus on these key concepts: {}.",
            terms.join(", ")
        ));
    }

    if optimized.chars().count() > MAX_OPTIMIZED_LENGTH {
        optimized = optimized.chars().take(MAX_OPTIMIZED_LENGTH).collect();
        optimized.push_str("... (truncated)");
    }

    optimized
}
