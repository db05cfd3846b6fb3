//! Question answering over the indexed corpus.
//!
//! [`RagEngine::answer`] runs the retrieval ladder: validate the
//! question, embed it, query the index, filter by similarity, assemble a
//! context under the character budget, and generate. Each rung degrades
//! rather than aborts: an empty index yields a canned fallback answer,
//! a too-strict threshold falls back to the unfiltered matches, and
//! context assembly stops before the block that would overflow the
//! budget instead of truncating it.
//! Provider failures surface as a structured [`ChatOutcome`] with
//! `success = false`, never as a transport error.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::RetrievalConfig;
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::generate::{build_prompt, Generator};
use crate::index::{IndexStats, VectorIndex};
use crate::models::{ChatOutcome, SearchResult};
use crate::store::DocumentStore;

pub struct RagEngine {
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    index: Arc<dyn VectorIndex>,
    retrieval: RetrievalConfig,
}

impl RagEngine {
    pub fn new(
        retrieval: RetrievalConfig,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            embedder,
            generator,
            index,
            retrieval,
        }
    }

    /// Answer one question against the corpus.
    ///
    /// A degenerate question is rejected with [`Error::InvalidInput`]
    /// before any remote call is made. Everything past validation folds
    /// failures into the returned outcome.
    pub async fn answer(&self, question: &str) -> Result<ChatOutcome> {
        let question = validate_question(question)?;
        info!(question, "answering question");

        let query_vector = match self.embedder.embed(question).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "question embedding failed");
                return Ok(ChatOutcome::failure(
                    "The question could not be processed right now. Please try again.",
                ));
            }
        };

        let matches = match self
            .index
            .query(&query_vector, self.retrieval.top_k)
            .await
        {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "vector query failed");
                return Ok(ChatOutcome::failure(
                    "Document search is unavailable right now. Please try again.",
                ));
            }
        };

        if matches.is_empty() {
            debug!("no matches in index");
            return Ok(ChatOutcome::success(fallback_answer(question), Vec::new()));
        }

        let relevant = filter_by_threshold(matches, self.retrieval.min_similarity);
        let (context, included) =
            build_context(&relevant, self.retrieval.max_context_chars);
        debug!(
            matches = relevant.len(),
            included = included.len(),
            context_chars = context.chars().count(),
            "context assembled"
        );

        let prompt = build_prompt(question, &context);
        let answer = match self.generator.generate(&prompt).await {
            Ok(a) => a,
            Err(e) => {
                warn!(error = %e, "generation failed");
                return Ok(ChatOutcome::failure(
                    "The answer could not be generated right now. Please try again.",
                ));
            }
        };

        // A blank completion is a provider failure regardless of which
        // backend produced it.
        if answer.trim().is_empty() {
            warn!("generator returned a blank completion");
            return Ok(ChatOutcome::failure(
                "The answer could not be generated right now. Please try again.",
            ));
        }

        Ok(ChatOutcome::success(answer, extract_sources(&included)))
    }

    /// Conversation starters surfaced next to the chat box.
    pub fn suggested_questions(&self) -> Vec<String> {
        [
            "What is the vacation policy?",
            "How do I report an expense?",
            "What are the onboarding steps for new employees?",
            "Who do I contact about benefits?",
            "What is the remote work policy?",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}

/// Reject questions no model call could answer sensibly: empty, shorter
/// than three characters, or without a single letter.
pub fn validate_question(question: &str) -> Result<&str> {
    let q = question.trim();
    if q.is_empty() {
        return Err(Error::InvalidInput("question is empty".to_string()));
    }
    if q.chars().count() < 3 {
        return Err(Error::InvalidInput(
            "question must be at least 3 characters".to_string(),
        ));
    }
    if !q.chars().any(|c| c.is_alphabetic()) {
        return Err(Error::InvalidInput(
            "question must contain at least one letter".to_string(),
        ));
    }
    Ok(q)
}

/// Keep matches at or above the similarity cutoff. When nothing clears
/// it, the unfiltered set is returned so the user still gets the best
/// available material instead of a shrug.
pub fn filter_by_threshold(matches: Vec<SearchResult>, min_similarity: f32) -> Vec<SearchResult> {
    let filtered: Vec<SearchResult> = matches
        .iter()
        .filter(|m| m.similarity >= min_similarity)
        .cloned()
        .collect();
    if filtered.is_empty() {
        matches
    } else {
        filtered
    }
}

/// Assemble the context string under `budget` characters.
///
/// Each match becomes a `[Source: name]` block. Assembly stops at the
/// first block that would push the context past the budget; nothing is
/// truncated mid-block, and lower-ranked matches are never admitted past
/// the cutoff. Returns the context and the matches actually included,
/// in order.
pub fn build_context(
    matches: &[SearchResult],
    budget: usize,
) -> (String, Vec<SearchResult>) {
    let mut context = String::new();
    let mut context_chars = 0usize;
    let mut included = Vec::new();

    for m in matches {
        let name = m.document_name().unwrap_or("unknown document");
        let block = format!("[Source: {name}]\n{}\n\n", m.text);
        let block_chars = block.chars().count();
        if context_chars + block_chars > budget {
            break;
        }
        context.push_str(&block);
        context_chars += block_chars;
        included.push(m.clone());
    }

    (context, included)
}

/// Distinct source document names in first-seen order.
pub fn extract_sources(included: &[SearchResult]) -> Vec<String> {
    let mut sources = Vec::new();
    for m in included {
        if let Some(name) = m.document_name() {
            if !sources.iter().any(|s| s == name) {
                sources.push(name.to_string());
            }
        }
    }
    sources
}

/// Canned answer for an empty index or a question with no matches.
fn fallback_answer(question: &str) -> String {
    format!(
        "I could not find any relevant information in the available documents \
         to answer \"{question}\". Try rephrasing the question or check that \
         the relevant documents have been uploaded."
    )
}

/// Aggregate counters for the stats surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct CorpusStats {
    pub documents_total: u64,
    /// Per-status document counts, keyed by the status wire name.
    pub documents_by_status: std::collections::BTreeMap<String, u64>,
    pub index: IndexStats,
}

pub async fn corpus_stats(
    store: &dyn DocumentStore,
    index: &dyn VectorIndex,
) -> Result<CorpusStats> {
    let counts = store.status_counts().await?;
    let documents_total = counts.iter().map(|(_, n)| n).sum();
    let documents_by_status = counts
        .into_iter()
        .map(|(s, n)| (s.as_str().to_string(), n))
        .collect();
    let index_stats = index.stats().await?;
    Ok(CorpusStats {
        documents_total,
        documents_by_status,
        index: index_stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::memory::MemoryIndex;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::EmbeddingProvider("down".to_string()));
            }
            Ok(vec![1.0, 0.0])
        }
    }

    struct CountingGenerator {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Generator for CountingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::GenerationProvider("down".to_string()));
            }
            Ok("Twenty days per year.".to_string())
        }
    }

    fn engine(
        index: Arc<MemoryIndex>,
        embed_fail: bool,
        generate_fail: bool,
    ) -> (RagEngine, Arc<CountingEmbedder>, Arc<CountingGenerator>) {
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
            fail: embed_fail,
        });
        let generator = Arc::new(CountingGenerator {
            calls: AtomicUsize::new(0),
            fail: generate_fail,
        });
        let engine = RagEngine::new(
            RetrievalConfig::default(),
            embedder.clone(),
            generator.clone(),
            index,
        );
        (engine, embedder, generator)
    }

    fn result(name: &str, text: &str, similarity: f32) -> SearchResult {
        let mut metadata = HashMap::new();
        metadata.insert("document_name".to_string(), name.to_string());
        SearchResult {
            id: format!("{name}_chunk_0"),
            text: text.to_string(),
            metadata,
            similarity,
        }
    }

    async fn seed(index: &MemoryIndex, id: &str, name: &str, text: &str, vector: Vec<f32>) {
        let mut metadata = HashMap::new();
        metadata.insert("text".to_string(), text.to_string());
        metadata.insert("document_id".to_string(), id.split('_').next().unwrap().to_string());
        metadata.insert("document_name".to_string(), name.to_string());
        index.upsert(id, vector, metadata).await.unwrap();
    }

    #[tokio::test]
    async fn degenerate_questions_never_reach_providers() {
        let (engine, embedder, generator) = engine(Arc::new(MemoryIndex::new()), false, false);

        for q in ["", "   ", "12", "??", "ab"] {
            let err = engine.answer(q).await.unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "accepted {q:?}");
        }
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn accented_letters_count_as_alphabetic() {
        assert!(validate_question("¿día?").is_ok());
        assert!(validate_question("über").is_ok());
    }

    #[tokio::test]
    async fn empty_index_yields_fallback_success() {
        let (engine, _, generator) = engine(Arc::new(MemoryIndex::new()), false, false);

        let outcome = engine.answer("What is the vacation policy?").await.unwrap();
        assert!(outcome.success);
        assert!(outcome.answer.contains("What is the vacation policy?"));
        assert!(outcome.sources.is_empty());
        // The canned fallback never consults the generative model.
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn answers_with_sources_from_included_matches() {
        let index = Arc::new(MemoryIndex::new());
        seed(&index, "d1_chunk_0", "handbook.pdf", "Leave is 20 days.", vec![1.0, 0.0]).await;
        seed(&index, "d2_chunk_0", "policy.pdf", "Leave accrues monthly.", vec![0.9, 0.1]).await;
        let (engine, _, _) = engine(index, false, false);

        let outcome = engine.answer("How much leave do I get?").await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.answer, "Twenty days per year.");
        assert_eq!(outcome.sources, vec!["handbook.pdf", "policy.pdf"]);
    }

    #[tokio::test]
    async fn below_threshold_matches_are_still_used() {
        let index = Arc::new(MemoryIndex::new());
        // Similarity to the query vector [1,0] is well below 0.6.
        seed(&index, "d1_chunk_0", "handbook.pdf", "Weak match.", vec![0.1, 1.0]).await;
        let (engine, _, generator) = engine(index, false, false);

        let outcome = engine.answer("Anything relevant?").await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.sources, vec!["handbook.pdf"]);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn embedding_failure_is_a_structured_outcome() {
        let (engine, _, generator) = engine(Arc::new(MemoryIndex::new()), true, false);

        let outcome = engine.answer("Valid question?").await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.sources.is_empty());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn generation_failure_is_a_structured_outcome() {
        let index = Arc::new(MemoryIndex::new());
        seed(&index, "d1_chunk_0", "handbook.pdf", "Some text.", vec![1.0, 0.0]).await;
        let (engine, _, _) = engine(index, false, true);

        let outcome = engine.answer("Valid question?").await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.sources.is_empty());
    }

    struct BlankGenerator;

    #[async_trait]
    impl Generator for BlankGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok("   ".to_string())
        }
    }

    #[tokio::test]
    async fn blank_completion_is_a_structured_failure() {
        let index = Arc::new(MemoryIndex::new());
        seed(&index, "d1_chunk_0", "handbook.pdf", "Some text.", vec![1.0, 0.0]).await;
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let engine = RagEngine::new(
            RetrievalConfig::default(),
            embedder,
            Arc::new(BlankGenerator),
            index,
        );

        let outcome = engine.answer("Valid question?").await.unwrap();
        assert!(!outcome.success);
        assert!(!outcome.answer.trim().is_empty());
        assert!(outcome.sources.is_empty());
    }

    #[test]
    fn threshold_filter_keeps_strong_matches_only() {
        let matches = vec![
            result("a.pdf", "strong", 0.9),
            result("b.pdf", "weak", 0.2),
        ];
        let kept = filter_by_threshold(matches, 0.6);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].text, "strong");
    }

    #[test]
    fn threshold_filter_falls_back_to_all() {
        let matches = vec![
            result("a.pdf", "weak one", 0.3),
            result("b.pdf", "weak two", 0.2),
        ];
        let kept = filter_by_threshold(matches, 0.6);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn over_budget_block_ends_context_assembly() {
        let big = "x".repeat(300);
        let matches = vec![
            result("a.pdf", "short one.", 0.9),
            result("b.pdf", &big, 0.8),
            result("c.pdf", "short two.", 0.7),
        ];
        let (context, included) = build_context(&matches, 80);
        assert!(context.contains("short one."));
        // The oversized block ends assembly; nothing ranked below it is
        // admitted even though it would fit.
        assert!(!context.contains(&big));
        assert!(!context.contains("short two."));
        assert_eq!(included.len(), 1);
        // No block was truncated.
        assert!(context.chars().count() <= 80);
    }

    #[test]
    fn context_respects_budget_across_equal_blocks() {
        let big = "x".repeat(1500);
        let matches = vec![
            result("a.pdf", &big, 0.9),
            result("b.pdf", &big, 0.8),
            result("c.pdf", &big, 0.7),
            result("d.pdf", "tiny.", 0.6),
        ];
        // Two blocks fit under 4000 characters, the third does not.
        let (context, included) = build_context(&matches, 4000);
        assert_eq!(extract_sources(&included), vec!["a.pdf", "b.pdf"]);
        assert!(!context.contains("tiny."));
        assert!(context.chars().count() <= 4000);
    }

    #[test]
    fn context_blocks_carry_source_headers() {
        let matches = vec![result("handbook.pdf", "Leave is 20 days.", 0.9)];
        let (context, _) = build_context(&matches, 4000);
        assert!(context.starts_with("[Source: handbook.pdf]\nLeave is 20 days.\n\n"));
    }

    #[test]
    fn sources_are_distinct_first_seen() {
        let included = vec![
            result("a.pdf", "one", 0.9),
            result("b.pdf", "two", 0.8),
            result("a.pdf", "three", 0.7),
        ];
        assert_eq!(extract_sources(&included), vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn nameless_matches_produce_no_source() {
        let r = SearchResult {
            id: "d1_chunk_0".to_string(),
            text: "text".to_string(),
            metadata: HashMap::new(),
            similarity: 0.9,
        };
        assert!(extract_sources(&[r]).is_empty());
    }
}
