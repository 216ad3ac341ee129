//! The `Retriever` external collaborator (§4.2): semantic search over a
//! chunked reference corpus. Modeled as a trait so the orchestration engine
//! never depends on a concrete embedding/vector-index implementation.

use async_trait::async_trait;

use crate::document::{Chunk, RetrievalResult};
use crate::error::OrchestratorError;

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Returns up to `k` chunks ordered by descending semantic similarity.
    /// Deterministic for a fixed index. On failure, callers treat this as
    /// "no context" and continue (§7).
    async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult, OrchestratorError>;
}

/// Deterministic, in-memory retriever over a fixed corpus of chunks, ranked
/// by naive token overlap with the query. Stands in for a real
/// embedding/vector-index `Retriever` in tests and the demo binary — it
/// satisfies the "deterministic for a fixed index" contract without
/// depending on an actual embedding model.
pub struct StaticCorpusRetriever {
    corpus: Vec<Chunk>,
}

impl StaticCorpusRetriever {
    pub fn new(corpus: Vec<Chunk>) -> Self {
        Self { corpus }
    }

    pub fn empty() -> Self {
        Self { corpus: Vec::new() }
    }

    fn score_overlap(query: &str, content: &str) -> f32 {
        let query_tokens: Vec<String> = query
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect();
        if query_tokens.is_empty() {
            return 0.0;
        }
        let content_lower = content.to_lowercase();
        let hits = query_tokens
            .iter()
            .filter(|t| content_lower.contains(t.as_str()))
            .count();
        hits as f32 / query_tokens.len() as f32
    }
}

#[async_trait]
impl Retriever for StaticCorpusRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult, OrchestratorError> {
        let mut scored: Vec<Chunk> = self
            .corpus
            .iter()
            .map(|c| {
                let score = Self::score_overlap(query, &c.content);
                Chunk::new(c.content.clone(), c.source.clone(), score)
            })
            .filter(|c| c.score.get() > 0.0)
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .get()
                .partial_cmp(&a.score.get())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.source.cmp(&b.source))
        });
        scored.truncate(k);
        Ok(RetrievalResult { chunks: scored })
    }
}

/// Always-failing retriever, used to exercise the "retrieval failed, treat
/// as empty context" path in tests.
pub struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    async fn retrieve(&self, query: &str, _k: usize) -> Result<RetrievalResult, OrchestratorError> {
        Err(OrchestratorError::Retrieval {
            query: query.to_string(),
            reason: "simulated retrieval outage".to_string(),
        })
    }
}
