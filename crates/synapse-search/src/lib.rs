//! Facade over the query pipeline: hybrid retrieval, extractive answering and
//! research memory behind three entry points.
//!
//! A failed search (embedding or index down) surfaces as an error — "search
//! unavailable". A query with no corpus support succeeds with the sentinel
//! answer — "no answer found". Callers must keep the two apart.

pub mod intent;

use synapse_core::error::Result;
use synapse_core::traits::MemoryIndex;
use synapse_core::types::{Answer, Candidate, DocumentHit};
use synapse_answer::ExtractiveAnswerer;
use synapse_memory::ResearchMemory;
use synapse_retrieve::HybridRetriever;
use tracing::{debug, warn};

pub use intent::{classify_query, QueryIntent};

/// How many candidates one `search` call retrieves and how many documents it
/// reports back.
pub const DEFAULT_TOP_K: usize = 6;

const PREVIEW_WORDS: usize = 20;

/// Everything one query produced.
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub answer: Answer,
    pub intent: QueryIntent,
    pub documents: Vec<DocumentHit>,
}

pub struct SearchService<M: MemoryIndex + 'static> {
    retriever: HybridRetriever,
    answerer: ExtractiveAnswerer,
    memory: ResearchMemory<M>,
    top_k: usize,
}

impl<M: MemoryIndex + 'static> SearchService<M> {
    pub fn new(
        retriever: HybridRetriever,
        answerer: ExtractiveAnswerer,
        memory: ResearchMemory<M>,
    ) -> Self {
        Self { retriever, answerer, memory, top_k: DEFAULT_TOP_K }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Main entry point: retrieve, extract, record.
    pub async fn search(&self, query: &str) -> Result<SearchResponse> {
        let query = query.trim();
        let intent = classify_query(query);
        if query.is_empty() {
            return Ok(SearchResponse {
                answer: Answer::no_confident_answer(),
                intent,
                documents: Vec::new(),
            });
        }

        let candidates = self.retriever.retrieve(query, self.top_k).await?;
        let documents = document_hits(&candidates, self.top_k);
        if candidates.is_empty() {
            return Ok(SearchResponse { answer: Answer::no_confident_answer(), intent, documents });
        }

        if intent == QueryIntent::Fulltext {
            debug!(query, "exploratory query, documents only");
            return Ok(SearchResponse { answer: Answer::no_confident_answer(), intent, documents });
        }

        let answer = self.answerer.answer(query, &candidates).await;

        if answer.is_confident() {
            // Memory writes never fail the query they belong to.
            if let Err(e) = self.memory.record(query, &answer.text).await {
                warn!(error = %e, "failed to record interaction in research memory");
            }
        }

        Ok(SearchResponse { answer, intent, documents })
    }

    /// Raw ranked candidates without answer extraction.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Candidate>> {
        self.retriever.retrieve(query.trim(), k).await
    }

    /// Related past interactions from research memory.
    pub async fn recall_related(&self, query: &str, k: usize) -> Result<Vec<Candidate>> {
        self.memory.recall(query.trim(), k).await
    }
}

/// Unique-by-source document list for display, in candidate rank order.
fn document_hits(candidates: &[Candidate], limit: usize) -> Vec<DocumentHit> {
    let mut seen = std::collections::HashSet::new();
    let mut documents = Vec::new();
    for candidate in candidates {
        let path = candidate.chunk.source_path.clone();
        if path.is_empty() || !seen.insert(path.clone()) {
            continue;
        }
        documents.push(DocumentHit {
            source_path: path,
            preview: preview(&candidate.chunk.text, PREVIEW_WORDS),
            score: candidate.combined_score,
        });
        if documents.len() >= limit {
            break;
        }
    }
    documents
}

fn preview(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut out = words.iter().take(max_words).copied().collect::<Vec<_>>().join(" ");
    if words.len() > max_words {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use synapse_core::types::ChunkRecord;

    fn candidate(id: &str, path: &str, text: &str, score: f32) -> Candidate {
        Candidate {
            chunk: ChunkRecord {
                id: id.to_string(),
                text: text.to_string(),
                source_path: path.to_string(),
                position: 0,
            },
            semantic_score: score,
            keyword_overlap: 0.0,
            length_bonus: 0.0,
            combined_score: score,
        }
    }

    #[test]
    fn document_hits_unique_by_path_in_rank_order() {
        let candidates = vec![
            candidate("a1", "/docs/offer.pdf", "offer letter chunk one", 0.9),
            candidate("a2", "/docs/offer.pdf", "offer letter chunk two", 0.8),
            candidate("b1", "/docs/lease.pdf", "lease agreement chunk", 0.7),
        ];
        let hits = document_hits(&candidates, 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source_path, "/docs/offer.pdf");
        assert_eq!(hits[1].source_path, "/docs/lease.pdf");
    }

    #[test]
    fn preview_truncates_with_ellipsis() {
        let text = (0..30).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let p = preview(&text, 20);
        assert!(p.ends_with('…'));
        assert_eq!(p.split_whitespace().count(), 20);
    }
}
