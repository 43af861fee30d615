//! Hybrid retrieval: vector search re-ranked with keyword overlap and a
//! length heuristic.
//!
//! The combined score is `w_sem * semantic + w_kw * overlap + w_len * length`
//! with weights from `RetrievalConfig` (defaults 0.7 / 0.2 / 0.1). The length
//! bonus is the saturating curve `min(words / target_chunk_words, 1)`, zero
//! for empty text. Ranking is fully deterministic: combined score descending,
//! then semantic score descending, then chunk id ascending.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use synapse_core::config::RetrievalConfig;
use synapse_core::error::{Error, Result};
use synapse_core::tokenize::KeywordTokenizer;
use synapse_core::traits::{ChunkStore, Embedder, VectorIndex};
use synapse_core::types::{Candidate, ChunkRecord, VectorHit};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Saturating length bonus: rewards chunks approaching the target size,
/// never exceeds 1, and is 0 for empty text.
pub fn length_bonus(words: usize, target_words: usize) -> f32 {
    if words == 0 || target_words == 0 {
        return 0.0;
    }
    (words as f32 / target_words as f32).min(1.0)
}

pub struct HybridRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn ChunkStore>,
    config: RetrievalConfig,
    tokenizer: KeywordTokenizer,
}

impl HybridRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn ChunkStore>,
        config: RetrievalConfig,
    ) -> Result<Self> {
        config.validate()?;
        let tokenizer = KeywordTokenizer::from_config(&config);
        Ok(Self { embedder, index, store, config, tokenizer })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Embed the query and return the top `k` candidates by combined score.
    ///
    /// An empty index yields an empty list, never an error. A hit whose chunk
    /// cannot be fetched from the store is skipped, not fatal.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Candidate>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_vec = self.embed_query(query).await?;
        let fetch = (k * self.config.overfetch_factor).max(self.config.min_overfetch);
        let hits = timeout(self.config.call_timeout(), self.index.search(&query_vec, fetch))
            .await
            .map_err(|_| Error::IndexUnavailable("vector search timed out".into()))??;
        if hits.is_empty() {
            debug!(query, "no hits from vector index");
            return Ok(Vec::new());
        }

        let query_terms = self.tokenizer.tokenize(query);
        let mut candidates = Vec::with_capacity(hits.len());
        for hit in dedupe_hits(hits) {
            let chunk = match timeout(self.config.call_timeout(), self.store.get(&hit.chunk_id))
                .await
            {
                Ok(Ok(chunk)) => chunk,
                Ok(Err(e)) => {
                    warn!(chunk_id = %hit.chunk_id, error = %e, "skipping unfetchable chunk");
                    continue;
                }
                Err(_) => {
                    warn!(chunk_id = %hit.chunk_id, "chunk store lookup timed out, skipping");
                    continue;
                }
            };
            candidates.push(self.score(chunk, hit.similarity, &query_terms));
        }

        candidates.sort_by(compare_candidates);
        candidates.truncate(k);
        debug!(query, returned = candidates.len(), "retrieval complete");
        Ok(candidates)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let vec = timeout(self.config.call_timeout(), self.embedder.embed(query))
            .await
            .map_err(|_| Error::Embedding("query embedding timed out".into()))??;
        if vec.len() != self.embedder.dim() {
            return Err(Error::Embedding(format!(
                "dimension mismatch: embedder produced {} values, expected {}",
                vec.len(),
                self.embedder.dim()
            )));
        }
        Ok(vec)
    }

    fn score(
        &self,
        chunk: ChunkRecord,
        semantic_score: f32,
        query_terms: &std::collections::HashSet<String>,
    ) -> Candidate {
        let keyword_overlap = self.tokenizer.overlap(query_terms, &chunk.text);
        let length_bonus =
            length_bonus(chunk.text.split_whitespace().count(), self.config.target_chunk_words);
        let w = &self.config.weights;
        let combined_score =
            w.semantic * semantic_score + w.keyword * keyword_overlap + w.length * length_bonus;
        Candidate { chunk, semantic_score, keyword_overlap, length_bonus, combined_score }
    }
}

/// Keep one hit per chunk id, preferring the higher similarity.
fn dedupe_hits(hits: Vec<VectorHit>) -> Vec<VectorHit> {
    let mut by_id: HashMap<String, VectorHit> = HashMap::new();
    for hit in hits {
        by_id
            .entry(hit.chunk_id.clone())
            .and_modify(|old| {
                if hit.similarity > old.similarity {
                    *old = hit.clone();
                }
            })
            .or_insert(hit);
    }
    let mut unique: Vec<VectorHit> = by_id.into_values().collect();
    // Stable input for the scorer regardless of map iteration order.
    unique.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    unique
}

fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.combined_score
        .partial_cmp(&a.combined_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            b.semantic_score.partial_cmp(&a.semantic_score).unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.chunk.id.cmp(&b.chunk.id))
}
