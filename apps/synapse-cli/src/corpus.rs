//! In-memory document corpus built once at startup from ingested chunks.
//!
//! Read-only after construction, so the trait impls need no locking.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use synapse_core::error::{Error, Result};
use synapse_core::traits::{ChunkStore, VectorIndex};
use synapse_core::types::{ChunkRecord, VectorHit};

struct Entry {
    chunk: ChunkRecord,
    embedding: Vec<f32>,
}

pub struct CorpusStore {
    dim: usize,
    entries: Vec<Entry>,
    by_id: HashMap<String, usize>,
}

impl CorpusStore {
    pub fn new(dim: usize) -> Self {
        Self { dim, entries: Vec::new(), by_id: HashMap::new() }
    }

    pub fn insert(&mut self, chunk: ChunkRecord, embedding: Vec<f32>) -> Result<()> {
        if embedding.len() != self.dim {
            return Err(Error::IndexUnavailable(format!(
                "embedding has {} values, corpus expects {}",
                embedding.len(),
                self.dim
            )));
        }
        self.by_id.insert(chunk.id.clone(), self.entries.len());
        self.entries.push(Entry { chunk, embedding });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndex for CorpusStore {
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<VectorHit>> {
        if query.len() != self.dim {
            return Err(Error::IndexUnavailable(format!(
                "query vector has {} values, corpus expects {}",
                query.len(),
                self.dim
            )));
        }
        let mut hits: Vec<VectorHit> = self
            .entries
            .iter()
            .map(|e| VectorHit {
                chunk_id: e.chunk.id.clone(),
                similarity: cosine(&e.embedding, query),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        hits.truncate(k);
        Ok(hits)
    }
}

#[async_trait]
impl ChunkStore for CorpusStore {
    async fn get(&self, id: &str) -> Result<ChunkRecord> {
        self.by_id
            .get(id)
            .map(|&i| self.entries[i].chunk.clone())
            .ok_or_else(|| Error::ChunkNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, text: &str) -> ChunkRecord {
        ChunkRecord {
            id: id.to_string(),
            text: text.to_string(),
            source_path: format!("/docs/{id}.txt"),
            position: 0,
        }
    }

    #[tokio::test]
    async fn search_ranks_by_cosine_similarity() {
        let mut store = CorpusStore::new(2);
        store.insert(chunk("a", "alpha"), vec![1.0, 0.0]).expect("insert");
        store.insert(chunk("b", "beta"), vec![0.0, 1.0]).expect("insert");

        let hits = store.search(&[1.0, 0.1], 2).await.expect("search");
        assert_eq!(hits[0].chunk_id, "a");
        assert!(hits[0].similarity > hits[1].similarity);
    }

    #[test]
    fn store_is_empty_until_first_insert() {
        let mut store = CorpusStore::new(2);
        assert!(store.is_empty());
        store.insert(chunk("a", "alpha"), vec![1.0, 0.0]).expect("insert");
        assert!(!store.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn get_unknown_id_is_an_error() {
        let store = CorpusStore::new(2);
        assert!(store.get("missing").await.is_err());
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let mut store = CorpusStore::new(2);
        assert!(store.insert(chunk("a", "alpha"), vec![1.0]).is_err());
        assert!(store.search(&[1.0, 0.0, 0.0], 1).await.is_err());
    }
}
