//! Append-only in-memory store for research-memory records.
//!
//! Serves as both corpus views the retriever needs (vector index + chunk
//! store) plus the append path. Appends and the dedup check happen under one
//! write guard, so concurrent `record` calls cannot race each other into
//! duplicates.

use std::cmp::Ordering;
use std::collections::HashSet;

use async_trait::async_trait;
use synapse_core::error::{Error, Result};
use synapse_core::traits::{ChunkStore, MemoryIndex, VectorIndex};
use synapse_core::types::{ChunkRecord, MemoryRecord, VectorHit};
use tokio::sync::RwLock;

struct StoredEntry {
    id: String,
    record: MemoryRecord,
    embedding: Vec<f32>,
}

#[derive(Default)]
struct Inner {
    entries: Vec<StoredEntry>,
    keys: HashSet<String>,
}

pub struct MemoryStore {
    dim: usize,
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new(dim: usize) -> Self {
        Self { dim, inner: RwLock::new(Inner::default()) }
    }

    pub fn dim(&self) -> usize {
        self.dim
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
impl VectorIndex for MemoryStore {
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<VectorHit>> {
        if query.len() != self.dim {
            return Err(Error::IndexUnavailable(format!(
                "query vector has {} values, index expects {}",
                query.len(),
                self.dim
            )));
        }
        let inner = self.inner.read().await;
        let mut hits: Vec<VectorHit> = inner
            .entries
            .iter()
            .map(|e| VectorHit {
                chunk_id: e.id.clone(),
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
impl ChunkStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<ChunkRecord> {
        let inner = self.inner.read().await;
        inner
            .entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| ChunkRecord {
                id: e.id.clone(),
                text: e.record.rendered(),
                source_path: format!("memory://{}", e.id),
                position: 0,
            })
            .ok_or_else(|| Error::ChunkNotFound(id.to_string()))
    }
}

#[async_trait]
impl MemoryIndex for MemoryStore {
    async fn append(&self, record: MemoryRecord, embedding: Vec<f32>) -> Result<bool> {
        if embedding.len() != self.dim {
            return Err(Error::IndexUnavailable(format!(
                "embedding has {} values, index expects {}",
                embedding.len(),
                self.dim
            )));
        }
        let mut inner = self.inner.write().await;
        let key = record.dedup_key();
        if inner.keys.contains(&key) {
            return Ok(false);
        }
        let id = format!("memory:{:06}", inner.entries.len());
        inner.keys.insert(key);
        inner.entries.push(StoredEntry { id, record, embedding });
        Ok(true)
    }

    async fn contains(&self, dedup_key: &str) -> Result<bool> {
        Ok(self.inner.read().await.keys.contains(dedup_key))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.inner.read().await.entries.len())
    }
}
