//! Capability traits for the external collaborators of the query pipeline.
//!
//! Embedding, vector search, chunk lookup and the language-model calls are all
//! potentially long-latency operations, so every capability is async. Callers
//! wrap each call in a per-call timeout; implementations do not need their own.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChunkRecord, MemoryRecord, SpanProposal, VectorHit};

/// Maps text to a fixed-dimension vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Nearest-neighbor lookup over stored chunk vectors.
///
/// An empty index returns an empty hit list, never an error.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<VectorHit>>;
}

/// Maps a chunk id to its text and source metadata.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<ChunkRecord>;
}

/// Language-model capability: propose the smallest span of `chunk_text`
/// answering `query`, or flag the chunk as not answering at all.
#[async_trait]
pub trait SpanExtractor: Send + Sync {
    async fn extract(&self, query: &str, chunk_text: &str) -> Result<SpanProposal>;
}

/// Language-model capability: rewrite a span down to `max_words` words
/// without changing its factual content.
#[async_trait]
pub trait SpanCompressor: Send + Sync {
    async fn compress(&self, span: &str, max_words: usize) -> Result<String>;
}

/// The research-memory corpus: searchable like any chunk corpus, plus an
/// append-only write path. Implementations must serialize appends so that
/// concurrent `record` calls cannot corrupt each other.
#[async_trait]
pub trait MemoryIndex: VectorIndex + ChunkStore {
    /// Append a record unless one with the same dedup key already exists.
    /// Returns whether the record was actually added.
    async fn append(&self, record: MemoryRecord, embedding: Vec<f32>) -> Result<bool>;

    async fn contains(&self, dedup_key: &str) -> Result<bool>;

    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
