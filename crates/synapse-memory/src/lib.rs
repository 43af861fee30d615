//! Research memory: a second hybrid-retrieval corpus over the system's own
//! query/answer history.
//!
//! `record` embeds the rendered pair and appends it unless the same
//! interaction was already stored. `recall` runs the exact retrieval
//! algorithm the document corpus uses, scoped to this index.

pub mod store;

use std::sync::Arc;

use synapse_core::config::RetrievalConfig;
use synapse_core::error::{Error, Result};
use synapse_core::traits::{Embedder, MemoryIndex};
use synapse_core::types::{Candidate, MemoryRecord};
use synapse_retrieve::HybridRetriever;
use tokio::time::timeout;
use tracing::debug;

pub use store::MemoryStore;

pub struct ResearchMemory<M: MemoryIndex + 'static> {
    embedder: Arc<dyn Embedder>,
    index: Arc<M>,
    retriever: HybridRetriever,
    config: RetrievalConfig,
}

impl<M: MemoryIndex + 'static> ResearchMemory<M> {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<M>,
        config: RetrievalConfig,
    ) -> Result<Self> {
        let retriever = HybridRetriever::new(
            Arc::clone(&embedder),
            Arc::clone(&index) as Arc<dyn synapse_core::traits::VectorIndex>,
            Arc::clone(&index) as Arc<dyn synapse_core::traits::ChunkStore>,
            config.clone(),
        )?;
        Ok(Self { embedder, index, retriever, config })
    }

    /// Store one served (query, answer) interaction. Returns whether a new
    /// record was written; a repeat of an already-stored interaction is a
    /// no-op, not an error.
    pub async fn record(&self, query: &str, answer_text: &str) -> Result<bool> {
        if query.trim().is_empty() || answer_text.trim().is_empty() {
            return Ok(false);
        }
        let record = MemoryRecord::new(query.trim(), answer_text.trim());
        if self.index.contains(&record.dedup_key()).await? {
            debug!(query, "interaction already recorded");
            return Ok(false);
        }
        let embedding = timeout(self.config.call_timeout(), self.embedder.embed(&record.rendered()))
            .await
            .map_err(|_| Error::Embedding("memory embedding timed out".into()))??;
        let added = self.index.append(record, embedding).await?;
        debug!(query, added, "research memory write");
        Ok(added)
    }

    /// Past interactions related to `query`, ranked by the same hybrid score
    /// as document retrieval.
    pub async fn recall(&self, query: &str, k: usize) -> Result<Vec<Candidate>> {
        self.retriever.retrieve(query, k).await
    }
}
