//! Deterministic feature-hashing embedder.
//!
//! The production embedding model is an external capability; this crate ships
//! the deterministic implementation used by the CLI demo and by tests. Same
//! text always maps to the same l2-normalized vector, and token overlap
//! between two texts shows up as cosine similarity between their vectors.

use std::sync::Arc;

use async_trait::async_trait;
use synapse_core::error::{Error, Result};
use synapse_core::traits::Embedder;

pub const DEFAULT_DIM: usize = 256;

pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;

        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let token = token.to_lowercase();
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIM)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(Error::Embedding("cannot embed empty text".into()));
        }
        Ok(self.embed_sync(text))
    }
}

pub fn default_embedder() -> Arc<dyn Embedder> {
    Arc::new(HashEmbedder::default())
}
