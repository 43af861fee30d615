use std::sync::Arc;

use synapse_core::config::RetrievalConfig;
use synapse_core::traits::{Embedder, MemoryIndex};
use synapse_embed::HashEmbedder;
use synapse_memory::{MemoryStore, ResearchMemory};

fn memory() -> ResearchMemory<MemoryStore> {
    let embedder = Arc::new(HashEmbedder::default());
    let store = Arc::new(MemoryStore::new(embedder.dim()));
    ResearchMemory::new(embedder, store, RetrievalConfig::default()).expect("config valid")
}

#[tokio::test]
async fn record_then_recall_finds_related_interaction() {
    let m = memory();
    m.record("What is my passport number?", "X1234567")
        .await
        .expect("record");
    m.record("When does my lease start?", "June 3, 2024").await.expect("record");

    let related = m.recall("passport number lookup", 3).await.expect("recall");
    assert!(!related.is_empty());
    assert!(
        related[0].chunk.text.contains("X1234567"),
        "top recall was: {}",
        related[0].chunk.text
    );
}

#[tokio::test]
async fn duplicate_interaction_is_not_stored_twice() {
    let embedder = Arc::new(HashEmbedder::default());
    let store = Arc::new(MemoryStore::new(synapse_embed::DEFAULT_DIM));
    let m = ResearchMemory::new(embedder, Arc::clone(&store), RetrievalConfig::default())
        .expect("config valid");

    assert!(m.record("what is my salary?", "$120,000").await.expect("record"));
    assert!(!m.record("What is MY salary?", "$120,000").await.expect("record"));
    assert_eq!(store.len().await.expect("len"), 1);
}

#[tokio::test]
async fn empty_query_or_answer_is_a_noop() {
    let m = memory();
    assert!(!m.record("", "answer").await.expect("record"));
    assert!(!m.record("query", "   ").await.expect("record"));
}

#[tokio::test]
async fn recall_on_empty_memory_returns_empty() {
    let m = memory();
    let related = m.recall("anything", 5).await.expect("recall");
    assert!(related.is_empty());
}

#[tokio::test]
async fn concurrent_records_do_not_corrupt_the_store() {
    let embedder = Arc::new(HashEmbedder::default());
    let store = Arc::new(MemoryStore::new(synapse_embed::DEFAULT_DIM));
    let m = Arc::new(
        ResearchMemory::new(embedder, Arc::clone(&store), RetrievalConfig::default())
            .expect("config valid"),
    );

    let mut handles = Vec::new();
    for i in 0..16 {
        let m = Arc::clone(&m);
        handles.push(tokio::spawn(async move {
            m.record(&format!("query number {i}"), &format!("answer number {i}")).await
        }));
    }
    for h in handles {
        assert!(h.await.expect("join").expect("record"));
    }
    assert_eq!(store.len().await.expect("len"), 16);
}
