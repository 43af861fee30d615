//! One-shot and interactive search over a directory of .txt documents.
//!
//! Usage:
//!   synapse ask "<query>" [data_dir]     answer a question from the documents
//!   synapse find "<query>" [data_dir]    list matching documents, no extraction
//!   synapse repl [data_dir]              interactive loop, remembers answers

mod corpus;
mod ingest;

use std::env;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use synapse_answer::ExtractiveAnswerer;
use synapse_core::config::{resolve_with_base, Config};
use synapse_core::traits::{ChunkStore, Embedder, SpanCompressor, SpanExtractor, VectorIndex};
use synapse_core::types::Candidate;
use synapse_extract::{HeuristicExtractor, OpenAiClient};
use synapse_memory::{MemoryStore, ResearchMemory};
use synapse_retrieve::HybridRetriever;
use synapse_search::{SearchResponse, SearchService, DEFAULT_TOP_K};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use corpus::CorpusStore;

fn usage(prog: &str) -> ! {
    eprintln!("Usage: {prog} <ask|find|repl> [\"<query>\"] [data_dir]");
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::load()?;
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        usage(&prog);
    }
    let cmd = args.remove(0);

    match cmd.as_str() {
        "ask" | "find" => {
            if args.is_empty() {
                usage(&prog);
            }
            let query = args.remove(0);
            let service = build_service(&config, data_dir(&config, args.first())).await?;
            if cmd == "ask" {
                print_response(&service.search(&query).await?);
            } else {
                print_candidates(&service.retrieve(&query, DEFAULT_TOP_K).await?);
            }
        }
        "repl" => {
            let service = build_service(&config, data_dir(&config, args.first())).await?;
            repl(&service).await?;
        }
        _ => usage(&prog),
    }
    Ok(())
}

fn data_dir(config: &Config, arg: Option<&String>) -> PathBuf {
    let base = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let dir = match arg {
        Some(dir) => dir.clone(),
        None => config.get("data.txt_dir").unwrap_or_else(|_| "./data".to_string()),
    };
    resolve_with_base(&base, dir)
}

async fn build_service(
    config: &Config,
    dir: PathBuf,
) -> anyhow::Result<SearchService<MemoryStore>> {
    let chunks = ingest::chunk_directory(&dir)?;
    let embedder = synapse_embed::default_embedder();

    let mut store = CorpusStore::new(embedder.dim());
    for chunk in chunks {
        match embedder.embed(&chunk.text).await {
            Ok(embedding) => store.insert(chunk, embedding)?,
            Err(e) => warn!(chunk_id = %chunk.id, error = %e, "skipping unembeddable chunk"),
        }
    }
    if store.is_empty() {
        warn!(dir = %dir.display(), "no chunks indexed, queries will find nothing");
    }
    println!("Indexed {} chunks from {}", store.len(), dir.display());
    let store = Arc::new(store);

    let retrieval = config.retrieval()?;
    let retriever = HybridRetriever::new(
        Arc::clone(&embedder),
        Arc::clone(&store) as Arc<dyn VectorIndex>,
        store as Arc<dyn ChunkStore>,
        retrieval.clone(),
    )?;

    let answerer = match OpenAiClient::from_env() {
        Some(client) => {
            let client = Arc::new(client);
            ExtractiveAnswerer::new(
                Arc::clone(&client) as Arc<dyn SpanExtractor>,
                Some(client as Arc<dyn SpanCompressor>),
                config.answer()?,
            )?
        }
        None => {
            println!("OPENAI_API_KEY not set, using the offline heuristic extractor");
            ExtractiveAnswerer::new(Arc::new(HeuristicExtractor::default()), None, config.answer()?)?
        }
    };

    let memory_store = Arc::new(MemoryStore::new(embedder.dim()));
    let memory = ResearchMemory::new(embedder, memory_store, retrieval)?;

    Ok(SearchService::new(retriever, answerer, memory))
}

fn print_response(response: &SearchResponse) {
    println!();
    println!("Answer: {}", response.answer.text);
    if response.answer.is_confident() {
        println!(
            "Confidence: {:.2} ({:?})",
            response.answer.confidence, response.answer.confidence_level
        );
        if !response.answer.supporting_chunk_ids.is_empty() {
            println!("Supported by: {}", response.answer.supporting_chunk_ids.join(", "));
        }
    }
    if !response.documents.is_empty() {
        println!("\nDocuments:");
        for doc in &response.documents {
            println!("  {:.3}  {}", doc.score, doc.source_path);
            println!("         {}", doc.preview);
        }
    }
}

fn print_candidates(candidates: &[Candidate]) {
    if candidates.is_empty() {
        println!("No matches.");
        return;
    }
    for c in candidates {
        println!(
            "{:.3}  {}  (semantic {:.3}, keywords {:.2})",
            c.combined_score, c.chunk.id, c.semantic_score, c.keyword_overlap
        );
        println!("       {}", c.chunk.source_path);
    }
}

async fn repl(service: &SearchService<MemoryStore>) -> anyhow::Result<()> {
    println!("Type a question, or an empty line to quit.");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let query = line?;
        let query = query.trim();
        if query.is_empty() {
            break;
        }
        let related = service.recall_related(query, 2).await?;
        if !related.is_empty() {
            println!("\nFrom earlier this session:");
            for c in &related {
                for l in c.chunk.text.lines() {
                    println!("  {l}");
                }
            }
        }
        print_response(&service.search(query).await?);
        println!();
    }
    Ok(())
}
