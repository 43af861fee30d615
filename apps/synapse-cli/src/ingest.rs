//! Filesystem ingestion: walk a directory of .txt files and cut each file
//! into word-bounded chunks, one paragraph at a time.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use synapse_core::types::ChunkRecord;
use synapse_extract::text;
use tracing::info;

/// Paragraphs longer than this get split into overlapping word windows.
const MAX_CHUNK_WORDS: usize = 300;
const OVERLAP_WORDS: usize = 60;

pub fn chunk_directory(root: &Path) -> Result<Vec<ChunkRecord>> {
    let files = txt_files(root);
    if files.is_empty() {
        info!(dir = %root.display(), "no .txt files found");
        return Ok(Vec::new());
    }
    let mut chunks = Vec::new();
    for path in &files {
        let content = read_lossy(path)?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "doc".to_string());
        chunks.extend(chunk_text(&content, &stem, &path.to_string_lossy()));
    }
    info!(files = files.len(), chunks = chunks.len(), "ingest complete");
    Ok(chunks)
}

/// Cut one document into chunks. Paragraph boundaries are kept where the
/// paragraph fits the word budget; oversized paragraphs become overlapping
/// windows so no fact is stranded on a window edge.
pub fn chunk_text(content: &str, doc_id: &str, source_path: &str) -> Vec<ChunkRecord> {
    let mut chunks = Vec::new();
    for paragraph in content.split("\n\n") {
        let cleaned = text::clean(paragraph);
        if cleaned.is_empty() {
            continue;
        }
        if text::word_count(&cleaned) <= MAX_CHUNK_WORDS {
            push_chunk(&mut chunks, doc_id, source_path, cleaned);
        } else {
            for window in word_windows(&cleaned) {
                push_chunk(&mut chunks, doc_id, source_path, window);
            }
        }
    }
    chunks
}

fn push_chunk(chunks: &mut Vec<ChunkRecord>, doc_id: &str, source_path: &str, text: String) {
    let position = chunks.len();
    chunks.push(ChunkRecord {
        id: format!("{doc_id}:{position}"),
        text,
        source_path: source_path.to_string(),
        position,
    });
}

fn word_windows(paragraph: &str) -> Vec<String> {
    let words: Vec<&str> = paragraph.split_whitespace().collect();
    let mut windows = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + MAX_CHUNK_WORDS).min(words.len());
        windows.push(words[start..end].join(" "));
        if end >= words.len() {
            break;
        }
        start = end - OVERLAP_WORDS;
    }
    windows
}

fn read_lossy(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(path)?).to_string()),
    }
}

fn txt_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("txt"))
        .collect();
    files.sort();
    files
}
