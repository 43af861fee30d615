//! Domain types shared by the retrieval, answer and memory layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// Sentinel answer text returned when no extraction clears the confidence
/// threshold. A successful query with zero evidence, not an error.
pub const NO_CONFIDENT_ANSWER: &str = "no confident answer found";

/// The corpus-store view of an indexed passage.
///
/// - `id`: globally unique chunk identifier
/// - `text`: the passage payload (roughly 200 words)
/// - `source_path`: original path to the source file
/// - `position`: offset of the passage within the source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: ChunkId,
    pub text: String,
    pub source_path: String,
    pub position: usize,
}

/// A single nearest-neighbor hit from a vector index.
///
/// `similarity` is index-native but higher is always better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorHit {
    pub chunk_id: ChunkId,
    pub similarity: f32,
}

/// A retrieval candidate with its hybrid score breakdown.
///
/// `combined_score` is a deterministic function of the three component
/// scores and the configured weights; it is never recomputed downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub chunk: ChunkRecord,
    pub semantic_score: f32,
    pub keyword_overlap: f32,
    pub length_bonus: f32,
    pub combined_score: f32,
}

/// How an extracted span relates to the source text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExtractionFlag {
    /// The span is literally present in the chunk.
    Direct,
    /// The span restates chunk content without being a literal copy.
    Inferred,
    /// The chunk does not answer the query (or the call failed).
    NotFound,
}

/// What a span extractor proposes for one (query, chunk) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanProposal {
    pub span: Option<String>,
    pub confidence: f32,
    pub flag: ExtractionFlag,
}

impl SpanProposal {
    pub fn not_found() -> Self {
        Self { span: None, confidence: 0.0, flag: ExtractionFlag::NotFound }
    }
}

/// A per-chunk extraction result tied back to its source chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    pub chunk_id: ChunkId,
    pub span: Option<String>,
    pub confidence: f32,
    pub flag: ExtractionFlag,
}

/// Coarse confidence bands surfaced to callers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
    None,
}

impl ConfidenceLevel {
    pub fn from_score(score: f32) -> Self {
        if score >= 0.7 {
            ConfidenceLevel::High
        } else if score >= 0.5 {
            ConfidenceLevel::Medium
        } else if score >= 0.3 {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::None
        }
    }
}

/// The final result of one query.
///
/// `supporting_chunk_ids` is always a subsequence of the candidate list the
/// answerer was given, in original rank order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub confidence: f32,
    pub confidence_level: ConfidenceLevel,
    pub supporting_chunk_ids: Vec<ChunkId>,
    pub compressed: bool,
}

impl Answer {
    /// The designed "no evidence" outcome.
    pub fn no_confident_answer() -> Self {
        Self {
            text: NO_CONFIDENT_ANSWER.to_string(),
            confidence: 0.0,
            confidence_level: ConfidenceLevel::None,
            supporting_chunk_ids: Vec::new(),
            compressed: false,
        }
    }

    pub fn is_confident(&self) -> bool {
        self.confidence > 0.0 && !self.supporting_chunk_ids.is_empty()
    }
}

/// One past (query, answer) interaction stored in research memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub query: String,
    pub answer: String,
    pub recorded_at: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(query: impl Into<String>, answer: impl Into<String>) -> Self {
        Self { query: query.into(), answer: answer.into(), recorded_at: Utc::now() }
    }

    /// Text that gets embedded and matched during recall.
    pub fn rendered(&self) -> String {
        format!("Query: {}\nAnswer: {}", self.query, self.answer)
    }

    /// Append-dedup key. Two records with the same key are the same interaction.
    pub fn dedup_key(&self) -> String {
        let prefix: String = self.answer.chars().take(200).collect();
        format!("{}|{}", self.query.to_lowercase(), prefix)
    }
}

/// A unique-by-source document entry for callers that display result lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentHit {
    pub source_path: String,
    pub preview: String,
    pub score: f32,
}
