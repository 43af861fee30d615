use thiserror::Error;

/// Failure taxonomy for the query pipeline.
///
/// `Embedding` and `IndexUnavailable` on the query itself are fatal to that
/// query. `ChunkNotFound`, `Extraction` and `Compression` are recovered
/// per-candidate by the callers and never abort a whole query on their own.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Chunk not found: {0}")]
    ChunkNotFound(String),

    #[error("Span extraction failed: {0}")]
    Extraction(String),

    #[error("Answer compression failed: {0}")]
    Compression(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
