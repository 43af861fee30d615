//! Language-model capability implementations for the answer layer.
//!
//! `openai` talks to any OpenAI-compatible chat-completions endpoint.
//! `heuristic` is the no-network fallback extractor used when no API key is
//! configured. `text` holds the cleanup helpers both paths share.

pub mod heuristic;
pub mod openai;
pub mod text;

pub use heuristic::HeuristicExtractor;
pub use openai::OpenAiClient;
