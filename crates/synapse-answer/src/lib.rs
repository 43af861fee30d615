//! Extractive answer pipeline.
//!
//! Four stages over the retrieved candidates:
//! 1. per-chunk span extraction, fanned out with a bounded concurrency limit
//!    and joined back in candidate order;
//! 2. confidence-based selection with deterministic tie-breaking;
//! 3. a threshold gate that abstains with the no-confident-answer sentinel;
//! 4. compression of overlong spans, falling back to word truncation when the
//!    compressor capability fails.
//!
//! Per-chunk failures are never fatal: a timed-out or malformed extraction
//! call counts as "this chunk does not answer" and the pipeline moves on.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use synapse_core::config::AnswerConfig;
use synapse_core::error::Result;
use synapse_core::tokenize::KeywordTokenizer;
use synapse_core::traits::{SpanCompressor, SpanExtractor};
use synapse_core::types::{
    Answer, Candidate, ConfidenceLevel, Extraction, ExtractionFlag,
};
use synapse_extract::text::{clean, truncate_words, word_count};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Chunks with fewer significant words than this are not worth a model call.
const MIN_CHUNK_WORDS: usize = 5;

/// Spans containing these phrases describe the document instead of answering.
const GENERIC_PHRASES: &[&str] =
    &["the document", "this document", "the text", "information about", "details about"];

pub struct ExtractiveAnswerer {
    extractor: Arc<dyn SpanExtractor>,
    compressor: Option<Arc<dyn SpanCompressor>>,
    config: AnswerConfig,
    tokenizer: KeywordTokenizer,
}

struct Ranked {
    rank: usize,
    extraction: Extraction,
    selection_score: f32,
    combined_score: f32,
}

impl ExtractiveAnswerer {
    pub fn new(
        extractor: Arc<dyn SpanExtractor>,
        compressor: Option<Arc<dyn SpanCompressor>>,
        config: AnswerConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { extractor, compressor, config, tokenizer: KeywordTokenizer::default() })
    }

    pub fn config(&self) -> &AnswerConfig {
        &self.config
    }

    /// Produce the final answer for `query` from ranked retrieval candidates.
    ///
    /// Always returns an `Answer`; "no evidence" and "every call failed" both
    /// map to the sentinel, not to an error.
    pub async fn answer(&self, query: &str, candidates: &[Candidate]) -> Answer {
        if candidates.is_empty() {
            return Answer::no_confident_answer();
        }

        let prepared = self.prepare_chunks(candidates);
        let extractions = self.extract_all(query, &prepared).await;

        let supported = self.rank_extractions(query, candidates, &extractions);
        let Some(best_idx) = supported.first().map(|r| r.rank) else {
            debug!(query, "no usable extraction from any candidate");
            return Answer::no_confident_answer();
        };
        let best = &extractions[best_idx];

        if best.confidence < self.config.min_confidence {
            debug!(query, confidence = best.confidence, "below confidence threshold");
            return Answer::no_confident_answer();
        }

        // Supporting ids keep the original candidate order, not selection order.
        let mut supporting: Vec<usize> = supported.iter().map(|r| r.rank).collect();
        supporting.sort_unstable();
        let supporting_chunk_ids =
            supporting.into_iter().map(|i| candidates[i].chunk.id.clone()).collect();

        let span = best.span.clone().unwrap_or_default();
        let (text, compressed) = self.compress_if_needed(&span).await;

        Answer {
            text,
            confidence: best.confidence,
            confidence_level: ConfidenceLevel::from_score(best.confidence),
            supporting_chunk_ids,
            compressed,
        }
    }

    /// Top candidates with cleaned text, trimmed to the total word budget.
    fn prepare_chunks(&self, candidates: &[Candidate]) -> Vec<(String, String)> {
        let mut remaining = self.config.extraction_word_budget;
        let mut prepared = Vec::new();
        for candidate in candidates.iter().take(self.config.max_chunks) {
            let id = candidate.chunk.id.clone();
            if remaining == 0 {
                prepared.push((id, String::new()));
                continue;
            }
            let text = clean(&candidate.chunk.text);
            let words: Vec<&str> = text.split_whitespace().collect();
            let take = words.len().min(remaining);
            remaining -= take;
            prepared.push((id, words[..take].join(" ")));
        }
        prepared
    }

    /// Stage 1: bounded concurrent extraction, joined in input order.
    async fn extract_all(&self, query: &str, prepared: &[(String, String)]) -> Vec<Extraction> {
        // `buffered` polls up to `extract_concurrency` calls at once and
        // yields results in input order, so ranking survives concurrency.
        stream::iter(prepared.iter())
            .map(|(id, text)| self.extract_one(query, id, text))
            .buffered(self.config.extract_concurrency)
            .collect()
            .await
    }

    async fn extract_one(&self, query: &str, chunk_id: &str, text: &str) -> Extraction {
        let not_found = |chunk_id: String| Extraction {
            chunk_id,
            span: None,
            confidence: 0.0,
            flag: ExtractionFlag::NotFound,
        };
        let chunk_id = chunk_id.to_string();

        if word_count(text) < MIN_CHUNK_WORDS {
            return not_found(chunk_id);
        }

        match timeout(self.config.call_timeout(), self.extractor.extract(query, text)).await {
            Ok(Ok(proposal)) => Extraction {
                chunk_id,
                span: proposal.span.map(|s| clean(&s)).filter(|s| !s.is_empty()),
                confidence: proposal.confidence.clamp(0.0, 1.0),
                flag: proposal.flag,
            },
            Ok(Err(e)) => {
                warn!(chunk_id = %chunk_id, error = %e, "extraction call failed, treating as not found");
                not_found(chunk_id)
            }
            Err(_) => {
                warn!(chunk_id = %chunk_id, "extraction call timed out, treating as not found");
                not_found(chunk_id)
            }
        }
    }

    /// Stage 2: drop unusable extractions and order the rest by selection
    /// score, source combined score, then original rank.
    fn rank_extractions(
        &self,
        query: &str,
        candidates: &[Candidate],
        extractions: &[Extraction],
    ) -> Vec<Ranked> {
        let query_terms = self.tokenizer.tokenize(query);
        let mut ranked: Vec<Ranked> = extractions
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                e.flag != ExtractionFlag::NotFound
                    && e.span.is_some()
                    && e.confidence >= self.config.proposal_floor
            })
            .map(|(rank, extraction)| {
                let span = extraction.span.as_deref().unwrap_or_default();
                let selection_score =
                    self.selection_score(extraction.confidence, span, &query_terms);
                Ranked {
                    rank,
                    extraction: extraction.clone(),
                    selection_score,
                    combined_score: candidates[rank].combined_score,
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.selection_score
                .partial_cmp(&a.selection_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.combined_score
                        .partial_cmp(&a.combined_score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.rank.cmp(&b.rank))
        });
        for r in &ranked {
            debug!(
                rank = r.rank,
                confidence = r.extraction.confidence,
                selection_score = r.selection_score,
                "extraction candidate"
            );
        }
        ranked
    }

    /// Confidence dominates; query-term overlap and brevity shape the rest,
    /// and spans that describe the document instead of answering are demoted.
    fn selection_score(
        &self,
        confidence: f32,
        span: &str,
        query_terms: &std::collections::HashSet<String>,
    ) -> f32 {
        let mut score = confidence * 0.6;
        score += self.tokenizer.overlap(query_terms, span) * 0.25;

        let words = word_count(span);
        if (3..=18).contains(&words) {
            score += 0.1;
        } else if words > 30 {
            score -= 0.1;
        }

        let lowered = span.to_lowercase();
        if GENERIC_PHRASES.iter().any(|p| lowered.contains(p)) {
            score -= 0.15;
        }
        score
    }

    /// Stage 4: rewrite overlong spans down to the word limit.
    async fn compress_if_needed(&self, span: &str) -> (String, bool) {
        let max_words = self.config.max_answer_words;
        if word_count(span) <= max_words {
            return (span.to_string(), false);
        }

        if let Some(compressor) = &self.compressor {
            match timeout(self.config.call_timeout(), compressor.compress(span, max_words)).await
            {
                Ok(Ok(compressed)) if word_count(&compressed) <= max_words => {
                    return (compressed, true);
                }
                Ok(Ok(_)) => {
                    warn!("compressor exceeded word limit, falling back to truncation");
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "compression failed, falling back to truncation");
                }
                Err(_) => {
                    warn!("compression timed out, falling back to truncation");
                }
            }
        }
        (truncate_words(span, max_words), true)
    }
}
