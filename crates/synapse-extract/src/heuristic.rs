//! Pattern-based extraction fallback.
//!
//! When no language-model endpoint is configured, answers are proposed by
//! scoring sentences against the query and cutting a minimal span around a
//! pattern match typed by the question (amounts, dates, names, places).
//! Confidence stays modest by construction; the scoring never reaches the
//! levels a model-backed extraction can report.

use std::collections::HashSet;

use async_trait::async_trait;
use regex::Regex;
use synapse_core::error::Result;
use synapse_core::tokenize::KeywordTokenizer;
use synapse_core::traits::SpanExtractor;
use synapse_core::types::{ExtractionFlag, SpanProposal};

use crate::text::{clean, sentences, truncate_words, word_count};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionType {
    Who,
    Where,
    When,
    HowMuch,
    HowMany,
    What,
    Other,
}

pub fn infer_question_type(query: &str) -> QuestionType {
    let lowered = query.trim().to_lowercase();
    if lowered.starts_with("who") {
        return QuestionType::Who;
    }
    if lowered.starts_with("where") {
        return QuestionType::Where;
    }
    if lowered.starts_with("when") {
        return QuestionType::When;
    }
    if lowered.starts_with("how much") {
        return QuestionType::HowMuch;
    }
    if lowered.starts_with("how many") {
        return QuestionType::HowMany;
    }
    if lowered.starts_with("what") {
        return QuestionType::What;
    }
    if ["salary", "pay", "cost", "price", "amount", "compensation"]
        .iter()
        .any(|w| lowered.contains(w))
    {
        return QuestionType::HowMuch;
    }
    if ["date", "when", "start", "begin", "effective"].iter().any(|w| lowered.contains(w)) {
        return QuestionType::When;
    }
    QuestionType::Other
}

const BOILERPLATE_TERMS: &[&str] = &[
    "dear", "sincerely", "regards", "confidential", "page", "attached", "thank you",
    "congratulations", "hereby",
];

/// Sentence score a proposal must exceed; a bare length bonus is not enough.
const PROPOSAL_CUTOFF: f32 = 0.15;

pub struct HeuristicExtractor {
    tokenizer: KeywordTokenizer,
    number: Regex,
    date: Regex,
    name: Regex,
    org: Regex,
    location: Regex,
    copula: Regex,
    direct: Regex,
}

impl HeuristicExtractor {
    pub fn new(tokenizer: KeywordTokenizer) -> Self {
        Self {
            tokenizer,
            number: Regex::new(r"\$\s*\d[\d,]*(?:\.\d{2})?|\d[\d,]+(?:\.\d{2})?")
                .expect("static regex"),
            date: Regex::new(
                r"(?i)\b(?:\d{1,2}[/-]\d{1,2}[/-]\d{2,4}|(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2},?\s*\d{4})\b",
            )
            .expect("static regex"),
            name: Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)+\b").expect("static regex"),
            org: Regex::new(
                r"\b[A-Z][A-Za-z&]*(?:\s+[A-Z][A-Za-z&]*)*\s+(?:Inc|LLC|Corp|Company|Co|Ltd|University|College|Hospital|Bank|Health)\.?\b",
            )
            .expect("static regex"),
            location: Regex::new(r"\b(?:in|at|from|to)\s+([A-Z][a-z]+(?:,?\s+[A-Z][a-z]+)*)")
                .expect("static regex"),
            copula: Regex::new(r"(?i)\b(is|are|was|means|refers to)\b").expect("static regex"),
            direct: Regex::new(r"(?i)\b(is|are|was|were|will be)\s+(a|an|the|\$|\d)")
                .expect("static regex"),
        }
    }

    fn is_boilerplate(sentence: &str) -> bool {
        let lowered = sentence.to_lowercase();
        BOILERPLATE_TERMS.iter().any(|t| lowered.contains(t))
    }

    fn score_sentence(
        &self,
        sentence: &str,
        query_terms: &HashSet<String>,
        qtype: QuestionType,
    ) -> f32 {
        let overlap = if query_terms.is_empty() {
            0.1
        } else {
            self.tokenizer.overlap(query_terms, sentence)
        };

        let type_bonus = match qtype {
            QuestionType::HowMuch | QuestionType::HowMany if self.number.is_match(sentence) => 0.3,
            QuestionType::When if self.date.is_match(sentence) => 0.3,
            QuestionType::Who
                if self.name.is_match(sentence) || self.org.is_match(sentence) =>
            {
                0.25
            }
            QuestionType::Where if self.location.is_match(sentence) => 0.25,
            _ => 0.0,
        };

        let words = word_count(sentence);
        let length_bonus = if (4..=20).contains(&words) { 0.15 } else { 0.05 };
        let direct_bonus = if self.direct.is_match(sentence) { 0.15 } else { 0.0 };

        overlap * 0.5 + type_bonus + length_bonus + direct_bonus
    }

    fn minimal_span(
        &self,
        sentence: &str,
        query_terms: &HashSet<String>,
        qtype: QuestionType,
    ) -> String {
        match qtype {
            QuestionType::HowMuch | QuestionType::HowMany => {
                if let Some(m) = self.number.find(sentence) {
                    return window_around(sentence, m.start(), m.as_str(), 6);
                }
            }
            QuestionType::When => {
                if let Some(m) = self.date.find(sentence) {
                    return window_around(sentence, m.start(), m.as_str(), 5);
                }
            }
            QuestionType::Who => {
                if let Some(m) = self.name.find(sentence).or_else(|| self.org.find(sentence)) {
                    return window_around(sentence, m.start(), m.as_str(), 5);
                }
            }
            QuestionType::Where => {
                if let Some(m) = self.location.find(sentence) {
                    return window_around(sentence, m.start(), m.as_str(), 5);
                }
            }
            QuestionType::What => {
                if let Some(m) = self.copula.find(sentence) {
                    let tail = sentence[m.end()..].trim();
                    if !tail.is_empty() {
                        return truncate_words(tail, 18);
                    }
                }
            }
            QuestionType::Other => {}
        }

        if word_count(sentence) <= 25 {
            sentence.to_string()
        } else {
            self.best_window(sentence, query_terms, 20)
        }
    }

    /// The 20-word window with the most query-term hits.
    fn best_window(&self, sentence: &str, query_terms: &HashSet<String>, size: usize) -> String {
        let words: Vec<&str> = sentence.split_whitespace().collect();
        if words.len() <= size {
            return sentence.to_string();
        }
        let mut best = words[..size].join(" ");
        let mut best_hits = 0usize;
        for i in 0..=(words.len() - size) {
            let window = words[i..i + size].join(" ");
            let hits = query_terms
                .intersection(&self.tokenizer.tokenize(&window))
                .count();
            if hits > best_hits {
                best_hits = hits;
                best = window;
            }
        }
        best
    }
}

impl Default for HeuristicExtractor {
    fn default() -> Self {
        Self::new(KeywordTokenizer::default())
    }
}

/// Cut a window of `context` words on each side of a pattern match.
fn window_around(sentence: &str, match_start: usize, matched: &str, context: usize) -> String {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    if words.is_empty() {
        return sentence.to_string();
    }
    let prefix_words = sentence[..match_start].split_whitespace().count();
    let match_words = matched.split_whitespace().count().max(1);
    let start = prefix_words.saturating_sub(context);
    let end = (prefix_words + match_words + context).min(words.len());
    words[start..end].join(" ").trim().to_string()
}

#[async_trait]
impl SpanExtractor for HeuristicExtractor {
    async fn extract(&self, query: &str, chunk_text: &str) -> Result<SpanProposal> {
        let text = clean(chunk_text);
        if word_count(&text) < 5 {
            return Ok(SpanProposal::not_found());
        }

        let query_terms = self.tokenizer.tokenize(query);
        let qtype = infer_question_type(query);

        let mut best_span: Option<String> = None;
        let mut best_score = 0.0f32;
        for sentence in sentences(&text) {
            if Self::is_boilerplate(&sentence) {
                continue;
            }
            let score = self.score_sentence(&sentence, &query_terms, qtype);
            if score > best_score {
                best_score = score;
                best_span = Some(self.minimal_span(&sentence, &query_terms, qtype));
            }
        }

        match best_span {
            Some(span) if best_score > PROPOSAL_CUTOFF => Ok(SpanProposal {
                span: Some(span),
                confidence: best_score.min(1.0),
                flag: ExtractionFlag::Direct,
            }),
            _ => Ok(SpanProposal::not_found()),
        }
    }
}
