use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use synapse_answer::ExtractiveAnswerer;
use synapse_core::config::AnswerConfig;
use synapse_core::error::{Error, Result};
use synapse_core::traits::{SpanCompressor, SpanExtractor};
use synapse_core::types::{
    Answer, Candidate, ChunkRecord, ExtractionFlag, SpanProposal, NO_CONFIDENT_ANSWER,
};

/// Extractor scripted per chunk marker word; unknown chunks are not-found,
/// chunks containing "BOOM" fail the call outright.
struct ScriptedExtractor {
    by_marker: HashMap<&'static str, (String, f32)>,
    calls: AtomicUsize,
}

impl ScriptedExtractor {
    fn new(entries: Vec<(&'static str, &str, f32)>) -> Self {
        Self {
            by_marker: entries
                .into_iter()
                .map(|(marker, span, conf)| (marker, (span.to_string(), conf)))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SpanExtractor for ScriptedExtractor {
    async fn extract(&self, _query: &str, chunk_text: &str) -> Result<SpanProposal> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if chunk_text.contains("BOOM") {
            return Err(Error::Extraction("simulated capability failure".into()));
        }
        for (marker, (span, conf)) in &self.by_marker {
            if chunk_text.contains(marker) {
                return Ok(SpanProposal {
                    span: Some(span.clone()),
                    confidence: *conf,
                    flag: ExtractionFlag::Direct,
                });
            }
        }
        Ok(SpanProposal::not_found())
    }
}

struct FailingCompressor;

#[async_trait]
impl SpanCompressor for FailingCompressor {
    async fn compress(&self, _span: &str, _max_words: usize) -> Result<String> {
        Err(Error::Compression("simulated quota exhaustion".into()))
    }
}

struct EchoCompressor(String);

#[async_trait]
impl SpanCompressor for EchoCompressor {
    async fn compress(&self, _span: &str, _max_words: usize) -> Result<String> {
        Ok(self.0.clone())
    }
}

fn candidate(id: &str, text: &str, combined: f32) -> Candidate {
    Candidate {
        chunk: ChunkRecord {
            id: id.to_string(),
            text: text.to_string(),
            source_path: format!("/docs/{id}.txt"),
            position: 0,
        },
        semantic_score: combined,
        keyword_overlap: 0.0,
        length_bonus: 0.5,
        combined_score: combined,
    }
}

fn answerer(extractor: ScriptedExtractor) -> ExtractiveAnswerer {
    ExtractiveAnswerer::new(Arc::new(extractor), None, AnswerConfig::default())
        .expect("config valid")
}

fn assert_sentinel(answer: &Answer) {
    assert_eq!(answer.text, NO_CONFIDENT_ANSWER);
    assert_eq!(answer.confidence, 0.0);
    assert!(answer.supporting_chunk_ids.is_empty());
}

#[tokio::test]
async fn passport_scenario_extracts_the_number() {
    let extractor = ScriptedExtractor::new(vec![(
        "passport",
        "passport number: X1234567",
        0.9,
    )]);
    let candidates = vec![
        candidate("travel", "itinerary with passport number: X1234567 in the details", 0.9),
        candidate("recipe", "sourdough instructions with plenty of flour words here", 0.5),
        candidate("notes", "meeting notes about roadmap planning and budgets today", 0.4),
        candidate("garden", "tomato planting schedule for the spring season ahead", 0.3),
        candidate("misc", "miscellaneous clippings with no useful facts at all", 0.2),
    ];

    let a = answerer(extractor);
    let answer = a.answer("What is my passport number?", &candidates).await;

    assert!(answer.text.contains("X1234567"));
    assert!(answer.confidence >= a.config().min_confidence);
    assert_eq!(answer.supporting_chunk_ids, vec!["travel".to_string()]);
    assert!(!answer.compressed);
}

#[tokio::test]
async fn empty_candidates_yield_sentinel() {
    let a = answerer(ScriptedExtractor::new(vec![]));
    let answer = a.answer("anything", &[]).await;
    assert_sentinel(&answer);
}

#[tokio::test]
async fn all_not_found_yields_sentinel() {
    let candidates = vec![
        candidate("a", "nothing relevant in this chunk at all really", 0.9),
        candidate("b", "equally irrelevant content goes right here too", 0.8),
    ];
    let a = answerer(ScriptedExtractor::new(vec![]));
    let answer = a.answer("what is my salary", &candidates).await;
    assert_sentinel(&answer);
}

#[tokio::test]
async fn all_calls_failing_yields_sentinel() {
    let candidates = vec![
        candidate("a", "BOOM chunk one with enough words to pass the gate", 0.9),
        candidate("b", "BOOM chunk two with enough words to pass the gate", 0.8),
    ];
    let a = answerer(ScriptedExtractor::new(vec![]));
    let answer = a.answer("anything at all", &candidates).await;
    assert_sentinel(&answer);
}

#[tokio::test]
async fn one_failing_chunk_does_not_block_the_answer() {
    let extractor = ScriptedExtractor::new(vec![("lease", "June 3, 2024", 0.8)]);
    let candidates = vec![
        candidate("bad", "BOOM this extraction call will fail outright today", 0.95),
        candidate("ok", "lease start date June 3, 2024 per the signed agreement", 0.7),
        candidate("c", "filler content one with enough words to count", 0.5),
        candidate("d", "filler content two with enough words to count", 0.4),
        candidate("e", "filler content three with enough words to count", 0.3),
    ];

    let a = answerer(extractor);
    let answer = a.answer("When does my lease start?", &candidates).await;
    assert!(answer.text.contains("June 3, 2024"));
    assert_eq!(answer.supporting_chunk_ids, vec!["ok".to_string()]);
}

#[tokio::test]
async fn below_threshold_confidence_abstains() {
    let extractor = ScriptedExtractor::new(vec![("weak", "maybe this", 0.15)]);
    let candidates =
        vec![candidate("w", "weak evidence sentence with enough words here", 0.9)];
    let a = answerer(extractor);
    let answer = a.answer("anything", &candidates).await;
    assert_sentinel(&answer);
}

#[tokio::test]
async fn supporting_ids_preserve_candidate_order() {
    let extractor = ScriptedExtractor::new(vec![
        ("alpha", "first supporting fact", 0.6),
        ("beta", "second supporting fact", 0.9),
        ("gamma", "third supporting fact", 0.5),
    ]);
    // Selection picks "beta" (highest confidence) but the support list must
    // stay in candidate order.
    let candidates = vec![
        candidate("c1", "alpha marker text with enough words to pass", 0.9),
        candidate("c2", "beta marker text with enough words to pass", 0.8),
        candidate("c3", "gamma marker text with enough words to pass", 0.7),
    ];
    let a = answerer(extractor);
    let answer = a.answer("which facts", &candidates).await;
    assert_eq!(
        answer.supporting_chunk_ids,
        vec!["c1".to_string(), "c2".to_string(), "c3".to_string()]
    );
    assert!(answer.text.contains("second supporting fact"));
}

#[tokio::test]
async fn only_top_max_chunks_get_extraction_calls() {
    let extractor = ScriptedExtractor::new(vec![]);
    let calls_handle;
    let candidates: Vec<Candidate> = (0..8)
        .map(|i| {
            candidate(
                &format!("c{i}"),
                "some chunk text with enough words to pass the gate",
                1.0 - i as f32 * 0.1,
            )
        })
        .collect();
    let a = {
        let e = Arc::new(extractor);
        calls_handle = Arc::clone(&e);
        ExtractiveAnswerer::new(e, None, AnswerConfig::default()).expect("config valid")
    };
    let _ = a.answer("anything", &candidates).await;
    assert_eq!(calls_handle.calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn long_span_is_truncated_when_compressor_fails() {
    let long_span =
        "one two three four five six seven eight nine ten eleven twelve thirteen fourteen \
         fifteen sixteen seventeen eighteen nineteen twenty twentyone twentytwo twentythree \
         twentyfour twentyfive twentysix twentyseven twentyeight";
    let extractor = ScriptedExtractor::new(vec![("marker", long_span, 0.9)]);
    let candidates =
        vec![candidate("c", "marker text with enough words to pass the gate", 0.9)];

    let a = ExtractiveAnswerer::new(
        Arc::new(extractor),
        Some(Arc::new(FailingCompressor)),
        AnswerConfig::default(),
    )
    .expect("config valid");

    let answer = a.answer("anything", &candidates).await;
    assert!(answer.compressed);
    assert!(answer.text.split_whitespace().count() <= 25);
    assert!(answer.text.starts_with("one two three"));
}

#[tokio::test]
async fn compressor_output_over_limit_falls_back_to_truncation() {
    let long_span = (0..40).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
    let still_too_long = (0..30).map(|i| format!("x{i}")).collect::<Vec<_>>().join(" ");
    let extractor = ScriptedExtractor::new(vec![("marker", long_span.as_str(), 0.9)]);
    let candidates =
        vec![candidate("c", "marker text with enough words to pass the gate", 0.9)];

    let a = ExtractiveAnswerer::new(
        Arc::new(extractor),
        Some(Arc::new(EchoCompressor(still_too_long))),
        AnswerConfig::default(),
    )
    .expect("config valid");

    let answer = a.answer("anything", &candidates).await;
    assert!(answer.compressed);
    assert!(answer.text.split_whitespace().count() <= 25);
    assert!(answer.text.starts_with("w0 w1"), "truncation fallback expected: {}", answer.text);
}

#[tokio::test]
async fn short_span_not_compressed() {
    let extractor = ScriptedExtractor::new(vec![("marker", "a short direct answer", 0.9)]);
    let candidates =
        vec![candidate("c", "marker text with enough words to pass the gate", 0.9)];
    let a = answerer(extractor);
    let answer = a.answer("anything", &candidates).await;
    assert!(!answer.compressed);
    assert_eq!(answer.text, "a short direct answer");
}

/// Extractor that stalls past any reasonable timeout on chunks containing
/// "stall" and answers instantly otherwise.
struct StallingExtractor;

#[async_trait]
impl SpanExtractor for StallingExtractor {
    async fn extract(&self, _query: &str, chunk_text: &str) -> Result<SpanProposal> {
        if chunk_text.contains("stall") {
            tokio::time::sleep(Duration::from_millis(500)).await;
            return Ok(SpanProposal {
                span: Some("too late".to_string()),
                confidence: 0.99,
                flag: ExtractionFlag::Direct,
            });
        }
        Ok(SpanProposal {
            span: Some("on time answer".to_string()),
            confidence: 0.8,
            flag: ExtractionFlag::Direct,
        })
    }
}

struct StallingCompressor;

#[async_trait]
impl SpanCompressor for StallingCompressor {
    async fn compress(&self, _span: &str, _max_words: usize) -> Result<String> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok("too late".to_string())
    }
}

#[tokio::test]
async fn timed_out_extraction_is_not_found_for_that_chunk_only() {
    let cfg = AnswerConfig { call_timeout_ms: 50, ..AnswerConfig::default() };
    let a = ExtractiveAnswerer::new(Arc::new(StallingExtractor), None, cfg)
        .expect("config valid");
    let candidates = vec![
        candidate("slow", "stall marker text with enough words to pass", 0.9),
        candidate("quick", "regular chunk text with enough words to pass", 0.8),
    ];

    let answer = a.answer("anything", &candidates).await;
    assert_eq!(answer.text, "on time answer");
    assert_eq!(answer.supporting_chunk_ids, vec!["quick".to_string()]);
}

#[tokio::test]
async fn every_extraction_timing_out_yields_sentinel() {
    let cfg = AnswerConfig { call_timeout_ms: 50, ..AnswerConfig::default() };
    let a = ExtractiveAnswerer::new(Arc::new(StallingExtractor), None, cfg)
        .expect("config valid");
    let candidates = vec![
        candidate("s1", "stall chunk one with enough words to pass", 0.9),
        candidate("s2", "stall chunk two with enough words to pass", 0.8),
    ];
    assert_sentinel(&a.answer("anything", &candidates).await);
}

#[tokio::test]
async fn compressor_timeout_falls_back_to_truncation() {
    let long_span = (0..40).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
    let extractor = ScriptedExtractor::new(vec![("marker", long_span.as_str(), 0.9)]);
    let candidates =
        vec![candidate("c", "marker text with enough words to pass the gate", 0.9)];

    let cfg = AnswerConfig { call_timeout_ms: 50, ..AnswerConfig::default() };
    let a = ExtractiveAnswerer::new(
        Arc::new(extractor),
        Some(Arc::new(StallingCompressor)),
        cfg,
    )
    .expect("config valid");

    let answer = a.answer("anything", &candidates).await;
    assert!(answer.compressed);
    assert!(answer.text.split_whitespace().count() <= 25);
    assert!(answer.text.starts_with("w0 w1"), "truncation fallback expected: {}", answer.text);
}

#[tokio::test]
async fn confidence_tie_prefers_higher_retrieval_score() {
    let extractor = ScriptedExtractor::new(vec![
        ("alpha", "identical confidence answer", 0.8),
        ("beta", "identical confidence answer", 0.8),
    ]);
    let candidates = vec![
        candidate("low", "beta marker text with enough words to pass", 0.4),
        candidate("high", "alpha marker text with enough words to pass", 0.9),
    ];
    // Candidate order is rank order; "low" outranks "high" here only if the
    // caller passed them that way. Ties on selection score must fall back to
    // combined_score, so "high" wins.
    let a = answerer(extractor);
    let answer = a.answer("identical answers", &candidates).await;
    assert_eq!(answer.supporting_chunk_ids.len(), 2);
    assert!(answer.text.contains("identical confidence answer"));
}
