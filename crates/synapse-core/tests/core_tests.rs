use synapse_core::config::{AnswerConfig, RetrievalConfig, ScoringWeights};
use synapse_core::types::{Answer, ConfidenceLevel, MemoryRecord, NO_CONFIDENT_ANSWER};

#[test]
fn default_weights_sum_to_one() {
    let weights = ScoringWeights::default();
    weights.validate().expect("defaults valid");
    assert!((weights.semantic + weights.keyword + weights.length - 1.0).abs() < 1e-6);
}

#[test]
fn skewed_weights_rejected() {
    let weights = ScoringWeights { semantic: 0.9, keyword: 0.9, length: 0.1 };
    assert!(weights.validate().is_err());
}

#[test]
fn default_configs_validate() {
    RetrievalConfig::default().validate().expect("retrieval defaults");
    AnswerConfig::default().validate().expect("answer defaults");
}

#[test]
fn zero_fanout_rejected() {
    let cfg = AnswerConfig { extract_concurrency: 0, ..AnswerConfig::default() };
    assert!(cfg.validate().is_err());
}

#[test]
fn sentinel_answer_shape() {
    let answer = Answer::no_confident_answer();
    assert_eq!(answer.text, NO_CONFIDENT_ANSWER);
    assert_eq!(answer.confidence, 0.0);
    assert_eq!(answer.confidence_level, ConfidenceLevel::None);
    assert!(answer.supporting_chunk_ids.is_empty());
    assert!(!answer.compressed);
    assert!(!answer.is_confident());
}

#[test]
fn confidence_level_bands() {
    assert_eq!(ConfidenceLevel::from_score(0.9), ConfidenceLevel::High);
    assert_eq!(ConfidenceLevel::from_score(0.7), ConfidenceLevel::High);
    assert_eq!(ConfidenceLevel::from_score(0.55), ConfidenceLevel::Medium);
    assert_eq!(ConfidenceLevel::from_score(0.3), ConfidenceLevel::Low);
    assert_eq!(ConfidenceLevel::from_score(0.1), ConfidenceLevel::None);
}

#[test]
fn resolve_with_base_joins_relative_and_keeps_absolute() {
    let dir = tempfile::tempdir().expect("tempdir");
    let relative = synapse_core::config::resolve_with_base(dir.path(), "notes/data");
    assert_eq!(relative, dir.path().join("notes/data"));
    let absolute = synapse_core::config::resolve_with_base(dir.path(), "/var/data");
    assert_eq!(absolute, std::path::PathBuf::from("/var/data"));
}

#[test]
fn memory_record_dedup_key_folds_query_case() {
    let a = MemoryRecord::new("What is my salary?", "$120,000");
    let b = MemoryRecord::new("what is MY salary?", "$120,000");
    assert_eq!(a.dedup_key(), b.dedup_key());
    assert!(a.rendered().starts_with("Query: What is my salary?"));
}
