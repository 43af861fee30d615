//! Keyword tokenization used by the hybrid score.
//!
//! Documented choice: lowercase, split on non-alphanumeric characters, drop
//! tokens shorter than `min_token_len`, drop stop-words. No stemming. The
//! stop-word list is configuration, not a hidden default.

use std::collections::HashSet;

use crate::config::RetrievalConfig;

#[derive(Debug, Clone)]
pub struct KeywordTokenizer {
    min_len: usize,
    stop_words: HashSet<String>,
}

impl KeywordTokenizer {
    pub fn new(min_len: usize, stop_words: impl IntoIterator<Item = String>) -> Self {
        Self {
            min_len,
            stop_words: stop_words.into_iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self::new(config.min_token_len, config.stop_words.iter().cloned())
    }

    /// Significant tokens of `text`, deduplicated.
    pub fn tokenize(&self, text: &str) -> HashSet<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .map(str::to_lowercase)
            .filter(|t| t.chars().count() >= self.min_len)
            .filter(|t| !self.stop_words.contains(t))
            .collect()
    }

    /// Fraction of query tokens present in `text`, in [0, 1].
    /// 0 when the query has no significant tokens.
    pub fn overlap(&self, query_terms: &HashSet<String>, text: &str) -> f32 {
        if query_terms.is_empty() {
            return 0.0;
        }
        let text_terms = self.tokenize(text);
        let hits = query_terms.intersection(&text_terms).count();
        hits as f32 / query_terms.len() as f32
    }
}

impl Default for KeywordTokenizer {
    fn default() -> Self {
        Self::from_config(&RetrievalConfig::default())
    }
}
