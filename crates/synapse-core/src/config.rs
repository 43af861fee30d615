//! Configuration loader and the explicit pipeline config structs.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! Scoring weights, thresholds and fan-out bounds are passed into the pipeline
//! as explicit structs rather than read from ambient process state, so tests
//! can run the same code with varied configurations.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;

/// Weights of the hybrid score components. Must sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub semantic: f32,
    pub keyword: f32,
    pub length: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self { semantic: 0.7, keyword: 0.2, length: 0.1 }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> crate::error::Result<()> {
        let sum = self.semantic + self.keyword + self.length;
        if (sum - 1.0).abs() > 1e-3 {
            return Err(Error::InvalidConfig(format!(
                "scoring weights must sum to 1, got {sum}"
            )));
        }
        if self.semantic < 0.0 || self.keyword < 0.0 || self.length < 0.0 {
            return Err(Error::InvalidConfig("scoring weights must be non-negative".into()));
        }
        Ok(())
    }
}

/// Tuning for the hybrid retriever.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub weights: ScoringWeights,
    /// Over-fetch multiplier: the index is asked for `overfetch_factor * k`
    /// hits (with `min_overfetch` as a floor) so re-ranking has room to work.
    pub overfetch_factor: usize,
    pub min_overfetch: usize,
    /// Saturation point of the length bonus, in words.
    pub target_chunk_words: usize,
    /// Tokens shorter than this never count as significant.
    pub min_token_len: usize,
    pub stop_words: Vec<String>,
    pub call_timeout_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            overfetch_factor: 3,
            min_overfetch: 10,
            target_chunk_words: 200,
            min_token_len: 3,
            stop_words: default_stop_words(),
            call_timeout_ms: 10_000,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> crate::error::Result<()> {
        self.weights.validate()?;
        if self.overfetch_factor == 0 {
            return Err(Error::InvalidConfig("overfetch_factor must be >= 1".into()));
        }
        if self.target_chunk_words == 0 {
            return Err(Error::InvalidConfig("target_chunk_words must be >= 1".into()));
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Tuning for the extractive answerer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerConfig {
    /// How many top candidates get an extraction call.
    pub max_chunks: usize,
    /// Bounded fan-out: extraction calls in flight at once.
    pub extract_concurrency: usize,
    /// Final gate: below this the answerer abstains.
    pub min_confidence: f32,
    /// Per-proposal floor: weaker proposals are treated as not-found.
    pub proposal_floor: f32,
    pub max_answer_words: usize,
    /// Total word budget across all chunks handed to extraction.
    pub extraction_word_budget: usize,
    pub call_timeout_ms: u64,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            max_chunks: 5,
            extract_concurrency: 4,
            min_confidence: 0.3,
            proposal_floor: 0.1,
            max_answer_words: 25,
            extraction_word_budget: 400,
            call_timeout_ms: 20_000,
        }
    }
}

impl AnswerConfig {
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.max_chunks == 0 {
            return Err(Error::InvalidConfig("max_chunks must be >= 1".into()));
        }
        if self.extract_concurrency == 0 {
            return Err(Error::InvalidConfig("extract_concurrency must be >= 1".into()));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(Error::InvalidConfig("min_confidence must be in [0, 1]".into()));
        }
        if self.max_answer_words == 0 {
            return Err(Error::InvalidConfig("max_answer_words must be >= 1".into()));
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

fn default_stop_words() -> Vec<String> {
    [
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he",
        "in", "is", "it", "its", "of", "on", "that", "the", "to", "was", "were",
        "will", "with", "what", "who", "when", "where", "how", "my", "your",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Retrieval tuning from the `retrieval` table, defaults when absent.
    pub fn retrieval(&self) -> anyhow::Result<RetrievalConfig> {
        let cfg: RetrievalConfig = self.get("retrieval").unwrap_or_default();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Answerer tuning from the `answer` table, defaults when absent.
    pub fn answer(&self) -> anyhow::Result<AnswerConfig> {
        let cfg: AnswerConfig = self.get("answer").unwrap_or_default();
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}
