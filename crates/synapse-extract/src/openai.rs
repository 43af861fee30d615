//! OpenAI-compatible chat-completions client implementing the span extraction
//! and compression capabilities.
//!
//! The extraction contract is strict: the model must copy the smallest span
//! answering the question, reply in JSON, and return the literal answer
//! `"NONE"` when the text does not answer the query. Anything malformed maps
//! to the extraction/compression error variants; callers recover per-chunk.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use synapse_core::error::{Error, Result};
use synapse_core::traits::{SpanCompressor, SpanExtractor};
use synapse_core::types::{ExtractionFlag, SpanProposal};

use crate::text::{clean, word_count};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const EXTRACT_SYSTEM_PROMPT: &str = "You are an extraction engine for a personal factual recall system.\n\
You ONLY extract short answers that are explicitly stated in the given text.\n\
You NEVER invent or infer facts not literally present.\n\
You respond ONLY in valid JSON format.";

const COMPRESS_SYSTEM_PROMPT: &str =
    "You compress factual text into shorter form without changing meaning or adding facts.";

#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into().trim().to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Build from `OPENAI_API_KEY` when set; `None` means no hosted model is
    /// configured and callers should fall back to the heuristic extractor.
    pub fn from_env() -> Option<Self> {
        let key = std::env::var("OPENAI_API_KEY").ok()?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some(Self::new(key))
    }

    async fn chat(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> std::result::Result<String, String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": 0.0,
            "max_tokens": max_tokens,
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(format!("chat error {status}: {text}"));
        }

        let payload: serde_json::Value =
            res.json().await.map_err(|e| format!("invalid response body: {e}"))?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| "response missing message content".to_string())?;
        Ok(content.trim().to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ExtractionPayload {
    answer: String,
    #[serde(default)]
    confidence: f32,
}

/// Strip a markdown code fence if the model wrapped its JSON in one.
fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse the extraction reply into (answer, clamped confidence).
pub fn parse_extraction_reply(content: &str) -> std::result::Result<(String, f32), String> {
    let payload: ExtractionPayload = serde_json::from_str(strip_fences(content))
        .map_err(|e| format!("invalid extraction JSON: {e}"))?;
    Ok((payload.answer, payload.confidence.clamp(0.0, 1.0)))
}

#[async_trait]
impl SpanExtractor for OpenAiClient {
    async fn extract(&self, query: &str, chunk_text: &str) -> Result<SpanProposal> {
        let text = clean(chunk_text);
        if word_count(&text) < 5 {
            return Ok(SpanProposal::not_found());
        }

        let user_prompt = format!(
            "Question: {query}\n\nText:\n{text}\n\nInstructions:\n\
- If the text contains a direct answer, copy the smallest possible span that answers the question.\n\
- Prefer a short phrase or a single simple sentence (<=20 words).\n\
- Do NOT summarize the whole document.\n\
- Do NOT add explanations or context not in the text.\n\
- If the answer is not clearly present, return EXACTLY \"NONE\" as the answer.\n\n\
Respond in JSON ONLY with this exact format:\n\
{{\"answer\": \"<copied span or NONE>\", \"confidence\": <number between 0.0 and 1.0>}}"
        );

        let content = self
            .chat(EXTRACT_SYSTEM_PROMPT, &user_prompt, 150)
            .await
            .map_err(Error::Extraction)?;
        let (answer, confidence) =
            parse_extraction_reply(&content).map_err(Error::Extraction)?;

        if answer.is_empty() || answer.eq_ignore_ascii_case("none") {
            return Ok(SpanProposal::not_found());
        }

        let answer = clean(&answer);
        let flag = if text.contains(&answer) {
            ExtractionFlag::Direct
        } else {
            ExtractionFlag::Inferred
        };
        Ok(SpanProposal { span: Some(answer), confidence, flag })
    }
}

#[async_trait]
impl SpanCompressor for OpenAiClient {
    async fn compress(&self, span: &str, max_words: usize) -> Result<String> {
        let user_prompt = format!(
            "Original text:\n{span}\n\nInstructions:\n\
- Rewrite into a single, direct sentence.\n\
- Maximum {max_words} words.\n\
- Do NOT add any new facts or assumptions.\n\
- Keep all numbers, dates, and names EXACTLY unchanged.\n\n\
Respond with ONLY the compressed sentence, nothing else."
        );

        let compressed = self
            .chat(COMPRESS_SYSTEM_PROMPT, &user_prompt, 60)
            .await
            .map_err(Error::Compression)?;
        let compressed = clean(&compressed);

        // A "compression" longer than its input is a model failure.
        if compressed.is_empty() || word_count(&compressed) > word_count(span) {
            return Err(Error::Compression("compressor output longer than input".into()));
        }
        Ok(compressed)
    }
}
