//! Text cleanup applied to chunk text before extraction and to answer spans.

use std::sync::OnceLock;

use regex::Regex;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn punct_space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+([,.;:!?])").expect("static regex"))
}

fn hyphen_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\w)-\s+(\w)").expect("static regex"))
}

fn spaced_letters_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:[A-Za-z]\s+){2,}[A-Za-z]\b").expect("static regex"))
}

/// Collapse runs of whitespace and drop spaces before punctuation.
pub fn normalize_whitespace(text: &str) -> String {
    let text = text.replace('\n', " ");
    let text = whitespace_re().replace_all(&text, " ");
    punct_space_re().replace_all(&text, "$1").trim().to_string()
}

/// Repair common PDF extraction artifacts: words broken across line-end
/// hyphens ("pass- port") and letter-spaced words ("S A L A R Y").
pub fn fix_pdf_spacing(text: &str) -> String {
    let text = hyphen_break_re().replace_all(text, "${1}${2}");
    let text = spaced_letters_re().replace_all(&text, |caps: &regex::Captures<'_>| {
        caps[0].chars().filter(|c| !c.is_whitespace()).collect::<String>()
    });
    punct_space_re().replace_all(&text, "$1").to_string()
}

/// Cleanup pipeline used on every chunk and span.
pub fn clean(text: &str) -> String {
    normalize_whitespace(&fix_pdf_spacing(text))
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Deterministic compression fallback: keep the first `max_words` words and
/// close with a period.
pub fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return text.trim().to_string();
    }
    let mut out = words[..max_words].join(" ");
    while out.ends_with([',', '.', ';', ':']) {
        out.pop();
    }
    out.push('.');
    out
}

/// Sentence split on terminal punctuation followed by whitespace.
pub fn sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = text.trim().chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|n| n.is_whitespace()) {
            let s = current.trim().to_string();
            if !s.is_empty() {
                out.push(s);
            }
            current.clear();
        }
    }
    let s = current.trim().to_string();
    if !s.is_empty() {
        out.push(s);
    }
    out
}
