//! Query intent classification.
//!
//! Decides how a query is served: factual questions go through answer
//! extraction, exploratory queries get documents only, quoted or very short
//! queries are treated as key-phrase lookups.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum QueryIntent {
    /// salary, date, who, where, when — requires explicit evidence
    FactLookup,
    /// exact terms, names
    KeyPhrase,
    /// summarize, overview
    Summary,
    /// exploratory search — skip answer extraction, show documents
    Fulltext,
}

const FACT_TERMS: &[&str] = &[
    "salary", "compensation", "base", "annual", "amount", "total", "date", "start",
    "effective", "email", "phone", "address", "title", "role", "position", "name",
    "who", "where", "when",
];

const SUMMARY_TERMS: &[&str] = &["summarize", "summary", "overview", "describe", "explain"];

const FULLTEXT_TERMS: &[&str] =
    &["find", "search", "show", "list", "all", "documents", "files", "related"];

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

pub fn classify_query(query: &str) -> QueryIntent {
    let text = query.trim();
    if text.is_empty() {
        return QueryIntent::Fulltext;
    }

    let lowered = text.to_lowercase();
    let tokens = words(&lowered);

    if SUMMARY_TERMS.iter().any(|t| tokens.contains(*t)) {
        return QueryIntent::Summary;
    }
    if FULLTEXT_TERMS.iter().any(|t| tokens.contains(*t)) {
        return QueryIntent::Fulltext;
    }
    if ["who ", "where ", "when ", "what ", "how much", "how many"]
        .iter()
        .any(|p| lowered.starts_with(p))
    {
        return QueryIntent::FactLookup;
    }
    if FACT_TERMS.iter().any(|t| tokens.contains(*t)) {
        return QueryIntent::FactLookup;
    }
    if text.contains('"') || text.contains('\'') {
        return QueryIntent::KeyPhrase;
    }
    if tokens.len() <= 2 {
        return QueryIntent::KeyPhrase;
    }
    QueryIntent::Fulltext
}
