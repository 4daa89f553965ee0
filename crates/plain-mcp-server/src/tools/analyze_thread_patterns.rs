//! Find threads that look like a reference thread
//!
//! The reference thread's title and description are reduced to keywords, the
//! keywords are used as a search term, and each search hit is scored by the
//! share of reference keywords it also contains.

use std::collections::HashSet;

use chrono::{DateTime, TimeDelta, Utc};
use rmcp::model::{CallToolResult, Tool};
use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{
    failure, get_thread_details, require_in_range, require_non_blank, search_threads, success,
    upstream_error,
};
use crate::errors::McpError;
use crate::graphql::{Client, Executable as _};
use crate::schema_from_type;

/// The name of the tool to find threads similar to a given one
pub const ANALYZE_THREAD_PATTERNS_TOOL_NAME: &str = "analyze_thread_patterns";

const MAX_SIMILAR_THREADS: usize = 5;
const SEARCH_LIMIT: u32 = 20;
const MAX_SEARCH_KEYWORDS: usize = 10;
const MAX_SEARCH_TERM_CHARS: usize = 200;
const MIN_KEYWORD_CHARS: usize = 3;
const DAYS_BACK_RANGE: std::ops::RangeInclusive<u32> = 1..=365;

const STOP_WORDS: &[&str] = &[
    "about", "after", "again", "all", "also", "and", "any", "are", "been", "before", "but",
    "can", "cannot", "could", "did", "does", "doesn", "don", "for", "from", "get", "had", "has",
    "have", "hello", "her", "here", "him", "his", "how", "into", "isn", "its", "just", "not",
    "now", "our", "out", "please", "she", "some", "than", "thank", "thanks", "that", "the",
    "their", "them", "then", "there", "these", "they", "this", "too", "very", "was", "wasn",
    "way", "were", "what", "when", "where", "which", "while", "who", "why", "will", "with",
    "won", "would", "you", "your",
];

const fn default_days_back() -> u32 {
    30
}

#[derive(Clone)]
pub struct AnalyzeThreadPatterns {
    pub tool: Tool,
}

impl Default for AnalyzeThreadPatterns {
    fn default() -> Self {
        Self::new()
    }
}

/// Input for the analyze_thread_patterns tool.
#[derive(JsonSchema, Deserialize, Debug)]
pub struct Input {
    /// Reference thread ID to find similar issues
    thread_id: String,

    /// Number of days to look back
    #[serde(default = "default_days_back")]
    days_back: u32,
}

impl AnalyzeThreadPatterns {
    pub fn new() -> Self {
        Self {
            tool: Tool::new(
                ANALYZE_THREAD_PATTERNS_TOOL_NAME,
                "Analyze patterns in threads to find similar issues. Returns up to 5 threads created within `days_back` days, ranked by keyword overlap with the reference thread.",
                schema_from_type!(Input),
            ),
        }
    }

    pub async fn execute(&self, client: &Client, input: Input) -> Result<CallToolResult, McpError> {
        self.execute_at(client, input, Utc::now()).await
    }

    async fn execute_at(
        &self,
        client: &Client,
        input: Input,
        now: DateTime<Utc>,
    ) -> Result<CallToolResult, McpError> {
        let thread_id = require_non_blank("thread_id", &input.thread_id)?;
        let days_back = require_in_range("days_back", input.days_back, DAYS_BACK_RANGE)?;

        let reference = match get_thread_details::Input::new(thread_id)
            .execute(client)
            .await
        {
            Ok(thread) => thread,
            Err(e) => return Ok(upstream_error(e)),
        };
        if reference.as_object().is_none_or(|thread| thread.is_empty()) {
            return Ok(failure(&json!({ "error": "Thread not found" })));
        }

        let title = text_field(&reference, "title");
        let description = text_field(&reference, "description");
        let keywords = extract_keywords(&format!("{title} {description}"));
        let search_terms = search_terms(&keywords, title, description);
        debug!(thread_id, %search_terms, "Searching for similar threads");

        let candidates = if search_terms.is_empty() {
            Vec::new()
        } else {
            match search_threads::Input::new(search_terms.clone(), SEARCH_LIMIT)
                .execute(client)
                .await
            {
                Ok(results) => results
                    .get("results")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
                Err(e) => return Ok(upstream_error(e)),
            }
        };

        let cutoff = now - TimeDelta::days(i64::from(days_back));
        let mut similar: Vec<(f64, Value)> = candidates
            .into_iter()
            .filter(|thread| thread.get("id").and_then(Value::as_str) != Some(thread_id))
            .filter(|thread| created_at(thread).is_none_or(|created| created >= cutoff))
            .map(|thread| score(&keywords, thread))
            .collect();
        similar.sort_by(|(a, _), (b, _)| b.total_cmp(a));

        let total_found = similar.len();
        let similar_threads: Vec<Value> = similar
            .into_iter()
            .take(MAX_SIMILAR_THREADS)
            .map(|(_, thread)| thread)
            .collect();

        Ok(success(&json!({
            "reference_thread": {
                "id": reference.get("id"),
                "title": reference.get("title"),
                "status": reference.get("status"),
            },
            "similar_threads": similar_threads,
            "analysis": {
                "total_found": total_found,
                "search_terms": search_terms,
                "keywords": keywords,
                "days_back": days_back,
            },
        })))
    }
}

fn text_field<'a>(thread: &'a Value, field: &str) -> &'a str {
    thread.get(field).and_then(Value::as_str).unwrap_or_default()
}

/// Lowercase alphanumeric words, minus stop words, in order of first appearance
fn extract_keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|word| word.chars().count() >= MIN_KEYWORD_CHARS)
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        .filter(|word| seen.insert(word.clone()))
        .collect()
}

fn search_terms(keywords: &[String], title: &str, description: &str) -> String {
    if keywords.is_empty() {
        format!("{title} {description}")
            .trim()
            .chars()
            .take(MAX_SEARCH_TERM_CHARS)
            .collect()
    } else {
        keywords
            .iter()
            .take(MAX_SEARCH_KEYWORDS)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Timestamps are either ISO 8601 strings or `{ iso8601 }` objects
fn created_at(thread: &Value) -> Option<DateTime<Utc>> {
    let created_at = thread.get("createdAt")?;
    let text = created_at
        .as_str()
        .or_else(|| created_at.get("iso8601").and_then(Value::as_str))?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|timestamp| timestamp.with_timezone(&Utc))
}

/// Attach the keyword overlap with the reference thread to a candidate
fn score(reference_keywords: &[String], mut thread: Value) -> (f64, Value) {
    let candidate_keywords: HashSet<String> = extract_keywords(&format!(
        "{} {}",
        text_field(&thread, "title"),
        text_field(&thread, "description")
    ))
    .into_iter()
    .collect();
    let matched: Vec<&String> = reference_keywords
        .iter()
        .filter(|keyword| candidate_keywords.contains(*keyword))
        .collect();

    let similarity = if reference_keywords.is_empty() {
        0.0
    } else {
        let ratio = matched.len() as f64 / reference_keywords.len() as f64;
        (ratio * 1000.0).round() / 1000.0
    };

    if let Some(obj) = thread.as_object_mut() {
        obj.insert("similarity".to_string(), json!(similarity));
        obj.insert("matched_keywords".to_string(), json!(matched));
    }
    (similarity, thread)
}
