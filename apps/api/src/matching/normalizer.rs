//! Turns a raw model completion into a bounded `MatchResult`.
//!
//! Models are asked for bare JSON but routinely wrap it in code fences, add
//! commentary around it, or produce near-JSON. The normalizer peels those
//! layers off, patches the common structural slips, and projects whatever
//! parses onto the bounded result shape. It never panics and never returns a
//! partially filled result.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const MAX_SKILLS: usize = 10;
pub const MAX_RECOMMENDATIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub match_percentage: u8,
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub recommendations: Vec<String>,
}

impl MatchResult {
    /// Zero-score result carrying explanatory recommendations.
    pub fn placeholder(messages: &[&str]) -> Self {
        Self {
            match_percentage: 0,
            matching_skills: Vec::new(),
            missing_skills: Vec::new(),
            recommendations: messages.iter().map(|m| m.to_string()).collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("model output is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("model output is not a JSON object")]
    NotAnObject,
}

// ["a", "b"}  ->  ["a", "b"]
static ARRAY_CLOSED_BY_BRACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"("\s*)\}(\s*[,\}])"#).unwrap());
static MISSING_COMMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""\s*\n\s*""#).unwrap());
static TRAILING_COMMA_ARRAY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*\]").unwrap());
static TRAILING_COMMA_OBJECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*\}").unwrap());

pub fn normalize(raw: &str) -> Result<MatchResult, NormalizeError> {
    let text = strip_code_fence(raw.trim());
    let payload = slice_object(text);

    // Repairs only run on text that does not already parse.
    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(_) => serde_json::from_str(&repair_json(payload))?,
    };

    match value {
        Value::Object(fields) => Ok(project(&fields)),
        _ => Err(NormalizeError::NotAnObject),
    }
}

/// Removes a surrounding ``` fence and an immediate `json` language tag.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let inner = rest.split("```").next().unwrap_or(rest);
    let inner = inner
        .strip_prefix("json")
        .or_else(|| inner.strip_prefix("JSON"))
        .unwrap_or(inner);
    inner.trim()
}

/// Cuts leading and trailing commentary around the outermost braces.
fn slice_object(text: &str) -> &str {
    if text.starts_with('{') {
        return text;
    }
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}

fn repair_json(text: &str) -> String {
    let text = ARRAY_CLOSED_BY_BRACE.replace_all(text, "${1}]${2}");
    let text = MISSING_COMMA.replace_all(&text, "\", \"");
    let text = TRAILING_COMMA_ARRAY.replace_all(&text, "]");
    TRAILING_COMMA_OBJECT.replace_all(&text, "}").into_owned()
}

fn project(fields: &Map<String, Value>) -> MatchResult {
    MatchResult {
        match_percentage: percentage(fields.get("match_percentage")),
        matching_skills: string_list(fields.get("matching_skills"), MAX_SKILLS),
        missing_skills: string_list(fields.get("missing_skills"), MAX_SKILLS),
        recommendations: string_list(fields.get("recommendations"), MAX_RECOMMENDATIONS),
    }
}

fn percentage(value: Option<&Value>) -> u8 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() => n.trunc().clamp(0.0, 100.0) as u8,
        _ => 0,
    }
}

fn string_list(value: Option<&Value>, max: usize) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .take(max)
        .collect()
}
