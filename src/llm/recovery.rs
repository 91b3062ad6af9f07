//! Recovery of a JSON object from a free-form model response.
//!
//! Models are not bound to emit bare JSON even in JSON mode; they wrap the
//! object in markdown fences or surround it with prose. Candidates are tried
//! in a fixed order, each tier strictly more permissive than the last:
//!
//! 1. A fenced code block (optionally tagged `json`) around a `{...}` span
//! 2. The first `{` through the last `}` of the response
//! 3. The whole trimmed response

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from JSON recovery.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("No JSON object found in response")]
    NoJsonFound,

    #[error("Invalid JSON ({reason}): {candidate}")]
    InvalidJson { candidate: String, reason: String },
}

/// Which tier produced the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    FencedBlock,
    BraceSpan,
    WholeResponse,
}

fn fenced_block_regex() -> &'static Regex {
    static FENCED: OnceLock<Regex> = OnceLock::new();
    FENCED.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fenced block regex is valid")
    })
}

/// Select the candidate text for parsing. First match wins.
pub fn extract_candidate(envelope: &str) -> (&str, CandidateSource) {
    let trimmed = envelope.trim();

    if let Some(captures) = fenced_block_regex().captures(trimmed) {
        if let Some(object) = captures.get(1) {
            return (object.as_str().trim(), CandidateSource::FencedBlock);
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return (trimmed[start..=end].trim(), CandidateSource::BraceSpan);
        }
    }

    (trimmed, CandidateSource::WholeResponse)
}

/// Recover a JSON object from a model response.
pub fn recover_json(envelope: &str) -> Result<Map<String, Value>, RecoveryError> {
    let (candidate, source) = extract_candidate(envelope);

    if source == CandidateSource::WholeResponse && !candidate.contains('{') {
        return Err(RecoveryError::NoJsonFound);
    }

    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(RecoveryError::InvalidJson {
            candidate: candidate.to_string(),
            reason: format!("expected an object, got {}", json_kind(&other)),
        }),
        Err(e) => Err(RecoveryError::InvalidJson {
            candidate: candidate.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
