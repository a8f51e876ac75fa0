//! Tolerant extraction of one JSON object from free-form model output.
//!
//! Generated text is untrusted: it may wrap the object in code fences,
//! surround it with commentary, add comment markers, or not contain an
//! object at all. [`extract`] never fails; when nothing parses it returns the
//! fallback record.
//!
//! Strategy, in order:
//! 1. strip noise markers (code fences, `/*` and `*/`)
//! 2. parse the whole cleaned text strictly
//! 3. from each `{` in order, find its balanced closing brace
//!    (string-aware depth tracking) and parse that span; a candidate that
//!    fails restarts the scan at the next `{`, so a stray brace or quote in
//!    surrounding commentary cannot swallow the real object
//! 4. fall back to [`fallback_record`]

use crate::models::{MAX_PRIORITY_NEEDS, SupportLevel};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

static NOISE_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json|JSON)?|/\*|\*/").expect("valid noise regex"));

/// Why no object could be pulled out of the text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("no JSON object found in model output")]
    NoObject,
    #[error("found {0} candidate object(s) but none parsed")]
    Unparseable(usize),
}

/// Extract the first JSON object in `text`, or the fallback record built
/// around `fallback_location`.
///
/// A successfully parsed object is returned as-is; normalizing its fields is
/// the caller's job (see [`crate::models::Classification::from_record`]).
pub fn extract(text: &str, fallback_location: &str) -> Map<String, Value> {
    match find_object(text) {
        Ok(record) => record,
        Err(e) => {
            warn!(error = %e, "falling back to default record");
            fallback_record(fallback_location)
        }
    }
}

/// The record substituted when extraction fails.
pub fn fallback_record(location: &str) -> Map<String, Value> {
    let mut record = Map::new();
    record.insert("location".into(), json!(location));
    record.insert("support_level".into(), json!(SupportLevel::Unknown.label()));
    record.insert("confidence".into(), json!(0.0));
    record.insert("priority_needs".into(), Value::Array(Vec::with_capacity(MAX_PRIORITY_NEEDS)));
    record.insert("people_affected".into(), json!(0));
    record
}

/// Strict-then-scanning search for a JSON object.
pub fn find_object(text: &str) -> Result<Map<String, Value>, ExtractError> {
    let cleaned = strip_noise(text);
    let cleaned = cleaned.trim();

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(cleaned) {
        debug!("model output parsed as a bare object");
        return Ok(map);
    }

    let mut candidates = 0usize;
    for (start, _) in cleaned.match_indices('{') {
        let Some(span) = balanced_span_at(cleaned, start) else {
            continue;
        };
        candidates += 1;
        match serde_json::from_str::<Value>(span) {
            Ok(Value::Object(map)) => return Ok(map),
            Ok(_) => {}
            Err(e) => debug!(error = %e, start, "candidate span did not parse"),
        }
    }
    if candidates == 0 {
        Err(ExtractError::NoObject)
    } else {
        Err(ExtractError::Unparseable(candidates))
    }
}

/// Remove code fences and comment delimiters.
pub fn strip_noise(text: &str) -> String {
    NOISE_MARKERS.replace_all(text, "").into_owned()
}

/// The balanced `{...}` span opening at byte offset `start`, or `None` if
/// it never closes.
///
/// Braces inside JSON string literals (including escaped quotes) do not
/// count toward the depth.
fn balanced_span_at(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + i]);
                }
            }
            _ => {}
        }
    }
    None
}
