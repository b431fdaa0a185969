//! JSON repair for LLM output.
//!
//! The model is asked for one JSON object but routinely wraps it in prose
//! or a code fence, emits raw control bytes inside string values, and
//! mixes single- and double-escaped backslashes in LaTeX. This module
//! coerces such near-JSON into text a strict parser can accept.
//!
//! The repair pipeline is: extract the JSON substring, normalize
//! backslashes, then escape control bytes inside strings. Backslash
//! normalization runs first so it can never touch escape sequences the
//! control-byte pass creates, and on valid JSON text the pipeline is
//! idempotent: `repair(repair(s)) == repair(s)`.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Fenced ```json block; the preferred extraction site.
static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*(.*?)```").expect("fence regex"));

/// Errors from locating the JSON payload in raw model output.
#[derive(Debug, Error)]
pub enum RepairError {
    #[error("no JSON object found in model output")]
    NoJsonFound,
}

/// Locate the JSON substring in raw model output.
///
/// Prefers a fenced ```json block; falls back to the span between the
/// first `{` and the last `}`. Fails fast when neither exists -- there is
/// nothing to repair.
pub fn extract_json(raw: &str) -> Result<&str, RepairError> {
    if let Some(caps) = FENCE_RE.captures(raw) {
        let inner = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        if !inner.is_empty() {
            return Ok(inner);
        }
    }

    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&raw[start..=end]),
        _ => Err(RepairError::NoJsonFound),
    }
}

/// Repair raw model output into text a strict JSON parser can accept.
///
/// The output is not *guaranteed* parseable -- pathological input can
/// still fail downstream -- so the caller surfaces the parse error as its
/// own failure kind rather than trusting this blindly.
pub fn repair(raw: &str) -> Result<String, RepairError> {
    let extracted = extract_json(raw)?;
    let normalized = normalize_backslashes(extracted);
    Ok(escape_control_chars(&normalized))
}

/// Double every bare backslash while leaving `\\` and `\"` untouched.
///
/// The model is told to double-escape backslashes inside LaTeX but
/// frequently emits a mix. Single-escaped LaTeX commands (`\theta`,
/// `\frac`, `\nabla`, `\beta`) collide with the JSON letter escapes, so
/// letter escapes are deliberately promoted too: a bare backslash always
/// means "meant to be doubled". Already-doubled backslashes never cascade,
/// and `\"` must survive or the string structure itself breaks.
fn normalize_backslashes(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 16);
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('\\') => {
                chars.next();
                out.push_str("\\\\");
            }
            Some('"') => {
                chars.next();
                out.push_str("\\\"");
            }
            _ => out.push_str("\\\\"),
        }
    }

    out
}

/// Escape literal newline, carriage-return, and tab bytes inside quoted
/// string values.
///
/// The scan is quote-aware: a `\"` does not terminate the string. Control
/// bytes outside strings (pretty-printed JSON) are structural and left
/// alone.
fn escape_control_chars(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 16);
    let mut in_string = false;
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if !in_string {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
            continue;
        }
        match c {
            '\\' => {
                out.push(c);
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '"' => {
                in_string = false;
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }

    out
}
