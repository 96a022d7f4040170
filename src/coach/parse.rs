//! Pulling JSON out of model replies.
//!
//! Models asked for JSON still wrap it in prose or markdown fences now and
//! then. We try the whole reply first, then the outermost `{…}` / `[…]`
//! span.

use serde::de::DeserializeOwned;

/// Why a reply couldn't be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyError {
    /// The model said nothing (whitespace only).
    Empty,
    /// The model said something that doesn't fit the expected shape.
    Schema(String),
}

pub fn parse_json_reply<T: DeserializeOwned>(reply: &str) -> Result<T, ReplyError> {
    let trimmed = strip_fences(reply.trim());
    if trimmed.is_empty() {
        return Err(ReplyError::Empty);
    }

    let first_err = match serde_json::from_str(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    match json_span(trimmed) {
        Some(span) if span.len() < trimmed.len() => {
            serde_json::from_str(span).map_err(|e| ReplyError::Schema(e.to_string()))
        }
        _ => Err(ReplyError::Schema(first_err.to_string())),
    }
}

fn strip_fences(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // drop an optional language tag on the opening fence
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn json_span(s: &str) -> Option<&str> {
    let start = s.find(['{', '['])?;
    let close = if s[start..].starts_with('{') { '}' } else { ']' };
    let end = s.rfind(close)?;
    (end > start).then(|| &s[start..=end])
}
