//! Tool-call extraction from model output
//!
//! The model is asked to answer either in prose or with a single JSON object
//! `{"tool_calls": [{"name": ..., "arguments": {...}}]}`. Extraction is
//! deliberately lenient about surrounding text but strict about JSON: text
//! that merely looks like a call is treated as a plain answer.
//!
//! Two spans are tried:
//! 1. The widest `{ ... }` span around the first `"tool_calls"` key.
//! 2. The balanced object starting at the nearest `{` before that key, for
//!    output with stray braces in the surrounding prose.

use regex::Regex;
use sdk::ToolInvocation;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::debug;

static TOOL_CALL_SPAN: OnceLock<Regex> = OnceLock::new();

fn span_pattern() -> &'static Regex {
    TOOL_CALL_SPAN.get_or_init(|| {
        Regex::new(r#"\{[\s\S]*"tool_calls"[\s\S]*\}"#).expect("Invalid tool call pattern")
    })
}

/// Extract tool invocations from model output.
///
/// Returns `None` when the text is a plain answer: no `tool_calls` key, JSON
/// that does not decode, or an empty call list.
pub fn parse_tool_calls(text: &str) -> Option<Vec<ToolInvocation>> {
    let span = span_pattern().find(text)?;

    let calls = decode_calls(span.as_str()).or_else(|| {
        let key = text.find("\"tool_calls\"")?;
        let start = text[..key].rfind('{')?;
        let object = extract_balanced_json(&text[start..])?;
        debug!("Greedy tool call span did not decode, using balanced object");
        decode_calls(object)
    });

    match calls {
        Some(calls) if !calls.is_empty() => {
            debug!("Parsed {} tool call(s)", calls.len());
            Some(calls)
        }
        Some(_) => {
            debug!("tool_calls list was empty, treating as plain answer");
            None
        }
        None => {
            debug!("Call-shaped text did not decode, treating as plain answer");
            None
        }
    }
}

/// Decode `{"tool_calls": [...]}`; entries without a name are skipped
fn decode_calls(json: &str) -> Option<Vec<ToolInvocation>> {
    let value: Value = serde_json::from_str(json).ok()?;
    let entries = value.get("tool_calls")?.as_array()?;

    Some(
        entries
            .iter()
            .filter_map(|entry| {
                let name = entry.get("name")?.as_str()?.trim();
                if name.is_empty() {
                    return None;
                }
                let arguments = match entry.get("arguments") {
                    Some(Value::Object(map)) => map.clone(),
                    // Some models double-encode the arguments object
                    Some(Value::String(s)) => {
                        serde_json::from_str::<Map<String, Value>>(s).unwrap_or_default()
                    }
                    _ => Map::new(),
                };
                Some(ToolInvocation {
                    name: name.to_string(),
                    arguments,
                })
            })
            .collect(),
    )
}

/// Extract a balanced JSON object starting at position 0 of `s`.
///
/// Counts `{` / `}` depth, respecting string literals, to find the
/// matching close brace.
fn extract_balanced_json(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
