//! Pulls a recipe payload out of whatever the agent runtime sent back.
//!
//! The runtime's envelope has no fixed schema. The model's text may be bare
//! JSON, JSON inside a fenced block, or JSON buried in prose. Every failure
//! here is reported as `None`; callers treat that the same as a failed call.

use serde_json::Value;

use crate::recipe::{RecipeResponse, VariationResponse};

/// The two reply shapes the pipeline understands.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentPayload {
    Full(RecipeResponse),
    Variation(VariationResponse),
}

/// Runs the whole extraction: locate text, find JSON, classify it.
pub fn extract(envelope: &Value) -> Option<AgentPayload> {
    match locate_text(envelope) {
        Some(text) => classify(parse_payload_text(text)?),
        None => structured_payload(envelope),
    }
}

/// Finds the model's text inside the envelope.
///
/// A flat `text`/`output`/`result` string wins, at the root or under `data`.
/// Otherwise the last content entry of the last provider step is used.
pub fn locate_text(envelope: &Value) -> Option<&str> {
    let scopes = [envelope.get("data"), Some(envelope)];

    for scope in scopes.iter().flatten() {
        for key in ["text", "output", "result"] {
            if let Some(text) = scope.get(key).and_then(Value::as_str) {
                if !text.trim().is_empty() {
                    return Some(text);
                }
            }
        }
    }

    for scope in scopes.iter().flatten() {
        let last_text = scope
            .pointer("/provider/steps")
            .and_then(Value::as_array)
            .and_then(|steps| steps.last())
            .and_then(|step| step.get("content"))
            .and_then(Value::as_array)
            .and_then(|content| content.last())
            .and_then(|c| c.get("text"))
            .and_then(Value::as_str);
        if let Some(text) = last_text {
            return Some(text);
        }
    }

    None
}

/// Tries, in order: the whole text as JSON, the first fenced block, and the
/// first balanced object in the text.
pub fn parse_payload_text(text: &str) -> Option<Value> {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return Some(value);
        }
        tracing::debug!("agent text starts with '{{' but is not valid JSON");
    }

    if let Some(block) = first_fenced_block(trimmed) {
        match serde_json::from_str::<Value>(block) {
            Ok(value) => return Some(value),
            Err(e) => tracing::debug!("fenced block is not valid JSON: {e}"),
        }
    }

    extract_first_json_object(trimmed)
}

/// Returns the interior of the first ``` fenced block, with an optional
/// `json` language tag removed. Later blocks are never looked at.
pub fn first_fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let mut rest = &text[open + 3..];

    if rest
        .get(..4)
        .map(|tag| tag.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
    {
        rest = &rest[4..];
    }

    let close = rest.find("```")?;
    Some(rest[..close].trim())
}

/// Parses the first complete top-level `{...}` object found in `text`.
///
/// Braces inside string literals (including escaped quotes) do not count.
/// A truncated object yields `None`, as does a balanced span that is not
/// valid JSON.
pub fn extract_first_json_object(text: &str) -> Option<Value> {
    let span = first_object_span(text)?;
    match serde_json::from_str::<Value>(span) {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("balanced span is not valid JSON: {e}");
            None
        }
    }
}

fn first_object_span(text: &str) -> Option<&str> {
    let mut depth: u32 = 0;
    let mut start = None;
    let mut in_string = false;
    let mut escape = false;

    for (i, ch) in text.char_indices() {
        // Quotes only matter once we are inside an object; prose before the
        // payload may contain stray ones.
        if in_string {
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| &text[s..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Sorts a parsed object into one of the known shapes by its keys.
pub fn classify(value: Value) -> Option<AgentPayload> {
    let obj = value.as_object()?;

    if obj.contains_key("mainRecipe") {
        return match serde_json::from_value::<RecipeResponse>(value) {
            Ok(resp) => Some(AgentPayload::Full(resp)),
            Err(e) => {
                tracing::debug!("mainRecipe payload did not deserialize: {e}");
                None
            }
        };
    }

    if obj.contains_key("variationName") {
        return match serde_json::from_value::<VariationResponse>(value) {
            Ok(resp) => Some(AgentPayload::Variation(resp)),
            Err(e) => {
                tracing::debug!("variation payload did not deserialize: {e}");
                None
            }
        };
    }

    let keys: Vec<&String> = obj.keys().collect();
    tracing::debug!(?keys, "unrecognized payload shape");
    None
}

// Some call paths hand back the workflow result itself instead of text.
fn structured_payload(envelope: &Value) -> Option<AgentPayload> {
    classify(envelope.clone()).or_else(|| {
        envelope
            .get("data")
            .filter(|d| d.is_object())
            .and_then(|d| classify(d.clone()))
    })
}
