//! Helpers for pulling JSON out of free-form model output.

use serde_json::Value;

/// Longest document excerpt placed in a prompt, in characters.
pub(crate) const MAX_PROMPT_CHARS: usize = 12_000;

/// Cut `text` to at most `max_chars` characters, on a char boundary.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Locate the JSON object inside a model reply.
///
/// A reply that is already valid JSON is returned as is, whatever its
/// shape. Otherwise handles ```json fences, plain ``` fences, and objects
/// embedded in surrounding prose.
pub(crate) fn extract_json_object(text: &str) -> &str {
    let trimmed = text.trim();

    if serde_json::from_str::<Value>(trimmed).is_ok() {
        return trimmed;
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') || inner.starts_with('[') {
                return inner;
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return &trimmed[start..=end];
    }

    trimmed
}

/// Parse a model reply as JSON, tolerating fences and prose.
pub(crate) fn parse_json_reply(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(extract_json_object(text))
}
