//! Rendering of tool payloads.

use serde_json::Value;

use crate::truncate_chars;

/// Marker appended when output exceeds its character budget.
pub const TRUNCATION_MARKER: &str = "\n... (truncated)";

/// Text of a tool payload and whether the tool flagged it as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPayload {
    pub text: String,
    pub is_error: bool,
}

/// Render a `tools/call` result.
///
/// MCP content arrays render their text blocks directly, one per line.
/// Anything else is pretty-printed JSON.
pub fn render_payload(payload: &Value) -> RenderedPayload {
    let is_error = payload.get("isError").and_then(Value::as_bool).unwrap_or(false);

    let text = match payload {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Object(obj) => match obj.get("content").and_then(Value::as_array) {
            Some(blocks) if !blocks.is_empty() => render_content(blocks),
            _ => match obj.get("structuredContent") {
                Some(structured) => pretty(structured),
                None if obj.contains_key("content") => String::new(),
                None => pretty(payload),
            },
        },
        other => pretty(other),
    };

    RenderedPayload {
        text: if text.trim().is_empty() {
            "No result returned".to_string()
        } else {
            text
        },
        is_error,
    }
}

fn render_content(blocks: &[Value]) -> String {
    blocks
        .iter()
        .map(|block| match block.get("type").and_then(Value::as_str) {
            Some("text") => block
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            Some("image") | Some("audio") => {
                let kind = block.get("type").and_then(Value::as_str).unwrap_or_default();
                let mime = block
                    .get("mimeType")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown type");
                format!("[{kind}: {mime}]")
            }
            _ => pretty(block),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Cut `text` to `budget` characters, appending the truncation marker.
pub fn truncate_with_marker(text: &str, budget: usize) -> String {
    let cut = truncate_chars(text, budget);
    if cut.len() == text.len() {
        return text.to_string();
    }
    tracing::debug!(original_chars = text.chars().count(), budget, "output truncated");
    format!("{cut}{TRUNCATION_MARKER}")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
