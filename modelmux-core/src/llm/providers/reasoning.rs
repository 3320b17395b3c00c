//! Reasoning trace extraction shared by the adapters
//!
//! Backends return reasoning in different shapes: plain strings, Anthropic
//! `thinking` blocks, Gemini parts flagged `thought`, or OpenAI reasoning
//! objects carrying a `summary` list. Everything is flattened into one
//! newline-joined trace.

use serde_json::Value;

/// Keys that hold reasoning text directly
const TEXT_KEYS: &[&str] = &["text", "content", "reasoning", "thinking", "value"];
/// Keys that hold nested collections of reasoning segments
const COLLECTION_KEYS: &[&str] = &["summary", "parts", "items", "steps"];

pub(crate) fn extract_reasoning_trace(value: &Value) -> Option<String> {
    let mut segments = Vec::new();
    collect_segments(value, &mut segments);
    let combined = segments.join("\n");
    let trimmed = combined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn collect_segments(value: &Value, segments: &mut Vec<String>) {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
        Value::String(text) => {
            let trimmed = text.trim();
            // Adjacent duplicates show up when a backend echoes its summary
            if trimmed.is_empty() || segments.last().is_some_and(|last| last == trimmed) {
                return;
            }
            segments.push(trimmed.to_string());
        }
        Value::Array(items) => {
            for item in items {
                collect_segments(item, segments);
            }
        }
        Value::Object(map) => {
            let mut matched = false;
            for key in TEXT_KEYS.iter().chain(COLLECTION_KEYS) {
                if let Some(nested) = map.get(*key) {
                    collect_segments(nested, segments);
                    matched = true;
                }
            }
            if !matched {
                for nested in map.values() {
                    if matches!(nested, Value::Array(_) | Value::Object(_)) {
                        collect_segments(nested, segments);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trims_plain_strings() {
        let extracted = extract_reasoning_trace(&json!("  sample reasoning  "));
        assert_eq!(extracted.as_deref(), Some("sample reasoning"));
    }

    #[test]
    fn joins_thinking_blocks() {
        let value = json!([
            {"type": "thinking", "thinking": "step one", "signature": "abc"},
            {"type": "thinking", "thinking": "step two", "signature": "def"}
        ]);
        assert_eq!(
            extract_reasoning_trace(&value).as_deref(),
            Some("step one\nstep two")
        );
    }

    #[test]
    fn reads_openai_reasoning_summaries() {
        let value = json!({
            "effort": "high",
            "summary": [{"type": "summary_text", "text": "checked the docs"}]
        });
        assert_eq!(
            extract_reasoning_trace(&value).as_deref(),
            Some("checked the docs")
        );
    }

    #[test]
    fn drops_adjacent_duplicates_and_blanks() {
        let value = json!(["repeat", "repeat", "  ", "unique"]);
        assert_eq!(
            extract_reasoning_trace(&value).as_deref(),
            Some("repeat\nunique")
        );
        assert_eq!(extract_reasoning_trace(&json!([])), None);
    }
}
