//! Tool-call wire protocol embedded in model output.
//!
//! The model requests a tool by emitting a sentinel-delimited JSON object in
//! its reply text. Model output is unreliable input: every malformed shape
//! (missing closing sentinel, broken JSON, missing `tool` field) degrades to
//! a final answer instead of an error, so bad output can never crash the loop.

use serde_json::Value;

pub const TOOL_CALL_OPEN: &str = "|||TOOL_CALL|||";
pub const TOOL_CALL_CLOSE: &str = "|||END_TOOL_CALL|||";

/// A structured tool request parsed from one model response. At most one per
/// model turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub tool: String,
    pub params: Value,
}

/// What one model response amounts to, as a tagged union so the loop's
/// branching is exhaustive.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelTurn {
    /// No (valid) tool-call block: the text is the final answer.
    FinalAnswer { text: String },
    /// One decoded tool call plus the surrounding free text.
    ToolInvocation {
        call: ToolCall,
        text_before: String,
        text_after: String,
    },
}

/// Decode one model response. Total: never fails, never panics.
pub fn decode(text: &str) -> ModelTurn {
    let Some(open) = text.find(TOOL_CALL_OPEN) else {
        return ModelTurn::FinalAnswer {
            text: text.to_string(),
        };
    };

    let payload_start = open + TOOL_CALL_OPEN.len();
    let Some(close_offset) = text[payload_start..].find(TOOL_CALL_CLOSE) else {
        // Opening sentinel without a closing one: treat the whole response as
        // plain text.
        return ModelTurn::FinalAnswer {
            text: text.to_string(),
        };
    };

    let payload = &text[payload_start..payload_start + close_offset];
    let Ok(parsed) = serde_json::from_str::<Value>(payload.trim()) else {
        return ModelTurn::FinalAnswer {
            text: text.to_string(),
        };
    };

    let Some(tool) = parsed
        .get("tool")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
    else {
        return ModelTurn::FinalAnswer {
            text: text.to_string(),
        };
    };

    let params = match parsed.get("params") {
        Some(Value::Object(map)) => Value::Object(map.clone()),
        _ => Value::Object(serde_json::Map::new()),
    };

    ModelTurn::ToolInvocation {
        call: ToolCall {
            tool: tool.to_string(),
            params,
        },
        text_before: text[..open].to_string(),
        text_after: text[payload_start + close_offset + TOOL_CALL_CLOSE.len()..].to_string(),
    }
}
