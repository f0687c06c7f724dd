//! Typed, append-only record of everything a run does, plus the event frames
//! the transport layer streams to the client.

use crate::tools::ToolCategory;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cap on string values embedded in event payloads.
pub const MAX_STRING_CHARS: usize = 500;
/// Cap on array values embedded in event payloads.
pub const MAX_ARRAY_ITEMS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    LlmReasoning,
    ToolCall,
    DataFetch,
    RuleCheck,
    Decision,
}

impl From<ToolCategory> for StepType {
    fn from(category: ToolCategory) -> Self {
        match category {
            ToolCategory::Scoring | ToolCategory::Regulatory => Self::RuleCheck,
            ToolCategory::Search => Self::DataFetch,
            ToolCategory::Calculation => Self::ToolCall,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Completed,
    Error,
}

/// One observable unit of loop activity. Two events per transition (`running`
/// then `completed`/`error` with the same `step` number), except steps that
/// complete atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepEvent {
    pub step_type: StepType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    pub label: String,
    pub status: StepStatus,
    /// 1-based, strictly increasing across the run.
    pub step: u32,
    #[serde(rename = "maxSteps")]
    pub max_steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl StepEvent {
    pub fn running(
        step_type: StepType,
        label: impl Into<String>,
        step: u32,
        max_steps: u32,
    ) -> Self {
        Self {
            step_type,
            tool: None,
            label: label.into(),
            status: StepStatus::Running,
            step,
            max_steps,
            duration_ms: None,
            summary: None,
            input_data: None,
            output_data: None,
            error_message: None,
        }
    }

    /// A step that completes atomically: one `completed` event, no `running`
    /// counterpart.
    pub fn atomic(
        step_type: StepType,
        label: impl Into<String>,
        step: u32,
        max_steps: u32,
    ) -> Self {
        Self {
            status: StepStatus::Completed,
            ..Self::running(step_type, label, step, max_steps)
        }
    }

    /// Derive the closing event for a `running` step.
    pub fn finish(&self, status: StepStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_input(mut self, input: &Value) -> Self {
        self.input_data = Some(sanitize_value(input));
        self
    }

    pub fn with_output(mut self, output: &Value) -> Self {
        self.output_data = Some(sanitize_value(output));
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// Event frames streamed to the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    Step { data: StepEvent },
    Token { content: String },
    StepsComplete { steps: Vec<StepEvent> },
    Done { provider: String, model: String },
    Error { message: String },
}

/// Bound payload size regardless of tool output size. Applied uniformly:
/// long strings are truncated with an ellipsis marker, long arrays with a
/// `+N more` marker, recursively through objects and arrays.
pub fn sanitize_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(truncate_chars(s, MAX_STRING_CHARS)),
        Value::Array(items) => {
            let mut sanitized: Vec<Value> = items
                .iter()
                .take(MAX_ARRAY_ITEMS)
                .map(sanitize_value)
                .collect();
            if items.len() > MAX_ARRAY_ITEMS {
                sanitized.push(Value::String(format!(
                    "+{} more",
                    items.len() - MAX_ARRAY_ITEMS
                )));
            }
            Value::Array(sanitized)
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, val)| (key.clone(), sanitize_value(val)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Truncate to at most `max_chars` characters, appending an ellipsis marker
/// when anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{truncated}...")
}
