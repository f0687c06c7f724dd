use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Result of a tool execution.
///
/// `success: false` is a normal outcome for business-level failures (invalid
/// input, unavailable data) and always carries a human-readable summary.
/// Tools reserve `Err` for truly exceptional conditions; the loop controller
/// converts those to failed results anyway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub data: Value,
    pub summary: String,
}

impl ToolResult {
    pub fn ok(data: Value, summary: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            summary: summary.into(),
        }
    }

    pub fn failure(summary: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            summary: summary.into(),
        }
    }
}

/// Coarse tool classification; drives the step type of emitted events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Scoring,
    Regulatory,
    Search,
    Calculation,
}

/// One entry of the flattened parameter schema — the only contract the model
/// sees for a parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
    pub required: bool,
}

impl ParamSpec {
    pub fn new(param_type: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            param_type: param_type.into(),
            description: description.into(),
            required,
        }
    }
}

/// Description of a tool as exposed to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub category: ToolCategory,
    pub parameters: BTreeMap<String, ParamSpec>,
}

/// Read-only identifiers and optional precomputed context a tool may consult.
#[derive(Debug, Clone, Default)]
pub struct RuntimeContext {
    pub agent_id: String,
    pub agent_slug: String,
    /// Extracted text of a document attached to the conversation, if any.
    pub document_text: Option<String>,
}

/// Core tool trait — implement for any capability.
///
/// Tools are deterministic and side-effect-bounded to their own domain: a
/// scoring tool never calls the model or other tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (the key the model uses in tool-call blocks).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    fn category(&self) -> ToolCategory;

    /// Flattened parameter schema, in deterministic order.
    fn parameters(&self) -> BTreeMap<String, ParamSpec>;

    /// Execute the tool with given arguments.
    async fn execute(&self, params: Value, ctx: &RuntimeContext) -> anyhow::Result<ToolResult>;

    /// Human-readable label shown to the client while the tool runs.
    fn run_label(&self, _params: &Value) -> String {
        format!("Running `{}`", self.name())
    }

    /// Get the full spec for model registration.
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            category: self.category(),
            parameters: self.parameters(),
        }
    }
}
