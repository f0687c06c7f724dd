use super::traits::{ParamSpec, RuntimeContext, Tool, ToolCategory, ToolResult};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Case-insensitive snippet search over the document text attached to the
/// conversation (provided by the caller through [`RuntimeContext`]).
pub struct DocumentSearchTool;

impl DocumentSearchTool {
    pub const fn new() -> Self {
        Self
    }
}

const DEFAULT_MAX_RESULTS: usize = 5;
const SNIPPET_CONTEXT_CHARS: usize = 120;

fn snippet_around(line: &str, query_lower: &str) -> String {
    let line_lower = line.to_lowercase();
    let Some(hit) = line_lower.find(query_lower) else {
        return line.trim().to_string();
    };
    let start = line[..hit]
        .char_indices()
        .rev()
        .take(SNIPPET_CONTEXT_CHARS / 2)
        .last()
        .map_or(0, |(i, _)| i);
    let end = line[hit..]
        .char_indices()
        .take(SNIPPET_CONTEXT_CHARS)
        .last()
        .map_or(line.len(), |(i, c)| hit + i + c.len_utf8());
    line[start..end].trim().to_string()
}

fn query_excerpt(query: &str) -> String {
    if query.chars().count() > 30 {
        let truncated: String = query.chars().take(30).collect();
        format!("{truncated}...")
    } else {
        query.to_string()
    }
}

#[async_trait]
impl Tool for DocumentSearchTool {
    fn name(&self) -> &str {
        "document_search"
    }

    fn description(&self) -> &str {
        "Search the attached document for passages matching a query"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Search
    }

    fn parameters(&self) -> BTreeMap<String, ParamSpec> {
        BTreeMap::from([
            (
                "query".to_string(),
                ParamSpec::new("string", "Text to search for in the document", true),
            ),
            (
                "max_results".to_string(),
                ParamSpec::new("number", "Maximum number of matches to return (default 5)", false),
            ),
        ])
    }

    fn run_label(&self, params: &Value) -> String {
        match params.get("query").and_then(Value::as_str) {
            Some(query) => format!("Searching documents for \"{}\"", query_excerpt(query)),
            None => "Searching documents".to_string(),
        }
    }

    async fn execute(&self, params: Value, ctx: &RuntimeContext) -> anyhow::Result<ToolResult> {
        let Some(query) = params.get("query").and_then(Value::as_str) else {
            return Ok(ToolResult::failure("Missing 'query' parameter"));
        };
        if query.trim().is_empty() {
            return Ok(ToolResult::failure("Query is empty"));
        }

        let Some(document) = ctx.document_text.as_deref() else {
            return Ok(ToolResult::failure(
                "No document is attached to this conversation",
            ));
        };

        let max_results = params
            .get("max_results")
            .and_then(Value::as_u64)
            .map_or(DEFAULT_MAX_RESULTS, |n| n.clamp(1, 20) as usize);

        let query_lower = query.trim().to_lowercase();
        let mut matches = Vec::new();
        for (index, line) in document.lines().enumerate() {
            if line.to_lowercase().contains(&query_lower) {
                matches.push(json!({
                    "line": index + 1,
                    "snippet": snippet_around(line, &query_lower),
                }));
                if matches.len() >= max_results {
                    break;
                }
            }
        }

        if matches.is_empty() {
            return Ok(ToolResult::failure(format!(
                "No passages matching '{}' found in the document",
                query.trim()
            )));
        }

        let count = matches.len();
        Ok(ToolResult::ok(
            json!({"query": query.trim(), "matches": matches}),
            format!("Found {count} passage(s) matching '{}'", query.trim()),
        ))
    }
}
