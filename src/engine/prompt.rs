//! System-prompt assembly: the agent's own instructions plus the tool-call
//! protocol and the flattened descriptor of every allowed tool.

use super::protocol::{TOOL_CALL_CLOSE, TOOL_CALL_OPEN};
use crate::tools::ToolSpec;
use std::fmt::Write;

/// Appended to the conversation when the iteration budget is exhausted.
pub const FORCED_FINAL_INSTRUCTION: &str = "\
You have used all available tool calls for this request. No more tools can be \
invoked. Based on everything gathered so far, provide your final answer to the \
user now, as plain text with no tool-call blocks.";

/// Sent when even the forced-final model call fails; the client always
/// receives an answer before the terminal marker.
pub const FALLBACK_ANSWER: &str = "\
I wasn't able to finish working on this request. Based on the steps completed \
so far, no reliable answer can be given; please try again.";

/// Build the system prompt for a run. With no allowed tools the agent prompt
/// passes through untouched.
pub fn build_system_prompt(agent_prompt: &str, specs: &[ToolSpec]) -> String {
    if specs.is_empty() {
        return agent_prompt.to_string();
    }

    let mut prompt = String::with_capacity(agent_prompt.len() + 1024);
    prompt.push_str(agent_prompt);
    prompt.push_str("\n\n## Available tools\n\n");

    for spec in specs {
        let _ = writeln!(prompt, "### {}\n{}", spec.name, spec.description);
        if spec.parameters.is_empty() {
            prompt.push_str("Parameters: none\n\n");
            continue;
        }
        prompt.push_str("Parameters:\n");
        for (name, param) in &spec.parameters {
            let requirement = if param.required { "required" } else { "optional" };
            let _ = writeln!(
                prompt,
                "- {name} ({}, {requirement}): {}",
                param.param_type, param.description
            );
        }
        prompt.push('\n');
    }

    let _ = write!(
        prompt,
        "## Tool call protocol\n\n\
         To invoke a tool, emit exactly one block in your reply:\n\n\
         {TOOL_CALL_OPEN}\n\
         {{\"tool\": \"<tool_name>\", \"params\": {{<parameters>}}}}\n\
         {TOOL_CALL_CLOSE}\n\n\
         Rules:\n\
         - At most one tool call per reply. Its result comes back in the next turn.\n\
         - When no tool is needed, reply with your final answer as plain text and \
         no tool-call block.\n\
         - Only the tools listed above are available."
    );

    prompt
}

/// Corrective user turn sent when the model names a tool that does not
/// resolve or is not in the allow-list.
pub fn corrective_message(rejected: &str, allowed: &[String]) -> String {
    if allowed.is_empty() {
        format!(
            "The tool '{rejected}' is not available, and no tools are available for \
             this conversation. Provide your final answer as plain text."
        )
    } else {
        format!(
            "The tool '{rejected}' is not available. Available tools: {}. Use one of \
             these, or provide your final answer as plain text.",
            allowed.join(", ")
        )
    }
}
