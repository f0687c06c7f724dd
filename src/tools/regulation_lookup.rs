use super::traits::{ParamSpec, RuntimeContext, Tool, ToolCategory, ToolResult};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Lookup of US consumer-credit regulation summaries by topic.
///
/// Entries are informational summaries for operator guidance, not legal
/// advice; the agent prompt carries the same disclaimer.
pub struct RegulationLookupTool;

impl RegulationLookupTool {
    pub const fn new() -> Self {
        Self
    }
}

struct RegulationEntry {
    topic: &'static str,
    regulation: &'static str,
    keywords: &'static [&'static str],
    summary: &'static str,
}

const REGULATIONS: &[RegulationEntry] = &[
    RegulationEntry {
        topic: "contact_hours",
        regulation: "FDCPA §805(a)",
        keywords: &["contact", "hours", "call time", "inconvenient"],
        summary: "Debt collectors may not contact consumers before 8am or after 9pm local time \
                  at the consumer's location, absent prior consent.",
    },
    RegulationEntry {
        topic: "contact_frequency",
        regulation: "Regulation F, 12 CFR 1006.14",
        keywords: &["frequency", "repeated", "seven", "call cap"],
        summary: "A collector is presumed to violate the FDCPA by placing more than seven calls \
                  within seven consecutive days about a particular debt, or calling within seven \
                  days after a telephone conversation about that debt.",
    },
    RegulationEntry {
        topic: "harassment",
        regulation: "FDCPA §806",
        keywords: &["harass", "abuse", "threat", "profane"],
        summary: "Conduct whose natural consequence is to harass, oppress, or abuse is prohibited, \
                  including threats of violence, obscene language, and repeated calls intended to \
                  annoy.",
    },
    RegulationEntry {
        topic: "validation_notice",
        regulation: "FDCPA §809",
        keywords: &["validation", "verification", "dispute", "notice"],
        summary: "Within five days of initial communication the collector must send a written \
                  validation notice; if the consumer disputes in writing within 30 days, \
                  collection must pause until verification is provided.",
    },
    RegulationEntry {
        topic: "credit_reporting",
        regulation: "FCRA §623",
        keywords: &["reporting", "furnisher", "credit report", "accuracy"],
        summary: "Furnishers must report accurate information, investigate disputes forwarded by \
                  consumer reporting agencies, and correct or delete information found inaccurate \
                  or unverifiable.",
    },
    RegulationEntry {
        topic: "apr_disclosure",
        regulation: "TILA, Regulation Z",
        keywords: &["apr", "disclosure", "finance charge", "truth in lending"],
        summary: "Creditors must disclose the annual percentage rate, finance charge, amount \
                  financed, and total of payments clearly and conspicuously before consummation.",
    },
    RegulationEntry {
        topic: "servicemembers",
        regulation: "SCRA 50 USC §3937",
        keywords: &["military", "servicemember", "active duty", "interest cap"],
        summary: "Interest on obligations incurred before military service is capped at 6% during \
                  active duty, on written notice; the excess is forgiven, not deferred.",
    },
];

fn find_entry(topic: &str) -> Option<&'static RegulationEntry> {
    let needle = topic.trim().to_lowercase();
    REGULATIONS
        .iter()
        .find(|entry| entry.topic == needle)
        .or_else(|| {
            REGULATIONS.iter().find(|entry| {
                entry.keywords.iter().any(|kw| needle.contains(kw))
                    || needle.contains(entry.topic)
                    || entry.regulation.to_lowercase().contains(&needle)
            })
        })
}

fn available_topics() -> Vec<&'static str> {
    REGULATIONS.iter().map(|entry| entry.topic).collect()
}

#[async_trait]
impl Tool for RegulationLookupTool {
    fn name(&self) -> &str {
        "regulation_lookup"
    }

    fn description(&self) -> &str {
        "Look up a US consumer-credit regulation summary by topic"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Regulatory
    }

    fn parameters(&self) -> BTreeMap<String, ParamSpec> {
        BTreeMap::from([(
            "topic".to_string(),
            ParamSpec::new(
                "string",
                "Regulation topic, e.g. contact_hours, harassment, credit_reporting",
                true,
            ),
        )])
    }

    fn run_label(&self, params: &Value) -> String {
        match params.get("topic").and_then(Value::as_str) {
            Some(topic) => format!("Checking {topic} regulations"),
            None => "Checking regulations".to_string(),
        }
    }

    async fn execute(&self, params: Value, _ctx: &RuntimeContext) -> anyhow::Result<ToolResult> {
        let Some(topic) = params.get("topic").and_then(Value::as_str) else {
            return Ok(ToolResult::failure("Missing 'topic' parameter"));
        };

        match find_entry(topic) {
            Some(entry) => Ok(ToolResult::ok(
                json!({
                    "topic": entry.topic,
                    "regulation": entry.regulation,
                    "summary": entry.summary,
                }),
                format!("{}: {}", entry.regulation, entry.topic),
            )),
            None => Ok(ToolResult::failure(format!(
                "No regulation entry for '{topic}'. Available topics: {}",
                available_topics().join(", ")
            ))),
        }
    }
}
