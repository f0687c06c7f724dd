use super::traits::{ParamSpec, RuntimeContext, Tool, ToolCategory, ToolResult};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Deterministic recovery-likelihood score for a delinquent account.
pub struct CollectionsScoreTool;

impl CollectionsScoreTool {
    pub const fn new() -> Self {
        Self
    }
}

fn recommended_action(likelihood: u32, days_past_due: f64) -> &'static str {
    if days_past_due >= 180.0 {
        "legal_review"
    } else if likelihood >= 70 {
        "soft_reminder"
    } else if likelihood >= 40 {
        "payment_plan"
    } else {
        "escalate"
    }
}

fn number_param(params: &Value, key: &str) -> Option<f64> {
    params.get(key).and_then(Value::as_f64)
}

#[async_trait]
impl Tool for CollectionsScoreTool {
    fn name(&self) -> &str {
        "collections_score"
    }

    fn description(&self) -> &str {
        "Estimate recovery likelihood for a delinquent account and recommend the next action"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Scoring
    }

    fn parameters(&self) -> BTreeMap<String, ParamSpec> {
        BTreeMap::from([
            (
                "days_past_due".to_string(),
                ParamSpec::new("number", "Days since the oldest unpaid due date", true),
            ),
            (
                "outstanding_balance".to_string(),
                ParamSpec::new("number", "Outstanding balance in dollars", true),
            ),
            (
                "broken_promises".to_string(),
                ParamSpec::new("number", "Payment promises broken so far", false),
            ),
            (
                "last_contact_days_ago".to_string(),
                ParamSpec::new("number", "Days since the debtor was last reached", false),
            ),
        ])
    }

    fn run_label(&self, _params: &Value) -> String {
        "Scoring collections account".to_string()
    }

    async fn execute(&self, params: Value, _ctx: &RuntimeContext) -> anyhow::Result<ToolResult> {
        let Some(days_past_due) = number_param(&params, "days_past_due") else {
            return Ok(ToolResult::failure("Missing 'days_past_due' parameter"));
        };
        let Some(balance) = number_param(&params, "outstanding_balance") else {
            return Ok(ToolResult::failure("Missing 'outstanding_balance' parameter"));
        };

        if days_past_due < 0.0 {
            return Ok(ToolResult::failure("'days_past_due' cannot be negative"));
        }
        if balance < 0.0 {
            return Ok(ToolResult::failure("'outstanding_balance' cannot be negative"));
        }

        let broken_promises = number_param(&params, "broken_promises").unwrap_or(0.0);
        let last_contact = number_param(&params, "last_contact_days_ago").unwrap_or(30.0);

        // Recovery likelihood decays with age and disengagement.
        let mut likelihood = 95.0;
        likelihood -= (days_past_due / 30.0).min(12.0) * 6.0;
        likelihood -= broken_promises.min(10.0) * 7.0;
        likelihood -= (last_contact / 30.0).min(6.0) * 4.0;
        if balance > 10_000.0 {
            likelihood -= 8.0;
        }

        let likelihood = likelihood.clamp(0.0, 100.0).round() as u32;
        let action = recommended_action(likelihood, days_past_due);

        Ok(ToolResult::ok(
            json!({
                "recovery_likelihood": likelihood,
                "recommended_action": action,
                "days_past_due": days_past_due,
                "outstanding_balance": balance,
            }),
            format!("Recovery likelihood {likelihood}%, recommended action: {action}"),
        ))
    }
}
