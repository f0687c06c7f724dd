use super::traits::{ParamSpec, RuntimeContext, Tool, ToolCategory, ToolResult};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Deterministic credit-profile score on a 300–850 scale.
pub struct CreditScoreTool;

impl CreditScoreTool {
    pub const fn new() -> Self {
        Self
    }
}

const BASE_SCORE: f64 = 640.0;

fn band(score: u32) -> &'static str {
    match score {
        0..=579 => "poor",
        580..=669 => "fair",
        670..=739 => "good",
        740..=799 => "very_good",
        _ => "excellent",
    }
}

fn number_param(params: &Value, key: &str) -> Option<f64> {
    params.get(key).and_then(Value::as_f64)
}

#[async_trait]
impl Tool for CreditScoreTool {
    fn name(&self) -> &str {
        "credit_score"
    }

    fn description(&self) -> &str {
        "Score a borrower's credit profile from income, debt and payment history"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Scoring
    }

    fn parameters(&self) -> BTreeMap<String, ParamSpec> {
        BTreeMap::from([
            (
                "annual_income".to_string(),
                ParamSpec::new("number", "Gross annual income in dollars", true),
            ),
            (
                "total_debt".to_string(),
                ParamSpec::new("number", "Total outstanding debt in dollars", true),
            ),
            (
                "missed_payments_12m".to_string(),
                ParamSpec::new("number", "Missed payments in the last 12 months", true),
            ),
            (
                "credit_utilization".to_string(),
                ParamSpec::new(
                    "number",
                    "Revolving credit utilization as a fraction (0.0-1.0)",
                    false,
                ),
            ),
            (
                "years_of_history".to_string(),
                ParamSpec::new("number", "Age of the oldest account in years", false),
            ),
        ])
    }

    fn run_label(&self, _params: &Value) -> String {
        "Scoring credit profile".to_string()
    }

    async fn execute(&self, params: Value, _ctx: &RuntimeContext) -> anyhow::Result<ToolResult> {
        let Some(annual_income) = number_param(&params, "annual_income") else {
            return Ok(ToolResult::failure("Missing 'annual_income' parameter"));
        };
        let Some(total_debt) = number_param(&params, "total_debt") else {
            return Ok(ToolResult::failure("Missing 'total_debt' parameter"));
        };
        let Some(missed_payments) = number_param(&params, "missed_payments_12m") else {
            return Ok(ToolResult::failure("Missing 'missed_payments_12m' parameter"));
        };

        if annual_income < 0.0 || total_debt < 0.0 || missed_payments < 0.0 {
            return Ok(ToolResult::failure(
                "Income, debt and missed payments must be non-negative",
            ));
        }

        let utilization = number_param(&params, "credit_utilization").unwrap_or(0.3);
        let years_of_history = number_param(&params, "years_of_history").unwrap_or(5.0);

        let mut score = BASE_SCORE;
        let mut factors: Vec<String> = Vec::new();

        // Debt-to-income, capped so degenerate inputs can't dominate.
        let dti = if annual_income > 0.0 {
            (total_debt / annual_income).min(3.0)
        } else {
            3.0
        };
        score -= dti * 60.0;
        if dti > 0.43 {
            factors.push(format!("High debt-to-income ratio ({:.0}%)", dti * 100.0));
        }

        score -= missed_payments.min(12.0) * 25.0;
        if missed_payments > 0.0 {
            factors.push(format!("{missed_payments:.0} missed payments in the last 12 months"));
        }

        score -= (utilization.clamp(0.0, 1.0) - 0.3).max(0.0) * 200.0;
        if utilization > 0.5 {
            factors.push(format!("High credit utilization ({:.0}%)", utilization * 100.0));
        }

        score += years_of_history.min(20.0) * 4.0;
        if years_of_history < 2.0 {
            factors.push("Thin credit history".to_string());
        }

        let score = score.clamp(300.0, 850.0).round() as u32;
        let band = band(score);

        Ok(ToolResult::ok(
            json!({
                "score": score,
                "band": band,
                "debt_to_income": (dti * 100.0).round() / 100.0,
                "factors": factors,
            }),
            format!("Credit score {score} ({band})"),
        ))
    }
}
