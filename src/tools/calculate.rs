use super::traits::{ParamSpec, RuntimeContext, Tool, ToolCategory, ToolResult};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Arithmetic expression evaluator: `+ - * / %`, parentheses, unary minus.
///
/// A small recursive-descent parser; expressions never reach `eval`-style
/// machinery or the shell.
pub struct CalculateTool;

impl CalculateTool {
    pub const fn new() -> Self {
        Self
    }
}

const MAX_EXPRESSION_LEN: usize = 256;

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn parse_expression(&mut self) -> Result<f64, String> {
        let mut value = self.parse_term()?;
        loop {
            match self.peek() {
                Some(b'+') => {
                    self.bump();
                    value += self.parse_term()?;
                }
                Some(b'-') => {
                    self.bump();
                    value -= self.parse_term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn parse_term(&mut self) -> Result<f64, String> {
        let mut value = self.parse_factor()?;
        loop {
            match self.peek() {
                Some(b'*') => {
                    self.bump();
                    value *= self.parse_factor()?;
                }
                Some(b'/') => {
                    self.bump();
                    let divisor = self.parse_factor()?;
                    if divisor == 0.0 {
                        return Err("division by zero".to_string());
                    }
                    value /= divisor;
                }
                Some(b'%') => {
                    self.bump();
                    let divisor = self.parse_factor()?;
                    if divisor == 0.0 {
                        return Err("division by zero".to_string());
                    }
                    value %= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    fn parse_factor(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some(b'-') => {
                self.bump();
                Ok(-self.parse_factor()?)
            }
            Some(b'(') => {
                self.bump();
                let value = self.parse_expression()?;
                if self.peek() != Some(b')') {
                    return Err("missing closing parenthesis".to_string());
                }
                self.bump();
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.parse_number(),
            Some(c) => Err(format!("unexpected character '{}'", c as char)),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn parse_number(&mut self) -> Result<f64, String> {
        self.skip_whitespace();
        let start = self.pos;
        while self.pos < self.input.len()
            && (self.input[self.pos].is_ascii_digit() || self.input[self.pos] == b'.')
        {
            self.pos += 1;
        }
        let slice = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| "invalid number".to_string())?;
        slice.parse::<f64>().map_err(|_| format!("invalid number '{slice}'"))
    }
}

pub(crate) fn evaluate(expression: &str) -> Result<f64, String> {
    let mut parser = Parser::new(expression);
    let value = parser.parse_expression()?;
    if parser.peek().is_some() {
        return Err(format!(
            "trailing input at position {}",
            parser.pos
        ));
    }
    if !value.is_finite() {
        return Err("result is not a finite number".to_string());
    }
    Ok(value)
}

fn excerpt(expression: &str) -> String {
    if expression.chars().count() > 40 {
        let truncated: String = expression.chars().take(40).collect();
        format!("{truncated}...")
    } else {
        expression.to_string()
    }
}

#[async_trait]
impl Tool for CalculateTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression (+, -, *, /, %, parentheses)"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Calculation
    }

    fn parameters(&self) -> BTreeMap<String, ParamSpec> {
        BTreeMap::from([(
            "expression".to_string(),
            ParamSpec::new("string", "Arithmetic expression, e.g. (1200 * 0.18) / 12", true),
        )])
    }

    fn run_label(&self, params: &Value) -> String {
        match params.get("expression").and_then(Value::as_str) {
            Some(expression) => format!("Calculating {}", excerpt(expression)),
            None => "Calculating".to_string(),
        }
    }

    async fn execute(&self, params: Value, _ctx: &RuntimeContext) -> anyhow::Result<ToolResult> {
        let Some(expression) = params.get("expression").and_then(Value::as_str) else {
            return Ok(ToolResult::failure("Missing 'expression' parameter"));
        };
        if expression.trim().is_empty() {
            return Ok(ToolResult::failure("Expression is empty"));
        }
        if expression.len() > MAX_EXPRESSION_LEN {
            return Ok(ToolResult::failure(format!(
                "Expression exceeds {MAX_EXPRESSION_LEN} characters"
            )));
        }

        match evaluate(expression) {
            Ok(result) => Ok(ToolResult::ok(
                json!({"expression": expression, "result": result}),
                format!("{} = {}", expression.trim(), result),
            )),
            Err(message) => Ok(ToolResult::failure(format!(
                "Could not evaluate '{expression}': {message}"
            ))),
        }
    }
}
