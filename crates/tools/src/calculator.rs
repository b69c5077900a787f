//! Calculator tool — evaluates a single arithmetic expression.
//!
//! Numbers, `+`, `-`, `*`, `/`, and parentheses only. The charset is
//! validated up front so the model can't smuggle anything else in, and
//! division by zero surfaces as a non-finite-result error string rather
//! than a fault.

use async_trait::async_trait;
use hearth_core::error::ToolError;
use hearth_core::tool::{Tool, ToolArgs};
use serde_json::Value;

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Use when the user asks to calculate, compute, or do arithmetic (e.g. 'what is 103 times \
         6?', 'compute 15% of 200'). Always use this tool for numeric calculations—do not compute \
         in your head. Pass \"expression\" in args (e.g. \"103*6\", \"2+3*4\"). For conceptual \
         math (explain, define) answer in plain text; do not call this tool."
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": { "expression": { "type": "string" } },
            "required": ["expression"]
        })
    }

    fn example_call(&self) -> Option<&str> {
        Some(r#"<tool_call>{"name":"calculator","args":{"expression":"103*6"}}</tool_call>"#)
    }

    fn compact_hint(&self) -> Option<&str> {
        Some("expression")
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let expression = args
            .get("expression")
            .or_else(|| args.get("expr"))
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if expression.is_empty() {
            return Ok("Error: missing \"expression\" argument for calculator.".to_string());
        }
        if !is_valid_arithmetic(expression) {
            return Ok(
                "Error: invalid expression. Use only numbers and +, -, *, /, (, ).".to_string(),
            );
        }
        match evaluate(expression) {
            Ok(value) if value.is_finite() => Ok(format!("Result: {value}")),
            Ok(_) => Ok(
                "Error: result is not a finite number (e.g. division by zero).".to_string(),
            ),
            Err(_) => Ok("Error: expression did not evaluate to a number.".to_string()),
        }
    }
}

fn is_valid_arithmetic(s: &str) -> bool {
    s.chars().all(|c| "0123456789. +-*/()".contains(c))
}

/// Evaluate an arithmetic expression string.
pub fn evaluate(expr: &str) -> Result<f64, String> {
    let chars: Vec<char> = expr.chars().collect();
    let mut parser = ExprParser { chars, pos: 0 };
    let result = parser.parse_expr()?;
    parser.skip_spaces();
    if parser.pos != parser.chars.len() {
        return Err(format!("Unparsed remainder at position {}", parser.pos));
    }
    Ok(result)
}

struct ExprParser {
    chars: Vec<char>,
    pos: usize,
}

impl ExprParser {
    fn skip_spaces(&mut self) {
        while self.pos < self.chars.len() && self.chars[self.pos] == ' ' {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    // expr = term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<f64, String> {
        self.skip_spaces();
        let mut left = self.parse_term()?;
        loop {
            self.skip_spaces();
            match self.peek() {
                Some('+') => {
                    self.pos += 1;
                    left += self.parse_term()?;
                }
                Some('-') => {
                    self.pos += 1;
                    left -= self.parse_term()?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    // term = factor (('*' | '/') factor)*
    fn parse_term(&mut self) -> Result<f64, String> {
        self.skip_spaces();
        let mut left = self.parse_factor()?;
        loop {
            self.skip_spaces();
            match self.peek() {
                Some('*') => {
                    self.pos += 1;
                    left *= self.parse_factor()?;
                }
                Some('/') => {
                    self.pos += 1;
                    let right = self.parse_factor()?;
                    if right == 0.0 {
                        // Reported as a non-finite result by the caller.
                        return Ok(f64::INFINITY);
                    }
                    left /= right;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    // factor = signed number | '(' expr ')'
    fn parse_factor(&mut self) -> Result<f64, String> {
        self.skip_spaces();
        if self.peek() == Some('(') {
            self.pos += 1;
            let value = self.parse_expr()?;
            self.skip_spaces();
            if self.peek() == Some(')') {
                self.pos += 1;
            }
            return Ok(value);
        }
        let start = self.pos;
        if matches!(self.peek(), Some('+') | Some('-')) {
            self.pos += 1;
        }
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == '.')
        {
            self.pos += 1;
        }
        let number: String = self.chars[start..self.pos].iter().collect();
        number
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("Not a number: {number}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(expression: &str) -> ToolArgs {
        let mut args = ToolArgs::new();
        args.insert("expression".into(), Value::String(expression.into()));
        args
    }

    #[test]
    fn simple_arithmetic() {
        assert_eq!(evaluate("2 + 3").unwrap(), 5.0);
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("10 / 4").unwrap(), 2.5);
    }

    #[test]
    fn unary_signs() {
        assert_eq!(evaluate("-5 + 3").unwrap(), -2.0);
        assert_eq!(evaluate("2 * -3").unwrap(), -6.0);
    }

    #[test]
    fn division_by_zero_is_infinite() {
        assert!(evaluate("1 / 0").unwrap().is_infinite());
    }

    #[test]
    fn malformed_expressions_error() {
        assert!(evaluate("2 +").is_err());
        assert!(evaluate("").is_err());
        assert!(evaluate("2 2").is_err());
    }

    #[tokio::test]
    async fn tool_formats_result() {
        let result = CalculatorTool.execute(&args("103*6")).await.unwrap();
        assert_eq!(result, "Result: 618");
    }

    #[tokio::test]
    async fn tool_decimal_result() {
        let result = CalculatorTool.execute(&args("10/4")).await.unwrap();
        assert_eq!(result, "Result: 2.5");
    }

    #[tokio::test]
    async fn tool_missing_expression() {
        let result = CalculatorTool.execute(&ToolArgs::new()).await.unwrap();
        assert_eq!(result, "Error: missing \"expression\" argument for calculator.");
    }

    #[tokio::test]
    async fn tool_accepts_expr_alias() {
        let mut args = ToolArgs::new();
        args.insert("expr".into(), Value::String("2+2".into()));
        let result = CalculatorTool.execute(&args).await.unwrap();
        assert_eq!(result, "Result: 4");
    }

    #[tokio::test]
    async fn tool_rejects_invalid_charset() {
        let result = CalculatorTool.execute(&args("2 + x")).await.unwrap();
        assert!(result.starts_with("Error: invalid expression."));
    }

    #[tokio::test]
    async fn tool_reports_division_by_zero() {
        let result = CalculatorTool.execute(&args("1/0")).await.unwrap();
        assert!(result.contains("not a finite number"));
    }
}
