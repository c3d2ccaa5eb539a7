//! Arithmetic calculator tool (gated).

use async_trait::async_trait;
use serde::Deserialize;

use gk_core::{
    Action, ApprovalGate, Error, PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters,
};

const ALLOWED: &str = "0123456789+-*/.() ";

/// Deepest nesting of parentheses, signs and powers the parser will follow.
const MAX_DEPTH: usize = 256;

/// Evaluate an arithmetic expression.
///
/// Supports `+ - * /`, floor division `//`, power `**`, unary signs and
/// parentheses. Anything else is rejected before parsing.
pub fn evaluate(expression: &str) -> Result<f64, String> {
    if !expression.chars().all(|c| ALLOWED.contains(c)) {
        return Err("Only basic mathematical operations are allowed".to_string());
    }

    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err("Empty expression".to_string());
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err("Unexpected trailing input".to_string());
    }
    if !value.is_finite() {
        return Err("Result is not a finite number".to_string());
    }
    Ok(value)
}

/// Render a result the way a person would write it: `345`, not `345.0`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    FloorDiv,
    Pow,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' => {}
            '+' => tokens.push(Token::Plus),
            '-' => tokens.push(Token::Minus),
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Pow);
                i += 1;
            }
            '*' => tokens.push(Token::Star),
            '/' if chars.get(i + 1) == Some(&'/') => {
                tokens.push(Token::FloorDiv);
                i += 1;
            }
            '/' => tokens.push(Token::Slash),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            _ => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid number '{}'", literal))?;
                tokens.push(Token::Num(value));
                continue;
            }
        }
        i += 1;
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == Token::Plus { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::FloorDiv)) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                Token::Star => value * rhs,
                _ if rhs == 0.0 => return Err("division by zero".to_string()),
                Token::Slash => value / rhs,
                _ => (value / rhs).floor(),
            };
        }
        Ok(value)
    }

    // Every recursive path passes through here.
    fn unary(&mut self) -> Result<f64, String> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err("Expression nested too deeply".to_string());
        }
        let value = self.signed();
        self.depth -= 1;
        value
    }

    // Unary minus binds looser than `**`: -2**2 == -4.
    fn signed(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64, String> {
        let base = self.atom()?;
        if self.peek() == Some(Token::Pow) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64, String> {
        match self.next() {
            Some(Token::Num(value)) => Ok(value),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err("Missing closing parenthesis".to_string()),
                }
            }
            Some(_) => Err("Unexpected operator".to_string()),
            None => Err("Unexpected end of expression".to_string()),
        }
    }
}

pub struct CalculatorTool {
    gate: ApprovalGate,
}

impl CalculatorTool {
    pub fn new(gate: ApprovalGate) -> Self {
        Self { gate }
    }
}

#[derive(Deserialize)]
struct CalculatorArgs {
    expression: String,
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Calculate mathematical expressions. Input should be a valid mathematical expression."
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(
            ToolParameters::new().add_property(
                "expression",
                PropertySchema::string("Expression using + - * / ** and parentheses"),
                true,
            ),
        )
    }

    fn requires_approval(&self) -> bool {
        true
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, Error> {
        let args: CalculatorArgs = serde_json::from_value(arguments)
            .map_err(|e| Error::tool("calculator", format!("Invalid arguments: {}", e)))?;

        let expression = args.expression.trim().to_string();
        let description = format!("Calculate: {}", expression);
        let action = Action::new(move || {
            evaluate(&expression)
                .map(|v| format!("Calculation result: {}", format_number(v)))
                .map_err(|e| Error::action(format!("Calculation error: {}", e)))
        });

        Ok(ToolOutput::success(self.gate.request(description, action)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gk_core::{
        ApprovalId, ApprovalStatus, ApprovalStore, Decision, RerunReconciler, Resolution,
    };
    use std::sync::Arc;

    #[test]
    fn test_evaluate() {
        assert_eq!(evaluate("15 * 23").unwrap(), 345.0);
        assert_eq!(evaluate("1 + 2 * 3").unwrap(), 7.0);
        assert_eq!(evaluate("(1 + 2) * 3").unwrap(), 9.0);
        assert_eq!(evaluate("7 / 2").unwrap(), 3.5);
        assert_eq!(evaluate("7 // 2").unwrap(), 3.0);
        assert_eq!(evaluate("2 ** 3 ** 2").unwrap(), 512.0);
        assert_eq!(evaluate("-2 ** 2").unwrap(), -4.0);
        assert_eq!(evaluate("--3").unwrap(), 3.0);
        assert_eq!(evaluate("0.5 + .25").unwrap(), 0.75);
    }

    #[test]
    fn test_evaluate_errors() {
        assert!(evaluate("import os").unwrap_err().contains("Only basic"));
        assert_eq!(evaluate("1 / 0").unwrap_err(), "division by zero");
        assert!(evaluate("(1 + 2").is_err());
        assert!(evaluate("1 +").is_err());
        assert!(evaluate("").is_err());
        assert!(evaluate("1 2").is_err());
        assert!(evaluate("1..2").is_err());
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let shallow = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(evaluate(&shallow).unwrap(), 1.0);

        let deep = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        assert_eq!(evaluate(&deep).unwrap_err(), "Expression nested too deeply");

        let signs = format!("{}1", "-".repeat(100_000));
        assert_eq!(evaluate(&signs).unwrap_err(), "Expression nested too deeply");

        let powers = format!("{}1", "1 ** ".repeat(100_000));
        assert_eq!(evaluate(&powers).unwrap_err(), "Expression nested too deeply");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(345.0), "345");
        assert_eq!(format_number(3.5), "3.5");
        assert_eq!(format_number(-4.0), "-4");
    }

    #[tokio::test]
    async fn test_ungated_calculation() {
        let gate = ApprovalGate::new(Arc::new(ApprovalStore::new()), false);
        let tool = CalculatorTool::new(gate);

        let out = tool
            .execute(serde_json::json!({"expression": "15 * 23"}))
            .await
            .unwrap();
        assert_eq!(out.content, "Calculation result: 345");
    }

    #[tokio::test]
    async fn test_gated_calculation() {
        let store = Arc::new(ApprovalStore::new());
        let gate = ApprovalGate::new(store.clone(), true);
        let tool = CalculatorTool::new(gate.clone());

        let out = tool
            .execute(serde_json::json!({"expression": "1 / 0"}))
            .await
            .unwrap();
        assert!(gk_core::approval::is_placeholder(&out.content));

        let request = &store.list_pending()[0];
        assert_eq!(request.description, "Calculate: 1 / 0");

        store.resolve(request.id, Decision::Approved).unwrap();
        let err = gate.execute_approved(request.id).unwrap_err();
        assert_eq!(err.to_string(), "Calculation error: division by zero");
    }

    #[tokio::test]
    async fn test_approved_deep_expression_fails_cleanly() {
        let store = Arc::new(ApprovalStore::new());
        let gate = ApprovalGate::new(store.clone(), true);
        let tool = CalculatorTool::new(gate.clone());
        let mut reconciler = RerunReconciler::new(gate);

        let expression = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        tool.execute(serde_json::json!({ "expression": expression }))
            .await
            .unwrap();

        let report = reconciler.approve(ApprovalId::new(0));
        match &report.resolutions[..] {
            [Resolution::Failed { error, .. }] => {
                assert_eq!(error, "Calculation error: Expression nested too deeply");
            }
            other => panic!("Expected a failed resolution, got {:?}", other),
        }
        assert_eq!(store.get(ApprovalId::new(0)).unwrap().status, ApprovalStatus::Error);
    }
}
