use crate::agent::prompt::Language;
use crate::tools::extract_string_arg;
use crate::traits::{Tool, ToolResult};
use async_trait::async_trait;
use serde_json::json;

/// Parentheses and unary signs nest at most this deep.
pub const MAX_NESTING: usize = 256;

#[derive(Debug, Default, Clone, Copy)]
pub struct CalculatorTool {
    language: Language,
}

impl CalculatorTool {
    pub fn new(language: Language) -> Self {
        Self { language }
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        match self.language {
            Language::Chinese => "执行数学计算，支持加减乘除和括号",
            Language::English => "Evaluate an arithmetic expression with + - * / and parentheses",
        }
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Arithmetic expression, e.g. 2+3*4"
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let expression = extract_string_arg(&args, "expression")?;

        let (ok, failed) = match self.language {
            Language::Chinese => ("计算结果：", "计算错误："),
            Language::English => ("Result: ", "Calculation error: "),
        };
        match evaluate(&expression) {
            Ok(value) => Ok(ToolResult::success(format!("{}{}", ok, format_number(value)))),
            Err(e) => Ok(ToolResult::error(format!("{}{}", failed, e))),
        }
    }
}

pub fn evaluate(expression: &str) -> anyhow::Result<f64> {
    if let Some(bad) = expression
        .chars()
        .find(|c| !(c.is_ascii_digit() || c.is_whitespace() || "+-*/().".contains(*c)))
    {
        anyhow::bail!("illegal character '{}'", bad);
    }

    if expression.trim().is_empty() {
        anyhow::bail!("empty expression");
    }

    let mut parser = ExprParser {
        chars: expression.chars().collect(),
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if let Some(c) = parser.peek() {
        anyhow::bail!("unexpected '{}' at position {}", c, parser.pos);
    }
    if !value.is_finite() {
        anyhow::bail!("result is not a finite number");
    }
    Ok(value)
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

struct ExprParser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl ExprParser {
    /// Next non-whitespace character, without consuming it.
    fn peek(&mut self) -> Option<char> {
        while self.chars.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
        self.chars.get(self.pos).copied()
    }

    fn expr(&mut self) -> anyhow::Result<f64> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> anyhow::Result<f64> {
        let mut value = self.factor()?;
        while let Some(op @ ('*' | '/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            if op == '*' {
                value *= rhs;
            } else {
                if rhs == 0.0 {
                    anyhow::bail!("division by zero");
                }
                value /= rhs;
            }
        }
        Ok(value)
    }

    /// Every level of nesting passes through here, so `depth` bounds recursion.
    fn factor(&mut self) -> anyhow::Result<f64> {
        if self.depth >= MAX_NESTING {
            anyhow::bail!("expression nested too deeply");
        }
        self.depth += 1;
        let value = self.nested_factor();
        self.depth -= 1;
        value
    }

    fn nested_factor(&mut self) -> anyhow::Result<f64> {
        match self.peek() {
            Some('-') => {
                self.pos += 1;
                Ok(-self.factor()?)
            }
            Some('+') => {
                self.pos += 1;
                self.factor()
            }
            Some('(') => {
                self.pos += 1;
                let value = self.expr()?;
                if self.peek() != Some(')') {
                    anyhow::bail!("missing closing parenthesis");
                }
                self.pos += 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) => anyhow::bail!("unexpected '{}' at position {}", c, self.pos),
            None => anyhow::bail!("unexpected end of expression"),
        }
    }

    fn number(&mut self) -> anyhow::Result<f64> {
        let start = self.pos;
        while matches!(self.chars.get(self.pos), Some(c) if c.is_ascii_digit() || *c == '.') {
            self.pos += 1;
        }
        let literal: String = self.chars[start..self.pos].iter().collect();
        literal
            .parse::<f64>()
            .map_err(|_| anyhow::anyhow!("invalid number '{}'", literal))
    }
}
