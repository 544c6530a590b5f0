//! Canonical text rendering of parsed script, used for round-trip checks.

use std::sync::OnceLock;

use regex::Regex;

use crate::ast::{Expr, Statement};

pub trait Decompile {
    fn decompile(&self, indent: usize) -> String;
}

fn pad(indent: usize) -> String {
    "  ".repeat(indent)
}

fn join(items: &[Expr]) -> String {
    items
        .iter()
        .map(|item| item.decompile(0))
        .collect::<Vec<_>>()
        .join(",")
}

impl Decompile for Expr {
    fn decompile(&self, _indent: usize) -> String {
        match self {
            Self::Identifier { name, .. } => name.clone(),
            Self::Literal { raw, .. } => raw.clone(),
            Self::Unary {
                spelling, operand, ..
            } => {
                if spelling.chars().all(|ch| ch.is_ascii_alphabetic()) {
                    format!("{} {}", spelling, operand.decompile(0))
                } else {
                    format!("{}{}", spelling, operand.decompile(0))
                }
            }
            Self::Binary {
                spelling,
                left,
                right,
                ..
            } => format!("{} {} {}", left.decompile(0), spelling, right.decompile(0)),
            Self::Ternary {
                condition,
                then_branch,
                else_branch,
            } => format!(
                "{}?{}:{}",
                condition.decompile(0),
                then_branch.decompile(0),
                else_branch.decompile(0)
            ),
            Self::Assignment { op, target, value } => {
                format!("{} {} {}", target.decompile(0), op.as_str(), value.decompile(0))
            }
            Self::Member { object, property } => format!("{}.{}", object.decompile(0), property),
            Self::Index { object, index } => {
                format!("{}[{}]", object.decompile(0), index.decompile(0))
            }
            Self::Call { callee, args } => format!("{}({})", callee.decompile(0), join(args)),
            Self::Postfix { op, operand } => format!("{}{}", operand.decompile(0), op.as_str()),
            Self::Paren(inner) => format!("({})", inner.decompile(0)),
            Self::Array(items) => format!("[{}]", join(items)),
            Self::Struct(entries) => format!(
                "{{{}}}",
                entries
                    .iter()
                    .map(|(key, value)| format!("{}:{}", key, value.decompile(0)))
                    .collect::<Vec<_>>()
                    .join(",")
            ),
        }
    }
}

fn decompile_block(statements: &[Statement], indent: usize) -> String {
    if statements.is_empty() {
        return "{}".to_string();
    }
    let mut out = String::from("{\n");
    for statement in statements {
        out.push_str(&pad(indent + 1));
        out.push_str(&statement.decompile(indent + 1));
        out.push('\n');
    }
    out.push_str(&pad(indent));
    out.push('}');
    out
}

impl Decompile for Statement {
    fn decompile(&self, indent: usize) -> String {
        match self {
            Self::Expression(expr) => expr.decompile(indent),
            Self::Var {
                name, initializer, ..
            } => match initializer {
                Some(value) => format!("var {} = {}", name, value.decompile(indent)),
                None => format!("var {}", name),
            },
            Self::Function(function) => format!(
                "function {}({}) {}",
                function.name,
                function
                    .params
                    .iter()
                    .map(|param| param.name.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                decompile_block(&function.body, indent)
            ),
            Self::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let mut out = format!(
                    "if ({}) {}",
                    condition.decompile(indent),
                    then_branch.decompile(indent)
                );
                if let Some(else_branch) = else_branch {
                    out.push_str(" else ");
                    out.push_str(&else_branch.decompile(indent));
                }
                out
            }
            Self::While { condition, body } => format!(
                "while ({}) {}",
                condition.decompile(indent),
                body.decompile(indent)
            ),
            Self::Return(value) => match value {
                Some(value) => format!("return {}", value.decompile(indent)),
                None => "return".to_string(),
            },
            Self::Block(statements) => decompile_block(statements, indent),
            Self::Compound(statements) => statements
                .iter()
                .map(|statement| statement.decompile(indent))
                .collect::<Vec<_>>()
                .join(&format!("\n{}", pad(indent))),
        }
    }
}

fn whitespace_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

fn space_after_symbol_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"([^\w])\s+").expect("symbol spacing regex"))
}

/// Collapses whitespace runs to one space, then drops whitespace that follows
/// a non-word character.
pub fn normalize_whitespace(input: &str) -> String {
    let collapsed = whitespace_regex().replace_all(input, " ");
    space_after_symbol_regex()
        .replace_all(&collapsed, "$1")
        .into_owned()
}
