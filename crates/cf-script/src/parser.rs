//! Recursive-descent parser for the script subset used inside script tags and
//! expression tags.

use cf_core::{CfmlError, LineIndex};

use crate::ast::{
    AssignOp, BinaryOp, Expr, FunctionDecl, LiteralKind, Param, PostfixOp, Statement, UnaryOp,
};
use crate::lexer::{tokenize_script, Token, TokenKind};

const OR_OPS: &[(&str, BinaryOp)] = &[("||", BinaryOp::Or), ("OR", BinaryOp::Or)];
const AND_OPS: &[(&str, BinaryOp)] = &[("&&", BinaryOp::And), ("AND", BinaryOp::And)];
const EQUALITY_OPS: &[(&str, BinaryOp)] = &[
    ("==", BinaryOp::Equal),
    ("!=", BinaryOp::NotEqual),
    ("EQ", BinaryOp::Equal),
    ("NEQ", BinaryOp::NotEqual),
    ("IS", BinaryOp::Equal),
];
const RELATIONAL_OPS: &[(&str, BinaryOp)] = &[
    ("<", BinaryOp::Less),
    (">", BinaryOp::Greater),
    ("<=", BinaryOp::LessEqual),
    (">=", BinaryOp::GreaterEqual),
    ("LT", BinaryOp::Less),
    ("GT", BinaryOp::Greater),
    ("LTE", BinaryOp::LessEqual),
    ("LE", BinaryOp::LessEqual),
    ("GTE", BinaryOp::GreaterEqual),
    ("GE", BinaryOp::GreaterEqual),
];
const CONCAT_OPS: &[(&str, BinaryOp)] = &[("&", BinaryOp::Concat)];
const ADDITIVE_OPS: &[(&str, BinaryOp)] = &[("+", BinaryOp::Add), ("-", BinaryOp::Subtract)];
const MULTIPLICATIVE_OPS: &[(&str, BinaryOp)] = &[
    ("*", BinaryOp::Multiply),
    ("/", BinaryOp::Divide),
    ("%", BinaryOp::Modulo),
    ("MOD", BinaryOp::Modulo),
];

/// Deepest statement or expression nesting accepted before parsing fails.
pub const MAX_NESTING: usize = 64;

pub fn parse_script(source: &str) -> Result<Vec<Statement>, CfmlError> {
    parse_script_at(source, 0, &LineIndex::new(source))
}

/// Parses `source`, which starts at `base_offset` of the text indexed by `lines`.
pub fn parse_script_at(
    source: &str,
    base_offset: usize,
    lines: &LineIndex,
) -> Result<Vec<Statement>, CfmlError> {
    let tokens = tokenize_script(source, base_offset, lines)?;
    let mut parser = ScriptParser::new(tokens, Terminator::Required);
    let mut statements = Vec::new();
    while !parser.at_eof() {
        statements.push(parser.statement()?);
    }
    log::debug!(target: "cfml.script", "parsed {} statements", statements.len());
    Ok(statements)
}

/// Parses a script unit into one statement; several statements come back as
/// [`Statement::Compound`], an empty unit as `None`.
pub fn parse_script_statement(source: &str) -> Result<Option<Statement>, CfmlError> {
    let mut statements = parse_script(source)?;
    Ok(match statements.len() {
        0 => None,
        1 => statements.pop(),
        _ => Some(Statement::Compound(statements)),
    })
}

/// Parses the single statement written inside an expression tag such as
/// `<cfset ...>`; the trailing `;` is optional.
pub fn parse_tag_statement_at(
    source: &str,
    base_offset: usize,
    lines: &LineIndex,
) -> Result<Statement, CfmlError> {
    let tokens = tokenize_script(source, base_offset, lines)?;
    let mut parser = ScriptParser::new(tokens, Terminator::Optional);
    let statement = parser.statement()?;
    if !parser.at_eof() {
        return Err(parser.unexpected("end of tag expression"));
    }
    Ok(statement)
}

pub fn parse_expression(source: &str) -> Result<Expr, CfmlError> {
    let tokens = tokenize_script(source, 0, &LineIndex::new(source))?;
    let mut parser = ScriptParser::new(tokens, Terminator::Optional);
    let expr = parser.expression()?;
    if !parser.at_eof() {
        return Err(parser.unexpected("end of expression"));
    }
    Ok(expr)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    Required,
    Optional,
}

struct ScriptParser {
    tokens: Vec<Token>,
    pos: usize,
    terminator: Terminator,
    depth: usize,
}

fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::Eof => "end of input".to_string(),
        _ => format!("'{}'", token.text),
    }
}

fn error_at(token: &Token, message: impl Into<String>) -> CfmlError {
    CfmlError::with_span("SCRIPT_PARSE_ERROR", message, token.span.clone())
}

impl ScriptParser {
    fn new(tokens: Vec<Token>, terminator: Terminator) -> Self {
        Self {
            tokens,
            pos: 0,
            terminator,
            depth: 0,
        }
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        let index = (self.pos + ahead).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.peek().is_punct(punct) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn unexpected(&self, expected: &str) -> CfmlError {
        let token = self.peek();
        error_at(
            token,
            format!("Expected {} but found {}.", expected, describe(token)),
        )
    }

    fn expect_punct(&mut self, punct: &str) -> Result<Token, CfmlError> {
        if self.peek().is_punct(punct) {
            return Ok(self.advance());
        }
        Err(self.unexpected(&format!("'{}'", punct)))
    }

    fn expect_identifier(&mut self, what: &str) -> Result<Token, CfmlError> {
        if self.peek().kind == TokenKind::Identifier {
            return Ok(self.advance());
        }
        Err(self.unexpected(what))
    }

    fn at_terminator(&self) -> bool {
        self.peek().is_punct(";") || (self.terminator == Terminator::Optional && self.at_eof())
    }

    fn terminator(&mut self) -> Result<(), CfmlError> {
        if self.eat_punct(";") {
            return Ok(());
        }
        if self.terminator == Terminator::Optional && self.at_eof() {
            return Ok(());
        }
        Err(self.unexpected("';'"))
    }

    /// Runs `parse` one nesting level deeper, failing at the current token once
    /// [`MAX_NESTING`] is reached.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, CfmlError>,
    ) -> Result<T, CfmlError> {
        if self.depth >= MAX_NESTING {
            return Err(error_at(
                self.peek(),
                format!("Nesting deeper than {} levels.", MAX_NESTING),
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn statement(&mut self) -> Result<Statement, CfmlError> {
        self.nested(Self::statement_kind)
    }

    fn statement_kind(&mut self) -> Result<Statement, CfmlError> {
        let token = self.peek();
        let next = self.peek_at(1);
        if token.is_punct("{") {
            return self.block().map(Statement::Block);
        }
        if token.is_word("var") && next.kind == TokenKind::Identifier {
            return self.var_statement();
        }
        if token.is_word("function") && next.kind == TokenKind::Identifier {
            return self.function().map(Statement::Function);
        }
        if token.is_word("if") && next.is_punct("(") {
            return self.if_statement();
        }
        if token.is_word("while") && next.is_punct("(") {
            return self.while_statement();
        }
        if token.is_word("return") {
            self.advance();
            let value = if self.at_terminator() {
                None
            } else {
                Some(self.expression()?)
            };
            self.terminator()?;
            return Ok(Statement::Return(value));
        }

        let expr = self.expression()?;
        self.terminator()?;
        Ok(Statement::Expression(expr))
    }

    fn block(&mut self) -> Result<Vec<Statement>, CfmlError> {
        self.expect_punct("{")?;
        let mut statements = Vec::new();
        while !self.eat_punct("}") {
            if self.at_eof() {
                return Err(self.unexpected("'}'"));
            }
            statements.push(self.statement()?);
        }
        Ok(statements)
    }

    fn var_statement(&mut self) -> Result<Statement, CfmlError> {
        self.advance();
        let name = self.expect_identifier("a variable name")?;
        let initializer = if self.eat_punct("=") {
            Some(self.expression()?)
        } else {
            None
        };
        self.terminator()?;
        Ok(Statement::Var {
            name: name.text,
            location: name.span.start,
            initializer,
        })
    }

    fn function(&mut self) -> Result<FunctionDecl, CfmlError> {
        self.advance();
        let name = self.expect_identifier("a function name")?;
        self.expect_punct("(")?;
        let mut params = Vec::new();
        if !self.eat_punct(")") {
            loop {
                let param = self.expect_identifier("a parameter name")?;
                params.push(Param {
                    name: param.text,
                    location: param.span.start,
                });
                if !self.eat_punct(",") {
                    break;
                }
            }
            self.expect_punct(")")?;
        }
        let body = self.block()?;
        Ok(FunctionDecl {
            name: name.text,
            location: name.span.start,
            params,
            body,
        })
    }

    fn if_statement(&mut self) -> Result<Statement, CfmlError> {
        self.advance();
        self.expect_punct("(")?;
        let condition = self.expression()?;
        self.expect_punct(")")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.peek().is_word("else") {
            self.advance();
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Statement, CfmlError> {
        self.advance();
        self.expect_punct("(")?;
        let condition = self.expression()?;
        self.expect_punct(")")?;
        let body = Box::new(self.statement()?);
        Ok(Statement::While { condition, body })
    }

    fn expression(&mut self) -> Result<Expr, CfmlError> {
        self.nested(Self::assignment)
    }

    fn assignment(&mut self) -> Result<Expr, CfmlError> {
        let target = self.ternary()?;
        let op = match self.peek().kind {
            TokenKind::Punct => AssignOp::from_punct(&self.peek().text),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(target);
        };
        let op_token = self.advance();
        if !target.is_assignable() {
            return Err(error_at(&op_token, "Invalid assignment target."));
        }
        let value = self.nested(Self::assignment)?;
        Ok(Expr::Assignment {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn ternary(&mut self) -> Result<Expr, CfmlError> {
        let condition = self.or()?;
        if !self.eat_punct("?") {
            return Ok(condition);
        }
        let then_branch = self.nested(Self::assignment)?;
        self.expect_punct(":")?;
        let else_branch = self.nested(Self::ternary)?;
        Ok(Expr::Ternary {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    fn or(&mut self) -> Result<Expr, CfmlError> {
        self.binary_level(Self::and, OR_OPS)
    }

    fn and(&mut self) -> Result<Expr, CfmlError> {
        self.binary_level(Self::equality, AND_OPS)
    }

    fn equality(&mut self) -> Result<Expr, CfmlError> {
        self.binary_level(Self::relational, EQUALITY_OPS)
    }

    fn relational(&mut self) -> Result<Expr, CfmlError> {
        self.binary_level(Self::concat, RELATIONAL_OPS)
    }

    fn concat(&mut self) -> Result<Expr, CfmlError> {
        self.binary_level(Self::additive, CONCAT_OPS)
    }

    fn additive(&mut self) -> Result<Expr, CfmlError> {
        self.binary_level(Self::multiplicative, ADDITIVE_OPS)
    }

    fn multiplicative(&mut self) -> Result<Expr, CfmlError> {
        self.binary_level(Self::unary, MULTIPLICATIVE_OPS)
    }

    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, CfmlError>,
        ops: &[(&str, BinaryOp)],
    ) -> Result<Expr, CfmlError> {
        let mut left = next(self)?;
        while let Some((op, spelling)) = self.match_operator(ops) {
            let right = next(self)?;
            left = Expr::Binary {
                op,
                spelling,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn match_operator(&mut self, ops: &[(&str, BinaryOp)]) -> Option<(BinaryOp, String)> {
        let token = self.peek();
        let (op, spelling) = ops.iter().find_map(|(text, op)| {
            if text.chars().all(|ch| ch.is_ascii_alphabetic()) {
                token.is_word(text).then(|| (*op, text.to_string()))
            } else {
                token.is_punct(text).then(|| (*op, text.to_string()))
            }
        })?;
        self.advance();
        Some((op, spelling))
    }

    fn unary(&mut self) -> Result<Expr, CfmlError> {
        let token = self.peek();
        let op = if token.is_punct("!") || token.is_word("NOT") {
            Some(UnaryOp::Not)
        } else if token.is_punct("-") {
            Some(UnaryOp::Negate)
        } else if token.is_punct("+") {
            Some(UnaryOp::Plus)
        } else {
            None
        };
        let Some(op) = op else {
            return self.postfix();
        };
        let spelling = self.advance().text.to_ascii_uppercase();
        let operand = self.nested(Self::unary)?;
        Ok(Expr::Unary {
            op,
            spelling,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, CfmlError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat_punct(".") {
                let property = self.expect_identifier("a member name")?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: property.text,
                };
            } else if self.eat_punct("[") {
                let index = self.expression()?;
                self.expect_punct("]")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat_punct("(") {
                let args = self.list(")")?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else if expr.is_assignable()
                && (self.peek().is_punct("++") || self.peek().is_punct("--"))
            {
                let op = if self.advance().text == "++" {
                    PostfixOp::Increment
                } else {
                    PostfixOp::Decrement
                };
                expr = Expr::Postfix {
                    op,
                    operand: Box::new(expr),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Comma-separated expressions up to and including `close`.
    fn list(&mut self, close: &str) -> Result<Vec<Expr>, CfmlError> {
        let mut items = Vec::new();
        if self.eat_punct(close) {
            return Ok(items);
        }
        loop {
            items.push(self.expression()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(close)?;
        Ok(items)
    }

    fn primary(&mut self) -> Result<Expr, CfmlError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Identifier if token.is_word("true") || token.is_word("false") => {
                Ok(Expr::Literal {
                    kind: LiteralKind::Boolean,
                    raw: token.text,
                })
            }
            TokenKind::Identifier => Ok(Expr::Identifier {
                name: token.text,
                location: token.span.start,
            }),
            TokenKind::Number => Ok(Expr::Literal {
                kind: LiteralKind::Number,
                raw: token.text,
            }),
            TokenKind::String => Ok(Expr::Literal {
                kind: LiteralKind::String,
                raw: token.text,
            }),
            TokenKind::Punct if token.text == "(" => {
                let inner = self.expression()?;
                self.expect_punct(")")?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            TokenKind::Punct if token.text == "[" => Ok(Expr::Array(self.list("]")?)),
            TokenKind::Punct if token.text == "{" => self.struct_literal(),
            _ => Err(error_at(
                &token,
                format!("Expected an expression but found {}.", describe(&token)),
            )),
        }
    }

    fn struct_literal(&mut self) -> Result<Expr, CfmlError> {
        let mut entries = Vec::new();
        if self.eat_punct("}") {
            return Ok(Expr::Struct(entries));
        }
        loop {
            let key = self.peek().clone();
            if !matches!(key.kind, TokenKind::Identifier | TokenKind::String) {
                return Err(self.unexpected("a struct key"));
            }
            self.advance();
            if !self.eat_punct(":") && !self.eat_punct("=") {
                return Err(self.unexpected("':' or '='"));
            }
            entries.push((key.text, self.expression()?));
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct("}")?;
        Ok(Expr::Struct(entries))
    }
}

#[cfg(test)]
mod parser_tests {
    use super::*;
    use crate::decompile::{normalize_whitespace, Decompile};

    fn render(source: &str) -> String {
        parse_script_statement(source)
            .expect("script should parse")
            .expect("statement expected")
            .decompile(0)
    }

    #[test]
    fn ternary_assignment_round_trips_without_spaces_around_ternary() {
        let script = "someVariable = someExpression ? someExpression2 : someExpression3;";
        let statement = parse_script_statement(script).expect("parse");
        assert!(statement.is_some());
        assert_eq!(
            render(script),
            "someVariable = someExpression?someExpression2:someExpression3"
        );
    }

    #[test]
    fn binary_precedence_and_word_operators() {
        assert_eq!(render("x = a + b * c;"), "x = a + b * c");
        let statement = parse_script_statement("x = a + b * c;").expect("parse").expect("some");
        let Statement::Expression(Expr::Assignment { value, .. }) = statement else {
            panic!("expected assignment");
        };
        assert!(matches!(*value, Expr::Binary { op: BinaryOp::Add, .. }));

        assert_eq!(render("ok = a gt 1 and not b;"), "ok = a GT 1 AND NOT b");
        assert_eq!(render("s = 'a' & b;"), "s = 'a' & b");
        assert_eq!(render("x = y = 2;"), "x = y = 2");
    }

    #[test]
    fn postfix_forms_render_compactly() {
        assert_eq!(
            render("result = obj.method(a, b[1])[\"k\"].size;"),
            "result = obj.method(a,b[1])[\"k\"].size"
        );
        assert_eq!(render("i++;"), "i++");
        assert_eq!(render("data = {name: 'x', items = [1, 2]};"), "data = {name:'x',items:[1,2]}");
        assert_eq!(render("n = -(a + 1);"), "n = -(a + 1)");
    }

    #[test]
    fn statements_render_with_blocks_and_indentation() {
        let source = "function add(a, b) { var sum = a + b; if (sum GT 10) { return 10; } else return sum; }";
        assert_eq!(
            render(source),
            "function add(a,b) {\n  var sum = a + b\n  if (sum GT 10) {\n    return 10\n  } else return sum\n}"
        );
        assert_eq!(render("while (i < 3) i += 1;"), "while (i < 3) i += 1");
        assert_eq!(render("var x;"), "var x");
    }

    #[test]
    fn several_statements_become_a_compound() {
        let statement = parse_script_statement("a = 1; b = 2;")
            .expect("parse")
            .expect("some");
        assert!(matches!(statement, Statement::Compound(ref items) if items.len() == 2));
        assert_eq!(statement.decompile(0), "a = 1\nb = 2");
        assert!(parse_script_statement("  // nothing\n").expect("parse").is_none());
    }

    #[test]
    fn decompile_matches_normalized_source_for_plain_assignments() {
        let source = "total   =\n  price";
        let statement = parse_tag_statement_at(source, 0, &LineIndex::new(source)).expect("parse");
        assert_eq!(
            normalize_whitespace(&statement.decompile(0)),
            normalize_whitespace(source)
        );
    }

    #[test]
    fn missing_semicolon_is_a_positioned_failure() {
        let error = parse_script("a = 1\nb = 2;").expect_err("missing ;");
        assert_eq!(error.code, "SCRIPT_PARSE_ERROR");
        assert_eq!(error.line(), Some(2));
        assert_eq!(error.column(), Some(1));
        assert_eq!(error.message, "Expected ';' but found 'b'.");
    }

    #[test]
    fn invalid_targets_and_truncated_input_fail() {
        let error = parse_script("1 = a;").expect_err("bad target");
        assert_eq!(error.message, "Invalid assignment target.");
        assert_eq!(error.column(), Some(3));

        let error = parse_script("if (a) {").expect_err("open block");
        assert_eq!(error.message, "Expected '}' but found end of input.");

        let error = parse_expression("a ? b").expect_err("ternary without else");
        assert_eq!(error.message, "Expected ':' but found end of input.");
    }

    #[test]
    fn deep_nesting_fails_at_the_offending_token() {
        let source = format!("x = {}1{};", "(".repeat(50_000), ")".repeat(50_000));
        let error = parse_script(&source).expect_err("too deep");
        assert_eq!(error.code, "SCRIPT_PARSE_ERROR");
        assert_eq!(error.message, "Nesting deeper than 64 levels.");
        assert_eq!(error.line(), Some(1));
        assert_eq!(error.column(), Some(67));

        let error = parse_expression(&"!".repeat(10_000)).expect_err("too deep");
        assert_eq!(error.message, "Nesting deeper than 64 levels.");

        let blocks = format!("{}a = 1;{}", "{".repeat(5_000), "}".repeat(5_000));
        assert!(parse_script(&blocks).is_err());
    }

    #[test]
    fn moderate_nesting_still_parses() {
        let source = format!("x = {}1{};", "(".repeat(40), ")".repeat(40));
        let statements = parse_script(&source).expect("parse");
        assert_eq!(statements.len(), 1);

        let blocks = format!("{}a = 1;{}", "{".repeat(40), "}".repeat(40));
        assert!(parse_script(&blocks).is_ok());
    }

    #[test]
    fn tag_statements_allow_missing_semicolon_but_not_trailing_tokens() {
        let source = "var total = a ? b : c";
        let statement = parse_tag_statement_at(source, 0, &LineIndex::new(source)).expect("parse");
        assert_eq!(statement.decompile(0), "var total = a?b:c");

        let error = parse_tag_statement_at("a = 1; b", 0, &LineIndex::new("a = 1; b"))
            .expect_err("trailing tokens");
        assert_eq!(error.message, "Expected end of tag expression but found 'b'.");
    }
}
