pub mod ast;
pub mod binder;
pub mod callstack;
pub mod decompile;
pub mod lexer;
pub mod parser;
pub mod scope;

pub use ast::{
    AssignOp, BinaryOp, Expr, FunctionDecl, LiteralKind, Param, PostfixOp, Statement, UnaryOp,
};
pub use binder::{is_builtin_scope, Declaration, ScopeBinder, BUILTIN_SCOPES};
pub use callstack::{CallFrame, CallStack};
pub use decompile::{normalize_whitespace, Decompile};
pub use lexer::{tokenize_script, Token, TokenKind};
pub use parser::{
    parse_expression, parse_script, parse_script_at, parse_script_statement,
    parse_tag_statement_at, MAX_NESTING,
};
pub use scope::{Scope, ScopeStack, Symbol, SymbolKind};
