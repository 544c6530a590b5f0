//! Walks parsed statements over a [`CallStack`], recording declarations and
//! reporting identifier reads that resolve nowhere.

use cf_core::{CfmlError, SourceLocation};
use cf_parser::Diagnostics;

use crate::ast::{AssignOp, Expr, FunctionDecl, Statement};
use crate::callstack::{CallFrame, CallStack};
use crate::scope::{Scope, Symbol, SymbolKind};

/// Scope names that are always readable without a declaration.
pub const BUILTIN_SCOPES: &[&str] = &[
    "application",
    "arguments",
    "cgi",
    "client",
    "cookie",
    "form",
    "local",
    "request",
    "server",
    "session",
    "super",
    "this",
    "thread",
    "url",
    "variables",
];

pub fn is_builtin_scope(name: &str) -> bool {
    BUILTIN_SCOPES
        .iter()
        .any(|scope| scope.eq_ignore_ascii_case(name))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Name of the call frame the symbol was declared in.
    pub frame: String,
    pub symbol: Symbol,
}

pub struct ScopeBinder<'a> {
    call_stack: &'a mut CallStack,
    diagnostics: &'a mut Diagnostics,
    declarations: Vec<Declaration>,
}

impl<'a> ScopeBinder<'a> {
    /// The call stack must already hold the page-level frame.
    pub fn new(call_stack: &'a mut CallStack, diagnostics: &'a mut Diagnostics) -> Self {
        Self {
            call_stack,
            diagnostics,
            declarations: Vec::new(),
        }
    }

    pub fn bind(&mut self, statements: &[Statement]) -> Result<(), CfmlError> {
        self.statements(statements)
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn into_declarations(self) -> Vec<Declaration> {
        self.declarations
    }

    fn record(&mut self, frame: String, symbol: Symbol) {
        log::trace!(
            target: "cfml.scope",
            "declare {:?} {} in {}",
            symbol.kind,
            symbol.name,
            frame
        );
        self.declarations.push(Declaration { frame, symbol });
    }

    fn declare_local(&mut self, symbol: Symbol) -> Result<(), CfmlError> {
        let frame = self.call_stack.current_frame()?.name.clone();
        self.call_stack.local_scope_mut()?.declare(symbol.clone());
        self.record(frame, symbol);
        Ok(())
    }

    fn declare_page_variable(&mut self, symbol: Symbol) -> Result<(), CfmlError> {
        let root = self.call_stack.root_frame_mut()?;
        let frame = root.name.clone();
        let scope = root.scopes.base_mut().ok_or_else(|| {
            CfmlError::new("SCOPESTACK_EMPTY", "Root call frame has no base scope.")
        })?;
        scope.declare(symbol.clone());
        self.record(frame, symbol);
        Ok(())
    }

    fn statements(&mut self, statements: &[Statement]) -> Result<(), CfmlError> {
        for statement in statements {
            if let Statement::Function(function) = statement {
                self.declare_function(function)?;
            }
        }
        for statement in statements {
            self.statement(statement)?;
        }
        Ok(())
    }

    fn declare_function(&mut self, function: &FunctionDecl) -> Result<(), CfmlError> {
        if self.call_stack.local_scope()?.contains(&function.name) {
            return Ok(());
        }
        self.declare_local(Symbol::new(
            function.name.clone(),
            SymbolKind::Function,
            Some(function.location),
        ))
    }

    fn statement(&mut self, statement: &Statement) -> Result<(), CfmlError> {
        match statement {
            Statement::Expression(expr) => self.expr(expr),
            Statement::Var {
                name,
                location,
                initializer,
            } => {
                if let Some(initializer) = initializer {
                    self.expr(initializer)?;
                }
                self.declare_local(Symbol::new(
                    name.clone(),
                    SymbolKind::Variable,
                    Some(*location),
                ))
            }
            Statement::Function(function) => {
                self.declare_function(function)?;
                self.function(function)
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expr(condition)?;
                self.statement(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.statement(else_branch)?;
                }
                Ok(())
            }
            Statement::While { condition, body } => {
                self.expr(condition)?;
                self.statement(body)
            }
            Statement::Return(value) => match value {
                Some(value) => self.expr(value),
                None => Ok(()),
            },
            Statement::Block(statements) => {
                self.call_stack.local_scope_stack()?.push(Scope::new());
                self.statements(statements)?;
                self.call_stack.local_scope_stack()?.pop()?;
                Ok(())
            }
            Statement::Compound(statements) => self.statements(statements),
        }
    }

    fn function(&mut self, function: &FunctionDecl) -> Result<(), CfmlError> {
        self.call_stack
            .push_frame(CallFrame::new(function.name.clone(), Some(function.location)));
        for param in &function.params {
            self.declare_local(Symbol::new(
                param.name.clone(),
                SymbolKind::Argument,
                Some(param.location),
            ))?;
        }
        self.statements(&function.body)?;
        self.call_stack.pop_frame()?;
        Ok(())
    }

    fn read(&mut self, name: &str, location: SourceLocation) {
        if self.call_stack.resolve(name).is_some() || is_builtin_scope(name) {
            return;
        }
        self.diagnostics.info(format!(
            "Unresolved identifier '{}' at line {}, column {}",
            name, location.line, location.column
        ));
    }

    fn expr(&mut self, expr: &Expr) -> Result<(), CfmlError> {
        match expr {
            Expr::Identifier { name, location } => {
                self.read(name, *location);
                Ok(())
            }
            Expr::Literal { .. } => Ok(()),
            Expr::Unary { operand, .. } | Expr::Postfix { operand, .. } => self.expr(operand),
            Expr::Paren(inner) => self.expr(inner),
            Expr::Binary { left, right, .. } => {
                self.expr(left)?;
                self.expr(right)
            }
            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expr(condition)?;
                self.expr(then_branch)?;
                self.expr(else_branch)
            }
            Expr::Assignment { op, target, value } => {
                self.expr(value)?;
                self.assign(*op, target)
            }
            Expr::Member { object, .. } => self.expr(object),
            Expr::Index { object, index } => {
                self.expr(object)?;
                self.expr(index)
            }
            Expr::Call { callee, args } => {
                self.expr(callee)?;
                args.iter().try_for_each(|arg| self.expr(arg))
            }
            Expr::Array(items) => items.iter().try_for_each(|item| self.expr(item)),
            Expr::Struct(entries) => entries.iter().try_for_each(|(_, value)| self.expr(value)),
        }
    }

    fn assign(&mut self, op: AssignOp, target: &Expr) -> Result<(), CfmlError> {
        let Expr::Identifier { name, location } = target else {
            return self.expr(target);
        };
        if op != AssignOp::Assign {
            self.read(name, *location);
        }
        if self.call_stack.resolve(name).is_some() || is_builtin_scope(name) {
            return Ok(());
        }
        self.declare_page_variable(Symbol::new(
            name.clone(),
            SymbolKind::Variable,
            Some(*location),
        ))
    }
}
