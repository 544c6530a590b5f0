use cf_core::{CaseMap, CfmlError, SourceLocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
    Argument,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub location: Option<SourceLocation>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, location: Option<SourceLocation>) -> Self {
        Self {
            name: name.into(),
            kind,
            location,
        }
    }
}

/// Symbol table of one lexical block. Lookups ignore case unless the scope
/// was created case-sensitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    symbols: CaseMap<Symbol>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    pub fn new() -> Self {
        Self::with_case_sensitivity(false)
    }

    pub fn with_case_sensitivity(case_sensitive: bool) -> Self {
        Self {
            symbols: CaseMap::new(case_sensitive),
        }
    }

    /// Returns the symbol previously declared under an equivalent name.
    pub fn declare(&mut self, symbol: Symbol) -> Option<Symbol> {
        let name = symbol.name.clone();
        self.symbols.put(&name, symbol)
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

fn empty_stack() -> CfmlError {
    CfmlError::new("SCOPESTACK_EMPTY", "No scope available on the scope stack.")
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    pub fn pop(&mut self) -> Result<Scope, CfmlError> {
        self.scopes.pop().ok_or_else(empty_stack)
    }

    pub fn top(&self) -> Result<&Scope, CfmlError> {
        self.scopes.last().ok_or_else(empty_stack)
    }

    pub fn top_mut(&mut self) -> Result<&mut Scope, CfmlError> {
        self.scopes.last_mut().ok_or_else(empty_stack)
    }

    pub fn declare(&mut self, symbol: Symbol) -> Result<Option<Symbol>, CfmlError> {
        Ok(self.top_mut()?.declare(symbol))
    }

    /// Innermost declaration wins.
    pub fn resolve(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn base(&self) -> Option<&Scope> {
        self.scopes.first()
    }

    pub fn base_mut(&mut self) -> Option<&mut Scope> {
        self.scopes.first_mut()
    }
}
