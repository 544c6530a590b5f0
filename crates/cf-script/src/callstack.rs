use cf_core::{CfmlError, SourceLocation};

use crate::scope::{Scope, ScopeStack, Symbol};

/// One callable construct being walked. Starts with a single base scope.
#[derive(Debug, Clone, PartialEq)]
pub struct CallFrame {
    pub name: String,
    pub call_site: Option<SourceLocation>,
    pub scopes: ScopeStack,
}

impl CallFrame {
    pub fn new(name: impl Into<String>, call_site: Option<SourceLocation>) -> Self {
        let mut scopes = ScopeStack::new();
        scopes.push(Scope::new());
        Self {
            name: name.into(),
            call_site,
            scopes,
        }
    }

    pub fn local_scope(&self) -> Result<&Scope, CfmlError> {
        self.scopes.top()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallStack {
    frames: Vec<CallFrame>,
}

fn no_frame() -> CfmlError {
    CfmlError::new("CALLSTACK_EMPTY", "No call frame available on the call stack.")
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_frame(&mut self, frame: CallFrame) {
        log::trace!(target: "cfml.scope", "push frame {}", frame.name);
        self.frames.push(frame);
    }

    pub fn pop_frame(&mut self) -> Result<CallFrame, CfmlError> {
        let frame = self.frames.pop().ok_or_else(no_frame)?;
        log::trace!(target: "cfml.scope", "pop frame {}", frame.name);
        Ok(frame)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn current_frame(&self) -> Result<&CallFrame, CfmlError> {
        self.frames.last().ok_or_else(no_frame)
    }

    pub fn root_frame(&self) -> Result<&CallFrame, CfmlError> {
        self.frames.first().ok_or_else(no_frame)
    }

    pub fn root_frame_mut(&mut self) -> Result<&mut CallFrame, CfmlError> {
        self.frames.first_mut().ok_or_else(no_frame)
    }

    /// Scope stack of the active call.
    pub fn local_scope_stack(&mut self) -> Result<&mut ScopeStack, CfmlError> {
        self.frames
            .last_mut()
            .map(|frame| &mut frame.scopes)
            .ok_or_else(no_frame)
    }

    /// Innermost scope of the active call.
    pub fn local_scope(&self) -> Result<&Scope, CfmlError> {
        self.current_frame()?.local_scope()
    }

    pub fn local_scope_mut(&mut self) -> Result<&mut Scope, CfmlError> {
        self.local_scope_stack()?.top_mut()
    }

    /// Looks in the active call first, then in the page-level root frame.
    pub fn resolve(&self, name: &str) -> Option<&Symbol> {
        let current = self.frames.last()?;
        current.scopes.resolve(name).or_else(|| {
            let root = self.frames.first()?;
            if self.frames.len() > 1 {
                root.scopes.resolve(name)
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod callstack_tests {
    use super::*;
    use crate::scope::SymbolKind;

    #[test]
    fn local_scope_on_empty_stack_fails() {
        let mut stack = CallStack::new();
        let error = stack.local_scope().expect_err("no frame");
        assert_eq!(error.code, "CALLSTACK_EMPTY");
        assert!(stack.local_scope_mut().is_err());
        assert!(stack.pop_frame().is_err());
    }

    #[test]
    fn local_scope_is_top_scope_of_top_frame() {
        let mut stack = CallStack::new();
        stack.push_frame(CallFrame::new("page", None));
        stack
            .local_scope_mut()
            .expect("page scope")
            .declare(Symbol::new("title", SymbolKind::Variable, None));

        stack.push_frame(CallFrame::new(
            "render",
            Some(SourceLocation { line: 4, column: 2 }),
        ));
        stack
            .local_scope_stack()
            .expect("frame scopes")
            .push(Scope::new());
        stack
            .local_scope_mut()
            .expect("block scope")
            .declare(Symbol::new("i", SymbolKind::Variable, None));

        assert!(stack.local_scope().expect("local").contains("I"));
        assert!(!stack.local_scope().expect("local").contains("title"));
        assert_eq!(stack.resolve("TITLE").map(|symbol| symbol.name.as_str()), Some("title"));

        let frame = stack.pop_frame().expect("pop render");
        assert_eq!(frame.name, "render");
        assert_eq!(frame.scopes.depth(), 2);
        assert!(stack.resolve("i").is_none());
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn intermediate_frames_are_not_visible() {
        let mut stack = CallStack::new();
        stack.push_frame(CallFrame::new("page", None));
        stack.push_frame(CallFrame::new("outer", None));
        stack
            .local_scope_mut()
            .expect("outer scope")
            .declare(Symbol::new("hidden", SymbolKind::Variable, None));
        stack.push_frame(CallFrame::new("inner", None));
        assert!(stack.resolve("hidden").is_none());
    }
}
