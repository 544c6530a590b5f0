use crate::types::SourceSpan;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct CfmlError {
    pub code: String,
    pub message: String,
    pub span: Option<SourceSpan>,
}

impl CfmlError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            span: None,
        }
    }

    pub fn with_span(code: impl Into<String>, message: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            span: Some(span),
        }
    }

    /// 1-based line of the offending token, when the error is positioned.
    pub fn line(&self) -> Option<usize> {
        self.span.as_ref().map(|span| span.start.line)
    }

    /// 1-based column of the offending token, when the error is positioned.
    pub fn column(&self) -> Option<usize> {
        self.span.as_ref().map(|span| span.start.column)
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;
    use crate::types::SourceLocation;

    #[test]
    fn display_joins_code_and_message() {
        let error = CfmlError::new("SOURCE_READ", "missing file");
        assert_eq!(error.to_string(), "SOURCE_READ: missing file");
        assert_eq!(error.line(), None);
        assert_eq!(error.column(), None);
    }

    #[test]
    fn positioned_error_exposes_line_and_column() {
        let span = SourceSpan {
            start: SourceLocation { line: 3, column: 7 },
            end: SourceLocation { line: 3, column: 9 },
        };
        let error = CfmlError::with_span("SCRIPT_PARSE_ERROR", "Expected ';'.", span);
        assert_eq!(error.line(), Some(3));
        assert_eq!(error.column(), Some(7));
    }
}
