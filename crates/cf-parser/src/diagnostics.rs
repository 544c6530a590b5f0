//! Non-fatal message channel for markup-level problems.
//!
//! Every emitted message is forwarded to the `log` facade. Only messages whose
//! severity is enabled are recorded; error and warn are enabled by default.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warn,
    Info,
    Debug,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }

    fn log_level(self) -> log::Level {
        match self {
            Self::Error => log::Level::Error,
            Self::Warn => log::Level::Warn,
            Self::Info => log::Level::Info,
            Self::Debug => log::Level::Debug,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Diagnostics {
    enabled: [bool; 4],
    entries: Vec<Diagnostic>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            enabled: [true, true, false, false],
            entries: Vec::new(),
        }
    }
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self, severity: Severity) -> bool {
        self.enabled[severity.slot()]
    }

    pub fn set_enabled(&mut self, severity: Severity, enabled: bool) {
        self.enabled[severity.slot()] = enabled;
    }

    pub fn emit(&mut self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        log::log!(target: "cfml.diagnostics", severity.log_level(), "{}", message);
        if self.is_enabled(severity) {
            self.entries.push(Diagnostic { severity, message });
        }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.emit(Severity::Error, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.emit(Severity::Warn, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.emit(Severity::Info, message);
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.emit(Severity::Debug, message);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.message.as_str())
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.severity == severity)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
