//! Error types and diagnostics
//!
//! Every pipeline stage reports problems as [`Diagnostic`] records collected
//! in a [`Diagnostics`] list. Stages that also produce a value return a
//! [`Diagnosed`] pair; [`WeldError`] covers the failures that end a run.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for loom-weld operations
pub type WeldResult<T> = Result<T, WeldError>;

/// Main error type for loom-weld
#[derive(Debug, Error)]
pub enum WeldError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Description file could not be read
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input extension is not one of the accepted formats
    #[error("unsupported description format '{extension}' (accepted: {accepted})")]
    UnsupportedFormat { extension: String, accepted: String },

    /// Model could not be converted to or from a structured document
    #[error("document error: {0}")]
    Document(#[from] serde_json::Error),

    /// Target name does not map to an emitter
    #[error("unknown target '{name}' (available: {available})")]
    UnknownTarget { name: String, available: String },

    /// An emitter could not render its artifacts
    #[error("cannot render {target} artifacts: {message}")]
    Render { target: &'static str, message: String },

    /// A stage recorded errors; the full list travels with the error
    #[error("{stage} failed with {} error(s)", .diagnostics.error_count())]
    Rejected {
        stage: &'static str,
        diagnostics: Diagnostics,
    },
}

impl WeldError {
    /// Create a rejection carrying the diagnostics that caused it
    pub fn rejected(stage: &'static str, diagnostics: Diagnostics) -> Self {
        WeldError::Rejected { stage, diagnostics }
    }

    /// Diagnostics attached to this error, if any
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            WeldError::Rejected { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Blocks artifact generation
    Error,
    /// Reported, generation continues
    Warning,
    /// Informational message
    Info,
}

impl Severity {
    /// Get display string
    pub fn display(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }

    /// Get ANSI color code
    pub fn color(&self) -> &'static str {
        match self {
            Severity::Error => "\x1b[31m",   // Red
            Severity::Warning => "\x1b[33m", // Yellow
            Severity::Info => "\x1b[34m",    // Blue
        }
    }
}

/// A diagnostic message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level
    pub severity: Severity,
    /// Message
    pub message: String,
    /// Construct the message is about (e.g. "class Shape", "module")
    pub context: Option<String>,
    /// Source line (1-indexed), DSL input only
    pub line: Option<usize>,
    /// Diagnostic code (P = parser, V = validator, O = overload resolver)
    pub code: Option<&'static str>,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            context: None,
            line: None,
            code: None,
        }
    }

    /// Create an error diagnostic
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Create a warning diagnostic
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Create an info diagnostic
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    /// Set the construct this diagnostic is about
    pub fn in_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Set the source line
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Set the diagnostic code
    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Format the diagnostic for display
    pub fn format(&self) -> String {
        let mut result = String::new();

        if let Some(line) = self.line {
            result.push_str(&format!("line {}: ", line));
        }

        result.push_str(self.severity.display());

        if let Some(code) = self.code {
            result.push('[');
            result.push_str(code);
            result.push(']');
        }

        result.push_str(": ");
        if let Some(ref context) = self.context {
            result.push_str(context);
            result.push_str(": ");
        }
        result.push_str(&self.message);

        result
    }

    /// Format with ANSI colors
    pub fn format_colored(&self) -> String {
        let reset = "\x1b[0m";
        let mut result = String::new();

        if let Some(line) = self.line {
            result.push_str(&format!("\x1b[2mline {}{}: ", line, reset));
        }

        result.push_str(self.severity.color());
        result.push_str(self.severity.display());
        result.push_str(reset);

        if let Some(code) = self.code {
            result.push_str("\x1b[2m[");
            result.push_str(code);
            result.push_str("]\x1b[0m");
        }

        result.push_str(": ");
        if let Some(ref context) = self.context {
            result.push_str(context);
            result.push_str(": ");
        }
        result.push_str(&self.message);

        result
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

/// Ordered collection of diagnostics produced by one or more stages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create a new collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    /// Add an error
    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Diagnostic::error(message));
    }

    /// Add a warning
    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Diagnostic::warning(message));
    }

    /// Append every diagnostic from another collector
    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    /// Get all diagnostics
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Only the errors
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Error)
    }

    /// Only the warnings
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Warning)
    }

    /// Get error count
    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    /// Get warning count
    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Total number of diagnostics
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing was reported
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Print all diagnostics to stderr
    pub fn print(&self, colored: bool) {
        for diagnostic in &self.items {
            if colored {
                eprintln!("{}", diagnostic.format_colored());
            } else {
                eprintln!("{}", diagnostic.format());
            }
        }
    }

    /// Summary line, empty when there is nothing to report
    pub fn summary(&self) -> Option<String> {
        let errors = self.error_count();
        let warnings = self.warning_count();

        if errors > 0 || warnings > 0 {
            Some(format!("{} error(s), {} warning(s)", errors, warnings))
        } else {
            None
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// A stage result: an optional value plus everything reported while producing it
#[derive(Debug, Clone)]
pub struct Diagnosed<T> {
    /// The produced value; `None` once a blocking error was recorded
    pub value: Option<T>,
    /// Errors and warnings recorded by the stage
    pub diagnostics: Diagnostics,
}

impl<T> Diagnosed<T> {
    /// Successful result with any accumulated warnings
    pub fn ok(value: T, diagnostics: Diagnostics) -> Self {
        Self {
            value: Some(value),
            diagnostics,
        }
    }

    /// Failed result
    pub fn failed(diagnostics: Diagnostics) -> Self {
        Self {
            value: None,
            diagnostics,
        }
    }

    /// Drop the value if any error was recorded
    pub fn settle(self) -> Self {
        if self.diagnostics.has_errors() {
            Self::failed(self.diagnostics)
        } else {
            self
        }
    }

    /// Convert into a plain result; warnings are dropped on success
    pub fn into_result(self, stage: &'static str) -> WeldResult<T> {
        match self.value {
            Some(value) if !self.diagnostics.has_errors() => Ok(value),
            _ => Err(WeldError::rejected(stage, self.diagnostics)),
        }
    }
}
