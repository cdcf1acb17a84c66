//! Diagnostic collection.
//!
//! Errors in Holly are sticky: the first recorded error poisons the whole
//! run, and every phase entry point (lexer, parser, VM) checks
//! [`Handler::has_errors`] before doing any work. The handler therefore
//! doubles as the error flag of the interpreter state.

use std::cell::RefCell;
use std::fmt;

use crate::Span;

/// Diagnostic severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// A fatal problem; the run stops producing effects.
    Error,
    /// A non-fatal observation.
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
        }
    }
}

/// A single diagnostic message with its source location.
///
/// # Examples
///
/// ```
/// use holly_util::{Diagnostic, Level, Span};
///
/// let diag = Diagnostic::error("unexpected symbol", Span::DUMMY);
/// assert_eq!(diag.level, Level::Error);
/// ```
#[derive(Clone, Debug)]
pub struct Diagnostic {
    /// Severity level.
    pub level: Level,
    /// Main message.
    pub message: String,
    /// Source location.
    pub span: Span,
}

impl Diagnostic {
    /// Creates an error diagnostic.
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
            span,
        }
    }

    /// Creates a warning diagnostic.
    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self {
            level: Level::Warning,
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.span.is_dummy() {
            write!(f, "{}: {}", self.level, self.message)
        } else {
            write!(f, "{}: {}: {}", self.level, self.span, self.message)
        }
    }
}

/// Collects diagnostics and answers the "has anything gone wrong yet"
/// question.
///
/// Interior mutability keeps reporting ergonomic from contexts that only
/// hold a shared reference, mirroring how the handler is threaded through
/// the lexer, parser and VM at once.
///
/// # Examples
///
/// ```
/// use holly_util::{Handler, Span};
///
/// let handler = Handler::new();
/// assert!(!handler.has_errors());
/// handler.error("unexpected symbol", Span::DUMMY);
/// assert!(handler.has_errors());
/// ```
#[derive(Debug, Default)]
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Handler {
    /// Creates an empty handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error.
    pub fn error(&self, message: impl Into<String>, span: Span) {
        self.emit(Diagnostic::error(message, span));
    }

    /// Records a warning.
    pub fn warning(&self, message: impl Into<String>, span: Span) {
        self.emit(Diagnostic::warning(message, span));
    }

    /// Records a pre-built diagnostic.
    pub fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    /// The sticky error flag: true once any error has been recorded.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .borrow()
            .iter()
            .any(|d| d.level == Level::Error)
    }

    /// Number of recorded errors.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Error)
            .count()
    }

    /// The first recorded error, if any. This is what the CLI reports.
    pub fn first_error(&self) -> Option<Diagnostic> {
        self.diagnostics
            .borrow()
            .iter()
            .find(|d| d.level == Level::Error)
            .cloned()
    }

    /// Drains all recorded diagnostics.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }
}
