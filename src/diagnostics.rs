//!
//! ****************************************************************************************
//! ** ERROR CONSTRUCTION RULES FOR goldgen Error Macros (`err_msg!`, `err_ctx!`)          **
//! ****************************************************************************************
//!
//! # Overview
//!
//! This module defines the unified, `miette`-based diagnostic system for goldgen. Every
//! fatal condition of a generation run (loading, configuration, convention violations in
//! the scanned test sources, evaluation, writing) is represented by [`GoldenError`].
//! Non-fatal conditions never become errors: they are logged through `tracing` and
//! recorded as header markers in the affected archive.
//!
//! # Error Construction Macros
//!
//! - **Use `err_msg!` for simple, message-only errors.**
//!   - `err_msg!(Write, "Could not write file: {}", err)`
//!
//! - **Use `err_ctx!` to attach a help message.**
//!   - `err_ctx!(Config, "Unknown key", help = "see goldgen.yaml")`
//!
//! - **Use `err_src!` when the offending source file and span are known.**
//!   - `err_src!(Convention, "Invalid slice element", &source, span)`
//!
//! # Rules
//!
//! - Never construct `ErrorContext` manually unless no macro arm fits.
//! - Pass spans as [`Span`] values, never as bare offsets.
//! - Chain the underlying error with [`GoldenError::with_source`] instead of formatting
//!   it away when the cause is itself an error type.
//!
//! ****************************************************************************************

use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

use crate::Span;

// Type aliases for clarity and brevity
pub type SourceArc = Arc<NamedSource<String>>;
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Type-safe error classification that corresponds to [`GoldenError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Package discovery and parsing failures
    Load,
    /// Invalid or unreadable configuration
    Config,
    /// The scanned test sources break the extraction convention
    Convention,
    /// The evaluation engine rejected already canonical input
    Eval,
    /// A fixture could not be persisted
    Write,
    /// Internal invariant violations
    Internal,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Load => "load",
            ErrorType::Config => "config",
            ErrorType::Convention => "convention",
            ErrorType::Eval => "eval",
            ErrorType::Write => "write",
            ErrorType::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Minimal, composable error context for diagnostics.
#[derive(Debug, Default)]
pub struct ErrorContext {
    /// The source file the error points into (if any).
    pub source: Option<SourceArc>,
    /// The primary span for this error (if any).
    pub span: Option<Span>,
    /// An optional help message.
    pub help: Option<String>,
}

impl ErrorContext {
    /// Returns an empty error context (no source, span, or help).
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a context with both source and span.
    pub fn with_source_and_span(source: SourceArc, span: Span) -> Self {
        Self {
            source: Some(source),
            span: Some(span),
            help: None,
        }
    }

    /// Creates a context carrying only a help message.
    pub fn with_help(help: impl Into<String>) -> Self {
        Self {
            source: None,
            span: None,
            help: Some(help.into()),
        }
    }
}

/// Unified error type for every fatal goldgen failure mode.
#[derive(Debug, Error)]
pub enum GoldenError {
    #[error("Load error: {message}")]
    Load {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedCause>,
    },
    #[error("Config error: {message}")]
    Config {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedCause>,
    },
    #[error("Convention violation: {message}")]
    Convention {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedCause>,
    },
    #[error("Evaluation error: {message}")]
    Eval {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedCause>,
    },
    #[error("Write error: {message}")]
    Write {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedCause>,
    },
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedCause>,
    },
}

impl GoldenError {
    fn parts(&self) -> (&String, &ErrorContext) {
        match self {
            GoldenError::Load { message, ctx, .. }
            | GoldenError::Config { message, ctx, .. }
            | GoldenError::Convention { message, ctx, .. }
            | GoldenError::Eval { message, ctx, .. }
            | GoldenError::Write { message, ctx, .. }
            | GoldenError::Internal { message, ctx, .. } => (message, ctx),
        }
    }

    fn parts_mut(&mut self) -> (&mut String, &mut Option<BoxedCause>) {
        match self {
            GoldenError::Load { message, source, .. }
            | GoldenError::Config { message, source, .. }
            | GoldenError::Convention { message, source, .. }
            | GoldenError::Eval { message, source, .. }
            | GoldenError::Write { message, source, .. }
            | GoldenError::Internal { message, source, .. } => (message, source),
        }
    }

    /// Returns the type-safe error classification for this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            GoldenError::Load { .. } => ErrorType::Load,
            GoldenError::Config { .. } => ErrorType::Config,
            GoldenError::Convention { .. } => ErrorType::Convention,
            GoldenError::Eval { .. } => ErrorType::Eval,
            GoldenError::Write { .. } => ErrorType::Write,
            GoldenError::Internal { .. } => ErrorType::Internal,
        }
    }

    /// The bare message, without the variant prefix added by `Display`.
    pub fn message(&self) -> &str {
        self.parts().0
    }

    /// Prepends `prefix: ` to the message. Used to stamp the failing case label.
    pub fn prefixed(mut self, prefix: impl std::fmt::Display) -> Self {
        let (message, _) = self.parts_mut();
        *message = format!("{prefix}: {message}");
        self
    }

    /// Attaches the underlying cause.
    pub fn with_source(mut self, cause: impl Into<BoxedCause>) -> Self {
        let (_, source) = self.parts_mut();
        *source = Some(cause.into());
        self
    }
}

impl Diagnostic for GoldenError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(format!("goldgen::{}", self.error_type())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.parts()
            .1
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.parts()
            .1
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let (message, ctx) = self.parts();
        let span = ctx.span?;
        ctx.source.as_ref()?;
        let len = if span.end > span.start {
            span.end - span.start
        } else {
            1
        };
        Some(Box::new(std::iter::once(LabeledSpan::new(
            Some(message.clone()),
            span.start,
            len,
        ))))
    }
}

/// Converts a file name and its text into a shareable `NamedSource`.
pub fn to_error_source(name: impl AsRef<str>, text: impl Into<String>) -> SourceArc {
    Arc::new(NamedSource::new(name.as_ref(), text.into()))
}

/// Constructs a GoldenError variant with a formatted message and no context.
#[macro_export]
macro_rules! err_msg {
    ($variant:ident, $msg:literal $(, $arg:expr)* $(,)?) => {
        $crate::GoldenError::$variant {
            message: format!($msg $(, $arg)*),
            ctx: $crate::ErrorContext::none(),
            source: None,
        }
    };
}

/// Constructs a GoldenError variant with a message and a help text.
#[macro_export]
macro_rules! err_ctx {
    ($variant:ident, $msg:expr, help = $help:expr) => {
        $crate::GoldenError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::with_help(format!("{}", $help)),
            source: None,
        }
    };
}

/// Constructs a GoldenError variant pointing at a span of an optional pre-built source.
#[macro_export]
macro_rules! err_src {
    ($variant:ident, $msg:expr, $source:expr, $span:expr) => {
        $crate::GoldenError::$variant {
            message: $msg.to_string(),
            ctx: match $source {
                Some(source) => $crate::ErrorContext::with_source_and_span(
                    std::sync::Arc::clone(source),
                    $span,
                ),
                None => $crate::ErrorContext::none(),
            },
            source: None,
        }
    };
}

#[cfg(test)]
mod diagnostics_tests {
    use miette::Report;

    use super::*;

    #[test]
    fn test_labelled_report() {
        let src = to_error_source("table_test.go", "var x = []testCase{1}");
        let err = err_src!(
            Convention,
            "Invalid slice element",
            Some(&src),
            Span { start: 19, end: 20 }
        );
        assert_eq!(err.error_type(), ErrorType::Convention);
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("Invalid slice element"));
        assert!(output.contains("goldgen::convention"));
    }

    #[test]
    fn test_prefix_and_chaining() {
        let cause = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = err_msg!(Write, "Could not write file")
            .with_source(cause)
            .prefixed("eval/003[foo]");
        assert_eq!(err.message(), "eval/003[foo]: Could not write file");
        assert_eq!(
            err.to_string(),
            "Write error: eval/003[foo]: Could not write file"
        );
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("denied"));
    }

    #[test]
    fn test_help_is_rendered() {
        let err = err_ctx!(Config, "unknown field `shape`", help = "did you mean `shapes`?");
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("did you mean `shapes`?"));
    }
}
