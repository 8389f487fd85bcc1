pub use crate::ast::Span;
pub use crate::diagnostics::{to_error_source, ErrorContext, ErrorType, GoldenError};

pub mod archive;
pub mod ast;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod eval;
pub mod extract;
pub mod generate;
pub mod syntax;
pub mod types;
