//! Type and constant information for a loaded package.
//!
//! The table maps expression ids to the rendered type of the expression and, when the
//! expression is a compile-time constant, its value. It is filled once by a loader
//! (or by hand in tests) and only read afterwards.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::{Expr, NodeId};

// ============================================================================
// CONSTANTS
// ============================================================================

/// A compile-time constant value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    String(String),
    Bool(bool),
    Int(i128),
    Float(f64),
}

impl Constant {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Constant::String(_) => "string",
            Constant::Bool(_) => "bool",
            Constant::Int(_) => "int",
            Constant::Float(_) => "float",
        }
    }
}

impl fmt::Display for Constant {
    /// Strings display quoted, everything else in its canonical literal form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::String(s) => write!(f, "{}", quote(s)),
            Constant::Bool(b) => write!(f, "{b}"),
            Constant::Int(i) => write!(f, "{i}"),
            Constant::Float(x) => write!(f, "{x}"),
        }
    }
}

/// Quotes `s` as a Go interpreted string literal.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

// ============================================================================
// TYPE TABLE
// ============================================================================

/// What the checker knows about one expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeAndValue {
    /// Fully qualified type string, e.g. `[]cuelang.org/go/cue.testCase`.
    pub ty: Option<String>,
    pub value: Option<Constant>,
}

/// Read access to type and constant information.
pub trait TypeInfo {
    /// The rendered type of `expr`, if known.
    fn type_of(&self, expr: &Expr) -> Option<&str>;

    /// The constant value of `expr`, if it is a compile-time constant.
    fn constant_of(&self, expr: &Expr) -> Option<&Constant>;
}

/// The default [`TypeInfo`] implementation: a map keyed by node id.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    entries: HashMap<NodeId, TypeAndValue>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_type(&mut self, id: NodeId, ty: impl Into<String>) {
        self.entries.entry(id).or_default().ty = Some(ty.into());
    }

    pub fn record_constant(&mut self, id: NodeId, value: Constant) {
        self.entries.entry(id).or_default().value = Some(value);
    }

    pub fn get(&self, id: NodeId) -> Option<&TypeAndValue> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TypeInfo for TypeTable {
    fn type_of(&self, expr: &Expr) -> Option<&str> {
        self.entries.get(&expr.id)?.ty.as_deref()
    }

    fn constant_of(&self, expr: &Expr) -> Option<&Constant> {
        self.entries.get(&expr.id)?.value.as_ref()
    }
}

// ============================================================================
// CONSTANT RESOLVER
// ============================================================================

/// Answers constant questions about expressions through a [`TypeInfo`].
#[derive(Clone, Copy)]
pub struct ConstantResolver<'a> {
    info: &'a dyn TypeInfo,
}

impl<'a> ConstantResolver<'a> {
    pub fn new(info: &'a dyn TypeInfo) -> Self {
        Self { info }
    }

    pub fn is_constant(&self, expr: &Expr) -> bool {
        self.info.constant_of(expr).is_some()
    }

    /// The value of a string constant, or the canonical text of any other constant.
    pub fn string_const(&self, expr: &Expr) -> Option<String> {
        match self.info.constant_of(expr)? {
            Constant::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}
