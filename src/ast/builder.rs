//! # AST Builder Module
//!
//! ## Purpose
//! Allocates node identities and constructs expressions. The Go front end lowers
//! tree-sitter nodes through it, and tests use the convenience constructors to build
//! synthetic trees without going through a parser.
//!
//! ## Invariants
//! - Node ids handed out by one builder are unique and increase monotonically.
//! - Constructors never inspect the type table; typing is a separate pass.

use super::{Expr, ExprKind, LitKind, NodeId, Span};

/// Hands out [`NodeId`]s and builds expressions.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    next: u32,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next node id.
    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// Builds an expression with a fresh id.
    pub fn expr(&mut self, span: Span, kind: ExprKind) -> Expr {
        Expr {
            id: self.next_id(),
            span,
            kind,
        }
    }

    // ------------------------------------------------------------------------
    // Convenience constructors (spanless)
    // ------------------------------------------------------------------------

    pub fn ident(&mut self, name: &str) -> Expr {
        self.expr(Span::default(), ExprKind::Ident(name.to_string()))
    }

    pub fn lit(&mut self, kind: LitKind, raw: &str) -> Expr {
        self.expr(
            Span::default(),
            ExprKind::BasicLit {
                kind,
                raw: raw.to_string(),
            },
        )
    }

    /// A double-quoted string literal holding `value` (quotes and escapes added).
    pub fn string(&mut self, value: &str) -> Expr {
        let raw = format!("{value:?}");
        self.lit(LitKind::String, &raw)
    }

    /// A backquoted string literal holding `value` verbatim.
    pub fn raw_string(&mut self, value: &str) -> Expr {
        let raw = format!("`{value}`");
        self.lit(LitKind::RawString, &raw)
    }

    pub fn int(&mut self, value: i64) -> Expr {
        self.lit(LitKind::Int, &value.to_string())
    }

    pub fn selector(&mut self, x: Expr, sel: &str) -> Expr {
        self.expr(
            Span::default(),
            ExprKind::Selector {
                x: Box::new(x),
                sel: sel.to_string(),
            },
        )
    }

    pub fn star(&mut self, x: Expr) -> Expr {
        self.expr(Span::default(), ExprKind::Star(Box::new(x)))
    }

    pub fn slice_of(&mut self, elem: Expr) -> Expr {
        self.expr(
            Span::default(),
            ExprKind::ArrayType {
                len: None,
                elem: Box::new(elem),
            },
        )
    }

    pub fn composite(&mut self, ty: Option<Expr>, elts: Vec<Expr>) -> Expr {
        self.expr(
            Span::default(),
            ExprKind::CompositeLit {
                ty: ty.map(Box::new),
                elts,
            },
        )
    }

    /// `key: value` where `key` is an identifier.
    pub fn field(&mut self, key: &str, value: Expr) -> Expr {
        let key = self.ident(key);
        self.key_value(key, value)
    }

    pub fn key_value(&mut self, key: Expr, value: Expr) -> Expr {
        self.expr(
            Span::default(),
            ExprKind::KeyValue {
                key: Box::new(key),
                value: Box::new(value),
            },
        )
    }

    pub fn call(&mut self, fun: Expr, args: Vec<Expr>) -> Expr {
        self.expr(
            Span::default(),
            ExprKind::Call {
                fun: Box::new(fun),
                args,
                ellipsis: false,
            },
        )
    }

    pub fn binary(&mut self, lhs: Expr, op: &str, rhs: Expr) -> Expr {
        self.expr(
            Span::default(),
            ExprKind::Binary {
                op: op.to_string(),
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_increasing() {
        let mut b = TreeBuilder::new();
        let x = b.ident("x");
        let y = b.string("y");
        let kv = b.key_value(x, y);
        let ExprKind::KeyValue { key, value } = &kv.kind else {
            panic!("expected key/value");
        };
        assert!(key.id < value.id);
        assert!(value.id < kv.id);
    }

    #[test]
    fn string_constructor_quotes_and_escapes() {
        let mut b = TreeBuilder::new();
        let s = b.string("a\"b");
        assert_eq!(
            s.kind,
            ExprKind::BasicLit {
                kind: LitKind::String,
                raw: r#""a\"b""#.to_string()
            }
        );
    }
}
