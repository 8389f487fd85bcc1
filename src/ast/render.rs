//! Renders expressions back to canonical Go source text.
//!
//! Output is single-line and gofmt-spaced: binary operators are surrounded by one
//! space, list elements are separated by `", "`, and literal tokens are reproduced
//! exactly as written.

use super::{Expr, ExprKind, Param};

impl Expr {
    /// Pretty-prints the expression as Go source.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use goldgen::ast::TreeBuilder;
    /// let mut b = TreeBuilder::new();
    /// let t = b.ident("testing");
    /// let sel = b.selector(t, "T");
    /// let ptr = b.star(sel);
    /// assert_eq!(ptr.pretty(), "*testing.T");
    /// ```
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out);
        out
    }

    fn write_pretty(&self, out: &mut String) {
        match &self.kind {
            ExprKind::Ident(name) => out.push_str(name),
            ExprKind::BasicLit { raw, .. } => out.push_str(raw),
            ExprKind::Raw(text) => out.push_str(text),
            ExprKind::FuncLit { raw, .. } => out.push_str(raw),
            ExprKind::CompositeLit { ty, elts } => {
                if let Some(ty) = ty {
                    ty.write_pretty(out);
                }
                out.push('{');
                write_list(out, elts);
                out.push('}');
            }
            ExprKind::KeyValue { key, value } => {
                key.write_pretty(out);
                out.push_str(": ");
                value.write_pretty(out);
            }
            ExprKind::Call {
                fun,
                args,
                ellipsis,
            } => {
                fun.write_pretty(out);
                out.push('(');
                write_list(out, args);
                if *ellipsis {
                    out.push_str("...");
                }
                out.push(')');
            }
            ExprKind::Selector { x, sel } => {
                x.write_pretty(out);
                out.push('.');
                out.push_str(sel);
            }
            ExprKind::Binary { op, lhs, rhs } => {
                lhs.write_pretty(out);
                out.push(' ');
                out.push_str(op);
                out.push(' ');
                rhs.write_pretty(out);
            }
            ExprKind::Unary { op, x } => {
                out.push_str(op);
                x.write_pretty(out);
            }
            ExprKind::Paren(x) => {
                out.push('(');
                x.write_pretty(out);
                out.push(')');
            }
            ExprKind::Star(x) => {
                out.push('*');
                x.write_pretty(out);
            }
            ExprKind::Index { x, index } => {
                x.write_pretty(out);
                out.push('[');
                index.write_pretty(out);
                out.push(']');
            }
            ExprKind::Slice { x, low, high, max } => {
                x.write_pretty(out);
                out.push('[');
                if let Some(low) = low {
                    low.write_pretty(out);
                }
                out.push(':');
                if let Some(high) = high {
                    high.write_pretty(out);
                }
                if let Some(max) = max {
                    out.push(':');
                    max.write_pretty(out);
                }
                out.push(']');
            }
            ExprKind::TypeAssert { x, ty } => {
                x.write_pretty(out);
                out.push_str(".(");
                match ty {
                    Some(ty) => ty.write_pretty(out),
                    None => out.push_str("type"),
                }
                out.push(')');
            }
            ExprKind::ArrayType { len, elem } => {
                out.push('[');
                if let Some(len) = len {
                    len.write_pretty(out);
                }
                out.push(']');
                elem.write_pretty(out);
            }
            ExprKind::MapType { key, value } => {
                out.push_str("map[");
                key.write_pretty(out);
                out.push(']');
                value.write_pretty(out);
            }
        }
    }
}

impl Param {
    /// `a, b T` / `xs ...T`
    pub fn pretty(&self) -> String {
        let ty = self.ty.pretty();
        let ty = if self.variadic { format!("...{ty}") } else { ty };
        if self.names.is_empty() {
            ty
        } else {
            format!("{} {}", self.names.join(", "), ty)
        }
    }
}

fn write_list(out: &mut String, exprs: &[Expr]) {
    for (i, e) in exprs.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        e.write_pretty(out);
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{LitKind, TreeBuilder};

    #[test]
    fn renders_composite_literals() {
        let mut b = TreeBuilder::new();
        let elem = b.ident("testCase");
        let ty = b.slice_of(elem);
        let v = b.string("a");
        let f = b.field("in", v);
        let n = b.int(3);
        let g = b.field("n", n);
        let case = b.composite(None, vec![f, g]);
        let table = b.composite(Some(ty), vec![case]);
        assert_eq!(table.pretty(), r#"[]testCase{{in: "a", n: 3}}"#);
    }

    #[test]
    fn renders_calls_and_binaries() {
        let mut b = TreeBuilder::new();
        let fun = b.ident("rewriteHelper");
        let t = b.ident("t");
        let cases = b.ident("testCases");
        let lhs = b.lit(LitKind::RawString, "`a`");
        let rhs = b.string("b");
        let sum = b.binary(lhs, "+", rhs);
        let call = b.call(fun, vec![t, cases, sum]);
        assert_eq!(call.pretty(), r#"rewriteHelper(t, testCases, `a` + "b")"#);
    }
}
