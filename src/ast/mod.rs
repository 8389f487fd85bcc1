//! AST module for scanned Go test sources
//!
//! This module provides the syntax tree the extractor works on. The tree is
//! deliberately small: it models the expressions and statements test tables are
//! written with and keeps everything else as verbatim source text. Every expression
//! carries a [`NodeId`] so that type and constant information can live in a separate,
//! read-only table (see [`crate::types`]).

// ============================================================================
// IMPORTS
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::diagnostics::SourceArc;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// Represents a byte span in the source code.
///
/// # Examples
///
/// ```rust
/// use goldgen::ast::Span;
/// let span = Span { start: 0, end: 5 };
/// assert_eq!(span.len(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Identity of an expression node, unique within one loaded package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct NodeId(pub u32);

/// An expression together with its identity and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExprKind,
}

/// Kind of a basic literal token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LitKind {
    Int,
    Float,
    Imaginary,
    Rune,
    /// Double-quoted string with escapes.
    String,
    /// Backquoted string.
    RawString,
}

/// The expression forms the extractor distinguishes.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Identifiers, including `true`, `false`, `nil` and `iota`.
    Ident(String),
    /// A literal token; `raw` is the token exactly as written.
    BasicLit { kind: LitKind, raw: String },
    /// `T{elts}`; `ty` is `None` for elided element literals (`{...}` inside a table).
    CompositeLit {
        ty: Option<Box<Expr>>,
        elts: Vec<Expr>,
    },
    /// `key: value` inside a composite literal.
    KeyValue { key: Box<Expr>, value: Box<Expr> },
    Call {
        fun: Box<Expr>,
        args: Vec<Expr>,
        /// `f(xs...)`
        ellipsis: bool,
    },
    Selector { x: Box<Expr>, sel: String },
    Binary {
        op: String,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary { op: String, x: Box<Expr> },
    Paren(Box<Expr>),
    /// `*x` as a pointer type or a dereference.
    Star(Box<Expr>),
    Index { x: Box<Expr>, index: Box<Expr> },
    Slice {
        x: Box<Expr>,
        low: Option<Box<Expr>>,
        high: Option<Box<Expr>>,
        max: Option<Box<Expr>>,
    },
    TypeAssert { x: Box<Expr>, ty: Option<Box<Expr>> },
    /// `[]T` when `len` is `None`, `[N]T` otherwise.
    ArrayType {
        len: Option<Box<Expr>>,
        elem: Box<Expr>,
    },
    MapType { key: Box<Expr>, value: Box<Expr> },
    /// A function literal; the body is walked, `raw` is used for rendering.
    FuncLit {
        params: Vec<Param>,
        body: Vec<Stmt>,
        raw: String,
    },
    /// Anything else, kept as written (struct and interface types, generics, ...).
    Raw(String),
}

/// One parameter declaration: `a, b T` has two names and one type.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub names: Vec<String>,
    pub ty: Expr,
    pub variadic: bool,
}

/// `names [ty] = values` in a `const` or `var` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSpec {
    pub names: Vec<String>,
    pub ty: Option<Expr>,
    pub values: Vec<Expr>,
}

/// Whether a declaration introduces constants or variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Const,
    Var,
}

/// Statements. Control-flow statements are not modelled individually: their
/// expressions and nested statements are kept so that traversal sees everything.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    Assign {
        lhs: Vec<Expr>,
        op: String,
        rhs: Vec<Expr>,
    },
    Decl { kind: DeclKind, specs: Vec<ValueSpec> },
    /// Local type declarations; only the declared names matter.
    TypeDecl(Vec<String>),
    Return(Vec<Expr>),
    Block(Vec<Stmt>),
    /// `if`, `for`, `switch`, `go`, `defer`, ... by keyword.
    Compound {
        keyword: String,
        exprs: Vec<Expr>,
        body: Vec<Stmt>,
    },
    Empty,
}

/// A function or method declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    pub span: Span,
    pub recv: Option<Param>,
    pub params: Vec<Param>,
    /// `None` for declarations without a body (assembly stubs).
    pub body: Option<Vec<Stmt>>,
}

/// Top-level declarations.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Func(FuncDecl),
    Values { kind: DeclKind, specs: Vec<ValueSpec> },
    Types(Vec<String>),
}

/// `import name "path"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub name: Option<String>,
    pub path: String,
}

impl Import {
    /// The identifier the import is referred to by inside the file.
    pub fn local_name(&self) -> &str {
        match &self.name {
            Some(name) => name,
            None => self.path.rsplit('/').next().unwrap_or(&self.path),
        }
    }
}

/// One parsed source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub package: String,
    pub imports: Vec<Import>,
    pub decls: Vec<Decl>,
    /// Original text, for diagnostics. Synthetic trees have none.
    pub source: Option<SourceArc>,
}

impl SourceFile {
    pub fn functions(&self) -> impl Iterator<Item = &FuncDecl> {
        self.decls.iter().filter_map(|d| match d {
            Decl::Func(f) => Some(f),
            _ => None,
        })
    }
}

/// A package: the files sharing one package clause in one directory.
#[derive(Debug, Clone)]
pub struct Package {
    /// Import path, e.g. `cuelang.org/go/cue`.
    pub path: String,
    pub name: String,
    pub files: Vec<SourceFile>,
}

// ============================================================================
// PUBLIC API IMPLEMENTATION
// ============================================================================

impl Expr {
    /// Returns the composite literal parts if this is a composite literal.
    pub fn as_composite(&self) -> Option<(Option<&Expr>, &[Expr])> {
        match &self.kind {
            ExprKind::CompositeLit { ty, elts } => Some((ty.as_deref(), elts)),
            _ => None,
        }
    }

    /// Returns the key and value if this is a `key: value` element.
    pub fn as_key_value(&self) -> Option<(&Expr, &Expr)> {
        match &self.kind {
            ExprKind::KeyValue { key, value } => Some((key, value)),
            _ => None,
        }
    }

    /// Returns the identifier name if this is a plain identifier.
    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// Visits the direct sub-expressions in source order.
    pub fn for_each_child<'a>(&'a self, f: &mut dyn FnMut(&'a Expr)) {
        match &self.kind {
            ExprKind::Ident(_) | ExprKind::BasicLit { .. } | ExprKind::Raw(_) => {}
            ExprKind::CompositeLit { ty, elts } => {
                if let Some(ty) = ty {
                    f(ty);
                }
                elts.iter().for_each(|e| f(e));
            }
            ExprKind::KeyValue { key, value } => {
                f(key);
                f(value);
            }
            ExprKind::Call { fun, args, .. } => {
                f(fun);
                args.iter().for_each(|e| f(e));
            }
            ExprKind::Selector { x, .. }
            | ExprKind::Unary { x, .. }
            | ExprKind::Paren(x)
            | ExprKind::Star(x) => f(x),
            ExprKind::Binary { lhs, rhs, .. } => {
                f(lhs);
                f(rhs);
            }
            ExprKind::Index { x, index } => {
                f(x);
                f(index);
            }
            ExprKind::Slice { x, low, high, max } => {
                f(x);
                for part in [low, high, max].into_iter().flatten() {
                    f(part);
                }
            }
            ExprKind::TypeAssert { x, ty } => {
                f(x);
                if let Some(ty) = ty {
                    f(ty);
                }
            }
            ExprKind::ArrayType { len, elem } => {
                if let Some(len) = len {
                    f(len);
                }
                f(elem);
            }
            ExprKind::MapType { key, value } => {
                f(key);
                f(value);
            }
            ExprKind::FuncLit { params, body, .. } => {
                params.iter().for_each(|p| f(&p.ty));
                for stmt in body {
                    stmt.for_each_expr(f);
                }
            }
        }
    }
}

impl Stmt {
    /// Visits the expressions held directly by this statement, descending into
    /// nested statements but not into sub-expressions.
    pub fn for_each_expr<'a>(&'a self, f: &mut dyn FnMut(&'a Expr)) {
        match self {
            Stmt::Expr(e) => f(e),
            Stmt::Assign { lhs, rhs, .. } => lhs.iter().chain(rhs).for_each(|e| f(e)),
            Stmt::Decl { specs, .. } => {
                for spec in specs {
                    if let Some(ty) = &spec.ty {
                        f(ty);
                    }
                    spec.values.iter().for_each(|e| f(e));
                }
            }
            Stmt::Return(exprs) => exprs.iter().for_each(|e| f(e)),
            Stmt::Block(stmts) => {
                for stmt in stmts {
                    stmt.for_each_expr(f);
                }
            }
            Stmt::Compound { exprs, body, .. } => {
                exprs.iter().for_each(|e| f(e));
                for stmt in body {
                    stmt.for_each_expr(f);
                }
            }
            Stmt::TypeDecl(_) | Stmt::Empty => {}
        }
    }
}

// ============================================================================
// TRAVERSAL
// ============================================================================

/// Pre-order traversal in the manner of an inspector: `visit` is called for every
/// expression and returns whether to descend into its children.
pub fn inspect_expr<'a>(expr: &'a Expr, visit: &mut dyn FnMut(&'a Expr) -> bool) {
    if !visit(expr) {
        return;
    }
    expr.for_each_child(&mut |child| inspect_expr(child, visit));
}

/// Runs [`inspect_expr`] over every expression reachable from `stmt`.
pub fn inspect_stmt<'a>(stmt: &'a Stmt, visit: &mut dyn FnMut(&'a Expr) -> bool) {
    stmt.for_each_expr(&mut |e| inspect_expr(e, visit));
}

// ============================================================================
// MODULE EXPORTS
// ============================================================================

pub mod builder;
pub mod render;

pub use builder::TreeBuilder;
