//! A lightweight checker that fills a [`TypeTable`] for one package.
//!
//! Two kinds of facts are recorded:
//!
//! - **types** of type expressions (parameter types, composite literal types) and of
//!   composite literals themselves, rendered fully qualified the way Go's type checker
//!   prints them: `[]cuelang.org/go/cue.testCase`, `*testing.T`, `map[string]int`;
//! - **constant values** of every expression that is a compile-time constant: literals,
//!   `true`/`false`, `iota`, package and local constants, and arithmetic, concatenation,
//!   comparison and conversion over those.
//!
//! Function bodies are checked statement by statement with Go's block scoping: a local
//! declaration is visible from the statement after it to the end of its block, and a
//! variable or parameter hides a constant of the same name only there. Local constants
//! are folded where they are declared.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

use crate::ast::{
    inspect_expr, Decl, DeclKind, Expr, ExprKind, FuncDecl, Import, Package, Param, Stmt,
    ValueSpec,
};
use crate::syntax::literal;
use crate::types::{Constant, TypeTable};

static BUILTIN_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "bool", "string", "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16",
        "uint32", "uint64", "uintptr", "float32", "float64", "complex64", "complex128", "byte",
        "rune", "error", "any",
    ]
    .into_iter()
    .collect()
});

/// Checks every file of `package` and returns the filled table.
pub fn check(package: &Package) -> TypeTable {
    let checker = Checker::new(package);
    let mut table = TypeTable::new();
    for file in &package.files {
        for decl in &file.decls {
            match decl {
                Decl::Func(func) => checker.check_func(func, &file.imports, &mut table),
                Decl::Values { specs, .. } => {
                    checker.check_specs(specs, &Scope::default(), &file.imports, &mut table);
                }
                Decl::Types(_) => {}
            }
        }
    }
    tracing::debug!(
        "Checked package {}: {} table entries",
        package.path,
        table.len()
    );
    table
}

#[derive(Clone, Copy)]
struct ConstDef<'p> {
    expr: &'p Expr,
    iota: i128,
}

/// A name declared inside a function.
#[derive(Clone, Debug)]
enum Local {
    /// A local constant with its folded value.
    Const(Option<Constant>),
    /// A variable, parameter or named result.
    Var,
}

/// Local names visible at one point of a function body. Empty at the package level.
#[derive(Clone, Default)]
struct Scope<'p> {
    locals: HashMap<&'p str, Local>,
    types: HashSet<&'p str>,
}

impl<'p> Scope<'p> {
    fn declare_vars(&mut self, names: impl IntoIterator<Item = &'p str>) {
        for name in names {
            self.locals.insert(name, Local::Var);
        }
    }
}

struct Checker<'p> {
    path: &'p str,
    types: HashSet<&'p str>,
    consts: HashMap<&'p str, ConstDef<'p>>,
}

impl<'p> Checker<'p> {
    fn new(package: &'p Package) -> Self {
        let mut types = HashSet::new();
        let mut consts = HashMap::new();
        for decl in package.files.iter().flat_map(|f| &f.decls) {
            match decl {
                Decl::Types(names) => types.extend(names.iter().map(String::as_str)),
                Decl::Values {
                    kind: DeclKind::Const,
                    specs,
                } => collect_consts(specs, &mut consts),
                _ => {}
            }
        }
        Self {
            path: &package.path,
            types,
            consts,
        }
    }

    // ------------------------------------------------------------------------
    // Walking
    // ------------------------------------------------------------------------

    fn check_func(&self, func: &'p FuncDecl, imports: &[Import], table: &mut TypeTable) {
        let mut scope = Scope::default();
        for param in func.recv.iter().chain(&func.params) {
            self.record_param(param, &scope, imports, table);
            scope.declare_vars(param.names.iter().map(String::as_str));
        }
        if let Some(body) = &func.body {
            self.check_block(body, &mut scope, imports, table);
        }
    }

    /// Checks `stmts` in order, declaring names into `scope` as they appear.
    fn check_block(
        &self,
        stmts: &'p [Stmt],
        scope: &mut Scope<'p>,
        imports: &[Import],
        table: &mut TypeTable,
    ) {
        for stmt in stmts {
            self.check_stmt(stmt, scope, imports, table);
        }
    }

    fn check_stmt(
        &self,
        stmt: &'p Stmt,
        scope: &mut Scope<'p>,
        imports: &[Import],
        table: &mut TypeTable,
    ) {
        match stmt {
            Stmt::Decl {
                kind: DeclKind::Const,
                specs,
            } => self.declare_consts(specs, scope, imports, table),
            Stmt::Decl {
                kind: DeclKind::Var,
                specs,
            } => {
                self.check_specs(specs, scope, imports, table);
                for spec in specs {
                    scope.declare_vars(spec.names.iter().map(String::as_str));
                }
            }
            Stmt::Assign { lhs, op, rhs } if op == ":=" => {
                for e in rhs {
                    self.check_expr(e, scope, None, imports, table);
                }
                scope.declare_vars(lhs.iter().filter_map(|e| e.as_ident()));
                for e in lhs {
                    self.check_expr(e, scope, None, imports, table);
                }
            }
            Stmt::TypeDecl(names) => scope.types.extend(names.iter().map(String::as_str)),
            Stmt::Block(stmts) => self.check_block(stmts, &mut scope.clone(), imports, table),
            Stmt::Compound { exprs, body, .. } => {
                for e in exprs {
                    self.check_expr(e, scope, None, imports, table);
                }
                self.check_block(body, &mut scope.clone(), imports, table);
            }
            _ => {
                let scope = &*scope;
                stmt.for_each_expr(&mut |e| self.check_expr(e, scope, None, imports, table));
            }
        }
    }

    /// Folds a local `const` declaration. Each name is visible after its own spec, and a
    /// spec without values repeats the previous spec's expressions.
    fn declare_consts(
        &self,
        specs: &'p [ValueSpec],
        scope: &mut Scope<'p>,
        imports: &[Import],
        table: &mut TypeTable,
    ) {
        let mut last: &'p [Expr] = &[];
        for (iota, spec) in specs.iter().enumerate() {
            let iota = iota as i128;
            if let Some(ty) = &spec.ty {
                self.record_type(ty, scope, imports, table);
            }
            for value in &spec.values {
                self.check_expr(value, scope, Some(iota), imports, table);
            }
            if !spec.values.is_empty() {
                last = &spec.values;
            }
            let values: Vec<Option<Constant>> = (0..spec.names.len())
                .map(|i| {
                    last.get(i)
                        .and_then(|e| self.eval(e, scope, Some(iota), &mut Vec::new()))
                })
                .collect();
            for (name, value) in spec.names.iter().zip(values) {
                scope.locals.insert(name.as_str(), Local::Const(value));
            }
        }
    }

    /// Constant specs are checked with their `iota`; variable specs without.
    fn check_specs(
        &self,
        specs: &'p [ValueSpec],
        scope: &Scope<'p>,
        imports: &[Import],
        table: &mut TypeTable,
    ) {
        for (iota, spec) in specs.iter().enumerate() {
            if let Some(ty) = &spec.ty {
                self.record_type(ty, scope, imports, table);
            }
            for value in &spec.values {
                self.check_expr(value, scope, Some(iota as i128), imports, table);
            }
        }
    }

    fn check_expr(
        &self,
        expr: &'p Expr,
        scope: &Scope<'p>,
        iota: Option<i128>,
        imports: &[Import],
        table: &mut TypeTable,
    ) {
        inspect_expr(expr, &mut |e| {
            if let Some(value) = self.eval(e, scope, iota, &mut Vec::new()) {
                table.record_constant(e.id, value);
            }
            match &e.kind {
                ExprKind::CompositeLit { ty, elts } => {
                    let lit_type = match ty {
                        Some(ty) => self.record_type(ty, scope, imports, table),
                        None => table.get(e.id).and_then(|tv| tv.ty.clone()),
                    };
                    if let Some(lit_type) = lit_type {
                        if let Some(elem) = element_type(&lit_type) {
                            for elt in elts {
                                let value = match elt.as_key_value() {
                                    Some((_, value)) => value,
                                    None => elt,
                                };
                                if matches!(value.kind, ExprKind::CompositeLit { ty: None, .. }) {
                                    table.record_type(value.id, elem);
                                }
                            }
                        }
                        table.record_type(e.id, lit_type);
                    }
                }
                ExprKind::FuncLit { params, body, .. } => {
                    let mut inner = scope.clone();
                    for param in params {
                        self.record_param(param, scope, imports, table);
                        inner.declare_vars(param.names.iter().map(String::as_str));
                    }
                    self.check_block(body, &mut inner, imports, table);
                    return false;
                }
                _ => {}
            }
            true
        });
    }

    fn record_param(&self, param: &Param, scope: &Scope<'p>, imports: &[Import], table: &mut TypeTable) {
        self.record_type(&param.ty, scope, imports, table);
    }

    fn record_type(
        &self,
        ty: &Expr,
        scope: &Scope<'p>,
        imports: &[Import],
        table: &mut TypeTable,
    ) -> Option<String> {
        let rendered = self.qualify(ty, scope, imports)?;
        table.record_type(ty.id, rendered.clone());
        Some(rendered)
    }

    // ------------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------------

    /// Renders a type expression with package-declared names qualified by import path.
    fn qualify(&self, ty: &Expr, scope: &Scope<'p>, imports: &[Import]) -> Option<String> {
        let rendered = match &ty.kind {
            ExprKind::Ident(name) => {
                if BUILTIN_TYPES.contains(name.as_str()) {
                    name.clone()
                } else if self.types.contains(name.as_str()) || scope.types.contains(name.as_str()) {
                    format!("{}.{}", self.path, name)
                } else {
                    name.clone()
                }
            }
            ExprKind::Selector { x, sel } => {
                let alias = x.as_ident()?;
                let import = imports.iter().find(|i| i.local_name() == alias)?;
                format!("{}.{}", import.path, sel)
            }
            ExprKind::Star(x) => format!("*{}", self.qualify(x, scope, imports)?),
            ExprKind::Paren(x) => self.qualify(x, scope, imports)?,
            ExprKind::ArrayType { len, elem } => {
                let elem = self.qualify(elem, scope, imports)?;
                match len {
                    None => format!("[]{elem}"),
                    Some(len) => {
                        let n = match self.eval(len, scope, None, &mut Vec::new()) {
                            Some(Constant::Int(n)) => n.to_string(),
                            _ => len.pretty(),
                        };
                        format!("[{n}]{elem}")
                    }
                }
            }
            ExprKind::MapType { key, value } => format!(
                "map[{}]{}",
                self.qualify(key, scope, imports)?,
                self.qualify(value, scope, imports)?
            ),
            _ => ty.pretty(),
        };
        Some(rendered)
    }

    // ------------------------------------------------------------------------
    // Constants
    // ------------------------------------------------------------------------

    fn eval(
        &self,
        expr: &Expr,
        scope: &Scope<'p>,
        iota: Option<i128>,
        visiting: &mut Vec<&'p str>,
    ) -> Option<Constant> {
        match &expr.kind {
            ExprKind::BasicLit { kind, raw } => literal::decode(*kind, raw),
            ExprKind::Paren(x) => self.eval(x, scope, iota, visiting),
            ExprKind::Ident(name) => self.eval_ident(name, scope, iota, visiting),
            ExprKind::Unary { op, x } => {
                let value = self.eval(x, scope, iota, visiting)?;
                unary(op, value)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.eval(lhs, scope, iota, visiting)?;
                let r = self.eval(rhs, scope, iota, visiting)?;
                binary(op, l, r)
            }
            ExprKind::Call {
                fun,
                args,
                ellipsis: false,
            } if args.len() == 1 => {
                let name = fun.as_ident()?;
                if scope.locals.contains_key(name) {
                    return None;
                }
                let value = self.eval(&args[0], scope, iota, visiting)?;
                convert(name, value)
            }
            _ => None,
        }
    }

    fn eval_ident(
        &self,
        name: &str,
        scope: &Scope<'p>,
        iota: Option<i128>,
        visiting: &mut Vec<&'p str>,
    ) -> Option<Constant> {
        if let Some(local) = scope.locals.get(name) {
            return match local {
                Local::Const(value) => value.clone(),
                Local::Var => None,
            };
        }
        match name {
            "true" => return Some(Constant::Bool(true)),
            "false" => return Some(Constant::Bool(false)),
            "iota" => return iota.map(Constant::Int),
            _ => {}
        }
        let (&key, def) = self.consts.get_key_value(name)?;
        if visiting.contains(&key) {
            tracing::debug!("Constant cycle through {}", key);
            return None;
        }
        // Package constants only see package-level names.
        visiting.push(key);
        let value = self.eval(def.expr, &Scope::default(), Some(def.iota), visiting);
        visiting.pop();
        value
    }
}

// ============================================================================
// SCOPE COLLECTION
// ============================================================================

fn collect_consts<'p>(specs: &'p [ValueSpec], out: &mut HashMap<&'p str, ConstDef<'p>>) {
    // A spec without values repeats the previous spec's expressions.
    let mut last: &'p [Expr] = &[];
    for (iota, spec) in specs.iter().enumerate() {
        if !spec.values.is_empty() {
            last = &spec.values;
        }
        for (i, name) in spec.names.iter().enumerate() {
            if let Some(expr) = last.get(i) {
                out.insert(
                    name.as_str(),
                    ConstDef {
                        expr,
                        iota: iota as i128,
                    },
                );
            }
        }
    }
}

/// The element type of a slice, array or map type string, with pointer elision.
fn element_type(ty: &str) -> Option<&str> {
    let open = if ty.starts_with('[') {
        0
    } else if ty.starts_with("map[") {
        3
    } else {
        return None;
    };
    let mut depth = 0usize;
    for (i, c) in ty.char_indices().skip(open) {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    let elem = &ty[i + 1..];
                    return Some(elem.strip_prefix('*').unwrap_or(elem));
                }
            }
            _ => {}
        }
    }
    None
}

// ============================================================================
// CONSTANT ARITHMETIC
// ============================================================================

fn unary(op: &str, value: Constant) -> Option<Constant> {
    match (op, value) {
        ("-", Constant::Int(i)) => i.checked_neg().map(Constant::Int),
        ("-", Constant::Float(x)) => Some(Constant::Float(-x)),
        ("+", v @ (Constant::Int(_) | Constant::Float(_))) => Some(v),
        ("!", Constant::Bool(b)) => Some(Constant::Bool(!b)),
        ("^", Constant::Int(i)) => Some(Constant::Int(!i)),
        _ => None,
    }
}

fn binary(op: &str, l: Constant, r: Constant) -> Option<Constant> {
    match (l, r) {
        (Constant::String(a), Constant::String(b)) => match op {
            "+" => Some(Constant::String(a + &b)),
            _ => compare(op, a.cmp(&b)),
        },
        (Constant::Bool(a), Constant::Bool(b)) => match op {
            "&&" => Some(Constant::Bool(a && b)),
            "||" => Some(Constant::Bool(a || b)),
            "==" => Some(Constant::Bool(a == b)),
            "!=" => Some(Constant::Bool(a != b)),
            _ => None,
        },
        (Constant::Int(a), Constant::Int(b)) => int_op(op, a, b),
        (Constant::Int(a), Constant::Float(b)) => float_op(op, a as f64, b),
        (Constant::Float(a), Constant::Int(b)) => float_op(op, a, b as f64),
        (Constant::Float(a), Constant::Float(b)) => float_op(op, a, b),
        _ => None,
    }
}

fn compare(op: &str, ord: Ordering) -> Option<Constant> {
    let result = match op {
        "==" => ord.is_eq(),
        "!=" => ord.is_ne(),
        "<" => ord.is_lt(),
        "<=" => ord.is_le(),
        ">" => ord.is_gt(),
        ">=" => ord.is_ge(),
        _ => return None,
    };
    Some(Constant::Bool(result))
}

fn int_op(op: &str, a: i128, b: i128) -> Option<Constant> {
    let value = match op {
        "+" => a.checked_add(b)?,
        "-" => a.checked_sub(b)?,
        "*" => a.checked_mul(b)?,
        "/" => a.checked_div(b)?,
        "%" => a.checked_rem(b)?,
        "&" => a & b,
        "|" => a | b,
        "^" => a ^ b,
        "&^" => a & !b,
        "<<" => a.checked_shl(u32::try_from(b).ok()?)?,
        ">>" => a.checked_shr(u32::try_from(b).ok()?)?,
        _ => return compare(op, a.cmp(&b)),
    };
    Some(Constant::Int(value))
}

fn float_op(op: &str, a: f64, b: f64) -> Option<Constant> {
    let value = match op {
        "+" => a + b,
        "-" => a - b,
        "*" => a * b,
        "/" if b != 0.0 => a / b,
        _ => return compare(op, a.partial_cmp(&b)?),
    };
    Some(Constant::Float(value))
}

/// Constant conversions `T(c)` to basic types, and `len` of a constant string.
fn convert(name: &str, value: Constant) -> Option<Constant> {
    match (name, value) {
        ("len", Constant::String(s)) => Some(Constant::Int(s.len() as i128)),
        ("string", Constant::String(s)) => Some(Constant::String(s)),
        ("string", Constant::Int(i)) => {
            let c = u32::try_from(i).ok().and_then(char::from_u32).unwrap_or('\u{fffd}');
            Some(Constant::String(c.to_string()))
        }
        ("bool", v @ Constant::Bool(_)) => Some(v),
        ("float32" | "float64", Constant::Int(i)) => Some(Constant::Float(i as f64)),
        ("float32" | "float64", v @ Constant::Float(_)) => Some(v),
        (n, v @ Constant::Int(_)) if is_integer_type(n) => Some(v),
        (n, Constant::Float(x)) if is_integer_type(n) && x.fract() == 0.0 => {
            Some(Constant::Int(x as i128))
        }
        _ => None,
    }
}

fn is_integer_type(name: &str) -> bool {
    matches!(
        name,
        "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8" | "uint16" | "uint32"
            | "uint64" | "uintptr" | "byte" | "rune"
    )
}
