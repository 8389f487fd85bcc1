//! Go source parsing.
//!
//! Files are parsed with tree-sitter and lowered into [`crate::ast`]. Lowering is total:
//! regions the grammar could not parse, and node kinds the AST does not model, become
//! [`ExprKind::Raw`] expressions or generic compound statements, so a file with syntax
//! errors still yields every function that did parse.

use tree_sitter::{Node, Parser};

use crate::ast::{
    Decl, DeclKind, Expr, ExprKind, FuncDecl, Import, LitKind, Param, SourceFile, Span, Stmt,
    TreeBuilder, ValueSpec,
};
use crate::diagnostics::to_error_source;
use crate::syntax::literal;
use crate::{err_msg, GoldenError};

/// Parses `text` and lowers it, allocating node ids from `builder`.
pub fn parse_file(
    name: &str,
    text: &str,
    builder: &mut TreeBuilder,
) -> Result<SourceFile, GoldenError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_go::LANGUAGE.into())
        .map_err(|e| err_msg!(Internal, "Failed to set parser language for Go: {}", e))?;
    let tree = parser
        .parse(text, None)
        .ok_or_else(|| err_msg!(Load, "Failed to parse file: {}", name))?;

    let root = tree.root_node();
    if root.has_error() {
        tracing::warn!("{}: syntax errors, unparsable regions are kept verbatim", name);
    }

    let mut lower = Lowering {
        source: text,
        builder,
    };
    let mut file = SourceFile {
        name: name.to_string(),
        package: String::new(),
        imports: Vec::new(),
        decls: Vec::new(),
        source: Some(to_error_source(name, text)),
    };

    for child in named_children(root) {
        match child.kind() {
            "package_clause" => {
                if let Some(id) = named_children(child).first() {
                    file.package = lower.text(*id).to_string();
                }
            }
            "import_declaration" => lower.imports(child, &mut file.imports),
            "function_declaration" | "method_declaration" => {
                if let Some(func) = lower.func_decl(child) {
                    file.decls.push(Decl::Func(func));
                }
            }
            "const_declaration" => file.decls.push(Decl::Values {
                kind: DeclKind::Const,
                specs: lower.value_specs(child),
            }),
            "var_declaration" => file.decls.push(Decl::Values {
                kind: DeclKind::Var,
                specs: lower.value_specs(child),
            }),
            "type_declaration" => file.decls.push(Decl::Types(lower.type_names(child))),
            _ => {}
        }
    }

    tracing::debug!(
        "Parsed {}: package {}, {} declarations",
        name,
        file.package,
        file.decls.len()
    );
    Ok(file)
}

// ============================================================================
// LOWERING
// ============================================================================

struct Lowering<'s, 'b> {
    source: &'s str,
    builder: &'b mut TreeBuilder,
}

impl<'s> Lowering<'s, '_> {
    fn text(&self, node: Node) -> &'s str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    // ------------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------------

    fn imports(&mut self, node: Node, out: &mut Vec<Import>) {
        for child in named_children(node) {
            match child.kind() {
                "import_spec" => {
                    let Some(path) = child.child_by_field_name("path") else {
                        continue;
                    };
                    let raw = self.text(path);
                    let path = literal::unquote_interpreted(raw)
                        .or_else(|| literal::unquote_raw(raw))
                        .unwrap_or_else(|| raw.to_string());
                    let name = child
                        .child_by_field_name("name")
                        .map(|n| self.text(n).to_string());
                    out.push(Import { name, path });
                }
                _ => self.imports(child, out),
            }
        }
    }

    fn func_decl(&mut self, node: Node) -> Option<FuncDecl> {
        let name = self.text(node.child_by_field_name("name")?).to_string();
        let recv = node
            .child_by_field_name("receiver")
            .and_then(|r| self.params(r).into_iter().next());
        let params = node
            .child_by_field_name("parameters")
            .map(|p| self.params(p))
            .unwrap_or_default();
        let body = node.child_by_field_name("body").map(|b| self.block(b));
        Some(FuncDecl {
            name,
            span: span(node),
            recv,
            params,
            body,
        })
    }

    fn params(&mut self, list: Node) -> Vec<Param> {
        let mut params = Vec::new();
        for child in named_children(list) {
            let variadic = match child.kind() {
                "parameter_declaration" => false,
                "variadic_parameter_declaration" => true,
                _ => continue,
            };
            let Some(ty) = child.child_by_field_name("type") else {
                continue;
            };
            let names = self.field_texts(child, "name");
            let ty = self.expr(ty);
            params.push(Param {
                names,
                ty,
                variadic,
            });
        }
        params
    }

    fn value_specs(&mut self, node: Node) -> Vec<ValueSpec> {
        let mut specs = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "const_spec" | "var_spec" => {
                    let names = self.field_texts(child, "name");
                    let ty = child.child_by_field_name("type").map(|t| self.expr(t));
                    let values = child
                        .child_by_field_name("value")
                        .map(|v| self.expr_list(v))
                        .unwrap_or_default();
                    specs.push(ValueSpec { names, ty, values });
                }
                _ => specs.extend(self.value_specs(child)),
            }
        }
        specs
    }

    fn type_names(&mut self, node: Node) -> Vec<String> {
        let mut names = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "type_spec" | "type_alias" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        names.push(self.text(name).to_string());
                    }
                }
                _ => names.extend(self.type_names(child)),
            }
        }
        names
    }

    fn field_texts(&self, node: Node, field: &str) -> Vec<String> {
        let mut cursor = node.walk();
        node.children_by_field_name(field, &mut cursor)
            .map(|n| self.text(n).to_string())
            .collect()
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn block(&mut self, node: Node) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        for child in named_children(node) {
            if child.kind() == "statement_list" {
                stmts.extend(self.block(child));
            } else {
                stmts.push(self.stmt(child));
            }
        }
        stmts
    }

    fn stmt(&mut self, node: Node) -> Stmt {
        match node.kind() {
            "expression_statement" => match named_children(node).first() {
                Some(e) => Stmt::Expr(self.expr(*e)),
                None => Stmt::Empty,
            },
            "short_var_declaration" | "assignment_statement" => {
                let lhs = node
                    .child_by_field_name("left")
                    .map(|n| self.expr_list(n))
                    .unwrap_or_default();
                let rhs = node
                    .child_by_field_name("right")
                    .map(|n| self.expr_list(n))
                    .unwrap_or_default();
                let op = match node.child_by_field_name("operator") {
                    Some(op) => op.kind().to_string(),
                    None if node.kind() == "short_var_declaration" => ":=".to_string(),
                    None => "=".to_string(),
                };
                Stmt::Assign { lhs, op, rhs }
            }
            "return_statement" => {
                let mut exprs = Vec::new();
                for child in named_children(node) {
                    exprs.extend(self.expr_list(child));
                }
                Stmt::Return(exprs)
            }
            "block" => Stmt::Block(self.block(node)),
            "const_declaration" => Stmt::Decl {
                kind: DeclKind::Const,
                specs: self.value_specs(node),
            },
            "var_declaration" => Stmt::Decl {
                kind: DeclKind::Var,
                specs: self.value_specs(node),
            },
            "type_declaration" => Stmt::TypeDecl(self.type_names(node)),
            "empty_statement" => Stmt::Empty,
            kind => {
                let mut exprs = Vec::new();
                let mut body = Vec::new();
                self.collect(node, &mut exprs, &mut body);
                Stmt::Compound {
                    keyword: kind.trim_end_matches("_statement").to_string(),
                    exprs,
                    body,
                }
            }
        }
    }

    /// Gathers the expressions and statements nested in a statement the AST does not
    /// model, looking through clauses (`for_clause`, `expression_case`, ...).
    fn collect(&mut self, node: Node, exprs: &mut Vec<Expr>, body: &mut Vec<Stmt>) {
        for child in named_children(node) {
            let kind = child.kind();
            if kind == "block" || kind == "statement_list" {
                body.extend(self.block(child));
            } else if kind == "range_clause" {
                body.push(self.range_clause(child));
            } else if CASE_CLAUSES.contains(&kind) {
                let mut case_exprs = Vec::new();
                let mut case_body = Vec::new();
                self.collect(child, &mut case_exprs, &mut case_body);
                body.push(Stmt::Compound {
                    keyword: "case".to_string(),
                    exprs: case_exprs,
                    body: case_body,
                });
            } else if is_statement(kind) {
                body.push(self.stmt(child));
            } else if kind == "expression_list" {
                exprs.extend(self.expr_list(child));
            } else if is_expression(kind) {
                exprs.push(self.expr(child));
            } else {
                self.collect(child, exprs, body);
            }
        }
    }

    /// `k, v := range x` as the assignment it declares, first in the loop body.
    fn range_clause(&mut self, node: Node) -> Stmt {
        let lhs = node
            .child_by_field_name("left")
            .map(|n| self.expr_list(n))
            .unwrap_or_default();
        let rhs = node
            .child_by_field_name("right")
            .map(|n| self.expr_list(n))
            .unwrap_or_default();
        let mut cursor = node.walk();
        let declares = node.children(&mut cursor).any(|c| c.kind() == ":=");
        Stmt::Assign {
            lhs,
            op: if declares { ":=" } else { "=" }.to_string(),
            rhs,
        }
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn expr_list(&mut self, node: Node) -> Vec<Expr> {
        if node.kind() == "expression_list" {
            named_children(node)
                .into_iter()
                .map(|n| self.expr(n))
                .collect()
        } else {
            vec![self.expr(node)]
        }
    }

    fn expr(&mut self, node: Node) -> Expr {
        if matches!(node.kind(), "literal_element" | "variadic_argument") {
            if let Some(inner) = named_children(node).first() {
                return self.expr(*inner);
            }
        }
        let kind = self
            .expr_kind(node)
            .unwrap_or_else(|| ExprKind::Raw(self.text(node).to_string()));
        self.builder.expr(span(node), kind)
    }

    fn field_expr(&mut self, node: Node, field: &str) -> Option<Box<Expr>> {
        let child = node.child_by_field_name(field)?;
        Some(Box::new(self.expr(child)))
    }

    fn expr_kind(&mut self, node: Node) -> Option<ExprKind> {
        let kind = match node.kind() {
            "identifier" | "field_identifier" | "package_identifier" | "type_identifier"
            | "blank_identifier" | "true" | "false" | "nil" | "iota" => {
                ExprKind::Ident(self.text(node).to_string())
            }
            "int_literal" => self.lit(node, LitKind::Int),
            "float_literal" => self.lit(node, LitKind::Float),
            "imaginary_literal" => self.lit(node, LitKind::Imaginary),
            "rune_literal" => self.lit(node, LitKind::Rune),
            "interpreted_string_literal" => self.lit(node, LitKind::String),
            "raw_string_literal" => self.lit(node, LitKind::RawString),
            "composite_literal" => {
                let ty = self.field_expr(node, "type");
                let elts = self.literal_elements(node.child_by_field_name("body")?);
                ExprKind::CompositeLit { ty, elts }
            }
            "literal_value" => ExprKind::CompositeLit {
                ty: None,
                elts: self.literal_elements(node),
            },
            "keyed_element" => {
                let parts = named_children(node);
                let (first, last) = (*parts.first()?, *parts.last()?);
                if parts.len() < 2 {
                    return None;
                }
                ExprKind::KeyValue {
                    key: Box::new(self.expr(first)),
                    value: Box::new(self.expr(last)),
                }
            }
            "func_literal" => {
                let params = node
                    .child_by_field_name("parameters")
                    .map(|p| self.params(p))
                    .unwrap_or_default();
                let body = node
                    .child_by_field_name("body")
                    .map(|b| self.block(b))
                    .unwrap_or_default();
                ExprKind::FuncLit {
                    params,
                    body,
                    raw: self.text(node).to_string(),
                }
            }
            "call_expression" => {
                let fun = self.field_expr(node, "function")?;
                let mut args = Vec::new();
                let mut ellipsis = false;
                if let Some(list) = node.child_by_field_name("arguments") {
                    for arg in named_children(list) {
                        ellipsis |= arg.kind() == "variadic_argument";
                        args.push(self.expr(arg));
                    }
                }
                ExprKind::Call {
                    fun,
                    args,
                    ellipsis,
                }
            }
            "selector_expression" => ExprKind::Selector {
                x: self.field_expr(node, "operand")?,
                sel: self.text(node.child_by_field_name("field")?).to_string(),
            },
            "qualified_type" => ExprKind::Selector {
                x: self.field_expr(node, "package")?,
                sel: self.text(node.child_by_field_name("name")?).to_string(),
            },
            "binary_expression" => ExprKind::Binary {
                op: node.child_by_field_name("operator")?.kind().to_string(),
                lhs: self.field_expr(node, "left")?,
                rhs: self.field_expr(node, "right")?,
            },
            "unary_expression" => {
                let op = node.child_by_field_name("operator")?.kind();
                let x = self.field_expr(node, "operand")?;
                if op == "*" {
                    ExprKind::Star(x)
                } else {
                    ExprKind::Unary {
                        op: op.to_string(),
                        x,
                    }
                }
            }
            "parenthesized_expression" | "parenthesized_type" => {
                let inner = *named_children(node).first()?;
                ExprKind::Paren(Box::new(self.expr(inner)))
            }
            "pointer_type" => {
                let inner = *named_children(node).first()?;
                ExprKind::Star(Box::new(self.expr(inner)))
            }
            "index_expression" => ExprKind::Index {
                x: self.field_expr(node, "operand")?,
                index: self.field_expr(node, "index")?,
            },
            "slice_expression" => ExprKind::Slice {
                x: self.field_expr(node, "operand")?,
                low: self.field_expr(node, "start"),
                high: self.field_expr(node, "end"),
                max: self.field_expr(node, "capacity"),
            },
            "type_assertion_expression" => ExprKind::TypeAssert {
                x: self.field_expr(node, "operand")?,
                ty: self.field_expr(node, "type"),
            },
            "type_conversion_expression" => ExprKind::Call {
                fun: self.field_expr(node, "type")?,
                args: vec![self.expr(node.child_by_field_name("operand")?)],
                ellipsis: false,
            },
            "slice_type" => ExprKind::ArrayType {
                len: None,
                elem: self.field_expr(node, "element")?,
            },
            "array_type" => ExprKind::ArrayType {
                len: self.field_expr(node, "length"),
                elem: self.field_expr(node, "element")?,
            },
            "implicit_length_array_type" => {
                let len = self
                    .builder
                    .expr(Span::default(), ExprKind::Raw("...".to_string()));
                ExprKind::ArrayType {
                    len: Some(Box::new(len)),
                    elem: self.field_expr(node, "element")?,
                }
            }
            "map_type" => ExprKind::MapType {
                key: self.field_expr(node, "key")?,
                value: self.field_expr(node, "value")?,
            },
            _ => return None,
        };
        Some(kind)
    }

    fn lit(&self, node: Node, kind: LitKind) -> ExprKind {
        ExprKind::BasicLit {
            kind,
            raw: self.text(node).to_string(),
        }
    }

    fn literal_elements(&mut self, body: Node) -> Vec<Expr> {
        named_children(body)
            .into_iter()
            .map(|e| self.expr(e))
            .collect()
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

fn span(node: Node) -> Span {
    Span {
        start: node.start_byte(),
        end: node.end_byte(),
    }
}

/// Each clause of a `switch` or `select` is its own block.
const CASE_CLAUSES: [&str; 4] = [
    "expression_case",
    "type_case",
    "default_case",
    "communication_case",
];

fn is_statement(kind: &str) -> bool {
    kind.ends_with("_statement")
        || matches!(
            kind,
            "short_var_declaration" | "var_declaration" | "const_declaration" | "type_declaration"
        )
}

fn is_expression(kind: &str) -> bool {
    kind.ends_with("_expression")
        || kind.ends_with("_literal")
        || kind.ends_with("_type")
        || matches!(
            kind,
            "identifier"
                | "field_identifier"
                | "package_identifier"
                | "type_identifier"
                | "blank_identifier"
                | "true"
                | "false"
                | "nil"
                | "iota"
                | "literal_value"
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> SourceFile {
        let mut b = TreeBuilder::new();
        parse_file("x_test.go", text, &mut b).unwrap()
    }

    #[test]
    fn lowers_package_imports_and_functions() {
        let file = parse(
            r#"package cue

import (
	"testing"
	ctx "cuelang.org/go/cue/cuecontext"
)

func TestFoo(t *testing.T) {
	rewriteHelper(t, cases, debug)
}
"#,
        );
        assert_eq!(file.package, "cue");
        assert_eq!(file.imports.len(), 2);
        assert_eq!(file.imports[0].local_name(), "testing");
        assert_eq!(file.imports[1].local_name(), "ctx");

        let func = file.functions().next().unwrap();
        assert_eq!(func.name, "TestFoo");
        assert_eq!(func.params.len(), 1);
        assert_eq!(func.params[0].names, vec!["t".to_string()]);
        assert_eq!(func.params[0].ty.pretty(), "*testing.T");

        let body = func.body.as_ref().unwrap();
        let Stmt::Expr(call) = &body[0] else {
            panic!("expected expression statement, got {:?}", body[0]);
        };
        assert_eq!(call.pretty(), "rewriteHelper(t, cases, debug)");
    }

    #[test]
    fn lowers_table_literals() {
        let file = parse(
            r#"package cue

func TestTable(t *testing.T) {
	testCases := []testCase{{
		name: "a",
		in:   `x: 1`,
		out:  "3",
	}}
	for _, tc := range testCases {
		_ = tc
	}
}
"#,
        );
        let func = file.functions().next().unwrap();
        let body = func.body.as_ref().unwrap();
        let Stmt::Assign { rhs, op, .. } = &body[0] else {
            panic!("expected assignment, got {:?}", body[0]);
        };
        assert_eq!(op, ":=");
        let (ty, elts) = rhs[0].as_composite().unwrap();
        assert_eq!(ty.unwrap().pretty(), "[]testCase");
        assert_eq!(elts.len(), 1);
        let (_, fields) = elts[0].as_composite().unwrap();
        let keys: Vec<String> = fields
            .iter()
            .map(|f| f.as_key_value().unwrap().0.pretty())
            .collect();
        assert_eq!(keys, vec!["name", "in", "out"]);
        let Stmt::Compound { keyword, body: loop_body, .. } = &body[1] else {
            panic!("expected for loop, got {:?}", body[1]);
        };
        assert_eq!(keyword, "for");
        let Stmt::Assign { lhs, op, rhs } = &loop_body[0] else {
            panic!("expected range assignment, got {:?}", loop_body[0]);
        };
        assert_eq!(op, ":=");
        assert_eq!(lhs.iter().map(Expr::pretty).collect::<Vec<_>>(), vec!["_", "tc"]);
        assert_eq!(rhs[0].pretty(), "testCases");
    }

    #[test]
    fn switch_clauses_are_separate_blocks() {
        let file = parse(
            "package p\n\nfunc f(x int) {\n\tswitch y := x; y {\n\tcase 1:\n\t\tz := 2\n\t\t_ = z\n\tdefault:\n\t}\n}\n",
        );
        let body = file.functions().next().unwrap().body.clone().unwrap();
        let Stmt::Compound { keyword, body: clauses, .. } = &body[0] else {
            panic!("expected switch, got {:?}", body[0]);
        };
        assert_eq!(keyword, "expression_switch");
        assert!(matches!(&clauses[0], Stmt::Assign { op, .. } if op == ":="));
        let cases: Vec<usize> = clauses
            .iter()
            .filter_map(|s| match s {
                Stmt::Compound { keyword, body, .. } if keyword == "case" => Some(body.len()),
                _ => None,
            })
            .collect();
        assert_eq!(cases, vec![2, 0]);
    }

    #[test]
    fn lowers_const_declarations() {
        let file = parse("package p\n\nconst (\n\tA = \"a\"\n\tB = A + \"b\"\n)\n");
        let Decl::Values { kind, specs } = &file.decls[0] else {
            panic!("expected values");
        };
        assert_eq!(*kind, DeclKind::Const);
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[1].names, vec!["B".to_string()]);
        assert_eq!(specs[1].values[0].pretty(), r#"A + "b""#);
    }
}
