mod common;

use common::{load, EVAL_TEST, PACKAGE_PATH};
use goldgen::ast::{inspect_stmt, Expr, ExprKind};
use goldgen::syntax::load_source;
use goldgen::types::{Constant, TypeInfo};

/// Every composite literal of every function, in source order.
fn literals(loaded: &goldgen::syntax::LoadedPackage) -> Vec<&Expr> {
    let mut found = Vec::new();
    for file in &loaded.package.files {
        for func in file.functions() {
            for stmt in func.body.iter().flatten() {
                inspect_stmt(stmt, &mut |e| {
                    if matches!(e.kind, ExprKind::CompositeLit { .. }) {
                        found.push(e);
                    }
                    true
                });
            }
        }
    }
    found
}

#[test]
fn context_parameter_type_is_qualified() {
    let loaded = load(EVAL_TEST);
    let func = loaded.package.files[0].functions().next().unwrap();
    assert_eq!(func.name, "TestEval");
    assert_eq!(loaded.types.type_of(&func.params[0].ty), Some("*testing.T"));
}

#[test]
fn renamed_imports_resolve_to_their_path() {
    let loaded = load_source(
        "a_test.go",
        "package cue\n\nimport tt \"testing\"\n\nfunc TestA(t *tt.T) {}\n",
        PACKAGE_PATH,
    )
    .unwrap();
    let func = loaded.package.files[0].functions().next().unwrap();
    assert_eq!(loaded.types.type_of(&func.params[0].ty), Some("*testing.T"));
}

#[test]
fn table_literals_have_qualified_slice_types() {
    let loaded = load(EVAL_TEST);
    let tables: Vec<Option<&str>> = literals(&loaded)
        .into_iter()
        .filter_map(|lit| match &lit.kind {
            ExprKind::CompositeLit { ty: Some(ty), .. } => Some(loaded.types.type_of(ty)),
            _ => None,
        })
        .collect();
    assert_eq!(
        tables,
        vec![
            Some("[]cuelang.org/go/cue.testCase"),
            Some("[]cuelang.org/go/cue.testCase"),
            Some("[]cuelang.org/go/cue.testCase"),
        ]
    );
}

#[test]
fn external_test_packages_qualify_with_their_own_path() {
    let loaded = load_source(
        "a_test.go",
        "package cue_test\n\ntype testCase struct{}\n\nfunc f() { _ = []testCase{} }\n",
        "cuelang.org/go/cue_test",
    )
    .unwrap();
    let lit = literals(&loaded)[0];
    assert_eq!(
        loaded.types.type_of(lit),
        Some("[]cuelang.org/go/cue_test.testCase")
    );
}

#[test]
fn string_constants_are_folded() {
    let loaded = load_source(
        "a_test.go",
        r#"package cue

const base = "a: 1"

func f() {
	const local = "\n"
	_ = []string{
		"plain\t",
		`raw\t`,
		"x" + `y`,
		base + local + "b: 2",
		unknown,
	}
}
"#,
        PACKAGE_PATH,
    )
    .unwrap();
    let (_, elts) = literals(&loaded)[0].as_composite().unwrap();
    let values: Vec<Option<&Constant>> = elts.iter().map(|e| loaded.types.constant_of(e)).collect();
    assert_eq!(
        values,
        vec![
            Some(&Constant::String("plain\t".into())),
            Some(&Constant::String("raw\\t".into())),
            Some(&Constant::String("xy".into())),
            Some(&Constant::String("a: 1\nb: 2".into())),
            None,
        ]
    );
}

#[test]
fn syntax_errors_keep_the_rest_of_the_file() {
    let loaded = load_source(
        "a_test.go",
        "package cue\n\nimport \"testing\"\n\nfunc TestOK(t *testing.T) {}\n\nfunc broken( {\n",
        PACKAGE_PATH,
    )
    .unwrap();
    let names: Vec<&str> = loaded.package.files[0]
        .functions()
        .map(|f| f.name.as_str())
        .collect();
    assert!(names.contains(&"TestOK"), "{names:?}");
}
