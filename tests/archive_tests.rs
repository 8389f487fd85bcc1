mod common;

use std::fs;

use common::{generate_into, EVAL_TEST};
use goldgen::archive::Archive;

#[test]
fn generated_archives_reparse_to_the_same_bytes() {
    let out = tempfile::tempdir().unwrap();
    let summary = generate_into(EVAL_TEST, out.path()).unwrap();
    for (group, case) in summary.cases() {
        let data = fs::read(out.path().join(&group.group).join(&case.file)).unwrap();
        let archive = Archive::parse(&data);
        assert_eq!(archive.format(), data, "{}", case.file);
    }
}

#[test]
fn file_contents_never_end_without_a_newline() {
    let out = tempfile::tempdir().unwrap();
    generate_into(EVAL_TEST, out.path()).unwrap();
    let archive = Archive::parse(&fs::read(out.path().join("eval/000_basic.txtar")).unwrap());
    for file in &archive.files {
        assert!(file.data.ends_with(b"\n"), "{}", file.name);
    }
    assert_eq!(archive.file("out/legacy-debug").unwrap().data, b"3\n");
}
