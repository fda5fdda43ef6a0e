//! Diagnostics tests: syntax, lowering and semantic problems per unit.

use typefront::hir::codes;

use crate::helpers::hir_helpers::*;

#[test]
fn test_clean_unit_has_no_diagnostics() {
    let mut host = host_from_source(crate::helpers::source_fixtures::SHAPES);
    let diagnostics = host.analysis().diagnostics(TEST_PATH).unwrap();
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
}

#[test]
fn test_undefined_type_tuple() {
    let mut host = host_from_source("var x: Missing;");
    let diagnostics = host.analysis().diagnostics(TEST_PATH).unwrap();
    let unit = host.chain().unit_id(TEST_PATH).unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, Some(codes::UNDEFINED_REFERENCE));
    assert_eq!(
        diagnostics[0].to_tuple(),
        (unit.0, 7, 14, "Could not find symbol 'Missing'.".to_string())
    );
}

#[test]
fn test_syntax_errors_are_reported() {
    let mut host = host_from_source("var = ;");
    let diagnostics = host.analysis().diagnostics(TEST_PATH).unwrap();
    assert!(!diagnostics.is_empty());
    assert!(diagnostics.iter().any(|d| d.code == Some(codes::SYNTAX)));
}

#[test]
fn test_not_lowered_construct_is_reported() {
    let mut host = host_from_source("with (o) { }");
    let diagnostics = host.analysis().diagnostics(TEST_PATH).unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, Some(codes::NOT_LOWERED));
}

#[test]
fn test_diagnostics_are_sorted_and_follow_edits() {
    let source = "var b: B2;\nvar a: A1;";
    let mut host = host_from_source(source);
    let starts: Vec<u32> = host
        .analysis()
        .diagnostics(TEST_PATH)
        .unwrap()
        .iter()
        .map(|d| d.range.start().into())
        .collect();
    assert_eq!(starts, vec![7, 18]);

    host.update_unit(TEST_PATH, "interface B2 {}\nvar b: B2;\nvar a: A1;").unwrap();
    let diagnostics = host.analysis().diagnostics(TEST_PATH).unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].message.as_ref(), "Could not find symbol 'A1'.");
}
