//! Go to definition tests for the IDE layer.

use typefront::TextRange;
use typefront::hir::SymbolKind;

use crate::helpers::hir_helpers::*;
use crate::helpers::source_fixtures::*;

// =============================================================================
// GOTO DEFINITION - BASIC
// =============================================================================

#[test]
fn test_goto_from_type_annotation() {
    let source = "class Vehicle {}\nvar car: Vehicle;";
    let mut host = host_from_source(source);
    let result = host
        .analysis()
        .goto_definition(TEST_PATH, offset_of_last(source, "Vehicle"))
        .unwrap();
    assert_eq!(result.targets.len(), 1);
    let target = &result.targets[0];
    assert_eq!(target.name, "Vehicle");
    assert_eq!(target.kind, SymbolKind::Class);
    assert_eq!(target.name_range, TextRange::new(6.into(), 13.into()));
    assert_eq!(target.full_range, TextRange::new(0.into(), 16.into()));
}

#[test]
fn test_goto_from_qualified_name() {
    let source = "module Outer { export module Inner { export class Deep {} } }\nvar d: Outer.Inner.Deep;";
    let mut host = host_from_source(source);
    let mut analysis = host.analysis();

    let deep = analysis.goto_definition(TEST_PATH, offset_of_last(source, "Deep")).unwrap();
    assert_eq!(deep.targets[0].kind, SymbolKind::Class);

    let inner = analysis.goto_definition(TEST_PATH, offset_of_last(source, "Inner")).unwrap();
    assert_eq!(inner.targets[0].kind, SymbolKind::Module);
    assert_eq!(inner.targets[0].name, "Inner");
}

#[test]
fn test_goto_member_through_instance() {
    let mut host = host_from_source(SHAPES);
    let result = host
        .analysis()
        .goto_definition(TEST_PATH, offset_of_last(SHAPES, "area"))
        .unwrap();
    assert_eq!(result.targets.len(), 1);
    assert_eq!(result.targets[0].kind, SymbolKind::Method);
}

// =============================================================================
// GOTO DEFINITION - CROSS UNIT
// =============================================================================

#[test]
fn test_goto_lists_every_merged_declaration() {
    let main = "var x = M.a;";
    let mut host = host_from_sources(&[
        ("a.ts", "module M { export var a; }"),
        ("b.ts", "module M { export var b; }"),
        ("main.ts", main),
    ]);
    let result = host.analysis().goto_definition("main.ts", offset_of(main, "M")).unwrap();
    let paths: Vec<_> = result.targets.iter().map(|t| t.path.as_ref().to_string()).collect();
    assert_eq!(paths, vec!["a.ts", "b.ts"]);
}

#[test]
fn test_goto_on_whitespace_or_primitive_is_empty() {
    let source = "var n: number;   ";
    let mut host = host_from_source(source);
    let mut analysis = host.analysis();
    assert!(
        analysis
            .goto_definition(TEST_PATH, offset_of(source, "number"))
            .unwrap()
            .is_empty()
    );
    assert!(analysis.goto_definition(TEST_PATH, 16.into()).unwrap().is_empty());
}
