//! Document and workspace symbol tests.

use typefront::hir::DeclKind;

use crate::helpers::hir_helpers::*;
use crate::helpers::source_fixtures::*;

#[test]
fn test_document_outline_of_shapes() {
    let mut host = host_from_source(SHAPES);
    let symbols = host.analysis().document_symbols(TEST_PATH).unwrap();
    let outline: Vec<_> = symbols
        .iter()
        .map(|s| (s.kind, s.qualified_name.as_ref()))
        .collect();
    assert_eq!(
        outline,
        vec![
            (DeclKind::Module, "Shapes"),
            (DeclKind::Interface, "Shapes.Shape"),
            (DeclKind::Method, "Shapes.Shape.area"),
            (DeclKind::Class, "Shapes.Circle"),
            (DeclKind::Constructor, "Shapes.Circle.constructor"),
            (DeclKind::Property, "Shapes.Circle.radius"),
            (DeclKind::Method, "Shapes.Circle.area"),
            (DeclKind::Variable, "c"),
            (DeclKind::Variable, "a"),
        ]
    );
}

#[test]
fn test_selection_range_is_name() {
    let mut host = host_from_source(SIMPLE_CLASS);
    let symbols = host.analysis().document_symbols(TEST_PATH).unwrap();
    let point = &symbols[0];
    assert_eq!(&SIMPLE_CLASS[point.selection_range], "Point");
    assert_eq!(&SIMPLE_CLASS[point.range], SIMPLE_CLASS);
    assert_eq!(point.container_name(), None);
    assert_eq!(symbols[1].container_name(), Some("Point"));
}

#[test]
fn test_workspace_symbols_across_units() {
    let mut host = host_from_sources(&[
        ("a.ts", "module Geometry { export class Vector {} }"),
        ("b.ts", "class Vectorizer {}\nvar unrelated;"),
    ]);
    let analysis = host.analysis();
    let names: Vec<_> = analysis
        .workspace_symbols(Some("vector"))
        .into_iter()
        .map(|s| s.qualified_name.to_string())
        .collect();
    assert_eq!(names, vec!["Geometry.Vector", "Vectorizer"]);
    assert_eq!(analysis.workspace_symbols(None).len(), 4);
}
