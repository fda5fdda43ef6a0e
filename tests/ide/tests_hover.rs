//! Hover tests for the IDE layer.

use rstest::rstest;

use crate::helpers::hir_helpers::*;

fn hover_line(source: &str, needle: &str) -> Option<String> {
    let mut host = host_from_source(source);
    let hover = host
        .analysis()
        .hover(TEST_PATH, offset_of_last(source, needle))
        .unwrap()?;
    let line = hover
        .contents
        .strip_prefix("```typescript\n")
        .and_then(|rest| rest.strip_suffix("\n```"))
        .unwrap_or_else(|| panic!("unexpected hover format: {}", hover.contents));
    Some(line.to_string())
}

#[rstest]
#[case::variable("var count = 1;\ncount;", "count", "(var) count: number")]
#[case::parameter("function f(p: string) { return p; }", "p;", "(parameter) p: string")]
#[case::class("class Point {}\nvar p: Point;", "Point", "class Point")]
#[case::interface("interface Shape {}\nvar s: Shape;", "Shape", "interface Shape")]
#[case::module_member("module A { export class B {} }\nvar b: A.B;", "B", "class A.B")]
#[case::alias("type Id = number;\nvar i: Id;", "Id", "type Id = number")]
#[case::expression("var s = 'a' + 'b';", "+", "string")]
fn test_hover_contents(#[case] source: &str, #[case] needle: &str, #[case] expected: &str) {
    assert_eq!(hover_line(source, needle).as_deref(), Some(expected));
}

#[test]
fn test_hover_marks_definitions() {
    let source = "var total = 1;\ntotal;";
    let mut host = host_from_source(source);
    let mut analysis = host.analysis();
    let definition = analysis.hover(TEST_PATH, offset_of(source, "total")).unwrap().unwrap();
    let usage = analysis.hover(TEST_PATH, offset_of_last(source, "total")).unwrap().unwrap();
    assert!(definition.is_definition);
    assert!(!usage.is_definition);
    assert_eq!(definition.symbol, usage.symbol);
}

#[test]
fn test_hover_on_keyword_is_none() {
    assert_eq!(hover_line("var x = 1;", "var"), None);
}
