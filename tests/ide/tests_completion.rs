//! Completion tests for the IDE layer.

use typefront::TextSize;
use typefront::ide::{CompletionItem, CompletionKind};

use crate::helpers::hir_helpers::*;

fn labels(items: &[CompletionItem]) -> Vec<&str> {
    items.iter().map(|i| i.label.as_ref()).collect()
}

fn member_completions(source: &str, after: &str) -> Vec<CompletionItem> {
    let mut host = host_from_source(source);
    let offset = offset_of_last(source, after) + TextSize::of(after);
    host.analysis().completions_at(TEST_PATH, offset, true).unwrap()
}

// =============================================================================
// MEMBER ACCESS
// =============================================================================

#[test]
fn test_interface_members_include_inherited() {
    let source = "interface A { a: number; }\ninterface B extends A { b: string; }\nvar v: B;\nv.b;";
    let items = member_completions(source, "v.");
    assert_eq!(labels(&items), vec!["a", "b"]);
    assert_eq!(items[1].detail.as_deref(), Some("string"));
}

#[test]
fn test_enum_members() {
    let source = "enum Color { Red, Green }\nColor.Red;";
    let items = member_completions(source, "Color.");
    assert_eq!(labels(&items), vec!["Green", "Red"]);
    assert!(items.iter().all(|i| i.kind == CompletionKind::EnumMember));
}

#[test]
fn test_method_detail_is_signature() {
    let source = "class C { run(n: number): string { return ''; } }\nnew C().run(1);";
    let items = member_completions(source, ").");
    assert_eq!(labels(&items), vec!["run"]);
    assert_eq!(items[0].kind, CompletionKind::Method);
    assert_eq!(items[0].detail.as_deref(), Some("(n: number) => string"));
}

#[test]
fn test_member_access_without_dot_is_empty() {
    let source = "var a = 1;\na;";
    let mut host = host_from_source(source);
    let offset = TextSize::of(source);
    assert!(host.analysis().completions_at(TEST_PATH, offset, true).unwrap().is_empty());
}

// =============================================================================
// SCOPE
// =============================================================================

#[test]
fn test_scope_completions_include_module_locals() {
    let source = "module M { var hidden = 1; export function f() { return hidden; } }";
    let mut host = host_from_source(source);
    let items = host
        .analysis()
        .completions_at(TEST_PATH, offset_of_last(source, "hidden"), false)
        .unwrap();
    let names = labels(&items);
    assert!(names.contains(&"hidden"));
    assert!(names.contains(&"f"));
    assert!(names.contains(&"M"));
    let hidden = names.iter().position(|n| *n == "hidden").unwrap();
    let m = names.iter().position(|n| *n == "M").unwrap();
    assert!(hidden < m);
}

#[test]
fn test_predefined_types_sort_last() {
    let source = "var zed = 1;\n";
    let mut host = host_from_source(source);
    let items = host
        .analysis()
        .completions_at(TEST_PATH, offset_of(source, "1"), false)
        .unwrap();
    let zed = items.iter().position(|i| i.label.as_ref() == "zed").unwrap();
    let number = items.iter().position(|i| i.label.as_ref() == "number").unwrap();
    assert!(zed < number);
    assert_eq!(items[number].kind, CompletionKind::Keyword);
}
