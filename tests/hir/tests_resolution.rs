//! Type resolution through the semantic chain.

use rstest::rstest;
use typefront::hir::{ResolutionContext, SymbolKind, Type, TypeId, codes};

use crate::helpers::hir_helpers::*;
use crate::helpers::source_fixtures::*;

/// Type of the global `name`, displayed as source text.
fn global_type(source: &str, name: &str) -> String {
    let mut host = host_from_source(source);
    let mut analysis = host.analysis();
    let chain = analysis.chain();
    let symbol = global_symbol(chain, name);
    let mut resolver = chain.resolver();
    let ty = resolver.resolve_declared_symbol(symbol, &ResolutionContext::values());
    resolver.display_type(ty)
}

// =============================================================================
// DECLARED AND INFERRED TYPES
// =============================================================================

#[rstest]
#[case::annotation("var v: string;", "string")]
#[case::literal("var v = 1;", "number")]
#[case::boolean_literal("var v = !0;", "boolean")]
#[case::array("var v = [1, 2];", "number[]")]
#[case::call_result("function f() { return 'r'; }\nvar v = f();", "string")]
#[case::member("module M { export var m = true; }\nvar v = M.m;", "boolean")]
#[case::instance_property("class P { x: number; }\nvar v = new P().x;", "number")]
#[case::inherited_property(
    "interface A { a: string; }\ninterface B extends A { b: number; }\nvar b: B;\nvar v = b.a;",
    "string"
)]
#[case::function("function v(n: number) { return n; }", "(n: number) => number")]
#[case::class_value("class C {}\nvar v = C;", "typeof C")]
fn test_global_types(#[case] source: &str, #[case] name_type: &str) {
    assert_eq!(global_type(source, "v"), name_type);
}

#[test]
fn test_enum_member_type() {
    let mut host = host_from_source("enum Color { Red, Green }\nvar c = Color.Green;");
    let mut analysis = host.analysis();
    let chain = analysis.chain();
    let c = global_symbol(chain, "c");
    let color = global_symbol(chain, "Color");
    let mut resolver = chain.resolver();
    let ty = resolver.resolve_declared_symbol(c, &ResolutionContext::values());
    assert_eq!(resolver.types().get(ty), &Type::Enum(color));
}

#[test]
fn test_contextually_typed_parameter() {
    let source = "var g: (n: number) => void = function (x) { return x; };";
    let mut host = host_from_source(source);
    let info = host
        .analysis()
        .resolve_position(TEST_PATH, offset_of_last(source, "x;"))
        .unwrap()
        .unwrap();
    assert_eq!(info.ty, TypeId::NUMBER);
}

#[test]
fn test_resolve_position_finds_enclosing_declaration() {
    let source = "module M { export function f() { return 1; } }";
    let mut host = host_from_source(source);
    let mut analysis = host.analysis();
    let info = analysis
        .resolve_position(TEST_PATH, offset_of(source, "1;"))
        .unwrap()
        .unwrap();
    assert_eq!(info.ty, TypeId::NUMBER);
    let enclosing = info.enclosing_declaration.unwrap();
    let chain = analysis.chain();
    assert_eq!(chain.symbols().get(enclosing).kind, SymbolKind::Function);
    assert_eq!(chain.symbols().qualified_name(enclosing), "M.f");
}

// =============================================================================
// CIRCULARITY
// =============================================================================

#[test]
fn test_self_alias_terminates_unresolved() {
    let mut host = host_from_source(SELF_ALIAS);
    let mut analysis = host.analysis();
    let chain = analysis.chain();
    let t = global_symbol(chain, "T");
    let ty = chain.resolver().resolve_declared_symbol(t, &ResolutionContext::types());
    assert_eq!(ty, TypeId::UNRESOLVED);
}

#[test]
fn test_circular_interfaces_terminate_unresolved() {
    let mut host = host_from_source(CIRCULAR_INTERFACES);
    let mut analysis = host.analysis();
    let chain = analysis.chain();
    let a = global_symbol(chain, "A");
    let b = global_symbol(chain, "B");
    let mut resolver = chain.resolver();
    assert!(resolver.resolve_declared_symbol(a, &ResolutionContext::types()).is_unresolved());
    assert!(resolver.resolve_declared_symbol(b, &ResolutionContext::types()).is_unresolved());
}

#[test]
fn test_circularity_is_reported_once_per_cycle() {
    let mut host = host_from_source(CIRCULAR_INTERFACES);
    let diagnostics = host.analysis().diagnostics(TEST_PATH).unwrap();
    let circular: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.code == Some(codes::CIRCULAR_DEPENDENCY))
        .collect();
    assert_eq!(circular.len(), 1, "{:?}", diagnostics);
    assert_eq!(
        circular[0].message.as_ref(),
        "Type 'A' recursively references itself as a base type."
    );
}

#[test]
fn test_circularity_can_be_silenced() {
    let options = typefront::hir::AnalysisOptions {
        report_circularity: false,
        ..Default::default()
    };
    let mut host = typefront::ide::AnalysisHost::with_options(options);
    host.add_unit(TEST_PATH, SELF_ALIAS).unwrap();
    assert!(host.analysis().diagnostics(TEST_PATH).unwrap().is_empty());
}

#[test]
fn test_deep_alias_chain_resolves() {
    let source: String = (0..50)
        .map(|i| format!("type T{} = T{};\n", i, i + 1))
        .chain(std::iter::once("type T50 = number;\n".to_string()))
        .collect();
    assert_eq!(global_type(&format!("{}var v: T0;", source), "v"), "number");
}
