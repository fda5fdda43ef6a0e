//! Binding declarations into symbols.

use typefront::hir::{SymbolFlags, SymbolKind, codes};

use crate::helpers::hir_helpers::*;
use crate::helpers::source_fixtures::*;

// =============================================================================
// MERGING
// =============================================================================

#[test]
fn test_split_module_binds_to_one_symbol() {
    let host = host_from_source(SPLIT_MODULE);
    let chain = host.chain();
    let m = global_symbol(chain, "M");
    let symbol = chain.symbols().get(m);
    assert_eq!(symbol.kind, SymbolKind::Module);
    assert_eq!(symbol.decls.len(), 2);
    assert!(chain.symbols().member(m, "a").is_some());
    assert!(chain.symbols().member(m, "b").is_some());
}

#[test]
fn test_empty_modules_merge() {
    let host = host_from_source("module M {}\nmodule M {}");
    let chain = host.chain();
    let m = global_symbol(chain, "M");
    assert_eq!(chain.symbols().get(m).decls.len(), 2);
}

#[test]
fn test_module_merges_across_units() {
    let host = host_from_sources(&[("a.ts", "module M { export var a; }"), ("b.ts", "module M { export var b; }")]);
    let chain = host.chain();
    let m = global_symbol(chain, "M");
    let units: Vec<_> = chain.symbols().get(m).decls.iter().map(|d| d.unit).collect();
    assert_eq!(units, vec![chain.unit_id("a.ts").unwrap(), chain.unit_id("b.ts").unwrap()]);
}

#[test]
fn test_module_merges_into_class() {
    let host = host_from_source("class C {}\nmodule C { export var helper = 1; }");
    let chain = host.chain();
    let c = global_symbol(chain, "C");
    assert_eq!(chain.symbols().get(c).kind, SymbolKind::Class);
    assert!(chain.symbols().get(c).flags.contains(SymbolFlags::HAS_NAMESPACE));
    assert!(chain.symbols().member(c, "helper").is_some());
}

// =============================================================================
// SCOPES
// =============================================================================

#[test]
fn test_unexported_module_member_is_local() {
    let host = host_from_source("module M { var hidden; export var shown; }");
    let chain = host.chain();
    let m = global_symbol(chain, "M");
    assert!(chain.symbols().member(m, "shown").is_some());
    assert!(chain.symbols().member(m, "hidden").is_none());
    assert!(chain.symbols().local(m, "hidden").is_some());
}

#[test]
fn test_nested_modules_qualify() {
    let host = host_from_source(NESTED_MODULES);
    let chain = host.chain();
    let outer = global_symbol(chain, "Outer");
    let inner = chain.symbols().member(outer, "Inner").unwrap();
    let deep = chain.symbols().member(inner, "Deep").unwrap();
    assert_eq!(chain.symbols().qualified_name(deep), "Outer.Inner.Deep");
}

#[test]
fn test_class_members_and_parameter_properties() {
    let host = host_from_source("class P { x: number; static origin: P; constructor(public y: number) {} }");
    let chain = host.chain();
    let p = global_symbol(chain, "P");
    for name in ["x", "y"] {
        assert!(chain.symbols().member(p, name).is_some(), "missing member {}", name);
    }
    let origin = chain.symbols().member(p, "origin").unwrap();
    assert!(chain.symbols().get(origin).flags.contains(SymbolFlags::STATIC));
}

// =============================================================================
// DUPLICATES
// =============================================================================

#[test]
fn test_incompatible_redeclaration_is_reported() {
    let mut host = host_from_source("var x;\nclass x {}");
    let diagnostics = host.analysis().diagnostics(TEST_PATH).unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, Some(codes::DUPLICATE_DEFINITION));
    assert_eq!(diagnostics[0].message.as_ref(), "Duplicate identifier 'x'.");
}

#[test]
fn test_repeated_var_is_not_reported() {
    let mut host = host_from_source("var x = 1;\nvar x = 2;");
    assert!(host.analysis().diagnostics(TEST_PATH).unwrap().is_empty());
}
