//! Semantic chain updates: incremental rebinding, invalidation, cancellation.

use tokio_util::sync::CancellationToken;
use typefront::hir::{Cancelled, ResolutionContext, TypeId};
use typefront::ide::AnalysisError;

use crate::helpers::hir_helpers::*;

fn declared_type(host: &mut typefront::ide::AnalysisHost, name: &str) -> TypeId {
    let mut analysis = host.analysis();
    let chain = analysis.chain();
    let symbol = global_symbol(chain, name);
    chain.resolver().resolve_declared_symbol(symbol, &ResolutionContext::values())
}

// =============================================================================
// UPDATES
// =============================================================================

#[test]
fn test_dependent_in_other_unit_is_invalidated() {
    let mut host = host_from_sources(&[("a.ts", "var a = 1;"), ("b.ts", "var b = a;")]);
    assert_eq!(declared_type(&mut host, "b"), TypeId::NUMBER);

    host.update_unit("a.ts", "var a = 'one';").unwrap();
    assert_eq!(declared_type(&mut host, "b"), TypeId::STRING);
}

#[test]
fn test_unchanged_symbols_survive_update() {
    let mut host = host_from_source("class Keep {}\nvar changing = 1;");
    let keep = global_symbol(host.chain(), "Keep");

    host.update_unit(TEST_PATH, "class Keep {}\nvar changing = 'now a string';").unwrap();
    assert_eq!(global_symbol(host.chain(), "Keep"), keep);
    assert_eq!(host.chain().stats().incremental_binds, 1);
    assert_eq!(declared_type(&mut host, "changing"), TypeId::STRING);
}

#[test]
fn test_renamed_declaration_replaces_symbol() {
    let mut host = host_from_source("var before = 1;");
    host.update_unit(TEST_PATH, "var after = 1;").unwrap();
    let chain = host.chain();
    assert!(chain.symbols().member(chain.global(), "before").is_none());
    assert!(chain.symbols().member(chain.global(), "after").is_some());
}

#[test]
fn test_removed_unit_leaves_merged_symbol() {
    let mut host = host_from_sources(&[("a.ts", "module M { export var a; }"), ("b.ts", "module M { export var b; }")]);
    host.remove_unit("a.ts").unwrap();
    let chain = host.chain();
    let m = global_symbol(chain, "M");
    assert_eq!(chain.symbols().get(m).decls.len(), 1);
    assert!(chain.symbols().member(m, "a").is_none());
    assert!(chain.symbols().member(m, "b").is_some());
}

#[test]
fn test_reset_caches_keeps_answers() {
    let mut host = host_from_source("var n = 1 + 2;");
    assert_eq!(declared_type(&mut host, "n"), TypeId::NUMBER);
    let resets = host.chain().stats().type_cache_resets;
    host.reset_caches();
    assert_eq!(declared_type(&mut host, "n"), TypeId::NUMBER);
    assert_eq!(host.chain().stats().type_cache_resets, resets + 1);
}

// =============================================================================
// CANCELLATION
// =============================================================================

#[test]
fn test_cancelled_update_changes_nothing() {
    let source = "var kept = 1;\nvar x: Missing;";
    let mut host = host_from_source(source);
    let symbols_before = host.chain().symbols().len();
    let diagnostics_before = host.analysis().diagnostics(TEST_PATH).unwrap();
    assert_eq!(diagnostics_before.len(), 1);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = host.update_unit_cancellable(TEST_PATH, "var replaced = 'x';", &cancel);
    assert_eq!(result, Err(AnalysisError::Cancelled(Cancelled)));

    assert_eq!(host.text(TEST_PATH), Some(source));
    assert_eq!(host.chain().symbols().len(), symbols_before);
    let chain = host.chain();
    assert!(chain.symbols().member(chain.global(), "kept").is_some());
    assert!(chain.symbols().member(chain.global(), "replaced").is_none());
    assert_eq!(host.analysis().diagnostics(TEST_PATH).unwrap(), diagnostics_before);
    assert_eq!(host.chain().stats().cancelled, 1);
}

#[test]
fn test_cancelled_diagnostics_request() {
    let mut host = host_from_source("var x: Missing;");
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = host.analysis().diagnostics_cancellable(TEST_PATH, &cancel);
    assert_eq!(result, Err(AnalysisError::Cancelled(Cancelled)));
    assert_eq!(host.analysis().diagnostics(TEST_PATH).unwrap().len(), 1);
}
