//! Symbol listing for workspace and document views.

use std::sync::Arc;

use rowan::TextRange;

use crate::hir::{DeclForest, DeclId, DeclKind, GLOBAL_UNIT_PATH, SemanticChain, UnitId};

/// A symbol for the workspace symbol list or document outline.
#[derive(Clone, Debug, PartialEq)]
pub struct SymbolInfo {
    pub name: Arc<str>,
    /// Dotted path through the enclosing named declarations.
    pub qualified_name: Arc<str>,
    pub kind: DeclKind,
    pub unit: UnitId,
    /// Range of the whole declaration.
    pub range: TextRange,
    /// Range of the name.
    pub selection_range: TextRange,
}

impl SymbolInfo {
    /// Get the container name (parent path) for hierarchy building.
    pub fn container_name(&self) -> Option<&str> {
        let qname = self.qualified_name.as_ref();
        qname.rfind('.').map(|idx| &qname[..idx])
    }
}

/// Declarations worth showing in an outline
fn is_outlined(kind: DeclKind) -> bool {
    !matches!(
        kind,
        DeclKind::Script
            | DeclKind::Parameter
            | DeclKind::TypeParameter
            | DeclKind::CatchVariable
            | DeclKind::FunctionExpression
            | DeclKind::CallSignature
            | DeclKind::ConstructSignature
            | DeclKind::IndexSignature
    )
}

fn qualified_name(forest: &DeclForest, id: DeclId) -> String {
    let mut parts = Vec::new();
    let mut current = Some(id);
    while let Some(decl) = current.map(|c| forest.get(c)) {
        if decl.kind == DeclKind::Script {
            break;
        }
        parts.push(decl.name.as_str());
        current = decl.parent;
    }
    parts.reverse();
    parts.join(".")
}

/// Outline of one unit, in source order.
pub fn document_symbols(chain: &SemanticChain, unit: UnitId) -> Vec<SymbolInfo> {
    let Some(forest) = chain.unit(unit).map(|u| u.decls()) else {
        return Vec::new();
    };
    forest
        .preorder()
        .into_iter()
        .filter(|&id| {
            let decl = forest.get(id);
            is_outlined(decl.kind)
                && !decl.name.is_empty()
                // Locals of functions are not part of the outline
                && !decl
                    .parent
                    .is_some_and(|p| forest.get(p).kind.is_function_like())
        })
        .map(|id| {
            let decl = forest.get(id);
            SymbolInfo {
                name: Arc::from(decl.name.as_str()),
                qualified_name: Arc::from(qualified_name(forest, id)),
                kind: decl.kind,
                unit,
                range: decl.span,
                selection_range: decl.name_span,
            }
        })
        .collect()
}

/// Get all symbols in the session, optionally filtered by a query.
///
/// The query is a case-insensitive substring match on the qualified name.
/// Results are sorted by name.
pub fn workspace_symbols(chain: &SemanticChain, query: Option<&str>) -> Vec<SymbolInfo> {
    let query_lower = query.map(|q| q.to_lowercase());
    let mut results: Vec<SymbolInfo> = chain
        .units()
        .filter(|(_, unit)| unit.path() != GLOBAL_UNIT_PATH)
        .flat_map(|(id, _)| document_symbols(chain, id))
        .filter(|sym| match &query_lower {
            Some(q) => sym.qualified_name.to_lowercase().contains(q.as_str()),
            None => true,
        })
        .collect();
    results.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.qualified_name.cmp(&b.qualified_name)));
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParseOptions, parse};
    use tokio_util::sync::CancellationToken;

    fn chain_with(files: &[(&str, &str)]) -> SemanticChain {
        let mut chain = SemanticChain::default();
        for (path, text) in files {
            let tree = parse(text, path, &ParseOptions::default());
            chain.add_unit(path, tree, &CancellationToken::new()).unwrap();
        }
        chain
    }

    #[test]
    fn test_document_outline() {
        let chain = chain_with(&[(
            "a.ts",
            "module Shapes { export class Point { x: number; move(dx) { var t = dx; } } }",
        )]);
        let unit = chain.unit_id("a.ts").unwrap();
        let outline: Vec<_> = document_symbols(&chain, unit)
            .into_iter()
            .map(|s| (s.kind, s.qualified_name.to_string()))
            .collect();
        assert_eq!(
            outline,
            vec![
                (DeclKind::Module, "Shapes".to_string()),
                (DeclKind::Class, "Shapes.Point".to_string()),
                (DeclKind::Property, "Shapes.Point.x".to_string()),
                (DeclKind::Method, "Shapes.Point.move".to_string()),
            ]
        );
    }

    #[test]
    fn test_workspace_symbols_query() {
        let chain = chain_with(&[("a.ts", "class Alpha {}"), ("b.ts", "class Beta {}\nvar alphabet;")]);
        let names: Vec<_> = workspace_symbols(&chain, Some("ALPHA"))
            .into_iter()
            .map(|s| s.name.to_string())
            .collect();
        assert_eq!(names, vec!["Alpha", "alphabet"]);
        assert_eq!(workspace_symbols(&chain, None).len(), 3);
    }

    #[test]
    fn test_container_name() {
        let chain = chain_with(&[("a.ts", "module A { export module B { export var c; } }")]);
        let unit = chain.unit_id("a.ts").unwrap();
        let symbols = document_symbols(&chain, unit);
        let c = symbols.iter().find(|s| s.name.as_ref() == "c").unwrap();
        assert_eq!(c.container_name(), Some("A.B"));
    }
}
