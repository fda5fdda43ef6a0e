//! Go-to-definition implementation.

use std::sync::Arc;

use rowan::{TextRange, TextSize};
use smol_str::SmolStr;

use crate::hir::{SemanticChain, SymbolId, SymbolKind, UnitId};

/// Result of a go-to-definition request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GotoResult {
    /// The targets to jump to.
    pub targets: Vec<GotoTarget>,
}

impl GotoResult {
    /// Create an empty result (no targets found).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn multiple(targets: Vec<GotoTarget>) -> Self {
        Self { targets }
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// One declaration of the symbol at the cursor.
#[derive(Clone, Debug, PartialEq)]
pub struct GotoTarget {
    pub unit: UnitId,
    pub path: Arc<str>,
    /// Range of the declared name.
    pub name_range: TextRange,
    /// Range of the whole declaration.
    pub full_range: TextRange,
    pub kind: SymbolKind,
    pub name: SmolStr,
}

/// Every declaration of the symbol at `offset`, in declaration order.
///
/// Symbols without a source declaration (primitives, the global scope)
/// produce an empty result.
pub fn goto_definition(chain: &mut SemanticChain, unit: UnitId, offset: TextSize) -> GotoResult {
    let Some(symbol) = chain.resolver().resolve_position(unit, offset).and_then(|p| p.symbol) else {
        return GotoResult::empty();
    };
    GotoResult::multiple(targets_of(chain, symbol))
}

pub(crate) fn targets_of(chain: &SemanticChain, symbol: SymbolId) -> Vec<GotoTarget> {
    let target = chain.symbols().get(symbol);
    target
        .decls
        .iter()
        .filter_map(|decl| {
            let unit = chain.unit(decl.unit)?;
            let declaration = (decl.decl.index() < unit.decls().len()).then(|| unit.decls().get(decl.decl))?;
            Some(GotoTarget {
                unit: decl.unit,
                path: Arc::from(unit.path()),
                name_range: declaration.name_span,
                full_range: declaration.span,
                kind: target.kind,
                name: target.name.clone(),
            })
        })
        .collect()
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
    fn test_goto_local_variable() {
        let mut chain = chain_with(&[("a.ts", "var value = 1;\nvar copy = value;")]);
        let unit = chain.unit_id("a.ts").unwrap();
        let result = goto_definition(&mut chain, unit, TextSize::new(27));
        assert_eq!(result.targets.len(), 1);
        assert_eq!(result.targets[0].name, "value");
        assert_eq!(result.targets[0].name_range, TextRange::new(4.into(), 9.into()));
    }

    #[test]
    fn test_goto_merged_module_lists_every_declaration() {
        let mut chain = chain_with(&[
            ("a.ts", "module M { export var a; }"),
            ("b.ts", "module M { export var b; }\nvar x = M.a;"),
        ]);
        let unit = chain.unit_id("b.ts").unwrap();
        let result = goto_definition(&mut chain, unit, TextSize::new(35));
        let paths: Vec<_> = result.targets.iter().map(|t| t.path.to_string()).collect();
        assert_eq!(paths, vec!["a.ts", "b.ts"]);
    }

    #[test]
    fn test_goto_primitive_is_empty() {
        let mut chain = chain_with(&[("a.ts", "var n: number;")]);
        let unit = chain.unit_id("a.ts").unwrap();
        assert!(goto_definition(&mut chain, unit, TextSize::new(8)).is_empty());
    }
}
