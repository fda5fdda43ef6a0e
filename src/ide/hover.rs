//! Hover information implementation.

use rowan::{TextRange, TextSize};

use crate::hir::{ResolutionContext, SemanticChain, SymbolId, SymbolKind, TypeId, UnitId};

/// Result of a hover request.
#[derive(Clone, Debug, PartialEq)]
pub struct HoverResult {
    /// The hover content (markdown).
    pub contents: String,
    /// Range of the hovered node.
    pub range: TextRange,
    pub symbol: Option<SymbolId>,
    /// The cursor is on the name of one of the symbol's declarations.
    pub is_definition: bool,
}

/// One-line description of a symbol, in source syntax
fn describe(kind: SymbolKind, qualified: &str, ty: &str) -> String {
    match kind {
        SymbolKind::Module => format!("module {}", qualified),
        SymbolKind::Class => format!("class {}", qualified),
        SymbolKind::Interface => format!("interface {}", qualified),
        SymbolKind::Enum => format!("enum {}", qualified),
        SymbolKind::TypeAlias => format!("type {} = {}", qualified, ty),
        SymbolKind::TypeParameter => format!("(type parameter) {}", qualified),
        SymbolKind::Primitive => qualified.to_string(),
        SymbolKind::ImportAlias => format!("import {}", qualified),
        _ => format!("({}) {}: {}", kind.as_str(), qualified, ty),
    }
}

/// Describe whatever is at `offset`: the symbol it names and its type, or
/// just the type of an expression that names nothing.
pub fn hover(chain: &mut SemanticChain, unit: UnitId, offset: TextSize) -> Option<HoverResult> {
    let ast = chain.unit(unit)?.ast()?.clone();
    let mut resolver = chain.resolver();
    let position = resolver.resolve_position(unit, offset)?;
    let node = position.ast?;
    if node == ast.root() {
        return None;
    }

    let (line, is_definition) = match position.symbol {
        Some(symbol) => {
            let target = resolver.symbols().get(symbol);
            let ty = resolver.resolve_declared_symbol(symbol, &ResolutionContext::values().aggressive());
            let ty = if ty.is_unresolved() { position.ty } else { ty };
            let qualified = resolver.symbols().qualified_name(symbol);
            let line = describe(target.kind, &qualified, &resolver.display_type(ty));
            let range = ast.range(node);
            let is_definition = target.decls.iter().any(|decl| {
                decl.unit == unit && resolver.decl_name_range(*decl).is_some_and(|name| name == range)
            });
            (line, is_definition)
        }
        None if position.ty != TypeId::UNRESOLVED => (resolver.display_type(position.ty), false),
        None => return None,
    };

    Some(HoverResult {
        contents: format!("```typescript\n{}\n```", line),
        range: ast.range(node),
        symbol: position.symbol,
        is_definition,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParseOptions, parse};
    use tokio_util::sync::CancellationToken;

    fn hover_at(text: &str, needle: &str) -> Option<HoverResult> {
        let mut chain = SemanticChain::default();
        let tree = parse(text, "a.ts", &ParseOptions::default());
        let unit = chain.add_unit("a.ts", tree, &CancellationToken::new()).unwrap();
        let offset = TextSize::from(text.rfind(needle).unwrap() as u32);
        hover(&mut chain, unit, offset)
    }

    #[test]
    fn test_hover_variable_definition() {
        let result = hover_at("var count = 1;", "count").unwrap();
        assert_eq!(result.contents, "```typescript\n(var) count: number\n```");
        assert!(result.is_definition);
    }

    #[test]
    fn test_hover_function_use() {
        let result = hover_at("function twice(n: number) { return n * 2; }\ntwice(1);", "twice").unwrap();
        assert_eq!(result.contents, "```typescript\n(function) twice: (n: number) => number\n```");
        assert!(!result.is_definition);
    }

    #[test]
    fn test_hover_module_member_is_qualified() {
        let result = hover_at("module A { export class B {} }\nvar b: A.B;", "B").unwrap();
        assert_eq!(result.contents, "```typescript\nclass A.B\n```");
    }

    #[test]
    fn test_hover_literal_shows_type() {
        let result = hover_at("var s = 'text';", "'text'").unwrap();
        assert_eq!(result.contents, "```typescript\nstring\n```");
        assert_eq!(result.symbol, None);
    }
}
