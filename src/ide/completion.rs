//! Completion suggestions implementation.

use std::sync::Arc;

use rowan::TextSize;

use crate::hir::{ResolutionContext, SemanticChain, SymbolKind, UnitId, is_expression};

/// Kind of completion item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompletionKind {
    Module,
    Class,
    Interface,
    Enum,
    EnumMember,
    Function,
    Method,
    Property,
    Variable,
    TypeParameter,
    Alias,
    /// Predefined type names
    Keyword,
}

impl CompletionKind {
    pub fn from_symbol_kind(kind: SymbolKind) -> Self {
        match kind {
            SymbolKind::Module | SymbolKind::Global => CompletionKind::Module,
            SymbolKind::Class => CompletionKind::Class,
            SymbolKind::Interface | SymbolKind::TypeAlias => CompletionKind::Interface,
            SymbolKind::Enum => CompletionKind::Enum,
            SymbolKind::EnumMember => CompletionKind::EnumMember,
            SymbolKind::Function | SymbolKind::FunctionExpression => CompletionKind::Function,
            SymbolKind::Method
            | SymbolKind::Constructor
            | SymbolKind::CallSignature
            | SymbolKind::ConstructSignature
            | SymbolKind::IndexSignature => CompletionKind::Method,
            SymbolKind::Property | SymbolKind::Accessor => CompletionKind::Property,
            SymbolKind::Variable | SymbolKind::Parameter => CompletionKind::Variable,
            SymbolKind::TypeParameter => CompletionKind::TypeParameter,
            SymbolKind::ImportAlias => CompletionKind::Alias,
            SymbolKind::Primitive => CompletionKind::Keyword,
        }
    }

    /// Convert to LSP completion item kind number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            CompletionKind::Method => 2,
            CompletionKind::Function => 3,
            CompletionKind::Variable => 6,
            CompletionKind::Class => 7,
            CompletionKind::Interface => 8,
            CompletionKind::Module | CompletionKind::Alias => 9,
            CompletionKind::Property => 10,
            CompletionKind::Enum => 13,
            CompletionKind::Keyword => 14,
            CompletionKind::EnumMember => 20,
            CompletionKind::TypeParameter => 25,
        }
    }
}

/// A completion suggestion.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionItem {
    /// The text to insert.
    pub label: Arc<str>,
    pub kind: CompletionKind,
    /// The candidate's type, as it would be written in source.
    pub detail: Option<Arc<str>>,
    /// Sort priority (lower = higher priority).
    pub sort_priority: u32,
}

impl CompletionItem {
    pub fn new(label: impl Into<Arc<str>>, kind: CompletionKind) -> Self {
        Self {
            label: label.into(),
            kind,
            detail: None,
            sort_priority: 100,
        }
    }

    /// Set the detail text.
    pub fn with_detail(mut self, detail: impl Into<Arc<str>>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the sort priority.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.sort_priority = priority;
        self
    }
}

/// Get completion suggestions at a position.
///
/// With `is_member_access` the candidates are the members of the expression
/// that ends before the dot preceding `offset`; otherwise they are the names
/// visible at `offset`, innermost first.
pub fn completions(
    chain: &mut SemanticChain,
    unit: UnitId,
    offset: TextSize,
    is_member_access: bool,
) -> Vec<CompletionItem> {
    let mut items = if is_member_access {
        member_completions(chain, unit, offset)
    } else {
        scope_completions(chain, unit, offset)
    };
    items.sort_by(|a, b| a.sort_priority.cmp(&b.sort_priority).then_with(|| a.label.cmp(&b.label)));
    items
}

fn is_ident_char(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphanumeric()
}

/// End offset of the expression whose members are being completed
fn member_object_end(text: &str, offset: usize) -> Option<usize> {
    let head = text.get(..offset)?;
    let word_start = head
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_ident_char(*c))
        .last()
        .map_or(offset, |(i, _)| i);
    let before = head[..word_start].trim_end();
    let dot = before.strip_suffix('.')?;
    Some(dot.trim_end().len())
}

fn member_completions(chain: &mut SemanticChain, unit: UnitId, offset: TextSize) -> Vec<CompletionItem> {
    let Some(u) = chain.unit(unit) else {
        return Vec::new();
    };
    let Some(ast) = u.ast().cloned() else {
        return Vec::new();
    };
    let Some(end) = member_object_end(u.tree().text(), usize::from(offset)) else {
        return Vec::new();
    };
    let end = TextSize::from(end as u32);
    let Some(object) = ast
        .path_to_offset(end)
        .into_iter()
        .rev()
        .find(|&n| is_expression(ast.kind(n)) && ast.range(n).end() == end)
    else {
        return Vec::new();
    };

    let mut resolver = chain.resolver();
    let object_ty = resolver.type_of_expr(unit, object, &ResolutionContext::values().aggressive());
    let members = resolver.members_of(object_ty);
    members
        .into_iter()
        .filter(|m| m.kind != SymbolKind::Constructor)
        .map(|m| {
            CompletionItem::new(m.name.as_str(), CompletionKind::from_symbol_kind(m.kind))
                .with_detail(resolver.display_type(m.ty))
        })
        .collect()
}

fn scope_completions(chain: &mut SemanticChain, unit: UnitId, offset: TextSize) -> Vec<CompletionItem> {
    let Some(ast) = chain.unit(unit).and_then(|u| u.ast().cloned()) else {
        return Vec::new();
    };
    let at = ast.path_to_offset(offset).last().copied().unwrap_or(ast.root());
    let ctx = ResolutionContext::values().aggressive();
    let mut resolver = chain.resolver();
    let visible = resolver.visible_symbols(unit, at);
    let symbols = resolver.symbols();
    visible
        .into_iter()
        .enumerate()
        .filter(|&(_, s)| {
            let target = symbols.get(s);
            !target.tombstoned
                && !target.name.is_empty()
                && !matches!(
                    target.kind,
                    SymbolKind::Constructor | SymbolKind::Global | SymbolKind::CallSignature | SymbolKind::ConstructSignature
                )
        })
        .map(|(depth, s)| {
            let target = symbols.get(s);
            let kind = CompletionKind::from_symbol_kind(target.kind);
            let mut item = CompletionItem::new(target.name.as_str(), kind);
            if kind == CompletionKind::Keyword {
                item = item.with_priority(200);
            } else {
                let ty = resolver.resolve_declared_symbol(s, &ctx);
                item = item.with_detail(resolver.display_type(ty)).with_priority(depth as u32);
            }
            item
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParseOptions, parse};
    use rstest::rstest;
    use tokio_util::sync::CancellationToken;

    fn chain_with(text: &str) -> (SemanticChain, UnitId) {
        let mut chain = SemanticChain::default();
        let tree = parse(text, "a.ts", &ParseOptions::default());
        let unit = chain.add_unit("a.ts", tree, &CancellationToken::new()).unwrap();
        (chain, unit)
    }

    fn labels(items: &[CompletionItem]) -> Vec<&str> {
        items.iter().map(|i| i.label.as_ref()).collect()
    }

    #[rstest]
    #[case("a.", 2, Some(1))]
    #[case("a.b", 3, Some(1))]
    #[case("a . b", 5, Some(1))]
    #[case("a b", 3, None)]
    #[case("", 0, None)]
    fn test_member_object_end(#[case] text: &str, #[case] offset: usize, #[case] expected: Option<usize>) {
        assert_eq!(member_object_end(text, offset), expected);
    }

    #[test]
    fn test_member_completions_of_class_instance() {
        let text = "class P { x: number; static origin: P; move() {} }\nvar p = new P();\np.x;";
        let (mut chain, unit) = chain_with(text);
        let offset = TextSize::from(text.rfind('x').unwrap() as u32);
        let items = completions(&mut chain, unit, offset, true);
        assert_eq!(labels(&items), vec!["move", "x"]);
        let x = items.iter().find(|i| i.label.as_ref() == "x").unwrap();
        assert_eq!(x.detail.as_deref(), Some("number"));
        assert_eq!(x.kind, CompletionKind::Property);
    }

    #[test]
    fn test_member_completions_of_module() {
        let text = "module M { export var a = 1; var hidden; }\nM.a;";
        let (mut chain, unit) = chain_with(text);
        let offset = TextSize::from(text.rfind('a').unwrap() as u32);
        let items = completions(&mut chain, unit, offset, true);
        assert_eq!(labels(&items), vec!["a"]);
    }

    #[test]
    fn test_scope_completions_prefer_inner_names() {
        let text = "var outer = 1;\nfunction f(inner: string) { return inner; }";
        let (mut chain, unit) = chain_with(text);
        let offset = TextSize::from(text.rfind("inner").unwrap() as u32);
        let items = completions(&mut chain, unit, offset, false);
        let names = labels(&items);
        assert_eq!(names.first(), Some(&"inner"));
        assert!(names.contains(&"outer"));
        assert!(names.contains(&"f"));
        assert!(names.contains(&"number"));
        assert_eq!(items[0].detail.as_deref(), Some("string"));
    }
}
