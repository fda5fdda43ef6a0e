//! The parsed syntax tree and what travels with it.
//!
//! A [`SyntaxTree`] owns the immutable green root, the syntax errors produced
//! while building it, its provenance (path and [`ParseOptions`]) and the reuse
//! index the incremental parser consults on the next edit.

use std::sync::Arc;

use rowan::{GreenNode, NodeOrToken, TextRange, TextSize};

use super::SyntaxNode;
use super::syntax_kind::SyntaxKind;

/// A syntax error with location and message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyntaxError {
    pub message: String,
    pub range: TextRange,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }

    /// Rebase onto `by`, or `None` when the error starts before it.
    pub(crate) fn shifted_back(&self, by: TextSize) -> Option<Self> {
        Some(Self {
            message: self.message.clone(),
            range: self.range.checked_sub(by)?,
        })
    }

    pub(crate) fn shifted(&self, by: TextSize) -> Self {
        Self {
            message: self.message.clone(),
            range: self.range + by,
        }
    }
}

// ============================================================================
// Options
// ============================================================================

/// Language level the source is written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LanguageVersion {
    Es3,
    #[default]
    Es5,
}

/// Options that influence parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ParseOptions {
    pub language_version: LanguageVersion,
}

impl ParseOptions {
    pub fn es3() -> Self {
        Self {
            language_version: LanguageVersion::Es3,
        }
    }
}

// ============================================================================
// Reuse index
// ============================================================================

/// Parse functions whose results can be lifted into a later tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReuseCategory {
    /// Statements and module elements
    Statement,
    ClassElement,
    TypeMember,
}

/// A node some later parse may take over verbatim.
#[derive(Debug, Clone)]
pub struct ReusableNode {
    pub start: TextSize,
    pub category: ReuseCategory,
    pub green: GreenNode,
    /// Bytes the scanner looked at while this node was parsed, from `start`
    pub read_len: TextSize,
    /// Syntax errors raised inside the node, relative to `start`
    pub errors: Vec<SyntaxError>,
    /// Number of nodes in the subtree, itself included
    pub node_count: u32,
}

impl ReusableNode {
    pub fn len(&self) -> TextSize {
        self.green.text_len()
    }

    pub fn end(&self) -> TextSize {
        self.start + self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == TextSize::new(0)
    }
}

// ============================================================================
// Syntax tree
// ============================================================================

/// Parse result: green root plus errors, provenance and reuse index.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    green: GreenNode,
    errors: Vec<SyntaxError>,
    path: Arc<str>,
    options: ParseOptions,
    text: Arc<str>,
    reuse: Arc<[ReusableNode]>,
}

impl SyntaxTree {
    pub(crate) fn new(
        green: GreenNode,
        errors: Vec<SyntaxError>,
        path: Arc<str>,
        options: ParseOptions,
        text: Arc<str>,
        reuse: Vec<ReusableNode>,
    ) -> Self {
        Self {
            green,
            errors,
            path,
            options,
            text,
            reuse: reuse.into(),
        }
    }

    /// Get the root syntax node
    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.green.clone())
    }

    pub fn green(&self) -> &GreenNode {
        &self.green
    }

    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    /// Check if parsing succeeded without errors
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Source text the tree was parsed from
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn reuse_index(&self) -> &[ReusableNode] {
        &self.reuse
    }

    /// Same green structure and same diagnostics
    pub fn structurally_eq(&self, other: &SyntaxTree) -> bool {
        self.green == other.green && self.errors == other.errors
    }

    /// Number of nodes (not tokens) in the tree
    pub fn node_count(&self) -> usize {
        count_nodes(&self.green)
    }

    /// Concatenation of every leaf token's text
    pub fn full_text(&self) -> String {
        self.syntax().text().to_string()
    }

    /// Root of a copy of this tree with `target` replaced. Every node off the
    /// path from the root to `target` is shared with this tree.
    pub fn replace_node(&self, target: &SyntaxNode, replacement: GreenNode) -> GreenNode {
        target.replace_with(replacement)
    }
}

pub(crate) fn count_nodes(green: &rowan::GreenNodeData) -> usize {
    1 + green
        .children()
        .map(|child| match child {
            NodeOrToken::Node(node) => count_nodes(node),
            NodeOrToken::Token(_) => 0,
        })
        .sum::<usize>()
}

/// Whether a node kind lists its items between separators.
pub fn is_separated_list(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::PARAM_LIST
            | SyntaxKind::ARG_LIST
            | SyntaxKind::TYPE_ARG_LIST
            | SyntaxKind::TYPE_PARAM_LIST
            | SyntaxKind::ENUM_MEMBER_LIST
            | SyntaxKind::VARIABLE_DECL_LIST
            | SyntaxKind::HERITAGE_LIST
    )
}

/// Items of a separated list: `(non_trivia_children + 1) / 2`.
pub fn separated_item_count(list: &SyntaxNode) -> usize {
    let children = list
        .children_with_tokens()
        .filter(|child| !child.kind().is_trivia())
        .count();
    (children + 1) / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use rstest::rstest;

    fn nodes_of(root: &SyntaxNode, kind: SyntaxKind) -> Vec<SyntaxNode> {
        root.descendants().filter(|n| n.kind() == kind).collect()
    }

    #[test]
    fn test_replace_node_shares_untouched_children() {
        let tree = parse("var a = 1;\nvar b = 2;\n", "test.ts", &ParseOptions::default());
        let statements = nodes_of(&tree.syntax(), SyntaxKind::VARIABLE_STMT);
        let source = parse("var b = 3;\n", "test.ts", &ParseOptions::default());
        let replacement = nodes_of(&source.syntax(), SyntaxKind::VARIABLE_STMT)[0]
            .green()
            .into_owned();

        let root = SyntaxNode::new_root(tree.replace_node(&statements[1], replacement));
        assert_eq!(root.text().to_string(), "var a = 1;\nvar b = 3;\n");
        let replaced = nodes_of(&root, SyntaxKind::VARIABLE_STMT);
        assert!(std::ptr::eq(&*statements[0].green(), &*replaced[0].green()));
        assert!(!std::ptr::eq(&*statements[1].green(), &*replaced[1].green()));
        assert_eq!(tree.full_text(), "var a = 1;\nvar b = 2;\n");
    }

    #[rstest]
    #[case::params("function f(a, b: string, c?) {}", SyntaxKind::PARAM_LIST, 3)]
    #[case::no_params("function f() {}", SyntaxKind::PARAM_LIST, 0)]
    #[case::enum_trailing_comma("enum E { A, B = 2, }", SyntaxKind::ENUM_MEMBER_LIST, 2)]
    #[case::empty_enum("enum E { }", SyntaxKind::ENUM_MEMBER_LIST, 0)]
    fn test_separated_item_count(
        #[case] text: &str,
        #[case] kind: SyntaxKind,
        #[case] expected: usize,
    ) {
        let tree = parse(text, "test.ts", &ParseOptions::default());
        assert!(tree.ok(), "{:?}", tree.errors());
        let list = &nodes_of(&tree.syntax(), kind)[0];
        assert!(is_separated_list(list.kind()));
        assert_eq!(separated_item_count(list), expected);
    }

    #[test]
    fn test_error_before_base_does_not_rebase() {
        let error = SyntaxError::new("x", TextRange::new(2.into(), 4.into()));
        assert!(error.shifted_back(TextSize::new(3)).is_none());
        let rebased = error.shifted_back(TextSize::new(2));
        assert_eq!(rebased.map(|e| e.range), Some(TextRange::new(0.into(), 2.into())));
    }
}
