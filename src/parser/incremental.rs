//! Incremental reparsing
//!
//! An edit replaces one contiguous span of the old text. The new text is
//! parsed from scratch, except that whenever the parser reaches a statement,
//! class element or type member boundary, it asks the [`SyntaxCursor`]
//! whether the old tree had a node of that category at the corresponding
//! position which the edit cannot have affected. Such a node is spliced in
//! whole, green node and nested reuse entries included.
//!
//! A node is unaffected when everything the scanner examined while parsing
//! it lies entirely before the edit, or entirely after it. The scanner's
//! read extent covers lookahead, so a node whose last token could merge with
//! inserted text is never reused.

use std::sync::Arc;

use rowan::TextSize;
use thiserror::Error;
use tracing::{debug, trace};

use super::parser::parse_with_cursor;
use super::tree::{ReusableNode, ReuseCategory, SyntaxTree};

/// One contiguous replacement in a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub start: TextSize,
    pub old_len: TextSize,
    pub new_text: String,
}

/// Signals an edit the incremental parser cannot isolate; callers fall back
/// to a full parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsupportedEdit {
    #[error("edit {start}..{end} is outside of a text of length {len}")]
    OutOfBounds { start: u32, end: u32, len: u32 },

    #[error("edit boundary {offset} is not on a character boundary")]
    NotCharBoundary { offset: u32 },

    #[error("new text is not the old text with the edit applied")]
    TextMismatch,
}

impl TextEdit {
    pub fn new(start: TextSize, old_len: TextSize, new_text: impl Into<String>) -> Self {
        Self {
            start,
            old_len,
            new_text: new_text.into(),
        }
    }

    pub fn insert(offset: TextSize, text: impl Into<String>) -> Self {
        Self::new(offset, TextSize::new(0), text)
    }

    pub fn delete(start: TextSize, len: TextSize) -> Self {
        Self::new(start, len, String::new())
    }

    pub fn old_end(&self) -> TextSize {
        self.start + self.old_len
    }

    pub fn new_len(&self) -> TextSize {
        TextSize::of(self.new_text.as_str())
    }

    pub fn new_end(&self) -> TextSize {
        self.start + self.new_len()
    }

    fn check(&self, text: &str) -> Result<(), UnsupportedEdit> {
        let len = TextSize::of(text);
        if self.old_end() > len {
            return Err(UnsupportedEdit::OutOfBounds {
                start: self.start.into(),
                end: self.old_end().into(),
                len: len.into(),
            });
        }
        for offset in [self.start, self.old_end()] {
            if !text.is_char_boundary(usize::from(offset)) {
                return Err(UnsupportedEdit::NotCharBoundary {
                    offset: offset.into(),
                });
            }
        }
        Ok(())
    }

    /// `text` with the edit applied.
    pub fn apply(&self, text: &str) -> Result<String, UnsupportedEdit> {
        self.check(text)?;
        let start = usize::from(self.start);
        let end = usize::from(self.old_end());
        let mut out = String::with_capacity(text.len() - (end - start) + self.new_text.len());
        out.push_str(&text[..start]);
        out.push_str(&self.new_text);
        out.push_str(&text[end..]);
        Ok(out)
    }

    /// The single edit that turns `old` into `new`: the span between their
    /// common prefix and common suffix.
    pub fn from_diff(old: &str, new: &str) -> Self {
        let prefix = old
            .char_indices()
            .zip(new.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map(|((i, c), _)| i + c.len_utf8())
            .unwrap_or(0);
        let max_suffix = (old.len() - prefix).min(new.len() - prefix);
        let suffix = old[prefix..]
            .chars()
            .rev()
            .zip(new[prefix..].chars().rev())
            .take_while(|(a, b)| a == b)
            .map(|(c, _)| c.len_utf8())
            .scan(0usize, |total, len| {
                *total += len;
                Some(*total)
            })
            .take_while(|total| *total <= max_suffix)
            .last()
            .unwrap_or(0);
        let old_end = old.len() - suffix;
        let new_end = new.len() - suffix;
        Self {
            start: TextSize::new(prefix as u32),
            old_len: TextSize::new((old_end - prefix) as u32),
            new_text: new[prefix..new_end].to_string(),
        }
    }
}

// ============================================================================
// Cursor
// ============================================================================

/// Walks the old tree's reuse index in step with the new parse.
pub(crate) struct SyntaxCursor<'o> {
    entries: &'o [ReusableNode],
    next: usize,
    edit_start: TextSize,
    old_end: TextSize,
    new_end: TextSize,
}

impl<'o> SyntaxCursor<'o> {
    pub(crate) fn new(old: &'o SyntaxTree, edit: &TextEdit) -> Self {
        Self {
            entries: old.reuse_index(),
            next: 0,
            edit_start: edit.start,
            old_end: edit.old_end(),
            new_end: edit.new_end(),
        }
    }

    pub(crate) fn entries(&self) -> &'o [ReusableNode] {
        self.entries
    }

    /// Map a position in the new text to the old text, if it lies outside
    /// the edited span.
    fn old_position(&self, new_pos: TextSize) -> Option<TextSize> {
        if new_pos < self.edit_start {
            Some(new_pos)
        } else if new_pos >= self.new_end {
            Some(new_pos - self.new_end + self.old_end)
        } else {
            None
        }
    }

    fn unaffected(&self, entry: &ReusableNode) -> bool {
        if entry.start < self.edit_start {
            entry.start + entry.read_len <= self.edit_start
        } else {
            entry.start >= self.old_end
        }
    }

    /// Index of the outermost reusable node of `category` starting at
    /// `new_pos`. Positions passed in never decrease.
    pub(crate) fn candidate(&mut self, new_pos: TextSize, category: ReuseCategory) -> Option<usize> {
        let old_pos = self.old_position(new_pos)?;
        while self.next < self.entries.len() && self.entries[self.next].start < old_pos {
            self.next += 1;
        }
        let found = self.entries[self.next..]
            .iter()
            .take_while(|entry| entry.start == old_pos)
            .position(|entry| entry.category == category && self.unaffected(entry))
            .map(|offset| self.next + offset);
        if found.is_some() {
            trace!(old = u32::from(old_pos), new = u32::from(new_pos), ?category, "reusing node");
        }
        found
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// Counters from one incremental parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncrementalStats {
    /// Subtrees spliced in from the old tree
    pub reused_subtrees: u32,
    /// Nodes inside those subtrees
    pub reused_nodes: u32,
    /// Nodes in the new tree
    pub total_nodes: u32,
}

impl IncrementalStats {
    /// Fraction of the new tree's nodes taken over from the old tree.
    pub fn reuse_rate(&self) -> f64 {
        if self.total_nodes == 0 {
            0.0
        } else {
            f64::from(self.reused_nodes) / f64::from(self.total_nodes)
        }
    }
}

/// A new tree together with how much of the old one it shares.
#[derive(Debug, Clone)]
pub struct IncrementalParse {
    pub tree: SyntaxTree,
    pub stats: IncrementalStats,
}

/// Reparse `new_text`, which must be the text of `old` with `edit` applied,
/// reusing unaffected subtrees of `old`.
pub fn incremental_parse(
    old: &SyntaxTree,
    edit: &TextEdit,
    new_text: &str,
) -> Result<IncrementalParse, UnsupportedEdit> {
    let old_text = old.text();
    edit.check(old_text)?;
    let start = usize::from(edit.start);
    let old_end = usize::from(edit.old_end());
    let new_end = usize::from(edit.new_end());
    let consistent = new_text.len() == old_text.len() - (old_end - start) + edit.new_text.len()
        && new_text.get(..start) == old_text.get(..start)
        && new_text.get(start..new_end) == Some(edit.new_text.as_str())
        && new_text.get(new_end..) == old_text.get(old_end..);
    if !consistent {
        return Err(UnsupportedEdit::TextMismatch);
    }

    let cursor = SyntaxCursor::new(old, edit);
    let output = parse_with_cursor(new_text, old.options(), Some(cursor));
    let stats = IncrementalStats {
        reused_subtrees: output.stats.reused_subtrees,
        reused_nodes: output.stats.reused_nodes,
        total_nodes: output.stats.total_nodes,
    };
    debug!(
        path = old.path(),
        reused_subtrees = stats.reused_subtrees,
        reuse_rate = stats.reuse_rate(),
        "incremental parse"
    );

    let tree = SyntaxTree::new(
        output.green,
        output.errors,
        Arc::from(old.path()),
        old.options().clone(),
        Arc::from(new_text),
        output.reuse,
    );
    Ok(IncrementalParse { tree, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParseOptions, SyntaxKind, parse};

    fn reparse(old_text: &str, edit: TextEdit) -> (SyntaxTree, IncrementalParse) {
        let old = parse(old_text, "test.ts", &ParseOptions::default());
        let new_text = edit.apply(old_text).unwrap();
        let incremental = incremental_parse(&old, &edit, &new_text).unwrap();
        let fresh = parse(&new_text, "test.ts", &ParseOptions::default());
        (fresh, incremental)
    }

    #[test]
    fn test_from_diff_finds_changed_span() {
        let edit = TextEdit::from_diff("var x = 1;", "var x = 22;");
        assert_eq!(edit.start, TextSize::new(8));
        assert_eq!(edit.old_len, TextSize::new(1));
        assert_eq!(edit.new_text, "22");
    }

    #[test]
    fn test_from_diff_repeated_characters() {
        let edit = TextEdit::from_diff("aaa", "aaaa");
        assert_eq!(edit.apply("aaa").unwrap(), "aaaa");
        assert_eq!(edit.old_len, TextSize::new(0));
    }

    #[test]
    fn test_from_diff_identical() {
        let edit = TextEdit::from_diff("same", "same");
        assert_eq!(edit.old_len, TextSize::new(0));
        assert!(edit.new_text.is_empty());
    }

    #[test]
    fn test_apply_rejects_out_of_bounds() {
        let edit = TextEdit::new(TextSize::new(5), TextSize::new(10), "x");
        assert!(matches!(
            edit.apply("short"),
            Err(UnsupportedEdit::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_mismatched_text_is_unsupported() {
        let old = parse("var x = 1;", "test.ts", &ParseOptions::default());
        let edit = TextEdit::new(TextSize::new(8), TextSize::new(1), "2");
        let result = incremental_parse(&old, &edit, "var y = 2;");
        assert_eq!(result.unwrap_err(), UnsupportedEdit::TextMismatch);
    }

    #[test]
    fn test_single_literal_edit_matches_full_parse() {
        let (fresh, incremental) =
            reparse("var x = 1;", TextEdit::new(TextSize::new(8), TextSize::new(1), "2"));
        assert!(incremental.tree.structurally_eq(&fresh));
        assert_eq!(incremental.tree.full_text(), "var x = 2;");
    }

    #[test]
    fn test_statements_before_and_after_edit_are_reused() {
        let text = "var a = 1;\nvar b = 2;\nvar c = 3;\n";
        let (fresh, incremental) =
            reparse(text, TextEdit::new(TextSize::new(19), TextSize::new(1), "5"));
        assert!(incremental.tree.structurally_eq(&fresh));
        assert_eq!(incremental.stats.reused_subtrees, 2);
    }

    #[test]
    fn test_consecutive_reused_statements_parse_cleanly() {
        let text = "var a = 1;\nvar b = 2;\nvar c = 3;\n";
        let (fresh, incremental) =
            reparse(text, TextEdit::new(TextSize::new(30), TextSize::new(1), "7"));
        assert!(incremental.tree.structurally_eq(&fresh));
        assert!(incremental.tree.errors().is_empty());
        assert!(incremental.stats.reused_subtrees >= 2);
        let has_error_node = incremental
            .tree
            .syntax()
            .descendants()
            .any(|n| n.kind() == SyntaxKind::ERROR);
        assert!(!has_error_node);
    }

    #[test]
    fn test_edit_that_merges_tokens_is_not_reused_across() {
        // `a` followed by inserted `b` becomes one identifier
        let text = "var a\nvar c = 1;\n";
        let (fresh, incremental) = reparse(text, TextEdit::insert(TextSize::new(5), "b"));
        assert!(incremental.tree.structurally_eq(&fresh));
    }

    #[test]
    fn test_reuse_rate() {
        let stats = IncrementalStats {
            reused_subtrees: 1,
            reused_nodes: 8,
            total_nodes: 10,
        };
        assert!((stats.reuse_rate() - 0.8).abs() < 1e-9);
        assert_eq!(IncrementalStats::default().reuse_rate(), 0.0);
    }
}
