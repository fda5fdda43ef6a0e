//! Declaration differencing between two versions of one unit.
//!
//! Declarations are matched by key. A matched pair is `Modified` when the
//! AST the declaration owns (its own subtree minus nested declarations)
//! changed shape, names or literal values; ranges are not compared, so text
//! that only moved is `Unchanged`.

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHasher};
use tracing::debug;

use super::decls::{DeclForest, DeclId};
use crate::syntax::{Ast, AstId, AstKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclChange {
    Unchanged { old: DeclId, new: DeclId },
    Added(DeclId),
    Removed(DeclId),
    Modified { old: DeclId, new: DeclId },
}

/// Classification of every declaration of the old and new forest. The root
/// script is never listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclDiff {
    pub changes: Vec<DeclChange>,
    matched: FxHashMap<DeclId, DeclId>,
}

impl DeclDiff {
    /// Old declaration matched by key to `new`
    pub fn old_for(&self, new: DeclId) -> Option<DeclId> {
        self.matched.get(&new).copied()
    }

    pub fn added(&self) -> impl Iterator<Item = DeclId> + '_ {
        self.changes.iter().filter_map(|c| match c {
            DeclChange::Added(id) => Some(*id),
            _ => None,
        })
    }

    pub fn removed(&self) -> impl Iterator<Item = DeclId> + '_ {
        self.changes.iter().filter_map(|c| match c {
            DeclChange::Removed(id) => Some(*id),
            _ => None,
        })
    }

    pub fn modified(&self) -> impl Iterator<Item = (DeclId, DeclId)> + '_ {
        self.changes.iter().filter_map(|c| match c {
            DeclChange::Modified { old, new } => Some((*old, *new)),
            _ => None,
        })
    }

    /// Nothing was added, removed or modified
    pub fn is_empty(&self) -> bool {
        self.changes
            .iter()
            .all(|c| matches!(c, DeclChange::Unchanged { .. }))
    }
}

/// Compare the declarations of two versions of a unit.
pub fn diff_forests(old_ast: &Ast, old: &DeclForest, new_ast: &Ast, new: &DeclForest) -> DeclDiff {
    let mut diff = DeclDiff::default();
    let old_root = old.root();
    let new_root = new.root();

    for id in new.preorder() {
        if Some(id) == new_root {
            continue;
        }
        let decl = new.get(id);
        match old.decl_by_key(&decl.key) {
            Some(old_id) if Some(old_id) != old_root => {
                diff.matched.insert(id, old_id);
                let before = fingerprint(old_ast, old, old.get(old_id).ast);
                let after = fingerprint(new_ast, new, decl.ast);
                diff.changes.push(if before == after {
                    DeclChange::Unchanged { old: old_id, new: id }
                } else {
                    DeclChange::Modified { old: old_id, new: id }
                });
            }
            _ => diff.changes.push(DeclChange::Added(id)),
        }
    }
    for id in old.preorder() {
        if Some(id) == old_root {
            continue;
        }
        if new.decl_by_key(&old.get(id).key).is_none() {
            diff.changes.push(DeclChange::Removed(id));
        }
    }

    debug!(
        path = new_ast.path(),
        added = diff.added().count(),
        removed = diff.removed().count(),
        modified = diff.modified().count(),
        "diffed declarations"
    );
    diff
}

/// Hash of the AST a declaration owns, skipping nested declarations.
fn fingerprint(ast: &Ast, forest: &DeclForest, root: AstId) -> u64 {
    let mut hasher = FxHasher::default();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if id != root && forest.decl_for_ast(id).is_some() {
            // Stand-in so moving a nested declaration still counts
            0xdec1u16.hash(&mut hasher);
            continue;
        }
        let kind = ast.kind(id);
        std::mem::discriminant(kind).hash(&mut hasher);
        ast.flags(id).bits().hash(&mut hasher);
        match kind {
            AstKind::Identifier(text) | AstKind::StringLiteral(text) | AstKind::RegexLiteral(text) => {
                text.hash(&mut hasher)
            }
            AstKind::NumberLiteral(value) => value.to_bits().hash(&mut hasher),
            AstKind::EnumMember { constant, .. } => constant.map(f64::to_bits).hash(&mut hasher),
            AstKind::Unary { op, .. } => op.hash(&mut hasher),
            AstKind::Postfix { op, .. } => op.hash(&mut hasher),
            AstKind::Binary { op, .. } => op.hash(&mut hasher),
            AstKind::Predefined(ty) => ty.hash(&mut hasher),
            _ => {}
        }
        let children = ast.children(id);
        children.len().hash(&mut hasher);
        stack.extend(children.into_iter().rev());
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::decls::collect_decls;
    use crate::parser::{ParseOptions, parse};
    use crate::syntax::lower;

    fn diff(before: &str, after: &str) -> (DeclForest, DeclForest, DeclDiff) {
        let old_ast = lower(&parse(before, "t.ts", &ParseOptions::default())).unwrap();
        let new_ast = lower(&parse(after, "t.ts", &ParseOptions::default())).unwrap();
        let old = collect_decls(&old_ast);
        let new = collect_decls(&new_ast);
        let diff = diff_forests(&old_ast, &old, &new_ast, &new);
        (old, new, diff)
    }

    #[test]
    fn test_moved_text_is_unchanged() {
        let (_, _, diff) = diff("var a = 1;\nvar b = 2;", "\n\n  var a = 1;\nvar b = 2;");
        assert!(diff.is_empty());
        assert_eq!(diff.changes.len(), 2);
    }

    #[test]
    fn test_initializer_change_is_modified() {
        let (old, new, diff) = diff("var x = 1;", "var x = 2;");
        let (o, n) = diff.modified().next().unwrap();
        assert_eq!(old.get(o).name, "x");
        assert_eq!(new.get(n).name, "x");
    }

    #[test]
    fn test_added_and_removed() {
        let (old, new, diff) = diff("var a; var b;", "var a; var c;");
        let added: Vec<_> = diff.added().map(|d| new.get(d).name.to_string()).collect();
        let removed: Vec<_> = diff.removed().map(|d| old.get(d).name.to_string()).collect();
        assert_eq!(added, vec!["c"]);
        assert_eq!(removed, vec!["b"]);
    }

    #[test]
    fn test_member_change_does_not_modify_class() {
        let (old, _, diff) = diff("class C { x: number; }", "class C { x: string; }");
        let modified: Vec<_> = diff.modified().map(|(o, _)| old.get(o).name.to_string()).collect();
        assert_eq!(modified, vec!["x"]);
    }
}
