//! Incremental reparsing produces the tree a full parse would.

use proptest::prelude::*;
use typefront::TextSize;
use typefront::parser::{ParseOptions, TextEdit, UnsupportedEdit, incremental_parse, parse};

use crate::helpers::source_fixtures::numbered_statements;

fn full(text: &str) -> typefront::SyntaxTree {
    parse(text, "test.ts", &ParseOptions::default())
}

#[test]
fn test_replace_literal() {
    let old = full("var x = 1;");
    let edit = TextEdit::new(TextSize::new(8), TextSize::new(1), "2");
    let result = incremental_parse(&old, &edit, "var x = 2;").unwrap();
    assert_eq!(result.tree.text(), "var x = 2;");
    assert!(result.tree.structurally_eq(&full("var x = 2;")));
}

#[test]
fn test_append_to_large_file_reuses_almost_everything() {
    let text = numbered_statements(1000);
    let old = full(&text);
    let edit = TextEdit::insert(TextSize::of(text.as_str()), "x");
    let new_text = edit.apply(&text).unwrap();
    let result = incremental_parse(&old, &edit, &new_text).unwrap();

    assert!(result.tree.structurally_eq(&full(&new_text)));
    assert!(
        result.stats.reuse_rate() > 0.95,
        "reuse rate {} ({:?})",
        result.stats.reuse_rate(),
        result.stats
    );
}

#[test]
fn test_edit_in_middle_of_large_file() {
    let text = numbered_statements(200);
    let old = full(&text);
    let start = text.find("v100 = 100").unwrap() + "v100 = ".len();
    let edit = TextEdit::new(TextSize::from(start as u32), TextSize::new(3), "'changed'");
    let new_text = edit.apply(&text).unwrap();
    let result = incremental_parse(&old, &edit, &new_text).unwrap();
    assert!(result.tree.structurally_eq(&full(&new_text)));
    assert!(result.stats.reused_subtrees >= 190);
}

#[test]
fn test_edit_that_opens_a_comment() {
    let text = "var a = 1;\nvar b = 2;\nvar c = 3;\n";
    let old = full(text);
    let edit = TextEdit::insert(TextSize::new(11), "/*");
    let new_text = edit.apply(text).unwrap();
    let result = incremental_parse(&old, &edit, &new_text).unwrap();
    assert!(result.tree.structurally_eq(&full(&new_text)));
    assert_eq!(result.tree.full_text(), new_text);
}

#[test]
fn test_out_of_bounds_edit_is_unsupported() {
    let old = full("var x;");
    let edit = TextEdit::new(TextSize::new(4), TextSize::new(10), "y");
    assert!(matches!(
        incremental_parse(&old, &edit, "var y"),
        Err(UnsupportedEdit::OutOfBounds { .. })
    ));
}

const STATEMENTS: &[&str] = &[
    "var a = 1;\n",
    "function f(x: number) { return x; }\n",
    "class C { m() { return 'm'; } }\n",
    "module M { export var v; }\n",
    "interface I { p: string; }\n",
    "if (a) { b(); } else { c(); }\n",
    "x = y / z;\n",
    "enum E { A, B = 2 }\n",
];

const FRAGMENTS: &[&str] = &["b", " ", ";", "1", "}", "{", "(", "x = 2;", "\n", "'", "/*", "/", "<"];

fn source_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(STATEMENTS), 1..8).prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn prop_incremental_matches_full_parse(
        text in source_strategy(),
        position in any::<prop::sample::Index>(),
        delete in 0usize..4,
        fragment in prop::sample::select(FRAGMENTS),
    ) {
        let start = position.index(text.len() + 1);
        let old_len = delete.min(text.len() - start);
        let edit = TextEdit::new(
            TextSize::from(start as u32),
            TextSize::from(old_len as u32),
            fragment,
        );
        let new_text = edit.apply(&text).unwrap();
        let old = full(&text);
        let result = incremental_parse(&old, &edit, &new_text).unwrap();
        prop_assert_eq!(result.tree.full_text(), new_text.clone());
        prop_assert!(result.tree.structurally_eq(&full(&new_text)));
    }
}
