//! Session surface: adding, editing and removing units.

use typefront::TextSize;
use typefront::parser::{TextEdit, UnsupportedEdit};
use typefront::ide::{AnalysisError, AnalysisHost};

use crate::helpers::hir_helpers::*;
use crate::helpers::source_fixtures::numbered_statements;

#[test]
fn test_add_query_update() {
    let mut host = AnalysisHost::new();
    host.add_unit("a.ts", "var x = 1;").unwrap();
    assert!(host.has_unit("a.ts"));

    assert_eq!(host.update_unit("a.ts", "var x = 2;"), Ok(true));
    assert_eq!(host.text("a.ts"), Some("var x = 2;"));

    let hover = host.analysis().hover("a.ts", TextSize::new(4)).unwrap().unwrap();
    assert!(hover.contents.contains("(var) x: number"));
}

#[test]
fn test_edit_unit_applies_single_edit() {
    let mut host = host_from_source("var x = 1;");
    let edit = TextEdit::new(TextSize::new(8), TextSize::new(1), "'s'");
    assert_eq!(host.edit_unit(TEST_PATH, &edit), Ok(true));
    assert_eq!(host.text(TEST_PATH), Some("var x = 's';"));
}

#[test]
fn test_invalid_edit_is_rejected() {
    let mut host = host_from_source("var x;");
    let edit = TextEdit::new(TextSize::new(3), TextSize::new(40), "");
    assert!(matches!(
        host.edit_unit(TEST_PATH, &edit),
        Err(AnalysisError::InvalidEdit(UnsupportedEdit::OutOfBounds { .. }))
    ));
    assert_eq!(host.text(TEST_PATH), Some("var x;"));
}

#[test]
fn test_large_file_edits_stay_consistent() {
    let text = numbered_statements(300);
    let mut host = host_from_source(&text);
    let mut current = text.clone();
    for i in [5usize, 150, 299] {
        let needle = format!("var v{i} = {i};");
        let replacement = format!("var v{i} = 'text{i}';");
        current = current.replacen(&needle, &replacement, 1);
        assert_eq!(host.update_unit(TEST_PATH, &current), Ok(true));
    }
    assert_eq!(host.text(TEST_PATH), Some(current.as_str()));

    let offset = offset_of(&current, "v150");
    let hover = host.analysis().hover(TEST_PATH, offset).unwrap().unwrap();
    assert!(hover.contents.contains("(var) v150: string"), "{}", hover.contents);
}

#[test]
fn test_unknown_and_duplicate_units() {
    let mut host = host_from_source("var x;");
    assert_eq!(
        host.add_unit(TEST_PATH, "var y;"),
        Err(AnalysisError::DuplicateUnit(TEST_PATH.to_string()))
    );
    assert_eq!(
        host.update_unit("missing.ts", ""),
        Err(AnalysisError::UnknownUnit("missing.ts".to_string()))
    );
    assert!(matches!(
        host.analysis().hover("missing.ts", TextSize::new(0)),
        Err(AnalysisError::UnknownUnit(_))
    ));
    host.remove_unit(TEST_PATH).unwrap();
    assert!(!host.has_unit(TEST_PATH));
    assert!(host.remove_unit(TEST_PATH).is_err());
}
