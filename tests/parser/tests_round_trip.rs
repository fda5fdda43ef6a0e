//! Every parse reproduces its input exactly, errors included.

use proptest::prelude::*;
use rstest::rstest;
use typefront::parser::{LanguageVersion, ParseOptions, parse};

#[rstest]
#[case::empty("")]
#[case::comments_only("// one\n/* two */\n")]
#[case::unterminated_string("var s = 'open\nvar t;")]
#[case::unterminated_comment("var x; /* never closed")]
#[case::stray_tokens(")) }} var ;; ##")]
#[case::crlf("var a = 1;\r\nvar b = 2;\r\n")]
#[case::non_ascii("var café = 'ü';\u{2028}var π = 3;")]
#[case::regex("var r = /a[/]b/g; x = a / b / c;")]
#[case::generics("var f = (a: Array<Array<number>>) => a;")]
#[case::greater_before_buffered_tokens("(:{[][]>& \t}&")]
#[case::error_before_preceded_node("0<a>\n\"!)+/>")]
#[case::shift_after_lookahead("x = a >> b > c >= d;")]
fn test_round_trip(#[case] text: &str) {
    let tree = parse(text, "test.ts", &ParseOptions::default());
    assert_eq!(tree.full_text(), text);
    assert_eq!(tree.text(), text);
}

#[test]
fn test_clean_input_has_no_errors() {
    let text = "module M {\n    export class C<T> extends B implements I {\n        private x: T;\n        get y() { return 1; }\n    }\n}\n";
    let tree = parse(text, "test.ts", &ParseOptions::default());
    assert!(tree.errors().is_empty(), "{:?}", tree.errors());
}

#[test]
fn test_unterminated_string_is_reported() {
    let tree = parse("var s = 'open\n", "test.ts", &ParseOptions::default());
    assert!(
        tree.errors()
            .iter()
            .any(|e| e.message == "Unterminated string literal.")
    );
}

#[test]
fn test_es3_reports_accessors() {
    let text = "class C { get x() { return 1; } }";
    let es3 = ParseOptions::es3();
    assert_eq!(es3.language_version, LanguageVersion::Es3);
    assert!(parse(text, "test.ts", &ParseOptions::default()).errors().is_empty());
    let tree = parse(text, "test.ts", &es3);
    assert!(!tree.errors().is_empty());
    assert_eq!(tree.full_text(), text);
}

proptest! {
    #[test]
    fn prop_round_trip_arbitrary_text(text in "\\PC{0,200}") {
        let tree = parse(&text, "prop.ts", &ParseOptions::default());
        prop_assert_eq!(tree.full_text(), text);
    }

    #[test]
    fn prop_round_trip_code_like_text(
        text in "[a-z0-9 \n\t;:,.=+\\-*/<>(){}\\[\\]'\"`!?&|]{0,300}"
    ) {
        let tree = parse(&text, "prop.ts", &ParseOptions::default());
        prop_assert_eq!(tree.full_text(), text);
    }
}
