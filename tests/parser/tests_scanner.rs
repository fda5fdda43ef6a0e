//! Scanner behavior through the public tokenizer.

use proptest::prelude::*;
use rstest::rstest;
use typefront::TextSize;
use typefront::parser::{ScanMode, SyntaxKind, tokenize, tokenize_with_mode};

fn kinds(text: &str) -> Vec<SyntaxKind> {
    tokenize(text).into_iter().map(|t| t.kind).collect()
}

#[rstest]
#[case("var", SyntaxKind::VAR_KW)]
#[case("interface", SyntaxKind::INTERFACE_KW)]
#[case("variable", SyntaxKind::IDENT)]
#[case("0x1F", SyntaxKind::NUMBER)]
#[case(".5e-3", SyntaxKind::NUMBER)]
#[case("'str'", SyntaxKind::STRING)]
#[case(">>>=", SyntaxKind::GT)]
fn test_first_token_kind(#[case] text: &str, #[case] expected: SyntaxKind) {
    assert_eq!(kinds(text)[0], expected);
}

#[test]
fn test_tokens_cover_input() {
    let text = "  var x = 1; // c\n/* d */ y";
    let tokens = tokenize(text);
    assert_eq!(tokens.last().map(|t| t.kind), Some(SyntaxKind::EOF));
    let end = tokens
        .iter()
        .map(|t| t.full_start + t.leading.width() + t.len + t.trailing.width())
        .max();
    assert_eq!(end, Some(TextSize::of(text)));
}

#[test]
fn test_non_ascii_identifier() {
    let tokens = tokenize("ünïcode + x");
    assert_eq!(tokens[0].kind, SyntaxKind::IDENT);
    assert_eq!(tokens[0].len, TextSize::of("ünïcode"));
}

proptest! {
    #[test]
    fn prop_fast_and_slow_paths_agree(text in "\\PC{0,120}") {
        prop_assert_eq!(
            tokenize_with_mode(&text, ScanMode::Fast),
            tokenize_with_mode(&text, ScanMode::SlowOnly)
        );
    }

    #[test]
    fn prop_fast_and_slow_paths_agree_on_code(
        text in "[a-zA-Z0-9_$ \n\r\t;:,.=+\\-*/%<>(){}\\[\\]'\"!?&|^~\\\\]{0,200}"
    ) {
        prop_assert_eq!(
            tokenize_with_mode(&text, ScanMode::Fast),
            tokenize_with_mode(&text, ScanMode::SlowOnly)
        );
    }
}
