//! Logos-based fast path for the scanner.
//!
//! The DFA only knows the ASCII, escape-free shapes of identifiers, numbers,
//! strings and punctuation. Anything else (escapes, non-ASCII text,
//! unterminated literals, regular expressions) is left to the hand-written
//! slow path in [`super::scanner`], which produces identical results.

use super::syntax_kind::SyntaxKind;
use logos::Logos;

/// Logos token enum - maps to SyntaxKind
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastToken {
    // =========================================================================
    // LITERALS
    // =========================================================================
    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*")]
    Ident,

    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?")]
    #[regex(r"0[xX][0-9a-fA-F]+")]
    Number,

    #[regex(r#""[\t\x20-\x21\x23-\x5B\x5D-\x7E]*""#)]
    #[regex(r"'[\t\x20-\x26\x28-\x5B\x5D-\x7E]*'")]
    String,

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(".")]
    Dot,
    #[token("...")]
    DotDotDot,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token("<")]
    Lt,
    // `>` is always single; the parser rescans it in operator position
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token("===")]
    EqEqEq,
    #[token("!==")]
    BangEqEq,
    #[token("=>")]
    FatArrow,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("<<")]
    Shl,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("=")]
    Eq,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("%=")]
    PercentEq,
    #[token("<<=")]
    ShlEq,
    #[token("&=")]
    AmpEq,
    #[token("|=")]
    PipeEq,
    #[token("^=")]
    CaretEq,
}

impl FastToken {
    fn kind(self, text: &str) -> SyntaxKind {
        match self {
            Self::Ident => SyntaxKind::from_keyword(text).unwrap_or(SyntaxKind::IDENT),
            Self::Number => SyntaxKind::NUMBER,
            Self::String => SyntaxKind::STRING,
            Self::LBrace => SyntaxKind::L_BRACE,
            Self::RBrace => SyntaxKind::R_BRACE,
            Self::LParen => SyntaxKind::L_PAREN,
            Self::RParen => SyntaxKind::R_PAREN,
            Self::LBracket => SyntaxKind::L_BRACKET,
            Self::RBracket => SyntaxKind::R_BRACKET,
            Self::Dot => SyntaxKind::DOT,
            Self::DotDotDot => SyntaxKind::DOT_DOT_DOT,
            Self::Semicolon => SyntaxKind::SEMICOLON,
            Self::Comma => SyntaxKind::COMMA,
            Self::Lt => SyntaxKind::LT,
            Self::Gt => SyntaxKind::GT,
            Self::LtEq => SyntaxKind::LT_EQ,
            Self::EqEq => SyntaxKind::EQ_EQ,
            Self::BangEq => SyntaxKind::BANG_EQ,
            Self::EqEqEq => SyntaxKind::EQ_EQ_EQ,
            Self::BangEqEq => SyntaxKind::BANG_EQ_EQ,
            Self::FatArrow => SyntaxKind::FAT_ARROW,
            Self::Plus => SyntaxKind::PLUS,
            Self::Minus => SyntaxKind::MINUS,
            Self::Star => SyntaxKind::STAR,
            Self::Slash => SyntaxKind::SLASH,
            Self::Percent => SyntaxKind::PERCENT,
            Self::PlusPlus => SyntaxKind::PLUS_PLUS,
            Self::MinusMinus => SyntaxKind::MINUS_MINUS,
            Self::Shl => SyntaxKind::SHL,
            Self::Amp => SyntaxKind::AMP,
            Self::Pipe => SyntaxKind::PIPE,
            Self::Caret => SyntaxKind::CARET,
            Self::Bang => SyntaxKind::BANG,
            Self::Tilde => SyntaxKind::TILDE,
            Self::AmpAmp => SyntaxKind::AMP_AMP,
            Self::PipePipe => SyntaxKind::PIPE_PIPE,
            Self::Question => SyntaxKind::QUESTION,
            Self::Colon => SyntaxKind::COLON,
            Self::Eq => SyntaxKind::EQ,
            Self::PlusEq => SyntaxKind::PLUS_EQ,
            Self::MinusEq => SyntaxKind::MINUS_EQ,
            Self::StarEq => SyntaxKind::STAR_EQ,
            Self::SlashEq => SyntaxKind::SLASH_EQ,
            Self::PercentEq => SyntaxKind::PERCENT_EQ,
            Self::ShlEq => SyntaxKind::SHL_EQ,
            Self::AmpEq => SyntaxKind::AMP_EQ,
            Self::PipeEq => SyntaxKind::PIPE_EQ,
            Self::CaretEq => SyntaxKind::CARET_EQ,
        }
    }
}

/// Try to scan one token at the start of `input` with the DFA.
///
/// Returns the kind and byte length, or `None` when the slow path has to
/// take over (no match, or the match would stop early at an escape or a
/// non-ASCII identifier character).
pub fn scan_fast(input: &str) -> Option<(SyntaxKind, usize)> {
    let mut lexer = FastToken::lexer(input);
    let token = lexer.next()?.ok()?;
    let len = lexer.span().end;
    let text = &input[..len];

    if matches!(token, FastToken::Ident | FastToken::Number)
        && input[len..]
            .chars()
            .next()
            .is_some_and(super::chars::needs_slow_path)
    {
        return None;
    }

    Some((token.kind(text), len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_and_keywords() {
        assert_eq!(scan_fast("foo bar"), Some((SyntaxKind::IDENT, 3)));
        assert_eq!(scan_fast("class X"), Some((SyntaxKind::CLASS_KW, 5)));
        assert_eq!(scan_fast("$el"), Some((SyntaxKind::IDENT, 3)));
    }

    #[test]
    fn numbers() {
        assert_eq!(scan_fast("0x1F;"), Some((SyntaxKind::NUMBER, 4)));
        assert_eq!(scan_fast("1.5e3"), Some((SyntaxKind::NUMBER, 5)));
        assert_eq!(scan_fast(".5"), Some((SyntaxKind::NUMBER, 2)));
        // incomplete exponent: either stops before the `e` or defers
        assert!(matches!(
            scan_fast("1e"),
            None | Some((SyntaxKind::NUMBER, 1))
        ));
    }

    #[test]
    fn greater_than_is_single() {
        assert_eq!(scan_fast(">>="), Some((SyntaxKind::GT, 1)));
        assert_eq!(scan_fast(">="), Some((SyntaxKind::GT, 1)));
    }

    #[test]
    fn escapes_and_unicode_fall_back() {
        assert_eq!(scan_fast(r#""a\nb""#), None);
        assert_eq!(scan_fast("abcé"), None);
        assert_eq!(scan_fast("a\\u0062"), None);
        assert_eq!(scan_fast("\"open"), None);
        assert_eq!(scan_fast("#"), None);
    }

    #[test]
    fn strings() {
        assert_eq!(scan_fast("'it' + x"), Some((SyntaxKind::STRING, 4)));
        assert_eq!(scan_fast("\"a b\""), Some((SyntaxKind::STRING, 5)));
    }
}
