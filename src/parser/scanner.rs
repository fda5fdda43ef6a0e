//! Scanner: text to tokens with packed trivia.
//!
//! Each call to [`Scanner::scan`] produces exactly one token together with
//! its leading trivia (everything since the previous token's trailing
//! trivia) and trailing trivia (up to and including the first line break).
//! Trivia is only measured here. [`scan_trivia`] materializes the pieces
//! later, when the tree is built.
//!
//! The scanner records how far into the text it has looked
//! ([`Scanner::read_extent`]). The incremental parser uses that extent to
//! decide whether a node before an edit could have seen the edit.

use std::cell::Cell;

use bitflags::bitflags;
use rowan::{TextRange, TextSize};

use super::chars;
use super::lexer;
use super::syntax_kind::SyntaxKind;
use super::tree::SyntaxError;

// ============================================================================
// Trivia metadata
// ============================================================================

/// Width and flags of a trivia run, packed into one word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TriviaInfo(u32);

impl TriviaInfo {
    const HAS_COMMENT: u32 = 1 << 30;
    const HAS_NEWLINE: u32 = 1 << 31;
    const WIDTH_MASK: u32 = (1 << 30) - 1;

    pub const EMPTY: TriviaInfo = TriviaInfo(0);

    pub fn new(width: u32, has_comment: bool, has_newline: bool) -> Self {
        let mut bits = width & Self::WIDTH_MASK;
        if has_comment {
            bits |= Self::HAS_COMMENT;
        }
        if has_newline {
            bits |= Self::HAS_NEWLINE;
        }
        Self(bits)
    }

    pub fn width(self) -> TextSize {
        TextSize::new(self.0 & Self::WIDTH_MASK)
    }

    pub fn has_comment(self) -> bool {
        self.0 & Self::HAS_COMMENT != 0
    }

    pub fn has_newline(self) -> bool {
        self.0 & Self::HAS_NEWLINE != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 & Self::WIDTH_MASK == 0
    }
}

bitflags! {
    /// Facts about the token text itself.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TokenFlags: u8 {
        const UNTERMINATED = 1;
        const HAS_ESCAPE = 1 << 1;
    }
}

/// A scanned token. Text is not stored; it is a range of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: SyntaxKind,
    pub full_start: TextSize,
    pub leading: TriviaInfo,
    pub len: TextSize,
    pub trailing: TriviaInfo,
    pub flags: TokenFlags,
}

impl Token {
    pub fn start(&self) -> TextSize {
        self.full_start + self.leading.width()
    }

    pub fn end(&self) -> TextSize {
        self.start() + self.len
    }

    pub fn full_end(&self) -> TextSize {
        self.end() + self.trailing.width()
    }

    pub fn range(&self) -> TextRange {
        TextRange::at(self.start(), self.len)
    }

    pub fn full_range(&self) -> TextRange {
        TextRange::new(self.full_start, self.full_end())
    }

    pub fn leading_range(&self) -> TextRange {
        TextRange::at(self.full_start, self.leading.width())
    }

    pub fn trailing_range(&self) -> TextRange {
        TextRange::at(self.end(), self.trailing.width())
    }

    /// A line break sits between this token and the previous one
    pub fn has_preceding_newline(&self) -> bool {
        self.leading.has_newline()
    }

    pub fn text<'t>(&self, source: &'t str) -> &'t str {
        &source[self.range()]
    }

    pub fn leading_trivia(&self, source: &str) -> Vec<TriviaPiece> {
        scan_trivia(source, self.leading_range())
    }

    pub fn trailing_trivia(&self, source: &str) -> Vec<TriviaPiece> {
        scan_trivia(source, self.trailing_range())
    }
}

/// One materialized piece of trivia.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriviaPiece {
    pub kind: SyntaxKind,
    pub range: TextRange,
}

struct TriviaScan {
    kind: SyntaxKind,
    len: usize,
    /// Exclusive end of the bytes looked at to decide this piece
    examined: usize,
    unterminated: bool,
}

/// Classify the trivia piece starting at `pos`, if there is one.
fn next_trivia(text: &str, pos: usize) -> Result<TriviaScan, usize> {
    let rest = &text[pos..];
    let mut chars = rest.char_indices();
    let Some((_, c)) = chars.next() else {
        return Err(pos + 1);
    };

    if c == '\r' {
        let len = if rest[1..].starts_with('\n') { 2 } else { 1 };
        return Ok(TriviaScan {
            kind: SyntaxKind::NEWLINE,
            len,
            examined: pos + 2,
            unterminated: false,
        });
    }
    if chars::is_line_terminator(c) {
        return Ok(TriviaScan {
            kind: SyntaxKind::NEWLINE,
            len: c.len_utf8(),
            examined: pos + c.len_utf8(),
            unterminated: false,
        });
    }
    if chars::is_whitespace(c) {
        let len = rest
            .char_indices()
            .find(|&(_, c)| !chars::is_whitespace(c))
            .map_or(rest.len(), |(i, _)| i);
        return Ok(TriviaScan {
            kind: SyntaxKind::WHITESPACE,
            len,
            examined: pos + len + 1,
            unterminated: false,
        });
    }
    if c == '/' {
        if rest[1..].starts_with('/') {
            let len = rest
                .char_indices()
                .find(|&(_, c)| chars::is_line_terminator(c))
                .map_or(rest.len(), |(i, _)| i);
            return Ok(TriviaScan {
                kind: SyntaxKind::SINGLE_LINE_COMMENT,
                len,
                examined: pos + len + 1,
                unterminated: false,
            });
        }
        if rest[1..].starts_with('*') {
            let (len, unterminated) = match rest[2..].find("*/") {
                Some(i) => (i + 4, false),
                None => (rest.len(), true),
            };
            return Ok(TriviaScan {
                kind: SyntaxKind::MULTI_LINE_COMMENT,
                len,
                examined: pos + len + usize::from(unterminated),
                unterminated,
            });
        }
        return Err(pos + 2);
    }
    Err(pos + 1)
}

/// Scan trivia alone over an arbitrary subrange, materializing its pieces.
pub fn scan_trivia(text: &str, range: TextRange) -> Vec<TriviaPiece> {
    let end = usize::from(range.end()).min(text.len());
    let mut pos = usize::from(range.start());
    let mut pieces = Vec::new();
    while pos < end {
        let Ok(scan) = next_trivia(text, pos) else {
            break;
        };
        let len = scan.len.min(end - pos);
        pieces.push(TriviaPiece {
            kind: scan.kind,
            range: TextRange::at(TextSize::new(pos as u32), TextSize::new(len as u32)),
        });
        pos += len;
    }
    pieces
}

// ============================================================================
// Scanner
// ============================================================================

/// Which implementation scans token bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// DFA first, hand-written code when the DFA cannot decide
    #[default]
    Fast,
    /// Hand-written code only
    SlowOnly,
}

/// Bytes past a fast-path match the DFA may have looked at.
const FAST_PATH_LOOKAHEAD: usize = 3;

pub struct Scanner<'a> {
    text: &'a str,
    pos: usize,
    mode: ScanMode,
    read_extent: Cell<usize>,
    errors: Vec<SyntaxError>,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            mode: ScanMode::Fast,
            read_extent: Cell::new(0),
            errors: Vec::new(),
        }
    }

    pub fn with_mode(text: &'a str, mode: ScanMode) -> Self {
        Self {
            mode,
            ..Self::new(text)
        }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn position(&self) -> TextSize {
        TextSize::new(self.pos as u32)
    }

    pub fn set_position(&mut self, pos: TextSize) {
        self.pos = usize::from(pos).min(self.text.len());
    }

    /// Exclusive end of everything examined so far; `len + 1` once the
    /// end of input has been observed.
    pub fn read_extent(&self) -> TextSize {
        TextSize::new(self.read_extent.get() as u32)
    }

    /// Account for text examined on the scanner's behalf (reused nodes).
    pub fn extend_read_extent(&self, extent: TextSize) {
        self.touch(usize::from(extent));
    }

    pub fn take_errors(&mut self) -> Vec<SyntaxError> {
        std::mem::take(&mut self.errors)
    }

    fn touch(&self, extent: usize) {
        let extent = extent.min(self.text.len() + 1);
        if extent > self.read_extent.get() {
            self.read_extent.set(extent);
        }
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        let c = self.text.get(pos..).and_then(|rest| rest.chars().next());
        self.touch(pos + c.map_or(1, char::len_utf8));
        c
    }

    fn current(&self) -> Option<char> {
        self.char_at(self.pos)
    }

    fn lookahead(&self, n: usize) -> Option<char> {
        let mut pos = self.pos;
        for _ in 0..n {
            pos += self.char_at(pos)?.len_utf8();
        }
        self.char_at(pos)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.current()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&mut self, start: usize, message: impl Into<String>) {
        let range = TextRange::new(
            TextSize::new(start as u32),
            TextSize::new(self.pos.max(start) as u32),
        );
        self.errors.push(SyntaxError::new(message, range));
    }

    // =========================================================================
    // Token scanning
    // =========================================================================

    /// Scan exactly one token with its leading and trailing trivia.
    pub fn scan(&mut self, allow_regex: bool) -> Token {
        let full_start = self.pos;
        let leading = self.scan_trivia_run(false);
        let start = self.pos;

        let (kind, flags) = if start >= self.text.len() {
            self.touch(start + 1);
            (SyntaxKind::EOF, TokenFlags::empty())
        } else {
            self.scan_token_body(allow_regex)
        };

        let len = self.pos - start;
        let trailing = if kind == SyntaxKind::EOF {
            TriviaInfo::EMPTY
        } else {
            self.scan_trivia_run(true)
        };

        Token {
            kind,
            full_start: TextSize::new(full_start as u32),
            leading,
            len: TextSize::new(len as u32),
            trailing,
            flags,
        }
    }

    /// Rescan a `>` token as the longest of `>`, `>=`, `>>`, `>>=`, `>>>`, `>>>=`.
    pub fn rescan_greater(&mut self, token: &Token) -> Token {
        debug_assert_eq!(token.kind, SyntaxKind::GT);
        self.pos = usize::from(token.start()) + 1;
        let kind = match self.current() {
            Some('>') => {
                self.pos += 1;
                match self.current() {
                    Some('>') => {
                        self.pos += 1;
                        if self.current() == Some('=') {
                            self.pos += 1;
                            SyntaxKind::USHR_EQ
                        } else {
                            SyntaxKind::USHR
                        }
                    }
                    Some('=') => {
                        self.pos += 1;
                        SyntaxKind::SHR_EQ
                    }
                    _ => SyntaxKind::SHR,
                }
            }
            Some('=') => {
                self.pos += 1;
                SyntaxKind::GT_EQ
            }
            _ => SyntaxKind::GT,
        };
        self.finish_rescan(token, kind, TokenFlags::empty())
    }

    /// Rescan a `/` or `/=` token as a regular expression literal.
    pub fn rescan_slash_as_regex(&mut self, token: &Token) -> Token {
        debug_assert!(matches!(token.kind, SyntaxKind::SLASH | SyntaxKind::SLASH_EQ));
        self.pos = usize::from(token.start());
        let (kind, flags) = self.scan_regex();
        self.finish_rescan(token, kind, flags)
    }

    fn finish_rescan(&mut self, token: &Token, kind: SyntaxKind, flags: TokenFlags) -> Token {
        let start = usize::from(token.start());
        let len = self.pos - start;
        let trailing = self.scan_trivia_run(true);
        Token {
            kind,
            full_start: token.full_start,
            leading: token.leading,
            len: TextSize::new(len as u32),
            trailing,
            flags,
        }
    }

    fn scan_trivia_run(&mut self, trailing: bool) -> TriviaInfo {
        let start = self.pos;
        let mut has_comment = false;
        let mut has_newline = false;
        loop {
            match next_trivia(self.text, self.pos) {
                Ok(scan) => {
                    self.touch(scan.examined);
                    if scan.unterminated {
                        let comment_start = self.pos;
                        self.pos += scan.len;
                        self.error(comment_start, "'*/' expected.");
                    } else {
                        self.pos += scan.len;
                    }
                    match scan.kind {
                        SyntaxKind::NEWLINE => {
                            has_newline = true;
                            if trailing {
                                break;
                            }
                        }
                        SyntaxKind::MULTI_LINE_COMMENT => {
                            has_comment = true;
                            let text = &self.text[self.pos - scan.len..self.pos];
                            if text.chars().any(chars::is_line_terminator) {
                                has_newline = true;
                                if trailing {
                                    break;
                                }
                            }
                        }
                        SyntaxKind::SINGLE_LINE_COMMENT => has_comment = true,
                        _ => {}
                    }
                }
                Err(examined) => {
                    self.touch(examined);
                    break;
                }
            }
        }
        TriviaInfo::new((self.pos - start) as u32, has_comment, has_newline)
    }

    fn scan_token_body(&mut self, allow_regex: bool) -> (SyntaxKind, TokenFlags) {
        let Some(c) = self.current() else {
            return (SyntaxKind::EOF, TokenFlags::empty());
        };

        if c == '/' && allow_regex {
            return self.scan_regex();
        }

        if self.mode == ScanMode::Fast && !chars::needs_slow_path(c) {
            if let Some((kind, len)) = lexer::scan_fast(&self.text[self.pos..]) {
                self.pos += len;
                self.touch(self.pos + FAST_PATH_LOOKAHEAD);
                return (kind, TokenFlags::empty());
            }
        }

        self.scan_token_slow(c)
    }

    fn scan_token_slow(&mut self, c: char) -> (SyntaxKind, TokenFlags) {
        if chars::is_identifier_start(c) || c == '\\' {
            return self.scan_identifier();
        }
        if chars::is_numeric_start(c, self.lookahead(1)) {
            return (self.scan_number(), TokenFlags::empty());
        }
        if c == '"' || c == '\'' {
            return self.scan_string(c);
        }
        if let Some(kind) = self.scan_punct(c) {
            return (kind, TokenFlags::empty());
        }

        let start = self.pos;
        self.advance();
        self.error(start, "Invalid character.");
        (SyntaxKind::UNKNOWN, TokenFlags::empty())
    }

    /// `\uXXXX` at the current position, returning the decoded char
    fn peek_unicode_escape(&self) -> Option<char> {
        if self.current() != Some('\\') || self.lookahead(1) != Some('u') {
            return None;
        }
        let mut value = 0u32;
        for i in 0..4 {
            let d = self.lookahead(2 + i)?.to_digit(16)?;
            value = value * 16 + d;
        }
        char::from_u32(value)
    }

    fn scan_identifier(&mut self) -> (SyntaxKind, TokenFlags) {
        let start = self.pos;
        let mut flags = TokenFlags::empty();

        // Start character, possibly escaped
        match self.current() {
            Some('\\') => match self.peek_unicode_escape() {
                Some(c) if chars::is_identifier_start(c) => {
                    self.pos += 6;
                    flags |= TokenFlags::HAS_ESCAPE;
                }
                _ => {
                    self.advance();
                    self.error(start, "Invalid character.");
                    return (SyntaxKind::UNKNOWN, TokenFlags::empty());
                }
            },
            _ => {
                self.advance();
            }
        }

        loop {
            match self.current() {
                Some('\\') => match self.peek_unicode_escape() {
                    Some(c) if chars::is_identifier_part(c) => {
                        self.pos += 6;
                        flags |= TokenFlags::HAS_ESCAPE;
                    }
                    _ => break,
                },
                Some(c) if chars::is_identifier_part(c) => {
                    self.advance();
                }
                _ => break,
            }
        }

        let kind = if flags.contains(TokenFlags::HAS_ESCAPE) {
            SyntaxKind::IDENT
        } else {
            SyntaxKind::from_keyword(&self.text[start..self.pos]).unwrap_or(SyntaxKind::IDENT)
        };
        (kind, flags)
    }

    fn eat_digits(&mut self, pred: fn(char) -> bool) -> usize {
        let mut count = 0;
        while self.current().is_some_and(pred) {
            self.advance();
            count += 1;
        }
        count
    }

    fn scan_number(&mut self) -> SyntaxKind {
        if self.current() == Some('0')
            && matches!(self.lookahead(1), Some('x' | 'X'))
            && self.lookahead(2).is_some_and(chars::is_hex_digit)
        {
            self.pos += 2;
            self.eat_digits(chars::is_hex_digit);
            return SyntaxKind::NUMBER;
        }

        if self.current() == Some('.') {
            self.advance();
            self.eat_digits(chars::is_digit);
        } else {
            self.eat_digits(chars::is_digit);
            if self.current() == Some('.') {
                self.advance();
                self.eat_digits(chars::is_digit);
            }
        }

        if matches!(self.current(), Some('e' | 'E')) {
            let digits_at = match self.lookahead(1) {
                Some('+' | '-') => 2,
                _ => 1,
            };
            if self.lookahead(digits_at).is_some_and(chars::is_digit) {
                self.pos += digits_at;
                self.eat_digits(chars::is_digit);
            }
        }
        SyntaxKind::NUMBER
    }

    fn scan_string(&mut self, quote: char) -> (SyntaxKind, TokenFlags) {
        let start = self.pos;
        let mut flags = TokenFlags::empty();
        self.advance();
        loop {
            match self.current() {
                None => {
                    self.error(start, "Unterminated string literal.");
                    flags |= TokenFlags::UNTERMINATED;
                    break;
                }
                Some(c) if chars::is_line_terminator(c) => {
                    self.error(start, "Unterminated string literal.");
                    flags |= TokenFlags::UNTERMINATED;
                    break;
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    flags |= TokenFlags::HAS_ESCAPE;
                    self.scan_escape();
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        (SyntaxKind::STRING, flags)
    }

    fn scan_escape(&mut self) {
        let start = self.pos;
        self.advance(); // backslash
        match self.advance() {
            None => {}
            Some('\r') => {
                if self.current() == Some('\n') {
                    self.advance();
                }
            }
            Some('x') => self.expect_hex_digits(start, 2),
            Some('u') => self.expect_hex_digits(start, 4),
            Some(_) => {}
        }
    }

    fn expect_hex_digits(&mut self, start: usize, count: usize) {
        for _ in 0..count {
            if self.current().is_some_and(chars::is_hex_digit) {
                self.advance();
            } else {
                self.error(start, "Hexadecimal digit expected.");
                return;
            }
        }
    }

    fn scan_regex(&mut self) -> (SyntaxKind, TokenFlags) {
        let start = self.pos;
        let mut flags = TokenFlags::empty();
        let mut in_class = false;
        self.advance(); // opening slash
        loop {
            match self.current() {
                None => {
                    self.error(start, "Unterminated regular expression literal.");
                    flags |= TokenFlags::UNTERMINATED;
                    break;
                }
                Some(c) if chars::is_line_terminator(c) => {
                    self.error(start, "Unterminated regular expression literal.");
                    flags |= TokenFlags::UNTERMINATED;
                    break;
                }
                Some('\\') => {
                    self.advance();
                    if self.current().is_some_and(|c| !chars::is_line_terminator(c)) {
                        self.advance();
                    }
                }
                Some('[') => {
                    in_class = true;
                    self.advance();
                }
                Some(']') => {
                    in_class = false;
                    self.advance();
                }
                Some('/') if !in_class => {
                    self.advance();
                    break;
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        if !flags.contains(TokenFlags::UNTERMINATED) {
            while self.current().is_some_and(chars::is_identifier_part) {
                self.advance();
            }
        }
        (SyntaxKind::REGEX, flags)
    }

    fn scan_punct(&mut self, c: char) -> Option<SyntaxKind> {
        let next = self.lookahead(1);
        let next2 = self.lookahead(2);
        let (kind, len) = match (c, next, next2) {
            ('{', _, _) => (SyntaxKind::L_BRACE, 1),
            ('}', _, _) => (SyntaxKind::R_BRACE, 1),
            ('(', _, _) => (SyntaxKind::L_PAREN, 1),
            (')', _, _) => (SyntaxKind::R_PAREN, 1),
            ('[', _, _) => (SyntaxKind::L_BRACKET, 1),
            (']', _, _) => (SyntaxKind::R_BRACKET, 1),
            ('.', Some('.'), Some('.')) => (SyntaxKind::DOT_DOT_DOT, 3),
            ('.', _, _) => (SyntaxKind::DOT, 1),
            (';', _, _) => (SyntaxKind::SEMICOLON, 1),
            (',', _, _) => (SyntaxKind::COMMA, 1),
            ('<', Some('<'), Some('=')) => (SyntaxKind::SHL_EQ, 3),
            ('<', Some('<'), _) => (SyntaxKind::SHL, 2),
            ('<', Some('='), _) => (SyntaxKind::LT_EQ, 2),
            ('<', _, _) => (SyntaxKind::LT, 1),
            ('>', _, _) => (SyntaxKind::GT, 1),
            ('=', Some('='), Some('=')) => (SyntaxKind::EQ_EQ_EQ, 3),
            ('=', Some('='), _) => (SyntaxKind::EQ_EQ, 2),
            ('=', Some('>'), _) => (SyntaxKind::FAT_ARROW, 2),
            ('=', _, _) => (SyntaxKind::EQ, 1),
            ('!', Some('='), Some('=')) => (SyntaxKind::BANG_EQ_EQ, 3),
            ('!', Some('='), _) => (SyntaxKind::BANG_EQ, 2),
            ('!', _, _) => (SyntaxKind::BANG, 1),
            ('+', Some('+'), _) => (SyntaxKind::PLUS_PLUS, 2),
            ('+', Some('='), _) => (SyntaxKind::PLUS_EQ, 2),
            ('+', _, _) => (SyntaxKind::PLUS, 1),
            ('-', Some('-'), _) => (SyntaxKind::MINUS_MINUS, 2),
            ('-', Some('='), _) => (SyntaxKind::MINUS_EQ, 2),
            ('-', _, _) => (SyntaxKind::MINUS, 1),
            ('*', Some('='), _) => (SyntaxKind::STAR_EQ, 2),
            ('*', _, _) => (SyntaxKind::STAR, 1),
            ('/', Some('='), _) => (SyntaxKind::SLASH_EQ, 2),
            ('/', _, _) => (SyntaxKind::SLASH, 1),
            ('%', Some('='), _) => (SyntaxKind::PERCENT_EQ, 2),
            ('%', _, _) => (SyntaxKind::PERCENT, 1),
            ('&', Some('&'), _) => (SyntaxKind::AMP_AMP, 2),
            ('&', Some('='), _) => (SyntaxKind::AMP_EQ, 2),
            ('&', _, _) => (SyntaxKind::AMP, 1),
            ('|', Some('|'), _) => (SyntaxKind::PIPE_PIPE, 2),
            ('|', Some('='), _) => (SyntaxKind::PIPE_EQ, 2),
            ('|', _, _) => (SyntaxKind::PIPE, 1),
            ('^', Some('='), _) => (SyntaxKind::CARET_EQ, 2),
            ('^', _, _) => (SyntaxKind::CARET, 1),
            ('~', _, _) => (SyntaxKind::TILDE, 1),
            ('?', _, _) => (SyntaxKind::QUESTION, 1),
            (':', _, _) => (SyntaxKind::COLON, 1),
            _ => return None,
        };
        self.pos += len;
        Some(kind)
    }
}

/// Scan a whole text, EOF token included.
pub fn tokenize(text: &str) -> Vec<Token> {
    tokenize_with_mode(text, ScanMode::Fast)
}

pub fn tokenize_with_mode(text: &str, mode: ScanMode) -> Vec<Token> {
    let mut scanner = Scanner::with_mode(text, mode);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.scan(false);
        tokens.push(token);
        if token.kind == SyntaxKind::EOF {
            break;
        }
    }
    tokens
}

// ============================================================================
// Literal values
// ============================================================================

/// Numeric value of a NUMBER token's text.
pub fn number_value(text: &str) -> Option<f64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok().map(|v| v as f64);
    }
    let normalized = if text.ends_with('.') {
        &text[..text.len() - 1]
    } else {
        text
    };
    normalized.parse::<f64>().ok()
}

/// Cooked value of a STRING token's text (quotes removed, escapes decoded).
pub fn string_value(text: &str) -> String {
    let mut chars = text.chars();
    let quote = chars.next();
    let mut body: &str = chars.as_str();
    if let Some(q) = quote {
        if body.ends_with(q) {
            body = &body[..body.len() - q.len_utf8()];
        }
    }

    let mut out = String::with_capacity(body.len());
    let mut it = body.chars().peekable();
    while let Some(c) = it.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match it.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('x') => push_hex_escape(&mut out, &mut it, 2),
            Some('u') => push_hex_escape(&mut out, &mut it, 4),
            Some('\r') => {
                if it.peek() == Some(&'\n') {
                    it.next();
                }
            }
            Some(c) if chars::is_line_terminator(c) => {}
            Some(c) => out.push(c),
            None => {}
        }
    }
    out
}

fn push_hex_escape(out: &mut String, it: &mut std::iter::Peekable<std::str::Chars<'_>>, count: usize) {
    let mut value = 0u32;
    for _ in 0..count {
        match it.peek().and_then(|c| c.to_digit(16)) {
            Some(d) => {
                value = value * 16 + d;
                it.next();
            }
            None => return,
        }
    }
    if let Some(c) = char::from_u32(value) {
        out.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<SyntaxKind> {
        tokenize(text).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn trailing_trivia_stops_after_newline() {
        let text = "a  // c\n  b";
        let tokens = tokenize(text);
        assert_eq!(tokens[0].kind, SyntaxKind::IDENT);
        assert_eq!(tokens[0].trailing.width(), TextSize::new(7));
        assert!(tokens[0].trailing.has_comment());
        assert!(tokens[0].trailing.has_newline());
        assert_eq!(tokens[1].leading.width(), TextSize::new(2));
        assert!(!tokens[1].has_preceding_newline());
    }

    #[test]
    fn newline_sets_leading_flag_when_not_trailing() {
        let tokens = tokenize("a\n\nb");
        assert!(tokens[0].trailing.has_newline());
        assert!(tokens[1].leading.has_newline());
    }

    #[test]
    fn materialized_trivia_covers_range() {
        let text = " /* x */\r\n\t// y\n";
        let pieces = scan_trivia(text, TextRange::up_to(TextSize::of(text)));
        let kinds: Vec<_> = pieces.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SyntaxKind::WHITESPACE,
                SyntaxKind::MULTI_LINE_COMMENT,
                SyntaxKind::NEWLINE,
                SyntaxKind::WHITESPACE,
                SyntaxKind::SINGLE_LINE_COMMENT,
                SyntaxKind::NEWLINE,
            ]
        );
        assert_eq!(pieces.last().unwrap().range.end(), TextSize::of(text));
    }

    #[test]
    fn unterminated_string_reports_error() {
        let mut scanner = Scanner::new("'abc\nx");
        let token = scanner.scan(false);
        assert_eq!(token.kind, SyntaxKind::STRING);
        assert!(token.flags.contains(TokenFlags::UNTERMINATED));
        assert_eq!(token.len, TextSize::new(4));
        let errors = scanner.take_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Unterminated string literal.");
    }

    #[test]
    fn unterminated_comment_is_trivia_with_error() {
        let mut scanner = Scanner::new("/* open");
        let token = scanner.scan(false);
        assert_eq!(token.kind, SyntaxKind::EOF);
        assert_eq!(token.leading.width(), TextSize::new(7));
        assert_eq!(scanner.take_errors()[0].message, "'*/' expected.");
    }

    #[test]
    fn regex_only_when_allowed() {
        let mut scanner = Scanner::new("/a[/]b/gi");
        assert_eq!(scanner.scan(true).kind, SyntaxKind::REGEX);
        assert_eq!(kinds("/a/")[0], SyntaxKind::SLASH);
    }

    #[test]
    fn rescan_slash() {
        let text = "/ab+c/g;";
        let mut scanner = Scanner::new(text);
        let slash = scanner.scan(false);
        let regex = scanner.rescan_slash_as_regex(&slash);
        assert_eq!(regex.kind, SyntaxKind::REGEX);
        assert_eq!(regex.text(text), "/ab+c/g");
    }

    #[test]
    fn rescan_greater_forms() {
        for (text, expected) in [
            (">", SyntaxKind::GT),
            (">=", SyntaxKind::GT_EQ),
            (">>", SyntaxKind::SHR),
            (">>=", SyntaxKind::SHR_EQ),
            (">>>", SyntaxKind::USHR),
            (">>>= 1", SyntaxKind::USHR_EQ),
        ] {
            let mut scanner = Scanner::new(text);
            let gt = scanner.scan(false);
            assert_eq!(gt.kind, SyntaxKind::GT);
            assert_eq!(scanner.rescan_greater(&gt).kind, expected, "{text}");
        }
    }

    #[test]
    fn escaped_identifier_is_never_a_keyword() {
        let tokens = tokenize("\\u0076ar var");
        assert_eq!(tokens[0].kind, SyntaxKind::IDENT);
        assert!(tokens[0].flags.contains(TokenFlags::HAS_ESCAPE));
        assert_eq!(tokens[1].kind, SyntaxKind::VAR_KW);
    }

    #[test]
    fn invalid_character() {
        let mut scanner = Scanner::new("#");
        assert_eq!(scanner.scan(false).kind, SyntaxKind::UNKNOWN);
        assert_eq!(scanner.take_errors()[0].message, "Invalid character.");
    }

    #[test]
    fn read_extent_sees_end_of_input() {
        let mut scanner = Scanner::with_mode("a;\nb", ScanMode::SlowOnly);
        scanner.scan(false);
        scanner.scan(false);
        assert!(scanner.read_extent() <= TextSize::new(4));
        scanner.scan(false);
        assert_eq!(scanner.read_extent(), TextSize::new(5));
    }

    #[test]
    fn literal_values() {
        assert_eq!(number_value("0x10"), Some(16.0));
        assert_eq!(number_value("1."), Some(1.0));
        assert_eq!(number_value("2.5e1"), Some(25.0));
        assert_eq!(string_value(r#""a\tb""#), "a\tb");
        assert_eq!(string_value(r"'A\x42'"), "AB");
    }

    #[test]
    fn slow_and_fast_agree_on_sample() {
        let text = "var x = 0x1F + .5e-3 * 'str' >>> y; // done\nclass C { get a() { return \"q\"; } }";
        assert_eq!(
            tokenize_with_mode(text, ScanMode::Fast),
            tokenize_with_mode(text, ScanMode::SlowOnly)
        );
    }
}
