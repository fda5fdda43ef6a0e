//! Character classification shared by both scanner paths.
//!
//! ASCII is answered from a fixed table; everything else goes through
//! `unicode-ident` or the short lists of Unicode spaces and line breaks.

const IDENT_START: u8 = 1;
const IDENT_PART: u8 = 2;
const WHITESPACE: u8 = 4;
const LINE_BREAK: u8 = 8;
const DIGIT: u8 = 16;
const HEX_DIGIT: u8 = 32;

static ASCII_CLASS: [u8; 128] = build_ascii_table();

const fn build_ascii_table() -> [u8; 128] {
    let mut table = [0u8; 128];
    let mut i = 0;
    while i < 128 {
        let c = i as u8;
        let mut class = 0;
        if c.is_ascii_alphabetic() || c == b'_' || c == b'$' {
            class |= IDENT_START | IDENT_PART;
        }
        if c.is_ascii_digit() {
            class |= IDENT_PART | DIGIT | HEX_DIGIT;
        }
        if matches!(c, b'a'..=b'f' | b'A'..=b'F') {
            class |= HEX_DIGIT;
        }
        if matches!(c, b' ' | b'\t' | 0x0B | 0x0C) {
            class |= WHITESPACE;
        }
        if matches!(c, b'\n' | b'\r') {
            class |= LINE_BREAK;
        }
        table[i] = class;
        i += 1;
    }
    table
}

fn ascii_has(c: char, class: u8) -> bool {
    (c as u32) < 128 && ASCII_CLASS[c as usize] & class != 0
}

pub fn is_identifier_start(c: char) -> bool {
    if c.is_ascii() {
        return ascii_has(c, IDENT_START);
    }
    unicode_ident::is_xid_start(c)
}

pub fn is_identifier_part(c: char) -> bool {
    if c.is_ascii() {
        return ascii_has(c, IDENT_PART);
    }
    // ZWNJ and ZWJ are allowed inside identifiers
    unicode_ident::is_xid_continue(c) || c == '\u{200C}' || c == '\u{200D}'
}

/// Whitespace other than line terminators
pub fn is_whitespace(c: char) -> bool {
    if c.is_ascii() {
        return ascii_has(c, WHITESPACE);
    }
    matches!(
        c,
        '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
            | '\u{FEFF}'
    )
}

pub fn is_line_terminator(c: char) -> bool {
    if c.is_ascii() {
        return ascii_has(c, LINE_BREAK);
    }
    matches!(c, '\u{2028}' | '\u{2029}')
}

pub fn is_digit(c: char) -> bool {
    ascii_has(c, DIGIT)
}

pub fn is_hex_digit(c: char) -> bool {
    ascii_has(c, HEX_DIGIT)
}

/// A numeric literal can start here (`.` only when followed by a digit)
pub fn is_numeric_start(c: char, next: Option<char>) -> bool {
    is_digit(c) || (c == '.' && next.is_some_and(is_digit))
}

/// Characters the table-driven scanner path can never handle
pub fn needs_slow_path(c: char) -> bool {
    !c.is_ascii() || c == '\\'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_classes() {
        assert!(is_identifier_start('$'));
        assert!(is_identifier_start('_'));
        assert!(!is_identifier_start('1'));
        assert!(is_identifier_part('1'));
        assert!(is_hex_digit('F'));
        assert!(!is_hex_digit('g'));
        assert!(is_whitespace('\t'));
        assert!(!is_whitespace('\n'));
        assert!(is_line_terminator('\r'));
    }

    #[test]
    fn unicode_classes() {
        assert!(is_identifier_start('é'));
        assert!(is_identifier_start('λ'));
        assert!(is_identifier_part('\u{200D}'));
        assert!(is_whitespace('\u{00A0}'));
        assert!(is_line_terminator('\u{2028}'));
        assert!(!is_identifier_start('\u{2028}'));
    }

    #[test]
    fn numeric_start_needs_digit_after_dot() {
        assert!(is_numeric_start('.', Some('5')));
        assert!(!is_numeric_start('.', Some('x')));
        assert!(!is_numeric_start('.', None));
    }
}
