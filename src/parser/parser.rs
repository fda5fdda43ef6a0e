//! Recursive descent parser infrastructure
//!
//! The grammar functions in [`super::grammar`] drive a [`Parser`] that pulls
//! tokens lazily from the [`Scanner`] and records a flat list of events.
//! The [`sink`](super::sink) turns events into a rowan green tree.
//!
//! Events instead of a `GreenNodeBuilder` so that speculative parses can be
//! rolled back by truncating, and so that reused subtrees from an earlier
//! tree can be spliced in as a single event.

use std::sync::Arc;

use rowan::TextSize;
use tracing::debug;

use super::grammar;
use super::incremental::SyntaxCursor;
use super::scanner::{Scanner, Token};
use super::sink::{self, SinkOutput};
use super::syntax_kind::SyntaxKind;
use super::tree::{ParseOptions, ReuseCategory, SyntaxError, SyntaxTree};

/// Parse source text into a lossless syntax tree.
pub fn parse(text: &str, path: &str, options: &ParseOptions) -> SyntaxTree {
    let output = parse_with_cursor(text, options, None);
    debug!(
        path,
        len = text.len(),
        errors = output.errors.len(),
        "parsed"
    );
    SyntaxTree::new(
        output.green,
        output.errors,
        Arc::from(path),
        options.clone(),
        Arc::from(text),
        output.reuse,
    )
}

pub(crate) fn parse_with_cursor(
    text: &str,
    options: &ParseOptions,
    cursor: Option<SyntaxCursor<'_>>,
) -> SinkOutput {
    let old_entries = cursor.as_ref().map(|c| c.entries()).unwrap_or(&[]);
    let mut parser = Parser::new(text, options, cursor);
    grammar::source_file(&mut parser);
    let events = parser.finish();
    sink::build(text, events, old_entries)
}

// ============================================================================
// Events
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) enum Event {
    Start {
        kind: SyntaxKind,
        forward_parent: Option<u32>,
        reuse: Option<ReuseCategory>,
    },
    Finish {
        read_extent: TextSize,
    },
    Token {
        kind: SyntaxKind,
        token: Token,
    },
    /// Zero-width token standing in for a required one
    Missing {
        kind: SyntaxKind,
    },
    Error(SyntaxError),
    /// Subtree taken over from the previous tree
    Reused {
        entry: u32,
        start: TextSize,
    },
    Tombstone,
}

// ============================================================================
// Markers
// ============================================================================

/// An open node. Must be completed or abandoned.
pub(crate) struct Marker {
    pos: u32,
}

impl Marker {
    pub(crate) fn complete(self, p: &mut Parser, kind: SyntaxKind) -> CompletedMarker {
        let idx = self.pos as usize;
        if let Event::Start { kind: slot, .. } = &mut p.events[idx] {
            *slot = kind;
        }
        let read_extent = p.scanner.read_extent();
        p.events.push(Event::Finish { read_extent });
        CompletedMarker { pos: self.pos }
    }

    /// Drop the marker. A start left in the middle of the event list stays
    /// behind as a tombstone the sink skips.
    pub(crate) fn abandon(self, p: &mut Parser) {
        if self.pos as usize == p.events.len() - 1 {
            p.events.pop();
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) struct CompletedMarker {
    pos: u32,
}

impl CompletedMarker {
    /// Open a new node that will become the parent of this one.
    pub(crate) fn precede(self, p: &mut Parser) -> Marker {
        let new_pos = p.start();
        let idx = self.pos as usize;
        if let Event::Start { forward_parent, .. } = &mut p.events[idx] {
            *forward_parent = Some(new_pos.pos - self.pos);
        }
        new_pos
    }

    /// Record the node as a candidate for reuse by a later incremental parse.
    pub(crate) fn mark_reusable(self, p: &mut Parser, category: ReuseCategory) {
        if let Event::Start { reuse, .. } = &mut p.events[self.pos as usize] {
            *reuse = Some(category);
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

#[derive(Clone)]
struct Lexed {
    token: Token,
    errors: Vec<SyntaxError>,
    /// A line break sits in this token's leading trivia or in the
    /// previous token's trailing trivia
    preceded_by_newline: bool,
}

/// State saved before a speculative parse.
struct Checkpoint {
    pos: usize,
    events: usize,
    rescans: usize,
}

/// A token replaced by a rescan, restored when speculation rolls back.
struct Rescan {
    index: usize,
    old: Lexed,
}

/// The parser state
pub(crate) struct Parser<'t> {
    scanner: Scanner<'t>,
    tokens: Vec<Lexed>,
    pos: usize,
    events: Vec<Event>,
    options: &'t ParseOptions,
    cursor: Option<SyntaxCursor<'t>>,
    speculation: u32,
    rescans: Vec<Rescan>,
    /// Subtrees spliced in from the previous tree
    reused: usize,
    last_trailing_newline: bool,
    no_in: bool,
}

impl<'t> Parser<'t> {
    fn new(text: &'t str, options: &'t ParseOptions, cursor: Option<SyntaxCursor<'t>>) -> Self {
        Self {
            scanner: Scanner::new(text),
            tokens: Vec::new(),
            pos: 0,
            events: Vec::new(),
            options,
            cursor,
            speculation: 0,
            rescans: Vec::new(),
            reused: 0,
            last_trailing_newline: false,
            no_in: false,
        }
    }

    fn finish(self) -> Vec<Event> {
        self.events
    }

    pub(crate) fn options(&self) -> &ParseOptions {
        self.options
    }

    // =========================================================================
    // Token inspection
    // =========================================================================

    fn fill(&mut self, n: usize) {
        while self.tokens.len() <= self.pos + n {
            if let Some(last) = self.tokens.last() {
                if last.token.kind == SyntaxKind::EOF {
                    return;
                }
            }
            let token = self.scanner.scan(false);
            let errors = self.scanner.take_errors();
            let preceded_by_newline = self.last_trailing_newline || token.leading.has_newline();
            self.last_trailing_newline = token.trailing.has_newline();
            self.tokens.push(Lexed {
                token,
                errors,
                preceded_by_newline,
            });
        }
    }

    pub(crate) fn nth_token(&mut self, n: usize) -> Token {
        self.fill(n);
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        self.tokens[idx].token
    }

    pub(crate) fn nth(&mut self, n: usize) -> SyntaxKind {
        self.nth_token(n).kind
    }

    pub(crate) fn current(&mut self) -> SyntaxKind {
        self.nth(0)
    }

    pub(crate) fn at(&mut self, kind: SyntaxKind) -> bool {
        self.current() == kind
    }

    pub(crate) fn nth_at(&mut self, n: usize, kind: SyntaxKind) -> bool {
        self.nth(n) == kind
    }

    pub(crate) fn at_any(&mut self, kinds: &[SyntaxKind]) -> bool {
        let current = self.current();
        kinds.contains(&current)
    }

    pub(crate) fn at_eof(&mut self) -> bool {
        self.at(SyntaxKind::EOF)
    }

    /// A line break separates the nth token from the one before it
    pub(crate) fn nth_has_preceding_newline(&mut self, n: usize) -> bool {
        self.fill(n);
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        self.tokens[idx].preceded_by_newline
    }

    pub(crate) fn has_preceding_newline(&mut self) -> bool {
        self.nth_has_preceding_newline(0)
    }

    /// Progress counter, used by grammar loops to detect lack of progress.
    /// Splicing a reused subtree counts as progress even though no token
    /// index moves.
    pub(crate) fn token_pos(&self) -> usize {
        self.pos + self.reused
    }

    // =========================================================================
    // Token consumption
    // =========================================================================

    fn push_token(&mut self, kind: SyntaxKind) {
        self.fill(0);
        let lexed = &self.tokens[self.pos];
        let token = lexed.token;
        let errors = lexed.errors.clone();
        self.events.push(Event::Token { kind, token });
        self.events.extend(errors.into_iter().map(Event::Error));
        if token.kind != SyntaxKind::EOF {
            self.pos += 1;
        }
    }

    pub(crate) fn bump(&mut self, kind: SyntaxKind) {
        debug_assert_eq!(self.current(), kind);
        self.push_token(kind);
    }

    pub(crate) fn bump_any(&mut self) {
        let kind = self.current();
        self.push_token(kind);
    }

    /// Consume the current token under a different kind (keywords used as names)
    pub(crate) fn bump_remap(&mut self, kind: SyntaxKind) {
        self.push_token(kind);
    }

    pub(crate) fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump(kind);
            true
        } else {
            false
        }
    }

    /// Consume `kind` or leave a zero-width token of that kind behind.
    pub(crate) fn expect(&mut self, kind: SyntaxKind) -> bool {
        if self.eat(kind) {
            true
        } else {
            self.error(format!("{} expected.", kind.describe()));
            self.missing(kind);
            false
        }
    }

    pub(crate) fn missing(&mut self, kind: SyntaxKind) {
        self.events.push(Event::Missing { kind });
    }

    // =========================================================================
    // Rescanning
    // =========================================================================

    fn replace_current(&mut self, token: Token, errors: Vec<SyntaxError>) {
        let old = self.tokens[self.pos].clone();
        let preceded_by_newline = old.preceded_by_newline;
        if self.speculation > 0 {
            self.rescans.push(Rescan {
                index: self.pos,
                old,
            });
        }
        self.tokens.truncate(self.pos);
        self.tokens.push(Lexed {
            token,
            errors,
            preceded_by_newline,
        });
        self.last_trailing_newline = token.trailing.has_newline();
        self.scanner.set_position(token.full_end());
    }

    /// In operator position, merge `>` with the characters that follow it.
    pub(crate) fn rescan_greater(&mut self) -> SyntaxKind {
        let token = self.nth_token(0);
        if token.kind != SyntaxKind::GT {
            return token.kind;
        }
        let resume = self.scanner.position();
        let rescanned = self.scanner.rescan_greater(&token);
        let errors = self.scanner.take_errors();
        if rescanned.kind == SyntaxKind::GT {
            // Tokens after `>` may already be buffered.
            self.scanner.set_position(resume);
        } else {
            self.replace_current(rescanned, errors);
        }
        rescanned.kind
    }

    /// In operand position, turn `/` or `/=` into a regular expression.
    pub(crate) fn rescan_slash(&mut self) -> SyntaxKind {
        let token = self.nth_token(0);
        if !matches!(token.kind, SyntaxKind::SLASH | SyntaxKind::SLASH_EQ) {
            return token.kind;
        }
        let rescanned = self.scanner.rescan_slash_as_regex(&token);
        let errors = self.scanner.take_errors();
        self.replace_current(rescanned, errors);
        rescanned.kind
    }

    // =========================================================================
    // Speculation
    // =========================================================================

    /// Run `f` and roll every effect back, keeping only its answer.
    pub(crate) fn lookahead<T>(&mut self, f: impl FnOnce(&mut Parser<'t>) -> T) -> T {
        let checkpoint = Checkpoint {
            pos: self.pos,
            events: self.events.len(),
            rescans: self.rescans.len(),
        };
        let no_in = self.no_in;
        self.speculation += 1;
        let result = f(self);
        self.speculation -= 1;
        self.rewind(checkpoint);
        self.no_in = no_in;
        result
    }

    fn rewind(&mut self, checkpoint: Checkpoint) {
        self.pos = checkpoint.pos;
        self.events.truncate(checkpoint.events);
        let undone = self.rescans.split_off(checkpoint.rescans);
        if let Some(first) = undone.into_iter().min_by_key(|r| r.index) {
            self.tokens.truncate(first.index);
            self.last_trailing_newline = first.old.token.trailing.has_newline();
            self.scanner.set_position(first.old.token.full_end());
            self.tokens.push(first.old);
        }
    }

    /// Whether errors were reported since the given event count
    pub(crate) fn errors_since(&self, events: usize) -> bool {
        self.events[events..]
            .iter()
            .any(|e| matches!(e, Event::Error(_) | Event::Missing { .. }))
    }

    pub(crate) fn event_count(&self) -> usize {
        self.events.len()
    }

    // =========================================================================
    // Context flags
    // =========================================================================

    pub(crate) fn no_in(&self) -> bool {
        self.no_in
    }

    /// Run `f` with `in` as a binary operator allowed or not.
    pub(crate) fn with_no_in<T>(&mut self, no_in: bool, f: impl FnOnce(&mut Parser<'t>) -> T) -> T {
        let saved = std::mem::replace(&mut self.no_in, no_in);
        let result = f(self);
        self.no_in = saved;
        result
    }

    // =========================================================================
    // Reuse
    // =========================================================================

    /// Take over a node of `category` from the previous tree at the current
    /// position, if the cursor has one that is still valid.
    pub(crate) fn try_reuse(&mut self, category: ReuseCategory) -> bool {
        if self.speculation > 0 || self.cursor.is_none() {
            return false;
        }
        let token = self.nth_token(0);
        if token.kind == SyntaxKind::EOF {
            return false;
        }
        let start = token.full_start;
        let Some(cursor) = self.cursor.as_mut() else {
            return false;
        };
        let Some(index) = cursor.candidate(start, category) else {
            return false;
        };
        let (len, read_len, trailing_newline) = {
            let entry = &cursor.entries()[index];
            (entry.len(), entry.read_len, ends_with_line_break(&entry.green))
        };
        let end = start + len;
        let read_end = start + read_len;

        self.events.push(Event::Reused {
            entry: index as u32,
            start,
        });
        self.scanner.extend_read_extent(read_end);
        self.tokens.truncate(self.pos);
        self.reused += 1;
        self.last_trailing_newline = trailing_newline;
        self.scanner.set_position(end);
        true
    }

    // =========================================================================
    // Error handling
    // =========================================================================

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        let range = self.nth_token(0).range();
        self.events.push(Event::Error(SyntaxError::new(message, range)));
    }

    /// Report an error and wrap the current token in an ERROR node.
    pub(crate) fn err_and_bump(&mut self, message: impl Into<String>) {
        self.error(message);
        if self.at_eof() {
            return;
        }
        let m = self.start();
        self.bump_any();
        m.complete(self, SyntaxKind::ERROR);
    }

    /// Report an error and skip tokens until one in `recovery` (or EOF).
    pub(crate) fn err_recover(&mut self, message: impl Into<String>, recovery: &[SyntaxKind]) {
        self.error(message);
        if self.at_eof() || self.at_any(recovery) {
            return;
        }
        let m = self.start();
        while !self.at_eof() && !self.at_any(recovery) {
            self.bump_any();
        }
        m.complete(self, SyntaxKind::ERROR);
    }

    // =========================================================================
    // Node building helpers
    // =========================================================================

    pub(crate) fn start(&mut self) -> Marker {
        let pos = self.events.len() as u32;
        self.events.push(Event::Start {
            kind: SyntaxKind::TOMBSTONE,
            forward_parent: None,
            reuse: None,
        });
        Marker { pos }
    }
}

/// Whether the last real token of `green` carries a line break in its
/// trailing trivia.
fn ends_with_line_break(green: &rowan::GreenNodeData) -> bool {
    fn walk(node: &rowan::GreenNodeData) -> Option<bool> {
        for child in node.children().rev() {
            match child {
                rowan::NodeOrToken::Node(inner) => {
                    if let Some(answer) = walk(inner) {
                        return Some(answer);
                    }
                }
                rowan::NodeOrToken::Token(token) => {
                    let kind = SyntaxKind::from(token.kind());
                    match kind {
                        SyntaxKind::NEWLINE => return Some(true),
                        SyntaxKind::MULTI_LINE_COMMENT => {
                            if token.text().chars().any(super::chars::is_line_terminator) {
                                return Some(true);
                            }
                        }
                        _ if kind.is_trivia() || token.text().is_empty() => {}
                        _ => return Some(false),
                    }
                }
            }
        }
        None
    }
    walk(green).unwrap_or(false)
}
