//! Turns parser events into a green tree.
//!
//! Trivia is materialized here: each token event only carries packed trivia
//! widths, and [`scan_trivia`] splits them into WHITESPACE / NEWLINE /
//! comment tokens around the token text.

use std::mem;

use rowan::{GreenNode, GreenToken, NodeOrToken, TextRange, TextSize};

use super::parser::Event;
use super::scanner::{Token, scan_trivia};
use super::syntax_kind::SyntaxKind;
use super::tree::{ReusableNode, ReuseCategory, SyntaxError};

type GreenElement = NodeOrToken<GreenNode, GreenToken>;

pub(crate) struct SinkOutput {
    pub green: GreenNode,
    pub errors: Vec<SyntaxError>,
    pub reuse: Vec<ReusableNode>,
    pub stats: SinkStats,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SinkStats {
    pub total_nodes: u32,
    pub reused_subtrees: u32,
    pub reused_nodes: u32,
}

struct Frame {
    kind: SyntaxKind,
    first_child: usize,
    start: TextSize,
    first_error: usize,
    reuse: Option<(ReuseCategory, usize)>,
    nodes_before: u32,
}

struct TreeSink<'a> {
    text: &'a str,
    old_entries: &'a [ReusableNode],
    children: Vec<GreenElement>,
    stack: Vec<Frame>,
    offset: TextSize,
    errors: Vec<SyntaxError>,
    reuse: Vec<Option<ReusableNode>>,
    stats: SinkStats,
}

pub(crate) fn build(text: &str, mut events: Vec<Event>, old_entries: &[ReusableNode]) -> SinkOutput {
    let mut sink = TreeSink {
        text,
        old_entries,
        children: Vec::new(),
        stack: Vec::new(),
        offset: TextSize::new(0),
        errors: Vec::new(),
        reuse: Vec::new(),
        stats: SinkStats::default(),
    };

    let mut forward_kinds = Vec::new();
    for i in 0..events.len() {
        match mem::replace(&mut events[i], Event::Tombstone) {
            Event::Start {
                kind,
                forward_parent,
                reuse,
            } => {
                // Preceded nodes were opened later but must start first
                forward_kinds.push((kind, reuse));
                let mut idx = i;
                let mut fp = forward_parent;
                while let Some(fwd) = fp {
                    idx += fwd as usize;
                    fp = match mem::replace(&mut events[idx], Event::Tombstone) {
                        Event::Start {
                            kind,
                            forward_parent,
                            reuse,
                        } => {
                            forward_kinds.push((kind, reuse));
                            forward_parent
                        }
                        _ => None,
                    };
                }
                for (kind, reuse) in forward_kinds.drain(..).rev() {
                    if kind != SyntaxKind::TOMBSTONE {
                        sink.start_node(kind, reuse);
                    }
                }
            }
            Event::Finish { read_extent } => sink.finish_node(read_extent),
            Event::Token { kind, token } => sink.token(kind, &token),
            Event::Missing { kind } => sink.missing(kind),
            Event::Error(error) => sink.errors.push(error),
            Event::Reused { entry, start } => sink.reused(entry as usize, start),
            Event::Tombstone => {}
        }
    }

    sink.finish()
}

impl TreeSink<'_> {
    fn start_node(&mut self, kind: SyntaxKind, reuse: Option<ReuseCategory>) {
        let reuse = reuse.map(|category| {
            self.reuse.push(None);
            (category, self.reuse.len() - 1)
        });
        self.stack.push(Frame {
            kind,
            first_child: self.children.len(),
            start: self.offset,
            first_error: self.errors.len(),
            reuse,
            nodes_before: self.stats.total_nodes,
        });
        self.stats.total_nodes += 1;
    }

    fn finish_node(&mut self, read_extent: TextSize) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let children: Vec<GreenElement> = self.children.drain(frame.first_child..).collect();
        let node = GreenNode::new(frame.kind.into(), children);

        if let Some((category, slot)) = frame.reuse
            && node.text_len() > TextSize::new(0)
        {
            // Only nodes whose errors lie inside them are reusable
            let range = TextRange::at(frame.start, node.text_len());
            let errors: Option<Vec<SyntaxError>> = self.errors[frame.first_error..]
                .iter()
                .map(|e| {
                    if range.contains_range(e.range) {
                        e.shifted_back(frame.start)
                    } else {
                        None
                    }
                })
                .collect();
            if let Some(errors) = errors {
                self.reuse[slot] = Some(ReusableNode {
                    start: frame.start,
                    category,
                    green: node.clone(),
                    read_len: read_extent.max(self.offset) - frame.start,
                    errors,
                    node_count: self.stats.total_nodes - frame.nodes_before,
                });
            }
        }

        self.children.push(NodeOrToken::Node(node));
    }

    fn trivia(&mut self, range: TextRange) {
        if range.is_empty() {
            return;
        }
        for piece in scan_trivia(self.text, range) {
            let text = &self.text[piece.range];
            self.children
                .push(NodeOrToken::Token(GreenToken::new(piece.kind.into(), text)));
        }
        self.offset = range.end();
    }

    fn token(&mut self, kind: SyntaxKind, token: &Token) {
        self.trivia(token.leading_range());
        let text = &self.text[token.range()];
        self.children
            .push(NodeOrToken::Token(GreenToken::new(kind.into(), text)));
        self.offset = token.end();
        self.trivia(token.trailing_range());
    }

    fn missing(&mut self, kind: SyntaxKind) {
        self.children
            .push(NodeOrToken::Token(GreenToken::new(kind.into(), "")));
    }

    fn reused(&mut self, index: usize, start: TextSize) {
        let old_entries = self.old_entries;
        let Some(entry) = old_entries.get(index) else {
            return;
        };
        let old_end = entry.end();

        self.errors
            .extend(entry.errors.iter().map(|e| e.shifted(start)));

        // The entry and everything nested inside it stay reusable
        let nested = old_entries[index..]
            .iter()
            .take_while(|e| e.start < old_end);
        for old in nested {
            let relative = old.start - entry.start;
            self.reuse.push(Some(ReusableNode {
                start: start + relative,
                ..old.clone()
            }));
        }

        self.stats.reused_subtrees += 1;
        self.stats.reused_nodes += entry.node_count;
        self.stats.total_nodes += entry.node_count;
        self.children.push(NodeOrToken::Node(entry.green.clone()));
        self.offset = start + entry.len();
    }

    fn finish(mut self) -> SinkOutput {
        // Unbalanced starts only happen on a grammar bug; close them anyway
        while !self.stack.is_empty() {
            let offset = self.offset;
            self.finish_node(offset);
        }
        let green = match self.children.pop() {
            Some(NodeOrToken::Node(node)) if self.children.is_empty() => node,
            Some(other) => {
                self.children.push(other);
                let children = mem::take(&mut self.children);
                GreenNode::new(SyntaxKind::SOURCE_FILE.into(), children)
            }
            None => GreenNode::new(SyntaxKind::SOURCE_FILE.into(), Vec::<GreenElement>::new()),
        };
        SinkOutput {
            green,
            errors: self.errors,
            reuse: self.reuse.into_iter().flatten().collect(),
            stats: self.stats,
        }
    }
}
