//! Event-driven construction of a [`ParseTree`].
//!
//! The parser opens and closes nodes and feeds tokens; nodes are allocated
//! in the arena when they finish, so children always precede parents.

use crate::tree::{
    Diagnostic, Element, ErrorCode, Field, NodeData, NodeId, NodeKind, ParseTree, TokenId,
    TokenSlot,
};
use crate::token::{Position, Span, Token};

/// Marks a spot among the open node's children that a later node can wrap.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkpoint {
    depth: usize,
    children: usize,
}

#[derive(Debug)]
struct OpenNode {
    kind: NodeKind,
    children: Vec<Element>,
    fields: Vec<(Field, u32)>,
    error: Option<(ErrorCode, String)>,
}

impl OpenNode {
    const fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            fields: Vec::new(),
            error: None,
        }
    }
}

/// Maps positions of a reused subtree into the new document.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Shift {
    pub(crate) old_start: Position,
    pub(crate) new_start: Position,
}

impl Shift {
    /// Columns only move on the subtree's first line; later lines keep
    /// their columns because they start after a newline inside the subtree.
    pub(crate) fn apply(&self, pos: Position) -> Position {
        let column = if pos.line == self.old_start.line {
            pos.column + self.new_start.column - self.old_start.column
        } else {
            pos.column
        };
        Position {
            offset: pos.offset + self.new_start.offset - self.old_start.offset,
            line: pos.line + self.new_start.line - self.old_start.line,
            column,
        }
    }

    fn span(&self, span: Span) -> Span {
        Span::new(self.apply(span.start), self.apply(span.end))
    }
}

#[derive(Debug)]
pub(crate) struct TreeBuilder {
    tokens: Vec<Token>,
    token_parents: Vec<Option<TokenSlot>>,
    nodes: Vec<NodeData>,
    stack: Vec<OpenNode>,
    cursor: Position,
    root: Option<NodeId>,
}

impl TreeBuilder {
    pub(crate) const fn new() -> Self {
        Self {
            tokens: Vec::new(),
            token_parents: Vec::new(),
            nodes: Vec::new(),
            stack: Vec::new(),
            cursor: Position::START,
            root: None,
        }
    }

    pub(crate) fn start_node(&mut self, kind: NodeKind) {
        self.stack.push(OpenNode::new(kind));
    }

    /// Open an error node; its diagnostic spans whatever it ends up holding.
    pub(crate) fn start_error(&mut self, code: ErrorCode, message: impl Into<String>) {
        let mut node = OpenNode::new(NodeKind::Error);
        node.error = Some((code, message.into()));
        self.stack.push(node);
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            depth: self.stack.len(),
            children: self.stack.last().map_or(0, |n| n.children.len()),
        }
    }

    /// Open a node that adopts every child added since `checkpoint`.
    pub(crate) fn start_node_at(&mut self, checkpoint: Checkpoint, kind: NodeKind) {
        debug_assert_eq!(checkpoint.depth, self.stack.len(), "checkpoint from another node");
        let mut node = OpenNode::new(kind);
        if let Some(top) = self.stack.last_mut() {
            let at = checkpoint.children.min(top.children.len());
            node.children = top.children.split_off(at);
            let boundary = u32::try_from(at).unwrap_or(u32::MAX);
            let (moved, kept): (Vec<_>, Vec<_>) =
                top.fields.drain(..).partition(|(_, idx)| *idx >= boundary);
            top.fields = kept;
            node.fields = moved
                .into_iter()
                .map(|(field, idx)| (field, idx - boundary))
                .collect();
        }
        self.stack.push(node);
    }

    pub(crate) fn token(&mut self, token: Token) {
        self.cursor = token.span.end;
        let id = TokenId(index_u32(self.tokens.len()));
        self.tokens.push(token);
        self.token_parents.push(None);
        if let Some(top) = self.stack.last_mut() {
            top.children.push(Element::Token(id));
        }
    }

    /// Bind `field` to the most recent non-trivia child of the open node.
    pub(crate) fn label(&mut self, field: Field) {
        let Some(top) = self.stack.last() else {
            return;
        };
        let last = top.children.iter().rposition(|el| match el {
            Element::Node(_) => true,
            Element::Token(id) => !self.tokens[id.index()].kind.is_trivia(),
        });
        if let (Some(idx), Some(top)) = (last, self.stack.last_mut()) {
            let idx = index_u32(idx);
            top.fields.retain(|(_, i)| *i != idx);
            top.fields.push((field, idx));
        }
    }

    pub(crate) fn finish_node(&mut self) -> Option<NodeId> {
        let open = self.stack.pop()?;
        let span = self.span_of(&open.children);
        let id = NodeId(index_u32(self.nodes.len()));
        for (i, child) in open.children.iter().enumerate() {
            let slot = index_u32(i);
            match *child {
                Element::Node(n) => {
                    let data = &mut self.nodes[n.index()];
                    data.parent = Some(id);
                    data.index_in_parent = slot;
                }
                Element::Token(t) => {
                    self.token_parents[t.index()] = Some(TokenSlot {
                        parent: id,
                        index_in_parent: slot,
                    });
                }
            }
        }
        let diagnostic = open.error.map(|(code, message)| Diagnostic {
            code,
            message,
            span,
        });
        self.nodes.push(NodeData {
            kind: open.kind,
            children: open.children,
            fields: open.fields,
            parent: None,
            index_in_parent: 0,
            span,
            diagnostic,
        });
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(Element::Node(id)),
            None => self.root = Some(id),
        }
        Some(id)
    }

    /// Copy `node` out of `old`, moving every position by `shift`.
    pub(crate) fn graft(&mut self, old: &ParseTree, node: NodeId, shift: &Shift) {
        let data = old.data(node);
        let mut open = OpenNode::new(data.kind);
        open.fields.clone_from(&data.fields);
        open.error = data
            .diagnostic
            .as_ref()
            .map(|d| (d.code, d.message.clone()));
        self.stack.push(open);
        for child in &data.children {
            match *child {
                Element::Node(n) => self.graft(old, n, shift),
                Element::Token(t) => {
                    let mut token = old.tokens[t.index()].clone();
                    token.span = shift.span(token.span);
                    self.token(token);
                }
            }
        }
        self.finish_node();
    }

    pub(crate) fn finish(mut self, source: String) -> ParseTree {
        while !self.stack.is_empty() {
            self.finish_node();
        }
        let root = match self.root {
            Some(root) => root,
            None => {
                self.start_node(NodeKind::SourceFile);
                self.finish_node().unwrap_or(NodeId(0))
            }
        };
        let token_slots = self
            .token_parents
            .into_iter()
            .map(|slot| {
                slot.unwrap_or(TokenSlot {
                    parent: root,
                    index_in_parent: 0,
                })
            })
            .collect();
        ParseTree {
            source,
            tokens: self.tokens,
            token_slots,
            nodes: self.nodes,
            root,
        }
    }

    fn span_of(&self, children: &[Element]) -> Span {
        let bounds = |el: &Element| match *el {
            Element::Node(n) => self.nodes[n.index()].span,
            Element::Token(t) => self.tokens[t.index()].span,
        };
        match (children.first(), children.last()) {
            (Some(first), Some(last)) => Span::new(bounds(first).start, bounds(last).end),
            _ => Span::empty(self.cursor),
        }
    }
}

fn index_u32(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}
