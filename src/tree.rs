//! Arena-backed lossless syntax tree.
//!
//! Nodes live in a flat arena owned by [`ParseTree`] and are addressed by
//! [`NodeId`]; tokens are addressed by [`TokenId`]. [`SyntaxNode`] and
//! [`SyntaxToken`] are cheap `Copy` handles that borrow the tree.

use std::fmt;
use std::ops::Range;

use crate::directive::DirectiveKind;
use crate::lexer::LexErrorKind;
use crate::token::{Position, Span, Token, TokenKind};

/// Index of a node in its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

/// Index of a token in its tree's token list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(pub(crate) u32);

impl NodeId {
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl TokenId {
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A child slot: either a nested node or a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Element {
    Node(NodeId),
    Token(TokenId),
}

/// The closed set of node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    SourceFile,
    DirectiveStatement,
    DirectiveBody,
    ElifClause,
    ElseClause,
    SectionStatement,
    SectionBody,
    KeyValue,
    ValueList,
    VoltageAtTime,
    ElectrodeGroup,
    Call,
    ArgumentList,
    Traps,
    TrapsMember,
    IdentifierString,
    SlashPair,
    Position,
    Window,
    Group,
    UnaryExpression,
    BinaryExpression,
    TernaryExpression,
    ParenthesizedExpression,
    String,
    AtReference,
    AtAngleExpression,
    AtSquareExpression,
    CommandSubstitution,
    Command,
    EmbeddedBlock,
    Error,
}

impl NodeKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SourceFile => "source_file",
            Self::DirectiveStatement => "directive_statement",
            Self::DirectiveBody => "directive_body",
            Self::ElifClause => "elif_clause",
            Self::ElseClause => "else_clause",
            Self::SectionStatement => "section_statement",
            Self::SectionBody => "section_body",
            Self::KeyValue => "key_value",
            Self::ValueList => "value_list",
            Self::VoltageAtTime => "voltage_at_time",
            Self::ElectrodeGroup => "electrode_group",
            Self::Call => "call",
            Self::ArgumentList => "argument_list",
            Self::Traps => "traps",
            Self::TrapsMember => "traps_member",
            Self::IdentifierString => "identifier_string",
            Self::SlashPair => "slash_pair",
            Self::Position => "position",
            Self::Window => "window",
            Self::Group => "group",
            Self::UnaryExpression => "unary_expression",
            Self::BinaryExpression => "binary_expression",
            Self::TernaryExpression => "ternary_expression",
            Self::ParenthesizedExpression => "parenthesized_expression",
            Self::String => "string",
            Self::AtReference => "at_reference",
            Self::AtAngleExpression => "at_angle_expression",
            Self::AtSquareExpression => "at_square_expression",
            Self::CommandSubstitution => "command_substitution",
            Self::Command => "command",
            Self::EmbeddedBlock => "embedded_block",
            Self::Error => "error",
        }
    }

    /// Expression node kinds (literal tokens are expressions too).
    #[must_use]
    pub const fn is_expression(self) -> bool {
        matches!(
            self,
            Self::UnaryExpression
                | Self::BinaryExpression
                | Self::TernaryExpression
                | Self::ParenthesizedExpression
                | Self::String
                | Self::AtReference
                | Self::AtAngleExpression
                | Self::AtSquareExpression
                | Self::CommandSubstitution
                | Self::EmbeddedBlock
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Names binding a node's child to a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Key,
    Value,
    Range,
    Body,
    Args,
    Directive,
    Condition,
    Consequence,
    Alternative,
    End,
    Left,
    Operator,
    Right,
    Operand,
    Voltage,
    Time,
    Expression,
    Command,
}

impl Field {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Key => "key",
            Self::Value => "value",
            Self::Range => "range",
            Self::Body => "body",
            Self::Args => "args",
            Self::Directive => "directive",
            Self::Condition => "condition",
            Self::Consequence => "consequence",
            Self::Alternative => "alternative",
            Self::End => "end",
            Self::Left => "left",
            Self::Operator => "operator",
            Self::Right => "right",
            Self::Operand => "operand",
            Self::Voltage => "voltage",
            Self::Time => "time",
            Self::Expression => "expression",
            Self::Command => "command",
        }
    }
}

/// Known section names; anything else parses as a generic section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    File,
    Electrode,
    Physics,
    Plot,
    CurrentPlot,
    Other,
}

impl SectionKind {
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "File" => Self::File,
            "Electrode" => Self::Electrode,
            "Physics" => Self::Physics,
            "Plot" => Self::Plot,
            "CurrentPlot" => Self::CurrentPlot,
            _ => Self::Other,
        }
    }
}

/// Diagnostic code carried by an error node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Lex(LexErrorKind),
    UnexpectedToken,
    MissingValue,
    UnmatchedDirective,
    UnbalancedDelimiter,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex(kind) => write!(f, "{kind}"),
            Self::UnexpectedToken => write!(f, "unexpected token"),
            Self::MissingValue => write!(f, "missing value"),
            Self::UnmatchedDirective => write!(f, "unmatched directive"),
            Self::UnbalancedDelimiter => write!(f, "unbalanced delimiter"),
        }
    }
}

/// A problem recorded on an error node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub message: String,
    pub span: Span,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.span.start.line, self.span.start.column, self.code, self.message
        )
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) children: Vec<Element>,
    pub(crate) fields: Vec<(Field, u32)>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) index_in_parent: u32,
    pub(crate) span: Span,
    pub(crate) diagnostic: Option<Diagnostic>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct TokenSlot {
    pub(crate) parent: NodeId,
    pub(crate) index_in_parent: u32,
}

/// Result of a parse: source text, tokens and node arena.
#[derive(Debug, Clone)]
pub struct ParseTree {
    pub(crate) source: String,
    pub(crate) tokens: Vec<Token>,
    pub(crate) token_slots: Vec<TokenSlot>,
    pub(crate) nodes: Vec<NodeData>,
    pub(crate) root: NodeId,
}

impl ParseTree {
    #[must_use]
    pub const fn root(&self) -> SyntaxNode<'_> {
        SyntaxNode {
            tree: self,
            id: self.root,
        }
    }

    /// The text this tree was parsed from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Every token in document order, trivia included.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Concatenate the text of every leaf token.
    ///
    /// Always equal to [`ParseTree::source`].
    #[must_use]
    pub fn source_text(&self) -> String {
        self.root().tokens().map(|t| t.text()).collect()
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> SyntaxNode<'_> {
        SyntaxNode { tree: self, id }
    }

    #[must_use]
    pub fn token(&self, id: TokenId) -> SyntaxToken<'_> {
        SyntaxToken { tree: self, id }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Diagnostics of all error nodes in document order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.root()
            .descendants()
            .filter_map(|node| self.nodes[node.id.index()].diagnostic.as_ref())
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics().next().is_some()
    }

    /// Compare shape, kinds, fields, token text and positions, ignoring
    /// arena layout.
    #[must_use]
    pub fn structurally_eq(&self, other: &Self) -> bool {
        self.source == other.source && nodes_eq(self.root(), other.root())
    }

    pub(crate) fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }
}

impl PartialEq for ParseTree {
    fn eq(&self, other: &Self) -> bool {
        self.structurally_eq(other)
    }
}

impl Eq for ParseTree {}

fn nodes_eq(a: SyntaxNode<'_>, b: SyntaxNode<'_>) -> bool {
    let (da, db) = (a.data(), b.data());
    if da.kind != db.kind
        || da.fields != db.fields
        || da.span != db.span
        || da.diagnostic != db.diagnostic
        || da.children.len() != db.children.len()
    {
        return false;
    }
    a.children().zip(b.children()).all(|pair| match pair {
        (SyntaxElement::Node(x), SyntaxElement::Node(y)) => nodes_eq(x, y),
        (SyntaxElement::Token(x), SyntaxElement::Token(y)) => x.token() == y.token(),
        _ => false,
    })
}

/// Handle to a node inside a [`ParseTree`].
#[derive(Clone, Copy)]
pub struct SyntaxNode<'t> {
    tree: &'t ParseTree,
    id: NodeId,
}

impl fmt::Debug for SyntaxNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:?}", self.kind(), self.byte_range())
    }
}

impl PartialEq for SyntaxNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for SyntaxNode<'_> {}

impl<'t> SyntaxNode<'t> {
    fn data(&self) -> &'t NodeData {
        self.tree.data(self.id)
    }

    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub const fn tree(&self) -> &'t ParseTree {
        self.tree
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.data().kind
    }

    #[must_use]
    pub fn span(&self) -> Span {
        self.data().span
    }

    #[must_use]
    pub fn byte_range(&self) -> Range<usize> {
        self.data().span.byte_range()
    }

    #[must_use]
    pub fn start(&self) -> Position {
        self.data().span.start
    }

    #[must_use]
    pub fn end(&self) -> Position {
        self.data().span.end
    }

    /// Source text covered by this node, trivia between children included.
    #[must_use]
    pub fn text(&self) -> &'t str {
        &self.tree.source[self.byte_range()]
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.data().kind == NodeKind::Error
    }

    #[must_use]
    pub fn diagnostic(&self) -> Option<&'t Diagnostic> {
        self.data().diagnostic.as_ref()
    }

    /// Whether this node or any descendant is an error node.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.descendants().any(|n| n.is_error())
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    #[must_use]
    pub fn child(&self, index: usize) -> Option<SyntaxElement<'t>> {
        self.data()
            .children
            .get(index)
            .map(|&el| SyntaxElement::from_element(self.tree, el))
    }

    /// All children, trivia tokens included.
    pub fn children(&self) -> impl Iterator<Item = SyntaxElement<'t>> + use<'t> {
        let tree = self.tree;
        self.data()
            .children
            .iter()
            .map(move |&el| SyntaxElement::from_element(tree, el))
    }

    /// Children that are nodes.
    pub fn child_nodes(&self) -> impl Iterator<Item = SyntaxNode<'t>> + use<'t> {
        self.children().filter_map(SyntaxElement::into_node)
    }

    /// Children that are not trivia.
    pub fn significant_children(&self) -> impl Iterator<Item = SyntaxElement<'t>> + use<'t> {
        self.children().filter(|el| !el.is_trivia())
    }

    #[must_use]
    pub fn child_by_field(&self, field: Field) -> Option<SyntaxElement<'t>> {
        self.data()
            .fields
            .iter()
            .find(|(f, _)| *f == field)
            .and_then(|&(_, idx)| self.child(idx as usize))
    }

    /// Shorthand for a field bound to a node.
    #[must_use]
    pub fn node_by_field(&self, field: Field) -> Option<Self> {
        self.child_by_field(field).and_then(SyntaxElement::into_node)
    }

    /// Shorthand for a field bound to a token.
    #[must_use]
    pub fn token_by_field(&self, field: Field) -> Option<SyntaxToken<'t>> {
        self.child_by_field(field).and_then(SyntaxElement::into_token)
    }

    /// The field name binding the child at `index`, if any.
    #[must_use]
    pub fn field_of(&self, index: usize) -> Option<Field> {
        self.data()
            .fields
            .iter()
            .find(|(_, idx)| *idx as usize == index)
            .map(|(f, _)| *f)
    }

    /// `(field, child)` pairs in child order.
    pub fn fields(&self) -> impl Iterator<Item = (Field, SyntaxElement<'t>)> + use<'t> {
        let node = *self;
        let mut pairs = self.data().fields.clone();
        pairs.sort_by_key(|(_, idx)| *idx);
        pairs
            .into_iter()
            .filter_map(move |(f, idx)| node.child(idx as usize).map(|c| (f, c)))
    }

    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.data().parent.map(|id| Self {
            tree: self.tree,
            id,
        })
    }

    /// Index of this node among its parent's children.
    #[must_use]
    pub fn index_in_parent(&self) -> usize {
        self.data().index_in_parent as usize
    }

    #[must_use]
    pub fn next_sibling(&self) -> Option<SyntaxElement<'t>> {
        self.parent()?.child(self.index_in_parent() + 1)
    }

    #[must_use]
    pub fn prev_sibling(&self) -> Option<SyntaxElement<'t>> {
        let index = self.index_in_parent().checked_sub(1)?;
        self.parent()?.child(index)
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = SyntaxNode<'t>> + use<'t> {
        std::iter::successors(self.parent(), SyntaxNode::parent)
    }

    /// This node and all nested nodes in pre-order.
    pub fn descendants(&self) -> impl Iterator<Item = SyntaxNode<'t>> + use<'t> {
        let mut stack = vec![*self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            let before = stack.len();
            stack.extend(node.child_nodes());
            stack[before..].reverse();
            Some(node)
        })
    }

    /// Every token in this subtree in document order.
    pub fn tokens(&self) -> impl Iterator<Item = SyntaxToken<'t>> + use<'t> {
        let mut stack = vec![SyntaxElement::Node(*self)];
        std::iter::from_fn(move || {
            loop {
                match stack.pop()? {
                    SyntaxElement::Token(token) => return Some(token),
                    SyntaxElement::Node(node) => {
                        let before = stack.len();
                        stack.extend(node.children());
                        stack[before..].reverse();
                    }
                }
            }
        })
    }

    /// First non-trivia token of this subtree.
    #[must_use]
    pub fn first_token(&self) -> Option<SyntaxToken<'t>> {
        self.tokens().find(|t| !t.kind().is_trivia())
    }

    /// Section kind of a `section_statement`, from its name.
    #[must_use]
    pub fn section_kind(&self) -> Option<SectionKind> {
        if self.kind() != NodeKind::SectionStatement {
            return None;
        }
        let name = self.token_by_field(Field::Name)?;
        Some(SectionKind::from_name(name.text()))
    }

    /// Directive keyword of a `directive_statement` or clause.
    #[must_use]
    pub fn directive_kind(&self) -> Option<DirectiveKind> {
        match self.token_by_field(Field::Directive)?.kind() {
            TokenKind::Directive(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Name between the delimiters of an `at_reference`.
    #[must_use]
    pub fn at_reference_name(&self) -> Option<&'t str> {
        if self.kind() != NodeKind::AtReference {
            return None;
        }
        Some(self.token_by_field(Field::Name).map_or("", |t| t.text()))
    }
}

/// Handle to a token inside a [`ParseTree`].
#[derive(Clone, Copy)]
pub struct SyntaxToken<'t> {
    tree: &'t ParseTree,
    id: TokenId,
}

impl fmt::Debug for SyntaxToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}@{:?}", self.kind().name(), self.text(), self.span().byte_range())
    }
}

impl PartialEq for SyntaxToken<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for SyntaxToken<'_> {}

impl<'t> SyntaxToken<'t> {
    #[must_use]
    pub const fn id(&self) -> TokenId {
        self.id
    }

    #[must_use]
    pub fn token(&self) -> &'t Token {
        &self.tree.tokens[self.id.index()]
    }

    #[must_use]
    pub fn kind(&self) -> &'t TokenKind {
        &self.token().kind
    }

    #[must_use]
    pub fn text(&self) -> &'t str {
        &self.token().text
    }

    #[must_use]
    pub fn span(&self) -> Span {
        self.token().span
    }

    #[must_use]
    pub fn parent(&self) -> SyntaxNode<'t> {
        SyntaxNode {
            tree: self.tree,
            id: self.tree.token_slots[self.id.index()].parent,
        }
    }

    #[must_use]
    pub fn index_in_parent(&self) -> usize {
        self.tree.token_slots[self.id.index()].index_in_parent as usize
    }

    /// Field binding this token in its parent, if any.
    #[must_use]
    pub fn field(&self) -> Option<Field> {
        self.parent().field_of(self.index_in_parent())
    }

    #[must_use]
    pub fn next_sibling(&self) -> Option<SyntaxElement<'t>> {
        self.parent().child(self.index_in_parent() + 1)
    }

    #[must_use]
    pub fn prev_sibling(&self) -> Option<SyntaxElement<'t>> {
        let index = self.index_in_parent().checked_sub(1)?;
        self.parent().child(index)
    }
}

/// Either a node or a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxElement<'t> {
    Node(SyntaxNode<'t>),
    Token(SyntaxToken<'t>),
}

impl<'t> SyntaxElement<'t> {
    const fn from_element(tree: &'t ParseTree, el: Element) -> Self {
        match el {
            Element::Node(id) => Self::Node(SyntaxNode { tree, id }),
            Element::Token(id) => Self::Token(SyntaxToken { tree, id }),
        }
    }

    #[must_use]
    pub fn into_node(self) -> Option<SyntaxNode<'t>> {
        match self {
            Self::Node(n) => Some(n),
            Self::Token(_) => None,
        }
    }

    #[must_use]
    pub fn into_token(self) -> Option<SyntaxToken<'t>> {
        match self {
            Self::Token(t) => Some(t),
            Self::Node(_) => None,
        }
    }

    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Node(n) => n.span(),
            Self::Token(t) => t.span(),
        }
    }

    #[must_use]
    pub fn text(&self) -> &'t str {
        match self {
            Self::Node(n) => n.text(),
            Self::Token(t) => t.text(),
        }
    }

    /// Node kind name or token kind name.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Node(n) => n.kind().name(),
            Self::Token(t) => t.kind().name(),
        }
    }

    #[must_use]
    pub fn is_trivia(&self) -> bool {
        matches!(self, Self::Token(t) if t.kind().is_trivia())
    }

    #[must_use]
    pub fn parent(&self) -> Option<SyntaxNode<'t>> {
        match self {
            Self::Node(n) => n.parent(),
            Self::Token(t) => Some(t.parent()),
        }
    }
}
