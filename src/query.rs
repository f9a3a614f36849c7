//! Editor-facing queries over a parsed tree.

use std::collections::BTreeMap;
use std::fmt;

use crate::token::{Span, TokenKind};
use crate::tree::{Diagnostic, Field, NodeKind, ParseTree, SyntaxElement, SyntaxNode, SyntaxToken};

/// Callbacks for [`walk`]. Every method defaults to doing nothing.
pub trait Visitor<'t> {
    /// Called before a node's children; return `false` to skip them.
    fn enter_node(&mut self, _node: SyntaxNode<'t>) -> bool {
        true
    }

    fn leave_node(&mut self, _node: SyntaxNode<'t>) {}

    fn visit_token(&mut self, _token: SyntaxToken<'t>) {}
}

/// Depth-first traversal of `node` in document order.
pub fn walk<'t, V: Visitor<'t> + ?Sized>(node: SyntaxNode<'t>, visitor: &mut V) {
    if visitor.enter_node(node) {
        for child in node.children() {
            match child {
                SyntaxElement::Node(child) => walk(child, visitor),
                SyntaxElement::Token(token) => visitor.visit_token(token),
            }
        }
    }
    visitor.leave_node(node);
}

// ---------------------------------------------------------------------------
// Highlighting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HighlightClass {
    Comment,
    Directive,
    Keyword,
    Section,
    Property,
    Function,
    Macro,
    Variable,
    AtReference,
    Boolean,
    Number,
    String,
    Escape,
    Operator,
    Punctuation,
    Embedded,
    Error,
}

impl HighlightClass {
    /// Conventional capture name, e.g. `keyword.directive`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Directive => "keyword.directive",
            Self::Keyword => "keyword",
            Self::Section => "type",
            Self::Property => "property",
            Self::Function => "function",
            Self::Macro => "constant.macro",
            Self::Variable => "variable",
            Self::AtReference => "variable.special",
            Self::Boolean => "constant.builtin",
            Self::Number => "number",
            Self::String => "string",
            Self::Escape => "string.escape",
            Self::Operator => "operator",
            Self::Punctuation => "punctuation.bracket",
            Self::Embedded => "embedded",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for HighlightClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub span: Span,
    pub class: HighlightClass,
}

/// Classify every non-whitespace token, in document order.
#[must_use]
pub fn highlights(tree: &ParseTree) -> Vec<Highlight> {
    tree.root()
        .tokens()
        .filter_map(|token| {
            classify(token).map(|class| Highlight {
                span: token.span(),
                class,
            })
        })
        .collect()
}

fn classify(token: SyntaxToken<'_>) -> Option<HighlightClass> {
    let class = match token.kind() {
        TokenKind::Whitespace | TokenKind::LineContinuation => return None,
        TokenKind::Comment => HighlightClass::Comment,
        TokenKind::Directive(_) => HighlightClass::Directive,
        TokenKind::Keyword => HighlightClass::Keyword,
        TokenKind::Identifier => classify_identifier(token),
        TokenKind::Boolean => HighlightClass::Boolean,
        TokenKind::Number | TokenKind::NumberFormat => HighlightClass::Number,
        TokenKind::Quote(_) | TokenKind::StringFragment => HighlightClass::String,
        TokenKind::EscapeSequence => HighlightClass::Escape,
        TokenKind::Operator | TokenKind::WordOperator => HighlightClass::Operator,
        TokenKind::AtSign
        | TokenKind::AtReferenceName
        | TokenKind::AngleOpen
        | TokenKind::AngleClose
        | TokenKind::SquareOpen
        | TokenKind::SquareClose => HighlightClass::AtReference,
        TokenKind::EmbeddedOpen | TokenKind::EmbeddedClose => HighlightClass::Embedded,
        TokenKind::OpenBrace
        | TokenKind::CloseBrace
        | TokenKind::OpenParen
        | TokenKind::CloseParen
        | TokenKind::OpenBracket
        | TokenKind::CloseBracket
        | TokenKind::Comma => HighlightClass::Punctuation,
        TokenKind::Error(_) => HighlightClass::Error,
    };
    Some(class)
}

/// Identifiers are colored by the role their parent gives them.
fn classify_identifier(token: SyntaxToken<'_>) -> HighlightClass {
    let parent = token.parent();
    match (parent.kind(), token.field()) {
        (NodeKind::SectionStatement | NodeKind::Group, Some(Field::Name)) => {
            HighlightClass::Section
        }
        (NodeKind::KeyValue, Some(Field::Key)) | (NodeKind::IdentifierString, Some(Field::Name)) => {
            HighlightClass::Property
        }
        (
            NodeKind::Call | NodeKind::Traps | NodeKind::Window | NodeKind::Command,
            Some(Field::Name),
        ) => HighlightClass::Function,
        (NodeKind::DirectiveStatement, Some(Field::Name)) => HighlightClass::Macro,
        _ => HighlightClass::Variable,
    }
}

// ---------------------------------------------------------------------------
// Folding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FoldKind {
    Section,
    Group,
    Conditional,
    Embedded,
}

/// A foldable region, 1-based inclusive lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldingRange {
    pub start_line: usize,
    pub end_line: usize,
    pub kind: FoldKind,
}

/// Sections, groups, conditional arms and embedded blocks spanning more
/// than one line.
#[must_use]
pub fn folding_ranges(tree: &ParseTree) -> Vec<FoldingRange> {
    tree.root()
        .descendants()
        .filter_map(|node| {
            let kind = match node.kind() {
                NodeKind::SectionStatement => FoldKind::Section,
                NodeKind::ElectrodeGroup
                | NodeKind::Group
                | NodeKind::Call
                | NodeKind::Traps
                | NodeKind::TrapsMember => FoldKind::Group,
                NodeKind::DirectiveStatement
                    if node.child_by_field(Field::Condition).is_some() =>
                {
                    FoldKind::Conditional
                }
                NodeKind::ElifClause | NodeKind::ElseClause => FoldKind::Conditional,
                NodeKind::EmbeddedBlock => FoldKind::Embedded,
                _ => return None,
            };
            let span = node.span();
            (span.end.line > span.start.line).then_some(FoldingRange {
                start_line: span.start.line,
                end_line: span.end.line,
                kind,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// At-references
// ---------------------------------------------------------------------------

/// Every `@name@` in a tree, grouped by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtReferenceIndex {
    references: BTreeMap<String, Vec<Span>>,
}

impl AtReferenceIndex {
    #[must_use]
    pub fn build(tree: &ParseTree) -> Self {
        let mut index = Self::default();
        walk(tree.root(), &mut index);
        index
    }

    /// Spans of the `@name@` nodes for `name`, in document order.
    #[must_use]
    pub fn references(&self, name: &str) -> &[Span] {
        self.references.get(name).map_or(&[], Vec::as_slice)
    }

    /// Referenced names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.references.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.references.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

impl<'t> Visitor<'t> for AtReferenceIndex {
    fn enter_node(&mut self, node: SyntaxNode<'t>) -> bool {
        if let Some(name) = node.at_reference_name() {
            self.references
                .entry(name.to_string())
                .or_default()
                .push(node.span());
            return false;
        }
        true
    }
}

/// All diagnostics, ordered by position.
#[must_use]
pub fn diagnostics(tree: &ParseTree) -> Vec<Diagnostic> {
    let mut all: Vec<_> = tree.diagnostics().cloned().collect();
    all.sort_by_key(|d| (d.span.start.offset, d.span.end.offset));
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn walk_visits_every_token() {
        struct Count(usize);
        impl Visitor<'_> for Count {
            fn visit_token(&mut self, _token: SyntaxToken<'_>) {
                self.0 += 1;
            }
        }
        let tree = parse("File { Grid = \"a\" }\n").expect("parse");
        let mut count = Count(0);
        walk(tree.root(), &mut count);
        assert_eq!(count.0, tree.tokens().len());
    }

    #[test]
    fn identifier_roles() {
        let tree = parse("Physics { Mobility(DopingDep) Temperature = 300 }").expect("parse");
        let classes: Vec<_> = highlights(&tree)
            .into_iter()
            .filter(|h| h.class != HighlightClass::Punctuation)
            .map(|h| (&tree.source()[h.span.byte_range()], h.class))
            .collect();
        assert_eq!(
            classes,
            vec![
                ("Physics", HighlightClass::Section),
                ("Mobility", HighlightClass::Function),
                ("DopingDep", HighlightClass::Variable),
                ("Temperature", HighlightClass::Property),
                ("=", HighlightClass::Operator),
                ("300", HighlightClass::Number),
            ]
        );
    }

    #[test]
    fn folds_multiline_only() {
        let tree = parse("File { A }\nPhysics {\n  Mobility(\n    DopingDep\n  )\n}\n")
            .expect("parse");
        assert_eq!(
            folding_ranges(&tree),
            vec![
                FoldingRange {
                    start_line: 2,
                    end_line: 6,
                    kind: FoldKind::Section
                },
                FoldingRange {
                    start_line: 3,
                    end_line: 5,
                    kind: FoldKind::Group
                },
            ]
        );
    }

    #[test]
    fn at_reference_index() {
        let tree = parse("#setdep @node|sdevice@\nFile { Grid = \"n@node@_msh.tdr\" Plot = @plot@ }\n")
            .expect("parse");
        let index = AtReferenceIndex::build(&tree);
        assert_eq!(index.names().collect::<Vec<_>>(), ["node", "node|sdevice", "plot"]);
        let spans = index.references("node");
        assert_eq!(spans.len(), 1);
        assert_eq!(&tree.source()[spans[0].byte_range()], "@node@");
        assert!(index.references("missing").is_empty());
    }

    #[test]
    fn diagnostics_are_sorted() {
        let tree = parse("File { A = }\n}\n").expect("parse");
        let all = diagnostics(&tree);
        assert_eq!(all.len(), 2);
        assert!(all[0].span.start.offset < all[1].span.start.offset);
    }
}
