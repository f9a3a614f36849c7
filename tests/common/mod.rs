#![allow(dead_code)]

use sdevice_syntax::{
    Edit, ErrorCode, NodeKind, ParseTree, Position, SyntaxElement, SyntaxNode, parse, reparse,
};

/// Parse `input`, check the tokens reproduce it, and check a no-op
/// reparse gives the same tree.
pub fn roundtrip(input: &str) -> ParseTree {
    let tree = parse(input).expect("parse failed");
    let output = tree.source_text();
    assert_eq!(
        output, input,
        "round-trip mismatch:\n--- expected ---\n{input}\n--- got ---\n{output}"
    );
    assert_well_formed(&tree);
    let again = reparse(&tree, &[], input).expect("reparse failed");
    assert!(again == tree, "no-op reparse changed the tree for:\n{input}");
    tree
}

/// Parse `input` and require it to be free of error nodes.
pub fn parse_clean(input: &str) -> ParseTree {
    let tree = roundtrip(input);
    let diagnostics: Vec<_> = tree.diagnostics().collect();
    assert!(
        diagnostics.is_empty(),
        "unexpected diagnostics {diagnostics:?} in:\n{input}"
    );
    tree
}

/// Error codes in document order.
pub fn codes(tree: &ParseTree) -> Vec<ErrorCode> {
    tree.diagnostics().map(|d| d.code).collect()
}

/// First node of `kind` in pre-order.
pub fn find(tree: &ParseTree, kind: NodeKind) -> SyntaxNode<'_> {
    tree.root()
        .descendants()
        .find(|n| n.kind() == kind)
        .unwrap_or_else(|| panic!("no {kind} node in:\n{}", tree.source()))
}

/// Every node of `kind` in pre-order.
pub fn find_all(tree: &ParseTree, kind: NodeKind) -> Vec<SyntaxNode<'_>> {
    tree.root()
        .descendants()
        .filter(|n| n.kind() == kind)
        .collect()
}

/// Kinds of the top-level statements.
pub fn statement_kinds(tree: &ParseTree) -> Vec<NodeKind> {
    tree.root().child_nodes().map(|n| n.kind()).collect()
}

/// Replace `start..end` of `old_text` with `replacement`, reparse, and
/// check the result against a fresh parse of the new text.
pub fn assert_edit(old_text: &str, start: usize, end: usize, replacement: &str) -> ParseTree {
    let old = parse(old_text).expect("parse failed");
    let edit = Edit::replace(start, end, replacement);
    let new_text = edit
        .apply(old_text, replacement)
        .expect("edit does not fit the text");
    let incremental = reparse(&old, &[edit], &new_text).expect("reparse failed");
    let fresh = parse(&new_text).expect("parse failed");
    assert!(
        incremental == fresh,
        "reparse differs from fresh parse:\n--- old ---\n{old_text}\n--- new ---\n{new_text}\n\
         --- incremental ---\n{}\n--- fresh ---\n{}",
        sdevice_syntax::to_sexp(&incremental),
        sdevice_syntax::to_sexp(&fresh),
    );
    incremental
}

/// Check the structural guarantees every tree makes: tokens tile the
/// source with correct positions, children tile their parent, and parent
/// links agree with child lists.
pub fn assert_well_formed(tree: &ParseTree) {
    let source = tree.source();
    let mut expected = Position::START;
    for token in tree.tokens() {
        assert_eq!(
            token.span.start, expected,
            "token {:?} does not start where the previous one ended",
            token.text
        );
        assert_eq!(&source[token.span.byte_range()], token.text);
        for ch in token.text.chars() {
            expected.offset += ch.len_utf8();
            if ch == '\n' {
                expected.line += 1;
                expected.column = 1;
            } else {
                expected.column += 1;
            }
        }
        assert_eq!(token.span.end, expected, "bad end position for {:?}", token.text);
    }
    assert_eq!(expected.offset, source.len());

    let root = tree.root();
    assert_eq!(root.kind(), NodeKind::SourceFile);
    assert!(root.parent().is_none());
    assert_eq!(root.byte_range(), 0..source.len());
    check_node(root);
}

fn check_node(node: SyntaxNode<'_>) {
    let span = node.span();
    let mut at = span.start;
    for (index, child) in node.children().enumerate() {
        assert_eq!(
            child.parent().map(|p| p.id()),
            Some(node.id()),
            "child {index} of {} has the wrong parent",
            node.kind()
        );
        let child_span = child.span();
        assert_eq!(
            child_span.start,
            at,
            "gap before child {index} of {}",
            node.kind()
        );
        at = child_span.end;
        match child {
            SyntaxElement::Node(child) => {
                assert_eq!(child.index_in_parent(), index);
                check_node(child);
            }
            SyntaxElement::Token(token) => assert_eq!(token.index_in_parent(), index),
        }
    }
    assert_eq!(at, span.end, "children of {} stop short", node.kind());
    let text: String = node.tokens().map(|t| t.text()).collect();
    assert_eq!(text, node.text());
}
