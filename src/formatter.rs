//! S-expression printer for syntax trees.
//!
//! Nodes print as `(kind field: child ...)`. Trivia and bare punctuation
//! are left out; tokens that carry a field or a meaningful kind print as
//! `(kind "text")`.

use std::fmt::Write;

use crate::token::TokenKind;
use crate::tree::{ParseTree, SyntaxElement, SyntaxNode, SyntaxToken};

/// Render the whole tree on a single line.
///
/// ```
/// let tree = sdevice_syntax::parse("Plot { eDensity }").unwrap();
/// assert_eq!(
///     sdevice_syntax::to_sexp(&tree),
///     "(source_file (section_statement name: (identifier \"Plot\") \
///      body: (section_body (identifier \"eDensity\"))))"
/// );
/// ```
#[must_use]
pub fn to_sexp(tree: &ParseTree) -> String {
    node_to_sexp(tree.root())
}

/// Render one subtree.
#[must_use]
pub fn node_to_sexp(node: SyntaxNode<'_>) -> String {
    let mut out = String::new();
    write_node(&mut out, node);
    out
}

fn write_node(out: &mut String, node: SyntaxNode<'_>) {
    out.push('(');
    out.push_str(node.kind().name());
    for (index, child) in node.children().enumerate() {
        let field = node.field_of(index);
        let shown = match child {
            SyntaxElement::Node(_) => true,
            SyntaxElement::Token(token) => field.is_some() || is_named(token),
        };
        if !shown {
            continue;
        }
        out.push(' ');
        if let Some(field) = field {
            out.push_str(field.name());
            out.push_str(": ");
        }
        match child {
            SyntaxElement::Node(child) => write_node(out, child),
            SyntaxElement::Token(token) => write_token(out, token),
        }
    }
    out.push(')');
}

fn write_token(out: &mut String, token: SyntaxToken<'_>) {
    // Writing into a String cannot fail.
    let _ = write!(out, "({} {:?})", token.kind().name(), token.text());
}

/// Tokens shown even without a field.
fn is_named(token: SyntaxToken<'_>) -> bool {
    matches!(
        token.kind(),
        TokenKind::Identifier
            | TokenKind::Boolean
            | TokenKind::Number
            | TokenKind::NumberFormat
            | TokenKind::StringFragment
            | TokenKind::EscapeSequence
            | TokenKind::WordOperator
            | TokenKind::AtReferenceName
            | TokenKind::Directive(_)
            | TokenKind::Error(_)
    )
}

/// Render the tree one node per line, with spans.
#[must_use]
pub fn to_indented(tree: &ParseTree) -> String {
    let mut out = String::new();
    write_indented(&mut out, tree.root(), None, 0);
    out
}

fn write_indented(
    out: &mut String,
    node: SyntaxNode<'_>,
    field: Option<&str>,
    depth: usize,
) {
    let indent = "  ".repeat(depth);
    let label = field.map(|f| format!("{f}: ")).unwrap_or_default();
    let span = node.span();
    let _ = write!(
        out,
        "{indent}{label}{} [{}-{}]",
        node.kind().name(),
        span.start,
        span.end
    );
    if let Some(diagnostic) = node.diagnostic() {
        let _ = write!(out, " {}: {}", diagnostic.code, diagnostic.message);
    }
    out.push('\n');
    for (index, child) in node.children().enumerate() {
        let field = node.field_of(index).map(|f| f.name());
        match child {
            SyntaxElement::Node(child) => write_indented(out, child, field, depth + 1),
            SyntaxElement::Token(token) if field.is_some() || is_named(token) => {
                let label = field.map(|f| format!("{f}: ")).unwrap_or_default();
                let _ = writeln!(
                    out,
                    "{indent}  {label}{} {:?} [{}]",
                    token.kind().name(),
                    token.text(),
                    token.span().start
                );
            }
            SyntaxElement::Token(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn directive_tree() {
        let tree = parse("#define X 1\n").expect("parse");
        assert_eq!(
            to_sexp(&tree),
            "(source_file (directive_statement directive: (directive \"#define\") \
             name: (identifier \"X\") value: (number \"1\")))"
        );
    }

    #[test]
    fn missing_value_prints_empty_error() {
        let tree = parse("File { A = }").expect("parse");
        assert_eq!(
            to_sexp(&tree),
            "(source_file (section_statement name: (identifier \"File\") \
             body: (section_body (key_value key: (identifier \"A\") value: (error)))))"
        );
    }

    #[test]
    fn indented_dump_lists_positions() {
        let tree = parse("Plot {\n  eDensity\n}\n").expect("parse");
        let dump = to_indented(&tree);
        let lines: Vec<_> = dump.lines().collect();
        assert_eq!(lines[0], "source_file [1:1-4:1]");
        assert_eq!(lines[1], "  section_statement [1:1-3:2]");
        assert!(lines.contains(&"      identifier \"eDensity\" [2:3]"));
    }
}
