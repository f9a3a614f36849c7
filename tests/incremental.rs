//! Incremental reparse tests: every result must match a fresh parse.

mod common;

use common::{assert_edit, codes, statement_kinds};
use sdevice_syntax::{
    Edit, ErrorCode, Field, NodeKind, ParseOptions, parse, reparse, reparse_with_options,
};

const DECK: &str = "File {\n  Grid = \"a.tdr\"\n}\n\nPlot {\n  eDensity\n}\n\nMath {\n  Digits = 5\n}\n";

fn offset_of(text: &str, needle: &str) -> usize {
    text.find(needle)
        .unwrap_or_else(|| panic!("{needle:?} not in {text:?}"))
}

// -----------------------------------------------------------
// Single edits.
// -----------------------------------------------------------

#[test]
fn edit_inside_a_statement() {
    let at = offset_of(DECK, "eDensity");
    let tree = assert_edit(DECK, at, at + 1, "h");
    assert!(tree.source().contains("hDensity"));
}

#[test]
fn edit_between_statements() {
    let at = offset_of(DECK, "\nPlot");
    let tree = assert_edit(DECK, at, at, "\n# note\n");
    assert_eq!(tree.root().child_nodes().count(), 3);
}

#[test]
fn edit_before_every_statement() {
    assert_edit(DECK, 0, 0, "#setdep @n@\n");
}

#[test]
fn edit_at_end_of_text() {
    let tree = assert_edit(DECK, DECK.len(), DECK.len(), "Solve { Poisson }\n");
    assert_eq!(tree.root().child_nodes().count(), 4);
}

#[test]
fn insert_a_statement() {
    let at = offset_of(DECK, "Math");
    let tree = assert_edit(DECK, at, at, "Physics { Mobility(DopingDep) }\n\n");
    assert_eq!(
        statement_kinds(&tree),
        vec![NodeKind::SectionStatement; 4]
    );
}

#[test]
fn delete_a_statement() {
    let start = offset_of(DECK, "Plot");
    let end = offset_of(DECK, "Math");
    let tree = assert_edit(DECK, start, end, "");
    assert_eq!(tree.root().child_nodes().count(), 2);
}

#[test]
fn delete_everything() {
    let tree = assert_edit(DECK, 0, DECK.len(), "");
    assert_eq!(tree.root().child_nodes().count(), 0);
}

#[test]
fn join_two_statements() {
    // Removing the closing brace pulls the next section into the body.
    let at = offset_of(DECK, "}\n\nPlot");
    let tree = assert_edit(DECK, at, at + 1, "");
    assert!(tree.has_errors());
}

#[test]
fn split_a_statement() {
    let at = offset_of(DECK, "eDensity") + 1;
    assert_edit(DECK, at, at, "\n}\nCurrentPlot {\n");
}

// -----------------------------------------------------------
// Edits that change how neighbours parse.
// -----------------------------------------------------------

#[test]
fn edit_turns_equals_into_comparison() {
    // `#define X a =` ends with a stray `=`; adding a second one makes
    // the operator `==` and the whole line an expression.
    let old = "#define X a =\n= b\nFile { }\n";
    let at = offset_of(old, "=\n") + 1;
    let tree = assert_edit(old, at, at + 1, "");
    assert_eq!(tree.source(), "#define X a == b\nFile { }\n");
}

#[test]
fn edit_opens_a_string_over_the_rest() {
    let at = offset_of(DECK, "a.tdr") - 1;
    let tree = assert_edit(DECK, at, at + 1, "");
    assert!(tree.has_errors());
}

#[test]
fn edit_opens_an_embedded_block() {
    let at = offset_of(DECK, "Plot");
    assert_edit(DECK, at, at, "!( ");
}

#[test]
fn edit_closes_a_conditional() {
    let old = "#if 1\nFile { }\nPlot { x }\n";
    let tree = assert_edit(old, old.len(), old.len(), "#endif\n");
    assert_eq!(statement_kinds(&tree), [NodeKind::DirectiveStatement]);
    assert!(!tree.has_errors());
}

#[test]
fn edit_breaks_a_conditional() {
    let old = "#if 1\nFile { }\n#endif\nPlot { x }\n";
    let at = offset_of(old, "#endif");
    let tree = assert_edit(old, at, at + "#endif\n".len(), "");
    assert_eq!(codes(&tree), [ErrorCode::UnmatchedDirective]);
}

#[test]
fn edit_continues_a_directive_line() {
    let old = "#define X 1 +\nFile { }\n";
    let at = offset_of(old, "\nFile");
    assert_edit(old, at, at, " \\");
}

#[test]
fn edit_opens_a_bracket_before_a_number_format() {
    let old_text = "File { }\n#define X 5 %d\n";
    let old = parse(old_text).expect("parse");
    let edit = Edit::insert(0, "[");
    let new_text = edit.apply(old_text, "[").expect("edit fits");
    let incremental = reparse(&old, &[edit], &new_text).expect("reparse");
    let fresh = parse(&new_text).expect("parse");
    assert!(incremental == fresh);
    let define = incremental
        .root()
        .child_nodes()
        .find(|n| n.kind() == NodeKind::DirectiveStatement)
        .expect("define");
    assert_eq!(
        define.node_by_field(Field::Value).map(|v| v.kind()),
        Some(NodeKind::BinaryExpression)
    );
}

#[test]
fn edit_closes_a_bracket_command() {
    let old = "#define A [format %d\n#define B 5 %d\n";
    let at = offset_of(old, "\n#define B");
    let tree = assert_edit(old, at, at, " 1]");
    assert!(!tree.has_errors());
}

#[test]
fn edit_repairs_an_error() {
    let old = "File { Grid = }\nPlot { x }\nMath { y }\n";
    let at = offset_of(old, "= }") + 1;
    let tree = assert_edit(old, at, at, " \"a\"");
    assert!(!tree.has_errors());
}

// -----------------------------------------------------------
// Several edits and positions.
// -----------------------------------------------------------

#[test]
fn several_disjoint_edits() {
    let old = parse(DECK).expect("parse");
    let a = offset_of(DECK, "a.tdr");
    let b = offset_of(DECK, "Digits = 5") + "Digits = ".len();
    let edits = [Edit::replace(a, a + 1, "bc"), Edit::replace(b, b + 1, "12")];
    let new_text = format!(
        "{}bc{}12{}",
        &DECK[..a],
        &DECK[a + 1..b],
        &DECK[b + 1..]
    );
    let new = reparse(&old, &edits, &new_text).expect("reparse");
    assert_eq!(new, parse(&new_text).expect("parse"));
}

#[test]
fn reused_statements_get_new_positions() {
    let old_text = "File { }\nPlot {\n  x\n}\n";
    let old = parse(old_text).expect("parse");
    let new_text = format!("# one\n# two\n{old_text}");
    let new = reparse(&old, &[Edit::insert(0, "# one\n# two\n")], &new_text).expect("reparse");
    assert_eq!(new, parse(&new_text).expect("parse"));

    let plot = new.root().child_nodes().nth(1).expect("plot");
    assert_eq!(plot.start().line, 4);
    assert_eq!(plot.start().column, 1);
    assert_eq!(plot.start().offset, offset_of(&new_text, "Plot"));
    let x = plot.tokens().find(|t| t.text() == "x").expect("x");
    assert_eq!((x.span().start.line, x.span().start.column), (5, 3));
}

#[test]
fn reused_statements_are_owned_by_the_new_tree() {
    let old = parse(DECK).expect("parse");
    let new_text = format!("Math {{ }}\n{DECK}");
    let new = reparse(&old, &[Edit::insert(0, "Math { }\n")], &new_text).expect("reparse");
    let old_nodes = old.node_count();
    drop(old);
    assert_eq!(new, parse(&new_text).expect("parse"));
    assert!(new.node_count() > old_nodes);
    let plot = new.root().child_nodes().nth(2).expect("plot");
    assert_eq!(plot.text(), "Plot {\n  eDensity\n}");
    assert_eq!(plot.start().offset, offset_of(&new_text, "Plot"));
}

#[test]
fn reused_statements_shift_columns_on_the_same_line() {
    let old_text = "File { } Plot { x }\n";
    let old = parse(old_text).expect("parse");
    let new_text = "File { A } Plot { x }\n";
    let new = reparse(&old, &[Edit::insert(7, "A ")], new_text).expect("reparse");
    assert_eq!(new, parse(new_text).expect("parse"));
    let plot = new.root().child_nodes().nth(1).expect("plot");
    assert_eq!(plot.start().column, 12);
}

#[test]
fn reparse_checks_input_limit() {
    let old = parse(DECK).expect("parse");
    let options = ParseOptions::new().max_input_len(8);
    let new_text = format!("{DECK}x");
    let edit = Edit::insert(DECK.len(), "x");
    assert!(reparse_with_options(&old, &[edit], &new_text, &options).is_err());
}

#[test]
fn reparse_from_unrelated_tree() {
    // Mismatched edits degrade to a full parse, never a wrong tree.
    let old = parse("Plot { x }\n").expect("parse");
    let new = reparse(&old, &[], DECK).expect("reparse");
    assert_eq!(new, parse(DECK).expect("parse"));
}
