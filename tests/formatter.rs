//! Tree printer tests: s-expressions and the indented dump.

use sdevice_syntax::formatter::node_to_sexp;
use sdevice_syntax::{NodeKind, parse, to_indented, to_sexp};

fn sexp(input: &str) -> String {
    to_sexp(&parse(input).expect("parse"))
}

#[test]
fn sexp_empty_file() {
    assert_eq!(sexp(""), "(source_file)");
    assert_eq!(sexp("  # only a comment\n"), "(source_file)");
}

#[test]
fn sexp_hides_trivia_and_punctuation() {
    assert_eq!(
        sexp("File {\n  # comment\n  Grid = g\n}\n"),
        sexp("File{Grid=g}")
    );
}

#[test]
fn sexp_voltage_list() {
    assert_eq!(
        sexp("Electrode { { V=(0 at 1) } }"),
        "(source_file (section_statement name: (identifier \"Electrode\") \
         body: (section_body (electrode_group (key_value key: (identifier \"V\") \
         value: (value_list (voltage_at_time voltage: (number \"0\") \
         time: (number \"1\"))))))))"
    );
}

#[test]
fn sexp_string_with_reference() {
    let tree = parse("File { A = \"x@y@\" }").expect("parse");
    let string = tree
        .root()
        .descendants()
        .find(|n| n.kind() == NodeKind::String)
        .expect("string");
    assert_eq!(
        node_to_sexp(string),
        "(string (string_fragment \"x\") (at_reference name: (at_reference_name \"y\")))"
    );
}

#[test]
fn sexp_lex_error_inside_error_node() {
    assert_eq!(
        sexp("File { ; }"),
        "(source_file (section_statement name: (identifier \"File\") \
         body: (section_body (error (lex_error \";\")))))"
    );
}

#[test]
fn sexp_escapes_token_text() {
    let out = sexp("File { A = \"\\\"\" }");
    assert!(out.contains("(escape_sequence \"\\\\\\\"\")"), "{out}");
}

#[test]
fn indented_dump_shows_fields_spans_and_errors() {
    let dump = to_indented(&parse("File { A = }").expect("parse"));
    let lines: Vec<_> = dump.lines().collect();
    assert_eq!(lines[0], "source_file [1:1-1:13]");
    assert_eq!(lines[1], "  section_statement [1:1-1:13]");
    assert_eq!(lines[2], "    name: identifier \"File\" [1:1]");
    assert_eq!(lines[3], "    body: section_body [1:6-1:13]");
    assert!(lines.contains(&"        key: identifier \"A\" [1:8]"), "{dump}");
    assert!(
        lines.contains(
            &"        value: error [1:11-1:11] missing value: expected a value after `=`"
        ),
        "{dump}"
    );
}

#[test]
fn indented_dump_of_nested_directives() {
    let dump = to_indented(&parse("#if 1\n#define A 2\n#endif\n").expect("parse"));
    assert!(dump.contains("\n  directive_statement [1:1-3:7]\n"), "{dump}");
    assert!(dump.contains("    consequence: directive_body [2:1-2:12]\n"), "{dump}");
    assert!(dump.contains("      directive_statement [2:1-2:12]\n"), "{dump}");
}
