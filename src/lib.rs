//! Lexer and parser for Sentaurus `sdevice` command files.
//!
//! Produces a lossless, position-annotated syntax tree: every byte of the
//! input, comments and whitespace included, belongs to exactly one token,
//! and malformed input yields error nodes instead of failing. Trees can be
//! re-derived cheaply after edits with [`reparse`].
//!
//! # Quick start
//!
//! ## Parse and inspect a command file
//!
//! ```
//! use sdevice_syntax::{Field, NodeKind, parse};
//!
//! let input = "Physics(Material=\"Silicon\") {\n  Mobility(DopingDep)\n}\n";
//! let tree = parse(input).unwrap();
//! assert_eq!(tree.source_text(), input);
//!
//! let section = tree.root().child_nodes().next().unwrap();
//! assert_eq!(section.kind(), NodeKind::SectionStatement);
//! let range = section.node_by_field(Field::Range).unwrap();
//! assert_eq!(range.text(), "Material=\"Silicon\"");
//! ```
//!
//! ## Recover from errors
//!
//! ```
//! use sdevice_syntax::{ErrorCode, parse};
//!
//! let tree = parse("Electrode { { Voltage = } }").unwrap();
//! let codes: Vec<_> = tree.diagnostics().map(|d| d.code).collect();
//! assert_eq!(codes, [ErrorCode::MissingValue]);
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

use std::fmt;

mod builder;
pub mod directive;
mod expr;
pub mod formatter;
pub mod incremental;
pub mod lexer;
pub mod options;
mod parser;
pub mod query;
mod sections;
pub mod token;
pub mod tree;

pub use directive::DirectiveKind;
pub use formatter::{to_indented, to_sexp};
pub use incremental::{Edit, reparse, reparse_with_options};
pub use lexer::{LexError, LexErrorKind, Lexer, tokenize};
pub use options::ParseOptions;
pub use query::{
    AtReferenceIndex, FoldKind, FoldingRange, Highlight, HighlightClass, Visitor, diagnostics,
    folding_ranges, highlights, walk,
};
pub use token::{LexerMode, Position, Quote, Span, Token, TokenKind};
pub use tree::{
    Diagnostic, ErrorCode, Field, NodeId, NodeKind, ParseTree, SectionKind, SyntaxElement,
    SyntaxNode, SyntaxToken, TokenId,
};

/// Limit named in [`Error::ResourceExceeded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Input size in bytes.
    InputLength,
    /// Syntactic nesting of delimiters, expressions and directive bodies.
    NestingDepth,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputLength => write!(f, "input length"),
            Self::NestingDepth => write!(f, "nesting depth"),
        }
    }
}

/// The only way a parse fails: syntax problems are reported inside the
/// tree, so this covers configured resource limits alone.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("{resource} exceeds the limit of {limit}")]
    ResourceExceeded { resource: Resource, limit: usize },
}

/// Parse a command file with default [`ParseOptions`].
pub fn parse(input: &str) -> Result<ParseTree, Error> {
    parse_with_options(input, &ParseOptions::default())
}

/// Parse a command file within the limits of `options`.
pub fn parse_with_options(input: &str, options: &ParseOptions) -> Result<ParseTree, Error> {
    check_input_len(input, options)?;
    parser::Parser::new(input, options).run()
}

pub(crate) fn check_input_len(input: &str, options: &ParseOptions) -> Result<(), Error> {
    let limit = options.input_len_limit();
    if input.len() > limit {
        tracing::debug!(len = input.len(), limit, "input rejected");
        return Err(Error::ResourceExceeded {
            resource: Resource::InputLength,
            limit,
        });
    }
    Ok(())
}
