//! Reparse after edits, splicing untouched top-level statements.

use std::collections::HashMap;

use tracing::debug;

use crate::options::ParseOptions;
use crate::parser::Parser;
use crate::tree::{NodeId, ParseTree};
use crate::{Error, check_input_len};

/// One text replacement.
///
/// `start` and `old_end` are byte offsets into the old text; the
/// replacement is `new_end - start` bytes long. Several edits passed
/// together must not overlap, and all use old-text offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edit {
    pub start: usize,
    pub old_end: usize,
    pub new_end: usize,
}

impl Edit {
    #[must_use]
    pub const fn new(start: usize, old_end: usize, new_end: usize) -> Self {
        Self {
            start,
            old_end,
            new_end,
        }
    }

    /// Replace `start..old_end` with `replacement`.
    #[must_use]
    pub const fn replace(start: usize, old_end: usize, replacement: &str) -> Self {
        Self::new(start, old_end, start + replacement.len())
    }

    /// Insert `text` at `at`.
    #[must_use]
    pub const fn insert(at: usize, text: &str) -> Self {
        Self::replace(at, at, text)
    }

    /// Apply this edit to `text`, returning the new text.
    ///
    /// Returns `None` when the edit does not fit `text` or `replacement`.
    #[must_use]
    pub fn apply(&self, text: &str, replacement: &str) -> Option<String> {
        if replacement.len() != self.new_end.checked_sub(self.start)?
            || !text.is_char_boundary(self.start)
            || !text.is_char_boundary(self.old_end)
            || self.start > self.old_end
        {
            return None;
        }
        let mut out = String::with_capacity(text.len() + replacement.len());
        out.push_str(text.get(..self.start)?);
        out.push_str(replacement);
        out.push_str(text.get(self.old_end..)?);
        Some(out)
    }

    /// Whether this edit changes or borders `start..=end`.
    const fn touches(&self, start: usize, end: usize) -> bool {
        self.start <= end && self.old_end >= start
    }
}

/// Statements of an older tree that can be copied into a new parse,
/// keyed by their start offset in the new text.
pub(crate) struct Reuse<'o> {
    old: &'o ParseTree,
    candidates: HashMap<usize, NodeId>,
}

impl<'o> Reuse<'o> {
    pub(crate) fn new(old: &'o ParseTree, edits: &[Edit], new_text: &str) -> Self {
        let mut edits = edits.to_vec();
        edits.sort_by_key(|e| e.start);

        let statements: Vec<_> = old.root().child_nodes().collect();
        let mut candidates = HashMap::new();
        for (i, stmt) in statements.iter().enumerate() {
            // An error may leave the lexer inside an unclosed construct, so
            // nothing after it is known to lex the same way.
            if stmt.has_error() {
                break;
            }
            let range = stmt.byte_range();
            // Where a statement ends depends on the token after it, so that
            // token must survive the edits too.
            let guard_end = statements.get(i + 1).map_or(old.source().len(), |next| {
                next.first_token()
                    .map_or(next.byte_range().start, |t| t.span().end.offset)
            });
            if edits.iter().any(|e| e.touches(range.start, guard_end)) {
                continue;
            }
            let Some(new_start) = shifted(range.start, &edits) else {
                continue;
            };
            let unchanged = old.source().get(range.start..guard_end);
            let now = new_text.get(new_start..new_start + (guard_end - range.start));
            if unchanged.is_some() && unchanged == now {
                candidates.insert(new_start, stmt.id());
            }
        }
        Self { old, candidates }
    }

    pub(crate) const fn old(&self) -> &'o ParseTree {
        self.old
    }

    pub(crate) fn candidate(&self, offset: usize) -> Option<NodeId> {
        self.candidates.get(&offset).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.candidates.len()
    }
}

/// Map an old offset outside every edit to its new offset.
fn shifted(offset: usize, edits: &[Edit]) -> Option<usize> {
    let mut grown = 0usize;
    let mut shrunk = 0usize;
    for edit in edits.iter().filter(|e| e.old_end <= offset) {
        let new_len = edit.new_end.checked_sub(edit.start)?;
        let old_len = edit.old_end.checked_sub(edit.start)?;
        grown += new_len;
        shrunk += old_len;
    }
    (offset + grown).checked_sub(shrunk)
}

/// Parse `new_text`, reusing statements of `old` that `edits` left intact.
///
/// The result is structurally identical to `parse(new_text)`.
///
/// ```
/// use sdevice_syntax::{Edit, parse, reparse};
///
/// let old = parse("File { }\nPlot { x }\n").unwrap();
/// let new = reparse(&old, &[Edit::replace(7, 7, "A ")], "File { A }\nPlot { x }\n").unwrap();
/// assert_eq!(new, parse("File { A }\nPlot { x }\n").unwrap());
/// ```
pub fn reparse(old: &ParseTree, edits: &[Edit], new_text: &str) -> Result<ParseTree, Error> {
    reparse_with_options(old, edits, new_text, &ParseOptions::default())
}

/// [`reparse`] with explicit resource limits.
pub fn reparse_with_options(
    old: &ParseTree,
    edits: &[Edit],
    new_text: &str,
    options: &ParseOptions,
) -> Result<ParseTree, Error> {
    check_input_len(new_text, options)?;
    let reuse = Reuse::new(old, edits, new_text);
    debug!(
        target: "sdevice_syntax::incremental",
        edits = edits.len(),
        candidates = reuse.len(),
        "reparsing"
    );
    Parser::new(new_text, options).reusing(reuse).run()
}
