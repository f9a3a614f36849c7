//! Preprocessor directive classification and `#if` nesting.

use std::fmt;

/// The seven `#`-prefixed directive keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Define,
    Undef,
    Setdep,
    If,
    Elif,
    Else,
    Endif,
}

impl DirectiveKind {
    /// Classify the word following `#`. Anything else makes the line a
    /// comment.
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "define" => Some(Self::Define),
            "undef" => Some(Self::Undef),
            "setdep" => Some(Self::Setdep),
            "if" => Some(Self::If),
            "elif" => Some(Self::Elif),
            "else" => Some(Self::Else),
            "endif" => Some(Self::Endif),
            _ => None,
        }
    }

    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Define => "#define",
            Self::Undef => "#undef",
            Self::Setdep => "#setdep",
            Self::If => "#if",
            Self::Elif => "#elif",
            Self::Else => "#else",
            Self::Endif => "#endif",
        }
    }

    /// `#elif`, `#else` and `#endif` only make sense after an open `#if`.
    #[must_use]
    pub const fn continues_conditional(self) -> bool {
        matches!(self, Self::Elif | Self::Else | Self::Endif)
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Which branch of an open conditional the parser is inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arm {
    If,
    Elif,
    Else,
}

#[derive(Debug, Clone, Copy)]
struct OpenConditional {
    arm: Arm,
    delimiter_depth: usize,
}

/// How a conditional-continuation directive relates to the open `#if`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Ends the body of the innermost `#if` at this depth.
    Closes,
    /// No `#if` is open at this depth, or `#elif`/`#else` follows `#else`.
    Orphaned,
}

/// Stack of open `#if` contexts, innermost last.
///
/// A conditional only matches directives at the delimiter depth where it
/// was opened, so an `#endif` inside a brace body never closes an `#if`
/// outside of it.
#[derive(Debug, Default)]
pub struct DirectiveStack {
    open: Vec<OpenConditional>,
}

impl DirectiveStack {
    #[must_use]
    pub const fn new() -> Self {
        Self { open: Vec::new() }
    }

    pub fn push(&mut self, delimiter_depth: usize) {
        self.open.push(OpenConditional {
            arm: Arm::If,
            delimiter_depth,
        });
    }

    pub fn pop(&mut self) {
        self.open.pop();
    }

    /// Record that the innermost conditional moved on to `arm`.
    pub fn enter_arm(&mut self, arm: Arm) {
        if let Some(top) = self.open.last_mut() {
            top.arm = arm;
        }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    #[must_use]
    pub fn current_arm(&self) -> Option<Arm> {
        self.open.last().map(|c| c.arm)
    }

    /// Decide what `kind` means when met at `delimiter_depth`.
    #[must_use]
    pub fn classify(&self, kind: DirectiveKind, delimiter_depth: usize) -> Continuation {
        let Some(top) = self.open.last() else {
            return Continuation::Orphaned;
        };
        if top.delimiter_depth != delimiter_depth {
            return Continuation::Orphaned;
        }
        match (kind, top.arm) {
            (DirectiveKind::Elif | DirectiveKind::Else, Arm::Else) => Continuation::Orphaned,
            _ => Continuation::Closes,
        }
    }
}
