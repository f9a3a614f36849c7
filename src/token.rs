use std::fmt;

use crate::directive::DirectiveKind;
use crate::lexer::LexErrorKind;

/// A point in the source text.
///
/// `line` and `column` are 1-based; `column` counts characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// The position of the first byte of a document.
    pub const START: Self = Self {
        offset: 0,
        line: 1,
        column: 1,
    };
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Source range covered by a token or node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// A zero-width span at `at`.
    #[must_use]
    pub const fn empty(at: Position) -> Self {
        Self { start: at, end: at }
    }

    #[must_use]
    pub const fn byte_range(&self) -> std::ops::Range<usize> {
        self.start.offset..self.end.offset
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }
}

/// Quote character delimiting a string literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quote {
    Double,
    Single,
}

impl Quote {
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Double => '"',
            Self::Single => '\'',
        }
    }
}

/// Lexer state selecting which characters end the current token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerMode {
    /// Ordinary command-file text.
    Normal,
    /// Between the delimiters of `@name@`.
    InsideAtReference,
    /// Inside a string literal opened by the given quote.
    InsideString(Quote),
    /// Inside `!( … )!`.
    InsideEmbeddedBlock,
}

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Spaces, tabs, newlines (and a leading byte-order mark).
    Whitespace,
    /// `# …` up to the end of the line.
    Comment,
    /// Backslash-newline outside of strings.
    LineContinuation,
    /// Name such as `Physics`, `eDensity` or `$x`.
    Identifier,
    /// `true`/`false` used as an expression literal.
    Boolean,
    /// Integer, decimal, hex, binary, octal or big-integer literal.
    Number,
    /// `%d`, `%.3e` … inside a command.
    NumberFormat,
    /// Opening or closing quote of a string.
    Quote(Quote),
    /// Literal run inside a string.
    StringFragment,
    /// `\n`, `\x41`, `\u{1F600}`, …
    EscapeSequence,
    /// Symbolic operator, e.g. `+`, `**`, `<=`, `?`, `:` or `=`.
    Operator,
    /// `eq`, `ne`, `in` or `ni` used as a binary operator.
    WordOperator,
    /// `at` between voltage and time.
    Keyword,
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    Comma,
    /// Either delimiter of `@name@`.
    AtSign,
    /// The name between the delimiters of `@name@`.
    AtReferenceName,
    /// `@<`
    AngleOpen,
    /// `>@`
    AngleClose,
    /// `@[`
    SquareOpen,
    /// `]@`
    SquareClose,
    /// `!(`
    EmbeddedOpen,
    /// `)!`
    EmbeddedClose,
    /// `#define`, `#if`, …
    Directive(DirectiveKind),
    /// Bytes the lexer could not accept.
    Error(LexErrorKind),
}

impl TokenKind {
    /// Whitespace, comments and line continuations.
    #[must_use]
    pub const fn is_trivia(&self) -> bool {
        matches!(
            self,
            Self::Whitespace | Self::Comment | Self::LineContinuation
        )
    }

    /// Short lowercase name used in diagnostics and tree dumps.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Whitespace => "whitespace",
            Self::Comment => "comment",
            Self::LineContinuation => "line_continuation",
            Self::Identifier => "identifier",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::NumberFormat => "number_format",
            Self::Quote(_) => "quote",
            Self::StringFragment => "string_fragment",
            Self::EscapeSequence => "escape_sequence",
            Self::Operator => "operator",
            Self::WordOperator => "word_operator",
            Self::Keyword => "keyword",
            Self::OpenBrace => "{",
            Self::CloseBrace => "}",
            Self::OpenParen => "(",
            Self::CloseParen => ")",
            Self::OpenBracket => "[",
            Self::CloseBracket => "]",
            Self::Comma => ",",
            Self::AtSign => "@",
            Self::AtReferenceName => "at_reference_name",
            Self::AngleOpen => "@<",
            Self::AngleClose => ">@",
            Self::SquareOpen => "@[",
            Self::SquareClose => "]@",
            Self::EmbeddedOpen => "!(",
            Self::EmbeddedClose => ")!",
            Self::Directive(_) => "directive",
            Self::Error(_) => "lex_error",
        }
    }
}

/// A single token with its kind, exact source text, and location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    #[must_use]
    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }
}
