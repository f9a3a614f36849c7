use std::fmt;

use tracing::{debug, trace};

use crate::directive::DirectiveKind;
use crate::token::{LexerMode, Position, Quote, Span, Token, TokenKind};

/// Classifies a lexer error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    /// String or embedded block still open at end of line or input.
    UnterminatedLiteral,
    /// Malformed `\x`, `\u` or trailing backslash.
    InvalidEscape,
    /// Character that cannot start any token.
    InvalidCharacter(char),
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedLiteral => write!(f, "unterminated literal"),
            Self::InvalidEscape => write!(f, "invalid escape sequence"),
            Self::InvalidCharacter(ch) => write!(f, "invalid character {ch:?}"),
        }
    }
}

/// Error produced during lexing.
///
/// The lexer has already moved past `span` when this is returned, so
/// scanning can continue with the following bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", span.start.line, span.start.column)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

/// Tokenize a command file into a lossless token stream.
///
/// Lexical errors become [`TokenKind::Error`] tokens covering the
/// offending bytes, so concatenating every token's text always
/// reproduces `input`.
#[must_use]
pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer::new(input).collect()
}

/// What closes a `Normal` frame pushed inside another construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closer {
    None,
    Angle,
    Square,
    /// A plain `[` command; also ends at a line break.
    Bracket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    mode: LexerMode,
    closer: Closer,
    /// Open parentheses, tracked only inside embedded blocks.
    parens: usize,
}

impl Frame {
    const BASE: Self = Self::new(LexerMode::Normal, Closer::None);

    const fn new(mode: LexerMode, closer: Closer) -> Self {
        Self {
            mode,
            closer,
            parens: 0,
        }
    }
}

/// Streaming lexer over a command file.
///
/// The lexer keeps a stack of [`LexerMode`] frames: strings, at-references,
/// `[ ]` commands, `@< >@` / `@[ ]@` expressions and `!( )!` blocks each
/// push a frame that the matching closer pops.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    col: usize,
    frames: Vec<Frame>,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self::resume(input, Position::START)
    }

    /// Start lexing `input` at `at`, which must be a statement boundary
    /// (the lexer starts in [`LexerMode::Normal`]).
    #[must_use]
    pub fn resume(input: &'a str, at: Position) -> Self {
        Self {
            input,
            pos: at.offset.min(input.len()),
            line: at.line,
            col: at.column,
            frames: vec![Frame::BASE],
        }
    }

    /// Where the next token starts.
    #[must_use]
    pub const fn cursor(&self) -> Position {
        Position {
            offset: self.pos,
            line: self.line,
            column: self.col,
        }
    }

    /// The mode the next token will be scanned in.
    #[must_use]
    pub fn mode(&self) -> LexerMode {
        self.enclosing().mode
    }

    /// Whether the lexer is in the state [`Lexer::resume`] starts in: no
    /// string, at-reference, command or nested expression is open.
    #[must_use]
    pub fn is_at_base(&self) -> bool {
        matches!(self.frames.as_slice(), [frame] if *frame == Frame::BASE)
    }

    /// Scan the next token, or `None` at the end of input.
    pub fn next_token(&mut self) -> Option<Result<Token, LexError>> {
        loop {
            if self.pos >= self.input.len() {
                if self.frames.len() <= 1 {
                    return None;
                }
                let frame = self.pop_frame();
                match frame.mode {
                    LexerMode::InsideString(_) | LexerMode::InsideEmbeddedBlock => {
                        return Some(Err(
                            self.error_at(LexErrorKind::UnterminatedLiteral, self.cursor())
                        ));
                    }
                    LexerMode::Normal | LexerMode::InsideAtReference => continue,
                }
            }
            if matches!(self.peek(), Some('\n' | '\r')) {
                if let Some(err) = self.close_at_line_end() {
                    return Some(Err(err));
                }
            }

            let scanned = match self.mode() {
                LexerMode::InsideAtReference => self.scan_at_reference(),
                LexerMode::InsideString(quote) => Some(self.scan_string(quote)),
                LexerMode::Normal | LexerMode::InsideEmbeddedBlock => Some(self.scan_normal()),
            };
            if let Some(result) = scanned {
                return Some(result);
            }
        }
    }

    // -- frames --

    fn top(&self) -> Frame {
        self.frames.last().copied().unwrap_or(Frame::BASE)
    }

    /// Index of the innermost frame not opened by a plain `[`.
    fn enclosing_index(&self) -> usize {
        self.frames
            .iter()
            .rposition(|f| f.closer != Closer::Bracket)
            .unwrap_or(0)
    }

    fn enclosing(&self) -> Frame {
        self.frames
            .get(self.enclosing_index())
            .copied()
            .unwrap_or(Frame::BASE)
    }

    /// The frame the innermost non-`[` frame was pushed from.
    fn enclosing_parent(&self) -> Option<Frame> {
        let index = self.enclosing_index().checked_sub(1)?;
        self.frames.get(index).copied()
    }

    fn unwind_brackets(&mut self) {
        while self.top().closer == Closer::Bracket {
            self.pop_frame();
        }
    }

    /// Adjust the parenthesis count of an enclosing embedded block.
    fn count_paren(&mut self, open: bool) {
        let index = self.enclosing_index();
        if let Some(frame) = self
            .frames
            .get_mut(index)
            .filter(|f| f.mode == LexerMode::InsideEmbeddedBlock)
        {
            frame.parens = if open {
                frame.parens + 1
            } else {
                frame.parens.saturating_sub(1)
            };
        }
    }

    /// Quote of the string an open `@<` was started in, if any.
    fn string_of_angle(&self) -> Option<Quote> {
        if self.enclosing().closer != Closer::Angle {
            return None;
        }
        match self.enclosing_parent()?.mode {
            LexerMode::InsideString(quote) => Some(quote),
            _ => None,
        }
    }

    /// Whether the innermost frame ends at the next line break.
    fn ends_at_line_break(&self) -> bool {
        self.top().closer == Closer::Bracket || self.string_of_angle().is_some()
    }

    /// Pop the frames that cannot span lines. `[` commands end silently;
    /// an `@<` opened inside a string ends together with that string.
    fn close_at_line_end(&mut self) -> Option<LexError> {
        self.unwind_brackets();
        self.string_of_angle()?;
        let start = self.cursor();
        self.pop_frame();
        self.pop_frame();
        Some(self.error_at(LexErrorKind::UnterminatedLiteral, start))
    }

    /// Whether a `quote` just scanned inside `"… @< …"` closes the string.
    /// Strings cannot span lines, so a quote with no partner later on the
    /// line cannot open a nested one.
    fn quote_closes_string(&self, quote: Quote) -> bool {
        self.string_of_angle() == Some(quote)
            && !self
                .rest()
                .split(['\n', '\r'])
                .next()
                .unwrap_or_default()
                .contains(quote.as_char())
    }

    fn push_frame(&mut self, mode: LexerMode, closer: Closer) {
        trace!(target: "sdevice_syntax::lexer", ?mode, offset = self.pos, "enter lexer mode");
        self.frames.push(Frame::new(mode, closer));
    }

    fn pop_frame(&mut self) -> Frame {
        let frame = if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        };
        let frame = frame.unwrap_or(Frame::BASE);
        trace!(target: "sdevice_syntax::lexer", mode = ?frame.mode, offset = self.pos, "leave lexer mode");
        frame
    }

    // -- cursor --

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn at(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn bump_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
    }

    fn finish(&self, kind: TokenKind, start: Position) -> Token {
        Token {
            kind,
            text: self.input[start.offset..self.pos].to_string(),
            span: Span::new(start, self.cursor()),
        }
    }

    fn error_at(&self, kind: LexErrorKind, start: Position) -> LexError {
        let span = Span::new(start, self.cursor());
        debug!(target: "sdevice_syntax::lexer", %kind, line = span.start.line, column = span.start.column, "lexical error");
        LexError { kind, span }
    }

    // -- modes --

    fn scan_normal(&mut self) -> Result<Token, LexError> {
        let start = self.cursor();
        let Some(ch) = self.peek() else {
            return Err(self.error_at(LexErrorKind::UnterminatedLiteral, start));
        };
        let frame = self.top();
        let enclosing = self.enclosing();

        let kind = match ch {
            '\u{FEFF}' if self.pos == 0 => {
                self.bump();
                self.bump_while(char::is_whitespace);
                TokenKind::Whitespace
            }
            c if c.is_whitespace() => {
                if self.ends_at_line_break() {
                    self.bump_while(|c| c.is_whitespace() && c != '\n' && c != '\r');
                } else {
                    self.bump_while(char::is_whitespace);
                }
                TokenKind::Whitespace
            }
            '#' => self.scan_hash(),
            '\\' if self.at("\\\n") || self.at("\\\r\n") => {
                self.bump();
                if self.peek() == Some('\r') {
                    self.bump();
                }
                self.bump();
                TokenKind::LineContinuation
            }
            '\\' if self.at_unicode_escape() => {
                self.scan_identifier();
                TokenKind::Identifier
            }
            '\\' => self.scan_escape(start)?,
            '"' | '\'' => {
                let quote = if ch == '"' { Quote::Double } else { Quote::Single };
                self.bump();
                if self.quote_closes_string(quote) {
                    self.unwind_brackets();
                    self.pop_frame();
                    self.pop_frame();
                } else {
                    self.push_frame(LexerMode::InsideString(quote), Closer::None);
                }
                TokenKind::Quote(quote)
            }
            '@' => self.scan_at(),
            '!' if self.at("!(") => {
                self.bump_n(2);
                self.push_frame(LexerMode::InsideEmbeddedBlock, Closer::None);
                TokenKind::EmbeddedOpen
            }
            ')' if enclosing.mode == LexerMode::InsideEmbeddedBlock
                && enclosing.parens == 0
                && self.at(")!") =>
            {
                self.unwind_brackets();
                self.bump_n(2);
                self.pop_frame();
                TokenKind::EmbeddedClose
            }
            '>' if enclosing.closer == Closer::Angle && self.at(">@") => {
                self.unwind_brackets();
                self.bump_n(2);
                self.pop_frame();
                TokenKind::AngleClose
            }
            ']' if frame.closer == Closer::Square && self.at("]@") => {
                self.bump_n(2);
                self.pop_frame();
                TokenKind::SquareClose
            }
            '(' => {
                self.bump();
                self.count_paren(true);
                TokenKind::OpenParen
            }
            ')' => {
                self.bump();
                self.count_paren(false);
                TokenKind::CloseParen
            }
            '[' => {
                self.bump();
                self.push_frame(LexerMode::Normal, Closer::Bracket);
                TokenKind::OpenBracket
            }
            ']' => {
                self.bump();
                if frame.closer == Closer::Bracket {
                    self.pop_frame();
                }
                TokenKind::CloseBracket
            }
            '{' => {
                self.bump();
                TokenKind::OpenBrace
            }
            '}' => {
                self.bump();
                TokenKind::CloseBrace
            }
            ',' => {
                self.bump();
                TokenKind::Comma
            }
            '%' if matches!(frame.closer, Closer::Square | Closer::Bracket) => {
                if let Some(len) = number_format_len(self.rest()) {
                    self.bump_n(len);
                    TokenKind::NumberFormat
                } else {
                    self.bump();
                    TokenKind::Operator
                }
            }
            c if c.is_ascii_digit()
                || (c == '.' && self.peek_nth(1).is_some_and(|d| d.is_ascii_digit())) =>
            {
                self.scan_number();
                TokenKind::Number
            }
            _ => {
                if let Some(len) = operator_len(self.rest()) {
                    self.bump_n(len);
                    TokenKind::Operator
                } else if is_identifier_start(ch) || self.at_unicode_escape() {
                    self.scan_identifier();
                    TokenKind::Identifier
                } else {
                    self.bump();
                    return Err(self.error_at(LexErrorKind::InvalidCharacter(ch), start));
                }
            }
        };

        Ok(self.finish(kind, start))
    }

    fn scan_hash(&mut self) -> TokenKind {
        self.bump();
        let word_start = self.pos;
        self.bump_while(|c| c.is_ascii_alphanumeric());
        if let Some(kind) = DirectiveKind::from_word(&self.input[word_start..self.pos]) {
            return TokenKind::Directive(kind);
        }
        self.bump_while(|c| c != '\n' && c != '\r');
        TokenKind::Comment
    }

    /// `@` in normal mode: angle or square opener, an at-reference
    /// delimiter, or an ordinary identifier character.
    fn scan_at(&mut self) -> TokenKind {
        if self.at("@<") {
            self.bump_n(2);
            self.push_frame(LexerMode::Normal, Closer::Angle);
            TokenKind::AngleOpen
        } else if self.at("@[") {
            self.bump_n(2);
            self.push_frame(LexerMode::Normal, Closer::Square);
            TokenKind::SquareOpen
        } else if at_reference_len(self.rest()).is_some() {
            self.bump();
            self.push_frame(LexerMode::InsideAtReference, Closer::None);
            TokenKind::AtSign
        } else {
            self.scan_identifier();
            TokenKind::Identifier
        }
    }

    fn scan_at_reference(&mut self) -> Option<Result<Token, LexError>> {
        let start = self.cursor();
        if self.peek() == Some('@') {
            self.bump();
            self.pop_frame();
            return Some(Ok(self.finish(TokenKind::AtSign, start)));
        }
        loop {
            if self.at_unicode_escape() {
                self.skip_unicode_escape();
            } else if self.peek().is_some_and(is_at_reference_char) {
                self.bump();
            } else {
                break;
            }
        }
        if self.pos == start.offset {
            // Only reachable when resumed mid-reference; fall back to normal text.
            self.pop_frame();
            return None;
        }
        Some(Ok(self.finish(TokenKind::AtReferenceName, start)))
    }

    fn scan_string(&mut self, quote: Quote) -> Result<Token, LexError> {
        let start = self.cursor();
        match self.peek() {
            None | Some('\n' | '\r') => {
                self.pop_frame();
                Err(self.error_at(LexErrorKind::UnterminatedLiteral, start))
            }
            Some(c) if c == quote.as_char() => {
                self.bump();
                self.pop_frame();
                Ok(self.finish(TokenKind::Quote(quote), start))
            }
            Some('\\') => {
                let kind = self.scan_escape(start)?;
                Ok(self.finish(kind, start))
            }
            Some('@') if quote == Quote::Double && self.at("@<") => {
                self.bump_n(2);
                self.push_frame(LexerMode::Normal, Closer::Angle);
                Ok(self.finish(TokenKind::AngleOpen, start))
            }
            Some('@') if at_reference_len(self.rest()).is_some() => {
                self.bump();
                self.push_frame(LexerMode::InsideAtReference, Closer::None);
                Ok(self.finish(TokenKind::AtSign, start))
            }
            Some(_) => {
                // A literal `@` that opens nothing belongs to the fragment.
                if self.peek() == Some('@') {
                    self.bump();
                }
                while let Some(c) = self.peek() {
                    let stops = c == quote.as_char()
                        || matches!(c, '\\' | '\n' | '\r')
                        || (c == '@' && self.string_at_opens(quote));
                    if stops {
                        break;
                    }
                    self.bump();
                }
                Ok(self.finish(TokenKind::StringFragment, start))
            }
        }
    }

    fn string_at_opens(&self, quote: Quote) -> bool {
        (quote == Quote::Double && self.at("@<")) || at_reference_len(self.rest()).is_some()
    }

    /// Escape sequence starting at a backslash.
    fn scan_escape(&mut self, start: Position) -> Result<TokenKind, LexError> {
        self.bump();
        let Some(ch) = self.peek() else {
            return Err(self.error_at(LexErrorKind::InvalidEscape, start));
        };
        match ch {
            'x' => {
                self.bump();
                let digits = self.bump_hex(2);
                if digits != 2 {
                    return Err(self.error_at(LexErrorKind::InvalidEscape, start));
                }
            }
            'u' => {
                self.bump();
                if self.peek() == Some('{') {
                    self.bump();
                    let digits = self.bump_hex(usize::MAX);
                    if digits == 0 || self.peek() != Some('}') {
                        return Err(self.error_at(LexErrorKind::InvalidEscape, start));
                    }
                    self.bump();
                } else if self.bump_hex(4) != 4 {
                    return Err(self.error_at(LexErrorKind::InvalidEscape, start));
                }
            }
            '0'..='7' => {
                let mut n = 0;
                while n < 3 && self.peek().is_some_and(|c| ('0'..='7').contains(&c)) {
                    self.bump();
                    n += 1;
                }
            }
            '\r' if self.peek_nth(1) == Some('\n') => {
                self.bump_n(2);
            }
            _ => {
                self.bump();
            }
        }
        Ok(TokenKind::EscapeSequence)
    }

    fn bump_hex(&mut self, max: usize) -> usize {
        let mut n = 0;
        while n < max && self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            self.bump();
            n += 1;
        }
        n
    }

    fn at_unicode_escape(&self) -> bool {
        unicode_escape_len(self.rest()).is_some()
    }

    fn skip_unicode_escape(&mut self) {
        if let Some(len) = unicode_escape_len(self.rest()) {
            self.bump_n(len);
        }
    }

    fn scan_identifier(&mut self) {
        let start = self.pos;
        loop {
            match self.peek() {
                Some('@') => {
                    // Stop where an at-construct begins; a lone `@` is part of the name.
                    if self.pos != start
                        && (self.at("@<") || self.at("@[") || at_reference_len(self.rest()).is_some())
                    {
                        break;
                    }
                    self.bump();
                }
                Some('\\') if self.at_unicode_escape() => self.skip_unicode_escape(),
                Some(c) if is_identifier_char(c) => {
                    self.bump();
                }
                _ => break,
            }
        }
    }

    fn scan_number(&mut self) {
        let radix = match (self.peek(), self.peek_nth(1)) {
            (Some('0'), Some('x' | 'X')) => Some(16),
            (Some('0'), Some('b' | 'B')) => Some(2),
            (Some('0'), Some('o' | 'O')) => Some(8),
            _ => None,
        };
        if let Some(radix) = radix {
            if self.peek_nth(2).is_some_and(|c| c.is_digit(radix)) {
                self.bump_n(2);
                self.bump_digits(radix);
                if self.peek() == Some('n') {
                    self.bump();
                }
                return;
            }
        }

        let mut integer = true;
        if self.peek() != Some('.') {
            self.bump_digits(10);
        }
        if self.peek() == Some('.') {
            integer = false;
            self.bump();
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump_digits(10);
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let signed = matches!(self.peek_nth(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                integer = false;
                self.bump_n(digit_at);
                self.bump_digits(10);
            }
        }
        if integer && self.peek() == Some('n') {
            self.bump();
        }
    }

    /// `d(_?d)*` in the given radix.
    fn bump_digits(&mut self, radix: u32) {
        self.bump();
        loop {
            match (self.peek(), self.peek_nth(1)) {
                (Some('_'), Some(d)) if d.is_digit(radix) => self.bump_n(2),
                (Some(d), _) if d.is_digit(radix) => {
                    self.bump();
                }
                _ => break,
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token().map(|result| {
            result.unwrap_or_else(|err| Token {
                kind: TokenKind::Error(err.kind),
                text: self.input[err.span.byte_range()].to_string(),
                span: err.span,
            })
        })
    }
}

/// Characters that end identifiers and at-reference names.
fn is_reserved(c: char) -> bool {
    c.is_control()
        || matches!(
            c,
            ':' | ';'
                | '`'
                | '"'
                | '\''
                | '@'
                | '#'
                | '.'
                | ','
                | '^'
                | '&'
                | '<'
                | '='
                | '>'
                | '+'
                | '-'
                | '*'
                | '/'
                | '\\'
                | '%'
                | '?'
                | '!'
                | '~'
                | '('
                | ')'
                | '['
                | ']'
                | '{'
                | '}'
                | '\u{FEFF}'
                | '\u{2060}'
                | '\u{200B}'
                | '\u{2028}'
                | '\u{2029}'
        )
}

fn is_at_reference_char(c: char) -> bool {
    !is_reserved(c) && !c.is_whitespace()
}

fn is_identifier_char(c: char) -> bool {
    is_at_reference_char(c) && c != '|'
}

fn is_identifier_start(c: char) -> bool {
    c == '@' || (is_identifier_char(c) && !c.is_ascii_digit())
}

/// Byte length of `\uHHHH` or `\u{H+}` at the start of `s`.
fn unicode_escape_len(s: &str) -> Option<usize> {
    let body = s.strip_prefix("\\u")?;
    if let Some(braced) = body.strip_prefix('{') {
        let digits = braced.bytes().take_while(u8::is_ascii_hexdigit).count();
        (digits > 0 && braced.as_bytes().get(digits) == Some(&b'}')).then_some(digits + 4)
    } else {
        let digits = body.bytes().take(4).take_while(u8::is_ascii_hexdigit).count();
        (digits == 4).then_some(6)
    }
}

/// Byte length of a complete `@name@` at the start of `s`.
fn at_reference_len(s: &str) -> Option<usize> {
    if !s.starts_with('@') {
        return None;
    }
    let mut idx = 1;
    while let Some(c) = s[idx..].chars().next() {
        if c == '@' {
            return Some(idx + 1);
        }
        if let Some(esc) = unicode_escape_len(&s[idx..]) {
            idx += esc;
        } else if is_at_reference_char(c) {
            idx += c.len_utf8();
        } else {
            return None;
        }
    }
    None
}

/// Length of the symbolic operator at the start of `s`, longest match first.
fn operator_len(s: &str) -> Option<usize> {
    const OPERATORS: [&str; 23] = [
        "**", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "*", "/", "%", "+", "-", "<", ">",
        "&", "^", "|", "~", "!", "?", ":",
    ];
    if s.starts_with('=') && !s.starts_with("==") {
        return Some(1);
    }
    OPERATORS.iter().find(|op| s.starts_with(*op)).map(|op| op.len())
}

/// Length of a printf-style `%…` specifier at the start of `s`.
fn number_format_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 1;
    if bytes.first() != Some(&b'%') {
        return None;
    }
    if matches!(bytes.get(i), Some(b'-' | b'+' | b' ' | b'#' | b'0')) {
        i += 1;
    }
    if bytes.get(i) == Some(&b'*') {
        i += 1;
    } else {
        i += bytes[i..].iter().take_while(|b| b.is_ascii_digit()).count();
    }
    if bytes.get(i) == Some(&b'.') {
        match bytes.get(i + 1) {
            Some(b'*') => i += 2,
            Some(b) if b.is_ascii_digit() => {
                i += 1;
                i += bytes[i..].iter().take_while(|b| b.is_ascii_digit()).count();
            }
            _ => return None,
        }
    }
    matches!(
        bytes.get(i),
        Some(
            b'd' | b'i'
                | b'u'
                | b'o'
                | b'x'
                | b'X'
                | b'f'
                | b'F'
                | b'e'
                | b'E'
                | b'g'
                | b'G'
                | b'a'
                | b'A'
        )
    )
    .then_some(i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .map(|t| t.kind)
            .collect()
    }

    fn texts(input: &str) -> Vec<String> {
        tokenize(input)
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn section_header() {
        assert_eq!(
            kinds("File { Grid = \"n1.tdr\" }"),
            vec![
                TokenKind::Identifier,
                TokenKind::OpenBrace,
                TokenKind::Identifier,
                TokenKind::Operator,
                TokenKind::Quote(Quote::Double),
                TokenKind::StringFragment,
                TokenKind::Quote(Quote::Double),
                TokenKind::CloseBrace,
            ]
        );
    }

    #[test]
    fn directive_versus_comment() {
        let tokens = tokenize("#define X 1\n#ifdef comment\n# plain");
        assert_eq!(tokens[0].kind, TokenKind::Directive(DirectiveKind::Define));
        assert_eq!(tokens[0].text, "#define");
        let comments: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Comment)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(comments, vec!["#ifdef comment", "# plain"]);
    }

    #[test]
    fn numbers() {
        assert_eq!(
            texts("1 1_000 0x1F 0b1010 0o17 12n 1.5 .5 1. 2e-3 1.5E+10"),
            vec!["1", "1_000", "0x1F", "0b1010", "0o17", "12n", "1.5", ".5", "1.", "2e-3", "1.5E+10"]
        );
        assert!(kinds("0x1F 2e-3 .5").iter().all(|k| *k == TokenKind::Number));
    }

    #[test]
    fn exponent_without_digits_is_not_consumed() {
        assert_eq!(texts("2e"), vec!["2", "e"]);
    }

    #[test]
    fn operators_longest_match() {
        assert_eq!(
            texts("a**b<<c<=d==e!=f&&g||h"),
            vec!["a", "**", "b", "<<", "c", "<=", "d", "==", "e", "!=", "f", "&&", "g", "||", "h"]
        );
    }

    #[test]
    fn at_reference_mode() {
        let mut lexer = Lexer::new("@Vd@ x");
        let open = lexer.next_token().expect("token").expect("ok");
        assert_eq!(open.kind, TokenKind::AtSign);
        assert_eq!(lexer.mode(), LexerMode::InsideAtReference);
        let name = lexer.next_token().expect("token").expect("ok");
        assert_eq!(name.kind, TokenKind::AtReferenceName);
        assert_eq!(name.text, "Vd");
        let close = lexer.next_token().expect("token").expect("ok");
        assert_eq!(close.kind, TokenKind::AtSign);
        assert_eq!(lexer.mode(), LexerMode::Normal);
    }

    #[test]
    fn lone_at_is_identifier_text() {
        let tokens = kinds("user@host");
        assert_eq!(tokens, vec![TokenKind::Identifier]);
    }

    #[test]
    fn string_parts() {
        assert_eq!(
            kinds(r#""a\n@b@ @<1+2>@ mail@x""#),
            vec![
                TokenKind::Quote(Quote::Double),
                TokenKind::StringFragment,
                TokenKind::EscapeSequence,
                TokenKind::AtSign,
                TokenKind::AtReferenceName,
                TokenKind::AtSign,
                TokenKind::StringFragment,
                TokenKind::AngleOpen,
                TokenKind::Number,
                TokenKind::Operator,
                TokenKind::Number,
                TokenKind::AngleClose,
                TokenKind::StringFragment,
                TokenKind::Quote(Quote::Double),
            ]
        );
    }

    #[test]
    fn single_quotes_do_not_open_angle() {
        assert_eq!(
            kinds("'@<x>@'"),
            vec![
                TokenKind::Quote(Quote::Single),
                TokenKind::StringFragment,
                TokenKind::Quote(Quote::Single),
            ]
        );
    }

    #[test]
    fn unterminated_string() {
        let tokens = tokenize("\"open\nnext");
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Error(LexErrorKind::UnterminatedLiteral)));
        assert_eq!(tokens.last().map(|t| t.text.as_str()), Some("next"));
    }

    #[test]
    fn invalid_escapes() {
        let tokens = tokenize(r#""\xZ \u12 \u{}""#);
        let errors = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Error(LexErrorKind::InvalidEscape))
            .count();
        assert_eq!(errors, 3);
    }

    #[test]
    fn valid_escapes() {
        let parts = texts(r#""\x41é\u{1F600}\101\q""#);
        assert_eq!(
            &parts[1..6],
            &[r"\x41", "é", r"\u{1F600}", r"\101", r"\q"]
        );
    }

    #[test]
    fn embedded_block() {
        assert_eq!(
            kinds("!(set a (1) { })!"),
            vec![
                TokenKind::EmbeddedOpen,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::OpenParen,
                TokenKind::Number,
                TokenKind::CloseParen,
                TokenKind::OpenBrace,
                TokenKind::CloseBrace,
                TokenKind::EmbeddedClose,
            ]
        );
    }

    #[test]
    fn unterminated_embedded_block() {
        let tokens = tokenize("!( a");
        assert_eq!(
            tokens.last().map(|t| &t.kind),
            Some(&TokenKind::Error(LexErrorKind::UnterminatedLiteral))
        );
    }

    #[test]
    fn number_format_only_in_commands() {
        assert_eq!(
            kinds("@[format %.2f x]@"),
            vec![
                TokenKind::SquareOpen,
                TokenKind::Identifier,
                TokenKind::NumberFormat,
                TokenKind::Identifier,
                TokenKind::SquareClose,
            ]
        );
        assert_eq!(texts("a %d"), vec!["a", "%", "d"]);
    }

    #[test]
    fn angle_close_only_inside_angle() {
        assert_eq!(texts("a >@b@"), vec!["a", ">", "@", "b", "@"]);
        assert_eq!(texts("@<a>1>@"), vec!["@<", "a", ">", "1", ">@"]);
    }

    #[test]
    fn invalid_character() {
        let tokens = tokenize("a ; b");
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Error(LexErrorKind::InvalidCharacter(';'))));
    }

    #[test]
    fn line_continuation_is_trivia() {
        let tokens = tokenize("a \\\n b");
        assert!(tokens.iter().any(|t| t.kind == TokenKind::LineContinuation));
        assert_eq!(texts("a \\\n b"), vec!["a", "b"]);
    }

    #[test]
    fn bom_is_whitespace() {
        let tokens = tokenize("\u{FEFF}File");
        assert_eq!(tokens[0].kind, TokenKind::Whitespace);
        assert_eq!(tokens[1].text, "File");
    }

    #[test]
    fn span_tracking() {
        let tokens = tokenize("a\nbé c");
        assert_eq!(tokens[0].span.start, Position { offset: 0, line: 1, column: 1 });
        let c = tokens.iter().find(|t| t.text == "c").expect("c token");
        assert_eq!(c.span.start.line, 2);
        assert_eq!(c.span.start.column, 4);
        assert_eq!(c.span.start.offset, 6);
    }

    #[test]
    fn lossless() {
        let input = "Physics(Material=\"Si\") { Mobility(DopingDep) } #c\n!(x)! @a@ \"@\" ;";
        let joined: String = tokenize(input).into_iter().map(|t| t.text).collect();
        assert_eq!(joined, input);
    }
}
