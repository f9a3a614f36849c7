//! Recursive-descent parser driving the [`TreeBuilder`].
//!
//! The parser pulls tokens from the lexer through a small lookahead buffer.
//! Trivia never reaches the grammar functions: it is flushed into whichever
//! node is open when the next significant token is consumed. Nothing here
//! aborts on bad input; problems become error nodes and parsing resumes at
//! the next member or statement boundary.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::builder::{Checkpoint, Shift, TreeBuilder};
use crate::directive::{Arm, Continuation, DirectiveKind, DirectiveStack};
use crate::incremental::Reuse;
use crate::lexer::Lexer;
use crate::options::ParseOptions;
use crate::sections::Context;
use crate::token::{Token, TokenKind};
use crate::tree::{ErrorCode, Field, NodeKind, ParseTree};
use crate::{Error, Resource};

pub(crate) type PResult<T = ()> = Result<T, Error>;

pub(crate) struct Parser<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    lookahead: VecDeque<Token>,
    builder: TreeBuilder,
    directives: DirectiveStack,
    closers: Vec<TokenKind>,
    depth: usize,
    max_depth: usize,
    line_bound: bool,
    reuse: Option<Reuse<'a>>,
    reused: usize,
    parsed: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(source: &'a str, options: &ParseOptions) -> Self {
        Self {
            source,
            lexer: Lexer::new(source),
            lookahead: VecDeque::new(),
            builder: TreeBuilder::new(),
            directives: DirectiveStack::new(),
            closers: Vec::new(),
            depth: 0,
            max_depth: options.depth_limit(),
            line_bound: false,
            reuse: None,
            reused: 0,
            parsed: 0,
        }
    }

    /// Offer statements of an older tree for splicing.
    pub(crate) fn reusing(mut self, reuse: Reuse<'a>) -> Self {
        self.reuse = Some(reuse);
        self
    }

    pub(crate) fn run(mut self) -> PResult<ParseTree> {
        self.builder.start_node(NodeKind::SourceFile);
        loop {
            self.eat_trivia();
            if self.try_reuse() {
                continue;
            }
            if self.nth_kind(0).is_none() {
                break;
            }
            self.parsed += 1;
            self.member(Context::TopLevel)?;
        }
        self.builder.finish_node();
        debug!(
            target: "sdevice_syntax::parser",
            statements = self.parsed + self.reused,
            reused = self.reused,
            "parse finished"
        );
        Ok(self.builder.finish(self.source.to_string()))
    }

    // -- token cursor --

    /// Make sure `n + 1` significant tokens are buffered, if the input has them.
    fn fill(&mut self, n: usize) {
        let mut seen = self
            .lookahead
            .iter()
            .filter(|t| !t.kind.is_trivia())
            .count();
        while seen <= n {
            let Some(token) = self.lexer.next() else {
                return;
            };
            if !token.kind.is_trivia() {
                seen += 1;
            }
            self.lookahead.push_back(token);
        }
    }

    /// The `n`-th significant token ahead.
    pub(crate) fn nth(&mut self, n: usize) -> Option<&Token> {
        self.fill(n);
        self.lookahead.iter().filter(|t| !t.kind.is_trivia()).nth(n)
    }

    pub(crate) fn nth_kind(&mut self, n: usize) -> Option<TokenKind> {
        self.nth(n).map(|t| t.kind)
    }

    pub(crate) fn at(&mut self, kind: TokenKind) -> bool {
        self.nth_kind(0) == Some(kind)
    }

    pub(crate) fn nth_at(&mut self, n: usize, kind: TokenKind) -> bool {
        self.nth_kind(n) == Some(kind)
    }

    pub(crate) fn at_operator(&mut self, op: &str) -> bool {
        self.nth(0).is_some_and(|t| t.is_operator(op))
    }

    pub(crate) fn at_identifier(&mut self, text: &str) -> bool {
        self.nth(0)
            .is_some_and(|t| t.kind == TokenKind::Identifier && t.text == text)
    }

    /// Whether a line break separates the last consumed token from the next
    /// significant one.
    pub(crate) fn on_new_line(&mut self) -> bool {
        self.fill(0);
        self.lookahead
            .iter()
            .take_while(|t| t.kind.is_trivia())
            .any(|t| t.kind == TokenKind::Whitespace && t.text.contains(['\n', '\r']))
    }

    fn eat_trivia(&mut self) {
        self.fill(0);
        while self.lookahead.front().is_some_and(|t| t.kind.is_trivia()) {
            if let Some(token) = self.lookahead.pop_front() {
                self.builder.token(token);
            }
        }
    }

    pub(crate) fn bump(&mut self) {
        self.eat_trivia();
        if let Some(token) = self.lookahead.pop_front() {
            self.builder.token(token);
        }
    }

    /// Consume the next token, reclassifying it as `kind`.
    pub(crate) fn bump_as(&mut self, kind: TokenKind) {
        self.eat_trivia();
        if let Some(mut token) = self.lookahead.pop_front() {
            token.kind = kind;
            self.builder.token(token);
        }
    }

    // -- node events --

    pub(crate) fn start(&mut self, kind: NodeKind) {
        self.eat_trivia();
        self.builder.start_node(kind);
    }

    pub(crate) fn finish(&mut self) {
        self.builder.finish_node();
    }

    pub(crate) fn checkpoint(&mut self) -> Checkpoint {
        self.eat_trivia();
        self.builder.checkpoint()
    }

    pub(crate) fn start_at(&mut self, checkpoint: Checkpoint, kind: NodeKind) {
        self.builder.start_node_at(checkpoint, kind);
    }

    pub(crate) fn label(&mut self, field: Field) {
        self.builder.label(field);
    }

    /// Run `f` one nesting level deeper.
    pub(crate) fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        self.depth += 1;
        if self.depth > self.max_depth {
            debug!(
                target: "sdevice_syntax::parser",
                limit = self.max_depth,
                "nesting limit exceeded"
            );
            return Err(Error::ResourceExceeded {
                resource: Resource::NestingDepth,
                limit: self.max_depth,
            });
        }
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Run `f` with `closer` as the innermost expected delimiter.
    pub(crate) fn delimited<T>(
        &mut self,
        closer: TokenKind,
        f: impl FnOnce(&mut Self) -> PResult<T>,
    ) -> PResult<T> {
        self.closers.push(closer);
        let result = self.nested(f);
        self.closers.pop();
        result
    }

    // -- errors --

    /// Zero-width error node at the end of the last consumed token.
    pub(crate) fn missing(&mut self, code: ErrorCode, message: impl Into<String>) {
        let message = message.into();
        trace!(target: "sdevice_syntax::parser", %code, %message, "missing element");
        self.builder.start_error(code, message);
        self.builder.finish_node();
    }

    /// Wrap the next token in an error node.
    pub(crate) fn error_token(&mut self, code: ErrorCode, message: impl Into<String>) {
        self.eat_trivia();
        let message = message.into();
        trace!(target: "sdevice_syntax::parser", %code, %message, "error token");
        self.builder.start_error(code, message);
        self.bump();
        self.builder.finish_node();
    }

    /// Wrap the next token in an error node describing why it is not
    /// accepted here.
    pub(crate) fn unexpected(&mut self) {
        let Some(token) = self.nth(0) else {
            return;
        };
        let (code, message) = match token.kind {
            TokenKind::Error(kind) => (ErrorCode::Lex(kind), kind.to_string()),
            TokenKind::CloseBrace
            | TokenKind::CloseParen
            | TokenKind::CloseBracket
            | TokenKind::AngleClose
            | TokenKind::SquareClose
            | TokenKind::EmbeddedClose => (
                ErrorCode::UnbalancedDelimiter,
                format!("unmatched `{}`", token.text),
            ),
            _ => (
                ErrorCode::UnexpectedToken,
                format!("unexpected `{}`", token.text),
            ),
        };
        self.error_token(code, message);
    }

    /// Consume `closer`, or record that it is missing.
    pub(crate) fn expect_closer(&mut self, closer: TokenKind) {
        if self.at(closer) {
            self.bump();
        } else {
            self.missing(
                ErrorCode::UnbalancedDelimiter,
                format!("expected `{}`", closer.name()),
            );
        }
    }

    /// Whether the next token ends an enclosing construct, so the current
    /// one must stop. Directive operands also end at a line break.
    pub(crate) fn at_boundary(&mut self) -> bool {
        match self.nth_kind(0) {
            None => true,
            Some(kind) => {
                self.closes_enclosing(kind)
                    || self.closes_conditional(kind)
                    || (self.line_bound && self.on_new_line())
            }
        }
    }

    /// Run `f` with fresh delimiter and conditional state, as inside an
    /// embedded block whose content does not see the enclosing braces.
    pub(crate) fn isolated<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let closers = std::mem::take(&mut self.closers);
        let directives = std::mem::take(&mut self.directives);
        let line_bound = std::mem::replace(&mut self.line_bound, false);
        let result = f(self);
        self.closers = closers;
        self.directives = directives;
        self.line_bound = line_bound;
        result
    }

    pub(crate) fn closes_enclosing(&self, kind: TokenKind) -> bool {
        self.closers.contains(&kind)
    }

    fn closes_conditional(&self, kind: TokenKind) -> bool {
        match kind {
            TokenKind::Directive(d) if d.continues_conditional() => {
                self.directives.classify(d, self.closers.len()) == Continuation::Closes
            }
            _ => false,
        }
    }

    /// Skip tokens up to the next line break or enclosing boundary, all
    /// inside one error node.
    pub(crate) fn recover_line(&mut self, message: impl Into<String>) {
        self.eat_trivia();
        self.builder
            .start_error(ErrorCode::UnexpectedToken, message.into());
        loop {
            self.bump();
            if self.at_boundary()
                || self.on_new_line()
                || matches!(self.nth_kind(0), Some(TokenKind::Directive(_)))
            {
                break;
            }
        }
        self.builder.finish_node();
    }

    // -- directives --

    pub(crate) fn directive(&mut self, ctx: Context) -> PResult {
        let Some(TokenKind::Directive(kind)) = self.nth_kind(0) else {
            self.unexpected();
            return Ok(());
        };
        match kind {
            DirectiveKind::Define => self.define(),
            DirectiveKind::Undef => {
                self.start(NodeKind::DirectiveStatement);
                self.bump();
                self.label(Field::Directive);
                self.macro_name();
                self.finish();
                Ok(())
            }
            DirectiveKind::Setdep => {
                self.start(NodeKind::DirectiveStatement);
                self.bump();
                self.label(Field::Directive);
                if !self.on_new_line() && self.at(TokenKind::AtSign) {
                    self.at_reference();
                } else {
                    self.missing(ErrorCode::MissingValue, "expected `@node@` after `#setdep`");
                }
                self.label(Field::Value);
                self.finish();
                Ok(())
            }
            DirectiveKind::If => self.nested(|p| p.conditional(ctx)),
            DirectiveKind::Elif | DirectiveKind::Else | DirectiveKind::Endif => {
                self.orphan(kind)
            }
        }
    }

    fn define(&mut self) -> PResult {
        self.start(NodeKind::DirectiveStatement);
        self.bump();
        self.label(Field::Directive);
        self.macro_name();
        self.directive_operand("expected a value after the macro name")?;
        self.label(Field::Value);
        self.finish();
        Ok(())
    }

    fn macro_name(&mut self) {
        if !self.on_new_line() && self.at(TokenKind::Identifier) {
            self.bump();
        } else {
            self.missing(ErrorCode::MissingValue, "expected a macro name");
        }
        self.label(Field::Name);
    }

    /// Expression confined to the directive's logical line.
    fn directive_operand(&mut self, message: &str) -> PResult {
        let line_bound = std::mem::replace(&mut self.line_bound, true);
        let result = if self.at_boundary() {
            self.missing(ErrorCode::MissingValue, message);
            Ok(())
        } else {
            self.expression()
        };
        self.line_bound = line_bound;
        result
    }

    fn conditional(&mut self, ctx: Context) -> PResult {
        self.start(NodeKind::DirectiveStatement);
        self.bump();
        self.label(Field::Directive);
        self.directive_operand("expected a condition after `#if`")?;
        self.label(Field::Condition);

        self.directives.push(self.closers.len());
        let result = self.conditional_arms(ctx);
        self.directives.pop();
        result?;

        if matches!(self.nth_kind(0), Some(TokenKind::Directive(DirectiveKind::Endif))) {
            self.bump();
        } else {
            self.missing(ErrorCode::UnmatchedDirective, "`#if` without matching `#endif`");
        }
        self.label(Field::End);
        self.finish();
        Ok(())
    }

    fn conditional_arms(&mut self, ctx: Context) -> PResult {
        self.directive_body(ctx)?;
        self.label(Field::Consequence);
        self.alternative(ctx)
    }

    fn alternative(&mut self, ctx: Context) -> PResult {
        let kind = match self.nth_kind(0) {
            Some(TokenKind::Directive(kind)) if self.closes_conditional(TokenKind::Directive(kind)) => kind,
            _ => return Ok(()),
        };
        match kind {
            DirectiveKind::Elif => {
                self.directives.enter_arm(Arm::Elif);
                self.start(NodeKind::ElifClause);
                self.bump();
                self.label(Field::Directive);
                self.directive_operand("expected a condition after `#elif`")?;
                self.label(Field::Condition);
                self.nested(|p| p.conditional_arms(ctx))?;
                self.finish();
                self.label(Field::Alternative);
            }
            DirectiveKind::Else => {
                self.directives.enter_arm(Arm::Else);
                self.start(NodeKind::ElseClause);
                self.bump();
                self.label(Field::Directive);
                self.directive_body(ctx)?;
                self.label(Field::Body);
                self.finish();
                self.label(Field::Alternative);
            }
            _ => {}
        }
        Ok(())
    }

    fn directive_body(&mut self, ctx: Context) -> PResult {
        self.start(NodeKind::DirectiveBody);
        self.members(ctx)?;
        self.finish();
        Ok(())
    }

    /// `#elif`, `#else` or `#endif` with no open `#if` to continue.
    fn orphan(&mut self, kind: DirectiveKind) -> PResult {
        let message = match self.directives.current_arm() {
            Some(Arm::Else) if kind != DirectiveKind::Endif => {
                format!("`{kind}` after `#else`")
            }
            _ => format!("`{kind}` without matching `#if`"),
        };
        self.eat_trivia();
        self.builder.start_error(ErrorCode::UnmatchedDirective, message);
        self.bump();
        self.label(Field::Directive);
        if kind == DirectiveKind::Elif {
            self.directive_operand("expected a condition after `#elif`")?;
            self.label(Field::Condition);
        }
        self.finish();
        Ok(())
    }

    // -- incremental reuse --

    fn try_reuse(&mut self) -> bool {
        // The resumed lexer starts at base, so the running one must be there too.
        if self.lookahead.len() != 1 || !self.lexer.is_at_base() {
            return false;
        }
        let Some(offset) = self.lookahead.front().map(|t| t.span.start) else {
            return false;
        };
        let Some((old, node)) = self
            .reuse
            .as_ref()
            .and_then(|r| r.candidate(offset.offset).map(|node| (r.old(), node)))
        else {
            return false;
        };
        let old_node = old.node(node);
        let shift = Shift {
            old_start: old_node.start(),
            new_start: offset,
        };
        let resume_at = shift.apply(old_node.end());
        trace!(
            target: "sdevice_syntax::incremental",
            kind = %old_node.kind(),
            from = old_node.start().offset,
            to = offset.offset,
            "reusing statement"
        );
        self.lookahead.clear();
        self.builder.graft(old, node, &shift);
        self.lexer = Lexer::resume(self.source, resume_at);
        self.reused += 1;
        true
    }
}
