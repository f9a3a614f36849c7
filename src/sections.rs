//! Section statements and their context-dependent member grammars.

use crate::parser::{PResult, Parser};
use crate::token::TokenKind;
use crate::tree::{ErrorCode, Field, NodeKind, SectionKind};

/// Which member grammar applies inside the construct being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Context {
    TopLevel,
    File,
    Electrode,
    ElectrodeGroup,
    Physics,
    PhysicsArgs,
    Traps,
    TrapsMember,
    Plot,
    CurrentPlot,
    CurrentPlotArgs,
    Position,
    Window,
    Generic,
}

impl Context {
    const fn for_section(kind: SectionKind) -> Self {
        match kind {
            SectionKind::File => Self::File,
            SectionKind::Electrode => Self::Electrode,
            SectionKind::Physics => Self::Physics,
            SectionKind::Plot => Self::Plot,
            SectionKind::CurrentPlot => Self::CurrentPlot,
            SectionKind::Other => Self::Generic,
        }
    }
}

impl Parser<'_> {
    /// Parse members until an enclosing closer, a directive ending the
    /// current conditional arm, or end of input.
    pub(crate) fn members(&mut self, ctx: Context) -> PResult {
        while !self.at_boundary() {
            self.member(ctx)?;
        }
        Ok(())
    }

    /// One member of `ctx`. Always consumes at least one token.
    pub(crate) fn member(&mut self, ctx: Context) -> PResult {
        let Some(kind) = self.nth_kind(0) else {
            return Ok(());
        };
        match kind {
            TokenKind::Directive(_) => return self.directive(ctx),
            TokenKind::EmbeddedOpen => return self.embedded_block(),
            _ => {}
        }
        match ctx {
            Context::TopLevel => self.top_level_member(kind),
            Context::File => self.file_member(),
            Context::Electrode => {
                if kind == TokenKind::OpenBrace {
                    self.electrode_group()
                } else {
                    self.unexpected();
                    Ok(())
                }
            }
            Context::ElectrodeGroup => {
                if self.at_key_value() {
                    self.key_value(true)
                } else {
                    self.unexpected();
                    Ok(())
                }
            }
            Context::Physics | Context::PhysicsArgs | Context::TrapsMember => {
                self.physics_member(ctx)
            }
            Context::Traps => {
                if kind == TokenKind::OpenParen {
                    self.traps_member()
                } else {
                    self.unexpected();
                    Ok(())
                }
            }
            Context::Plot => {
                self.plot_member();
                Ok(())
            }
            Context::CurrentPlot => {
                if self.at_call() {
                    self.call(Context::CurrentPlotArgs)
                } else {
                    self.unexpected();
                    Ok(())
                }
            }
            Context::CurrentPlotArgs => self.current_plot_argument(),
            Context::Position => {
                self.coordinate();
                Ok(())
            }
            Context::Window => {
                if kind == TokenKind::OpenParen {
                    self.position()
                } else {
                    self.unexpected();
                    Ok(())
                }
            }
            Context::Generic => self.generic_member(),
        }
    }

    fn top_level_member(&mut self, kind: TokenKind) -> PResult {
        if kind == TokenKind::Identifier {
            self.section_statement()
        } else {
            self.unexpected();
            Ok(())
        }
    }

    // -- sections --

    fn section_statement(&mut self) -> PResult {
        let section = self
            .nth(0)
            .map_or(SectionKind::Other, |t| SectionKind::from_name(&t.text));
        self.start(NodeKind::SectionStatement);
        self.bump();
        self.label(Field::Name);

        if self.at(TokenKind::OpenParen) {
            self.range_qualifier()?;
        }
        if self.at(TokenKind::OpenBrace) {
            self.section_body(Context::for_section(section))?;
            self.label(Field::Body);
        } else {
            self.missing(ErrorCode::UnexpectedToken, "expected `{` after the section name");
        }
        self.finish();
        Ok(())
    }

    /// `( key = value )` after a section name.
    fn range_qualifier(&mut self) -> PResult {
        self.bump();
        self.delimited(TokenKind::CloseParen, |p| {
            if p.at_key_value() {
                p.key_value(false)?;
            } else {
                p.missing(ErrorCode::MissingValue, "expected `key = value` qualifier");
            }
            p.label(Field::Range);
            p.reject_rest();
            Ok(())
        })?;
        self.expect_closer(TokenKind::CloseParen);
        Ok(())
    }

    pub(crate) fn section_body(&mut self, ctx: Context) -> PResult {
        self.start(NodeKind::SectionBody);
        self.bump();
        self.delimited(TokenKind::CloseBrace, |p| p.members(ctx))?;
        self.expect_closer(TokenKind::CloseBrace);
        self.finish();
        Ok(())
    }

    // -- member shapes --

    fn at_key_value(&mut self) -> bool {
        self.at(TokenKind::Identifier) && self.nth(1).is_some_and(|t| t.is_operator("="))
    }

    fn at_call(&mut self) -> bool {
        self.at(TokenKind::Identifier) && self.nth_at(1, TokenKind::OpenParen)
    }

    fn file_member(&mut self) -> PResult {
        if self.at_key_value() {
            return self.key_value(false);
        }
        if self.at(TokenKind::Identifier) {
            self.bump();
        } else {
            self.unexpected();
        }
        Ok(())
    }

    /// Report everything left before the closing delimiter.
    fn reject_rest(&mut self) {
        while !self.at_boundary() {
            self.unexpected();
        }
    }

    pub(crate) fn key_value(&mut self, allow_list: bool) -> PResult {
        self.start(NodeKind::KeyValue);
        self.bump();
        self.label(Field::Key);
        self.bump();
        self.value(allow_list)?;
        self.label(Field::Value);
        self.finish();
        Ok(())
    }

    /// Right-hand side of a key-value.
    fn value(&mut self, allow_list: bool) -> PResult {
        let Some(kind) = self.nth_kind(0) else {
            self.missing(ErrorCode::MissingValue, "expected a value after `=`");
            return Ok(());
        };
        match kind {
            TokenKind::Identifier | TokenKind::Number => self.bump(),
            TokenKind::Quote(_) => self.string()?,
            TokenKind::AtSign => self.at_reference(),
            TokenKind::AngleOpen => self.at_angle_expression(false)?,
            TokenKind::SquareOpen => self.at_square_expression()?,
            TokenKind::EmbeddedOpen => self.embedded_block()?,
            TokenKind::OpenParen if allow_list => self.value_list()?,
            TokenKind::Operator if self.at_signed_number() => self.signed_number(),
            _ => self.missing(ErrorCode::MissingValue, "expected a value after `=`"),
        }
        Ok(())
    }

    fn at_signed_number(&mut self) -> bool {
        (self.at_operator("-") || self.at_operator("+")) && self.nth_at(1, TokenKind::Number)
    }

    fn signed_number(&mut self) {
        self.start(NodeKind::UnaryExpression);
        self.bump();
        self.label(Field::Operator);
        self.bump();
        self.label(Field::Operand);
        self.finish();
    }

    /// `( V at T, V at T, ... )`
    fn value_list(&mut self) -> PResult {
        self.start(NodeKind::ValueList);
        self.bump();
        self.delimited(TokenKind::CloseParen, |p| {
            loop {
                p.voltage_at_time();
                if p.at(TokenKind::Comma) {
                    p.bump();
                } else {
                    break;
                }
            }
            p.reject_rest();
            Ok(())
        })?;
        self.expect_closer(TokenKind::CloseParen);
        self.finish();
        Ok(())
    }

    fn voltage_at_time(&mut self) {
        self.start(NodeKind::VoltageAtTime);
        self.time_operand("expected a voltage");
        self.label(Field::Voltage);
        if self.at_identifier("at") {
            self.bump_as(TokenKind::Keyword);
        } else {
            self.missing(ErrorCode::UnexpectedToken, "expected `at`");
        }
        self.time_operand("expected a time");
        self.label(Field::Time);
        self.finish();
    }

    fn time_operand(&mut self, message: &str) {
        match self.nth_kind(0) {
            Some(TokenKind::Number) => self.bump(),
            Some(TokenKind::Identifier) if !self.at_identifier("at") => self.bump(),
            Some(TokenKind::AtSign) => self.at_reference(),
            Some(TokenKind::Operator) if self.at_signed_number() => self.signed_number(),
            _ => self.missing(ErrorCode::MissingValue, message),
        }
    }

    fn electrode_group(&mut self) -> PResult {
        self.start(NodeKind::ElectrodeGroup);
        self.bump();
        self.delimited(TokenKind::CloseBrace, |p| p.members(Context::ElectrodeGroup))?;
        self.expect_closer(TokenKind::CloseBrace);
        self.finish();
        Ok(())
    }

    fn physics_member(&mut self, ctx: Context) -> PResult {
        if self.at_key_value() {
            return self.key_value(false);
        }
        if ctx == Context::Physics && self.at_identifier("Traps") && self.nth_at(1, TokenKind::OpenParen)
        {
            return self.traps();
        }
        if self.at_call() {
            return self.call(Context::PhysicsArgs);
        }
        if ctx == Context::Physics
            && self.at(TokenKind::Identifier)
            && matches!(self.nth_kind(1), Some(TokenKind::Quote(_)))
        {
            return self.identifier_string();
        }
        if self.at(TokenKind::Identifier) {
            self.bump();
        } else {
            self.unexpected();
        }
        Ok(())
    }

    /// `name( members )`, members parsed in `args`.
    fn call(&mut self, args: Context) -> PResult {
        self.start(NodeKind::Call);
        self.bump();
        self.label(Field::Name);
        self.argument_list(args)?;
        self.label(Field::Args);
        if args == Context::Generic && self.at(TokenKind::OpenBrace) {
            self.section_body(Context::Generic)?;
            self.label(Field::Body);
        }
        self.finish();
        Ok(())
    }

    fn argument_list(&mut self, ctx: Context) -> PResult {
        self.start(NodeKind::ArgumentList);
        self.bump();
        self.delimited(TokenKind::CloseParen, |p| p.members(ctx))?;
        self.expect_closer(TokenKind::CloseParen);
        self.finish();
        Ok(())
    }

    fn traps(&mut self) -> PResult {
        self.start(NodeKind::Traps);
        self.bump();
        self.label(Field::Name);
        self.argument_list(Context::Traps)?;
        self.label(Field::Args);
        self.finish();
        Ok(())
    }

    fn traps_member(&mut self) -> PResult {
        self.start(NodeKind::TrapsMember);
        self.bump();
        self.delimited(TokenKind::CloseParen, |p| p.members(Context::TrapsMember))?;
        self.expect_closer(TokenKind::CloseParen);
        self.finish();
        Ok(())
    }

    fn identifier_string(&mut self) -> PResult {
        self.start(NodeKind::IdentifierString);
        self.bump();
        self.label(Field::Name);
        self.string()?;
        self.label(Field::Value);
        self.finish();
        Ok(())
    }

    fn plot_member(&mut self) {
        if self.at(TokenKind::Identifier) && self.nth(1).is_some_and(|t| t.is_operator("/")) {
            self.start(NodeKind::SlashPair);
            self.bump();
            self.label(Field::Left);
            self.bump();
            self.label(Field::Operator);
            if self.at(TokenKind::Identifier) {
                self.bump();
            } else {
                self.missing(ErrorCode::MissingValue, "expected a name after `/`");
            }
            self.label(Field::Right);
            self.finish();
        } else if self.at(TokenKind::Identifier) {
            self.bump();
        } else {
            self.unexpected();
        }
    }

    fn current_plot_argument(&mut self) -> PResult {
        if self.at_key_value() {
            return self.key_value(false);
        }
        if self.at(TokenKind::OpenParen) {
            return self.position();
        }
        if self.at_identifier("Window") && self.nth_at(1, TokenKind::OpenBracket) {
            return self.window();
        }
        if self.at_call() {
            return self.call(Context::CurrentPlotArgs);
        }
        self.unexpected();
        Ok(())
    }

    /// `( x y z )` coordinates.
    fn position(&mut self) -> PResult {
        self.start(NodeKind::Position);
        self.bump();
        self.delimited(TokenKind::CloseParen, |p| p.members(Context::Position))?;
        self.expect_closer(TokenKind::CloseParen);
        self.finish();
        Ok(())
    }

    fn coordinate(&mut self) {
        match self.nth_kind(0) {
            Some(TokenKind::Number | TokenKind::Identifier) => self.bump(),
            Some(TokenKind::Operator) if self.at_signed_number() => self.signed_number(),
            _ => self.unexpected(),
        }
    }

    /// `Window[ (x1 y1) (x2 y2) ]`
    fn window(&mut self) -> PResult {
        self.start(NodeKind::Window);
        self.bump();
        self.label(Field::Name);
        self.bump();
        self.delimited(TokenKind::CloseBracket, |p| p.members(Context::Window))?;
        self.expect_closer(TokenKind::CloseBracket);
        self.finish();
        Ok(())
    }

    /// Members of sections with no dedicated grammar (`Math`, `Solve`, ...).
    fn generic_member(&mut self) -> PResult {
        if self.at_key_value() {
            return self.key_value(false);
        }
        if self.at_call() {
            return self.call(Context::Generic);
        }
        match self.nth_kind(0) {
            Some(TokenKind::Identifier) if self.nth_at(1, TokenKind::OpenBrace) => self.group(true),
            Some(TokenKind::OpenBrace) => self.group(false),
            Some(TokenKind::Identifier | TokenKind::Number) => {
                self.bump();
                Ok(())
            }
            Some(TokenKind::Quote(_)) => self.string(),
            Some(TokenKind::AtSign) => {
                self.at_reference();
                Ok(())
            }
            Some(TokenKind::Operator) if self.at_signed_number() => {
                self.signed_number();
                Ok(())
            }
            _ => {
                self.unexpected();
                Ok(())
            }
        }
    }

    /// `name { ... }` or an anonymous `{ ... }` block.
    fn group(&mut self, named: bool) -> PResult {
        self.start(NodeKind::Group);
        if named {
            self.bump();
            self.label(Field::Name);
        }
        self.section_body(Context::Generic)?;
        self.label(Field::Body);
        self.finish();
        Ok(())
    }
}
