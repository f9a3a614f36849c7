//! Pratt parser for the expression sub-language, plus the literal atoms
//! (strings, at-references, command substitutions, embedded blocks) it
//! shares with section values.

use crate::lexer::LexErrorKind;
use crate::parser::{PResult, Parser};
use crate::token::{Token, TokenKind};
use crate::tree::{ErrorCode, Field, NodeKind};

/// Binding powers of the loosest and the tightest operator levels.
const TERNARY: u8 = 10;
const UNARY: u8 = 150;

/// Binary operator binding power and associativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Infix {
    Binary { level: u8, right_assoc: bool, word: bool },
    Ternary,
}

impl Infix {
    /// `(left, right)` binding powers.
    const fn binding_power(self) -> (u8, u8) {
        match self {
            Self::Ternary => (TERNARY, TERNARY),
            Self::Binary {
                level,
                right_assoc: true,
                ..
            } => (level, level),
            Self::Binary { level, .. } => (level, level + 1),
        }
    }
}

fn infix(token: &Token) -> Option<Infix> {
    let binary = |level, word| {
        Some(Infix::Binary {
            level,
            right_assoc: false,
            word,
        })
    };
    match token.kind {
        TokenKind::Operator => match token.text.as_str() {
            "?" => Some(Infix::Ternary),
            "||" => binary(20, false),
            "&&" => binary(30, false),
            "|" => binary(40, false),
            "^" => binary(50, false),
            "&" => binary(60, false),
            "==" | "!=" => binary(90, false),
            "<" | ">" | "<=" | ">=" => binary(100, false),
            "<<" | ">>" => binary(110, false),
            "+" | "-" => binary(120, false),
            "*" | "/" | "%" => binary(130, false),
            "**" => Some(Infix::Binary {
                level: 140,
                right_assoc: true,
                word: false,
            }),
            _ => None,
        },
        TokenKind::Identifier => match token.text.as_str() {
            "in" | "ni" => binary(70, true),
            "eq" | "ne" => binary(80, true),
            _ => None,
        },
        _ => None,
    }
}

fn is_prefix_operator(token: &Token) -> bool {
    token.kind == TokenKind::Operator && matches!(token.text.as_str(), "-" | "+" | "~" | "!")
}

fn is_boolean(text: &str) -> bool {
    text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false")
}

impl Parser<'_> {
    pub(crate) fn at_expression_start(&mut self) -> bool {
        self.nth(0).is_some_and(|t| {
            is_prefix_operator(t)
                || matches!(
                    t.kind,
                    TokenKind::Number
                        | TokenKind::Identifier
                        | TokenKind::Quote(_)
                        | TokenKind::AtSign
                        | TokenKind::AngleOpen
                        | TokenKind::SquareOpen
                        | TokenKind::OpenBracket
                        | TokenKind::OpenParen
                        | TokenKind::EscapeSequence
                        | TokenKind::EmbeddedOpen
                )
        })
    }

    pub(crate) fn expression(&mut self) -> PResult {
        self.expression_bp(0)
    }

    fn expression_bp(&mut self, min_bp: u8) -> PResult {
        self.nested(|p| {
            let checkpoint = p.checkpoint();
            p.prefix()?;
            loop {
                if p.at_boundary() {
                    break;
                }
                let Some(op) = p.nth(0).and_then(infix) else {
                    break;
                };
                let (left_bp, right_bp) = op.binding_power();
                if left_bp < min_bp {
                    break;
                }
                match op {
                    Infix::Ternary => {
                        p.start_at(checkpoint, NodeKind::TernaryExpression);
                        p.label(Field::Condition);
                        p.bump();
                        p.operand(0)?;
                        p.label(Field::Consequence);
                        if p.at_operator(":") {
                            p.bump();
                        } else {
                            p.missing(ErrorCode::UnexpectedToken, "expected `:` in conditional");
                        }
                        p.operand(right_bp)?;
                        p.label(Field::Alternative);
                    }
                    Infix::Binary { word, .. } => {
                        p.start_at(checkpoint, NodeKind::BinaryExpression);
                        p.label(Field::Left);
                        if word {
                            p.bump_as(TokenKind::WordOperator);
                        } else {
                            p.bump();
                        }
                        p.label(Field::Operator);
                        p.operand(right_bp)?;
                        p.label(Field::Right);
                    }
                }
                p.finish();
            }
            Ok(())
        })
    }

    /// Right-hand operand; reports an error node when none can start here.
    fn operand(&mut self, min_bp: u8) -> PResult {
        if !self.at_boundary() && self.at_expression_start() {
            self.expression_bp(min_bp)
        } else {
            self.missing_expression();
            Ok(())
        }
    }

    fn prefix(&mut self) -> PResult {
        let Some(token) = self.nth(0) else {
            self.missing_expression();
            return Ok(());
        };
        let kind = token.kind;
        let boolean = kind == TokenKind::Identifier && is_boolean(&token.text);
        if is_prefix_operator(token) {
            self.start(NodeKind::UnaryExpression);
            self.bump();
            self.label(Field::Operator);
            self.operand(UNARY)?;
            self.label(Field::Operand);
            self.finish();
            return Ok(());
        }
        match kind {
            TokenKind::Identifier if boolean => self.bump_as(TokenKind::Boolean),
            TokenKind::Number | TokenKind::Identifier | TokenKind::EscapeSequence => self.bump(),
            TokenKind::Quote(_) => self.string()?,
            TokenKind::AtSign => self.at_reference(),
            TokenKind::AngleOpen => self.at_angle_expression(false)?,
            TokenKind::SquareOpen => self.at_square_expression()?,
            TokenKind::OpenBracket => self.command_substitution()?,
            TokenKind::OpenParen => self.parenthesized()?,
            TokenKind::EmbeddedOpen => self.embedded_block()?,
            _ => self.missing_expression(),
        }
        Ok(())
    }

    /// No expression can start at the next token.
    ///
    /// Tokens up to the end of the line become one error node; at a closer,
    /// directive or line break only a zero-width marker is left.
    fn missing_expression(&mut self) {
        let boundary = self.at_boundary()
            || self.on_new_line()
            || matches!(self.nth_kind(0), Some(TokenKind::Directive(_)));
        if boundary {
            self.missing(ErrorCode::MissingValue, "expected an expression");
        } else if matches!(self.nth_kind(0), Some(TokenKind::Error(_))) {
            self.unexpected();
        } else {
            self.recover_line("expected an expression");
        }
    }

    fn parenthesized(&mut self) -> PResult {
        self.start(NodeKind::ParenthesizedExpression);
        self.bump();
        self.delimited(TokenKind::CloseParen, |p| {
            p.operand(0)?;
            p.label(Field::Expression);
            while !p.at_boundary() {
                p.unexpected();
            }
            Ok(())
        })?;
        self.expect_closer(TokenKind::CloseParen);
        self.finish();
        Ok(())
    }

    // -- literals --

    /// A quoted string with its fragments, escapes and interpolations.
    pub(crate) fn string(&mut self) -> PResult {
        self.start(NodeKind::String);
        self.bump();
        loop {
            match self.nth_kind(0) {
                Some(TokenKind::StringFragment | TokenKind::EscapeSequence) => self.bump(),
                Some(TokenKind::AtSign) => self.at_reference(),
                Some(TokenKind::AngleOpen) => self.at_angle_expression(true)?,
                Some(TokenKind::Quote(_)) => {
                    self.bump();
                    break;
                }
                Some(TokenKind::Error(kind)) => {
                    self.unexpected();
                    if kind == LexErrorKind::UnterminatedLiteral {
                        break;
                    }
                }
                _ => break,
            }
        }
        self.finish();
        Ok(())
    }

    /// `@name@`
    pub(crate) fn at_reference(&mut self) {
        self.start(NodeKind::AtReference);
        self.bump();
        if self.at(TokenKind::AtReferenceName) {
            self.bump();
            self.label(Field::Name);
        }
        self.expect_closer(TokenKind::AtSign);
        self.finish();
    }

    /// `@< expr >@`. Inside a string the expression also ends where the
    /// lexer closed the string.
    pub(crate) fn at_angle_expression(&mut self, in_string: bool) -> PResult {
        self.start(NodeKind::AtAngleExpression);
        self.bump();
        self.delimited(TokenKind::AngleClose, |p| {
            p.operand(0)?;
            p.label(Field::Expression);
            while !p.at_boundary() {
                match p.nth_kind(0) {
                    Some(TokenKind::Error(LexErrorKind::UnterminatedLiteral)) => break,
                    Some(TokenKind::Quote(_)) if in_string => break,
                    _ => p.unexpected(),
                }
            }
            Ok(())
        })?;
        self.expect_closer(TokenKind::AngleClose);
        self.finish();
        Ok(())
    }

    /// `@[ command ]@`
    pub(crate) fn at_square_expression(&mut self) -> PResult {
        self.start(NodeKind::AtSquareExpression);
        self.bump();
        self.delimited(TokenKind::SquareClose, |p| p.command())?;
        self.expect_closer(TokenKind::SquareClose);
        self.finish();
        Ok(())
    }

    /// `[ command ]`
    fn command_substitution(&mut self) -> PResult {
        self.start(NodeKind::CommandSubstitution);
        self.bump();
        self.delimited(TokenKind::CloseBracket, |p| p.command())?;
        self.expect_closer(TokenKind::CloseBracket);
        self.finish();
        Ok(())
    }

    /// `name arg...` where each argument is an expression or a number format.
    fn command(&mut self) -> PResult {
        self.start(NodeKind::Command);
        if self.at(TokenKind::Identifier) {
            self.bump();
        } else {
            self.missing(ErrorCode::MissingValue, "expected a command name");
        }
        self.label(Field::Name);

        self.start(NodeKind::ArgumentList);
        let mut count = 0usize;
        while !self.at_boundary() {
            if self.at(TokenKind::NumberFormat) {
                self.bump();
            } else if self.at_expression_start() {
                self.expression()?;
            } else {
                self.unexpected();
                continue;
            }
            count += 1;
        }
        if count == 0 {
            self.missing(ErrorCode::MissingValue, "expected command arguments");
        }
        self.finish();
        self.label(Field::Args);
        self.finish();
        self.label(Field::Command);
        Ok(())
    }

    /// `!( ... )!`: recognized structurally, content is expressions and
    /// braces.
    pub(crate) fn embedded_block(&mut self) -> PResult {
        self.start(NodeKind::EmbeddedBlock);
        self.bump();
        self.isolated(|p| {
            p.delimited(TokenKind::EmbeddedClose, |p| {
                while !p.at_boundary() {
                    match p.nth_kind(0) {
                        Some(
                            TokenKind::OpenBrace | TokenKind::CloseBrace | TokenKind::NumberFormat,
                        ) => p.bump(),
                        _ if p.at_expression_start() => p.expression()?,
                        _ => p.unexpected(),
                    }
                }
                Ok(())
            })?;
            p.expect_closer(TokenKind::EmbeddedClose);
            Ok(())
        })?;
        self.finish();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::formatter::node_to_sexp;
    use crate::parse;
    use crate::tree::{ErrorCode, Field, NodeKind};

    /// S-expression of the value of `#define X <expr>`.
    fn expr(source: &str) -> String {
        let input = format!("#define X {source}\n");
        let tree = parse(&input).expect("parse");
        let stmt = tree.root().child_nodes().next().expect("statement");
        let value = stmt.child_by_field(Field::Value).expect("value");
        match value {
            crate::SyntaxElement::Node(node) => node_to_sexp(node),
            crate::SyntaxElement::Token(token) => format!("({} {:?})", token.kind().name(), token.text()),
        }
    }

    #[test]
    fn multiplication_binds_tighter() {
        assert_eq!(
            expr("1+2*3"),
            "(binary_expression left: (number \"1\") operator: (operator \"+\") \
             right: (binary_expression left: (number \"2\") operator: (operator \"*\") \
             right: (number \"3\")))"
        );
    }

    #[test]
    fn power_is_right_associative() {
        assert_eq!(
            expr("1**2**3"),
            "(binary_expression left: (number \"1\") operator: (operator \"**\") \
             right: (binary_expression left: (number \"2\") operator: (operator \"**\") \
             right: (number \"3\")))"
        );
    }

    #[test]
    fn subtraction_is_left_associative() {
        assert_eq!(
            expr("a-b-c"),
            "(binary_expression left: (binary_expression left: (identifier \"a\") \
             operator: (operator \"-\") right: (identifier \"b\")) \
             operator: (operator \"-\") right: (identifier \"c\"))"
        );
    }

    #[test]
    fn unary_binds_tighter_than_power() {
        assert_eq!(
            expr("-2**2"),
            "(binary_expression left: (unary_expression operator: (operator \"-\") \
             operand: (number \"2\")) operator: (operator \"**\") right: (number \"2\"))"
        );
    }

    #[test]
    fn ternary_nests_in_alternative() {
        assert_eq!(
            expr("a ? b : c ? d : e"),
            "(ternary_expression condition: (identifier \"a\") consequence: (identifier \"b\") \
             alternative: (ternary_expression condition: (identifier \"c\") \
             consequence: (identifier \"d\") alternative: (identifier \"e\")))"
        );
    }

    #[test]
    fn ternary_binds_loosest() {
        let sexp = expr("a || b ? 1 : 2");
        assert!(sexp.starts_with("(ternary_expression condition: (binary_expression"));
    }

    #[test]
    fn word_operators() {
        assert_eq!(
            expr("@a@ eq \"x\" && b in c"),
            "(binary_expression left: (binary_expression left: (at_reference name: \
             (at_reference_name \"a\")) operator: (word_operator \"eq\") right: (string \
             (string_fragment \"x\"))) operator: (operator \"&&\") right: (binary_expression \
             left: (identifier \"b\") operator: (word_operator \"in\") right: (identifier \"c\")))"
        );
    }

    #[test]
    fn booleans_any_case() {
        assert_eq!(expr("TRUE"), "(boolean \"TRUE\")");
        assert_eq!(expr("false"), "(boolean \"false\")");
    }

    #[test]
    fn comparison_chain_precedence() {
        // == (90) is looser than < (100), which is looser than << (110).
        let sexp = expr("a << 1 < b == c");
        assert!(sexp.starts_with("(binary_expression left: (binary_expression left: (binary_expression"));
        assert!(sexp.ends_with("operator: (operator \"==\") right: (identifier \"c\"))"));
    }

    #[test]
    fn parenthesized() {
        assert_eq!(
            expr("(1+2)*3"),
            "(binary_expression left: (parenthesized_expression expression: (binary_expression \
             left: (number \"1\") operator: (operator \"+\") right: (number \"2\"))) \
             operator: (operator \"*\") right: (number \"3\"))"
        );
    }

    #[test]
    fn command_substitution_with_format() {
        let tree = parse("#define X [format %.3e @v@]\n").expect("parse");
        assert!(!tree.has_errors());
        let command = tree
            .root()
            .descendants()
            .find(|n| n.kind() == NodeKind::Command)
            .expect("command");
        assert_eq!(command.token_by_field(Field::Name).map(|t| t.text()), Some("format"));
        let args = command.node_by_field(Field::Args).expect("args");
        let kinds: Vec<_> = args.significant_children().map(|c| c.kind_name()).collect();
        assert_eq!(kinds, vec!["number_format", "at_reference"]);
    }

    #[test]
    fn angle_and_square_expressions() {
        let tree = parse("File { Grid = \"n@<@node@ + 1>@_msh.tdr\" Plot = @[expr 1+2]@ }")
            .expect("parse");
        assert!(!tree.has_errors(), "{:?}", tree.diagnostics().collect::<Vec<_>>());
        let kinds: Vec<_> = tree.root().descendants().map(|n| n.kind()).collect();
        assert!(kinds.contains(&NodeKind::AtAngleExpression));
        assert!(kinds.contains(&NodeKind::AtSquareExpression));
    }

    #[test]
    fn at_reference_value() {
        let tree = parse("#define X @Y@\n").expect("parse");
        let stmt = tree.root().child_nodes().next().expect("statement");
        let value = stmt.node_by_field(Field::Value).expect("value");
        assert_eq!(value.kind(), NodeKind::AtReference);
        assert_eq!(value.at_reference_name(), Some("Y"));
    }

    #[test]
    fn missing_right_operand() {
        let tree = parse("#define X 1 +\nFile { }\n").expect("parse");
        let codes: Vec<_> = tree.diagnostics().map(|d| d.code).collect();
        assert_eq!(codes, vec![ErrorCode::MissingValue]);
        assert_eq!(tree.root().child_nodes().count(), 2);
    }

    #[test]
    fn unexpected_token_skips_rest_of_line() {
        let tree = parse("#define X = 3 4\nFile { }\n").expect("parse");
        let diag = tree.diagnostics().next().expect("diagnostic");
        assert_eq!(diag.code, ErrorCode::UnexpectedToken);
        assert_eq!(&tree.source()[diag.span.byte_range()], "= 3 4");
    }

    #[test]
    fn embedded_block_statement() {
        let tree = parse("!( puts [expr 1] { x } )!\nFile { }\n").expect("parse");
        assert!(!tree.has_errors(), "{:?}", tree.diagnostics().collect::<Vec<_>>());
        let first = tree.root().child_nodes().next().expect("block");
        assert_eq!(first.kind(), NodeKind::EmbeddedBlock);
    }
}
