use crate::{
    ast::{BinaryOp, Block, Expression, Program, Statement, UnaryOp},
    error::ParseError,
    stack::ensure_sufficient_stack,
    tokenizer::{Lexer, Token, TokenKind},
};
use log::debug;
use std::rc::Rc;

type ParseResult<T> = std::result::Result<T, ParseError>;

type PrefixRule<'a> = fn(&mut Parser<'a>) -> ParseResult<Expression>;
type InfixRule<'a> = fn(&mut Parser<'a>, Expression) -> ParseResult<Expression>;

/// Binding strength of an operator, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
}

fn unary_op(kind: TokenKind) -> Option<UnaryOp> {
    match kind {
        TokenKind::Bang => Some(UnaryOp::Not),
        TokenKind::Minus => Some(UnaryOp::Negate),
        _ => None,
    }
}

fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Plus => Some(BinaryOp::Add),
        TokenKind::Minus => Some(BinaryOp::Subtract),
        TokenKind::Star => Some(BinaryOp::Multiply),
        TokenKind::Slash => Some(BinaryOp::Divide),
        TokenKind::EqualEqual => Some(BinaryOp::Equal),
        TokenKind::BangEqual => Some(BinaryOp::NotEqual),
        TokenKind::Less => Some(BinaryOp::Less),
        TokenKind::Greater => Some(BinaryOp::Greater),
        _ => None,
    }
}

fn precedence_of(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::EqualEqual | TokenKind::BangEqual => Precedence::Equals,
        TokenKind::Less | TokenKind::Greater => Precedence::LessGreater,
        TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
        TokenKind::Star | TokenKind::Slash => Precedence::Product,
        TokenKind::LeftParen => Precedence::Call,
        _ => Precedence::Lowest,
    }
}

/// Parses a whole source string. The program may be partial when the error
/// list is not empty.
pub fn parse(source: &str) -> (Program, Vec<ParseError>) {
    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse_program();
    (program, parser.into_errors())
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    peek: Token,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer<'a>) -> Self {
        let current = lexer.next_token();
        let peek = lexer.next_token();

        Self {
            lexer,
            current,
            peek,
            errors: Vec::new(),
        }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();

        while self.current.kind != TokenKind::Eof {
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(err) => self.record(err),
            }
            self.advance();
        }

        Program { statements }
    }

    fn advance(&mut self) {
        let next = self.lexer.next_token();
        self.current = std::mem::replace(&mut self.peek, next);
    }

    fn record(&mut self, err: ParseError) {
        debug!("parse error near {:?}: {}", self.current.literal, err);
        self.errors.push(err);
        self.synchronize();
    }

    /// Skips the rest of a broken statement. Stops on its `;`, or on or
    /// right before a closing brace or the end of input so the enclosing
    /// loop can see them.
    fn synchronize(&mut self) {
        while !matches!(
            self.current.kind,
            TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof
        ) && !matches!(self.peek.kind, TokenKind::RightBrace | TokenKind::Eof)
        {
            self.advance();
        }
    }

    /// Advances onto the peek token when it has the expected kind.
    fn expect_peek(&mut self, expected: TokenKind) -> ParseResult<()> {
        if self.peek.kind == expected {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::ExpectedToken {
                expected,
                found: self.peek.kind,
            })
        }
    }

    fn skip_optional_semicolon(&mut self) {
        if self.peek.kind == TokenKind::Semicolon {
            self.advance();
        }
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.current.kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> ParseResult<Statement> {
        self.expect_peek(TokenKind::Identifier)?;
        let name = self.current.literal.clone();

        self.expect_peek(TokenKind::Equal)?;
        self.advance();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_optional_semicolon();

        Ok(Statement::Let { name, value })
    }

    fn parse_return_statement(&mut self) -> ParseResult<Statement> {
        self.advance();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_optional_semicolon();

        Ok(Statement::Return(value))
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Statement> {
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.skip_optional_semicolon();

        Ok(Statement::Expression(expr))
    }

    /// Parses the statements of a block. Expects `current` on the opening
    /// brace and leaves it on the closing one.
    fn parse_block(&mut self) -> ParseResult<Block> {
        self.advance();
        let mut statements = Vec::new();

        while !matches!(self.current.kind, TokenKind::RightBrace | TokenKind::Eof) {
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(err) => {
                    self.record(err);
                    // The broken statement ran into this block's own brace.
                    if self.current.kind == TokenKind::RightBrace {
                        continue;
                    }
                }
            }
            self.advance();
        }

        if self.current.kind == TokenKind::Eof {
            return Err(ParseError::ExpectedToken {
                expected: TokenKind::RightBrace,
                found: TokenKind::Eof,
            });
        }

        Ok(Block { statements })
    }

    fn parse_expression(&mut self, precedence: Precedence) -> ParseResult<Expression> {
        ensure_sufficient_stack(|| {
            let prefix = Self::prefix_rule(self.current.kind).ok_or_else(|| {
                ParseError::NoPrefixRule {
                    literal: self.current.literal.clone(),
                }
            })?;
            let mut left = prefix(self)?;

            while self.peek.kind != TokenKind::Semicolon
                && precedence < precedence_of(self.peek.kind)
            {
                let Some(infix) = Self::infix_rule(self.peek.kind) else {
                    return Ok(left);
                };
                self.advance();
                left = infix(self, left)?;
            }

            Ok(left)
        })
    }

    fn prefix_rule(kind: TokenKind) -> Option<PrefixRule<'a>> {
        let rule: PrefixRule<'a> = match kind {
            TokenKind::Identifier => Self::parse_identifier,
            TokenKind::Integer => Self::parse_integer,
            TokenKind::String => Self::parse_string,
            TokenKind::True | TokenKind::False => Self::parse_boolean,
            kind if unary_op(kind).is_some() => Self::parse_prefix_expression,
            TokenKind::LeftParen => Self::parse_grouped_expression,
            TokenKind::If => Self::parse_if_expression,
            TokenKind::Function => Self::parse_function_literal,
            _ => return None,
        };
        Some(rule)
    }

    fn infix_rule(kind: TokenKind) -> Option<InfixRule<'a>> {
        let rule: InfixRule<'a> = match kind {
            TokenKind::LeftParen => Self::parse_call_expression,
            kind if binary_op(kind).is_some() => Self::parse_infix_expression,
            _ => return None,
        };
        Some(rule)
    }

    fn parse_identifier(&mut self) -> ParseResult<Expression> {
        Ok(Expression::Identifier(self.current.literal.clone()))
    }

    fn parse_integer(&mut self) -> ParseResult<Expression> {
        self.current
            .literal
            .parse()
            .map(Expression::Integer)
            .map_err(|_| ParseError::InvalidInteger {
                literal: self.current.literal.clone(),
            })
    }

    fn parse_string(&mut self) -> ParseResult<Expression> {
        Ok(Expression::String(self.current.literal.clone()))
    }

    fn parse_boolean(&mut self) -> ParseResult<Expression> {
        Ok(Expression::Boolean(self.current.kind == TokenKind::True))
    }

    fn parse_prefix_expression(&mut self) -> ParseResult<Expression> {
        let operator = unary_op(self.current.kind).ok_or_else(|| ParseError::NoPrefixRule {
            literal: self.current.literal.clone(),
        })?;
        self.advance();

        let right = self.parse_expression(Precedence::Prefix)?;
        Ok(Expression::Prefix {
            operator,
            right: Box::new(right),
        })
    }

    fn parse_infix_expression(&mut self, left: Expression) -> ParseResult<Expression> {
        let operator = binary_op(self.current.kind).ok_or_else(|| ParseError::NoInfixRule {
            literal: self.current.literal.clone(),
        })?;
        let precedence = precedence_of(self.current.kind);
        self.advance();

        let right = self.parse_expression(precedence)?;
        Ok(Expression::Infix {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
    }

    fn parse_grouped_expression(&mut self) -> ParseResult<Expression> {
        self.advance();

        let expr = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RightParen)?;

        Ok(expr)
    }

    fn parse_if_expression(&mut self) -> ParseResult<Expression> {
        self.expect_peek(TokenKind::LeftParen)?;
        self.advance();

        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RightParen)?;
        self.expect_peek(TokenKind::LeftBrace)?;

        let consequence = self.parse_block()?;

        let alternative = if self.peek.kind == TokenKind::Else {
            self.advance();
            self.expect_peek(TokenKind::LeftBrace)?;
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Expression::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_function_literal(&mut self) -> ParseResult<Expression> {
        self.expect_peek(TokenKind::LeftParen)?;
        let parameters = self.parse_function_parameters()?;

        self.expect_peek(TokenKind::LeftBrace)?;
        let body = self.parse_block()?;

        Ok(Expression::Function {
            parameters,
            body: Rc::new(body),
        })
    }

    fn parse_function_parameters(&mut self) -> ParseResult<Vec<String>> {
        let mut parameters = Vec::new();

        if self.peek.kind == TokenKind::RightParen {
            self.advance();
            return Ok(parameters);
        }

        self.expect_peek(TokenKind::Identifier)?;
        parameters.push(self.current.literal.clone());

        while self.peek.kind == TokenKind::Comma {
            self.advance();
            self.expect_peek(TokenKind::Identifier)?;
            parameters.push(self.current.literal.clone());
        }

        self.expect_peek(TokenKind::RightParen)?;
        Ok(parameters)
    }

    fn parse_call_expression(&mut self, function: Expression) -> ParseResult<Expression> {
        let arguments = self.parse_call_arguments()?;

        Ok(Expression::Call {
            function: Box::new(function),
            arguments,
        })
    }

    fn parse_call_arguments(&mut self) -> ParseResult<Vec<Expression>> {
        let mut arguments = Vec::new();

        if self.peek.kind == TokenKind::RightParen {
            self.advance();
            return Ok(arguments);
        }

        self.advance();
        arguments.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek.kind == TokenKind::Comma {
            self.advance();
            self.advance();
            arguments.push(self.parse_expression(Precedence::Lowest)?);
        }

        self.expect_peek(TokenKind::RightParen)?;
        Ok(arguments)
    }
}
