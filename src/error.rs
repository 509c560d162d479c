use crate::{object::ObjectType, tokenizer::TokenKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),
    #[error("{}", render_parse_errors(.0))]
    Parser(Vec<ParseError>),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

pub type Result<T> = std::result::Result<T, Error>;

fn render_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|err| format!("parser error: {}", err))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Diagnostics recorded while parsing. None of them stop the parse pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected next token to be {expected}, got {found} instead")]
    ExpectedToken { expected: TokenKind, found: TokenKind },
    #[error("no parse function found for '{literal}'")]
    NoPrefixRule { literal: String },
    #[error("no infix parse function found for '{literal}'")]
    NoInfixRule { literal: String },
    #[error("could not parse {literal} as integer")]
    InvalidInteger { literal: String },
}

/// Guest-level failures. These travel as `Object::Error` values and never
/// abort the host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("identifier not found: {0}")]
    IdentifierNotFound(String),
    #[error("type mismatch: {left} {operator} {right}")]
    TypeMismatch {
        left: ObjectType,
        operator: String,
        right: ObjectType,
    },
    #[error("unknown operator: {operator}{operand}")]
    UnknownPrefixOperator {
        operator: String,
        operand: ObjectType,
    },
    #[error("unknown operator: {left} {operator} {right}")]
    UnknownInfixOperator {
        left: ObjectType,
        operator: String,
        right: ObjectType,
    },
    #[error("not a function: {0}")]
    NotAFunction(ObjectType),
    #[error("wrong number of arguments: expected {expected}, got {got}")]
    WrongArgumentCount { expected: usize, got: usize },
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow: -({0})")]
    NegationOverflow(i64),
    #[error("integer overflow: {left} {operator} {right}")]
    IntegerOverflow {
        left: i64,
        operator: String,
        right: i64,
    },
    #[error("maximum call depth of {0} exceeded")]
    CallDepthExceeded(usize),
    #[error("unsupported argument for {function}: got {got}")]
    UnsupportedArgument {
        function: &'static str,
        got: ObjectType,
    },
}
