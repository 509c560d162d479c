pub mod ast;
pub mod cli;
pub mod environment;
pub mod error;
pub mod object;
pub mod parser;
pub mod repl;
pub mod runtime;
pub mod stack;
pub mod stdlib;
pub mod tokenizer;

pub use environment::{new_root_environment, Environment};
pub use error::{Error, Result};
pub use object::Object;
pub use parser::parse;
pub use runtime::{evaluate, Evaluator};
pub use tokenizer::tokenize;

/// Parses and evaluates `source` in `env` with the default call-depth limit.
///
/// Nothing is evaluated when the parser reported errors. Guest runtime
/// errors are not host errors: they come back as `Ok(Object::Error(_))`.
pub fn interpret(source: &str, env: &Environment) -> Result<Object> {
    Evaluator::default().interpret(source, env)
}
