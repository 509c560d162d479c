use crate::runtime::DEFAULT_MAX_CALL_DEPTH;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(version, about = "Interpreter for the lpp language")]
pub struct Args {
    /// Maximum nesting of guest function calls before evaluation fails
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_CALL_DEPTH)]
    pub max_call_depth: usize,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a source file and print its final value
    Run {
        /// Path to the source file
        file: PathBuf,
    },

    /// Check a source file for syntax errors
    Check {
        /// Path to the source file to check
        file: PathBuf,
    },

    /// Print the token stream of a source file
    Tokens {
        /// Path to the source file to tokenize
        file: PathBuf,
    },

    /// Start an interactive REPL session
    Repl,
}
