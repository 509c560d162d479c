use nu_ansi_term::{Color, Style};
use reedline::{
    Highlighter, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus,
    StyledText, ValidationResult, Validator,
};
use std::borrow::Cow;

use crate::{
    environment::{new_root_environment, Environment},
    error::Result,
    object::Object,
    runtime::Evaluator,
    tokenizer::{Lexer, TokenKind},
};

/// Typing this line ends the REPL.
pub const EXIT_COMMAND: &str = "salir()";

pub fn is_exit_command(line: &str) -> bool {
    line.trim() == EXIT_COMMAND
}

/// State that survives between REPL lines: one root environment and one
/// evaluator, so bindings made by earlier lines stay visible.
pub struct Session {
    env: Environment,
    evaluator: Evaluator,
}

impl Session {
    pub fn new(max_call_depth: usize) -> Self {
        Self {
            env: new_root_environment(),
            evaluator: Evaluator::with_max_call_depth(max_call_depth),
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn eval(&mut self, line: &str) -> Result<Object> {
        self.evaluator.interpret(line, &self.env)
    }
}

#[derive(Clone)]
pub struct REPLPrompt;

impl Prompt for REPLPrompt {
    fn render_prompt_left(&self) -> Cow<str> {
        Cow::Borrowed("lpp")
    }

    fn render_prompt_right(&self) -> Cow<str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _edit_mode: PromptEditMode) -> Cow<str> {
        Cow::Borrowed(" >> ")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<str> {
        Cow::Borrowed("  .. ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!(
            "({}reverse-search: {}) ",
            prefix, history_search.term
        ))
    }
}

/// Keeps reading lines while a `(`, `{` or string literal is still open.
pub struct REPLValidator;

impl Validator for REPLValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        if line.trim_end().is_empty() {
            return ValidationResult::Complete;
        }

        let mut delimiters = Vec::new();
        let mut in_string = false;
        let mut escaped = false;

        for c in line.chars() {
            if in_string {
                match c {
                    '"' if !escaped => in_string = false,
                    '\\' => {
                        escaped = !escaped;
                        continue;
                    }
                    _ => {}
                }
                escaped = false;
                continue;
            }

            match c {
                '"' => in_string = true,
                '{' | '(' => delimiters.push(c),
                // An unmatched closer is a syntax error; hand it to the parser.
                '}' if delimiters.pop() != Some('{') => return ValidationResult::Complete,
                ')' if delimiters.pop() != Some('(') => return ValidationResult::Complete,
                _ => {}
            }
        }

        if in_string || !delimiters.is_empty() {
            ValidationResult::Incomplete
        } else {
            ValidationResult::Complete
        }
    }
}

pub static KEYWORD_COLOR: Color = Color::LightBlue;
pub static LITERAL_COLOR: Color = Color::Yellow;
pub static DEFAULT_COLOR: Color = Color::White;
pub static OPERATOR_COLOR: Color = Color::DarkGray;
pub static ILLEGAL_COLOR: Color = Color::Red;

fn color_of(kind: TokenKind) -> Color {
    match kind {
        kind if kind.is_keyword() => KEYWORD_COLOR,
        TokenKind::Integer | TokenKind::String => LITERAL_COLOR,
        TokenKind::Identifier | TokenKind::Eof => DEFAULT_COLOR,
        TokenKind::Illegal => ILLEGAL_COLOR,
        _ => OPERATOR_COLOR,
    }
}

/// Colors the line from token spans; whitespace between tokens keeps the
/// default style.
pub struct SyntaxHighlighter;

impl Highlighter for SyntaxHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut styled_text = StyledText::new();
        let mut written = 0;

        for token in Lexer::new(line) {
            if token.kind == TokenKind::Eof {
                break;
            }

            if token.span.start > written {
                styled_text.push((
                    Style::new().fg(DEFAULT_COLOR),
                    line[written..token.span.start].to_string(),
                ));
            }
            styled_text.push((
                Style::new().fg(color_of(token.kind)),
                line[token.span.clone()].to_string(),
            ));
            written = token.span.end;
        }

        if written < line.len() {
            styled_text.push((Style::new().fg(DEFAULT_COLOR), line[written..].to_string()));
        }

        styled_text
    }
}
