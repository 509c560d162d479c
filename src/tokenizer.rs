use std::{
    fmt::{self, Display, Formatter},
    ops::Range,
};

use log::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,

    Comma,
    Semicolon,

    Plus,
    Minus,
    Star,
    Slash,

    Bang,
    Equal,
    Greater,
    Less,

    BangEqual,
    EqualEqual,

    Identifier,
    Integer,
    String,

    Let,
    Function,
    If,
    Else,
    Return,
    True,
    False,

    Illegal,
    Eof,
}

impl TokenKind {
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Let
                | TokenKind::Function
                | TokenKind::If
                | TokenKind::Else
                | TokenKind::Return
                | TokenKind::True
                | TokenKind::False
        )
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::LeftParen => "'('",
            TokenKind::RightParen => "')'",
            TokenKind::LeftBrace => "'{'",
            TokenKind::RightBrace => "'}'",
            TokenKind::Comma => "','",
            TokenKind::Semicolon => "';'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Bang => "'!'",
            TokenKind::Equal => "'='",
            TokenKind::Greater => "'>'",
            TokenKind::Less => "'<'",
            TokenKind::BangEqual => "'!='",
            TokenKind::EqualEqual => "'=='",
            TokenKind::Identifier => "identifier",
            TokenKind::Integer => "integer",
            TokenKind::String => "string",
            TokenKind::Let => "'variable'",
            TokenKind::Function => "'procedimiento'",
            TokenKind::If => "'si'",
            TokenKind::Else => "'si_no'",
            TokenKind::Return => "'regresa'",
            TokenKind::True => "'verdadero'",
            TokenKind::False => "'falso'",
            TokenKind::Illegal => "illegal token",
            TokenKind::Eof => "end of input",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the lexeme. String literals hold their unescaped
    /// contents instead.
    pub literal: String,
    pub span: Range<usize>,
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Type: {:?}, Literal: {}", self.kind, self.literal)
    }
}

/// Lazy scanner over a source string.
///
/// `next_token` keeps returning `Eof` once the input is exhausted. As an
/// iterator it yields that `Eof` exactly once and then stops.
pub struct Lexer<'a> {
    source: &'a str,
    cursor: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            cursor: 0,
            finished: false,
        }
    }

    pub fn next_token(&mut self) -> Token {
        let rest = &self.source[self.cursor..];
        let start = self.cursor + (rest.len() - rest.trim_start().len());

        let (len, mut kind) = scan(&self.source[start..]);
        let end = start + len;
        self.cursor = end;

        let lexeme = &self.source[start..end];
        let literal = match kind {
            TokenKind::String => match snailquote::unescape(lexeme) {
                Ok(contents) => contents,
                Err(err) => {
                    trace!("malformed string literal {}: {}", lexeme, err);
                    kind = TokenKind::Illegal;
                    lexeme.to_string()
                }
            },
            _ => lexeme.to_string(),
        };

        Token {
            kind,
            literal,
            span: start..end,
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }

        let token = self.next_token();
        self.finished = token.kind == TokenKind::Eof;
        Some(token)
    }
}

/// Scans the whole source. The result always ends with an `Eof` token.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).collect()
}

/// Classifies the lexeme at the start of `rest`, which has no leading
/// whitespace. Returns its length in bytes and its kind.
fn scan(rest: &str) -> (usize, TokenKind) {
    let Some(first) = rest.chars().next() else {
        return (0, TokenKind::Eof);
    };

    match rest.get(..2) {
        Some("==") => return (2, TokenKind::EqualEqual),
        Some("!=") => return (2, TokenKind::BangEqual),
        _ => (),
    }

    let kind = match first {
        '(' => Some(TokenKind::LeftParen),
        ')' => Some(TokenKind::RightParen),
        '{' => Some(TokenKind::LeftBrace),
        '}' => Some(TokenKind::RightBrace),
        ',' => Some(TokenKind::Comma),
        ';' => Some(TokenKind::Semicolon),
        '+' => Some(TokenKind::Plus),
        '-' => Some(TokenKind::Minus),
        '*' => Some(TokenKind::Star),
        '/' => Some(TokenKind::Slash),
        '!' => Some(TokenKind::Bang),
        '=' => Some(TokenKind::Equal),
        '<' => Some(TokenKind::Less),
        '>' => Some(TokenKind::Greater),
        _ => None,
    };

    if let Some(kind) = kind {
        return (1, kind);
    }

    if first == '"' {
        return scan_string(rest);
    }

    if first.is_ascii_digit() {
        let len = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        return (len, TokenKind::Integer);
    }

    if is_letter(first) {
        let len = rest
            .find(|c: char| !(is_letter(c) || c.is_ascii_digit()))
            .unwrap_or(rest.len());
        return (len, lookup_keyword(&rest[..len]));
    }

    (first.len_utf8(), TokenKind::Illegal)
}

fn scan_string(rest: &str) -> (usize, TokenKind) {
    let mut escaped = false;

    for (i, c) in rest.char_indices().skip(1) {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return (i + 1, TokenKind::String),
            _ => escaped = false,
        }
    }

    // Unterminated: swallow the rest of the input as one illegal lexeme.
    (rest.len(), TokenKind::Illegal)
}

fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic()
        || matches!(
            c,
            '_' | 'á' | 'é' | 'í' | 'ó' | 'ú' | 'Á' | 'É' | 'Í' | 'Ó' | 'Ú' | 'ñ' | 'Ñ'
        )
}

fn lookup_keyword(word: &str) -> TokenKind {
    match word {
        "variable" => TokenKind::Let,
        "procedimiento" => TokenKind::Function,
        "si" => TokenKind::If,
        "si_no" => TokenKind::Else,
        "regresa" => TokenKind::Return,
        "verdadero" => TokenKind::True,
        "falso" => TokenKind::False,
        _ => TokenKind::Identifier,
    }
}
