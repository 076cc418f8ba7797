//! Formula tokenizer
//!
//! One lexer serves every stage that looks at formula text: reference
//! scanning, each translation step and the expression parser. Tokens keep
//! their byte span so a stage can rewrite some tokens and copy the rest of
//! the source verbatim.

use std::ops::Range;

/// Token categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Run of whitespace
    Whitespace,
    /// Numeric literal (`12`, `1.5`, `.5`, `2e-3`)
    Number,
    /// Quoted string literal, quotes included
    Str,
    /// Identifier, cell reference or function name
    Ident,
    /// Operator (`+`, `<=`, `<>`, `?`, ...)
    Operator,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
    Colon,
    Semicolon,
    /// Any character no other rule accepts
    Other,
}

/// A token and where it sits in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: Range<usize>,
}

impl Token<'_> {
    /// Whether this is an identifier equal to `name`, ignoring ASCII case
    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text.eq_ignore_ascii_case(name)
    }
}

/// Split formula text into tokens, whitespace included
///
/// ```rust
/// use calcsheet_formula::lexer::{tokenize, TokenKind};
///
/// let kinds: Vec<TokenKind> = tokenize("A1<>\"x\"").iter().map(|t| t.kind).collect();
/// assert_eq!(kinds, vec![TokenKind::Ident, TokenKind::Operator, TokenKind::Str]);
/// ```
pub fn tokenize(src: &str) -> Vec<Token<'_>> {
    let mut lexer = Lexer { src, pos: 0 };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token() {
        tokens.push(token);
    }
    tokens
}

/// Index of the first non-whitespace token at or after `from`
pub fn next_significant(tokens: &[Token<'_>], from: usize) -> Option<usize> {
    (from..tokens.len()).find(|&i| tokens[i].kind != TokenKind::Whitespace)
}

/// Decode the body of a string token (quotes included)
///
/// Both `""` and `\"` stand for a quote; `\\` stands for a backslash.
pub fn unescape_string(text: &str) -> String {
    let body = text.strip_prefix('"').unwrap_or(text);
    let body = body.strip_suffix('"').unwrap_or(body);

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '"' if chars.peek() == Some(&'"') => {
                chars.next();
                out.push('"');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Render `s` as a string literal that [`unescape_string`] reads back
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn next_token(&mut self) -> Option<Token<'a>> {
        let start = self.pos;
        let c = self.peek_char()?;

        let kind = if c.is_whitespace() {
            self.advance_while(char::is_whitespace);
            TokenKind::Whitespace
        } else if c == '"' {
            self.scan_string();
            TokenKind::Str
        } else if c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()))
        {
            self.scan_number();
            TokenKind::Number
        } else if c.is_alphabetic() || c == '_' || c == '$' {
            self.advance_while(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '.');
            TokenKind::Ident
        } else {
            self.advance();
            match c {
                '(' => TokenKind::LeftParen,
                ')' => TokenKind::RightParen,
                '[' => TokenKind::LeftBracket,
                ']' => TokenKind::RightBracket,
                ',' => TokenKind::Comma,
                ':' => TokenKind::Colon,
                ';' => TokenKind::Semicolon,
                '<' => {
                    if matches!(self.peek_char(), Some('=') | Some('>')) {
                        self.advance();
                    }
                    TokenKind::Operator
                }
                '>' | '=' | '!' => {
                    if self.peek_char() == Some('=') {
                        self.advance();
                    }
                    TokenKind::Operator
                }
                '+' | '-' | '*' | '/' | '^' | '%' | '?' | '&' => TokenKind::Operator,
                _ => TokenKind::Other,
            }
        };

        Some(Token {
            kind,
            text: &self.src[start..self.pos],
            span: start..self.pos,
        })
    }

    fn scan_string(&mut self) {
        self.advance(); // opening quote
        while let Some(c) = self.peek_char() {
            self.advance();
            match c {
                '\\' => self.advance(),
                '"' => {
                    if self.peek_char() == Some('"') {
                        self.advance();
                    } else {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    fn scan_number(&mut self) {
        self.advance_while(|c| c.is_ascii_digit());
        if self.peek_char() == Some('.') {
            self.advance();
            self.advance_while(|c| c.is_ascii_digit());
        }

        // Exponent only when digits follow, so `2e` stays a number and an identifier
        if matches!(self.peek_char(), Some('e') | Some('E')) {
            let digit_at = match self.peek_char_at(1) {
                Some('+') | Some('-') => 2,
                _ => 1,
            };
            if self.peek_char_at(digit_at).map_or(false, |c| c.is_ascii_digit()) {
                for _ in 0..digit_at {
                    self.advance();
                }
                self.advance_while(|c| c.is_ascii_digit());
            }
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn advance_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek_char().map_or(false, &pred) {
            self.advance();
        }
    }
}
