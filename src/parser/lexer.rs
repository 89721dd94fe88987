//! Lexer (tokenizer) for Mila source code
//!
//! Converts raw source text into [`Token`]s on demand. The parser never sees
//! the character stream: it pulls one token at a time through the
//! [`TokenSource`] trait, so any producer of tokens (the [`Lexer`], or a
//! pre-built [`TokenBuffer`] in tests) can drive it.

use super::ast::SourceLocation;
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;
use tracing::trace;

/// All token variants produced by the lexer.
///
/// Every variant carries a [`SourceLocation`] so that parse errors can report
/// an accurate line and column without a separate token→location table.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(i64, SourceLocation),

    // Identifiers
    Ident(String, SourceLocation),

    // Keywords
    Program(SourceLocation),
    Const(SourceLocation),
    Var(SourceLocation),
    Procedure(SourceLocation),
    Function(SourceLocation),
    Forward(SourceLocation),
    Begin(SourceLocation),
    End(SourceLocation),
    If(SourceLocation),
    Then(SourceLocation),
    Else(SourceLocation),
    While(SourceLocation),
    Do(SourceLocation),
    For(SourceLocation),
    To(SourceLocation),
    Downto(SourceLocation),
    Array(SourceLocation),
    Of(SourceLocation),
    Integer(SourceLocation),
    Exit(SourceLocation),
    Readln(SourceLocation),
    Write(SourceLocation),
    Writeln(SourceLocation),
    Break(SourceLocation),
    Inc(SourceLocation),
    Dec(SourceLocation),
    Div(SourceLocation),
    Mod(SourceLocation),
    And(SourceLocation),
    Or(SourceLocation),
    Not(SourceLocation),

    // Arithmetic
    Plus(SourceLocation),  // +
    Minus(SourceLocation), // -
    Star(SourceLocation),  // *
    Slash(SourceLocation), // /
    Caret(SourceLocation), // ^

    // Comparison
    Eq(SourceLocation), // =
    Ne(SourceLocation), // <>
    Lt(SourceLocation), // <
    Le(SourceLocation), // <=
    Gt(SourceLocation), // >
    Ge(SourceLocation), // >=

    // Punctuation
    Assign(SourceLocation),    // :=
    Colon(SourceLocation),     // :
    Semicolon(SourceLocation), // ;
    Comma(SourceLocation),     // ,
    Dot(SourceLocation),       // .
    DotDot(SourceLocation),    // ..
    LParen(SourceLocation),    // (
    RParen(SourceLocation),    // )
    LBracket(SourceLocation),  // [
    RBracket(SourceLocation),  // ]

    // End of input
    Eof(SourceLocation),
}

impl Token {
    /// Returns the source location where this token appears.
    pub fn location(&self) -> SourceLocation {
        match self {
            Token::Number(_, loc) | Token::Ident(_, loc) => *loc,
            Token::Program(loc)
            | Token::Const(loc)
            | Token::Var(loc)
            | Token::Procedure(loc)
            | Token::Function(loc)
            | Token::Forward(loc)
            | Token::Begin(loc)
            | Token::End(loc)
            | Token::If(loc)
            | Token::Then(loc)
            | Token::Else(loc)
            | Token::While(loc)
            | Token::Do(loc)
            | Token::For(loc)
            | Token::To(loc)
            | Token::Downto(loc)
            | Token::Array(loc)
            | Token::Of(loc)
            | Token::Integer(loc)
            | Token::Exit(loc)
            | Token::Readln(loc)
            | Token::Write(loc)
            | Token::Writeln(loc)
            | Token::Break(loc)
            | Token::Inc(loc)
            | Token::Dec(loc)
            | Token::Div(loc)
            | Token::Mod(loc)
            | Token::And(loc)
            | Token::Or(loc)
            | Token::Not(loc)
            | Token::Plus(loc)
            | Token::Minus(loc)
            | Token::Star(loc)
            | Token::Slash(loc)
            | Token::Caret(loc)
            | Token::Eq(loc)
            | Token::Ne(loc)
            | Token::Lt(loc)
            | Token::Le(loc)
            | Token::Gt(loc)
            | Token::Ge(loc)
            | Token::Assign(loc)
            | Token::Colon(loc)
            | Token::Semicolon(loc)
            | Token::Comma(loc)
            | Token::Dot(loc)
            | Token::DotDot(loc)
            | Token::LParen(loc)
            | Token::RParen(loc)
            | Token::LBracket(loc)
            | Token::RBracket(loc)
            | Token::Eof(loc) => *loc,
        }
    }

    /// The source spelling of the token (its lexeme).
    ///
    /// Literals and identifiers reproduce their text; end of input has no
    /// spelling and yields an empty string.
    pub fn lexeme(&self) -> String {
        match self {
            Token::Number(n, _) => n.to_string(),
            Token::Ident(name, _) => name.clone(),
            Token::Eof(_) => String::new(),
            other => other.spelling().to_string(),
        }
    }

    fn spelling(&self) -> &'static str {
        match self {
            Token::Program(_) => "program",
            Token::Const(_) => "const",
            Token::Var(_) => "var",
            Token::Procedure(_) => "procedure",
            Token::Function(_) => "function",
            Token::Forward(_) => "forward",
            Token::Begin(_) => "begin",
            Token::End(_) => "end",
            Token::If(_) => "if",
            Token::Then(_) => "then",
            Token::Else(_) => "else",
            Token::While(_) => "while",
            Token::Do(_) => "do",
            Token::For(_) => "for",
            Token::To(_) => "to",
            Token::Downto(_) => "downto",
            Token::Array(_) => "array",
            Token::Of(_) => "of",
            Token::Integer(_) => "integer",
            Token::Exit(_) => "exit",
            Token::Readln(_) => "readln",
            Token::Write(_) => "write",
            Token::Writeln(_) => "writeln",
            Token::Break(_) => "break",
            Token::Inc(_) => "inc",
            Token::Dec(_) => "dec",
            Token::Div(_) => "div",
            Token::Mod(_) => "mod",
            Token::And(_) => "and",
            Token::Or(_) => "or",
            Token::Not(_) => "not",
            Token::Plus(_) => "+",
            Token::Minus(_) => "-",
            Token::Star(_) => "*",
            Token::Slash(_) => "/",
            Token::Caret(_) => "^",
            Token::Eq(_) => "=",
            Token::Ne(_) => "<>",
            Token::Lt(_) => "<",
            Token::Le(_) => "<=",
            Token::Gt(_) => ">",
            Token::Ge(_) => ">=",
            Token::Assign(_) => ":=",
            Token::Colon(_) => ":",
            Token::Semicolon(_) => ";",
            Token::Comma(_) => ",",
            Token::Dot(_) => ".",
            Token::DotDot(_) => "..",
            Token::LParen(_) => "(",
            Token::RParen(_) => ")",
            Token::LBracket(_) => "[",
            Token::RBracket(_) => "]",
            Token::Number(..) | Token::Ident(..) | Token::Eof(_) => "",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n, _) => write!(f, "number {}", n),
            Token::Ident(name, _) => write!(f, "identifier '{}'", name),
            Token::Eof(_) => write!(f, "end of input"),
            other => write!(f, "'{}'", other.spelling()),
        }
    }
}

/// Lexer error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Lexer error at {location}: {message}")]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

/// A pull-based producer of tokens.
///
/// Once the input is exhausted every further call yields [`Token::Eof`].
pub trait TokenSource {
    fn next_token(&mut self) -> Result<Token, LexError>;
}

/// Lexer for Mila source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire input, ending with a single `Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.scan()?;
            let done = matches!(token, Token::Eof(_));
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn scan(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments()?;

        let loc = self.current_location();
        let Some(ch) = self.advance() else {
            return Ok(Token::Eof(loc));
        };

        let token = match ch {
            '0'..='9' => self.number_literal(ch, loc)?,
            '$' => self.hex_literal(loc)?,
            'a'..='z' | 'A'..='Z' | '_' => self.identifier_or_keyword(ch, loc),

            '+' => Token::Plus(loc),
            '-' => Token::Minus(loc),
            '*' => Token::Star(loc),
            '/' => Token::Slash(loc),
            '^' => Token::Caret(loc),
            '=' => Token::Eq(loc),
            ';' => Token::Semicolon(loc),
            ',' => Token::Comma(loc),
            '(' => Token::LParen(loc),
            ')' => Token::RParen(loc),
            '[' => Token::LBracket(loc),
            ']' => Token::RBracket(loc),

            '<' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Token::Le(loc)
                } else if self.peek() == Some('>') {
                    self.advance();
                    Token::Ne(loc)
                } else {
                    Token::Lt(loc)
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Token::Ge(loc)
                } else {
                    Token::Gt(loc)
                }
            }
            ':' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Token::Assign(loc)
                } else {
                    Token::Colon(loc)
                }
            }
            '.' => {
                if self.peek() == Some('.') {
                    self.advance();
                    Token::DotDot(loc)
                } else {
                    Token::Dot(loc)
                }
            }

            _ => {
                return Err(LexError {
                    message: format!("Unexpected character '{}'", ch),
                    location: loc,
                });
            }
        };

        trace!(token = %token, line = loc.line, column = loc.column, "scanned");
        Ok(token)
    }

    /// Parse decimal literal
    fn number_literal(
        &mut self,
        first_digit: char,
        loc: SourceLocation,
    ) -> Result<Token, LexError> {
        let mut num_str = String::new();
        num_str.push(first_digit);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                num_str.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let value = num_str.parse::<i64>().map_err(|_| LexError {
            message: format!("Integer literal out of range: {}", num_str),
            location: loc,
        })?;

        Ok(Token::Number(value, loc))
    }

    /// Parse `$`-prefixed hexadecimal literal
    fn hex_literal(&mut self, loc: SourceLocation) -> Result<Token, LexError> {
        let mut digits = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_hexdigit() {
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if digits.is_empty() {
            return Err(LexError {
                message: "Expected hexadecimal digits after '$'".to_string(),
                location: loc,
            });
        }

        let value = i64::from_str_radix(&digits, 16).map_err(|_| LexError {
            message: format!("Integer literal out of range: ${}", digits),
            location: loc,
        })?;

        Ok(Token::Number(value, loc))
    }

    /// Parse identifier or keyword
    fn identifier_or_keyword(&mut self, first_char: char, loc: SourceLocation) -> Token {
        let mut ident = String::new();
        ident.push(first_char);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match ident.as_str() {
            "program" => Token::Program(loc),
            "const" => Token::Const(loc),
            "var" => Token::Var(loc),
            "procedure" => Token::Procedure(loc),
            "function" => Token::Function(loc),
            "forward" => Token::Forward(loc),
            "begin" => Token::Begin(loc),
            "end" => Token::End(loc),
            "if" => Token::If(loc),
            "then" => Token::Then(loc),
            "else" => Token::Else(loc),
            "while" => Token::While(loc),
            "do" => Token::Do(loc),
            "for" => Token::For(loc),
            "to" => Token::To(loc),
            "downto" => Token::Downto(loc),
            "array" => Token::Array(loc),
            "of" => Token::Of(loc),
            "integer" => Token::Integer(loc),
            "exit" => Token::Exit(loc),
            "readln" => Token::Readln(loc),
            "write" => Token::Write(loc),
            "writeln" => Token::Writeln(loc),
            "break" => Token::Break(loc),
            "inc" => Token::Inc(loc),
            "dec" => Token::Dec(loc),
            "div" => Token::Div(loc),
            "mod" => Token::Mod(loc),
            "and" => Token::And(loc),
            "or" => Token::Or(loc),
            "not" => Token::Not(loc),
            _ => Token::Ident(ident, loc),
        }
    }

    /// Skip whitespace and comments
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(ch) if ch.is_whitespace() => {
                    self.advance();
                }
                Some('{') => self.skip_brace_comment()?,
                Some('(') if self.peek_ahead(1) == Some('*') => {
                    self.skip_paren_comment()?
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Skip `{ ... }` comment
    fn skip_brace_comment(&mut self) -> Result<(), LexError> {
        let start_loc = self.current_location();
        self.advance(); // skip '{'

        while let Some(ch) = self.advance() {
            if ch == '}' {
                return Ok(());
            }
        }

        Err(LexError {
            message: "Unterminated comment".to_string(),
            location: start_loc,
        })
    }

    /// Skip `(* ... *)` comment
    fn skip_paren_comment(&mut self) -> Result<(), LexError> {
        let start_loc = self.current_location();
        self.advance(); // skip '('
        self.advance(); // skip '*'

        while !self.is_at_end() {
            if self.peek() == Some('*') && self.peek_ahead(1) == Some(')') {
                self.advance();
                self.advance();
                return Ok(());
            }
            self.advance();
        }

        Err(LexError {
            message: "Unterminated comment".to_string(),
            location: start_loc,
        })
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        let ch = *self.input.get(self.position)?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

impl TokenSource for Lexer {
    fn next_token(&mut self) -> Result<Token, LexError> {
        self.scan()
    }
}

/// Token source over an already-built token sequence.
///
/// A missing trailing `Eof` is synthesized at the location of the last token.
#[derive(Debug, Clone, Default)]
pub struct TokenBuffer {
    tokens: VecDeque<Token>,
    last_location: SourceLocation,
}

impl TokenBuffer {
    pub fn new(tokens: impl IntoIterator<Item = Token>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
            last_location: SourceLocation::new(1, 1),
        }
    }
}

impl TokenSource for TokenBuffer {
    fn next_token(&mut self) -> Result<Token, LexError> {
        match self.tokens.pop_front() {
            Some(token) => {
                self.last_location = token.location();
                if matches!(token, Token::Eof(_)) {
                    self.tokens.clear();
                }
                Ok(token)
            }
            None => Ok(Token::Eof(self.last_location)),
        }
    }
}
