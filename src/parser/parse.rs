//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including the error type, lookahead helpers, and the program entry point.
//!
//! # Parser Architecture
//!
//! A predictive recursive-descent parser with exactly one token of
//! lookahead. `current` always holds the next unconsumed token and
//! [`Parser::advance`] refills it from the [`TokenSource`]; there is no
//! backtracking. Each nonterminal is one method that switches on the kind of
//! `current`:
//! - This module: Parser struct, helpers, and `program`
//! - `declarations`: const/var parts, types, procedures and functions
//! - `statements`: compound and simple statements
//! - `expressions`: the precedence ladder
//!
//! # Grammar
//!
//! ```text
//! program → 'program' IDENT ';' block '.'
//! ```
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.

use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token, TokenSource};
use std::mem;
use thiserror::Error;
use tracing::{debug, trace};

/// Parser error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Parse error at {location}: {message}")]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            location: err.location,
        }
    }
}

/// Recursive descent parser for Mila
pub struct Parser<S: TokenSource = Lexer> {
    pub(crate) source: S,
    pub(crate) current: Token,
}

impl Parser<Lexer> {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        Self::from_source(Lexer::new(source))
    }
}

impl<S: TokenSource> Parser<S> {
    /// Prime the lookahead with the first token of `source`.
    pub fn from_source(mut source: S) -> Result<Self, ParseError> {
        let current = source.next_token()?;
        Ok(Self { source, current })
    }

    /// Parse a whole program, requiring end of input after the final `.`.
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        self.expect(Token::Program, "at start of program")?;
        let name = self.expect_identifier("after 'program'")?;
        debug!(program = %name, "parsing program");
        self.expect_semicolon("after program name")?;

        let block = self.parse_block()?;
        self.expect(Token::Dot, "after program body")?;

        if !self.is_at_end() {
            return Err(self.unexpected("end of input after '.'"));
        }

        Ok(Program { name, block })
    }

    // ===== Helper methods =====

    /// Consume `current` and pull the next token. Returns the consumed token.
    pub(crate) fn advance(&mut self) -> Result<Token, ParseError> {
        let next = self.source.next_token()?;
        let consumed = mem::replace(&mut self.current, next);
        trace!(token = %consumed, "consumed");
        Ok(consumed)
    }

    /// Whether `current` has the same kind as `token`.
    pub(crate) fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current) == mem::discriminant(token)
    }

    /// Consume `current` if it has the same kind as `token`.
    pub(crate) fn match_token(&mut self, token: &Token) -> Result<bool, ParseError> {
        if self.check(token) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Consume a token of the kind built by `kind`, or fail.
    ///
    /// `kind` is a variant constructor such as `Token::Then`.
    pub(crate) fn expect(
        &mut self,
        kind: fn(SourceLocation) -> Token,
        context: &str,
    ) -> Result<SourceLocation, ParseError> {
        let loc = self.current_location();
        let expected = kind(loc);
        if self.check(&expected) {
            self.advance()?;
            Ok(loc)
        } else {
            Err(self.unexpected(&format!("{} {}", expected, context)))
        }
    }

    pub(crate) fn expect_identifier(&mut self, context: &str) -> Result<String, ParseError> {
        if !matches!(self.current, Token::Ident(..)) {
            return Err(self.unexpected(&format!("identifier {}", context)));
        }
        match self.advance()? {
            Token::Ident(name, _) => Ok(name),
            other => Err(ParseError {
                message: format!("Expected identifier {}, found {}", context, other),
                location: other.location(),
            }),
        }
    }

    pub(crate) fn expect_number(&mut self, context: &str) -> Result<i64, ParseError> {
        match self.current {
            Token::Number(value, _) => {
                self.advance()?;
                Ok(value)
            }
            _ => Err(self.unexpected(&format!("number {}", context))),
        }
    }

    pub(crate) fn expect_semicolon(&mut self, context: &str) -> Result<(), ParseError> {
        self.expect(Token::Semicolon, context).map(|_| ())
    }

    pub(crate) fn expect_lparen(&mut self, context: &str) -> Result<(), ParseError> {
        self.expect(Token::LParen, context).map(|_| ())
    }

    pub(crate) fn expect_rparen(&mut self, context: &str) -> Result<(), ParseError> {
        self.expect(Token::RParen, context).map(|_| ())
    }

    /// Build the error for a lookahead outside every production.
    pub(crate) fn unexpected(&self, expected: &str) -> ParseError {
        ParseError {
            message: format!("Expected {}, found {}", expected, self.current),
            location: self.current_location(),
        }
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.current.location()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.current, Token::Eof(_))
    }
}
