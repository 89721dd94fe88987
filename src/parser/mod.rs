//! Mila source code parser
//!
//! This module transforms Mila source text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens, pulled on demand)
//! - [`parse`]: The [`Parser`] driver, helpers and error type
//! - [`ast`]: AST node definitions
//!
//! # Language
//!
//! - Types: `integer` (64-bit signed) and `array [lo .. hi] of integer`
//! - Declarations: `const`, `var`, `procedure`, `function`, `forward`
//! - Statements: assignment, calls, `if`, `while`, `for to/downto`,
//!   `exit`, `break`, `readln`, `write`, `writeln`, `inc`, `dec`
//! - Expressions: arithmetic, comparison, `and`/`or`/`not`, `^`, calls
//!
//! # Parser Implementation
//!
//! Hand-written predictive recursive descent with one token of lookahead.
//! No external parser generator dependencies. Parsing stops at the first
//! error and never returns a partial tree.

pub mod ast;
mod declarations;
mod expressions;
pub mod lexer;
pub mod parse;
mod statements;

pub use parse::{ParseError, Parser};

/// Parse a complete program from source text.
pub fn parse_program(source: &str) -> Result<ast::Program, ParseError> {
    Parser::new(source)?.parse_program()
}
