//! # Introduction
//!
//! `mila` compiles programs in Mila, a small Pascal-like teaching language,
//! into a basic-block intermediate representation, and ships a reference
//! executor for that representation.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST → Lowering → IrBuilder → Module → VM
//! ```
//!
//! 1. [`parser`]: pulls tokens from a [`parser::lexer::TokenSource`] and
//!    builds the AST by predictive recursive descent. The first syntax
//!    error aborts parsing.
//! 2. [`codegen`]: walks the AST once, binding names per routine body and
//!    emitting blocks, slots and operations through [`ir::IrBuilder`].
//!    Semantic errors are collected and reported together.
//! 3. [`ir`]: the builder contract and [`ir::ModuleBuilder`], which records
//!    an [`ir::Module`].
//! 4. [`vm`]: executes a module, with program I/O behind [`vm::Console`].
//!
//! ## Language
//!
//! Types: `integer` (64-bit signed), `array [lo .. hi] of integer`.
//! Declarations: `const`, `var`, `procedure`, `function`, `forward`.
//! Control flow: `if/else`, `while`, `for to/downto`, `break`, `exit`.
//! Built-ins: `readln`, `write`, `writeln`, `inc`, `dec`.

pub mod codegen;
pub mod ir;
pub mod parser;
pub mod vm;

use thiserror::Error;

/// Any failure between source text and a finished module
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] parser::ParseError),
    #[error(transparent)]
    Lower(#[from] codegen::LoweringErrors),
}

/// Parse and lower `source` into an IR module.
pub fn compile(source: &str) -> Result<ir::Module, CompileError> {
    let program = parser::parse_program(source)?;
    let builder = codegen::lower_program(&program, ir::ModuleBuilder::new())?;
    Ok(builder.finish())
}
