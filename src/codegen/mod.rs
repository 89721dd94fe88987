//! Lowering from the AST to IR builder calls
//!
//! A single pass over the [`Program`] that binds names, computes array cell
//! offsets and builds the control-flow graph through any [`IrBuilder`]:
//! - [`context`]: [`LoweringContext`] and the [`Scope`] maps
//! - `declarations`: constants, variables, procedures and functions
//! - `statements`: assignments, `if`, calls, I/O, `break`, `exit`
//! - `loops`: `while` and `for`
//! - `expressions`: operators, variable reads, calls
//! - [`errors`]: [`SemanticError`] and the collected [`LoweringErrors`]
//!
//! # Routine bodies
//!
//! Scopes do not nest. Lowering a procedure or function body saves the
//! current scope, loop stack, routine frame and insertion point, lowers the
//! body against an empty scope, then restores all four. Routine names are
//! global to the module, and a routine can only be called after its first
//! (forward or defining) declaration has been lowered.
//!
//! # Program body
//!
//! The main block is lowered into a function named [`ENTRY_POINT`], which no
//! source identifier can spell. `exit` in the main block returns from it.

pub mod context;
mod declarations;
pub mod errors;
mod expressions;
mod loops;
mod statements;

pub use context::{LoweringContext, RoutineFrame, RoutineKind, Scope};
pub use declarations::MAX_ARRAY_LEN;
pub use errors::{LoweringErrors, SemanticError};

use crate::ir::IrBuilder;
use crate::parser::ast::Program;

/// Name of the backend function holding the program body
pub const ENTRY_POINT: &str = "<program>";

/// Lower `program` into `builder`, returning the builder on success.
pub fn lower_program<B: IrBuilder>(program: &Program, builder: B) -> Result<B, LoweringErrors> {
    let mut ctx = LoweringContext::new(builder);
    ctx.lower_program(program);
    ctx.finish()
}
