//! Loop lowering
//!
//! Both loop forms produce three blocks:
//!
//! ```text
//! cond:  evaluate condition; br cond, loop, after
//! loop:  body; (for: step the variable); br cond
//! after: continuation, also the target of `break`
//! ```
//!
//! The `after` block is pushed on the loop-exit stack while the body is
//! lowered, so `break` always leaves the innermost loop only.

use super::context::LoweringContext;
use super::errors::SemanticError;
use crate::ir::{BinaryOp, IrBuilder};
use crate::parser::ast::*;

/// Blocks making up one loop
struct LoopBlocks<Block> {
    cond: Block,
    body: Block,
    after: Block,
}

impl<B: IrBuilder> LoweringContext<B> {
    fn create_loop_blocks(&mut self) -> LoopBlocks<B::Block> {
        let function = self.frame.function;
        LoopBlocks {
            cond: self.builder.create_block(function, "cond"),
            body: self.builder.create_block(function, "loop"),
            after: self.builder.create_block(function, "after"),
        }
    }

    /// Lower `body` with `exit` as the `break` target
    fn lower_loop_body(&mut self, body: &Stmt, exit: B::Block) {
        self.loop_exits.push(exit);
        self.lower_statement_reporting(body);
        self.loop_exits.pop();
    }

    pub(crate) fn lower_while(
        &mut self,
        condition: &Expr,
        body: &Stmt,
    ) -> Result<(), SemanticError> {
        let blocks = self.create_loop_blocks();
        self.builder.create_branch(blocks.cond);

        self.builder.set_insertion_point(blocks.cond);
        let condition = self.lower_expression(condition)?;
        self.builder
            .create_cond_branch(condition, blocks.body, blocks.after);

        self.builder.set_insertion_point(blocks.body);
        self.lower_loop_body(body, blocks.after);
        self.builder.create_branch(blocks.cond);

        self.builder.set_insertion_point(blocks.after);
        Ok(())
    }

    /// Counting loop. The limit is re-evaluated on every test of the
    /// condition; the variable keeps its last value after the loop.
    pub(crate) fn lower_for(
        &mut self,
        var: &str,
        from: &Expr,
        direction: Direction,
        to: &Expr,
        body: &Stmt,
        location: SourceLocation,
    ) -> Result<(), SemanticError> {
        let (slot, offset) = self.resolve_target(&VarTarget::new(var, location))?;
        let start = self.lower_expression(from)?;
        self.builder.create_store(slot, offset, start);

        let blocks = self.create_loop_blocks();
        self.builder.create_branch(blocks.cond);

        self.builder.set_insertion_point(blocks.cond);
        let current = self.builder.create_load(slot, offset);
        let limit = self.lower_expression(to)?;
        let compare = match direction {
            Direction::Up => BinaryOp::Le,
            Direction::Down => BinaryOp::Ge,
        };
        let condition = self.builder.create_binary(compare, current, limit);
        self.builder
            .create_cond_branch(condition, blocks.body, blocks.after);

        self.builder.set_insertion_point(blocks.body);
        self.lower_loop_body(body, blocks.after);
        let current = self.builder.create_load(slot, offset);
        let step = self.builder.create_constant(direction.step());
        let next = self.builder.create_binary(BinaryOp::Add, current, step);
        self.builder.create_store(slot, offset, next);
        self.builder.create_branch(blocks.cond);

        self.builder.set_insertion_point(blocks.after);
        Ok(())
    }
}
