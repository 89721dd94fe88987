//! Statement lowering
//!
//! Each statement is lowered at the current insertion point. A statement that
//! fails is reported and skipped, so one bad statement does not hide errors
//! in the ones after it. Loops live in `loops`.

use super::context::LoweringContext;
use super::errors::SemanticError;
use crate::ir::{BinaryOp, Intrinsic, IrBuilder};
use crate::parser::ast::*;
use tracing::warn;

impl<B: IrBuilder> LoweringContext<B> {
    /// Lower `stmt`, recording any error instead of returning it
    pub(crate) fn lower_statement_reporting(&mut self, stmt: &Stmt) {
        if let Err(err) = self.lower_statement(stmt) {
            self.report(err);
        }
    }

    pub(crate) fn lower_statement(&mut self, stmt: &Stmt) -> Result<(), SemanticError> {
        match stmt {
            Stmt::Compound(statements) => {
                for statement in statements {
                    self.lower_statement_reporting(statement);
                }
                Ok(())
            }
            Stmt::Assign { target, value } => {
                let (slot, offset) = self.resolve_target(target)?;
                let value = self.lower_expression(value)?;
                self.builder.create_store(slot, offset, value);
                Ok(())
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => self.lower_if(condition, then_branch, else_branch),
            Stmt::While { condition, body } => self.lower_while(condition, body),
            Stmt::For {
                var,
                from,
                direction,
                to,
                body,
                location,
            } => self.lower_for(var, from, *direction, to, body, *location),
            Stmt::Exit { .. } => {
                self.lower_exit();
                Ok(())
            }
            Stmt::Inc(target) => self.lower_increment(target, 1),
            Stmt::Dec(target) => self.lower_increment(target, -1),
            Stmt::Readln(target) => {
                let (slot, offset) = self.resolve_target(target)?;
                if let Some(value) = self.builder.create_intrinsic(Intrinsic::ReadInt, &[]) {
                    self.builder.create_store(slot, offset, value);
                }
                Ok(())
            }
            Stmt::Write(value) => {
                let value = self.lower_expression(value)?;
                self.builder.create_intrinsic(Intrinsic::Write, &[value]);
                Ok(())
            }
            Stmt::Writeln(Expr::Null) => {
                self.builder.create_intrinsic(Intrinsic::NewLine, &[]);
                Ok(())
            }
            Stmt::Writeln(value) => {
                let value = self.lower_expression(value)?;
                self.builder.create_intrinsic(Intrinsic::WriteLine, &[value]);
                Ok(())
            }
            Stmt::Break { location } => {
                let exit = self
                    .loop_exits
                    .last()
                    .copied()
                    .ok_or(SemanticError::BreakOutsideLoop {
                        location: *location,
                    })?;
                self.builder.create_branch(exit);
                self.start_dead_block("after.break");
                Ok(())
            }
            Stmt::ProcCall {
                name,
                args,
                location,
            } => self.lower_call(name, args, *location).map(|_| ()),
            Stmt::Null => Ok(()),
        }
    }

    /// Resolve an assignable name to its slot and optional cell offset
    pub(crate) fn resolve_target(
        &mut self,
        target: &VarTarget,
    ) -> Result<(B::Slot, Option<B::Value>), SemanticError> {
        let Some(&slot) = self.scope.variables.get(&target.name) else {
            return Err(if self.scope.is_declared(&target.name) {
                SemanticError::AssignToConstant {
                    name: target.name.clone(),
                    location: target.location,
                }
            } else {
                SemanticError::Unbound {
                    name: target.name.clone(),
                    location: target.location,
                }
            });
        };

        let offset = self.lower_index(&target.name, &target.indices, target.location)?;
        Ok((slot, offset))
    }

    /// Cell offset for `name[indices]`: first index plus the array's base offset
    ///
    /// Scalars take no index and yield `None`. Only the first index of a
    /// chain is used.
    pub(crate) fn lower_index(
        &mut self,
        name: &str,
        indices: &[Expr],
        location: SourceLocation,
    ) -> Result<Option<B::Value>, SemanticError> {
        let base = self.scope.array_offsets.get(name).copied();
        match (base, indices.split_first()) {
            (None, None) => Ok(None),
            (None, Some(_)) => Err(SemanticError::NotAnArray {
                name: name.to_string(),
                location,
            }),
            (Some(_), None) => Err(SemanticError::MissingIndex {
                name: name.to_string(),
                location,
            }),
            (Some(base), Some((first, rest))) => {
                if !rest.is_empty() {
                    warn!(array = name, extra = rest.len(), "ignoring extra array indices");
                }
                let index = self.lower_expression(first)?;
                let base = self.builder.create_constant(base);
                Ok(Some(self.builder.create_binary(BinaryOp::Add, index, base)))
            }
        }
    }

    /// `inc`/`dec`: load, add `delta`, store back
    fn lower_increment(&mut self, target: &VarTarget, delta: i64) -> Result<(), SemanticError> {
        let (slot, offset) = self.resolve_target(target)?;
        let current = self.builder.create_load(slot, offset);
        let delta = self.builder.create_constant(delta);
        let next = self.builder.create_binary(BinaryOp::Add, current, delta);
        self.builder.create_store(slot, offset, next);
        Ok(())
    }

    /// `if` → then / else / continuation blocks
    fn lower_if(
        &mut self,
        condition: &Expr,
        then_branch: &Stmt,
        else_branch: &Stmt,
    ) -> Result<(), SemanticError> {
        let condition = self.lower_expression(condition)?;

        let function = self.frame.function;
        let then_block = self.builder.create_block(function, "then");
        let else_block = self.builder.create_block(function, "else");
        let join = self.builder.create_block(function, "ifcont");
        self.builder
            .create_cond_branch(condition, then_block, else_block);

        self.builder.set_insertion_point(then_block);
        self.lower_statement_reporting(then_branch);
        self.builder.create_branch(join);

        self.builder.set_insertion_point(else_block);
        self.lower_statement_reporting(else_branch);
        self.builder.create_branch(join);

        self.builder.set_insertion_point(join);
        Ok(())
    }

    /// `exit`: return the accumulator (functions) or nothing (procedures, program)
    fn lower_exit(&mut self) {
        let result = self
            .frame
            .accumulator
            .map(|slot| self.builder.create_load(slot, None));
        self.builder.create_return(result);
        self.start_dead_block("after.exit");
    }

    /// Lower a call; `None` for procedures
    pub(crate) fn lower_call(
        &mut self,
        name: &str,
        args: &[Expr],
        location: SourceLocation,
    ) -> Result<Option<B::Value>, SemanticError> {
        let function = self
            .builder
            .function(name)
            .ok_or_else(|| SemanticError::UnknownRoutine {
                name: name.to_string(),
                location,
            })?;

        let expected = self.builder.signature(function).param_count;
        if args.len() != expected {
            return Err(SemanticError::ArityMismatch {
                name: name.to_string(),
                expected,
                found: args.len(),
                location,
            });
        }

        let values = args
            .iter()
            .map(|arg| self.lower_expression(arg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.builder.create_call(function, &values))
    }
}
