//! Expression lowering
//!
//! Operands are lowered left to right. `and`/`or` are bitwise on the
//! integer values; `not` is logical (`x = 0`); negation is `0 - x`.

use super::context::LoweringContext;
use super::errors::SemanticError;
use crate::ir::{BinaryOp, IrBuilder};
use crate::parser::ast::*;

/// Backend operation for a source operator; `None` for `^`
fn binary_op(op: BinOp) -> Option<BinaryOp> {
    Some(match op {
        BinOp::Eq => BinaryOp::Eq,
        BinOp::Ne => BinaryOp::Ne,
        BinOp::Lt => BinaryOp::Lt,
        BinOp::Gt => BinaryOp::Gt,
        BinOp::Le => BinaryOp::Le,
        BinOp::Ge => BinaryOp::Ge,
        BinOp::Add => BinaryOp::Add,
        BinOp::Sub => BinaryOp::Sub,
        BinOp::Or => BinaryOp::Or,
        BinOp::Mul => BinaryOp::Mul,
        BinOp::Div => BinaryOp::Div,
        BinOp::Mod => BinaryOp::Rem,
        BinOp::And => BinaryOp::And,
        BinOp::Exp => return None,
    })
}

impl<B: IrBuilder> LoweringContext<B> {
    pub(crate) fn lower_expression(&mut self, expr: &Expr) -> Result<B::Value, SemanticError> {
        match expr {
            Expr::Number(value) => Ok(self.builder.create_constant(*value)),
            Expr::Var(access) => self.lower_access(access),
            Expr::Call {
                name,
                args,
                location,
            } => self.lower_value_call(name, args, *location),
            Expr::Binary {
                op,
                left,
                right,
                location,
            } => {
                let Some(kind) = binary_op(*op) else {
                    return Err(SemanticError::Unsupported {
                        what: "exponentiation ('^')",
                        location: *location,
                    });
                };
                let lhs = self.lower_expression(left)?;
                let rhs = self.lower_expression(right)?;
                Ok(self.builder.create_binary(kind, lhs, rhs))
            }
            Expr::Unary {
                op: UnOp::Neg,
                operand,
                ..
            } => {
                let value = self.lower_expression(operand)?;
                let zero = self.builder.create_constant(0);
                Ok(self.builder.create_binary(BinaryOp::Sub, zero, value))
            }
            Expr::Unary {
                op: UnOp::Not,
                operand,
                ..
            } => {
                let value = self.lower_expression(operand)?;
                let zero = self.builder.create_constant(0);
                Ok(self.builder.create_binary(BinaryOp::Eq, value, zero))
            }
            Expr::Null => Err(SemanticError::EmptyExpression),
        }
    }

    /// Read a variable or constant; a bare routine name reads as a call
    fn lower_access(&mut self, access: &VarAccess) -> Result<B::Value, SemanticError> {
        if let Some(&slot) = self.scope.addressable.get(&access.name) {
            let offset = self.lower_index(&access.name, &access.indices, access.location)?;
            return Ok(self.builder.create_load(slot, offset));
        }

        if access.indices.is_empty() && self.builder.function(&access.name).is_some() {
            return self.lower_value_call(&access.name, &[], access.location);
        }

        Err(SemanticError::Unbound {
            name: access.name.clone(),
            location: access.location,
        })
    }

    fn lower_value_call(
        &mut self,
        name: &str,
        args: &[Expr],
        location: SourceLocation,
    ) -> Result<B::Value, SemanticError> {
        self.lower_call(name, args, location)?
            .ok_or_else(|| SemanticError::NoReturnValue {
                name: name.to_string(),
                location,
            })
    }
}
