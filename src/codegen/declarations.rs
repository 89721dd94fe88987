//! Lowering of blocks and declarations
//!
//! Constants and variables become stack slots in the current function.
//! Procedures and functions become backend functions; a routine's body is
//! lowered with a clean scope, and the caller's scope, loop stack, frame and
//! insertion point are restored afterwards.

use super::context::{LoweringContext, RoutineFrame, RoutineKind};
use super::errors::SemanticError;
use crate::ir::{IrBuilder, Signature};
use crate::parser::ast::*;
use std::mem;
use tracing::debug;

/// Largest array, in cells, a declaration may request
pub const MAX_ARRAY_LEN: i64 = 1 << 24;

impl<B: IrBuilder> LoweringContext<B> {
    /// Lower the program block into the entry function and close it.
    pub fn lower_program(&mut self, program: &Program) {
        debug!(program = %program.name, "lowering program");
        self.lower_block(&program.block);
        self.builder.create_return(None);
    }

    /// Lower one declaration into the current scope.
    ///
    /// Errors inside a routine body are reported to [`Self::errors`] rather
    /// than returned; the returned error concerns the declaration itself.
    pub fn lower_declaration(&mut self, decl: &Decl) -> Result<(), SemanticError> {
        match decl {
            Decl::Const {
                name,
                value,
                location,
            } => self.lower_const(name, *value, *location),
            Decl::Var(var) => self.lower_var(var),
            Decl::Procedure(routine) => self.lower_routine(routine, RoutineKind::Procedure),
            Decl::Function(routine) => self.lower_routine(routine, RoutineKind::Function),
        }
    }

    /// Declarations first, then the body
    pub(crate) fn lower_block(&mut self, block: &Block) {
        for decl in &block.decls {
            if let Err(err) = self.lower_declaration(decl) {
                self.report(err);
            }
        }
        self.lower_statement_reporting(&block.body);
    }

    fn check_fresh(&self, name: &str, location: SourceLocation) -> Result<(), SemanticError> {
        if self.scope.is_declared(name) {
            return Err(SemanticError::Redeclared {
                name: name.to_string(),
                location,
            });
        }
        Ok(())
    }

    fn lower_const(
        &mut self,
        name: &str,
        value: i64,
        location: SourceLocation,
    ) -> Result<(), SemanticError> {
        self.check_fresh(name, location)?;

        let slot = self.builder.create_alloca(name, 1);
        let value = self.builder.create_constant(value);
        self.builder.create_store(slot, None, value);
        self.scope.bind_constant(name, slot);
        Ok(())
    }

    fn lower_var(&mut self, var: &VarDecl) -> Result<(), SemanticError> {
        let ty = var.ty.ok_or_else(|| SemanticError::MissingType {
            name: var.name.clone(),
            location: var.location,
        })?;
        self.check_fresh(&var.name, var.location)?;

        let len = ty.element_count();
        if let Type::Array { from, to } = ty {
            if !(1..=MAX_ARRAY_LEN).contains(&len) {
                return Err(SemanticError::InvalidArrayBounds {
                    name: var.name.clone(),
                    from,
                    to,
                    location: var.location,
                });
            }
        }

        let slot = self.builder.create_alloca(&var.name, len as usize);
        if ty.is_array() {
            self.scope
                .array_offsets
                .insert(var.name.clone(), ty.base_offset());
        }
        self.scope.bind_variable(&var.name, slot);
        Ok(())
    }

    fn lower_routine(
        &mut self,
        decl: &RoutineDecl,
        kind: RoutineKind,
    ) -> Result<(), SemanticError> {
        let params = decl.parameters();
        let signature = Signature {
            param_count: params.len(),
            returns_value: kind == RoutineKind::Function,
        };

        // One backend signature per name; forward and defining declarations share it
        let function = match self.builder.function(&decl.name) {
            Some(existing) => {
                if self.builder.signature(existing) != signature {
                    return Err(SemanticError::SignatureMismatch {
                        name: decl.name.clone(),
                        location: decl.location,
                    });
                }
                existing
            }
            None => self.builder.create_function(&decl.name, signature),
        };

        let Some(body) = decl.body.as_deref() else {
            debug!(routine = %decl.name, "forward declaration");
            return Ok(());
        };
        if !self.defined.insert(decl.name.clone()) {
            return Err(SemanticError::RoutineRedefined {
                name: decl.name.clone(),
                location: decl.location,
            });
        }

        debug!(routine = %decl.name, ?kind, params = params.len(), "lowering routine body");

        let saved_block = self.builder.insertion_block();
        let saved_scope = mem::take(&mut self.scope);
        let saved_loops = mem::take(&mut self.loop_exits);

        let entry = self.builder.create_block(function, "entry");
        self.builder.set_insertion_point(entry);

        let accumulator = match kind {
            RoutineKind::Function => {
                let slot = self.builder.create_alloca(&decl.name, 1);
                self.scope.bind_variable(&decl.name, slot);
                Some(slot)
            }
            RoutineKind::Procedure | RoutineKind::Program => None,
        };
        let saved_frame = mem::replace(
            &mut self.frame,
            RoutineFrame {
                name: decl.name.clone(),
                kind,
                function,
                accumulator,
            },
        );

        for (index, param) in params.iter().enumerate() {
            if let Err(err) = self.check_fresh(&param.name, param.location) {
                self.report(err);
                continue;
            }
            let slot = self.builder.create_alloca(&param.name, 1);
            let value = self.builder.param(function, index);
            self.builder.create_store(slot, None, value);
            self.scope.bind_variable(&param.name, slot);
        }

        self.lower_block(body);

        let result = accumulator.map(|slot| self.builder.create_load(slot, None));
        self.builder.create_return(result);

        self.frame = saved_frame;
        self.loop_exits = saved_loops;
        self.scope = saved_scope;
        if let Some(block) = saved_block {
            self.builder.set_insertion_point(block);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ModuleBuilder;
    use crate::parser::parse_program;

    fn context_after(source: &str) -> LoweringContext<ModuleBuilder> {
        let program = parse_program(source).unwrap();
        let mut ctx = LoweringContext::new(ModuleBuilder::new());
        ctx.lower_program(&program);
        ctx
    }

    #[test]
    fn test_scope_restored_after_routine() {
        let program = parse_program(
            "program t;
             var g: integer; a: array [3 .. 5] of integer;
             function f(x: integer): integer;
               var local: array [0 .. 1] of integer;
             begin f := x end;
             begin end.",
        )
        .unwrap();

        let mut ctx = LoweringContext::new(ModuleBuilder::new());
        ctx.lower_declaration(&program.block.decls[0]).unwrap();
        ctx.lower_declaration(&program.block.decls[1]).unwrap();
        let before = ctx.scope().clone();
        let frame_before = ctx.frame().function;

        ctx.lower_declaration(&program.block.decls[2]).unwrap();

        assert_eq!(ctx.scope(), &before);
        assert_eq!(ctx.frame().function, frame_before);
        assert_eq!(ctx.scope().array_offsets.get("a"), Some(&-3));
        assert!(!ctx.scope().is_declared("local"));
        assert!(ctx.errors().is_empty());
    }

    #[test]
    fn test_constants_are_not_assignable() {
        let ctx = context_after("program t; const k = 1; begin k := 2 end.");
        assert!(matches!(
            ctx.errors(),
            [SemanticError::AssignToConstant { name, .. }] if name == "k"
        ));
    }

    #[test]
    fn test_redeclaration_rejected() {
        let ctx = context_after("program t; const a = 1; var a: integer; begin end.");
        assert!(matches!(ctx.errors(), [SemanticError::Redeclared { .. }]));

        let ctx =
            context_after("program t; function f(f: integer): integer; begin end; begin end.");
        assert!(matches!(ctx.errors(), [SemanticError::Redeclared { .. }]));
    }

    #[test]
    fn test_duplicate_parameter_reported_at_parameter() {
        let ctx = context_after("program t;\nprocedure p(a, a: integer); begin end;\nbegin end.");
        assert_eq!(
            ctx.errors(),
            [SemanticError::Redeclared {
                name: "a".to_string(),
                location: SourceLocation::new(2, 16),
            }]
        );
    }

    #[test]
    fn test_inner_names_may_shadow_outer() {
        let ctx = context_after(
            "program t; var x: integer;
             procedure p; var x: integer; begin x := 1 end;
             begin x := 2 end.",
        );
        assert!(ctx.errors().is_empty());
    }

    #[test]
    fn test_empty_array_rejected() {
        let ctx = context_after("program t; var a: array [5 .. 4] of integer; begin end.");
        assert!(matches!(
            ctx.errors(),
            [SemanticError::InvalidArrayBounds { from: 5, to: 4, .. }]
        ));
    }

    #[test]
    fn test_forward_signature_must_match() {
        let ctx = context_after(
            "program t; procedure p(a: integer); forward;
             procedure p(a, b: integer); begin end;
             begin end.",
        );
        assert!(matches!(ctx.errors(), [SemanticError::SignatureMismatch { .. }]));
    }

    #[test]
    fn test_second_body_rejected() {
        let ctx =
            context_after("program t; procedure p; begin end; procedure p; begin end; begin end.");
        assert!(matches!(ctx.errors(), [SemanticError::RoutineRedefined { .. }]));
    }
}
