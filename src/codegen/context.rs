//! Lowering state
//!
//! [`LoweringContext`] is threaded by `&mut` through every lowering method.
//! It owns the backend builder plus everything that depends on where in the
//! program lowering currently is:
//!
//! - the [`Scope`] of the routine body being lowered,
//! - the stack of enclosing loops' exit blocks (for `break`),
//! - the [`RoutineFrame`] of the function receiving code,
//! - the set of routines that already received a body,
//! - the semantic errors reported so far.

use super::errors::{LoweringErrors, SemanticError};
use super::ENTRY_POINT;
use crate::ir::{IrBuilder, Signature};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

/// Name bindings visible in the body currently being lowered.
///
/// Bindings never nest: a routine body starts from an empty scope and the
/// enclosing scope is restored untouched when the body is done.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope<S> {
    /// Names that may be assigned: variables, parameters, the function accumulator
    pub variables: FxHashMap<String, S>,
    /// Everything readable; `variables` plus constants
    pub addressable: FxHashMap<String, S>,
    /// For arrays only: `-from`, added to a source index to get a cell index
    pub array_offsets: FxHashMap<String, i64>,
}

impl<S> Default for Scope<S> {
    fn default() -> Self {
        Self {
            variables: FxHashMap::default(),
            addressable: FxHashMap::default(),
            array_offsets: FxHashMap::default(),
        }
    }
}

impl<S: Copy> Scope<S> {
    pub fn is_declared(&self, name: &str) -> bool {
        self.addressable.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.addressable.is_empty()
    }

    pub(crate) fn bind_variable(&mut self, name: &str, slot: S) {
        self.variables.insert(name.to_string(), slot);
        self.addressable.insert(name.to_string(), slot);
    }

    pub(crate) fn bind_constant(&mut self, name: &str, slot: S) {
        self.addressable.insert(name.to_string(), slot);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineKind {
    Program,
    Procedure,
    Function,
}

/// The routine whose body is receiving code
#[derive(Debug, Clone)]
pub struct RoutineFrame<F, S> {
    pub name: String,
    pub kind: RoutineKind,
    pub function: F,
    /// Result slot, bound to the function's own name
    pub accumulator: Option<S>,
}

pub struct LoweringContext<B: IrBuilder> {
    pub(crate) builder: B,
    pub(crate) scope: Scope<B::Slot>,
    pub(crate) loop_exits: Vec<B::Block>,
    pub(crate) frame: RoutineFrame<B::Function, B::Slot>,
    pub(crate) defined: FxHashSet<String>,
    pub(crate) errors: Vec<SemanticError>,
}

impl<B: IrBuilder> LoweringContext<B> {
    /// Create the context and the entry function that receives the program body.
    pub fn new(mut builder: B) -> Self {
        let function = builder.create_function(
            ENTRY_POINT,
            Signature {
                param_count: 0,
                returns_value: false,
            },
        );
        let entry = builder.create_block(function, "entry");
        builder.set_insertion_point(entry);

        Self {
            builder,
            scope: Scope::default(),
            loop_exits: Vec::new(),
            frame: RoutineFrame {
                name: ENTRY_POINT.to_string(),
                kind: RoutineKind::Program,
                function,
                accumulator: None,
            },
            defined: FxHashSet::default(),
            errors: Vec::new(),
        }
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    pub fn scope(&self) -> &Scope<B::Slot> {
        &self.scope
    }

    pub fn errors(&self) -> &[SemanticError] {
        &self.errors
    }

    pub fn frame(&self) -> &RoutineFrame<B::Function, B::Slot> {
        &self.frame
    }

    /// Give back the builder, or every error reported during lowering.
    pub fn finish(self) -> Result<B, LoweringErrors> {
        if self.errors.is_empty() {
            Ok(self.builder)
        } else {
            Err(LoweringErrors {
                errors: self.errors,
            })
        }
    }

    pub(crate) fn report(&mut self, err: SemanticError) {
        warn!(routine = %self.frame.name, "{}", err);
        self.errors.push(err);
    }

    /// Continue emission in a fresh block after a jump or return.
    ///
    /// Code that follows `break` or `exit` in the same statement list is
    /// still lowered, into a block nothing branches to.
    pub(crate) fn start_dead_block(&mut self, label: &str) {
        let block = self.builder.create_block(self.frame.function, label);
        self.builder.set_insertion_point(block);
    }
}
