//! Intermediate representation and the backend builder contract
//!
//! Lowering never constructs IR directly. It drives an [`IrBuilder`], which
//! exposes the operations a basic-block SSA backend provides: functions,
//! blocks, an insertion point, stack slots, loads/stores, integer arithmetic,
//! branches, calls and returns. Every value is a 64-bit signed integer.
//!
//! [`ModuleBuilder`] is the in-crate backend. It records an [`Module`] that
//! the [`crate::vm`] executes.

mod builder;
mod module;

pub use builder::ModuleBuilder;
pub use module::{
    BasicBlock, BlockId, Function, FunctionId, Instr, Module, SlotId, Terminator, ValueId,
};

use std::fmt;

/// Integer operations a backend must provide.
///
/// Comparisons produce 1 for true and 0 for false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    /// Signed division truncating toward zero
    Div,
    /// Signed remainder, sign follows the dividend
    Rem,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "sdiv",
            BinaryOp::Rem => "srem",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Eq => "icmp eq",
            BinaryOp::Ne => "icmp ne",
            BinaryOp::Lt => "icmp slt",
            BinaryOp::Gt => "icmp sgt",
            BinaryOp::Le => "icmp sle",
            BinaryOp::Ge => "icmp sge",
        };
        f.write_str(name)
    }
}

/// Runtime services the generated code calls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    /// Read one integer; returns it
    ReadInt,
    /// Print one integer, no line break
    Write,
    /// Print one integer followed by a line break
    WriteLine,
    /// Print a line break
    NewLine,
}

impl Intrinsic {
    pub fn arity(self) -> usize {
        match self {
            Intrinsic::ReadInt | Intrinsic::NewLine => 0,
            Intrinsic::Write | Intrinsic::WriteLine => 1,
        }
    }

    pub fn returns_value(self) -> bool {
        matches!(self, Intrinsic::ReadInt)
    }
}

/// Shape of a backend function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub param_count: usize,
    pub returns_value: bool,
}

/// Operations lowering needs from a backend.
///
/// Handles are small copyable ids owned by the backend. Emission methods
/// append to the block chosen by [`IrBuilder::set_insertion_point`].
pub trait IrBuilder {
    type Value: Copy + fmt::Debug;
    type Block: Copy + PartialEq + fmt::Debug;
    type Function: Copy + PartialEq + fmt::Debug;
    type Slot: Copy + PartialEq + fmt::Debug;

    /// Declare a function with `param_count` integer parameters.
    fn create_function(&mut self, name: &str, signature: Signature) -> Self::Function;

    /// Look up a previously declared function by name.
    fn function(&self, name: &str) -> Option<Self::Function>;

    fn signature(&self, function: Self::Function) -> Signature;

    /// The value of parameter `index` inside `function`'s body.
    fn param(&self, function: Self::Function, index: usize) -> Self::Value;

    /// Append a new, empty block to `function`.
    fn create_block(&mut self, function: Self::Function, label: &str) -> Self::Block;

    fn insertion_block(&self) -> Option<Self::Block>;

    fn set_insertion_point(&mut self, block: Self::Block);

    /// Reserve `size` zero-initialised cells in the current function's frame.
    fn create_alloca(&mut self, name: &str, size: usize) -> Self::Slot;

    /// Load cell `offset` (or cell 0) of `slot`.
    fn create_load(&mut self, slot: Self::Slot, offset: Option<Self::Value>) -> Self::Value;

    fn create_store(&mut self, slot: Self::Slot, offset: Option<Self::Value>, value: Self::Value);

    fn create_constant(&mut self, value: i64) -> Self::Value;

    fn create_binary(&mut self, op: BinaryOp, lhs: Self::Value, rhs: Self::Value) -> Self::Value;

    /// Call `function`; yields a value only for value-returning functions.
    fn create_call(&mut self, function: Self::Function, args: &[Self::Value])
        -> Option<Self::Value>;

    fn create_intrinsic(&mut self, intrinsic: Intrinsic, args: &[Self::Value])
        -> Option<Self::Value>;

    fn create_branch(&mut self, target: Self::Block);

    fn create_cond_branch(
        &mut self,
        condition: Self::Value,
        then_block: Self::Block,
        else_block: Self::Block,
    );

    fn create_return(&mut self, value: Option<Self::Value>);
}
