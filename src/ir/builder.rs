// In-crate backend: records builder calls into an ir::Module

use super::module::{
    BasicBlock, BlockId, Function, FunctionId, Instr, Module, SlotId, Terminator, ValueId,
};
use super::{BinaryOp, Intrinsic, IrBuilder, Signature};
use rustc_hash::FxHashMap;
use tracing::{trace, warn};

/// Builds an [`Module`] through the [`IrBuilder`] interface.
///
/// # Panics
///
/// Emitting an instruction before any insertion point has been set is a
/// bug in the caller and panics.
#[derive(Debug, Default)]
pub struct ModuleBuilder {
    module: Module,
    by_name: FxHashMap<String, FunctionId>,
    cursor: Option<BlockId>,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn finish(self) -> Module {
        self.module
    }

    fn function_mut(&mut self, id: FunctionId) -> &mut Function {
        &mut self.module.functions[id.0 as usize]
    }

    fn cursor(&self) -> BlockId {
        match self.cursor {
            Some(block) => block,
            None => panic!("IR emitted without an insertion point"),
        }
    }

    fn current_block(&mut self) -> &mut BasicBlock {
        let cursor = self.cursor();
        &mut self.function_mut(cursor.function).blocks[cursor.index as usize]
    }

    fn fresh_value(&mut self) -> ValueId {
        let cursor = self.cursor();
        let function = self.function_mut(cursor.function);
        let id = ValueId(function.value_count);
        function.value_count += 1;
        id
    }

    fn emit(&mut self, instr: Instr) {
        trace!(?instr, "emit");
        self.current_block().instrs.push(instr);
    }

    fn terminate(&mut self, terminator: Terminator) {
        let block = self.current_block();
        if block.terminator.is_some() {
            warn!(label = %block.label, "block already terminated; dropping {:?}", terminator);
            return;
        }
        block.terminator = Some(terminator);
    }

    fn local_block(&self, block: BlockId) -> u32 {
        debug_assert_eq!(Some(block.function), self.cursor.map(|c| c.function));
        block.index
    }
}

impl IrBuilder for ModuleBuilder {
    type Value = ValueId;
    type Block = BlockId;
    type Function = FunctionId;
    type Slot = SlotId;

    fn create_function(&mut self, name: &str, signature: Signature) -> FunctionId {
        let id = FunctionId(self.module.functions.len() as u32);
        self.module.functions.push(Function {
            name: name.to_string(),
            signature,
            blocks: Vec::new(),
            value_count: signature.param_count as u32,
            slot_count: 0,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    fn function(&self, name: &str) -> Option<FunctionId> {
        self.by_name.get(name).copied()
    }

    fn signature(&self, function: FunctionId) -> Signature {
        self.module.functions[function.0 as usize].signature
    }

    fn param(&self, _function: FunctionId, index: usize) -> ValueId {
        ValueId(index as u32)
    }

    fn create_block(&mut self, function: FunctionId, label: &str) -> BlockId {
        let blocks = &mut self.function_mut(function).blocks;
        blocks.push(BasicBlock {
            label: label.to_string(),
            instrs: Vec::new(),
            terminator: None,
        });
        BlockId {
            function,
            index: (blocks.len() - 1) as u32,
        }
    }

    fn insertion_block(&self) -> Option<BlockId> {
        self.cursor
    }

    fn set_insertion_point(&mut self, block: BlockId) {
        self.cursor = Some(block);
    }

    fn create_alloca(&mut self, name: &str, size: usize) -> SlotId {
        let cursor = self.cursor();
        let function = self.function_mut(cursor.function);
        let slot = SlotId(function.slot_count);
        function.slot_count += 1;
        self.emit(Instr::Alloca {
            slot,
            size,
            name: name.to_string(),
        });
        slot
    }

    fn create_load(&mut self, slot: SlotId, offset: Option<ValueId>) -> ValueId {
        let dest = self.fresh_value();
        self.emit(Instr::Load { dest, slot, offset });
        dest
    }

    fn create_store(&mut self, slot: SlotId, offset: Option<ValueId>, value: ValueId) {
        self.emit(Instr::Store {
            slot,
            offset,
            value,
        });
    }

    fn create_constant(&mut self, value: i64) -> ValueId {
        let dest = self.fresh_value();
        self.emit(Instr::Const { dest, value });
        dest
    }

    fn create_binary(&mut self, op: BinaryOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        let dest = self.fresh_value();
        self.emit(Instr::Binary { dest, op, lhs, rhs });
        dest
    }

    fn create_call(&mut self, function: FunctionId, args: &[ValueId]) -> Option<ValueId> {
        let dest = self
            .signature(function)
            .returns_value
            .then(|| self.fresh_value());
        self.emit(Instr::Call {
            dest,
            callee: function,
            args: args.to_vec(),
        });
        dest
    }

    fn create_intrinsic(&mut self, intrinsic: Intrinsic, args: &[ValueId]) -> Option<ValueId> {
        let dest = intrinsic.returns_value().then(|| self.fresh_value());
        self.emit(Instr::Intrinsic {
            dest,
            intrinsic,
            args: args.to_vec(),
        });
        dest
    }

    fn create_branch(&mut self, target: BlockId) {
        let target = self.local_block(target);
        self.terminate(Terminator::Branch(target));
    }

    fn create_cond_branch(&mut self, condition: ValueId, then_block: BlockId, else_block: BlockId) {
        let then_block = self.local_block(then_block);
        let else_block = self.local_block(else_block);
        self.terminate(Terminator::CondBranch {
            condition,
            then_block,
            else_block,
        });
    }

    fn create_return(&mut self, value: Option<ValueId>) {
        self.terminate(Terminator::Return(value));
    }
}
