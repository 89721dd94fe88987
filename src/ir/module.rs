// IR data: functions made of basic blocks of straight-line instructions

use super::{BinaryOp, Intrinsic, Signature};

/// Index of a function within its [`Module`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(pub u32);

/// A block of a specific function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId {
    pub function: FunctionId,
    pub index: u32,
}

/// Function-local SSA register. Parameters occupy the first registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId(pub u32);

/// Function-local stack slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    Const {
        dest: ValueId,
        value: i64,
    },
    Alloca {
        slot: SlotId,
        size: usize,
        name: String,
    },
    Load {
        dest: ValueId,
        slot: SlotId,
        offset: Option<ValueId>,
    },
    Store {
        slot: SlotId,
        offset: Option<ValueId>,
        value: ValueId,
    },
    Binary {
        dest: ValueId,
        op: BinaryOp,
        lhs: ValueId,
        rhs: ValueId,
    },
    Call {
        dest: Option<ValueId>,
        callee: FunctionId,
        args: Vec<ValueId>,
    },
    Intrinsic {
        dest: Option<ValueId>,
        intrinsic: Intrinsic,
        args: Vec<ValueId>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    Branch(u32),
    CondBranch {
        condition: ValueId,
        then_block: u32,
        else_block: u32,
    },
    Return(Option<ValueId>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub label: String,
    pub instrs: Vec<Instr>,
    pub terminator: Option<Terminator>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub signature: Signature,
    /// Empty for a declaration without body; block 0 is the entry.
    pub blocks: Vec<BasicBlock>,
    pub value_count: u32,
    pub slot_count: u32,
}

impl Function {
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module {
    pub functions: Vec<Function>,
}

impl Module {
    pub fn find(&self, name: &str) -> Option<FunctionId> {
        self.functions
            .iter()
            .position(|f| f.name == name)
            .map(|index| FunctionId(index as u32))
    }

    pub fn get(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(id.0 as usize)
    }
}
