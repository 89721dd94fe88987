//! IR execution engine
//!
//! [`Machine`] walks the basic blocks of an [`ir::Module`](crate::ir::Module)
//! directly. Each call gets a fresh [`Frame`] of registers and slot storage.
//! Active calls live on a heap-allocated stack rather than the Rust stack,
//! bounded by [`Limits::max_call_depth`].

use super::console::Console;
use super::errors::RuntimeError;
use super::Limits;
use crate::codegen::ENTRY_POINT;
use crate::ir::{
    BinaryOp, Function, FunctionId, Instr, Intrinsic, Module, SlotId, Terminator, ValueId,
};
use tracing::{debug, trace};

/// Storage created by one executed `alloca`
struct Storage<'m> {
    name: &'m str,
    cells: Vec<i64>,
}

/// Activation record of one call
struct Frame<'m> {
    function: &'m Function,
    values: Vec<i64>,
    slots: Vec<Option<Storage<'m>>>,
}

impl<'m> Frame<'m> {
    fn new(function: &'m Function, args: &[i64]) -> Result<Self, RuntimeError> {
        if args.len() != function.signature.param_count {
            return Err(RuntimeError::InvalidIr {
                function: function.name.clone(),
                message: format!(
                    "expected {} arguments, got {}",
                    function.signature.param_count,
                    args.len()
                ),
            });
        }

        let mut values = vec![0; (function.value_count as usize).max(args.len())];
        values[..args.len()].copy_from_slice(args);

        let mut slots = Vec::with_capacity(function.slot_count as usize);
        slots.resize_with(function.slot_count as usize, || None);

        Ok(Self {
            function,
            values,
            slots,
        })
    }

    fn invalid(&self, message: String) -> RuntimeError {
        RuntimeError::InvalidIr {
            function: self.function.name.clone(),
            message,
        }
    }

    fn value(&self, id: ValueId) -> Result<i64, RuntimeError> {
        self.values
            .get(id.0 as usize)
            .copied()
            .ok_or_else(|| self.invalid(format!("register %{} out of range", id.0)))
    }

    fn set(&mut self, id: ValueId, value: i64) -> Result<(), RuntimeError> {
        match self.values.get_mut(id.0 as usize) {
            Some(register) => {
                *register = value;
                Ok(())
            }
            None => Err(self.invalid(format!("register %{} out of range", id.0))),
        }
    }

    fn allocate(&mut self, slot: SlotId, name: &'m str, size: usize) -> Result<(), RuntimeError> {
        match self.slots.get_mut(slot.0 as usize) {
            Some(entry) => {
                *entry = Some(Storage {
                    name,
                    cells: vec![0; size],
                });
                Ok(())
            }
            None => Err(self.invalid(format!("slot ${} out of range", slot.0))),
        }
    }

    /// Resolve `slot[offset]` to its cell
    fn cell(&mut self, slot: SlotId, offset: Option<ValueId>) -> Result<&mut i64, RuntimeError> {
        let index = match offset {
            Some(offset) => self.value(offset)?,
            None => 0,
        };
        let function = self.function;

        let storage = match self.slots.get_mut(slot.0 as usize) {
            Some(Some(storage)) => storage,
            _ => {
                return Err(RuntimeError::UnallocatedSlot {
                    slot: slot.0,
                    function: function.name.clone(),
                })
            }
        };

        let size = storage.cells.len();
        match usize::try_from(index) {
            Ok(i) if i < size => Ok(&mut storage.cells[i]),
            _ => Err(RuntimeError::OutOfBounds {
                slot: storage.name.to_string(),
                index,
                size,
                function: function.name.clone(),
            }),
        }
    }
}

/// One active call: its frame plus the position of the next instruction.
struct Activation<'m> {
    frame: Frame<'m>,
    block: usize,
    instr: usize,
    /// Caller register receiving the return value
    result: Option<ValueId>,
}

impl<'m> Activation<'m> {
    fn new(
        function: &'m Function,
        args: &[i64],
        result: Option<ValueId>,
    ) -> Result<Self, RuntimeError> {
        Ok(Self {
            frame: Frame::new(function, args)?,
            block: 0,
            instr: 0,
            result,
        })
    }
}

/// A `call` instruction waiting for its callee's frame
struct PendingCall {
    callee: FunctionId,
    args: Vec<i64>,
    dest: Option<ValueId>,
}

/// Executes a lowered module against a [`Console`].
pub struct Machine<'m, C: Console> {
    module: &'m Module,
    console: C,
    limits: Limits,
    steps: u64,
}

impl<'m, C: Console> Machine<'m, C> {
    pub fn new(module: &'m Module, console: C) -> Self {
        Self {
            module,
            console,
            limits: Limits::default(),
            steps: 0,
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn into_console(self) -> C {
        self.console
    }

    /// Run the program body.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        self.call_by_name(ENTRY_POINT, &[]).map(|_| ())
    }

    /// Call any function of the module by name.
    pub fn call_by_name(&mut self, name: &str, args: &[i64]) -> Result<Option<i64>, RuntimeError> {
        let id = self
            .module
            .find(name)
            .ok_or_else(|| RuntimeError::MissingEntry {
                name: name.to_string(),
            })?;
        self.execute(id, args)
    }

    /// Function with a body, ready to be entered
    fn callable(&self, id: FunctionId) -> Result<&'m Function, RuntimeError> {
        let module = self.module;
        let function = module.get(id).ok_or_else(|| RuntimeError::InvalidIr {
            function: "<module>".to_string(),
            message: format!("no function with id {}", id.0),
        })?;

        if function.is_declaration() {
            return Err(RuntimeError::UndefinedFunction {
                name: function.name.clone(),
            });
        }
        Ok(function)
    }

    /// Run `id` to completion. Nested calls push onto `stack` instead of
    /// recursing, so call depth is bounded only by [`Limits::max_call_depth`].
    fn execute(&mut self, id: FunctionId, args: &[i64]) -> Result<Option<i64>, RuntimeError> {
        let entry = self.callable(id)?;
        debug!(function = %entry.name, depth = 1, "call");
        let mut stack = vec![Activation::new(entry, args, None)?];

        loop {
            let Some(top) = stack.last_mut() else {
                return Ok(None);
            };
            let function = top.frame.function;
            let block = function
                .blocks
                .get(top.block)
                .ok_or_else(|| top.frame.invalid(format!("block {} out of range", top.block)))?;

            if let Some(instr) = block.instrs.get(top.instr) {
                top.instr += 1;
                self.tick()?;
                let Some(call) = self.step(&mut top.frame, instr)? else {
                    continue;
                };

                if stack.len() >= self.limits.max_call_depth {
                    return Err(RuntimeError::StackOverflow {
                        limit: self.limits.max_call_depth,
                    });
                }
                let callee = self.callable(call.callee)?;
                debug!(function = %callee.name, depth = stack.len() + 1, "call");
                stack.push(Activation::new(callee, &call.args, call.dest)?);
                continue;
            }

            self.tick()?;
            match block.terminator {
                Some(Terminator::Branch(target)) => {
                    top.block = target as usize;
                    top.instr = 0;
                }
                Some(Terminator::CondBranch {
                    condition,
                    then_block,
                    else_block,
                }) => {
                    top.block = if top.frame.value(condition)? != 0 {
                        then_block as usize
                    } else {
                        else_block as usize
                    };
                    top.instr = 0;
                }
                Some(Terminator::Return(value)) => {
                    let value = value.map(|v| top.frame.value(v)).transpose()?;
                    let result = top.result;
                    stack.pop();

                    let Some(caller) = stack.last_mut() else {
                        return Ok(value);
                    };
                    match (result, value) {
                        (Some(dest), Some(value)) => caller.frame.set(dest, value)?,
                        (None, _) => {}
                        (Some(_), None) => {
                            return Err(caller
                                .frame
                                .invalid("call to procedure used as value".to_string()))
                        }
                    }
                }
                None => {
                    return Err(RuntimeError::MissingTerminator {
                        label: block.label.clone(),
                        function: function.name.clone(),
                    })
                }
            }
        }
    }

    fn tick(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;
        match self.limits.max_steps {
            Some(limit) if self.steps > limit => Err(RuntimeError::StepLimitExceeded { limit }),
            _ => Ok(()),
        }
    }

    /// Execute a single instruction; a `call` is handed back to [`Self::execute`]
    fn step(
        &mut self,
        frame: &mut Frame<'m>,
        instr: &'m Instr,
    ) -> Result<Option<PendingCall>, RuntimeError> {
        trace!(?instr, "step");
        match instr {
            Instr::Const { dest, value } => frame.set(*dest, *value)?,
            Instr::Alloca { slot, size, name } => frame.allocate(*slot, name, *size)?,
            Instr::Load { dest, slot, offset } => {
                let value = *frame.cell(*slot, *offset)?;
                frame.set(*dest, value)?
            }
            Instr::Store {
                slot,
                offset,
                value,
            } => {
                let value = frame.value(*value)?;
                *frame.cell(*slot, *offset)? = value;
            }
            Instr::Binary { dest, op, lhs, rhs } => {
                let result = binary(*op, frame.value(*lhs)?, frame.value(*rhs)?, frame.function)?;
                frame.set(*dest, result)?
            }
            Instr::Call { dest, callee, args } => {
                let args = args
                    .iter()
                    .map(|a| frame.value(*a))
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(Some(PendingCall {
                    callee: *callee,
                    args,
                    dest: *dest,
                }));
            }
            Instr::Intrinsic {
                dest,
                intrinsic,
                args,
            } => {
                let arg = |i: usize| {
                    args.get(i)
                        .ok_or_else(|| {
                            frame.invalid(format!("{:?} is missing an argument", intrinsic))
                        })
                        .and_then(|a| frame.value(*a))
                };
                match intrinsic {
                    Intrinsic::ReadInt => {
                        let value = self.console.read_int()?;
                        if let Some(dest) = dest {
                            frame.set(*dest, value)?;
                        }
                    }
                    Intrinsic::Write => self.console.write(&arg(0)?.to_string())?,
                    Intrinsic::WriteLine => self.console.write(&format!("{}\n", arg(0)?))?,
                    Intrinsic::NewLine => self.console.write("\n")?,
                }
            }
        }
        Ok(None)
    }
}

fn binary(op: BinaryOp, lhs: i64, rhs: i64, function: &Function) -> Result<i64, RuntimeError> {
    let flag = |b: bool| b as i64;
    Ok(match op {
        BinaryOp::Add => lhs.wrapping_add(rhs),
        BinaryOp::Sub => lhs.wrapping_sub(rhs),
        BinaryOp::Mul => lhs.wrapping_mul(rhs),
        BinaryOp::Div | BinaryOp::Rem => {
            if rhs == 0 {
                return Err(RuntimeError::DivisionByZero {
                    function: function.name.clone(),
                });
            }
            let result = if op == BinaryOp::Div {
                lhs.checked_div(rhs)
            } else {
                lhs.checked_rem(rhs)
            };
            result.ok_or_else(|| RuntimeError::DivisionOverflow {
                function: function.name.clone(),
            })?
        }
        BinaryOp::And => lhs & rhs,
        BinaryOp::Or => lhs | rhs,
        BinaryOp::Eq => flag(lhs == rhs),
        BinaryOp::Ne => flag(lhs != rhs),
        BinaryOp::Lt => flag(lhs < rhs),
        BinaryOp::Gt => flag(lhs > rhs),
        BinaryOp::Le => flag(lhs <= rhs),
        BinaryOp::Ge => flag(lhs >= rhs),
    })
}
