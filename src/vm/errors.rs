//! Runtime error types for the IR executor
//!
//! This module defines [`RuntimeError`], which represents all errors that can occur
//! while executing a lowered module (as opposed to parse or lowering errors).
//!
//! All runtime errors are fatal: they unwind every active frame and end the run.

use thiserror::Error;

/// Runtime errors that can occur during execution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// `div`/`mod` with a zero divisor
    #[error("Division by zero in {function}")]
    DivisionByZero { function: String },

    /// Quotient not representable (`min / -1`)
    #[error("Integer overflow in division in {function}")]
    DivisionOverflow { function: String },

    /// Cell access outside a slot's storage
    #[error("Index {index} out of bounds for '{slot}' of size {size} in {function}")]
    OutOfBounds {
        slot: String,
        index: i64,
        size: usize,
        function: String,
    },

    /// Slot used before its allocation executed
    #[error("Slot {slot} used before allocation in {function}")]
    UnallocatedSlot { slot: u32, function: String },

    /// Called a routine that was declared `forward` but never defined
    #[error("Routine '{name}' is declared but has no body")]
    UndefinedFunction { name: String },

    /// Module has no function with the requested name
    #[error("No entry function named '{name}'")]
    MissingEntry { name: String },

    #[error("Block '{label}' in {function} has no terminator")]
    MissingTerminator { label: String, function: String },

    /// Malformed IR (bad register, block or callee reference)
    #[error("Invalid IR in {function}: {message}")]
    InvalidIr { function: String, message: String },

    #[error("Call depth limit of {limit} exceeded")]
    StackOverflow { limit: usize },

    #[error("Step limit of {limit} exceeded")]
    StepLimitExceeded { limit: u64 },

    #[error("Input exhausted while reading an integer")]
    InputExhausted,

    #[error("Invalid integer input '{text}'")]
    InvalidInput { text: String },

    #[error("I/O error: {message}")]
    Io { message: String },
}
