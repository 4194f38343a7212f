//! Error types for building, validating and encoding predicate programs.

use std::collections::TryReserveError;

use thiserror::Error;

use crate::predexp::opcode::Opcode;

/// Errors raised by the node factories. No node is created when one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("{opcode} name must not be empty")]
    EmptyName { opcode: Opcode },

    #[error("{opcode} name is {len} bytes (max: {max})")]
    NameTooLong {
        opcode: Opcode,
        len: usize,
        max: usize,
    },

    #[error("{opcode} value is {len} bytes and does not fit a 32-bit length field")]
    ValueTooLong { opcode: Opcode, len: usize },

    #[error("{opcode} argument {value} is out of range: {reason}")]
    ArgumentOutOfRange {
        opcode: Opcode,
        value: i64,
        reason: &'static str,
    },
}

/// Structural problems found by the validator. Positions are 0-based node indexes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Program is empty")]
    EmptyProgram,

    #[error("Stack underflow at node {position} ({opcode}): needs {needed}, have {available}")]
    StackUnderflow {
        position: usize,
        opcode: Opcode,
        needed: usize,
        available: usize,
    },

    #[error("Operand mismatch at node {position} ({opcode}): expected {expected}, got {actual}")]
    OperandMismatch {
        position: usize,
        opcode: Opcode,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Program leaves {depth} items on the stack (expected 1)")]
    LeftoverStack { depth: usize },

    #[error("Program result is {actual}, not a boolean")]
    NonLogicalResult { actual: &'static str },

    #[error("Variable '{name}' is not bound by an enclosing iterator")]
    UnboundVariable { name: String },
}

/// Top-level error for list operations.
#[derive(Error, Debug)]
pub enum PredExpError {
    #[error("Construction error: {0}")]
    Construction(#[from] ConstructionError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Program size {size} exceeds the {max}-byte limit")]
    SizeOverflow { size: u64, max: u32 },

    #[error("Buffer too small: requires {required} bytes but only {available} available")]
    BufferTooSmall { required: usize, available: usize },

    #[error("Allocation failed: {0}")]
    Allocation(#[from] TryReserveError),

    #[error("Invalid token '{token}': {reason}")]
    InvalidToken { token: String, reason: String },
}

/// Result type for predicate expression operations.
pub type PredExpResult<T> = Result<T, PredExpError>;
