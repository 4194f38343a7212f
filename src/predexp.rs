//! Predicate expressions for server-side record filtering.
//!
//! A predicate expression is a postfix program of small nodes that the server
//! evaluates against each record before returning it. This module provides:
//! - The closed catalog of node variants and their checked factories
//! - An append-only program container
//! - The size pass and the big-endian TLV encoder
//! - An opt-in validator that simulates the program's stack effects
//!
//! The client never evaluates programs itself; it only builds and encodes them.

pub mod error;
pub mod limits;
pub mod list;
pub mod node;
pub mod opcode;
pub mod token;
pub mod validator;

#[cfg(test)]
mod eval;

pub use error::{ConstructionError, PredExpError, PredExpResult, ValidationError};
pub use limits::{Limits, DEFAULT_MAX_PROGRAM_SIZE, MAX_NAME_LEN};
pub use list::{PredExpList, ProgramSize};
pub use node::{regex_flags, Payload, PredExp};
pub use opcode::{Category, Opcode};
pub use validator::{validate_program, Validator};
