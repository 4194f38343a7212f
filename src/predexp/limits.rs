//! Protocol limits applied while building and encoding programs.

use serde::{Deserialize, Serialize};

/// Longest bin name the server accepts.
///
/// Iteration variable names are held to the same limit. The server does not
/// impose it on them; this crate does so both kinds of name share one check.
pub const MAX_NAME_LEN: usize = 15;

/// Default budget for one encoded program (1 MiB)
pub const DEFAULT_MAX_PROGRAM_SIZE: u32 = 1024 * 1024;

/// Size of the tag and length header that precedes every node payload
pub const NODE_HEADER_SIZE: usize = 2 + 4;

/// Per-command limits supplied by the command builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum total bytes of an encoded program
    pub max_program_size: u32,
}

impl Limits {
    pub fn new(max_program_size: u32) -> Self {
        Self { max_program_size }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_program_size: DEFAULT_MAX_PROGRAM_SIZE,
        }
    }
}
