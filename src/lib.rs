pub mod partition;
pub mod predexp;

pub use partition::{Digest, PartitionFilter};
pub use predexp::{
    regex_flags, validate_program, ConstructionError, Limits, Opcode, PredExp, PredExpError,
    PredExpList, PredExpResult, ProgramSize, ValidationError, Validator,
};
