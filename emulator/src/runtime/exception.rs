use thiserror::Error;

use super::code::CodeError;
use super::memory::MemoryError;
use super::range::Range;
use crate::constants::{Address, Word};

/// Reasons for a `COPY` instruction to be refused
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyError {
    #[error("negative copy length {0}")]
    NegativeLength(Word),

    #[error("copying {source_range} to {target_range} would overwrite its descriptor at {descriptor}")]
    CorruptsDescriptor {
        descriptor: Address,
        source_range: Range,
        target_range: Range,
    },

    #[error("copying {source_range} to {target_range} goes outside of data memory")]
    OutOfBounds {
        source_range: Range,
        target_range: Range,
    },
}

/// Faults raised while executing an instruction
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exception {
    #[error("division by zero")]
    DivByZero,

    #[error("invalid instruction {0:#x}")]
    InvalidInstruction(Word),

    #[error("illegal copy: {0}")]
    IllegalCopy(#[from] CopyError),

    #[error("invalid memory access ({0})")]
    InvalidMemoryAccess(#[from] MemoryError),

    #[error("invalid code access ({0})")]
    InvalidCodeAccess(#[from] CodeError),
}
