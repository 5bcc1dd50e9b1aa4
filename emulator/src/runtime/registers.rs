use crate::constants::{Address, Word};

/// The register file: one accumulator and the program counter
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    /// General purpose
    pub accumulator: Word,

    /// Index of the next instruction in the code store
    pub pc: Address,
}

impl std::fmt::Display for Registers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "acc = {} | pc = {}", self.accumulator, self.pc)
    }
}
