use thiserror::Error;

use super::instructions::Opcode;
use crate::constants::{Address, Word, CODE_MAX};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CodeError {
    #[error("attempt to access code outside its bounds (index {index}, program size {size})")]
    OutOfBounds { index: Address, size: usize },

    #[error("code store is full ({CODE_MAX} instructions)")]
    Full,
}

/// An opcode and its argument, as stored in the code store
///
/// The opcode is kept as a raw number: it only gets resolved to an operation
/// when executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionWord {
    pub opcode: Word,
    pub argument: Word,
}

impl InstructionWord {
    #[must_use]
    pub const fn new(opcode: Word, argument: Word) -> Self {
        Self { opcode, argument }
    }

    /// Pack the opcode in the high half and the argument in the low half
    fn pack(self) -> i64 {
        (i64::from(self.opcode) << 32) | (i64::from(self.argument) & 0xFFFF_FFFF)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn unpack(word: i64) -> Self {
        Self {
            opcode: (word >> 32) as Word,
            argument: word as Word,
        }
    }
}

impl std::fmt::Display for InstructionWord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match Opcode::try_from(self.opcode) {
            Ok(opcode) if opcode.takes_argument() => write!(f, "{opcode} {}", self.argument),
            Ok(opcode) => write!(f, "{opcode}"),
            Err(_) => write!(f, "??? {:#x} {}", self.opcode, self.argument),
        }
    }
}

/// The program being executed, one packed word per instruction
///
/// Instructions are appended while loading and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct Code {
    words: Vec<i64>,
}

impl Code {
    /// Append an instruction at the end of the program
    ///
    /// # Errors
    ///
    /// It fails if the store already holds [`CODE_MAX`] instructions.
    pub fn push(&mut self, opcode: Word, argument: Word) -> Result<(), CodeError> {
        if self.words.len() >= CODE_MAX {
            return Err(CodeError::Full);
        }

        self.words.push(InstructionWord::new(opcode, argument).pack());
        Ok(())
    }

    /// Get the instruction at a program counter position
    ///
    /// # Errors
    ///
    /// It fails if `index` does not point to an instruction of the program.
    pub fn get(&self, index: Address) -> Result<InstructionWord, CodeError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.words.get(i))
            .map(|&word| InstructionWord::unpack(word))
            .ok_or(CodeError::OutOfBounds {
                index,
                size: self.words.len(),
            })
    }

    /// Number of instructions in the program
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = InstructionWord> + '_ {
        self.words.iter().map(|&word| InstructionWord::unpack(word))
    }

    /// Human readable text of an instruction, or an empty string past the end
    /// of the program
    #[must_use]
    pub fn text(&self, index: usize) -> String {
        self.words
            .get(index)
            .map(|&word| InstructionWord::unpack(word).to_string())
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn packing_test() {
        for (opcode, argument) in [(0x0C, 2015), (0x0C, -2015), (0x1F, 0), (0x01, Word::MIN)] {
            let word = InstructionWord::new(opcode, argument);
            assert_eq!(InstructionWord::unpack(word.pack()), word);
        }

        assert_eq!(InstructionWord::new(0x0C, -1).pack(), 0x0000_000C_FFFF_FFFF);
    }

    #[test]
    fn push_get_test() {
        let mut code = Code::default();
        code.push(0x01, 5).unwrap();
        code.push(0x04, -3).unwrap();

        assert_eq!(code.len(), 2);
        assert_eq!(code.get(0), Ok(InstructionWord::new(0x01, 5)));
        assert_eq!(code.get(1), Ok(InstructionWord::new(0x04, -3)));
        assert_eq!(
            code.get(2),
            Err(CodeError::OutOfBounds { index: 2, size: 2 })
        );
        assert_eq!(
            code.get(-1),
            Err(CodeError::OutOfBounds { index: -1, size: 2 })
        );
    }

    #[test]
    fn full_test() {
        let mut code = Code::default();
        for _ in 0..CODE_MAX {
            code.push(0x00, 0).unwrap();
        }
        assert_eq!(code.push(0x00, 0), Err(CodeError::Full));
        assert_eq!(code.len(), CODE_MAX);
    }

    #[test]
    fn text_test() {
        let mut code = Code::default();
        code.push(0x0C, 2015).unwrap();
        code.push(0x0C, -2015).unwrap();
        code.push(0x1F, 0).unwrap();
        code.push(0x1B, 4).unwrap();

        assert_eq!(code.text(0), "ADDN 2015");
        assert_eq!(code.text(1), "ADDN -2015");
        assert_eq!(code.text(2), "HALT");
        assert_eq!(code.text(3), "??? 0x1b 4");
        assert_eq!(code.text(4), "");
    }

    #[test]
    fn clear_test() {
        let mut code = Code::default();
        code.push(0x01, 1).unwrap();
        code.clear();
        assert!(code.is_empty());
        assert_eq!(code.text(0), "");
    }
}
