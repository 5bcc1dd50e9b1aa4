use thiserror::Error;
use tracing::{debug, info, trace};

use crate::constants::{Address, Word, DATA_SIZE};

mod code;
mod exception;
mod instructions;
mod memory;
mod range;
mod registers;

pub use self::code::{Code, CodeError, InstructionWord};
pub use self::exception::{CopyError, Exception};
pub use self::instructions::{InvalidOpcode, Opcode};
pub use self::memory::{Memory, MemoryError};
pub use self::range::Range;
pub use self::registers::Registers;

use self::instructions::InstructionTable;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorError {
    #[error("CPU exception: {0}")]
    Exception(#[from] Exception),

    #[error("machine is halted")]
    Halted,
}

type Result<T> = std::result::Result<T, ProcessorError>;

/// Every valid data address
#[allow(clippy::cast_possible_wrap)]
const ADDRESSES: Range = Range::with_length(0, DATA_SIZE as i64);

/// Outcome of executing an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The machine can execute the next instruction
    Running,

    /// A `HALT` instruction was executed
    Halted,
}

/// The Pippin machine: registers, data memory, code store and the table of
/// operations.
///
/// A machine is built empty, gets a program through the
/// [`loader`](crate::loader), and is then stepped until it halts. Once halted,
/// either by a `HALT` instruction or by a fault, it has to be cleared before
/// running again.
#[derive(Clone)]
pub struct Machine {
    registers: Registers,
    memory: Memory,
    code: Code,
    table: InstructionTable,
    halted: bool,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Machine {{ registers: {:?}, halted: {}, code: [{} instructions], memory: [...] }}",
            self.registers,
            self.halted,
            self.code.len()
        )
    }
}

impl Machine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registers: Registers::default(),
            memory: Memory::default(),
            code: Code::default(),
            table: InstructionTable::new(),
            halted: false,
        }
    }

    /// Reset to the power-on state: zeroed memory and registers, no program
    pub fn clear(&mut self) {
        debug!("Clearing machine");
        self.memory.clear();
        self.code.clear();
        self.registers = Registers::default();
        self.halted = false;
    }

    #[must_use]
    pub fn accumulator(&self) -> Word {
        self.registers.accumulator
    }

    #[must_use]
    pub fn program_counter(&self) -> Address {
        self.registers.pc
    }

    #[must_use]
    pub fn registers(&self) -> Registers {
        self.registers
    }

    /// Read a data cell
    ///
    /// # Errors
    ///
    /// It fails if the address is outside of data memory.
    pub fn data(&self, address: Address) -> std::result::Result<Word, MemoryError> {
        self.memory.get(address)
    }

    /// Write a data cell
    ///
    /// # Errors
    ///
    /// It fails if the address is outside of data memory.
    pub fn set_data(
        &mut self,
        address: Address,
        value: Word,
    ) -> std::result::Result<(), MemoryError> {
        self.memory.set(address, value)
    }

    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Index of the last data cell written
    #[must_use]
    pub fn changed_index(&self) -> Option<usize> {
        self.memory.changed_index()
    }

    #[must_use]
    pub fn code(&self) -> &Code {
        &self.code
    }

    /// Append an instruction to the program
    ///
    /// # Errors
    ///
    /// It fails if the code store is full.
    pub fn push_code(
        &mut self,
        opcode: Word,
        argument: Word,
    ) -> std::result::Result<(), CodeError> {
        self.code.push(opcode, argument)
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Move to the next instruction
    fn advance(&mut self) -> Status {
        self.registers.pc += 1;
        Status::Running
    }

    /// Run an instruction word through the table of operations
    fn dispatch(&mut self, word: InstructionWord) -> std::result::Result<Status, Exception> {
        let handler = self
            .table
            .get(word.opcode)
            .ok_or(Exception::InvalidInstruction(word.opcode))?;
        handler(self, word.argument)
    }

    /// Execute an operation with the given argument
    pub(crate) fn execute(
        &mut self,
        opcode: Opcode,
        argument: Word,
    ) -> std::result::Result<Status, Exception> {
        self.dispatch(InstructionWord::new(opcode.code(), argument))
    }

    /// Execute an operation with the content of the data cell at `address` as
    /// argument
    fn dereference(
        &mut self,
        address: Address,
        opcode: Opcode,
    ) -> std::result::Result<Status, Exception> {
        let value = self.memory.get(address)?;
        trace!(address, value, "Dereferencing");
        self.execute(opcode, value)
    }

    /// Copy a block of data memory, as described by the three cells at
    /// `descriptor`: source address, target address and length.
    ///
    /// Overlapping blocks are handled: the copy goes downward when the target
    /// is after the source, upward otherwise.
    #[tracing::instrument(skip(self), level = "debug")]
    fn copy(&mut self, descriptor: Address) -> std::result::Result<(), Exception> {
        let source = self.memory.get(descriptor)?;
        let target = self.memory.get(descriptor + 1)?;
        let length = self.memory.get(descriptor + 2)?;

        if length < 0 {
            return Err(CopyError::NegativeLength(length).into());
        }

        let source_range = Range::with_length(source.into(), length.into());
        let target_range = Range::with_length(target.into(), length.into());

        let start = i64::from(descriptor);
        if (start..start + 3).any(|cell| source_range.contains(cell) || target_range.contains(cell))
        {
            return Err(CopyError::CorruptsDescriptor {
                descriptor,
                source_range,
                target_range,
            }
            .into());
        }

        if !(ADDRESSES.includes(&source_range) && ADDRESSES.includes(&target_range)) {
            return Err(CopyError::OutOfBounds {
                source_range,
                target_range,
            }
            .into());
        }

        debug!(source, target, length, "Copying block");
        if source < target {
            for offset in (0..length).rev() {
                let value = self.memory.get(source + offset)?;
                self.memory.set(target + offset, value)?;
            }
        } else {
            for offset in 0..length {
                let value = self.memory.get(source + offset)?;
                self.memory.set(target + offset, value)?;
            }
        }

        Ok(())
    }

    /// Execute the instruction at the program counter
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError::Halted`] if the machine was already halted, or
    /// the fault raised by the instruction. In both cases the machine is left
    /// halted.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn step(&mut self) -> Result<Status> {
        if self.halted {
            return Err(ProcessorError::Halted);
        }

        let result = self
            .code
            .get(self.registers.pc)
            .map_err(Exception::from)
            .and_then(|word| {
                debug!(pc = self.registers.pc, "Executing instruction \"{}\"", word);
                self.dispatch(word)
            });

        match result {
            Ok(Status::Running) => {
                trace!(registers = %self.registers, "Register state");
                Ok(Status::Running)
            }
            Ok(Status::Halted) => {
                info!(registers = %self.registers, "Machine halted");
                self.halted = true;
                Ok(Status::Halted)
            }
            Err(exception) => {
                debug!(%exception, pc = self.registers.pc, "Halting on exception");
                self.halted = true;
                Err(exception.into())
            }
        }
    }

    /// Step until a `HALT` instruction, returning the number of instructions
    /// executed
    ///
    /// # Errors
    ///
    /// Stops at the first fault and returns it.
    #[tracing::instrument(skip(self))]
    pub fn run(&mut self) -> Result<usize> {
        let mut steps = 0;
        loop {
            steps += 1;
            if self.step()? == Status::Halted {
                return Ok(steps);
            }
        }
    }

    /// Step until a `HALT` instruction or until `max_steps` instructions were
    /// executed
    ///
    /// # Errors
    ///
    /// Stops at the first fault and returns it.
    #[tracing::instrument(skip(self))]
    pub fn run_for(&mut self, max_steps: usize) -> Result<Status> {
        for _ in 0..max_steps {
            if self.step()? == Status::Halted {
                return Ok(Status::Halted);
            }
        }

        Ok(Status::Running)
    }
}
