use parse_display::{Display, FromStr};
use thiserror::Error;
use tracing::debug;

use super::{Exception, Machine, Status};
use crate::constants::{Address, Word};

/// Operations of the machine, numbered by their opcode
///
/// Most operations come in up to three addressing modes. The immediate form
/// (`LODI`, `ADDI`, …) uses its argument as the operand, the direct form
/// (`LOD`, `ADD`, …) reads the operand from the data cell at the argument,
/// and the indirect form (`LODN`, `ADDN`, …) reads the address of the operand
/// from that cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromStr)]
#[display(style = "UPPERCASE")]
#[repr(i32)]
pub enum Opcode {
    /// No-op
    Nop = 0x00,

    /// Load a value in the accumulator
    Lodi = 0x01,
    Lod = 0x02,
    Lodn = 0x03,

    /// Store the accumulator in memory
    Sto = 0x04,
    Ston = 0x05,

    /// Unconditional jump
    Jmpi = 0x06,
    Jump = 0x07,

    /// Jump if the accumulator is zero
    Jmzi = 0x08,
    Jmpz = 0x09,

    /// Add a value to the accumulator
    Addi = 0x0A,
    Add = 0x0B,
    Addn = 0x0C,

    /// Substract a value from the accumulator
    Subi = 0x0D,
    Sub = 0x0E,
    Subn = 0x0F,

    /// Multiply the accumulator by a value
    Muli = 0x10,
    Mul = 0x11,
    Muln = 0x12,

    /// Divide the accumulator by a value
    Divi = 0x13,
    Div = 0x14,
    Divn = 0x15,

    /// Logical `and` of the accumulator with a value
    Andi = 0x16,
    And = 0x17,

    /// Logical negation of the accumulator
    Not = 0x18,

    /// Check if a data cell is negative
    Cmpl = 0x19,

    /// Check if a data cell is zero
    Cmpz = 0x1A,

    /// Move a block of data memory
    Copy = 0x1D,
    Cpyn = 0x1E,

    /// Stop the machine
    Halt = 0x1F,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no instruction has opcode {0:#x}")]
pub struct InvalidOpcode(pub Word);

impl Opcode {
    pub const ALL: [Opcode; 30] = [
        Self::Nop,
        Self::Lodi,
        Self::Lod,
        Self::Lodn,
        Self::Sto,
        Self::Ston,
        Self::Jmpi,
        Self::Jump,
        Self::Jmzi,
        Self::Jmpz,
        Self::Addi,
        Self::Add,
        Self::Addn,
        Self::Subi,
        Self::Sub,
        Self::Subn,
        Self::Muli,
        Self::Mul,
        Self::Muln,
        Self::Divi,
        Self::Div,
        Self::Divn,
        Self::Andi,
        Self::And,
        Self::Not,
        Self::Cmpl,
        Self::Cmpz,
        Self::Copy,
        Self::Cpyn,
        Self::Halt,
    ];

    /// Numeric value of the opcode
    #[must_use]
    pub const fn code(self) -> Word {
        self as Word
    }

    /// Checks if the mnemonic is written with an argument in source programs
    #[must_use]
    pub const fn takes_argument(self) -> bool {
        !matches!(self, Self::Halt | Self::Nop | Self::Not)
    }
}

impl TryFrom<Word> for Opcode {
    type Error = InvalidOpcode;

    fn try_from(code: Word) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|opcode| opcode.code() == code)
            .ok_or(InvalidOpcode(code))
    }
}

/// Behaviour of one opcode, applied to the instruction argument
pub(crate) type Handler = fn(&mut Machine, Word) -> Result<Status, Exception>;

const TABLE_SIZE: usize = 0x20;

/// Operations indexed by opcode. Direct and indirect forms resolve one level of
/// memory and hand over to the simpler form through the table.
const ENTRIES: [(Opcode, Handler); 30] = [
    (Opcode::Nop, nop),
    (Opcode::Lodi, lodi),
    (Opcode::Lod, |m, arg| m.dereference(arg, Opcode::Lodi)),
    (Opcode::Lodn, |m, arg| m.dereference(arg, Opcode::Lod)),
    (Opcode::Sto, sto),
    (Opcode::Ston, |m, arg| m.dereference(arg, Opcode::Sto)),
    (Opcode::Jmpi, jmpi),
    (Opcode::Jump, |m, arg| m.dereference(arg, Opcode::Jmpi)),
    (Opcode::Jmzi, jmzi),
    (Opcode::Jmpz, |m, arg| m.dereference(arg, Opcode::Jmzi)),
    (Opcode::Addi, addi),
    (Opcode::Add, |m, arg| m.dereference(arg, Opcode::Addi)),
    (Opcode::Addn, |m, arg| m.dereference(arg, Opcode::Add)),
    (Opcode::Subi, subi),
    (Opcode::Sub, |m, arg| m.dereference(arg, Opcode::Subi)),
    (Opcode::Subn, |m, arg| m.dereference(arg, Opcode::Sub)),
    (Opcode::Muli, muli),
    (Opcode::Mul, |m, arg| m.dereference(arg, Opcode::Muli)),
    (Opcode::Muln, |m, arg| m.dereference(arg, Opcode::Mul)),
    (Opcode::Divi, divi),
    (Opcode::Div, |m, arg| m.dereference(arg, Opcode::Divi)),
    (Opcode::Divn, |m, arg| m.dereference(arg, Opcode::Div)),
    (Opcode::Andi, andi),
    (Opcode::And, |m, arg| m.dereference(arg, Opcode::Andi)),
    (Opcode::Not, not),
    (Opcode::Cmpl, cmpl),
    (Opcode::Cmpz, cmpz),
    (Opcode::Copy, copy),
    (Opcode::Cpyn, |m, arg| m.dereference(arg, Opcode::Copy)),
    (Opcode::Halt, halt),
];

/// Maps opcodes to their behaviour. Built once per machine.
#[derive(Clone, Copy)]
pub(crate) struct InstructionTable {
    entries: [Option<Handler>; TABLE_SIZE],
}

impl InstructionTable {
    pub(crate) fn new() -> Self {
        let mut entries: [Option<Handler>; TABLE_SIZE] = [None; TABLE_SIZE];
        for (opcode, handler) in ENTRIES {
            // Every opcode is below TABLE_SIZE
            if let Some(entry) = usize::try_from(opcode.code())
                .ok()
                .and_then(|index| entries.get_mut(index))
            {
                *entry = Some(handler);
            }
        }

        Self { entries }
    }

    /// Find the operation for a raw opcode, if there is one
    pub(crate) fn get(&self, opcode: Word) -> Option<Handler> {
        usize::try_from(opcode)
            .ok()
            .and_then(|index| self.entries.get(index))
            .copied()
            .flatten()
    }
}

impl std::fmt::Debug for InstructionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.iter().flatten().count();
        write!(f, "InstructionTable {{ {count} instructions }}")
    }
}

fn nop(machine: &mut Machine, _: Word) -> Result<Status, Exception> {
    Ok(machine.advance())
}

fn lodi(machine: &mut Machine, arg: Word) -> Result<Status, Exception> {
    machine.registers.accumulator = arg;
    Ok(machine.advance())
}

fn sto(machine: &mut Machine, arg: Address) -> Result<Status, Exception> {
    machine.memory.set(arg, machine.registers.accumulator)?;
    Ok(machine.advance())
}

fn jmpi(machine: &mut Machine, arg: Address) -> Result<Status, Exception> {
    debug!("Jumping to {}", arg);
    machine.registers.pc = arg;
    Ok(Status::Running)
}

fn jmzi(machine: &mut Machine, arg: Address) -> Result<Status, Exception> {
    if machine.registers.accumulator == 0 {
        jmpi(machine, arg)
    } else {
        Ok(machine.advance())
    }
}

fn addi(machine: &mut Machine, arg: Word) -> Result<Status, Exception> {
    let acc = machine.registers.accumulator;
    let res = acc.wrapping_add(arg);
    debug!("{} + {} = {}", acc, arg, res);
    machine.registers.accumulator = res;
    Ok(machine.advance())
}

fn subi(machine: &mut Machine, arg: Word) -> Result<Status, Exception> {
    let acc = machine.registers.accumulator;
    let res = acc.wrapping_sub(arg);
    debug!("{} - {} = {}", acc, arg, res);
    machine.registers.accumulator = res;
    Ok(machine.advance())
}

fn muli(machine: &mut Machine, arg: Word) -> Result<Status, Exception> {
    let acc = machine.registers.accumulator;
    let res = acc.wrapping_mul(arg);
    debug!("{} * {} = {}", acc, arg, res);
    machine.registers.accumulator = res;
    Ok(machine.advance())
}

fn divi(machine: &mut Machine, arg: Word) -> Result<Status, Exception> {
    if arg == 0 {
        return Err(Exception::DivByZero);
    }

    let acc = machine.registers.accumulator;
    let res = acc.wrapping_div(arg);
    debug!("{} / {} = {}", acc, arg, res);
    machine.registers.accumulator = res;
    Ok(machine.advance())
}

fn andi(machine: &mut Machine, arg: Word) -> Result<Status, Exception> {
    let acc = machine.registers.accumulator;
    machine.registers.accumulator = Word::from(arg != 0 && acc != 0);
    Ok(machine.advance())
}

fn not(machine: &mut Machine, _: Word) -> Result<Status, Exception> {
    let acc = machine.registers.accumulator;
    machine.registers.accumulator = Word::from(acc == 0);
    Ok(machine.advance())
}

fn cmpl(machine: &mut Machine, arg: Address) -> Result<Status, Exception> {
    let value = machine.memory.get(arg)?;
    machine.registers.accumulator = Word::from(value < 0);
    Ok(machine.advance())
}

fn cmpz(machine: &mut Machine, arg: Address) -> Result<Status, Exception> {
    let value = machine.memory.get(arg)?;
    machine.registers.accumulator = Word::from(value == 0);
    Ok(machine.advance())
}

fn copy(machine: &mut Machine, arg: Address) -> Result<Status, Exception> {
    machine.copy(arg)?;
    Ok(machine.advance())
}

fn halt(_: &mut Machine, _: Word) -> Result<Status, Exception> {
    Ok(Status::Halted)
}
