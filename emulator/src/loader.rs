//! Load executables into a machine
//!
//! Each line of an executable holds two hexadecimal numbers. Lines before the
//! `-1` sentinel are instructions (opcode and argument) appended to the code
//! store, lines after it are data cells (address and value). Any code line
//! starting with `-1` ends the code, whatever follows it on the line.

use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::constants::{Word, EXECUTABLE_SENTINEL};
use crate::literal::{parse_word, LiteralError};
use crate::runtime::{CodeError, Machine, MemoryError};

#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
#[error("line {line} of the executable: {kind}")]
#[diagnostic(forward(kind))]
pub struct LoadError {
    /// 1-based line of the executable
    pub line: usize,
    pub kind: LoadErrorKind,
}

#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum LoadErrorKind {
    #[error("expected {expected} numbers, found {found}")]
    #[diagnostic(code(pippin::load::token_count))]
    WrongTokenCount { expected: usize, found: usize },

    #[error("invalid number")]
    #[diagnostic(code(pippin::load::invalid_number))]
    InvalidNumber(#[source] LiteralError),

    #[error("could not add instruction")]
    #[diagnostic(code(pippin::load::code_full))]
    CodeFull(#[source] CodeError),

    #[error("could not write data")]
    #[diagnostic(
        code(pippin::load::invalid_address),
        help("data addresses go from 0 to 1ff")
    )]
    InvalidAddress(#[source] MemoryError),
}

fn parse_line(line: &str) -> Result<Vec<Word>, LoadErrorKind> {
    line.split_whitespace()
        .map(|token| parse_word(token).map_err(LoadErrorKind::InvalidNumber))
        .collect()
}

/// Load an executable in a machine
///
/// The machine is not cleared first, and is left as is if an error occurs
/// halfway through.
///
/// # Errors
///
/// Fails on the first malformed line, or if the program does not fit in the
/// machine.
#[tracing::instrument(skip(machine, executable), err)]
pub fn load(machine: &mut Machine, executable: &str) -> Result<(), LoadError> {
    let mut reading_code = true;
    let mut cells = 0;

    for (index, line) in executable.lines().enumerate() {
        let at = |kind: LoadErrorKind| LoadError {
            line: index + 1,
            kind,
        };

        let numbers = parse_line(line).map_err(at)?;
        match (reading_code, numbers.as_slice()) {
            (true, [EXECUTABLE_SENTINEL, ..]) => reading_code = false,
            (true, &[opcode, argument]) => machine
                .push_code(opcode, argument)
                .map_err(|e| at(LoadErrorKind::CodeFull(e)))?,
            (false, &[address, value]) => {
                machine
                    .set_data(address, value)
                    .map_err(|e| at(LoadErrorKind::InvalidAddress(e)))?;
                cells += 1;
            }
            (_, numbers) => {
                return Err(at(LoadErrorKind::WrongTokenCount {
                    expected: 2,
                    found: numbers.len(),
                }))
            }
        }
    }

    debug!(
        instructions = machine.code().len(),
        cells, "Loaded executable"
    );
    Ok(())
}

impl Machine {
    /// Build a machine and load an executable in it
    ///
    /// # Errors
    ///
    /// See [`load`].
    pub fn from_executable(executable: &str) -> Result<Self, LoadError> {
        let mut machine = Self::new();
        load(&mut machine, executable)?;
        Ok(machine)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::constants::CODE_MAX;
    use crate::runtime::InstructionWord;

    #[test]
    fn load_test() {
        let executable = indoc! {"
            1 5
            c -1f
            1f 0
            -1
            0 5
            1ff -80000000
        "};

        let machine = Machine::from_executable(executable).unwrap();
        let code: Vec<_> = machine.code().iter().collect();
        assert_eq!(
            code,
            vec![
                InstructionWord::new(0x01, 5),
                InstructionWord::new(0x0C, -0x1F),
                InstructionWord::new(0x1F, 0),
            ]
        );
        assert_eq!(machine.data(0), Ok(5));
        assert_eq!(machine.data(0x1FF), Ok(Word::MIN));
        assert_eq!(machine.program_counter(), 0);
    }

    #[test]
    fn sentinel_only_in_code_test() {
        // After the sentinel, -1 is read as a data address
        let err = Machine::from_executable("-1\n-1 3\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(
            err.kind,
            LoadErrorKind::InvalidAddress(MemoryError::InvalidAddress(-1))
        );
    }

    #[test]
    fn token_count_test() {
        let err = Machine::from_executable("1 5\n4\n-1\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(
            err.kind,
            LoadErrorKind::WrongTokenCount {
                expected: 2,
                found: 1
            }
        );

        let err = Machine::from_executable("1 5\n-1\n0 1 2\n").unwrap_err();
        assert_eq!(err.line, 3);

        let err = Machine::from_executable("1 5\n\n-1\n").unwrap_err();
        assert_eq!(
            err.kind,
            LoadErrorKind::WrongTokenCount {
                expected: 2,
                found: 0
            }
        );
    }

    #[test]
    fn sentinel_with_extra_numbers_test() {
        let machine = Machine::from_executable("1 5\n-1 0\n0 7\n").unwrap();
        let code: Vec<_> = machine.code().iter().collect();
        assert_eq!(code, vec![InstructionWord::new(0x01, 5)]);
        assert_eq!(machine.data(0), Ok(7));

        let machine = Machine::from_executable("-1 0 0\n1 2\n").unwrap();
        assert!(machine.code().is_empty());
        assert_eq!(machine.data(1), Ok(2));
    }

    #[test]
    fn invalid_number_test() {
        let err = Machine::from_executable("1 5\n4 zz\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(matches!(err.kind, LoadErrorKind::InvalidNumber(_)));
    }

    #[test]
    fn invalid_address_test() {
        let err = Machine::from_executable("-1\n200 1\n").unwrap_err();
        assert_eq!(
            err.kind,
            LoadErrorKind::InvalidAddress(MemoryError::InvalidAddress(0x200))
        );
    }

    #[test]
    fn code_full_test() {
        let executable = "0 0\n".repeat(CODE_MAX + 1);
        let err = Machine::from_executable(&executable).unwrap_err();
        assert_eq!(err.line, CODE_MAX + 1);
        assert_eq!(err.kind, LoadErrorKind::CodeFull(CodeError::Full));
    }

    #[test]
    fn partial_load_test() {
        let mut machine = Machine::new();
        let err = load(&mut machine, "1 5\n4 0\n-1\n3 7\n4 oops\n").unwrap_err();
        assert_eq!(err.line, 5);

        // Nothing is rolled back
        assert_eq!(machine.code().len(), 2);
        assert_eq!(machine.data(3), Ok(7));
    }

    #[test]
    fn load_appends_test() {
        let mut machine = Machine::from_executable("1 1\n-1\n").unwrap();
        load(&mut machine, "1f 0\n-1\n").unwrap();
        assert_eq!(machine.code().len(), 2);

        machine.clear();
        load(&mut machine, "1f 0\n-1\n").unwrap();
        assert_eq!(machine.code().len(), 1);
    }
}
