//! Translate Pippin source programs into executables
//!
//! A source program is a list of `MNEMONIC [ARGUMENT]` lines, closed by an
//! `ENDCODE` line, followed by `ADDRESS VALUE` data lines. All numbers are
//! written in hexadecimal. The executable has one `OPCODE ARGUMENT` line per
//! instruction, a `-1` line, then the data lines unchanged.
//!
//! The source is checked in several passes (line layout, section split, code
//! lines, data lines), and the first error found is reported. The error is not
//! necessarily the first one a reader would spot on the page.

use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::constants::{CODE_MAX, DATA_SIZE, END_OF_CODE, EXECUTABLE_SENTINEL};
use crate::literal::{parse_word, Hex, LiteralError};
use crate::runtime::Opcode;

#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
#[error("error on line {line}: {kind}")]
#[diagnostic(forward(kind))]
pub struct AssemblyError {
    /// 1-based line of the source the error is reported on
    pub line: usize,
    pub kind: AssemblyErrorKind,
}

#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum AssemblyErrorKind {
    #[error("illegal blank line in the source file")]
    #[diagnostic(
        code(pippin::asm::blank_line),
        help("a program can only have one blank line")
    )]
    IllegalBlankLine,

    #[error("line starts with illegal white space")]
    #[diagnostic(code(pippin::asm::leading_whitespace))]
    LeadingWhitespace,

    #[error("\"ENDCODE\" must be upper case")]
    #[diagnostic(code(pippin::asm::endcode_case))]
    EndOfCodeCase,

    #[error("illegal mnemonic {0:?}")]
    #[diagnostic(code(pippin::asm::illegal_mnemonic))]
    IllegalMnemonic(String),

    #[error("mnemonic must be upper case")]
    #[diagnostic(
        code(pippin::asm::mnemonic_case),
        help("mnemonics are written in upper case")
    )]
    MnemonicCase(Opcode),

    #[error("this mnemonic cannot take arguments")]
    #[diagnostic(code(pippin::asm::unexpected_argument))]
    UnexpectedArgument,

    #[error("this mnemonic has too many arguments")]
    #[diagnostic(code(pippin::asm::too_many_arguments))]
    TooManyArguments,

    #[error("this mnemonic is missing arguments")]
    #[diagnostic(code(pippin::asm::missing_argument))]
    MissingArgument,

    #[error("argument is not a hex number")]
    #[diagnostic(
        code(pippin::asm::invalid_argument),
        help("numbers are written in base 16, without prefix")
    )]
    InvalidArgument(#[source] LiteralError),

    #[error("program has more than {CODE_MAX} instructions")]
    #[diagnostic(code(pippin::asm::code_too_long))]
    CodeTooLong,

    #[error("this data is missing arguments")]
    #[diagnostic(
        code(pippin::asm::data_arguments),
        help("data lines hold an address and a value")
    )]
    DataArguments,

    #[error("data integer(s) is not a hex number")]
    #[diagnostic(
        code(pippin::asm::invalid_data),
        help("numbers are written in base 16, without prefix")
    )]
    InvalidData(#[source] LiteralError),

    #[error("data address {0} is out of memory")]
    #[diagnostic(
        code(pippin::asm::data_address),
        help("data addresses go from 0 to 1ff")
    )]
    DataAddress(Hex),
}

impl AssemblyErrorKind {
    fn at(self, line: usize) -> AssemblyError {
        AssemblyError { line, kind: self }
    }
}

/// Trimmed, non-blank source lines, split around the `ENDCODE` marker
#[derive(Debug, Default, PartialEq)]
struct Sections<'a> {
    code: Vec<&'a str>,
    data: Vec<&'a str>,
}

/// Check the layout of every line and keep the trimmed non-blank ones
fn significant_lines(source: &str) -> Result<Vec<&str>, AssemblyError> {
    let mut blank_found = false;
    let mut lines = Vec::new();

    for (index, line) in source.lines().enumerate() {
        let number = index + 1;
        if line.trim().is_empty() {
            if blank_found {
                return Err(AssemblyErrorKind::IllegalBlankLine.at(number));
            }
            blank_found = true;
        } else if line.starts_with([' ', '\t']) {
            return Err(AssemblyErrorKind::LeadingWhitespace.at(number));
        } else {
            lines.push(line.trim());
        }
    }

    Ok(lines)
}

fn split_sections<'a>(lines: &[&'a str]) -> Result<Sections<'a>, AssemblyError> {
    let mut sections = Sections::default();
    let mut reading_code = true;

    for (index, &line) in lines.iter().enumerate() {
        if !reading_code {
            sections.data.push(line);
        } else if line == END_OF_CODE {
            reading_code = false;
        } else if line.eq_ignore_ascii_case(END_OF_CODE) {
            return Err(AssemblyErrorKind::EndOfCodeCase.at(index + 1));
        } else {
            sections.code.push(line);
        }
    }

    Ok(sections)
}

/// Encode an instruction line
fn encode_instruction(line: &str) -> Result<String, AssemblyErrorKind> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let (mnemonic, arguments) = match tokens.split_first() {
        Some((mnemonic, arguments)) => (*mnemonic, arguments),
        None => return Err(AssemblyErrorKind::IllegalMnemonic(String::new())),
    };

    let upper = mnemonic.to_uppercase();
    let opcode: Opcode = upper
        .parse()
        .map_err(|_| AssemblyErrorKind::IllegalMnemonic(mnemonic.to_owned()))?;

    if mnemonic != upper {
        return Err(AssemblyErrorKind::MnemonicCase(opcode));
    }

    let argument = if opcode.takes_argument() {
        match arguments {
            [] => return Err(AssemblyErrorKind::MissingArgument),
            [argument] => parse_word(argument).map_err(AssemblyErrorKind::InvalidArgument)?,
            _ => return Err(AssemblyErrorKind::TooManyArguments),
        }
    } else if arguments.is_empty() {
        0
    } else {
        return Err(AssemblyErrorKind::UnexpectedArgument);
    };

    Ok(format!("{} {}", Hex(opcode.code()), Hex(argument)))
}

/// Encode a data line
fn encode_data(line: &str) -> Result<String, AssemblyErrorKind> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [address, value] = tokens.as_slice() else {
        return Err(AssemblyErrorKind::DataArguments);
    };

    let address = parse_word(address).map_err(AssemblyErrorKind::InvalidData)?;
    let value = parse_word(value).map_err(AssemblyErrorKind::InvalidData)?;
    if !usize::try_from(address).is_ok_and(|index| index < DATA_SIZE) {
        return Err(AssemblyErrorKind::DataAddress(Hex(address)));
    }
    Ok(format!("{} {}", Hex(address), Hex(value)))
}

/// Assemble a source program into the text of an executable
///
/// # Errors
///
/// Returns the first error found, with the line it is reported on.
#[tracing::instrument(skip(source), err)]
pub fn assemble(source: &str) -> Result<String, AssemblyError> {
    let lines = significant_lines(source)?;
    let sections = split_sections(&lines)?;
    debug!(
        code = sections.code.len(),
        data = sections.data.len(),
        "Split source program"
    );

    let code = sections
        .code
        .iter()
        .enumerate()
        .map(|(index, line)| {
            if index < CODE_MAX {
                encode_instruction(line).map_err(|kind| kind.at(index + 1))
            } else {
                Err(AssemblyErrorKind::CodeTooLong.at(index + 1))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Data lines are numbered after the code lines and the ENDCODE line
    let data = sections
        .data
        .iter()
        .enumerate()
        .map(|(index, line)| encode_data(line).map_err(|kind| kind.at(code.len() + index + 2)))
        .collect::<Result<Vec<_>, _>>()?;

    let sentinel = EXECUTABLE_SENTINEL.to_string();
    let mut executable = String::new();
    for line in code.iter().chain([&sentinel]).chain(&data) {
        executable.push_str(line);
        executable.push('\n');
    }

    Ok(executable)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;

    fn error(source: &str) -> (usize, AssemblyErrorKind) {
        let err = assemble(source).unwrap_err();
        (err.line, err.kind)
    }

    #[test]
    fn simple_program_test() {
        let source = indoc! {"
            LODI 5
            STO 0
            HALT
            ENDCODE
        "};

        assert_eq!(assemble(source).unwrap(), "1 5\n4 0\n1f 0\n-1\n");
    }

    #[test]
    fn program_with_data_test() {
        let source = indoc! {"
            LOD 0
            MULI -1
            ADDN a
            CPYN 1F
            NOT
            NOP
            HALT
            ENDCODE
            0 -2a
            A +B
        "};

        insta::assert_snapshot!(assemble(source).unwrap().trim_end(), @r###"
        2 0
        10 -1
        c a
        1e 1f
        18 0
        0 0
        1f 0
        -1
        0 -2a
        a b
        "###);
    }

    #[test]
    fn every_mnemonic_test() {
        let source: String = Opcode::ALL
            .into_iter()
            .map(|opcode| {
                if opcode.takes_argument() {
                    format!("{opcode} 1\n")
                } else {
                    format!("{opcode}\n")
                }
            })
            .collect();

        let executable = assemble(&source).unwrap();
        let opcodes: Vec<&str> = executable
            .lines()
            .take_while(|line| *line != "-1")
            .filter_map(|line| line.split_whitespace().next())
            .collect();

        assert_eq!(
            opcodes,
            vec![
                "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "a", "b", "c", "d", "e", "f",
                "10", "11", "12", "13", "14", "15", "16", "17", "18", "19", "1a", "1d", "1e", "1f"
            ]
        );
    }

    #[test]
    fn single_blank_line_test() {
        let source = "LODI 1\n\nHALT\nENDCODE\n";
        assert_eq!(assemble(source).unwrap(), "1 1\n1f 0\n-1\n");
    }

    #[test]
    fn second_blank_line_test() {
        let source = "LODI 1\n\nHALT\n   \nENDCODE\n";
        assert_eq!(error(source), (4, AssemblyErrorKind::IllegalBlankLine));

        let source = "\nLODI 1\nHALT\nENDCODE\n\n";
        assert_eq!(error(source), (5, AssemblyErrorKind::IllegalBlankLine));
    }

    #[test]
    fn leading_whitespace_test() {
        assert_eq!(
            error("LODI 1\n HALT\nENDCODE\n"),
            (2, AssemblyErrorKind::LeadingWhitespace)
        );
        assert_eq!(
            error("LODI 1\nHALT\nENDCODE\n\t0 1\n"),
            (4, AssemblyErrorKind::LeadingWhitespace)
        );
    }

    #[test]
    fn layout_is_checked_first_test() {
        // The unknown mnemonic comes first but layout errors win
        let source = "FOO\nHALT\n HALT\n";
        assert_eq!(error(source), (3, AssemblyErrorKind::LeadingWhitespace));
    }

    #[test]
    fn endcode_case_test() {
        let source = "HALT\nEndCode\n0 1\n";
        assert_eq!(error(source), (2, AssemblyErrorKind::EndOfCodeCase));
    }

    #[test]
    fn mnemonic_errors_test() {
        assert_eq!(
            error("LODI 1\nFOO 2\nENDCODE\n"),
            (2, AssemblyErrorKind::IllegalMnemonic("FOO".into()))
        );
        assert_eq!(
            error("lodi 1\nENDCODE\n"),
            (1, AssemblyErrorKind::MnemonicCase(Opcode::Lodi))
        );
        assert_eq!(
            error("Halt\nENDCODE\n"),
            (1, AssemblyErrorKind::MnemonicCase(Opcode::Halt))
        );
    }

    #[test]
    fn argument_count_test() {
        assert_eq!(
            error("NOP\nHALT 0\nENDCODE\n"),
            (2, AssemblyErrorKind::UnexpectedArgument)
        );
        assert_eq!(
            error("NOP\nNOT\nLODI\nENDCODE\n"),
            (3, AssemblyErrorKind::MissingArgument)
        );
        assert_eq!(
            error("NOP\nSTO 1 2\nENDCODE\n"),
            (2, AssemblyErrorKind::TooManyArguments)
        );
        assert_eq!(
            error("NOP\nSTO 1 2 3\nENDCODE\n"),
            (2, AssemblyErrorKind::TooManyArguments)
        );
    }

    #[test]
    fn invalid_argument_test() {
        let (line, kind) = error("ADDI 0x10\nENDCODE\n");
        assert_eq!(line, 1);
        assert!(matches!(kind, AssemblyErrorKind::InvalidArgument(_)));

        let (line, kind) = error("ADDI 100000000\nENDCODE\n");
        assert_eq!(line, 1);
        assert!(matches!(kind, AssemblyErrorKind::InvalidArgument(_)));
    }

    #[test]
    fn data_errors_test() {
        let source = indoc! {"
            LODI 1
            HALT
            ENDCODE
            0 1
            1
        "};
        assert_eq!(error(source), (5, AssemblyErrorKind::DataArguments));

        let source = indoc! {"
            HALT
            ENDCODE
            0 1 2
        "};
        assert_eq!(error(source), (3, AssemblyErrorKind::DataArguments));

        let (line, kind) = error("HALT\nENDCODE\n0 1\n1 z\n");
        assert_eq!(line, 4);
        assert!(matches!(kind, AssemblyErrorKind::InvalidData(_)));
    }

    #[test]
    fn data_address_test() {
        let source = "HALT\nENDCODE\n1ff 1\n200 1\n";
        assert_eq!(error(source), (4, AssemblyErrorKind::DataAddress(Hex(0x200))));

        let source = "HALT\nENDCODE\n-1 1\n";
        assert_eq!(error(source), (3, AssemblyErrorKind::DataAddress(Hex(-1))));

        let err = assemble("HALT\nENDCODE\n200 1\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "error on line 3: data address 200 is out of memory"
        );
    }

    #[test]
    fn code_too_long_test() {
        let source = "NOP\n".repeat(CODE_MAX);
        assert!(assemble(&source).is_ok());

        // Errors before the limit are still reported first
        let source = format!("{}LODI\n{}", "NOP\n".repeat(10), "NOP\n".repeat(CODE_MAX));
        assert_eq!(error(&source), (11, AssemblyErrorKind::MissingArgument));

        let source = format!("{}ENDCODE\n0 1\n", "NOP\n".repeat(CODE_MAX + 1));
        assert_eq!(error(&source), (CODE_MAX + 1, AssemblyErrorKind::CodeTooLong));
    }

    #[test]
    fn code_errors_before_data_errors_test() {
        let source = "HALT\nLODI\nENDCODE\nxyz\n";
        assert_eq!(error(source), (2, AssemblyErrorKind::MissingArgument));
    }

    #[test]
    fn without_endcode_test() {
        assert_eq!(assemble("NOP\nHALT\n").unwrap(), "0 0\n1f 0\n-1\n");
        assert_eq!(assemble("").unwrap(), "-1\n");
    }

    #[test]
    fn error_message_test() {
        let err = assemble("HALT\nNOT 1\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "error on line 2: this mnemonic cannot take arguments"
        );
    }
}
