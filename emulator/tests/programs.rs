use indoc::indoc;
use pretty_assertions::assert_eq;

use pippin_emulator::constants::{Word, CODE_MAX, DATA_SIZE};
use pippin_emulator::literal::Hex;
use pippin_emulator::runtime::{InstructionWord, Opcode};
use pippin_emulator::{assemble, Machine};

fn build(source: &str) -> Machine {
    let executable = assemble(source).unwrap();
    Machine::from_executable(&executable).unwrap()
}

#[test]
fn store_program_test() {
    let mut machine = build(indoc! {"
        LODI 5
        STO 0
        HALT
        ENDCODE
    "});

    assert_eq!(machine.run(), Ok(3));
    assert_eq!(machine.accumulator(), 5);
    assert_eq!(machine.data(0), Ok(5));
    assert_eq!(machine.changed_index(), Some(0));
    assert!(machine.is_halted());
}

#[test]
fn factorial_test() {
    let mut machine = build(indoc! {"
        LOD 0
        JMZI 9
        LOD 1
        MUL 0
        STO 1
        LOD 0
        SUBI 1
        STO 0
        JMPI 0
        HALT
        ENDCODE
        0 5
        1 1
    "});

    assert_eq!(machine.run(), Ok(48));
    assert_eq!(machine.data(0), Ok(0));
    assert_eq!(machine.data(1), Ok(120));
}

#[test]
fn overlapping_copy_test() {
    let mut machine = build(indoc! {"
        COPY 0
        HALT
        ENDCODE
        0 a
        1 d
        2 6
        a 1
        b 2
        c 3
        d 4
        e 5
        f 6
    "});

    let mut expected = vec![0; DATA_SIZE];
    expected[..3].copy_from_slice(&[10, 13, 6]);
    expected[10..16].copy_from_slice(&[1, 2, 3, 4, 5, 6]);
    expected.copy_within(10..16, 13);

    assert_eq!(machine.run(), Ok(2));
    assert_eq!(machine.memory().as_slice(), expected.as_slice());
}

#[test]
fn listing_matches_source_test() {
    let source: Vec<String> = Opcode::ALL
        .into_iter()
        .map(|opcode| {
            if opcode.takes_argument() {
                format!("{opcode} 1")
            } else {
                opcode.to_string()
            }
        })
        .collect();

    let machine = build(&format!("{}\nENDCODE\n", source.join("\n")));
    let listing: Vec<String> = (0..source.len())
        .map(|index| machine.code().text(index))
        .collect();

    assert_eq!(listing, source);
}

#[test]
fn instruction_words_match_source_test() {
    for argument in [1, -1, Word::MIN, Word::MAX] {
        let source: String = Opcode::ALL
            .into_iter()
            .map(|opcode| {
                if opcode.takes_argument() {
                    format!("{opcode} {}\n", Hex(argument))
                } else {
                    format!("{opcode}\n")
                }
            })
            .collect();

        let machine = build(&source);
        let expected: Vec<_> = Opcode::ALL
            .into_iter()
            .map(|opcode| {
                let argument = if opcode.takes_argument() { argument } else { 0 };
                InstructionWord::new(opcode.code(), argument)
            })
            .collect();

        assert_eq!(machine.code().iter().collect::<Vec<_>>(), expected);
    }
}

#[test]
fn assembled_programs_load_test() {
    // Largest program and last data cell
    let code = "NOP\n".repeat(CODE_MAX - 1);
    let source = format!("{code}HALT\nENDCODE\n1ff 7fffffff\n");
    let machine = build(&source);
    assert_eq!(machine.code().len(), CODE_MAX);
    assert_eq!(machine.data(0x1FF), Ok(Word::MAX));

    // Rejected by the assembler rather than the loader
    let source = format!("{}ENDCODE\n", "NOP\n".repeat(CODE_MAX + 1));
    assert_eq!(assemble(&source).unwrap_err().line, CODE_MAX + 1);
    assert!(assemble("HALT\nENDCODE\n200 1\n").is_err());
    assert!(assemble("HALT\nENDCODE\n-1 1\n").is_err());
}
