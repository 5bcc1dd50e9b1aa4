use std::str::FromStr;

use pippin_emulator::constants::Word;
use pippin_emulator::literal::{parse_word, LiteralError};

/// A number typed in hexadecimal, the same way numbers are written in source
/// programs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexWord(pub Word);

impl FromStr for HexWord {
    type Err = LiteralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_word(s).map(HexWord)
    }
}
