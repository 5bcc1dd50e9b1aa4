//! Parse and print hexadecimal word literals.
//!
//! Both the source and the executable formats write numbers in base 16, with an
//! optional sign and no radix prefix (`1f`, `-2A`, `+7`).

use nom::{
    character::complete::{hex_digit1, one_of},
    combinator::{all_consuming, map_res, opt, recognize},
    sequence::pair,
    Finish, IResult,
};
use thiserror::Error;

use crate::constants::Word;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{literal:?} is not a hexadecimal number")]
pub struct LiteralError {
    literal: String,
}

/// Parse a signed hexadecimal literal, stopping at the first non-digit
pub(crate) fn parse_hex_word(input: &str) -> IResult<&str, Word> {
    map_res(recognize(pair(opt(one_of("+-")), hex_digit1)), |s: &str| {
        Word::from_str_radix(s, 16)
    })(input)
}

/// Parse a whole token as a hexadecimal word
///
/// # Errors
///
/// Fails if the token has anything other than an optional sign followed by hex
/// digits, or if the value does not fit in a word.
pub fn parse_word(token: &str) -> Result<Word, LiteralError> {
    all_consuming(parse_hex_word)(token)
        .finish()
        .map(|(_, word)| word)
        .map_err(|_: nom::error::Error<&str>| LiteralError {
            literal: token.to_owned(),
        })
}

/// Displays a word the way executables store it: lowercase hexadecimal, with a
/// leading `-` for negative values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hex(pub Word);

impl std::fmt::Display for Hex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 < 0 {
            write!(f, "-{:x}", self.0.unsigned_abs())
        } else {
            write!(f, "{:x}", self.0)
        }
    }
}
