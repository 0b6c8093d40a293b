//! Parse memory ranges given on the command line.
//!
//! A range is either `start..end` (end excluded) or `start+length`. Numbers are decimal, or
//! hexadecimal, octal and binary when prefixed by `0x`, `0o` and `0b`.

use std::ops::Range;
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while1},
    character::complete::{char, space0},
    combinator::{all_consuming, map, map_res},
    error::{convert_error, VerboseError},
    sequence::{delimited, preceded, separated_pair},
    Finish, IResult,
};
use thiserror::Error;

type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRange(pub Range<usize>);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseRangeError {
    #[error("could not parse memory range: {0}")]
    Syntax(String),

    #[error("range end {end:#x} is before its start {start:#x}")]
    Reversed { start: usize, end: usize },
}

impl FromStr for MemoryRange {
    type Err = ParseRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (_, range) = all_consuming(delimited(space0, parse_range, space0))(s)
            .finish()
            .map_err(|e| ParseRangeError::Syntax(convert_error(s, e)))?;

        if range.end < range.start {
            return Err(ParseRangeError::Reversed {
                start: range.start,
                end: range.end,
            });
        }

        Ok(Self(range))
    }
}

fn is_hex_digit(c: char) -> bool {
    c.is_ascii_hexdigit()
}

fn is_oct_digit(c: char) -> bool {
    c.is_digit(8)
}

fn is_bin_digit(c: char) -> bool {
    c.is_digit(2)
}

/// A number in the given base, after a prefix
fn prefixed(
    prefix: &'static str,
    base: u32,
    digit: fn(char) -> bool,
) -> impl FnMut(&str) -> Res<usize> {
    move |input| {
        map_res(preceded(tag_no_case(prefix), take_while1(digit)), |digits| {
            usize::from_str_radix(digits, base)
        })(input)
    }
}

/// Parse a number literal
fn parse_number(input: &str) -> Res<usize> {
    alt((
        prefixed("0x", 16, is_hex_digit),
        prefixed("0o", 8, is_oct_digit),
        prefixed("0b", 2, is_bin_digit),
        map_res(take_while1(|c: char| c.is_ascii_digit()), usize::from_str),
    ))(input)
}

fn parse_range(input: &str) -> Res<Range<usize>> {
    alt((
        map(
            separated_pair(parse_number, tag(".."), parse_number),
            |(start, end)| start..end,
        ),
        map(
            separated_pair(parse_number, char('+'), parse_number),
            |(start, length)| start..start.saturating_add(length),
        ),
    ))(input)
}
