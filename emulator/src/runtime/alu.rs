//! Byte arithmetic of the accumulator.
//!
//! Additions and subtractions report an overflow when the mathematical result leaves
//! `0..=255`. The caller decides what to do with the accumulator in that case. Shifts and
//! bitwise operations never overflow.

use crate::constants::Word;

/// `acc + operand`, or `None` if the sum does not fit in a byte
#[must_use]
pub const fn add(acc: Word, operand: Word) -> Option<Word> {
    acc.checked_add(operand)
}

/// `acc - operand`, or `None` if the difference is negative
#[must_use]
pub const fn subtract(acc: Word, operand: Word) -> Option<Word> {
    acc.checked_sub(operand)
}

/// Shift left by one bit, dropping the high bit
#[must_use]
pub const fn shift_left(acc: Word) -> Word {
    acc << 1
}

/// Shift right by one bit, dropping the low bit
#[must_use]
pub const fn shift_right(acc: Word) -> Word {
    acc >> 1
}

#[must_use]
pub const fn and(acc: Word, operand: Word) -> Word {
    acc & operand
}

#[must_use]
pub const fn or(acc: Word, operand: Word) -> Word {
    acc | operand
}

#[must_use]
pub const fn xor(acc: Word, operand: Word) -> Word {
    acc ^ operand
}

#[must_use]
pub const fn not(acc: Word) -> Word {
    !acc
}
