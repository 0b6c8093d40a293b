use parse_display::Display;

use crate::constants::{self as C, Address};

/// Interrupts with a well-known meaning.
///
/// The `int` instruction can dispatch any identifier, these are the ones the hardware
/// raises by itself.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
#[display(style = "snake_case")]
pub enum Interrupt {
    AccOverflow,
    StackOverflow,
    IoError,
    Keyboard,
}

impl Interrupt {
    /// Identifier of the interrupt. `0` is reserved and never dispatched by the hardware.
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Interrupt::AccOverflow => 1,
            Interrupt::StackOverflow => 2,
            Interrupt::IoError => 3,
            Interrupt::Keyboard => 4,
        }
    }
}

/// Address of the vector table slot holding the handler of an interrupt.
///
/// Returns `None` when the slot would not fit in the vector table.
#[must_use]
pub fn vector_slot(id: u8) -> Option<Address> {
    let slot = C::VECTOR_TABLE.start + Address::from(id) * 2;
    (slot + 1 < C::VECTOR_TABLE.end).then_some(slot)
}
