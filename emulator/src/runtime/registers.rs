use bitflags::bitflags;
use parse_display::Display;

use super::interrupt::Interrupt;
use crate::constants::{self as C, Word};

bitflags! {
    /// Sticky status flags. They stay set until cleared by a `cfg` instruction.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u8 {
        const ACC_OVERFLOW   = 0b001;
        const STACK_OVERFLOW = 0b010;
        const IO_ERROR       = 0b100;
    }
}

bitflags! {
    /// Execution mode of the processor
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Mode: u8 {
        const HALTED            = 0b001;
        /// Set by `pmd`. Nothing consults it yet.
        const PROTECTED         = 0b010;
        const INTERRUPT_ENABLE  = 0b100;
    }
}

/// A flag as named by the `jfg` and `cfg` instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Flag {
    AccOverflow,
    StackOverflow,
    IoError,
}

impl Flag {
    /// Decode a flag code. Unknown codes have no flag.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::AccOverflow),
            1 => Some(Self::StackOverflow),
            2 => Some(Self::IoError),
            _ => None,
        }
    }

    #[must_use]
    pub const fn bits(self) -> Flags {
        match self {
            Self::AccOverflow => Flags::ACC_OVERFLOW,
            Self::StackOverflow => Flags::STACK_OVERFLOW,
            Self::IoError => Flags::IO_ERROR,
        }
    }

    /// The interrupt dispatched when this flag gets raised
    #[must_use]
    pub const fn interrupt(self) -> Interrupt {
        match self {
            Self::AccOverflow => Interrupt::AccOverflow,
            Self::StackOverflow => Interrupt::StackOverflow,
            Self::IoError => Interrupt::IoError,
        }
    }
}

/// Index of a general purpose register, as encoded in the instruction stream.
///
/// Any byte is a valid encoding: indices past the register file read as zero and ignore
/// writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("r{0}")]
pub struct Reg(pub u8);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    /// General purpose
    pub general: [Word; C::REGISTER_COUNT],

    /// Accumulator, target of every ALU operation
    pub acc: Word,

    /// Program counter, as an index into memory.
    ///
    /// It is wider than an address so that running off the end of memory is detected
    /// instead of wrapping around.
    pub pc: usize,

    /// Stack pointer, address of the next free stack cell
    pub sp: C::Address,

    /// Status flags
    pub flags: Flags,

    /// Execution mode
    pub mode: Mode,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            general: [0; C::REGISTER_COUNT],
            acc: 0,
            pc: usize::from(C::KERNEL_ORIGIN),
            sp: C::STACK_BASE,
            flags: Flags::empty(),
            mode: Mode::empty(),
        }
    }
}

impl Registers {
    #[must_use]
    pub fn get(&self, reg: Reg) -> Word {
        self.general.get(usize::from(reg.0)).copied().unwrap_or(0)
    }

    pub fn set(&mut self, reg: Reg, value: Word) {
        if let Some(cell) = self.general.get_mut(usize::from(reg.0)) {
            *cell = value;
        }
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.mode.contains(Mode::HALTED)
    }

    #[must_use]
    pub fn interrupts_enabled(&self) -> bool {
        self.mode.contains(Mode::INTERRUPT_ENABLE)
    }

    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.mode.contains(Mode::PROTECTED)
    }

    #[must_use]
    pub fn flag(&self, flag: Flag) -> bool {
        self.flags.contains(flag.bits())
    }
}

impl std::fmt::Display for Registers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "acc = {:02x} | pc = {:04x} | sp = {:04x}",
            self.acc, self.pc, self.sp
        )?;
        for (i, value) in self.general.iter().enumerate() {
            write!(f, " | r{i} = {value:02x}")?;
        }
        let mark = |set: bool| if set { '1' } else { '0' };
        write!(
            f,
            " | ovf = {} | sovf = {} | io = {} | pmd = {} | ein = {} | hlt = {}",
            mark(self.flags.contains(Flags::ACC_OVERFLOW)),
            mark(self.flags.contains(Flags::STACK_OVERFLOW)),
            mark(self.flags.contains(Flags::IO_ERROR)),
            mark(self.is_protected()),
            mark(self.interrupts_enabled()),
            mark(self.is_halted()),
        )
    }
}
