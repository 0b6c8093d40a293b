use std::ops::Range;

pub type Address = u16;
pub type Word = u8;

/// Total size of the computer memory
pub const MEMORY_LENGTH: usize = 0x1_0000;

/// Number of general purpose registers
pub const REGISTER_COUNT: usize = 16;

/// Interrupt vector table, two bytes per interrupt identifier
pub const VECTOR_TABLE: Range<Address> = 0x0000..0x0100;

/// Parameter block shared between the kernel and loaded programs
pub const PARAMETER_BLOCK: Range<Address> = 0x0100..0x0104;

/// First cell of the stack. The stack grows upwards until [`KERNEL_ORIGIN`].
pub const STACK_BASE: Address = 0x0104;

/// Where the kernel ROM is loaded and where execution starts
pub const KERNEL_ORIGIN: Address = 0x0200;

/// Text buffer read by display front-ends
pub const VIDEO_MEMORY: Range<Address> = 0xF000..0xF400;

/// Number of text columns shown by display front-ends
pub const SCREEN_COLUMNS: usize = 40;

/// Number of text rows shown by display front-ends
pub const SCREEN_ROWS: usize = 25;

/// Keyboard input buffer, right after the video memory
pub const KEYBOARD_BUFFER: Range<Address> = 0xF400..0xF410;

/// Name of the ROM loaded at boot
pub const KERNEL_IMAGE: &str = "kernal.rom";
