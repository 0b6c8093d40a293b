//! Read-only snapshots of the computer, for front-ends.

use std::ops::Range;

use crate::constants::{self as C, Word};
use crate::runtime::{Memory, Registers};

/// A copy of the registers and memory at some point of the execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub registers: Registers,
    pub memory: Memory,
}

impl Status {
    /// Bytes shown on screen: the video memory, up to the first NUL.
    ///
    /// The last byte of the video memory is never shown, it keeps the text terminated.
    fn screen_bytes(&self) -> &[Word] {
        let start = usize::from(C::VIDEO_MEMORY.start);
        let end = usize::from(C::VIDEO_MEMORY.end) - 1;
        let window = &self.memory.as_slice()[start..end];
        let length = window.iter().position(|&b| b == 0).unwrap_or(window.len());
        &window[..length]
    }

    /// The text in video memory
    #[must_use]
    pub fn screen(&self) -> String {
        String::from_utf8_lossy(self.screen_bytes()).into_owned()
    }

    /// The text in video memory, cut in rows of [`C::SCREEN_COLUMNS`]
    #[must_use]
    pub fn screen_rows(&self) -> Vec<String> {
        self.screen_bytes()
            .chunks(C::SCREEN_COLUMNS)
            .take(C::SCREEN_ROWS)
            .map(|row| String::from_utf8_lossy(row).into_owned())
            .collect()
    }

    /// The parameter block shared with loaded programs
    #[must_use]
    pub fn parameters(&self) -> &[Word] {
        let range = C::PARAMETER_BLOCK;
        &self.memory.as_slice()[usize::from(range.start)..usize::from(range.end)]
    }

    /// A displayable dump of a memory range. The range is clamped to the memory.
    #[must_use]
    pub fn hexdump(&self, range: Range<usize>) -> HexDump<'_> {
        let end = range.end.min(C::MEMORY_LENGTH);
        let start = range.start.min(end);
        HexDump {
            start,
            bytes: &self.memory.as_slice()[start..end],
        }
    }
}

/// Memory bytes, displayed sixteen per row and prefixed with their address
#[derive(Debug, Clone, Copy)]
pub struct HexDump<'a> {
    start: usize,
    bytes: &'a [Word],
}

impl std::fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, row) in self.bytes.chunks(16).enumerate() {
            if index > 0 {
                writeln!(f)?;
            }

            write!(f, "${:04x}:", self.start + index * 16)?;
            for byte in row {
                write!(f, " {byte:02x}")?;
            }
        }

        Ok(())
    }
}
