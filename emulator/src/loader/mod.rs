//! Load ROM images into memory.
//!
//! A ROM is a stream of sections, each starting with the `FF FE FE FF` header followed by a
//! section kind:
//!
//! ```text
//! rom          := header kind payload
//! kind         := 0x00 (data) | 0x01 (code)
//! data payload := entry* header 0x01 code payload
//! entry        := address kind body
//!                 0x00: end of the data section, no body
//!                 0x01: string, bytes up to a NUL or the end of the stream
//!                 0x02: number, exactly one byte
//!                 any other kind also ends the data section
//! code payload := address byte*
//! ```
//!
//! Addresses are big-endian. Bytes are written to memory as they are read, so a ROM that
//! turns out to be malformed halfway leaves whatever was written before the error.

use miette::Diagnostic;
use thiserror::Error;
use tracing::{debug, trace};

use crate::constants::{Address, Word};
use crate::runtime::Memory;

mod drive;

pub use self::drive::{FileDrive, InMemoryDrive, RomSource};

const HEADER: [Word; 4] = [0xFF, 0xFE, 0xFE, 0xFF];

const DATA_SECTION: Word = 0x00;
const CODE_SECTION: Word = 0x01;

const END_DATA_ENTRY: Word = 0x00;
const STRING_ENTRY: Word = 0x01;
const NUMBER_ENTRY: Word = 0x02;

const END_STRING: Word = 0x00;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("expected header byte {expected:#04x} at offset {offset}, found {found:#04x}")]
    Header {
        offset: usize,
        expected: Word,
        found: Word,
    },

    #[error("unknown section kind {0:#04x}")]
    SectionKind(Word),
}

#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("could not read ROM {name:?}: {source}")]
    #[diagnostic(
        code(tis80::rom::read),
        help("ROM names are resolved relative to the drive root")
    )]
    RomRead {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("bad ROM format: {0}")]
    #[diagnostic(code(tis80::rom::format))]
    RomFormat(#[from] FormatError),
}

/// Summary of a successful load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Number of bytes written to memory, data and code sections together
    pub bytes_written: usize,

    /// Number of bytes written by the code section alone
    pub code_bytes: usize,

    /// Address where the code section starts
    pub code_start: Address,
}

/// Where the loader is in the ROM grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Header,
    SectionKind,
    DataSection,
    CodeHeader,
    CodeSection { start: Address },
}

/// Reads bytes from the ROM source, keeping track of the offset for error reporting
struct Reader<'a> {
    source: &'a mut dyn RomSource,
    offset: usize,
}

impl Reader<'_> {
    fn is_at_end(&self) -> bool {
        self.source.is_at_end()
    }

    fn byte(&mut self) -> Word {
        self.offset += 1;
        self.source.read()
    }

    fn address(&mut self) -> Address {
        let high = self.byte();
        let low = self.byte();
        Address::from_be_bytes([high, low])
    }

    fn expect_header(&mut self) -> Result<(), FormatError> {
        for expected in HEADER {
            let offset = self.offset;
            let found = self.byte();
            if found != expected {
                return Err(FormatError::Header {
                    offset,
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }
}

/// Counts the bytes written to memory
struct Writer<'a> {
    memory: &'a mut Memory,
    written: usize,
}

impl Writer<'_> {
    fn write(&mut self, address: Address, value: Word) {
        self.memory.write(address, value);
        self.written += 1;
    }
}

/// Loads ROM images from a [`RomSource`]
pub struct Loader {
    source: Box<dyn RomSource>,
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader").finish_non_exhaustive()
    }
}

impl Loader {
    #[must_use]
    pub fn new(source: impl RomSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    /// Load the ROM called `name` into memory.
    ///
    /// The source is closed before returning, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Fails if the ROM cannot be opened or is malformed. In the latter case, bytes read
    /// before the error stay in memory.
    #[tracing::instrument(skip(self, memory), err)]
    pub fn load(&mut self, name: &str, memory: &mut Memory) -> Result<LoadReport, LoadError> {
        self.source
            .open(name)
            .map_err(|source| LoadError::RomRead {
                name: name.to_owned(),
                source,
            })?;

        let mut reader = Reader {
            source: &mut *self.source,
            offset: 0,
        };
        let mut writer = Writer { memory, written: 0 };
        let res = parse(&mut reader, &mut writer);
        let bytes_written = writer.written;
        self.source.close();

        let (code_start, code_bytes) = res?;
        debug!(bytes_written, code_bytes, code_start, "ROM loaded");
        Ok(LoadReport {
            bytes_written,
            code_bytes,
            code_start,
        })
    }
}

/// Run the ROM grammar to completion, returning the start and length of the code section
fn parse(
    reader: &mut Reader<'_>,
    writer: &mut Writer<'_>,
) -> Result<(Address, usize), FormatError> {
    let mut stage = Stage::Header;
    loop {
        trace!(?stage, offset = reader.offset, "Loader stage");
        stage = match stage {
            Stage::Header => {
                reader.expect_header()?;
                Stage::SectionKind
            }

            Stage::SectionKind => match reader.byte() {
                DATA_SECTION => Stage::DataSection,
                CODE_SECTION => Stage::CodeSection {
                    start: reader.address(),
                },
                kind => return Err(FormatError::SectionKind(kind)),
            },

            Stage::DataSection => {
                read_data_entries(reader, writer)?;
                Stage::CodeHeader
            }

            Stage::CodeHeader => {
                reader.expect_header()?;
                match reader.byte() {
                    CODE_SECTION => Stage::CodeSection {
                        start: reader.address(),
                    },
                    kind => return Err(FormatError::SectionKind(kind)),
                }
            }

            Stage::CodeSection { start } => {
                let before = writer.written;
                let mut address = start;
                while !reader.is_at_end() {
                    let byte = reader.byte();
                    writer.write(address, byte);
                    address = address.wrapping_add(1);
                }
                return Ok((start, writer.written - before));
            }
        };
    }
}

fn read_data_entries(reader: &mut Reader<'_>, writer: &mut Writer<'_>) -> Result<(), FormatError> {
    while !reader.is_at_end() {
        let address = reader.address();
        match reader.byte() {
            NUMBER_ENTRY => {
                let value = reader.byte();
                writer.write(address, value);
            }
            STRING_ENTRY => {
                let mut address = address;
                while !reader.is_at_end() {
                    let byte = reader.byte();
                    if byte == END_STRING {
                        break;
                    }
                    writer.write(address, byte);
                    address = address.wrapping_add(1);
                }
            }
            END_DATA_ENTRY => return Ok(()),
            kind => {
                trace!(address, kind, "Unknown data entry ends the data section");
                return Ok(());
            }
        }
    }

    // A data section cut short is reported by the missing code header
    Ok(())
}
