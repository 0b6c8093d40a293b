use crate::constants::{Address, Word, MEMORY_LENGTH};

/// Holds the 64 KiB of memory of the computer.
///
/// Addresses are 16 bits wide and the memory covers the whole address space, so every
/// [`Address`] is valid. Indices wider than an address (the program counter) go through
/// [`Memory::fetch`], which never fails.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    inner: Box<[Word; MEMORY_LENGTH]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            inner: Box::new([0; MEMORY_LENGTH]),
        }
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Memory {{ {} bytes }}", self.inner.len())
    }
}

impl Memory {
    /// Read the byte at an address
    #[must_use]
    pub fn read(&self, address: Address) -> Word {
        self.inner[usize::from(address)]
    }

    /// Write a byte at an address
    pub fn write(&mut self, address: Address, value: Word) {
        self.inner[usize::from(address)] = value;
    }

    /// Read a byte at an arbitrary index, yielding `0` past the end of memory
    #[must_use]
    pub fn fetch(&self, index: usize) -> Word {
        self.inner.get(index).copied().unwrap_or(0)
    }

    /// Read a big-endian address stored at `address` and `address + 1`
    #[must_use]
    pub fn read_address(&self, address: Address) -> Address {
        let high = self.read(address);
        let low = self.read(address.wrapping_add(1));
        Address::from_be_bytes([high, low])
    }

    /// Store an address as two big-endian bytes at `address` and `address + 1`
    pub fn write_address(&mut self, address: Address, value: Address) {
        let [high, low] = value.to_be_bytes();
        self.write(address, high);
        self.write(address.wrapping_add(1), low);
    }

    /// Resolve one level of indirection: the address stored at `pointer`
    #[must_use]
    pub fn indirect(&self, pointer: Address) -> Address {
        self.read_address(pointer)
    }

    /// Read a NUL-terminated byte string starting at `address`.
    ///
    /// The string stops at the end of memory if no terminator is found.
    #[must_use]
    pub fn read_string(&self, address: Address) -> Vec<Word> {
        self.inner[usize::from(address)..]
            .iter()
            .copied()
            .take_while(|&b| b != 0)
            .collect()
    }

    /// The raw bytes of the memory
    #[must_use]
    pub fn as_slice(&self) -> &[Word] {
        &self.inner[..]
    }
}
