use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Read},
};

use camino::Utf8PathBuf;
use tracing::{debug, warn};

use crate::constants::Word;

/// A pull-style source of ROM bytes.
///
/// Reads never fail: once the source is exhausted (or broken), [`RomSource::read`] keeps
/// returning `0x00` and [`RomSource::is_at_end`] returns `true`.
pub trait RomSource {
    /// Open a ROM by name, rewinding the read position
    ///
    /// # Errors
    ///
    /// Fails if the ROM does not exist or cannot be opened.
    fn open(&mut self, name: &str) -> std::io::Result<()>;

    /// Whether every byte of the open ROM was read
    fn is_at_end(&self) -> bool;

    /// Read the next byte, or `0x00` at the end of the ROM
    fn read(&mut self) -> Word;

    /// Close the open ROM
    fn close(&mut self);
}

/// ROM images held in memory, looked up by name
#[derive(Debug, Default, Clone)]
pub struct InMemoryDrive {
    images: HashMap<String, Vec<Word>>,
    current: Vec<Word>,
    position: usize,
}

impl InMemoryDrive {
    #[must_use]
    pub fn new(images: HashMap<String, Vec<Word>>) -> Self {
        Self {
            images,
            ..Self::default()
        }
    }

    /// Add an image to the drive
    #[must_use]
    pub fn with_image(mut self, name: impl Into<String>, bytes: impl Into<Vec<Word>>) -> Self {
        self.insert(name, bytes);
        self
    }

    /// Add or replace an image
    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<Word>>) {
        self.images.insert(name.into(), bytes.into());
    }
}

impl RomSource for InMemoryDrive {
    fn open(&mut self, name: &str) -> std::io::Result<()> {
        let image = self.images.get(name).ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "ROM not found")
        })?;
        self.current.clone_from(image);
        self.position = 0;
        Ok(())
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.current.len()
    }

    fn read(&mut self) -> Word {
        let byte = self.current.get(self.position).copied().unwrap_or(0);
        self.position = self.position.saturating_add(1).min(self.current.len());
        byte
    }

    fn close(&mut self) {
        self.current.clear();
        self.position = 0;
    }
}

/// ROM files read from a directory on the native filesystem
#[derive(Debug)]
pub struct FileDrive {
    root: Utf8PathBuf,
    file: Option<BufReader<File>>,
    remaining: u64,
}

impl FileDrive {
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            file: None,
            remaining: 0,
        }
    }

    /// A drive rooted at the current directory
    ///
    /// # Errors
    ///
    /// Fails if the current directory is unavailable or is not valid UTF-8.
    pub fn from_env() -> std::io::Result<Self> {
        let root = Utf8PathBuf::try_from(std::env::current_dir()?)
            .map_err(camino::FromPathBufError::into_io_error)?;
        Ok(Self::new(root))
    }

    #[must_use]
    pub fn root(&self) -> &Utf8PathBuf {
        &self.root
    }
}

impl RomSource for FileDrive {
    fn open(&mut self, name: &str) -> std::io::Result<()> {
        let path = self.root.join(name);
        debug!(%path, "Opening ROM file");
        let file = File::open(&path)?;
        self.remaining = file.metadata()?.len();
        self.file = Some(BufReader::new(file));
        Ok(())
    }

    fn is_at_end(&self) -> bool {
        self.file.is_none() || self.remaining == 0
    }

    fn read(&mut self) -> Word {
        if self.is_at_end() {
            return 0;
        }

        let Some(file) = self.file.as_mut() else {
            return 0;
        };

        let mut buf = [0; 1];
        match file.read_exact(&mut buf) {
            Ok(()) => {
                self.remaining -= 1;
                buf[0]
            }
            Err(error) => {
                warn!(%error, "Could not read from ROM file");
                self.remaining = 0;
                0
            }
        }
    }

    fn close(&mut self) {
        self.file = None;
        self.remaining = 0;
    }
}
