pub mod constants;
pub mod loader;
pub mod runtime;
pub mod status;

pub use self::{
    loader::{FileDrive, InMemoryDrive, LoadError, RomSource},
    runtime::{Computer, ProcessorError},
    status::Status,
};
