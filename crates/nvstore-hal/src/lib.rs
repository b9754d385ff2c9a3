#![no_std]
#![forbid(unsafe_code)]

extern crate alloc;
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use nvstore_core::{Location, StoreResult, WriteOutcome};

/// Which medium a backend drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    RawMemory,
    FileStore,
    NamespaceStore,
}

impl BackendKind {
    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::RawMemory => "eeprom",
            BackendKind::FileStore => "file",
            BackendKind::NamespaceStore => "nvs",
        }
    }
}

/// Identity handed to a backend when the store begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Namespace name (NVS) or store directory name (file).
    /// Raw memory ignores it.
    pub name: String,
}

/// The persistence medium (Raw Memory, File Store, Namespace Store).
/// INVARIANT: Whole-buffer semantics. No partial writes are exposed.
pub trait StorageBackend: Send {
    fn kind(&self) -> BackendKind;

    /// Open the medium. Called once by the facade.
    fn init(&mut self, config: &BackendConfig) -> StoreResult<()>;

    /// Fetch up to `len` bytes stored at `location`.
    /// Returns `NotFound` when nothing is stored there.
    /// May return fewer than `len` bytes; callers treat that as no record.
    fn read(&self, location: &Location, len: usize) -> StoreResult<Vec<u8>>;

    /// Replace the record at `location` with `bytes`.
    fn write(&mut self, location: &Location, bytes: &[u8]) -> StoreResult<WriteOutcome>;

    /// Remove every record this backend manages.
    fn erase_all(&mut self) -> StoreResult<()>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn kind(&self) -> BackendKind { (**self).kind() }

    fn init(&mut self, config: &BackendConfig) -> StoreResult<()> { (**self).init(config) }

    fn read(&self, location: &Location, len: usize) -> StoreResult<Vec<u8>> {
        (**self).read(location, len)
    }

    fn write(&mut self, location: &Location, bytes: &[u8]) -> StoreResult<WriteOutcome> {
        (**self).write(location, bytes)
    }

    fn erase_all(&mut self) -> StoreResult<()> { (**self).erase_all() }
}
