#![no_std]
#![forbid(unsafe_code)]
#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod nvs_backend;
#[cfg(feature = "std")]
pub mod fs_backend;

use alloc::string::String;
use log::{debug, warn};

use nvstore_codec::{decode, encode, record_len, CodecPolicy};
use nvstore_hal::BackendConfig;
use zeroize::Zeroizing;

pub use nvstore_codec::VersionCheck;
pub use nvstore_core::{Location, Record, StoreError, StoreResult, WriteOutcome};
pub use nvstore_hal::{BackendKind, StorageBackend};
pub use nvstore_mem::{MemoryRegion, RawMemory};
pub use nvs_backend::{NamespaceStore, NvsPartition};
#[cfg(feature = "std")]
pub use fs_backend::FileStore;

pub const DEFAULT_NAME: &str = "iskak_store";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Namespace (NVS) or directory (file store) identity.
    pub name: String,
    /// Emit per-operation log lines. Never changes behavior.
    pub debug: bool,
    pub version_check: VersionCheck,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { name: String::from(DEFAULT_NAME), debug: false, version_check: VersionCheck::Strict }
    }
}

impl StoreConfig {
    pub fn new(name: &str, debug: bool) -> Self {
        Self { name: String::from(name), debug, ..Self::default() }
    }
}

/// Typed, integrity-checked records on top of one backend.
///
/// Exactly one backend per instance; pick it at build time with a concrete
/// `B`, or inject a `Box<dyn StorageBackend>`.
pub struct Storage<B> {
    backend: B,
    config: Option<StoreConfig>,
    policy: CodecPolicy,
}

impl<B: StorageBackend> Storage<B> {
    pub fn new(backend: B) -> Self {
        Self { backend, config: None, policy: CodecPolicy::default() }
    }

    /// Open the backend. Calling again with the same config is a no-op;
    /// a different config is rejected.
    pub fn begin(&mut self, config: StoreConfig) -> StoreResult<()> {
        if let Some(current) = &self.config {
            return if *current == config { Ok(()) } else { Err(StoreError::AlreadyInitialized) };
        }

        self.backend.init(&BackendConfig { name: config.name.clone() })?;
        self.policy = CodecPolicy::with_version_check(config.version_check);
        if config.debug {
            debug!("[nvstore] {} engine ready with CRC32 protection ('{}')",
                self.backend.kind().label(), config.name);
        }
        self.config = Some(config);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.config.is_some()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn debug_enabled(&self) -> StoreResult<bool> {
        self.config.as_ref().map(|c| c.debug).ok_or(StoreError::NotInitialized)
    }

    /// Wrap `value` in a header and persist it at `location`.
    pub fn save<T: Record>(&mut self, location: impl Into<Location>, value: &T) -> StoreResult<WriteOutcome> {
        let debug = self.debug_enabled()?;
        let location = location.into();
        let record = encode(value, &self.policy);

        let outcome = self.backend.write(&location, &record).map_err(|e| {
            if debug { warn!("[nvstore] Save {} failed: {}", location, e); }
            e
        })?;

        if debug {
            let crc = u32::from_le_bytes([record[2], record[3], record[4], record[5]]);
            match outcome {
                WriteOutcome::Written => debug!("[nvstore] Saved {} with CRC: {:08x}", location, crc),
                WriteOutcome::Skipped => debug!("[nvstore] Skipped {} (unchanged, CRC: {:08x})", location, crc),
            }
        }
        Ok(outcome)
    }

    /// Fetch and validate the record at `location`.
    pub fn load<T: Record>(&self, location: impl Into<Location>) -> StoreResult<T> {
        let debug = self.debug_enabled()?;
        let location = location.into();
        let len = record_len::<T>();

        let raw = Zeroizing::new(self.backend.read(&location, len)?);
        let result = if raw.len() < len { Err(StoreError::NotFound) } else { decode::<T>(&raw, &self.policy) };

        if debug {
            match &result {
                Ok(_) => debug!("[nvstore] Loaded {}", location),
                Err(e) if e.is_integrity() => warn!("[nvstore] Rejected {}: {}", location, e),
                Err(e) => debug!("[nvstore] No record at {}: {}", location, e),
            }
        }
        result
    }

    /// Boolean form of [`Storage::load`]. `out` is only written on success.
    pub fn load_into<T: Record>(&self, location: impl Into<Location>, out: &mut T) -> bool {
        match self.load(location) {
            Ok(value) => {
                *out = value;
                true
            }
            Err(_) => false,
        }
    }

    /// Factory reset: erase every record this backend manages.
    pub fn clear(&mut self) -> StoreResult<()> {
        let debug = self.debug_enabled()?;
        self.backend.erase_all()?;
        if debug {
            debug!("[nvstore] Factory reset on {}", self.backend.kind().label());
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_std_feature_reaches_core_error() {
        fn as_error<E: std::error::Error + 'static>(e: E) -> std::boxed::Box<dyn std::error::Error> {
            std::boxed::Box::new(e)
        }
        let err = as_error(StoreError::ChecksumMismatch);
        assert_eq!(std::format!("{}", err), "ChecksumMismatch");
    }
}
