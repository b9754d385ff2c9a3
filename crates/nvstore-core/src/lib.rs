#![no_std]
#![forbid(unsafe_code)]
#[cfg(feature = "std")]
extern crate std;

extern crate alloc;
use alloc::string::String;

/// Sentinel written as the first byte of every record.
pub const RECORD_MAGIC: u8 = 0x49;

/// Header layout version stamped into every record.
pub const SCHEMA_VERSION: u8 = 0x03;

/// Serialized header size: magic(1) + version(1) + crc(4).
pub const HEADER_SIZE: usize = 6;

/// Metadata prepended to every stored value.
/// The checksum covers the value bytes only, never the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationHeader {
    pub magic: u8,
    pub schema_version: u8,
    pub checksum: u32,
}

impl ValidationHeader {
    pub const SIZE: usize = HEADER_SIZE;

    pub fn new(checksum: u32) -> Self {
        Self { magic: RECORD_MAGIC, schema_version: SCHEMA_VERSION, checksum }
    }

    pub fn to_bytes(&self, buf: &mut [u8]) -> StoreResult<()> {
        if buf.len() < Self::SIZE { return Err(StoreError::OutOfBounds); }
        buf[0] = self.magic;
        buf[1] = self.schema_version;
        buf[2..6].copy_from_slice(&self.checksum.to_le_bytes());
        Ok(())
    }

    /// Parses without judging the values; validation is the codec's job.
    pub fn from_bytes(buf: &[u8]) -> StoreResult<Self> {
        if buf.len() < Self::SIZE { return Err(StoreError::NotFound); }
        let mut crc = [0u8; 4];
        crc.copy_from_slice(&buf[2..6]);
        Ok(Self {
            magic: buf[0],
            schema_version: buf[1],
            checksum: u32::from_le_bytes(crc),
        })
    }
}

/// Where a record lives. Interpretation is up to the backend:
/// byte offset, file name, or namespace key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Location {
    Addr(u32),
    Key(String),
}

impl From<u32> for Location {
    fn from(addr: u32) -> Self { Location::Addr(addr) }
}

impl From<&str> for Location {
    fn from(key: &str) -> Self { Location::Key(String::from(key)) }
}

impl From<String> for Location {
    fn from(key: String) -> Self { Location::Key(key) }
}

impl core::fmt::Display for Location {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Location::Addr(a) => write!(f, "addr {}", a),
            Location::Key(k) => write!(f, "key '{}'", k),
        }
    }
}

/// Result of a backend write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The medium was physically programmed.
    Written,
    /// Content was already identical; nothing was touched.
    Skipped,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// No record at the location. A legitimate empty state.
    NotFound,
    /// Bytes present but not written by this system.
    MagicMismatch,
    /// Record written under a different header layout.
    VersionMismatch,
    /// Record recognized but its value bytes are corrupted.
    ChecksumMismatch,
    /// The medium could not complete the operation.
    BackendFailure,
    /// Span falls outside the addressable region.
    OutOfBounds,
    /// The backend cannot express this location.
    InvalidLocation,
    NotInitialized,
    AlreadyInitialized,
}

impl StoreError {
    /// True for the kinds that mean "bytes exist but are not a valid record".
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            StoreError::MagicMismatch | StoreError::VersionMismatch | StoreError::ChecksumMismatch
        )
    }
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for StoreError {}

/// A fixed-size value that can be stored as a record.
///
/// `encode` fills exactly `SIZE` bytes; `decode` is handed exactly `SIZE`
/// bytes and must accept any bit pattern (the checksum has already vouched
/// for them by the time it is called).
pub trait Record: Sized {
    const SIZE: usize;

    fn encode(&self, out: &mut [u8]);

    fn decode(bytes: &[u8]) -> Self;
}

macro_rules! impl_record_le {
    ($($t:ty),*) => {
        $(
            impl Record for $t {
                const SIZE: usize = core::mem::size_of::<$t>();

                fn encode(&self, out: &mut [u8]) {
                    out[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
                }

                fn decode(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; core::mem::size_of::<$t>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    <$t>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_record_le!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl Record for bool {
    const SIZE: usize = 1;

    fn encode(&self, out: &mut [u8]) { out[0] = *self as u8; }

    fn decode(bytes: &[u8]) -> Self { bytes[0] != 0 }
}

impl<const N: usize> Record for [u8; N] {
    const SIZE: usize = N;

    fn encode(&self, out: &mut [u8]) { out[..N].copy_from_slice(self); }

    fn decode(bytes: &[u8]) -> Self {
        let mut raw = [0u8; N];
        raw.copy_from_slice(&bytes[..N]);
        raw
    }
}
