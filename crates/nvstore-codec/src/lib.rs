#![no_std]
#![forbid(unsafe_code)]

extern crate alloc;
use alloc::vec;
use alloc::vec::Vec;
use nvstore_core::{
    Record, StoreError, StoreResult, ValidationHeader, HEADER_SIZE, RECORD_MAGIC, SCHEMA_VERSION,
};
use zeroize::Zeroizing;

pub mod crc;

/// Staging buffer for one record. Wiped on drop.
pub type RecordBuf = Zeroizing<Vec<u8>>;

/// Whether a schema version mismatch invalidates a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionCheck {
    /// Reject records stamped with another version.
    #[default]
    Strict,
    /// Store the version but accept any value on load.
    Lenient,
}

/// Header constants stamped on encode and expected on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecPolicy {
    pub magic: u8,
    pub schema_version: u8,
    pub version_check: VersionCheck,
}

impl Default for CodecPolicy {
    fn default() -> Self {
        Self { magic: RECORD_MAGIC, schema_version: SCHEMA_VERSION, version_check: VersionCheck::Strict }
    }
}

impl CodecPolicy {
    pub fn with_version_check(version_check: VersionCheck) -> Self {
        Self { version_check, ..Self::default() }
    }
}

/// On-medium size of a record holding a `T`.
pub const fn record_len<T: Record>() -> usize {
    HEADER_SIZE + T::SIZE
}

/// Wraps `value` in a validation header.
/// Layout: `[magic][version][crc LE x4][value bytes]`.
pub fn encode<T: Record>(value: &T, policy: &CodecPolicy) -> RecordBuf {
    let mut buf = Zeroizing::new(vec![0u8; record_len::<T>()]);
    value.encode(&mut buf[HEADER_SIZE..]);

    let header = ValidationHeader {
        magic: policy.magic,
        schema_version: policy.schema_version,
        checksum: crc::checksum(&buf[HEADER_SIZE..]),
    };
    // Length is record_len::<T>() by construction.
    buf[0] = header.magic;
    buf[1] = header.schema_version;
    buf[2..HEADER_SIZE].copy_from_slice(&header.checksum.to_le_bytes());
    buf
}

/// Validates a record and reconstructs its value.
///
/// Checks run cheapest first and stop at the first failure: length, magic,
/// version (per policy), checksum. `T::decode` only ever sees bytes that
/// passed all of them.
pub fn decode<T: Record>(bytes: &[u8], policy: &CodecPolicy) -> StoreResult<T> {
    let len = record_len::<T>();
    if bytes.len() < len {
        return Err(StoreError::NotFound);
    }
    if bytes[0] != policy.magic {
        return Err(StoreError::MagicMismatch);
    }

    let header = ValidationHeader::from_bytes(bytes)?;
    if policy.version_check == VersionCheck::Strict && header.schema_version != policy.schema_version {
        return Err(StoreError::VersionMismatch);
    }

    let value_bytes = &bytes[HEADER_SIZE..len];
    if !crc::verify(value_bytes, header.checksum) {
        return Err(StoreError::ChecksumMismatch);
    }
    Ok(T::decode(value_bytes))
}

/// Header of a raw record, for diagnostics. Performs no validation.
pub fn inspect(bytes: &[u8]) -> StoreResult<ValidationHeader> {
    ValidationHeader::from_bytes(bytes)
}
