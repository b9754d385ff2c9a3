#![no_std]
#![forbid(unsafe_code)]

//! Byte-addressable, write-endurance-limited memory (EEPROM class).

extern crate alloc;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::ops::Range;
use spin::Mutex;
use log::{debug, trace};

use nvstore_core::{Location, StoreError, StoreResult, WriteOutcome};
use nvstore_hal::{BackendConfig, BackendKind, StorageBackend};

/// Value of an erased cell.
pub const BLANK_BYTE: u8 = 0xFF;

struct Cells {
    data: Vec<u8>,
    wear: Vec<u32>,
    write_ops: u64,
}

impl Cells {
    /// Programs only the cells whose content changes.
    /// Returns the number of cells touched.
    fn program(&mut self, start: usize, bytes: &[u8]) -> usize {
        let mut touched = 0;
        for (i, &b) in bytes.iter().enumerate() {
            let addr = start + i;
            if self.data[addr] != b {
                self.data[addr] = b;
                self.wear[addr] = self.wear[addr].saturating_add(1);
                touched += 1;
            }
        }
        if touched > 0 {
            self.write_ops += 1;
        }
        touched
    }
}

/// A fixed-size memory region. Clones share the same cells.
#[derive(Clone)]
pub struct MemoryRegion {
    cells: Arc<Mutex<Cells>>,
}

impl MemoryRegion {
    /// A fresh, blank region.
    pub fn new(size: usize) -> Self {
        Self::from_image(vec![BLANK_BYTE; size])
    }

    /// A region preloaded with `image` (e.g. an EEPROM dump).
    pub fn from_image(image: Vec<u8>) -> Self {
        let size = image.len();
        Self {
            cells: Arc::new(Mutex::new(Cells { data: image, wear: vec![0; size], write_ops: 0 })),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.lock().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every cell.
    pub fn image(&self) -> Vec<u8> {
        self.cells.lock().data.clone()
    }

    /// Raw read, bypassing the record layer.
    pub fn peek(&self, addr: usize, len: usize) -> Option<Vec<u8>> {
        let cells = self.cells.lock();
        let span = span(addr, len, cells.data.len())?;
        Some(cells.data[span].to_vec())
    }

    /// Raw overwrite for fault injection. Not counted as wear.
    pub fn poke(&self, addr: usize, bytes: &[u8]) -> bool {
        let mut cells = self.cells.lock();
        match span(addr, bytes.len(), cells.data.len()) {
            Some(span) => {
                cells.data[span].copy_from_slice(bytes);
                true
            }
            None => false,
        }
    }

    /// Number of physical write operations performed so far.
    pub fn write_ops(&self) -> u64 {
        self.cells.lock().write_ops
    }

    /// Times the cell at `addr` has been programmed.
    pub fn cell_wear(&self, addr: usize) -> u32 {
        self.cells.lock().wear.get(addr).copied().unwrap_or(0)
    }
}

fn span(addr: usize, len: usize, size: usize) -> Option<Range<usize>> {
    let end = addr.checked_add(len)?;
    if end > size { None } else { Some(addr..end) }
}

/// Raw memory backend. `Location::Addr` is a byte offset into the region.
pub struct RawMemory {
    region: MemoryRegion,
}

impl RawMemory {
    pub fn new(region: MemoryRegion) -> Self {
        Self { region }
    }

    /// Another handle to the underlying cells.
    pub fn region(&self) -> MemoryRegion {
        self.region.clone()
    }

    fn offset(location: &Location) -> StoreResult<usize> {
        match location {
            Location::Addr(a) => Ok(*a as usize),
            Location::Key(_) => Err(StoreError::InvalidLocation),
        }
    }
}

impl StorageBackend for RawMemory {
    fn kind(&self) -> BackendKind {
        BackendKind::RawMemory
    }

    fn init(&mut self, _config: &BackendConfig) -> StoreResult<()> {
        if self.region.is_empty() {
            return Err(StoreError::BackendFailure);
        }
        debug!("[eeprom] Region ready: {} bytes", self.region.len());
        Ok(())
    }

    fn read(&self, location: &Location, len: usize) -> StoreResult<Vec<u8>> {
        let addr = Self::offset(location)?;
        self.region.peek(addr, len).ok_or(StoreError::OutOfBounds)
    }

    fn write(&mut self, location: &Location, bytes: &[u8]) -> StoreResult<WriteOutcome> {
        let addr = Self::offset(location)?;
        let mut cells = self.region.cells.lock();
        let span = span(addr, bytes.len(), cells.data.len()).ok_or(StoreError::OutOfBounds)?;

        // Wear leveling: an identical span is never reprogrammed.
        if cells.data[span] == *bytes {
            trace!("[eeprom] Skip addr {}: content unchanged", addr);
            return Ok(WriteOutcome::Skipped);
        }

        let touched = cells.program(addr, bytes);
        trace!("[eeprom] Programmed {} of {} cells at addr {}", touched, bytes.len(), addr);
        Ok(WriteOutcome::Written)
    }

    fn erase_all(&mut self) -> StoreResult<()> {
        let mut cells = self.region.cells.lock();
        let blank = vec![BLANK_BYTE; cells.data.len()];
        let touched = cells.program(0, &blank);
        debug!("[eeprom] Erased region ({} cells reprogrammed)", touched);
        Ok(())
    }
}
