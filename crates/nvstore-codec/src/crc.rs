//! CRC-32 (reflected, polynomial 0xEDB88320), bitwise with no lookup table.

const POLY: u32 = 0xEDB8_8320;

/// Incremental CRC-32 state.
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    reg: u32,
}

impl Crc32 {
    pub fn new() -> Self {
        Self { reg: 0xFFFF_FFFF }
    }

    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.reg ^= byte as u32;
            for _ in 0..8 {
                if self.reg & 1 != 0 {
                    self.reg = (self.reg >> 1) ^ POLY;
                } else {
                    self.reg >>= 1;
                }
            }
        }
    }

    pub fn finalize(self) -> u32 {
        !self.reg
    }
}

impl Default for Crc32 {
    fn default() -> Self { Self::new() }
}

/// One-shot checksum over a byte span.
pub fn checksum(data: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(data);
    crc.finalize()
}

pub fn verify(data: &[u8], expected: u32) -> bool {
    checksum(data) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_updates_match_one_shot() {
        let data = b"split across several update calls";
        let mut crc = Crc32::new();
        for part in data.chunks(5) {
            crc.update(part);
        }
        assert_eq!(crc.finalize(), checksum(data));
    }
}
