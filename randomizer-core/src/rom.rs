use std::fs;
use std::path::Path;

use crate::{RandomizerError, Result};

/// Minimum image size we accept. Covers every table offset this tool touches.
pub const MIN_ROM_SIZE: usize = 0x8_0000;

// LoROM internal header fields.
const HEADER_TITLE: usize = 0x7FC0;
const HEADER_TITLE_LEN: usize = 21;
const HEADER_COMPLEMENT: usize = 0x7FDC;
const HEADER_CHECKSUM: usize = 0x7FDE;

/// The raw container image. All table reads and writes go through the
/// little-endian helpers here; oversized writes clamp to the field width
/// instead of erroring (intentional scaling, not a fault).
#[derive(Debug)]
pub struct Rom {
    pub bytes: Vec<u8>,
}

impl Rom {
    pub fn load(path: &Path) -> Result<Rom> {
        let bytes = fs::read(path)?;
        if bytes.len() < MIN_ROM_SIZE {
            return Err(RandomizerError::Config(format!(
                "input ROM is too small ({} bytes, expected at least {})",
                bytes.len(),
                MIN_ROM_SIZE
            )));
        }
        Ok(Rom { bytes })
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Rom {
        Rom { bytes }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, &self.bytes)?;
        Ok(())
    }

    pub fn read_u8(&self, offset: usize) -> u8 {
        self.bytes[offset]
    }

    pub fn read_u16(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.bytes[offset], self.bytes[offset + 1]])
    }

    pub fn write_u8(&mut self, offset: usize, value: u32) {
        self.bytes[offset] = value.min(0xFF) as u8;
    }

    pub fn write_u16(&mut self, offset: usize, value: u32) {
        let clamped = value.min(0xFFFF) as u16;
        self.bytes[offset..offset + 2].copy_from_slice(&clamped.to_le_bytes());
    }

    pub fn write_bytes(&mut self, offset: usize, data: &[u8]) {
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
    }

    /// Rewrites the cartridge title so the seed is visible in emulator
    /// headers, padded with spaces to the fixed 21-byte field.
    pub fn rewrite_title(&mut self, title: &str) {
        let mut field = [b' '; HEADER_TITLE_LEN];
        for (dst, src) in field.iter_mut().zip(title.bytes()) {
            *dst = src;
        }
        self.write_bytes(HEADER_TITLE, &field);
    }

    /// Recomputes the internal checksum/complement pair. The pair always
    /// contributes 0x1FE to the byte sum regardless of its value, so zeroing
    /// it first keeps the computation a single pass.
    pub fn rewrite_checksum(&mut self) {
        self.write_u16(HEADER_CHECKSUM, 0x0000);
        self.write_u16(HEADER_COMPLEMENT, 0xFFFF);
        let sum: u32 = self.bytes.iter().map(|&b| b as u32).sum();
        let checksum = (sum & 0xFFFF) as u16;
        self.write_u16(HEADER_CHECKSUM, checksum as u32);
        self.write_u16(HEADER_COMPLEMENT, (checksum ^ 0xFFFF) as u32);
    }

    /// Static encounter-rate reduction patch: hook the step counter routine
    /// and shift the rate accumulator down by three.
    pub fn lower_encounter_rate(&mut self) {
        self.write_bytes(0x32750, &[0x22, 0x00, 0x49, 0xC5]);
        self.write_bytes(0x54900, &[0x85, 0x1C, 0x4A, 0x4A, 0x4A, 0x6B]);
    }
}

#[cfg(test)]
mod tests {
    use super::{Rom, HEADER_COMPLEMENT, HEADER_CHECKSUM, MIN_ROM_SIZE};

    #[test]
    fn oversized_writes_clamp_to_field_width() {
        let mut rom = Rom::from_bytes(vec![0u8; 16]);
        rom.write_u8(0, 0x1FF);
        rom.write_u16(2, 0x12_3456);
        assert_eq!(rom.read_u8(0), 0xFF);
        assert_eq!(rom.read_u16(2), 0xFFFF);
    }

    #[test]
    fn checksum_and_complement_stay_paired() {
        let mut rom = Rom::from_bytes(vec![0xABu8; MIN_ROM_SIZE]);
        rom.rewrite_checksum();
        let checksum = rom.read_u16(HEADER_CHECKSUM);
        let complement = rom.read_u16(HEADER_COMPLEMENT);
        assert_eq!(checksum ^ complement, 0xFFFF);

        // Recomputing over the patched image must reproduce the stored value.
        let mut copy = Rom::from_bytes(rom.bytes.clone());
        copy.rewrite_checksum();
        assert_eq!(copy.read_u16(HEADER_CHECKSUM), checksum);
    }

    #[test]
    fn title_is_space_padded() {
        let mut rom = Rom::from_bytes(vec![0u8; MIN_ROM_SIZE]);
        rom.rewrite_title("BOF2 RND 42");
        let field = &rom.bytes[0x7FC0..0x7FC0 + 21];
        assert_eq!(&field[..11], b"BOF2 RND 42");
        assert!(field[11..].iter().all(|&b| b == b' '));
    }
}
