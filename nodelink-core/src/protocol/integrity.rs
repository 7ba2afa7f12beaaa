use crc::{CRC_32_ISO_HDLC, Crc};

/// CRC-32/ISO-HDLC, the same table on every node of a link.
pub static CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Integrity code over `bytes`.
pub fn checksum(bytes: &[u8]) -> u32 {
    CRC32.checksum(bytes)
}
