//! Raw (non-finalized) CRC-32/IEEE over a byte slice.
//!
//! `CRCRX`/`CRCIF` report the running CRC register directly, without the
//! final complement a "standard" CRC-32 applies. That is why an empty
//! range reports `0xFFFF_FFFF`, the untouched seed, rather than
//! `0x0000_0000`: there's nothing to complement away.

const POLY: u32 = 0xEDB8_8320;

/// The seed both `CRCRX` and `CRCIF` start from.
pub const INITIAL: u32 = 0xFFFF_FFFF;

fn update_byte(mut crc: u32, byte: u8) -> u32 {
    crc ^= byte as u32;
    for _ in 0..8 {
        let mask = (crc & 1).wrapping_neg();
        crc = (crc >> 1) ^ (POLY & mask);
    }
    crc
}

/// Advance a raw CRC-32 register over `data`. Seed with [`INITIAL`]; the
/// result is the raw register, not its one's complement.
pub fn crc32_update(crc: u32, data: &[u8]) -> u32 {
    data.iter().fold(crc, |c, &b| update_byte(c, b))
}
