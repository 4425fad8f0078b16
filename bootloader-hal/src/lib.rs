#![no_std]
#![allow(clippy::missing_safety_doc)]

//! Hardware-facing traits the bootloader core is generic over, plus the
//! few stateless collaborators (CRC32) that are cheap enough to ship a
//! real implementation of instead of stubbing them out.
//!
//! Chip-specific clock/pin setup, the watchdog, and the actual UART/flash
//! peripherals stay out of this crate entirely - a board crate implements
//! these traits against its own peripheral access crate.

pub mod crc;

/// Outcome of a flash-controller operation that can fail in hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashFault {
    EraseFailed,
    WriteFailed,
}

/// Abstracts the flash controller: erase-page, write, memory-mapped read,
/// and picocache invalidation. One impl per board.
pub trait FlashInterface {
    /// Erase the `len`-byte region starting at `addr`. `len` is always a
    /// multiple of the controller's page size.
    fn hal_flash_erase(&mut self, addr: usize, len: usize) -> Result<(), FlashFault>;

    /// Write `data` starting at `addr`. The caller has already erased the
    /// destination; this never erases implicitly.
    fn hal_flash_write(&mut self, addr: usize, data: &[u8]) -> Result<(), FlashFault>;

    /// Copy `buf.len()` bytes starting at `addr` into `buf`.
    fn hal_flash_read(&self, addr: usize, buf: &mut [u8]);

    /// True if every byte in `[addr, addr+len)` already reads as `0xFF`.
    fn hal_is_erased(&self, addr: usize, len: usize) -> bool;

    /// Invalidate any read-side cache sitting in front of flash. Must be
    /// called after a write and before a memory-mapped read.
    fn hal_invalidate_cache(&mut self);

    /// Hardware (or software-table) CRC32 over a flash range. Kept on the
    /// HAL side because a CRC unit is, on most parts, part of the flash
    /// controller's address space.
    fn hal_crc32(&self, addr: usize, len: usize) -> u32;
}

/// Abstracts the byte-oriented UART link the framing protocol rides on.
pub trait UartInterface {
    /// Non-blocking: `Some(byte)` if a byte has arrived, `None` otherwise.
    fn hal_rx_byte(&mut self) -> Option<u8>;
    /// True if the transmit holding register can accept a byte.
    fn hal_tx_ready(&self) -> bool;
    /// True once the last written byte has physically left the shift
    /// register - stronger than `hal_tx_ready`, used to gate the baud
    /// change so the ack leaves at the old rate.
    fn hal_tx_empty(&self) -> bool;
    fn hal_write_byte(&mut self, byte: u8);
    /// Reinitialise the peripheral at a new baud rate, preserving framing.
    fn hal_reinit(&mut self, baud_rate: u32);
}

/// Abstracts the bootloader-select GPIO pin sampled at entry.
pub trait GpioInterface {
    /// True if the select pin currently reads low.
    fn hal_pin_is_low(&mut self) -> bool;
}
