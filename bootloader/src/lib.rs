#![cfg_attr(not(test), no_std)]
#![allow(non_snake_case)]

//! Command-processing core of a serial bootloader: a framed byte-stream
//! protocol, flash programming with address validation, a slot-indexed
//! attribute store, and an in-band baud-rate renegotiation handshake.
//!
//! Chip-specific clock/pin init, the watchdog, the UART and flash-controller
//! drivers, and the jump-to-application routine are external collaborators,
//! reached through the traits in [`bootloader_hal`].

pub mod attributes;
pub mod baud;
pub mod config;
pub mod dispatch;
pub mod entry;
pub mod flashmap;
pub mod flashops;
pub mod framer;
pub mod poll;
pub mod response;
pub mod state;
pub mod wire;

use core::fmt;

/// Logs through whichever facade this build enables - `log` on host/test
/// builds, `defmt` on embedded builds, neither if both features are off.
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::trace!($($arg)*);
        #[cfg(feature = "defmt")]
        defmt::trace!($($arg)*);
    };
}

#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::debug!($($arg)*);
        #[cfg(feature = "defmt")]
        defmt::debug!($($arg)*);
    };
}

/// Errors FlashOps/AttributeStore carry internally before the dispatcher
/// collapses them to exactly one wire response code. No value of this
/// type, nor a panic, ever reaches the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootloaderError {
    /// The flash controller refused to erase or write.
    FlashFault,
    /// An address or address+length falls outside the region the
    /// operation is permitted to touch.
    OutOfRange,
    /// An address required to be page-aligned was not.
    Misaligned,
    /// A requested length exceeds what the destination buffer can hold.
    Overrun,
}

/// The crate-wide result type.
pub type Result<T> = core::result::Result<T, BootloaderError>;

impl fmt::Display for BootloaderError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BootloaderError::FlashFault => write!(f, "flash controller refused the operation"),
            BootloaderError::OutOfRange => write!(f, "address outside the permitted region"),
            BootloaderError::Misaligned => write!(f, "address is not page-aligned"),
            BootloaderError::Overrun => write!(f, "requested length exceeds the buffer bound"),
        }
    }
}
