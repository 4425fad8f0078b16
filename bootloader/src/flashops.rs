//! Flash programming operations, validated against the regions in
//! [`crate::flashmap`] before ever touching [`FlashInterface`].
//!
//! Each function here is the thing a `CommandDispatcher` handler calls
//! after it has already pulled addr/len out of the request; the address
//! math and the region checks live here so the dispatcher stays a thin
//! table of `(argument shape) -> handler`.

use bootloader_hal::FlashInterface;

use crate::flashmap::{
    in_code_range, in_code_read_range, is_page_aligned, PAGE, USER_PAGE_ADDR,
};
use crate::{BootloaderError, Result};

/// Whether an erase found the page already blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseOutcome {
    AlreadyErased,
    Erased,
}

fn check_code_write(addr: usize, len: usize) -> Result<()> {
    if !is_page_aligned(addr) {
        return Err(BootloaderError::Misaligned);
    }
    if !in_code_range(addr, len) {
        return Err(BootloaderError::OutOfRange);
    }
    Ok(())
}

/// Erase one page at `addr`. A no-op, reported the same as a real erase,
/// if the page already reads as blank.
pub fn erase_page<F: FlashInterface>(flash: &mut F, addr: usize) -> Result<EraseOutcome> {
    check_code_write(addr, PAGE)?;
    if flash.hal_is_erased(addr, PAGE) {
        crate::trace_log!("erase_page: {:#x} already blank", addr);
        return Ok(EraseOutcome::AlreadyErased);
    }
    flash
        .hal_flash_erase(addr, PAGE)
        .map_err(|_| BootloaderError::FlashFault)?;
    flash.hal_invalidate_cache();
    crate::debug_log!("erase_page: {:#x} erased", addr);
    Ok(EraseOutcome::Erased)
}

/// Write `data` (at most one page) at `addr`. The destination must
/// already be erased; this never erases implicitly.
pub fn write_page<F: FlashInterface>(flash: &mut F, addr: usize, data: &[u8]) -> Result<()> {
    if data.len() > PAGE {
        return Err(BootloaderError::Overrun);
    }
    check_code_write(addr, data.len())?;
    flash
        .hal_flash_write(addr, data)
        .map_err(|_| BootloaderError::FlashFault)?;
    flash.hal_invalidate_cache();
    crate::debug_log!("write_page: {:#x}, {} bytes", addr, data.len());
    Ok(())
}

/// Write to the single reserved page just past the code region.
pub fn write_user_page<F: FlashInterface>(flash: &mut F, data: &[u8]) -> Result<()> {
    if data.len() > PAGE {
        return Err(BootloaderError::Overrun);
    }
    flash
        .hal_flash_write(USER_PAGE_ADDR, data)
        .map_err(|_| BootloaderError::FlashFault)?;
    flash.hal_invalidate_cache();
    Ok(())
}

/// Read `len` bytes of code flash starting at `addr` into `out`, which the
/// dispatcher has already sized at `len`.
pub fn read_range<F: FlashInterface>(
    flash: &F,
    addr: usize,
    len: usize,
    out: &mut [u8],
) -> Result<()> {
    if len > out.len() {
        return Err(BootloaderError::Overrun);
    }
    if !in_code_read_range(addr, len) {
        return Err(BootloaderError::OutOfRange);
    }
    flash.hal_flash_read(addr, &mut out[..len]);
    Ok(())
}

/// CRC32 over a code-flash range. Raw register value, not complemented -
/// see [`bootloader_hal::crc`].
pub fn crc_range<F: FlashInterface>(flash: &F, addr: usize, len: usize) -> Result<u32> {
    if !in_code_read_range(addr, len) {
        return Err(BootloaderError::OutOfRange);
    }
    Ok(flash.hal_crc32(addr, len))
}
