//! Slot-indexed attribute store living in `[ATTR_FLOOR, ATTR_CEILING)`.
//!
//! Each slot is [`SLOT_LEN`] bytes: an 8-byte key, a 1-byte value length,
//! then up to `SLOT_LEN - 9` bytes of value. Flash can only be erased a
//! page at a time, so `set` reads the whole containing page out, patches
//! one slot in place, erases the page, and writes it back - any bytes in
//! the slot past `9 + value_len` are whatever the page already held, not
//! zeroed, because the read-modify-erase-rewrite never touches them.

use bootloader_hal::FlashInterface;

use crate::config::AttrDefault;
use crate::flashmap::{ATTR_FLOOR, ATTR_SLOT, ATTR_SLOT_COUNT, PAGE, SEED_FLAG_ADDR};
use crate::{BootloaderError, Result};

pub const KEY_LEN: usize = 8;
const LEN_OFFSET: usize = KEY_LEN;
const VALUE_OFFSET: usize = KEY_LEN + 1;
pub const MAX_VALUE_LEN: usize = ATTR_SLOT - VALUE_OFFSET;

/// Marks [`SEED_FLAG_ADDR`] once `seed_defaults` has run. Flash erases to
/// `0xFF`, so any other byte there means "already seeded".
const SEED_FLAG: u8 = 0x5A;

fn slot_addr(index: usize) -> usize {
    ATTR_FLOOR + index * ATTR_SLOT
}

fn page_addr_for(index: usize) -> usize {
    let addr = slot_addr(index);
    addr - (addr % PAGE)
}

/// Read attribute `index`: the slot's raw 64 bytes, unconditionally -
/// erased (length byte `0xFF`) and corrupt slots are returned as-is, not
/// rejected. Trimming to the declared value length is the caller's job.
pub fn get<F: FlashInterface>(
    flash: &F,
    index: usize,
    out: &mut [u8; ATTR_SLOT],
) -> Result<()> {
    if index >= ATTR_SLOT_COUNT {
        return Err(BootloaderError::OutOfRange);
    }
    flash.hal_flash_read(slot_addr(index), out);
    Ok(())
}

/// Write attribute `index`, replacing its key and value. `value.len()`
/// must fit within [`MAX_VALUE_LEN`].
pub fn set<F: FlashInterface>(
    flash: &mut F,
    index: usize,
    key: &[u8; KEY_LEN],
    value: &[u8],
) -> Result<()> {
    if index >= ATTR_SLOT_COUNT {
        return Err(BootloaderError::OutOfRange);
    }
    if value.len() > MAX_VALUE_LEN {
        return Err(BootloaderError::Overrun);
    }

    let page = page_addr_for(index);
    let mut page_buf = [0xFFu8; PAGE];
    flash.hal_flash_read(page, &mut page_buf);

    let slot_off = slot_addr(index) - page;
    page_buf[slot_off..slot_off + KEY_LEN].copy_from_slice(key);
    page_buf[slot_off + LEN_OFFSET] = value.len() as u8;
    page_buf[slot_off + VALUE_OFFSET..slot_off + VALUE_OFFSET + value.len()]
        .copy_from_slice(value);

    flash
        .hal_flash_erase(page, PAGE)
        .map_err(|_| BootloaderError::FlashFault)?;
    flash
        .hal_flash_write(page, &page_buf)
        .map_err(|_| BootloaderError::FlashFault)?;
    flash.hal_invalidate_cache();
    crate::debug_log!("attributes::set: slot {}", index);
    Ok(())
}

/// Seed slots `0..defaults.len()` from the board's default table, but
/// only the first time this runs - a flag byte just ahead of the slots
/// marks it done so a reflash doesn't clobber attributes the host has
/// since written through `SATTR`.
pub fn seed_defaults<F: FlashInterface>(flash: &mut F, defaults: &[AttrDefault]) -> Result<()> {
    let mut flag = [0u8; 1];
    flash.hal_flash_read(SEED_FLAG_ADDR, &mut flag);
    if flag[0] == SEED_FLAG {
        return Ok(());
    }

    for (index, default) in defaults.iter().enumerate() {
        set(flash, index, default.key, default.value)?;
    }

    flash
        .hal_flash_write(SEED_FLAG_ADDR, &[SEED_FLAG])
        .map_err(|_| BootloaderError::FlashFault)?;
    flash.hal_invalidate_cache();
    crate::debug_log!("attributes: seeded {} default slot(s)", defaults.len());
    Ok(())
}
