//! Per-board configuration: the select pin, the UART's default baud rate,
//! and the attribute values a freshly-flashed board should ship with.
//! One `const BoardConfig` per board crate.

use crate::attributes::KEY_LEN;

pub struct AttrDefault {
    pub key: &'static [u8; KEY_LEN],
    pub value: &'static [u8],
}

pub struct BoardConfig {
    /// Human-readable board name.
    pub name: &'static str,
    /// Version/banner string, staged into `INFO` responses.
    pub version: &'static str,
    /// UART baud rate the bootloader starts up at.
    pub initial_baud: u32,
    /// Attribute slots to seed on first boot, indexed from 0. Consumed by
    /// [`crate::attributes::seed_defaults`].
    pub default_attrs: &'static [AttrDefault],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_attrs_fit_in_the_attribute_region() {
        const CFG: BoardConfig = BoardConfig {
            name: "test",
            version: "bootloader-0.1.0",
            initial_baud: 115_200,
            default_attrs: &[AttrDefault {
                key: b"board\0\0\0",
                value: b"hail",
            }],
        };
        assert!(CFG.default_attrs.len() <= crate::flashmap::ATTR_SLOT_COUNT);
    }
}
