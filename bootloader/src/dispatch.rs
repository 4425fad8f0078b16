//! Decodes a framed command's argument bytes and runs the matching
//! handler, collapsing every [`BootloaderError`] and decode failure down
//! to exactly one response code (`RES_*`) staged through [`crate::response`].

use byteorder::{ByteOrder, LittleEndian};

use bootloader_hal::FlashInterface;

use crate::config::BoardConfig;
use crate::flashmap::{ATTR_SLOT, CODE_CEILING, INFO_BANNER_LEN, PAGE, RRANGE_MAX_LEN, TX_CAP};
use crate::state::BootloaderState;
use crate::{attributes, flashops, response, wire, BootloaderError};

const ADDR_LEN: usize = 4;
const RRANGE_LEN_LEN: usize = 2;
const CRCIF_LEN_LEN: usize = 4;
const WUSER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadArgs;

/// What the caller (the poll loop) should do once `dispatch` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A response (possibly empty) has been staged; keep polling normally.
    Responded,
    /// `CLKOUT` was received. Routing the reference clock is a chip-level
    /// concern outside this crate; the caller is expected to never return
    /// from here, matching the original command's "spin forever" contract.
    RouteClockForever,
}

enum Command<'a> {
    Ping,
    Info,
    Id,
    Reset,
    ErasePage { addr: usize },
    WritePage { addr: usize, data: &'a [u8] },
    CrcRx,
    ReadRange { addr: usize, len: usize },
    SetAttribute {
        index: usize,
        key: [u8; attributes::KEY_LEN],
        value_len: usize,
        value_start: usize,
    },
    GetAttribute { index: usize },
    CrcInternalFlash { addr: usize, len: usize },
    WriteUserPage { words: [u8; WUSER_LEN] },
    ChangeBaud { rate: u32 },
    ClockOut,
    Unsupported,
    Unrecognized,
}

fn decode(cmd: u8, args: &[u8]) -> core::result::Result<Command<'_>, BadArgs> {
    use Command::*;
    match cmd {
        wire::CMD_PING if args.is_empty() => Ok(Ping),
        wire::CMD_INFO if args.is_empty() => Ok(Info),
        wire::CMD_ID if args.is_empty() => Ok(Id),
        // RESET and CLKOUT carry no length precondition.
        wire::CMD_RESET => Ok(Reset),
        wire::CMD_CLKOUT => Ok(ClockOut),
        wire::CMD_CRCRX => Ok(CrcRx),
        wire::CMD_EPAGE if args.len() == ADDR_LEN => Ok(ErasePage {
            addr: LittleEndian::read_u32(&args[..ADDR_LEN]) as usize,
        }),
        wire::CMD_WPAGE if args.len() == ADDR_LEN + PAGE => Ok(WritePage {
            addr: LittleEndian::read_u32(&args[..ADDR_LEN]) as usize,
            data: &args[ADDR_LEN..],
        }),
        wire::CMD_WUSER if args.len() == WUSER_LEN => {
            let mut words = [0u8; WUSER_LEN];
            words.copy_from_slice(args);
            Ok(WriteUserPage { words })
        }
        wire::CMD_RRANGE if args.len() == ADDR_LEN + RRANGE_LEN_LEN => {
            let len = LittleEndian::read_u16(&args[ADDR_LEN..ADDR_LEN + RRANGE_LEN_LEN]) as usize;
            if len >= TX_CAP / 2 {
                return Err(BadArgs);
            }
            Ok(ReadRange {
                addr: LittleEndian::read_u32(&args[..ADDR_LEN]) as usize,
                len,
            })
        }
        wire::CMD_CRCIF if args.len() == ADDR_LEN + CRCIF_LEN_LEN => {
            let len = LittleEndian::read_u32(&args[ADDR_LEN..ADDR_LEN + CRCIF_LEN_LEN]) as usize;
            if len >= CODE_CEILING {
                return Err(BadArgs);
            }
            Ok(CrcInternalFlash {
                addr: LittleEndian::read_u32(&args[..ADDR_LEN]) as usize,
                len,
            })
        }
        wire::CMD_SATTR if args.len() > attributes::KEY_LEN + 1 => {
            let index = args[0] as usize;
            let mut key = [0u8; attributes::KEY_LEN];
            key.copy_from_slice(&args[1..1 + attributes::KEY_LEN]);
            let value_len = args[1 + attributes::KEY_LEN] as usize;
            let value_start = 2 + attributes::KEY_LEN;
            if value_len > attributes::MAX_VALUE_LEN || args.len() != value_start + value_len {
                return Err(BadArgs);
            }
            Ok(SetAttribute { index, key, value_len, value_start })
        }
        wire::CMD_GATTR if args.len() == 1 => Ok(GetAttribute { index: args[0] as usize }),
        wire::CMD_CHANGE_BAUD if args.len() == 4 => Ok(ChangeBaud {
            rate: LittleEndian::read_u32(args),
        }),
        c if wire::EXTERNAL_FLASH_COMMANDS.contains(&c) => Ok(Unsupported),
        _ if is_known_shape_mismatch(cmd) => Err(BadArgs),
        _ => Ok(Unrecognized),
    }
}

/// Commands whose byte is recognised but whose argument shape just
/// decoded to `Err` above - separated out so an actually-unknown command
/// byte still reports `RES_UNKNOWN` rather than `RES_BADARGS`.
fn is_known_shape_mismatch(cmd: u8) -> bool {
    matches!(
        cmd,
        wire::CMD_PING
            | wire::CMD_INFO
            | wire::CMD_ID
            | wire::CMD_EPAGE
            | wire::CMD_WPAGE
            | wire::CMD_WUSER
            | wire::CMD_RRANGE
            | wire::CMD_CRCIF
            | wire::CMD_SATTR
            | wire::CMD_GATTR
            | wire::CMD_CHANGE_BAUD
    )
}

fn map_err(err: BootloaderError) -> u8 {
    match err {
        BootloaderError::FlashFault => wire::RES_INTERROR,
        BootloaderError::OutOfRange | BootloaderError::Misaligned | BootloaderError::Overrun => {
            wire::RES_BADADDR
        }
    }
}

/// Run one framed command to completion, staging its response.
pub fn dispatch<F: FlashInterface>(
    flash: &mut F,
    state: &mut BootloaderState,
    cfg: &BoardConfig,
    cmd: u8,
    args_len: usize,
) -> DispatchOutcome {
    use crate::baud::BaudPhase;

    crate::trace_log!("dispatch: cmd={:#x} args_len={}", cmd, args_len);

    let args: &[u8] = &state.rx_buf[..args_len];

    let decoded = match decode(cmd, args) {
        Ok(c) => c,
        Err(BadArgs) => {
            if state.baud.phase == BaudPhase::WaitingConfirmation {
                state.baud.fail();
                response::emit(state, wire::RES_CHANGE_BAUD_FAIL, &[]);
            } else {
                response::emit(state, wire::RES_BADARGS, &[]);
            }
            return DispatchOutcome::Responded;
        }
    };

    // While waiting to see whether a rate switch worked, only a matching
    // CHANGE_BAUD confirms it - anything else, including a mismatched
    // rate, proves the new rate is unreliable and fails the handshake.
    if state.baud.phase == BaudPhase::WaitingConfirmation {
        match decoded {
            Command::ChangeBaud { rate } if rate == state.baud.pending_rate => {
                state.baud.confirm();
                response::emit(state, wire::RES_OK, &[]);
            }
            _ => {
                state.baud.fail();
                response::emit(state, wire::RES_CHANGE_BAUD_FAIL, &[]);
            }
        }
        return DispatchOutcome::Responded;
    }

    match decoded {
        Command::Ping => response::emit(state, wire::RES_PONG, &[]),
        Command::Info => {
            let mut buf = [0u8; 1 + INFO_BANNER_LEN];
            let banner = cfg.version.as_bytes();
            let n = banner.len().min(INFO_BANNER_LEN);
            buf[0] = n as u8;
            buf[1..1 + n].copy_from_slice(&banner[..n]);
            response::emit(state, wire::RES_INFO, &buf);
        }
        Command::Id => response::emit_nothing(state),
        Command::Reset => {
            state.reset_rx();
            response::emit_nothing(state);
        }
        Command::ClockOut => {
            response::emit_nothing(state);
            return DispatchOutcome::RouteClockForever;
        }
        Command::ErasePage { addr } => match flashops::erase_page(flash, addr) {
            Ok(_) => response::emit(state, wire::RES_OK, &[]),
            Err(e) => response::emit(state, map_err(e), &[]),
        },
        Command::WritePage { addr, data } => match flashops::write_page(flash, addr, data) {
            Ok(()) => response::emit(state, wire::RES_OK, &[]),
            Err(e) => response::emit(state, map_err(e), &[]),
        },
        Command::WriteUserPage { words } => match flashops::write_user_page(flash, &words) {
            Ok(()) => response::emit(state, wire::RES_OK, &[]),
            Err(e) => response::emit(state, map_err(e), &[]),
        },
        Command::CrcRx => {
            let crc = bootloader_hal::crc::crc32_update(bootloader_hal::crc::INITIAL, args);
            let mut buf = [0u8; 6];
            LittleEndian::write_u16(&mut buf[..2], args.len() as u16);
            LittleEndian::write_u32(&mut buf[2..], crc);
            response::emit(state, wire::RES_CRCRX, &buf);
        }
        Command::ReadRange { addr, len } => {
            let mut buf = [0u8; RRANGE_MAX_LEN];
            match flashops::read_range(flash, addr, len, &mut buf[..len]) {
                Ok(()) => response::emit(state, wire::RES_RRANGE, &buf[..len]),
                Err(e) => response::emit(state, map_err(e), &[]),
            }
        }
        Command::CrcInternalFlash { addr, len } => match flashops::crc_range(flash, addr, len) {
            Ok(crc) => {
                let mut buf = [0u8; 4];
                LittleEndian::write_u32(&mut buf, crc);
                response::emit(state, wire::RES_CRCIF, &buf);
            }
            Err(e) => response::emit(state, map_err(e), &[]),
        },
        Command::SetAttribute { index, key, value_len, value_start } => {
            let value = &args[value_start..value_start + value_len];
            match attributes::set(flash, index, &key, value) {
                Ok(()) => response::emit(state, wire::RES_OK, &[]),
                Err(e) => response::emit(state, map_err(e), &[]),
            }
        }
        Command::GetAttribute { index } => {
            let mut buf = [0u8; ATTR_SLOT];
            match attributes::get(flash, index, &mut buf) {
                Ok(()) => response::emit(state, wire::RES_GATTR, &buf),
                Err(e) => response::emit(state, map_err(e), &[]),
            }
        }
        Command::ChangeBaud { rate } => {
            state.baud.begin_change(cfg.initial_baud, rate);
            response::emit(state, wire::RES_OK, &[]);
        }
        Command::Unsupported => response::emit(state, wire::RES_UNKNOWN, &[]),
        Command::Unrecognized => response::emit(state, wire::RES_UNKNOWN, &[]),
    }

    DispatchOutcome::Responded
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootloader_hal::FlashFault;

    struct NullFlash;
    impl FlashInterface for NullFlash {
        fn hal_flash_erase(&mut self, _: usize, _: usize) -> core::result::Result<(), FlashFault> {
            Ok(())
        }
        fn hal_flash_write(&mut self, _: usize, _: &[u8]) -> core::result::Result<(), FlashFault> {
            Ok(())
        }
        fn hal_flash_read(&self, _: usize, buf: &mut [u8]) {
            buf.fill(0xFF);
        }
        fn hal_is_erased(&self, _: usize, _: usize) -> bool {
            true
        }
        fn hal_invalidate_cache(&mut self) {}
        fn hal_crc32(&self, _: usize, _: usize) -> u32 {
            0
        }
    }

    const CFG: BoardConfig = BoardConfig {
        name: "test-board",
        version: "bootloader-0.1.0",
        initial_baud: 115_200,
        default_attrs: &[],
    };

    fn run(flash: &mut NullFlash, state: &mut BootloaderState, cmd: u8, args: &[u8]) -> DispatchOutcome {
        state.rx_buf[..args.len()].copy_from_slice(args);
        dispatch(flash, state, &CFG, cmd, args.len())
    }

    #[test]
    fn ping_gets_pong() {
        let mut flash = NullFlash;
        let mut state = BootloaderState::new(115_200);
        run(&mut flash, &mut state, wire::CMD_PING, &[]);
        assert_eq!(crate::response::next_byte(&mut state), Some(wire::ESC));
        assert_eq!(crate::response::next_byte(&mut state), Some(wire::RES_PONG));
        assert_eq!(crate::response::next_byte(&mut state), None);
    }

    #[test]
    fn ping_with_arguments_is_bad_args() {
        let mut flash = NullFlash;
        let mut state = BootloaderState::new(115_200);
        run(&mut flash, &mut state, wire::CMD_PING, &[1]);
        assert_eq!(crate::response::next_byte(&mut state), Some(wire::ESC));
        assert_eq!(crate::response::next_byte(&mut state), Some(wire::RES_BADARGS));
    }

    #[test]
    fn reset_and_id_respond_with_nothing() {
        let mut flash = NullFlash;
        let mut state = BootloaderState::new(115_200);
        run(&mut flash, &mut state, wire::CMD_RESET, &[]);
        assert_eq!(crate::response::next_byte(&mut state), None);
        run(&mut flash, &mut state, wire::CMD_ID, &[]);
        assert_eq!(crate::response::next_byte(&mut state), None);
    }

    #[test]
    fn clkout_reports_route_clock_forever() {
        let mut flash = NullFlash;
        let mut state = BootloaderState::new(115_200);
        let outcome = run(&mut flash, &mut state, wire::CMD_CLKOUT, &[]);
        assert_eq!(outcome, DispatchOutcome::RouteClockForever);
    }

    #[test]
    fn crcrx_on_empty_rx_reports_length_zero_and_untouched_crc_seed() {
        let mut flash = NullFlash;
        let mut state = BootloaderState::new(115_200);
        run(&mut flash, &mut state, wire::CMD_CRCRX, &[]);
        let mut out = std::vec::Vec::new();
        while let Some(b) = crate::response::next_byte(&mut state) {
            out.push(b);
        }
        assert_eq!(out, std::vec![wire::ESC, wire::RES_CRCRX, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn crcrx_reports_the_length_and_crc_of_whatever_was_buffered() {
        let mut flash = NullFlash;
        let mut state = BootloaderState::new(115_200);
        run(&mut flash, &mut state, wire::CMD_CRCRX, &[0x00, 0xFC, 0x01]);
        let mut out = std::vec::Vec::new();
        while let Some(b) = crate::response::next_byte(&mut state) {
            out.push(b);
        }
        let expected_crc = bootloader_hal::crc::crc32_update(bootloader_hal::crc::INITIAL, &[0x00, 0xFC, 0x01]);
        let mut expected = std::vec![wire::ESC, wire::RES_CRCRX, 0x03, 0x00];
        expected.extend_from_slice(&expected_crc.to_le_bytes());
        assert_eq!(out, expected);
    }

    #[test]
    fn rrange_at_or_above_half_tx_cap_is_bad_args() {
        let mut flash = NullFlash;
        let mut state = BootloaderState::new(115_200);
        let mut args = [0u8; 6];
        LittleEndian::write_u32(&mut args[..4], 0xFF00);
        LittleEndian::write_u16(&mut args[4..], (TX_CAP / 2) as u16);
        run(&mut flash, &mut state, wire::CMD_RRANGE, &args);
        assert_eq!(crate::response::next_byte(&mut state), Some(wire::ESC));
        assert_eq!(crate::response::next_byte(&mut state), Some(wire::RES_BADARGS));
    }

    #[test]
    fn rrange_above_a_page_is_no_longer_rejected() {
        let mut flash = NullFlash;
        let mut state = BootloaderState::new(115_200);
        let mut args = [0u8; 6];
        LittleEndian::write_u32(&mut args[..4], crate::flashmap::CODE_FLOOR as u32);
        LittleEndian::write_u16(&mut args[4..], 600);
        run(&mut flash, &mut state, wire::CMD_RRANGE, &args);
        assert_eq!(crate::response::next_byte(&mut state), Some(wire::ESC));
        assert_eq!(crate::response::next_byte(&mut state), Some(wire::RES_RRANGE));
    }

    #[test]
    fn wuser_requires_exactly_eight_bytes() {
        let mut flash = NullFlash;
        let mut state = BootloaderState::new(115_200);
        run(&mut flash, &mut state, wire::CMD_WUSER, &[0u8; 4]);
        assert_eq!(crate::response::next_byte(&mut state), Some(wire::ESC));
        assert_eq!(crate::response::next_byte(&mut state), Some(wire::RES_BADARGS));
    }

    #[test]
    fn unrecognized_command_byte_reports_unknown() {
        let mut flash = NullFlash;
        let mut state = BootloaderState::new(115_200);
        run(&mut flash, &mut state, 0x7F, &[]);
        assert_eq!(crate::response::next_byte(&mut state), Some(wire::ESC));
        assert_eq!(crate::response::next_byte(&mut state), Some(wire::RES_UNKNOWN));
    }

    #[test]
    fn external_flash_command_reports_unknown() {
        let mut flash = NullFlash;
        let mut state = BootloaderState::new(115_200);
        run(&mut flash, &mut state, wire::CMD_XEBLOCK, &[]);
        assert_eq!(crate::response::next_byte(&mut state), Some(wire::ESC));
        assert_eq!(crate::response::next_byte(&mut state), Some(wire::RES_UNKNOWN));
    }

    #[test]
    fn matching_change_baud_confirms_and_ends_negotiation() {
        let mut flash = NullFlash;
        let mut state = BootloaderState::new(115_200);
        state.baud.begin_change(115_200, 230_400);
        state.baud.on_tx_drained();
        assert!(state.baud.is_negotiating());
        let mut args = [0u8; 4];
        LittleEndian::write_u32(&mut args, 230_400);
        run(&mut flash, &mut state, wire::CMD_CHANGE_BAUD, &args);
        assert_eq!(state.baud.phase, crate::baud::BaudPhase::Idle);
        assert_eq!(crate::response::next_byte(&mut state), Some(wire::ESC));
        assert_eq!(crate::response::next_byte(&mut state), Some(wire::RES_OK));
    }

    #[test]
    fn other_command_during_confirmation_fails_the_handshake() {
        let mut flash = NullFlash;
        let mut state = BootloaderState::new(115_200);
        state.baud.begin_change(115_200, 230_400);
        state.baud.on_tx_drained();
        run(&mut flash, &mut state, wire::CMD_PING, &[]);
        assert_eq!(state.baud.phase, crate::baud::BaudPhase::Resetting);
        assert_eq!(crate::response::next_byte(&mut state), Some(wire::ESC));
        assert_eq!(crate::response::next_byte(&mut state), Some(wire::RES_CHANGE_BAUD_FAIL));
    }

    #[test]
    fn mismatched_rate_during_confirmation_fails_the_handshake() {
        let mut flash = NullFlash;
        let mut state = BootloaderState::new(115_200);
        state.baud.begin_change(115_200, 230_400);
        state.baud.on_tx_drained();
        let mut args = [0u8; 4];
        LittleEndian::write_u32(&mut args, 9_600);
        run(&mut flash, &mut state, wire::CMD_CHANGE_BAUD, &args);
        assert_eq!(state.baud.phase, crate::baud::BaudPhase::Resetting);
        assert_eq!(crate::response::next_byte(&mut state), Some(wire::ESC));
        assert_eq!(crate::response::next_byte(&mut state), Some(wire::RES_CHANGE_BAUD_FAIL));
    }

    #[test]
    fn change_baud_stages_an_ok_and_begins_negotiation() {
        let mut flash = NullFlash;
        let mut state = BootloaderState::new(115_200);
        let mut args = [0u8; 4];
        LittleEndian::write_u32(&mut args, 230_400);
        run(&mut flash, &mut state, wire::CMD_CHANGE_BAUD, &args);
        assert!(state.baud.is_negotiating());
        assert_eq!(crate::response::next_byte(&mut state), Some(wire::ESC));
        assert_eq!(crate::response::next_byte(&mut state), Some(wire::RES_OK));
    }
}
