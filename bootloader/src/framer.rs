//! The escape-byte automaton that turns a raw byte stream into argument
//! bytes plus a terminating command byte.
//!
//! A frame is: zero or more argument bytes, each either a literal byte or
//! an escaped `ESC ESC` pair standing for a literal `0xFC`, followed by
//! `ESC <command>` where `<command>` is anything other than `ESC`. The
//! argument bytes accumulated since the last reset sit in
//! [`BootloaderState::rx_buf`] when [`FrameEvent::Command`] fires.

use crate::state::BootloaderState;
use crate::wire::ESC;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEvent {
    /// No complete frame yet; keep feeding bytes.
    None,
    /// The receive buffer filled before a command byte arrived.
    Overflow,
    /// A full frame arrived; `rx_buf[..rx_len]` holds its arguments.
    Command(u8),
}

/// Feed one byte off the wire into the automaton.
pub fn feed_byte(state: &mut BootloaderState, byte: u8) -> FrameEvent {
    if state.escape_pending {
        state.escape_pending = false;
        if byte == ESC {
            return push_arg_byte(state, ESC);
        }
        return FrameEvent::Command(byte);
    }

    if byte == ESC {
        state.escape_pending = true;
        return FrameEvent::None;
    }

    push_arg_byte(state, byte)
}

fn push_arg_byte(state: &mut BootloaderState, byte: u8) -> FrameEvent {
    if state.rx_len >= state.rx_buf.len() {
        return FrameEvent::Overflow;
    }
    state.rx_buf[state.rx_len] = byte;
    state.rx_len += 1;
    FrameEvent::None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(state: &mut BootloaderState, bytes: &[u8]) -> FrameEvent {
        let mut last = FrameEvent::None;
        for &b in bytes {
            last = feed_byte(state, b);
        }
        last
    }

    #[test]
    fn bare_command_with_no_arguments() {
        let mut st = BootloaderState::new(115200);
        let ev = feed(&mut st, &[ESC, 0x01]);
        assert_eq!(ev, FrameEvent::Command(0x01));
        assert_eq!(st.rx_len, 0);
    }

    #[test]
    fn argument_bytes_accumulate_before_the_command() {
        let mut st = BootloaderState::new(115200);
        let ev = feed(&mut st, &[0xAA, 0xBB, ESC, 0x07]);
        assert_eq!(ev, FrameEvent::Command(0x07));
        assert_eq!(&st.rx_buf[..st.rx_len], &[0xAA, 0xBB]);
    }

    #[test]
    fn escaped_sentinel_is_a_literal_data_byte() {
        let mut st = BootloaderState::new(115200);
        let ev = feed(&mut st, &[ESC, ESC, ESC, 0x01]);
        assert_eq!(ev, FrameEvent::Command(0x01));
        assert_eq!(&st.rx_buf[..st.rx_len], &[ESC]);
    }

    #[test]
    fn overflow_fires_once_the_buffer_is_full() {
        let mut st = BootloaderState::new(115200);
        for _ in 0..st.rx_buf.len() {
            assert_eq!(feed_byte(&mut st, 0x00), FrameEvent::None);
        }
        assert_eq!(feed_byte(&mut st, 0x00), FrameEvent::Overflow);
    }
}
