//! Stages response bytes into [`BootloaderState::tx_buf`] for the poll
//! loop to drain onto the wire, escaping `0xFC` the same way the framer
//! unescapes it on the way in.

use crate::state::BootloaderState;
use crate::wire::{ESC, RES_OVERFLOW};

/// Stage a normal response: `ESC, code`, followed by `payload` with every
/// `0xFC` byte doubled.
pub fn emit(state: &mut BootloaderState, code: u8, payload: &[u8]) {
    state.reset_tx();
    push(state, ESC);
    push(state, code);
    for &byte in payload {
        if byte == ESC {
            push(state, ESC);
        }
        push(state, byte);
    }
}

/// Stage the one response that is never prefixed with `ESC`: the overflow
/// notification, raced out ahead of everything else so the host can tell
/// the receive buffer filled.
pub fn emit_overflow(state: &mut BootloaderState) {
    state.reset_tx();
    push(state, RES_OVERFLOW);
}

/// `RESET` and `ID` answer by staying silent - clear the TX queue without
/// staging any bytes.
pub fn emit_nothing(state: &mut BootloaderState) {
    state.reset_tx();
}

fn push(state: &mut BootloaderState, byte: u8) {
    debug_assert!(state.tx_left < state.tx_buf.len());
    state.tx_buf[state.tx_left] = byte;
    state.tx_left += 1;
}

/// Take the next byte to put on the wire, if any is staged.
pub fn next_byte(state: &mut BootloaderState) -> Option<u8> {
    if state.tx_pos >= state.tx_left {
        return None;
    }
    let byte = state.tx_buf[state.tx_pos];
    state.tx_pos += 1;
    Some(byte)
}
