//! The non-blocking poll loop: pulls bytes off the UART into the framer,
//! dispatches complete commands, drains staged responses, and advances
//! the baud negotiator on the TX-empty edge. Runs forever; never blocks,
//! so a board's `main` can interleave it with anything else it needs to
//! service (watchdog kicks, LEDs, ...).

use bootloader_hal::{FlashInterface, UartInterface};

use crate::config::BoardConfig;
use crate::dispatch::DispatchOutcome;
use crate::framer::{self, FrameEvent};
use crate::state::BootloaderState;
use crate::{dispatch, response};

/// Cap on bytes accepted while waiting to see whether a baud change
/// worked - past this the host never framed a byte at all at the new
/// rate, and we give up and revert.
const BAUD_CONFIRM_RX_CAP: usize = 10;

/// What the board's `main` loop should do after one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Keep calling `poll_once`.
    Continue,
    /// `CLKOUT` fired. The caller is expected to never call `poll_once`
    /// again - only a reset recovers from here, matching the original
    /// command's contract.
    Halt,
}

/// Run one iteration: drain at most one pending TX byte, ingest at most
/// one pending RX byte, and advance the baud negotiator. Call in a tight
/// loop from the board's `main`.
pub fn poll_once<F: FlashInterface, U: UartInterface>(
    flash: &mut F,
    uart: &mut U,
    state: &mut BootloaderState,
    cfg: &BoardConfig,
) -> PollOutcome {
    drain_tx(uart, state);
    advance_baud_on_tx_drained(uart, state);
    let outcome = ingest_rx(flash, uart, state, cfg);
    check_baud_confirmation_timeout(uart, state);
    outcome
}

fn drain_tx<U: UartInterface>(uart: &mut U, state: &mut BootloaderState) {
    if uart.hal_tx_ready() {
        if let Some(byte) = response::next_byte(state) {
            uart.hal_write_byte(byte);
        }
    }
}

fn advance_baud_on_tx_drained<U: UartInterface>(uart: &mut U, state: &mut BootloaderState) {
    if !state.tx_drained() || !uart.hal_tx_empty() {
        return;
    }
    if let Some(new_rate) = state.baud.on_tx_drained() {
        crate::debug_log!("baud: reinitialising uart at {}", new_rate);
        uart.hal_reinit(new_rate);
        state.reset_rx();
    }
}

fn ingest_rx<F: FlashInterface, U: UartInterface>(
    flash: &mut F,
    uart: &mut U,
    state: &mut BootloaderState,
    cfg: &BoardConfig,
) -> PollOutcome {
    let byte = match uart.hal_rx_byte() {
        Some(b) => b,
        None => return PollOutcome::Continue,
    };

    match framer::feed_byte(state, byte) {
        FrameEvent::None => PollOutcome::Continue,
        FrameEvent::Overflow => {
            crate::debug_log!("framer: rx buffer overflowed");
            response::emit_overflow(state);
            state.reset_rx();
            PollOutcome::Continue
        }
        FrameEvent::Command(cmd) => {
            let args_len = state.rx_len;
            let outcome = dispatch::dispatch(flash, state, cfg, cmd, args_len);
            state.reset_rx();
            match outcome {
                DispatchOutcome::Responded => PollOutcome::Continue,
                DispatchOutcome::RouteClockForever => {
                    crate::debug_log!("poll: clkout fired, halting the poll loop");
                    PollOutcome::Halt
                }
            }
        }
    }
}

/// Reverts the UART once the negotiator lands in `Resetting`, however it
/// got there - the rx_len cap below, or `dispatch` failing a mismatched
/// or unrelated command while `WaitingConfirmation`.
fn check_baud_confirmation_timeout<U: UartInterface>(uart: &mut U, state: &mut BootloaderState) {
    use crate::baud::BaudPhase;
    if state.baud.phase == BaudPhase::WaitingConfirmation && state.rx_len > BAUD_CONFIRM_RX_CAP {
        state.baud.fail();
    }
    if state.baud.phase == BaudPhase::Resetting {
        uart.hal_reinit(state.baud.previous_rate);
        state.reset_rx();
        state.baud.reset_done();
    }
}
