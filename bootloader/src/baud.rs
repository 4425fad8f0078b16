//! In-band baud-rate renegotiation handshake.
//!
//! The host asks to change baud, the device acks at the *old* rate, then
//! both sides switch. The device only commits once the host's next command
//! arrives correctly framed at the *new* rate - proving the switch worked -
//! otherwise it reverts.

/// Where the handshake currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaudPhase {
    /// No negotiation in progress.
    Idle,
    /// Ack staged, waiting for it to finish transmitting at the old rate.
    Changing,
    /// Peripheral has been reinitialised at the new rate; waiting to see
    /// whether the host's next command arrives intact.
    WaitingConfirmation,
    /// Confirmation failed; peripheral is being restored to the old rate.
    Resetting,
}

/// Baud-rate negotiation state, owned by [`crate::state::BootloaderState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaudState {
    pub phase: BaudPhase,
    pub pending_rate: u32,
    pub previous_rate: u32,
}

impl BaudState {
    pub const fn new(initial_rate: u32) -> Self {
        BaudState {
            phase: BaudPhase::Idle,
            pending_rate: 0,
            previous_rate: initial_rate,
        }
    }

    /// Host asked to change to `rate`. Stages the ack; the caller is
    /// responsible for actually queuing the `CHANGE_BAUD` response bytes.
    pub fn begin_change(&mut self, current_rate: u32, rate: u32) {
        crate::debug_log!("baud: change requested {} -> {}", current_rate, rate);
        self.phase = BaudPhase::Changing;
        self.pending_rate = rate;
        self.previous_rate = current_rate;
    }

    /// The staged ack has fully left the shift register at the old rate.
    /// Returns the rate the UART should now be reinitialised to.
    pub fn on_tx_drained(&mut self) -> Option<u32> {
        if self.phase == BaudPhase::Changing {
            self.phase = BaudPhase::WaitingConfirmation;
            Some(self.pending_rate)
        } else {
            None
        }
    }

    /// A full command was framed while waiting for confirmation. Whatever
    /// command it was, successfully framing it proves the new rate works.
    pub fn confirm(&mut self) {
        if self.phase == BaudPhase::WaitingConfirmation {
            self.phase = BaudPhase::Idle;
        }
    }

    /// Confirmation failed (overflow, or the 10-byte cap was hit without a
    /// complete frame). Returns the rate the UART must be restored to.
    pub fn fail(&mut self) -> Option<u32> {
        if self.phase == BaudPhase::WaitingConfirmation {
            crate::debug_log!("baud: confirmation timed out, reverting to {}", self.previous_rate);
            self.phase = BaudPhase::Resetting;
            Some(self.previous_rate)
        } else {
            None
        }
    }

    /// The revert to the old rate has completed.
    pub fn reset_done(&mut self) {
        if self.phase == BaudPhase::Resetting {
            self.phase = BaudPhase::Idle;
        }
    }

    pub fn is_negotiating(&self) -> bool {
        self.phase != BaudPhase::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_returns_to_idle() {
        let mut b = BaudState::new(115200);
        b.begin_change(115200, 230400);
        assert_eq!(b.phase, BaudPhase::Changing);
        assert_eq!(b.on_tx_drained(), Some(230400));
        assert_eq!(b.phase, BaudPhase::WaitingConfirmation);
        b.confirm();
        assert_eq!(b.phase, BaudPhase::Idle);
    }

    #[test]
    fn failed_confirmation_reverts_to_previous_rate() {
        let mut b = BaudState::new(115200);
        b.begin_change(115200, 230400);
        b.on_tx_drained();
        assert_eq!(b.fail(), Some(115200));
        assert_eq!(b.phase, BaudPhase::Resetting);
        b.reset_done();
        assert_eq!(b.phase, BaudPhase::Idle);
    }

    #[test]
    fn on_tx_drained_is_a_no_op_outside_changing() {
        let mut b = BaudState::new(115200);
        assert_eq!(b.on_tx_drained(), None);
    }
}
