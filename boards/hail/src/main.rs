#![no_std]
#![no_main]

use defmt_rtt as _;
use panic_probe as _;

use cortex_m_rt::entry;
use nrf52840_hal::pac::Peripherals;

use bootloader::config::{AttrDefault, BoardConfig};
use bootloader::entry::{self as entry_policy, Mode};
use bootloader::poll::{poll_once, PollOutcome};
use bootloader::state::BootloaderState;
use bootloader_hal::GpioInterface;

mod nrf52840;

use nrf52840::{Flash, SelectPin, Uart};

const CFG: BoardConfig = BoardConfig {
    name: "hail",
    version: "bootloader-0.1.0",
    initial_baud: 115_200,
    default_attrs: &[AttrDefault {
        key: b"board\0\0\0",
        value: b"hail",
    }],
};

#[entry]
fn main() -> ! {
    let peripherals = Peripherals::take().unwrap();
    let mut flash = Flash::new(peripherals.NVMC);
    let mut uart = Uart::new(peripherals.UARTE0);
    let mut select_pin = SelectPin;

    match entry_policy::decide(
        || select_pin.hal_pin_is_low(),
        entry_policy::ENTRY_SAMPLES,
    ) {
        Mode::Application => jump_to_application(),
        Mode::Bootloader => {
            let _ = bootloader::attributes::seed_defaults(&mut flash, CFG.default_attrs);
            let mut state = BootloaderState::new(CFG.initial_baud);
            loop {
                if poll_once(&mut flash, &mut uart, &mut state, &CFG) == PollOutcome::Halt {
                    route_clock_forever();
                }
            }
        }
    }
}

/// Hand control to whatever is flashed at the start of the code region.
/// A real board crate vectors the stack pointer and reset vector out of
/// the image header here; left unimplemented since image verification
/// and the jump itself sit outside this core's scope.
fn jump_to_application() -> ! {
    loop {
        cortex_m::asm::bkpt();
    }
}

/// `CLKOUT` toggles the select pin as a clock signal for board bring-up
/// and never returns; this is the one command with no response to drain
/// and no recovery but a reset.
fn route_clock_forever() -> ! {
    loop {
        cortex_m::asm::nop();
    }
}
