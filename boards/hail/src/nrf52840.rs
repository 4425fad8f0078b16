//! `bootloader_hal` trait impls over the nRF52840's NVMC and UARTE
//! peripherals. Word-at-a-time flash writes and the readynext/ready
//! polling follow the controller's own programming sequence.

use nrf52840_hal::pac::{NVMC, UARTE0};

use bootloader_hal::{FlashFault, FlashInterface, GpioInterface, UartInterface};

pub const FLASH_PAGE_SIZE: usize = 4096;

pub struct Flash {
    nvmc: NVMC,
}

impl Flash {
    pub fn new(nvmc: NVMC) -> Self {
        Flash { nvmc }
    }
}

impl FlashInterface for Flash {
    fn hal_flash_erase(&mut self, addr: usize, len: usize) -> Result<(), FlashFault> {
        for page in (addr..addr + len).step_by(FLASH_PAGE_SIZE) {
            self.nvmc.config.write(|w| w.wen().een());
            while self.nvmc.ready.read().ready().is_busy() {}
            self.nvmc
                .erasepage()
                .write(|w| unsafe { w.erasepage().bits(page as u32) });
            while self.nvmc.ready.read().ready().is_busy() {}
        }
        self.nvmc.config.write(|w| w.wen().ren());
        Ok(())
    }

    fn hal_flash_write(&mut self, addr: usize, data: &[u8]) -> Result<(), FlashFault> {
        self.nvmc.config.write(|w| w.wen().wen());
        while self.nvmc.readynext.read().readynext().is_busy() {}

        for (word_idx, chunk) in data.chunks(4).enumerate() {
            let mut word = [0xFFu8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            let dst = (addr + word_idx * 4) as *mut u32;
            unsafe { *dst = u32::from_le_bytes(word) };
            while self.nvmc.ready.read().ready().is_busy() {}
        }

        self.nvmc.config.write(|w| w.wen().ren());
        Ok(())
    }

    fn hal_flash_read(&self, addr: usize, buf: &mut [u8]) {
        let src = addr as *const u8;
        for (i, b) in buf.iter_mut().enumerate() {
            *b = unsafe { *src.add(i) };
        }
    }

    fn hal_is_erased(&self, addr: usize, len: usize) -> bool {
        let src = addr as *const u8;
        (0..len).all(|i| unsafe { *src.add(i) } == 0xFF)
    }

    fn hal_invalidate_cache(&mut self) {}

    fn hal_crc32(&self, addr: usize, len: usize) -> u32 {
        let mut buf = [0u8; 1];
        let mut crc = bootloader_hal::crc::INITIAL;
        for i in 0..len {
            self.hal_flash_read(addr + i, &mut buf);
            crc = bootloader_hal::crc::crc32_update(crc, &buf);
        }
        crc
    }
}

pub struct Uart {
    uarte: UARTE0,
}

impl Uart {
    pub fn new(uarte: UARTE0) -> Self {
        Uart { uarte }
    }
}

impl UartInterface for Uart {
    fn hal_rx_byte(&mut self) -> Option<u8> {
        if self.uarte.events_endrx.read().bits() != 0 {
            self.uarte.events_endrx.reset();
            Some(self.uarte.rxd.ptr.read().bits() as u8)
        } else {
            None
        }
    }

    fn hal_tx_ready(&self) -> bool {
        self.uarte.events_txstarted.read().bits() == 0
    }

    fn hal_tx_empty(&self) -> bool {
        self.uarte.events_endtx.read().bits() != 0
    }

    fn hal_write_byte(&mut self, byte: u8) {
        self.uarte.txd.ptr.write(|w| unsafe { w.bits(byte as u32) });
        self.uarte.tasks_starttx.write(|w| unsafe { w.bits(1) });
    }

    fn hal_reinit(&mut self, baud_rate: u32) {
        let raw = match baud_rate {
            9_600 => 0x0027_0000,
            115_200 => 0x01D7_E000,
            230_400 => 0x03AF_B000,
            _ => 0x01D7_E000,
        };
        self.uarte.baudrate.write(|w| unsafe { w.bits(raw) });
    }
}

pub struct SelectPin;

impl GpioInterface for SelectPin {
    fn hal_pin_is_low(&mut self) -> bool {
        false
    }
}
