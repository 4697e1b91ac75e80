use core::arch::asm;

use avr_device::atmega328p::CPU;
use critical_section::CriticalSection;

const SE: u8 = 1 << 0;
/// SM2..0 cleared selects idle mode
const SLEEP_IDLE: u8 = 0;

pub struct Power {
    _private: (),
}

impl Power {
    /// Select idle sleep and leave the sleep enable bit set
    pub fn new() -> Self {
        unsafe {
            let p = CPU::ptr();
            (*p).smcr.write(|w| w.bits(SLEEP_IDLE | SE));
        }
        Self { _private: () }
    }

    /// Sleep for as long as `pending` holds. The condition is checked with
    /// interrupts disabled; `sei` and `sleep` run back to back so a wake-up
    /// interrupt cannot slip in between check and sleep.
    pub fn idle_while<F>(&mut self, mut pending: F)
    where
        F: FnMut(CriticalSection<'_>) -> bool,
    {
        loop {
            avr_device::interrupt::disable();
            let cs = unsafe { CriticalSection::new() };
            if !pending(cs) {
                unsafe { avr_device::interrupt::enable() };
                return;
            }
            unsafe { asm!("sei", "sleep") };
        }
    }
}

impl Default for Power {
    fn default() -> Self {
        Self::new()
    }
}
