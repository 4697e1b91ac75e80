use avr_device::atmega328p::TC0;

use crate::config::TICK_COMPARE;

const WGM_CTC: u8 = 0x02;
const OCIE0A: u8 = 1 << 1;
/// CS0 bits for clk/64
const CLK_DIV_64: u8 = 0x03;

/// Timer 0 in CTC mode, raising TIMER0_COMPA once per millisecond
pub struct SysTick {
    _private: (),
}

impl SysTick {
    pub fn start() -> Self {
        unsafe {
            let p = TC0::ptr();
            (*p).tccr0a.write(|w| w.bits(WGM_CTC));
            (*p).ocr0a.write(|w| w.bits(TICK_COMPARE));
            (*p).tcnt0.write(|w| w.bits(0));
            (*p).tccr0b.write(|w| w.bits(CLK_DIV_64));
            (*p).timsk0.write(|w| w.bits(OCIE0A));
        }
        Self { _private: () }
    }
}
