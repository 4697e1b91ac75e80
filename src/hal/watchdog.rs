/// Watchdog prescaler settings as laid out in WDTCSR (WDP3 sits at bit 5)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum WatchdogTimeout {
    Ms16 = 0,
    Ms32 = 1,
    Ms64 = 2,
    Ms125 = 3,
    Ms250 = 4,
    Ms500 = 5,
    Ms1000 = 6,
    Ms2000 = 7,
    Ms4000 = 0x20,
    Ms8000 = 0x21,
}

#[cfg(target_arch = "avr")]
pub use self::device::Watchdog;

#[cfg(target_arch = "avr")]
mod device {
    use super::WatchdogTimeout;
    use avr_device::atmega328p::WDT;

    const WDCE: u8 = 1 << 4;
    const WDE: u8 = 1 << 3;

    pub struct Watchdog {
        _private: (),
    }

    impl Watchdog {
        #[inline]
        pub fn new() -> Self {
            Self { _private: () }
        }

        /// Arm the watchdog in system reset mode
        #[inline]
        pub fn start(&mut self, timeout: WatchdogTimeout) {
            avr_device::interrupt::free(|_| unsafe {
                let p = WDT::ptr();
                avr_device::asm::wdr();
                // Timed sequence: change enable, then the new setting within 4 cycles
                (*p).wdtcsr.write(|w| w.bits(WDCE | WDE));
                (*p).wdtcsr.write(|w| w.bits(WDE | timeout as u8));
            });
        }

        /// WDRF in MCUSR must already be clear, it forces WDE on
        #[inline]
        pub fn disable(&mut self) {
            avr_device::interrupt::free(|_| unsafe {
                let p = WDT::ptr();
                avr_device::asm::wdr();
                (*p).wdtcsr.write(|w| w.bits(WDCE | WDE));
                (*p).wdtcsr.write(|w| w.bits(0x00));
            });
        }
    }

    impl Default for Watchdog {
        fn default() -> Self {
            Self::new()
        }
    }
}
