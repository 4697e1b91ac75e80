use core::arch::asm;
use core::mem::MaybeUninit;
use core::ptr::{addr_of, addr_of_mut};

use avr_device::atmega328p::CPU;

use super::watchdog::{Watchdog, WatchdogTimeout};
use crate::bootloader::handshake::{BootControl, ResetCause};

const IVCE: u8 = 1 << 0;
const IVSEL: u8 = 1 << 1;

/// Reset cause bits of MCUSR
const RESET_FLAGS: u8 = 0x0f;

/// Left alone by the startup code, so it survives watchdog and external
/// resets
#[link_section = ".noinit"]
static mut BOOT_SIGNATURE: MaybeUninit<[u8; 2]> = MaybeUninit::uninit();

/// MCUSR, the boot signature and the watchdog
pub struct BootRegisters {
    cause: ResetCause,
    watchdog: Watchdog,
}

impl BootRegisters {
    /// Latch and clear the reset flags. Must run once, before anything
    /// touches the watchdog.
    pub fn take() -> Self {
        let bits = unsafe {
            let p = CPU::ptr();
            let bits = (*p).mcusr.read().bits();
            (*p).mcusr.write(|w| w.bits(0));
            bits
        };
        Self {
            cause: ResetCause::from_bits(bits & RESET_FLAGS),
            watchdog: Watchdog::new(),
        }
    }
}

impl BootControl for BootRegisters {
    fn reset_cause(&self) -> ResetCause {
        self.cause
    }

    fn signature(&self) -> [u8; 2] {
        unsafe { core::ptr::read_volatile(addr_of!(BOOT_SIGNATURE) as *const [u8; 2]) }
    }

    fn set_signature(&mut self, signature: [u8; 2]) {
        unsafe { core::ptr::write_volatile(addr_of_mut!(BOOT_SIGNATURE) as *mut [u8; 2], signature) }
    }

    fn start_watchdog(&mut self, timeout: WatchdogTimeout) {
        self.watchdog.start(timeout);
    }

    fn stop_watchdog(&mut self) {
        self.watchdog.disable();
    }

    /// The application finds the reset cause in r2
    fn jump_to_application(&mut self, cause: ResetCause) -> ! {
        unsafe {
            asm!(
                "jmp 0",
                in("r2") cause.bits(),
                options(noreturn),
            )
        }
    }

    fn wait_for_reset(&mut self) -> ! {
        unsafe { avr_device::interrupt::enable() };
        loop {
            avr_device::asm::sleep();
        }
    }
}

/// Point the interrupt vectors at the start of the boot section
pub fn move_vectors_to_boot_section() {
    avr_device::interrupt::free(|_| unsafe {
        let p = CPU::ptr();
        (*p).mcucr.write(|w| w.bits(IVCE));
        (*p).mcucr.write(|w| w.bits(IVSEL));
    });
}
