//! Store program memory instruction wrappers. These only work from code
//! placed in the boot section.

use core::arch::asm;

use avr_device::atmega328p::CPU;

use crate::drivers::flash::SelfProgram;

const SPMEN: u8 = 1 << 0;
const PGERS: u8 = 1 << 1;
const PGWRT: u8 = 1 << 2;
const RWWSRE: u8 = 1 << 4;

pub struct Spm {
    _private: (),
}

impl Spm {
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for Spm {
    fn default() -> Self {
        Self::new()
    }
}

/// Issue an SPM command with the page address in Z. SPMCSR sits at I/O
/// address 0x37 and `spm` must follow the write within 4 cycles, so
/// interrupts stay masked while the command is issued.
#[inline(always)]
fn spm(address: u16, command: u8) {
    avr_device::interrupt::free(|_| unsafe {
        asm!(
            "out 0x37, {command}",
            "spm",
            command = in(reg) command,
            in("Z") address,
        );
    });
}

impl SelfProgram for Spm {
    fn is_busy(&self) -> bool {
        unsafe { (*CPU::ptr()).spmcsr.read().bits() & SPMEN != 0 }
    }

    fn erase_page(&mut self, address: u16) {
        spm(address, PGERS | SPMEN);
    }

    fn fill_word(&mut self, address: u16, word: u16) {
        // r0:r1 carry the word, r1 is the zero register and has to be restored
        avr_device::interrupt::free(|_| unsafe {
            asm!(
                "movw r0, {word}",
                "out 0x37, {command}",
                "spm",
                "clr r1",
                word = in(reg_pair) word,
                command = in(reg) SPMEN,
                in("Z") address,
            );
        });
    }

    fn write_page(&mut self, address: u16) {
        spm(address, PGWRT | SPMEN);
    }

    fn enable_rww(&mut self) {
        while self.is_busy() {}
        spm(0, RWWSRE | SPMEN);
    }

    fn read_byte(&self, address: u16) -> u8 {
        let byte: u8;
        unsafe {
            asm!(
                "lpm {byte}, Z",
                byte = out(reg) byte,
                in("Z") address,
                options(readonly, nostack),
            );
        }
        byte
    }
}
