//! Page oriented self-programming of the on-chip flash

use crate::config::PAGE_SIZE;

/// Self-programming primitives of the flash controller. Each call only
/// issues the operation; completion is observed through `is_busy`.
pub trait SelfProgram {
    /// An erase or page write is still running
    fn is_busy(&self) -> bool;

    /// Start erasing the page containing `address`
    fn erase_page(&mut self, address: u16);

    /// Load one little endian word into the temporary page buffer
    fn fill_word(&mut self, address: u16, word: u16);

    /// Start writing the temporary page buffer to the page at `address`
    fn write_page(&mut self, address: u16);

    /// Re-enable reads of the application section after programming
    fn enable_rww(&mut self);

    fn read_byte(&self, address: u16) -> u8;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Flash,
    Verify,
}

/// Flash content differs from the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mismatch {
    pub address: u16,
    pub expected: u8,
    pub found: u8,
}

/// Collects image bytes into a page buffer and commits whole pages.
///
/// Bytes held in the buffer always belong to `current_page`. A byte for any
/// other page flushes the buffer first.
pub struct FlashProgrammer<F> {
    flash: F,
    mode: Mode,
    page: [u8; PAGE_SIZE],
    current_page: u16,
    dirty: bool,
    pages_written: u16,
}

impl<F: SelfProgram> FlashProgrammer<F> {
    pub fn new(flash: F) -> Self {
        Self {
            flash,
            mode: Mode::Flash,
            page: [0xff; PAGE_SIZE],
            current_page: 0,
            dirty: false,
            pages_written: 0,
        }
    }

    /// Start a pass. Any unflushed bytes from an aborted pass are dropped.
    pub fn begin(&mut self, mode: Mode) {
        self.mode = mode;
        self.new_page();
        self.current_page = 0;
        self.dirty = false;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Take one image byte. In flash mode it lands in the page buffer; in
    /// verify mode it is compared against flash.
    pub fn feed(&mut self, address: u16, byte: u8) -> Result<(), Mismatch> {
        match self.mode {
            Mode::Flash => {
                let page = address / PAGE_SIZE as u16;
                if page != self.current_page {
                    if self.dirty {
                        self.write_current_page();
                    }
                    self.new_page();
                    self.current_page = page;
                }
                self.page[address as usize % PAGE_SIZE] = byte;
                self.dirty = true;
                Ok(())
            }
            Mode::Verify => {
                let found = self.flash.read_byte(address);
                if found == byte {
                    Ok(())
                } else {
                    Err(Mismatch {
                        address,
                        expected: byte,
                        found,
                    })
                }
            }
        }
    }

    /// End of image: commit the partial page and make the application
    /// section readable again.
    pub fn finish(&mut self) {
        if self.mode == Mode::Flash {
            if self.dirty {
                self.write_current_page();
            }
            self.flash.enable_rww();
        }
        self.new_page();
        self.current_page = 0;
        self.dirty = false;
    }

    pub fn read_byte(&self, address: u16) -> u8 {
        self.flash.read_byte(address)
    }

    /// Pages committed since power up
    pub fn pages_written(&self) -> u16 {
        self.pages_written
    }

    pub fn current_page(&self) -> u16 {
        self.current_page
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    pub fn into_flash(self) -> F {
        self.flash
    }

    /// Erase, fill and write the current page, each step running to
    /// completion before the next one is issued.
    fn write_current_page(&mut self) {
        let base = self.current_page * PAGE_SIZE as u16;

        self.wait_ready();
        self.flash.erase_page(base);
        self.wait_ready();

        for (i, pair) in self.page.chunks_exact(2).enumerate() {
            let word = u16::from_le_bytes([pair[0], pair[1]]);
            self.flash.fill_word(base + (i * 2) as u16, word);
        }

        self.flash.write_page(base);
        self.wait_ready();

        self.pages_written = self.pages_written.wrapping_add(1);
        self.dirty = false;
    }

    fn wait_ready(&self) {
        while self.flash.is_busy() {}
    }

    fn new_page(&mut self) {
        self.page = [0xff; PAGE_SIZE];
    }
}
