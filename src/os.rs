//! System time tracking shared with the timer interrupt

use core::cell::Cell;
use critical_section::{CriticalSection, Mutex};

/// Source of elapsed milliseconds
pub trait Clock {
    fn millis(&self) -> u32;
}

/// Millisecond counter advanced by the periodic timer tick
pub struct SystemClock {
    tick_count: Mutex<Cell<u32>>,
}

impl SystemClock {
    /// Create new clock instance
    pub const fn new() -> Self {
        Self {
            tick_count: Mutex::new(Cell::new(0)),
        }
    }

    /// Increment the counter, called from the timer interrupt only
    #[inline]
    pub fn tick(&self, cs: CriticalSection<'_>) {
        let count = self.tick_count.borrow(cs);
        count.set(count.get().wrapping_add(1));
    }
}

impl Clock for SystemClock {
    /// Milliseconds since boot, read atomically
    #[inline]
    fn millis(&self) -> u32 {
        critical_section::with(|cs| self.tick_count.borrow(cs).get())
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}
