//! Transport layer implementation
//!
//! The UART interrupts and the main loop share two ring buffers and a set of
//! error flags. Each index has a single writer: the receive interrupt owns
//! `rx.head` and the error flags, the transmit interrupt owns `tx.tail`, the
//! main context owns `rx.tail` and `tx.head`. Every access from either side
//! goes through a critical section, so no index is ever observed half
//! written.

use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use core::ops::BitOr;

use critical_section::{CriticalSection, Mutex};
use embedded_hal::serial;

use super::LinkError;
use crate::config::{RX_BUFFER_LEN, TX_BUFFER_LEN};

/// Fixed capacity byte FIFO. One slot is always left free so that
/// `head == tail` means empty.
pub struct RingBuffer<const N: usize> {
    data: [u8; N],
    head: usize,
    tail: usize,
}

impl<const N: usize> RingBuffer<N> {
    pub const fn new() -> Self {
        Self {
            data: [0; N],
            head: 0,
            tail: 0,
        }
    }

    /// Enqueue a byte. A full buffer is never overwritten, the new byte is
    /// rejected instead.
    pub fn push(&mut self, byte: u8) -> bool {
        let next_head = (self.head + 1) % N;
        if next_head == self.tail {
            return false;
        }
        self.data[self.head] = byte;
        self.head = next_head;
        true
    }

    pub fn pop(&mut self) -> Option<u8> {
        if self.head == self.tail {
            return None;
        }
        let byte = self.data[self.tail];
        self.tail = (self.tail + 1) % N;
        Some(byte)
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    pub fn is_full(&self) -> bool {
        (self.head + 1) % N == self.tail
    }

    pub fn len(&self) -> usize {
        (self.head + N - self.tail) % N
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Receive error bitmask, set by the receive interrupt only. Nothing clears
/// it short of a reboot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ErrorFlags(u8);

impl ErrorFlags {
    pub const DATA_OVERRUN: Self = Self(1);
    pub const FRAME_ERROR: Self = Self(2);
    pub const BUFFER_OVERFLOW: Self = Self(4);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for ErrorFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Hardware status sampled alongside a received byte
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStatus {
    pub data_overrun: bool,
    pub frame_error: bool,
}

/// Buffers and flags shared between the UART interrupts and the main loop
pub struct SerialState {
    rx: Mutex<RefCell<RingBuffer<RX_BUFFER_LEN>>>,
    tx: Mutex<RefCell<RingBuffer<TX_BUFFER_LEN>>>,
    errors: Mutex<Cell<ErrorFlags>>,
}

impl SerialState {
    pub const fn new() -> Self {
        Self {
            rx: Mutex::new(RefCell::new(RingBuffer::new())),
            tx: Mutex::new(RefCell::new(RingBuffer::new())),
            errors: Mutex::new(Cell::new(ErrorFlags::empty())),
        }
    }

    /// Receive interrupt body. Overrun and framing indications are latched
    /// into the error flags; a byte that does not fit is dropped and flagged
    /// as an overflow.
    pub fn on_receive(&self, cs: CriticalSection<'_>, byte: u8, status: LineStatus) {
        let errors = self.errors.borrow(cs);
        let mut flags = errors.get();
        if status.data_overrun {
            flags.insert(ErrorFlags::DATA_OVERRUN);
        }
        if status.frame_error {
            flags.insert(ErrorFlags::FRAME_ERROR);
        }
        if !self.rx.borrow_ref_mut(cs).push(byte) {
            flags.insert(ErrorFlags::BUFFER_OVERFLOW);
        }
        errors.set(flags);
    }

    /// Data register empty interrupt body. `None` means the queue ran dry and
    /// the interrupt source should be disabled.
    pub fn on_transmit_ready(&self, cs: CriticalSection<'_>) -> Option<u8> {
        self.tx.borrow_ref_mut(cs).pop()
    }

    pub fn rx_empty(&self, cs: CriticalSection<'_>) -> bool {
        self.rx.borrow_ref(cs).is_empty()
    }

    pub fn tx_empty(&self, cs: CriticalSection<'_>) -> bool {
        self.tx.borrow_ref(cs).is_empty()
    }

    pub fn tx_full(&self, cs: CriticalSection<'_>) -> bool {
        self.tx.borrow_ref(cs).is_full()
    }

    pub fn errors(&self, cs: CriticalSection<'_>) -> ErrorFlags {
        self.errors.borrow(cs).get()
    }
}

impl Default for SerialState {
    fn default() -> Self {
        Self::new()
    }
}

/// What the transport needs from the device it runs on
pub trait Board {
    /// Enable the transmit-ready interrupt so queued bytes start draining.
    fn start_transmit(&mut self);

    /// Park the core in idle sleep for as long as `pending` holds. The
    /// condition is evaluated with interrupts masked and re-evaluated after
    /// every wake-up.
    fn idle_while<F>(&mut self, pending: F)
    where
        F: FnMut(CriticalSection<'_>) -> bool;
}

/// Main-context handle on the serial link
pub struct Serial<'a, B> {
    state: &'a SerialState,
    board: B,
}

impl<'a, B: Board> Serial<'a, B> {
    pub fn new(state: &'a SerialState, board: B) -> Self {
        Self { state, board }
    }

    /// Queue a byte for transmission, sleeping while the transmit buffer is
    /// full.
    pub fn send(&mut self, byte: u8) {
        let state = self.state;
        self.board.idle_while(|cs| state.tx_full(cs));
        critical_section::with(|cs| {
            state.tx.borrow_ref_mut(cs).push(byte);
        });
        self.board.start_transmit();
    }

    pub fn send_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.send(byte);
        }
    }

    /// Dequeue a received byte, if any
    pub fn recv(&mut self) -> Option<u8> {
        critical_section::with(|cs| self.state.rx.borrow_ref_mut(cs).pop())
    }

    pub fn available(&self) -> bool {
        critical_section::with(|cs| !self.state.rx_empty(cs))
    }

    /// Sleep until the transmit buffer has drained
    pub fn flush(&mut self) {
        let state = self.state;
        self.board.idle_while(|cs| !state.tx_empty(cs));
    }

    /// Sleep until at least one byte has been received
    pub fn wait_for_input(&mut self) {
        let state = self.state;
        self.board.idle_while(|cs| state.rx_empty(cs));
    }

    pub fn error_flags(&self) -> ErrorFlags {
        critical_section::with(|cs| self.state.errors(cs))
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    pub fn release(self) -> B {
        self.board
    }
}

impl<B: Board> serial::Read<u8> for Serial<'_, B> {
    type Error = LinkError;

    /// Fatal receive errors are reported before any buffered data, the
    /// buffer may have dropped bytes.
    fn read(&mut self) -> nb::Result<u8, LinkError> {
        if let Some(err) = LinkError::from_flags(self.error_flags()) {
            return Err(nb::Error::Other(err));
        }
        self.recv().ok_or(nb::Error::WouldBlock)
    }
}

impl<B: Board> serial::Write<u8> for Serial<'_, B> {
    type Error = Infallible;

    fn write(&mut self, word: u8) -> nb::Result<(), Infallible> {
        self.send(word);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Infallible> {
        Serial::flush(self);
        Ok(())
    }
}

impl<B: Board> ufmt::uWrite for Serial<'_, B> {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
        self.send_bytes(s.as_bytes());
        Ok(())
    }
}
