#![allow(clippy::missing_safety_doc)]

use avr_device::atmega328p::USART0;
use critical_section::CriticalSection;

use super::power::Power;
use crate::config::UBRR;
use crate::protocol::{Board, LineStatus, SerialState};

const U2X0: u8 = 1 << 1;
const DOR0: u8 = 1 << 3;
const FE0: u8 = 1 << 4;

const TXEN0: u8 = 1 << 3;
const RXEN0: u8 = 1 << 4;
const UDRIE0: u8 = 1 << 5;
const RXCIE0: u8 = 1 << 7;

/// 8 data bits, no parity, 1 stop bit
const FRAME_8N1: u8 = 0x06;

/// USART0 at the configured rate in double speed mode, interrupt driven
pub struct Uart {
    power: Power,
}

impl Uart {
    pub fn new() -> Self {
        unsafe {
            let p = USART0::ptr();
            (*p).ubrr0.write(|w| w.bits(UBRR));
            (*p).ucsr0a.write(|w| w.bits(U2X0));
            (*p).ucsr0c.write(|w| w.bits(FRAME_8N1));
            (*p).ucsr0b.write(|w| w.bits(RXCIE0 | RXEN0 | TXEN0));
        }
        Self {
            power: Power::new(),
        }
    }
}

impl Board for Uart {
    fn start_transmit(&mut self) {
        unsafe {
            (*USART0::ptr()).ucsr0b.modify(|r, w| w.bits(r.bits() | UDRIE0));
        }
    }

    fn idle_while<F>(&mut self, pending: F)
    where
        F: FnMut(CriticalSection<'_>) -> bool,
    {
        self.power.idle_while(pending);
    }
}

/// USART_RX body. The status register has to be sampled before the data
/// register is read. Link activity keeps the watchdog quiet.
#[inline]
pub fn service_receive(state: &SerialState, cs: CriticalSection<'_>) {
    let (status, byte) = unsafe {
        let p = USART0::ptr();
        let status = (*p).ucsr0a.read().bits();
        (status, (*p).udr0.read().bits())
    };
    avr_device::asm::wdr();
    state.on_receive(
        cs,
        byte,
        LineStatus {
            data_overrun: status & DOR0 != 0,
            frame_error: status & FE0 != 0,
        },
    );
}

/// USART_UDRE body: send the next queued byte or silence the interrupt
#[inline]
pub fn service_transmit(state: &SerialState, cs: CriticalSection<'_>) {
    avr_device::asm::wdr();
    unsafe {
        let p = USART0::ptr();
        match state.on_transmit_ready(cs) {
            Some(byte) => (*p).udr0.write(|w| w.bits(byte)),
            None => (*p).ucsr0b.modify(|r, w| w.bits(r.bits() & !UDRIE0)),
        }
    }
}
