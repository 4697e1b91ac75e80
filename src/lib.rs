//! Serial Intel HEX bootloader for the ATmega328P.
//!
//! Everything above `hal` is hardware independent and runs on the host
//! under `cargo test`.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(target_arch = "avr", feature(asm_experimental_arch))]

pub mod bootloader;
pub mod config;
pub mod drivers;
pub mod hal;
pub mod os;
pub mod protocol;

use os::SystemClock;
use protocol::SerialState;

/// State shared between the interrupt handlers and the session
pub struct DeviceState {
    pub serial: SerialState,
    pub clock: SystemClock,
}

impl DeviceState {
    pub const fn new() -> Self {
        Self {
            serial: SerialState::new(),
            clock: SystemClock::new(),
        }
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new()
    }
}
