//! Boot mode handshake
//!
//! Two signature bytes live in RAM that the startup code never initialises.
//! They are what the bootloader uses to tell its next incarnation where to
//! go:
//!
//! | reset cause | signature bytes  | next boot                        |
//! |-------------|------------------|----------------------------------|
//! | power on    | undefined        | application                      |
//! | brown out   | undefined        | application                      |
//! | external    | kept             | bootloader, unless app signature |
//! | watchdog    | kept             | bootloader, unless app signature |
//!
//! The signature is consumed on every boot: it is cleared before jumping to
//! the application. While the bootloader runs it holds the application
//! pattern, so a watchdog reset nobody asked for (hang, silent link) lands
//! in the application. Only a deliberate reboot into the bootloader clears
//! it.

use crate::config::BOOTAPP_SIGNATURE;
use crate::hal::watchdog::WatchdogTimeout;

/// Watchdog period for deliberate reboots, long enough to flush a few
/// bytes of pending output since every UART interrupt re-arms it
pub const REBOOT_TIMEOUT: WatchdogTimeout = WatchdogTimeout::Ms16;

/// Watchdog period while the bootloader runs. Link traffic keeps it from
/// firing; a silent or hung session falls through to the application.
pub const DEADMAN_TIMEOUT: WatchdogTimeout = WatchdogTimeout::Ms8000;

/// Snapshot of the reset flags register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResetCause(u8);

impl ResetCause {
    pub const POWER_ON: u8 = 1 << 0;
    pub const EXTERNAL: u8 = 1 << 1;
    pub const BROWN_OUT: u8 = 1 << 2;
    pub const WATCHDOG: u8 = 1 << 3;

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_watchdog(self) -> bool {
        self.0 & Self::WATCHDOG != 0
    }

    pub const fn is_external(self) -> bool {
        self.0 & Self::EXTERNAL != 0
    }
}

/// Where a deliberate reboot should land
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Target {
    Application,
    Bootloader,
}

impl Target {
    pub fn signature(self) -> [u8; 2] {
        match self {
            Target::Application => BOOTAPP_SIGNATURE,
            Target::Bootloader => [0, 0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Decision {
    /// Jump to the application, stopping the watchdog left running by the
    /// reboot that got us here
    Application { stop_watchdog: bool },
    Bootloader,
}

/// Choose between bootloader and application after a reset
pub fn decide(cause: ResetCause, signature: [u8; 2]) -> Decision {
    let app_requested = signature == BOOTAPP_SIGNATURE;

    if cause.is_watchdog() && app_requested {
        Decision::Application {
            stop_watchdog: true,
        }
    } else if !(cause.is_external() || cause.is_watchdog()) || app_requested {
        Decision::Application {
            stop_watchdog: false,
        }
    } else {
        Decision::Bootloader
    }
}

/// Reset and boot-time control of the device
pub trait BootControl {
    fn reset_cause(&self) -> ResetCause;

    fn signature(&self) -> [u8; 2];

    fn set_signature(&mut self, signature: [u8; 2]);

    fn start_watchdog(&mut self, timeout: WatchdogTimeout);

    fn stop_watchdog(&mut self);

    /// Hand over to the application reset vector along with the reset cause
    fn jump_to_application(&mut self, cause: ResetCause) -> !;

    /// Sleep with interrupts enabled until the watchdog resets the device
    fn wait_for_reset(&mut self) -> !;
}

/// Run the boot decision. Returns only when the bootloader session should
/// run.
pub fn enter<B: BootControl>(control: &mut B) {
    let cause = control.reset_cause();
    match decide(cause, control.signature()) {
        Decision::Application { stop_watchdog } => {
            if stop_watchdog {
                control.stop_watchdog();
            }
            control.set_signature([0, 0]);
            control.jump_to_application(cause)
        }
        Decision::Bootloader => {
            control.set_signature(BOOTAPP_SIGNATURE);
            control.start_watchdog(DEADMAN_TIMEOUT);
        }
    }
}

/// Leave the signature for the next boot and arm the short watchdog
pub fn prepare_reboot<B: BootControl>(control: &mut B, target: Target) {
    control.set_signature(target.signature());
    control.start_watchdog(REBOOT_TIMEOUT);
}

pub fn reboot<B: BootControl>(control: &mut B, target: Target) -> ! {
    prepare_reboot(control, target);
    control.wait_for_reset()
}
