pub mod watchdog;

#[cfg(target_arch = "avr")]
pub mod boot;
#[cfg(target_arch = "avr")]
pub mod power;
#[cfg(target_arch = "avr")]
pub mod spm;
#[cfg(target_arch = "avr")]
pub mod timer;
#[cfg(target_arch = "avr")]
pub mod uart;

// Re-export commonly used types
pub use watchdog::WatchdogTimeout;

#[cfg(target_arch = "avr")]
pub use boot::{move_vectors_to_boot_section, BootRegisters};
#[cfg(target_arch = "avr")]
pub use power::Power;
#[cfg(target_arch = "avr")]
pub use spm::Spm;
#[cfg(target_arch = "avr")]
pub use timer::SysTick;
#[cfg(target_arch = "avr")]
pub use uart::Uart;
