#![cfg_attr(target_arch = "avr", no_std)]
#![cfg_attr(target_arch = "avr", no_main)]
#![cfg_attr(target_arch = "avr", feature(abi_avr_interrupt))]

#[cfg(target_arch = "avr")]
mod firmware {
    use panic_halt as _;

    use hexloader::bootloader::{handshake, Session};
    use hexloader::drivers::FlashProgrammer;
    use hexloader::hal::{self, uart, BootRegisters, Spm, SysTick, Uart};
    use hexloader::protocol::Serial;
    use hexloader::DeviceState;

    static DEVICE: DeviceState = DeviceState::new();

    #[avr_device::entry]
    fn main() -> ! {
        let mut boot = BootRegisters::take();
        // Returns only if the bootloader should run
        handshake::enter(&mut boot);

        hal::move_vectors_to_boot_section();
        let uart = Uart::new();
        let _tick = SysTick::start();
        unsafe { avr_device::interrupt::enable() };

        let serial = Serial::new(&DEVICE.serial, uart);
        let programmer = FlashProgrammer::new(Spm::new());
        let target = Session::new(serial, programmer, &DEVICE.clock).run();

        handshake::reboot(&mut boot, target)
    }

    #[avr_device::interrupt(atmega328p)]
    fn USART_RX() {
        critical_section::with(|cs| uart::service_receive(&DEVICE.serial, cs));
    }

    #[avr_device::interrupt(atmega328p)]
    fn USART_UDRE() {
        critical_section::with(|cs| uart::service_transmit(&DEVICE.serial, cs));
    }

    #[avr_device::interrupt(atmega328p)]
    fn TIMER0_COMPA() {
        critical_section::with(|cs| DEVICE.clock.tick(cs));
    }
}

#[cfg(not(target_arch = "avr"))]
fn main() {}
