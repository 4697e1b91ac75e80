use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Host builds only compile the hardware-independent core
    let target = env::var("TARGET").unwrap_or_default();
    if !target.contains("avr") {
        return;
    }

    // The bootloader lives in the 4 KiB boot section at the top of flash
    println!("cargo:rustc-link-arg-bins=-mmcu=atmega328p");
    println!("cargo:rustc-link-arg-bins=-Wl,--section-start=.text=0x7000");
}
