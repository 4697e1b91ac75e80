//! Configuration constants for the ATmega328P hexloader

/// CPU frequency in Hz
pub const CPU_FREQ_HZ: u32 = 16_000_000;

/// UART baud rate divisor in double speed mode (16 = 115.2K, 34 = 57.6K, 8 = 230.4K)
pub const UBRR: u16 = 16;

/// UART receive buffer length
pub const RX_BUFFER_LEN: usize = 1024;

/// UART transmit buffer length
pub const TX_BUFFER_LEN: usize = 32;

/// Longest accepted input line, 16 data bytes per record as generated by objcopy
pub const MAX_LINE_LEN: usize = 64;

/// Flash page size in bytes
pub const PAGE_SIZE: usize = 128;

/// Total flash size in bytes
pub const FLASH_SIZE: usize = 32768;

/// First byte of the boot section, the application owns everything below
pub const APP_SECTION_END: usize = 0x7000;

/// Boot signature asking the next boot to jump into the application, also
/// held while the bootloader session runs
pub const BOOTAPP_SIGNATURE: [u8; 2] = [0xb0, 0xaa];

/// Abort key, clears the current line
pub const ESC: u8 = 27;

/// First character of every Intel HEX record
pub const RECORD_MARK: u8 = b':';

/// Timer 0 compare value, (249 + 1) * 64 / 16M = 1 ms per tick
pub const TICK_COMPARE: u8 = 249;
