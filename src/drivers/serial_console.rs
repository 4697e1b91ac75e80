//! Operator console helpers over any serial writer

use embedded_hal::serial;

use crate::protocol::ihex::{encode_byte, Record, MAX_DATA_LEN};

/// Text output on top of a byte oriented serial writer. Write errors are
/// dropped, there is nowhere else to report them.
pub trait SerialConsole: serial::Write<u8> {
    fn write_byte(&mut self, byte: u8) {
        let _ = nb::block!(self.write(byte));
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_byte(byte);
        }
    }

    fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    fn write_line(&mut self, s: &str) {
        self.write_str(s);
        self.write_str("\r\n");
    }

    fn write_hex(&mut self, val: u8) {
        self.write_bytes(&encode_byte(val));
    }

    fn write_hex_word(&mut self, val: u16) {
        self.write_hex((val >> 8) as u8);
        self.write_hex(val as u8);
    }

    /// Unsigned decimal without padding
    fn write_decimal(&mut self, mut val: u32) {
        let mut digits = [0u8; 10];
        let mut i = digits.len();
        loop {
            i -= 1;
            digits[i] = b'0' + (val % 10) as u8;
            val /= 10;
            if val == 0 {
                break;
            }
        }
        self.write_bytes(&digits[i..]);
    }

    /// Caret line under a previously printed line, `width` carets starting
    /// at column `col`
    fn point_out(&mut self, col: usize, width: usize) {
        for _ in 0..col {
            self.write_byte(b' ');
        }
        for _ in 0..width {
            self.write_byte(b'^');
        }
        self.write_str("\r\n");
    }

    fn write_record(&mut self, record: &Record) {
        let mut line = [0u8; 11 + MAX_DATA_LEN * 2];
        let len = record.encode(&mut line);
        self.write_bytes(&line[..len]);
    }

    /// Print formatted debug info
    fn debug(&mut self, msg: &str, val: u8) {
        self.write_str("[DBG] ");
        self.write_str(msg);
        self.write_str(": 0x");
        self.write_hex(val);
        self.write_str("\r\n");
    }
}

impl<W: serial::Write<u8> + ?Sized> SerialConsole for W {}
