//! Line assembly on top of the serial transport

use embedded_hal::serial;

use super::LinkError;
use crate::config::{ESC, MAX_LINE_LEN, RECORD_MARK};

const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// Collects received bytes into CR/LF terminated lines. Command input is
/// echoed back; HEX records are not, to keep the link quiet during bulk
/// transfers.
pub struct LineAssembler {
    buffer: [u8; MAX_LINE_LEN],
    len: usize,
    ready: usize,
}

impl LineAssembler {
    pub const fn new() -> Self {
        Self {
            buffer: [0; MAX_LINE_LEN],
            len: 0,
            ready: 0,
        }
    }

    /// Consume the bytes available on `port`. Returns `Ok(true)` as soon as
    /// a complete line is ready in [`line`](Self::line), `Ok(false)` once the
    /// input runs dry. Fatal receive errors are returned before any further
    /// byte is consumed.
    pub fn poll<P>(&mut self, port: &mut P) -> Result<bool, LinkError>
    where
        P: serial::Read<u8, Error = LinkError> + serial::Write<u8>,
    {
        loop {
            let byte = match port.read() {
                Ok(byte) => byte,
                Err(nb::Error::WouldBlock) => return Ok(false),
                Err(nb::Error::Other(err)) => return Err(err),
            };
            if self.accept(byte, port) {
                return Ok(true);
            }
        }
    }

    /// The last completed line, without its terminator. Empty after an
    /// abort.
    pub fn line(&self) -> &[u8] {
        &self.buffer[..self.ready]
    }

    fn accept<W: serial::Write<u8>>(&mut self, byte: u8, port: &mut W) -> bool {
        match byte {
            ESC => {
                echo(port, b"\r\n");
                self.len = 0;
                self.ready = 0;
                true
            }
            CR | LF => {
                if self.len == 0 {
                    return false;
                }
                self.ready = self.len;
                self.len = 0;
                if !self.is_record() {
                    echo(port, b"\r\n");
                }
                true
            }
            _ => {
                // last slot stays free, anything past it is cut off
                if self.len < MAX_LINE_LEN - 1 {
                    self.buffer[self.len] = byte;
                    self.len += 1;
                    if !self.is_record() {
                        echo(port, &[byte]);
                    }
                }
                false
            }
        }
    }

    fn is_record(&self) -> bool {
        self.buffer[0] == RECORD_MARK
    }
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}

fn echo<W: serial::Write<u8>>(port: &mut W, bytes: &[u8]) {
    for &byte in bytes {
        let _ = nb::block!(port.write(byte));
    }
}
