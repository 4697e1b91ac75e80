//! Two pass flash-then-verify session
//!
//! The image is pasted twice. The first pass programs it, the second one
//! compares every byte against flash. Any error ends the attempt with a
//! reboot back into the bootloader; there is no retry of single records.

pub mod handshake;
pub mod menu;

use ufmt::uwrite;

use crate::config::RECORD_MARK;
use crate::drivers::flash::{FlashProgrammer, Mode, SelfProgram};
use crate::drivers::serial_console::SerialConsole;
use crate::os::Clock;
use crate::protocol::ihex::{AddressTracker, Record, RecordError, RecordType, HEADER_LEN};
use crate::protocol::{Board, LineAssembler, LinkError, Serial};

pub use handshake::Target;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PassStatus {
    Waiting,
    InProgress,
    Ok,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionError {
    Link(LinkError),
    Record(RecordError),
    /// Flash differs from the record at this data byte
    Verify { offset: usize },
}

impl SessionError {
    pub fn message(&self) -> &'static str {
        match self {
            SessionError::Link(err) => err.message(),
            SessionError::Record(err) => err.message(),
            SessionError::Verify { .. } => "Hex and flash mismatch:",
        }
    }

    /// Column and width of the faulting field in the record line. Link
    /// errors are not tied to a line.
    pub fn caret(&self) -> Option<(usize, usize)> {
        match *self {
            SessionError::Link(_) => None,
            SessionError::Record(err) => Some(err.caret()),
            SessionError::Verify { offset } => Some((HEADER_LEN + offset * 2, 2)),
        }
    }
}

impl From<LinkError> for SessionError {
    fn from(err: LinkError) -> Self {
        SessionError::Link(err)
    }
}

impl From<RecordError> for SessionError {
    fn from(err: RecordError) -> Self {
        SessionError::Record(err)
    }
}

/// How a pass ended short of an error
enum PassEnd {
    Complete { elapsed: u32 },
    Reboot(Target),
}

pub struct Session<'a, B, F, C> {
    serial: Serial<'a, B>,
    lines: LineAssembler,
    programmer: FlashProgrammer<F>,
    addresses: AddressTracker,
    clock: &'a C,
    flash_status: PassStatus,
    verify_status: PassStatus,
}

impl<'a, B, F, C> Session<'a, B, F, C>
where
    B: Board,
    F: SelfProgram,
    C: Clock,
{
    pub fn new(serial: Serial<'a, B>, programmer: FlashProgrammer<F>, clock: &'a C) -> Self {
        Self {
            serial,
            lines: LineAssembler::new(),
            programmer,
            addresses: AddressTracker::new(),
            clock,
            flash_status: PassStatus::Waiting,
            verify_status: PassStatus::Waiting,
        }
    }

    /// Run the flash pass, then the verify pass. Returns where the device
    /// should reboot to; the caller performs the reboot.
    pub fn run(&mut self) -> Target {
        for mode in [Mode::Flash, Mode::Verify] {
            match mode {
                Mode::Flash => {
                    uwrite!(self.serial, "AVR Hexloader {}\r\n", VERSION).ok();
                    self.serial.write_line("Paste your hex file, 'h' for help");
                }
                Mode::Verify => self.serial.write_line("Paste again to verify"),
            }
            self.serial.write_str(menu::PROMPT);

            match self.run_pass(mode) {
                Ok(PassEnd::Complete { elapsed }) => {
                    uwrite!(self.serial, " OK! ({}ms)\r\n", elapsed).ok();
                }
                Ok(PassEnd::Reboot(target)) => return self.leave(target),
                Err(_) => return self.leave(Target::Bootloader),
            }
        }
        self.leave(Target::Application)
    }

    pub fn status(&self, mode: Mode) -> PassStatus {
        match mode {
            Mode::Flash => self.flash_status,
            Mode::Verify => self.verify_status,
        }
    }

    pub fn serial(&self) -> &Serial<'a, B> {
        &self.serial
    }

    pub fn serial_mut(&mut self) -> &mut Serial<'a, B> {
        &mut self.serial
    }

    pub fn programmer(&self) -> &FlashProgrammer<F> {
        &self.programmer
    }

    pub fn into_parts(self) -> (Serial<'a, B>, FlashProgrammer<F>) {
        (self.serial, self.programmer)
    }

    fn run_pass(&mut self, mode: Mode) -> Result<PassEnd, SessionError> {
        self.programmer.begin(mode);
        self.addresses.reset();
        self.set_status(mode, PassStatus::Waiting);
        let mut started = 0;

        loop {
            let ready = match self.lines.poll(&mut self.serial) {
                Ok(ready) => ready,
                Err(err) => {
                    let err = SessionError::from(err);
                    report(&mut self.serial, &[], err);
                    self.set_status(mode, PassStatus::Error);
                    return Err(err);
                }
            };
            if !ready {
                self.serial.wait_for_input();
                continue;
            }

            if self.lines.line().first() != Some(&RECORD_MARK) {
                let line = self.lines.line();
                if let Some(target) = menu::run(line, &mut self.serial, self.programmer.flash()) {
                    return Ok(PassEnd::Reboot(target));
                }
                continue;
            }

            if self.status(mode) == PassStatus::Waiting {
                started = self.clock.millis();
                self.set_status(mode, PassStatus::InProgress);
            }

            #[cfg(feature = "debug")]
            let pages_before = self.programmer.pages_written();

            let line = self.lines.line();
            match apply_record(line, &mut self.programmer, &mut self.addresses) {
                Ok(Some(end)) => {
                    let label = match mode {
                        Mode::Flash => "\rFlashed: ",
                        Mode::Verify => "\rVerified: ",
                    };
                    self.serial.write_str(label);
                    self.serial.write_decimal(end);
                }
                Ok(None) => {
                    self.set_status(mode, PassStatus::Ok);
                    let elapsed = self.clock.millis().wrapping_sub(started);
                    return Ok(PassEnd::Complete { elapsed });
                }
                Err(err) => {
                    report(&mut self.serial, line, err);
                    self.set_status(mode, PassStatus::Error);
                    return Err(err);
                }
            }

            #[cfg(feature = "debug")]
            {
                let pages = self.programmer.pages_written();
                if pages != pages_before {
                    self.serial.write_str("\r\n");
                    self.serial.debug("pages", pages as u8);
                }
            }
        }
    }

    fn set_status(&mut self, mode: Mode, status: PassStatus) {
        match mode {
            Mode::Flash => self.flash_status = status,
            Mode::Verify => self.verify_status = status,
        }
    }

    fn leave(&mut self, target: Target) -> Target {
        match target {
            Target::Application => self.serial.write_str("Have a nice day!\r\n\r\n"),
            Target::Bootloader => self.serial.write_str("Rebooting into bootloader\r\n\r\n"),
        }
        self.serial.flush();
        target
    }
}

/// Validate one record line and hand its bytes to the programmer. Returns
/// the end address of a data record, `None` at end of file.
fn apply_record<F: SelfProgram>(
    line: &[u8],
    programmer: &mut FlashProgrammer<F>,
    addresses: &mut AddressTracker,
) -> Result<Option<u32>, SessionError> {
    let record = Record::parse(line)?;
    match record.kind() {
        RecordType::EndOfFile => {
            programmer.finish();
            Ok(None)
        }
        RecordType::Data => {
            addresses.check(&record)?;
            for (i, &byte) in record.data().iter().enumerate() {
                programmer
                    .feed(record.address() + i as u16, byte)
                    .map_err(|_| SessionError::Verify { offset: i })?;
            }
            addresses.advance(&record);
            Ok(Some(record.end_address()))
        }
    }
}

/// Print the error. Record and verify errors are followed by the offending
/// line with a caret under the faulting field.
fn report<W: SerialConsole>(port: &mut W, line: &[u8], err: SessionError) {
    port.write_str("\r\n");
    match err.caret() {
        None => {
            port.write_str("UART error: ");
            port.write_line(err.message());
        }
        Some((col, width)) => {
            port.write_line(err.message());
            port.write_bytes(line);
            port.write_str("\r\n");
            port.point_out(col, width);
        }
    }
}
