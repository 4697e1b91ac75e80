//! Single character operator commands, accepted between records

use core::ops::Range;

use embedded_hal::serial;

use super::handshake::Target;
use crate::config::APP_SECTION_END;
use crate::drivers::flash::SelfProgram;
use crate::drivers::serial_console::SerialConsole;
use crate::protocol::ihex::Record;

pub const PROMPT: &str = ">: ";

const HELP: &str = concat!(
    " q\treboot to app\r\n",
    " r\treboot to bootloader\r\n",
    " d\tdump application section in hex format\r\n",
    " esc\tabort current command\r\n",
);

/// Bytes per dumped record, as objcopy writes them
const DUMP_RECORD_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    RebootToApp,
    RebootToBootloader,
    Dump,
    Help,
    Redraw,
    Unknown,
}

impl Command {
    pub fn parse(line: &[u8]) -> Self {
        match line.first() {
            Some(b'q') => Command::RebootToApp,
            Some(b'r') => Command::RebootToBootloader,
            Some(b'd') => Command::Dump,
            Some(b'h') => Command::Help,
            None => Command::Redraw,
            Some(_) => Command::Unknown,
        }
    }
}

/// Run a command line. Returns the reboot it asks for, if any.
pub fn run<W, F>(line: &[u8], port: &mut W, flash: &F) -> Option<Target>
where
    W: serial::Write<u8>,
    F: SelfProgram,
{
    match Command::parse(line) {
        Command::RebootToApp => return Some(Target::Application),
        Command::RebootToBootloader => return Some(Target::Bootloader),
        Command::Dump => dump_flash(port, flash, 0..APP_SECTION_END as u16),
        Command::Help => port.write_str(HELP),
        Command::Redraw => {}
        Command::Unknown => port.write_str("'h' for help\r\n"),
    }
    port.write_str(PROMPT);
    None
}

/// Print a flash range as 16 byte data records followed by an end-of-file
/// record. The output is a valid image for a flash pass.
pub fn dump_flash<W, F>(port: &mut W, flash: &F, range: Range<u16>)
where
    W: serial::Write<u8>,
    F: SelfProgram,
{
    let mut chunk = [0u8; DUMP_RECORD_LEN];
    let mut address = range.start;
    while address < range.end {
        let len = (range.end - address).min(DUMP_RECORD_LEN as u16) as usize;
        for (i, byte) in chunk[..len].iter_mut().enumerate() {
            *byte = flash.read_byte(address + i as u16);
        }
        port.write_str("\r\n");
        port.write_record(&Record::data_record(address, &chunk[..len]));
        address += len as u16;
    }
    port.write_str("\r\n");
    port.write_record(&Record::end_of_file());
    port.write_str("\r\n");
}
