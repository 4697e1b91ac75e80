mod common;

use common::*;
use hexloader::bootloader::{PassStatus, Session, Target};
use hexloader::config::{APP_SECTION_END, PAGE_SIZE, RX_BUFFER_LEN};
use hexloader::drivers::{FlashProgrammer, Mode};
use hexloader::protocol::Serial;
use hexloader::DeviceState;

const SAMPLE: &str = ":10000000214601360121470136007EFE09D2190141";
const SAMPLE_BYTES: [u8; 16] = [
    0x21, 0x46, 0x01, 0x36, 0x01, 0x21, 0x47, 0x01, 0x36, 0x00, 0x7e, 0xfe, 0x09, 0xd2, 0x19, 0x01,
];

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + 3) as u8).collect()
}

#[test]
fn flash_then_verify_boots_application() {
    let outcome = run_session(SimFlash::new(), twice(vec![line(SAMPLE), eof_line()]));

    assert_eq!(outcome.target, Target::Application);
    assert_eq!(&outcome.flash.memory[..16], &SAMPLE_BYTES);
    assert_eq!(outcome.flash.memory[16], 0xff);
    assert_eq!(outcome.flash.written, [0]);
    assert_eq!(outcome.flash.rww_enables, 1);

    let output = &outcome.output;
    assert!(output.starts_with(&format!("AVR Hexloader {}\r\n", env!("CARGO_PKG_VERSION"))));
    assert!(output.contains("Paste your hex file, 'h' for help\r\n>: "));
    assert!(output.contains("\rFlashed: 16 OK! (1ms)\r\n"));
    assert!(output.contains("Paste again to verify\r\n>: \rVerified: 16 OK! (1ms)\r\n"));
    assert!(output.ends_with("Have a nice day!\r\n\r\n"));
}

#[test]
fn records_are_not_echoed() {
    let outcome = run_session(SimFlash::new(), twice(vec![line(SAMPLE), eof_line()]));
    assert!(!outcome.output.contains(SAMPLE));
    assert!(!outcome.output.contains(":00000001FF"));
}

#[test]
fn checksum_error_aborts_without_writing() {
    let corrupted = ":10000000214601360121470136007EFE09D2190140";
    let outcome = run_session(SimFlash::new(), vec![line(corrupted)]);

    assert_eq!(outcome.target, Target::Bootloader);
    assert!(outcome.flash.erased.is_empty());
    assert!(outcome.flash.written.is_empty());

    let report = format!(
        "\r\nChecksum error in line:\r\n{}\r\n{}^^\r\n",
        corrupted,
        " ".repeat(41)
    );
    assert!(outcome.output.contains(&report));
    assert!(outcome.output.ends_with("Rebooting into bootloader\r\n\r\n"));
}

#[test]
fn first_record_must_start_at_zero() {
    let outcome = run_session(SimFlash::new(), vec![record_line(0x10, &[1, 2, 3])]);
    assert_eq!(outcome.target, Target::Bootloader);
    assert!(outcome.output.contains("First address must be 0:"));
    assert!(outcome.flash.written.is_empty());
}

#[test]
fn overlapping_record_is_rejected() {
    let input = vec![record_line(0, &pattern(16)), record_line(8, &[0xaa; 4])];
    let outcome = run_session(SimFlash::new(), input);

    assert_eq!(outcome.target, Target::Bootloader);
    assert!(outcome.output.contains("\r\nAddresses must be increasing:\r\n:04000800"));
    assert!(outcome.output.contains(&format!("\r\n{}^^^^\r\n", " ".repeat(3))));
    assert!(outcome.flash.written.is_empty());
}

#[test]
fn gaps_between_records_are_allowed() {
    let lines = vec![
        record_line(0, &[1, 2]),
        record_line(0x0200, &[3, 4]),
        eof_line(),
    ];
    let outcome = run_session(SimFlash::new(), twice(lines));

    assert_eq!(outcome.target, Target::Application);
    assert_eq!(outcome.flash.written, [0, 0x0200]);
    assert_eq!(outcome.flash.memory[0x0100], 0xff);
    assert_eq!(&outcome.flash.memory[0x0200..0x0202], &[3, 4]);
}

#[test]
fn record_into_boot_section_is_rejected() {
    let input = vec![
        record_line(0, &[0; 16]),
        record_line(APP_SECTION_END as u16 - 8, &[0; 16]),
    ];
    let outcome = run_session(SimFlash::new(), input);

    assert_eq!(outcome.target, Target::Bootloader);
    assert!(outcome.output.contains("Address beyond application section:"));
    assert!(outcome.flash.written.is_empty());
}

#[test]
fn unsupported_record_type_is_rejected() {
    let outcome = run_session(SimFlash::new(), vec![line(":020000040000FA")]);
    assert_eq!(outcome.target, Target::Bootloader);
    assert!(outcome.output.contains("Unsupported record type:\r\n:020000040000FA\r\n"));
}

#[test]
fn image_crossing_a_page_boundary() {
    let image = pattern(PAGE_SIZE + 16);
    let outcome = run_session(SimFlash::new(), twice(image_lines(&image)));

    assert_eq!(outcome.target, Target::Application);
    assert_eq!(outcome.flash.written, [0, PAGE_SIZE as u16]);
    assert_eq!(&outcome.flash.memory[..image.len()], &image[..]);
    assert!(outcome.output.contains("\rFlashed: 144 OK!"));
}

#[test]
fn flashing_twice_is_idempotent() {
    let image = pattern(300);
    let first = run_session(SimFlash::new(), twice(image_lines(&image)));
    let snapshot = first.flash.memory.clone();

    let second = run_session(first.flash, twice(image_lines(&image)));
    assert_eq!(second.target, Target::Application);
    assert_eq!(second.flash.memory, snapshot);
}

#[test]
fn empty_image_writes_nothing() {
    let outcome = run_session(SimFlash::new(), twice(vec![eof_line()]));
    assert_eq!(outcome.target, Target::Application);
    assert!(outcome.flash.written.is_empty());
}

#[test]
fn verify_mismatch_points_at_byte() {
    let device = DeviceState::new();
    let mut changed = SAMPLE_BYTES;
    changed[5] ^= 0x01;
    let input = vec![line(SAMPLE), eof_line(), record_line(0, &changed)];

    let serial = Serial::new(&device.serial, SimBoard::new(&device, input));
    let mut session = Session::new(serial, FlashProgrammer::new(SimFlash::new()), &device.clock);
    assert_eq!(session.run(), Target::Bootloader);
    assert_eq!(session.status(Mode::Flash), PassStatus::Ok);
    assert_eq!(session.status(Mode::Verify), PassStatus::Error);

    let (serial, _) = session.into_parts();
    let output = serial.release().output();
    assert!(output.contains("\r\nHex and flash mismatch:\r\n:10000000"));
    assert!(output.contains(&format!("\r\n{}^^\r\n", " ".repeat(9 + 5 * 2))));
}

#[test]
fn dump_reflashes_to_identical_contents() {
    let source = SimFlash::with_contents(0, &pattern(300));
    let dumped = run_session(source, vec![line("d"), line("q")]);
    assert_eq!(dumped.target, Target::Application);

    let records: Vec<Vec<u8>> = dumped
        .output
        .split("\r\n")
        .filter(|l| l.starts_with(':'))
        .map(|l| line(l))
        .collect();
    assert_eq!(records.len(), APP_SECTION_END / 16 + 1);
    assert_eq!(records.last(), Some(&eof_line()));

    let reflashed = run_session(SimFlash::new(), twice(records));
    assert_eq!(reflashed.target, Target::Application);
    assert_eq!(
        &reflashed.flash.memory[..APP_SECTION_END],
        &dumped.flash.memory[..APP_SECTION_END]
    );
    assert_eq!(reflashed.flash.written.len(), APP_SECTION_END / PAGE_SIZE);
}

#[test]
fn receive_overflow_reboots_into_bootloader() {
    let flood = vec![b'x'; RX_BUFFER_LEN + 8];
    let outcome = run_session(SimFlash::new(), vec![flood]);

    assert_eq!(outcome.target, Target::Bootloader);
    assert!(outcome
        .output
        .contains("\r\nUART error: buffer overflow (try a lower baud rate)\r\n"));
    assert!(outcome.output.ends_with("Rebooting into bootloader\r\n\r\n"));
}

#[test]
fn menu_reboot_commands() {
    let quit = run_session(SimFlash::new(), vec![line("q")]);
    assert_eq!(quit.target, Target::Application);
    assert!(quit.output.ends_with(">: q\r\nHave a nice day!\r\n\r\n"));

    let restart = run_session(SimFlash::new(), vec![line("r")]);
    assert_eq!(restart.target, Target::Bootloader);
    assert!(restart.output.ends_with(">: r\r\nRebooting into bootloader\r\n\r\n"));
}

#[test]
fn menu_between_passes() {
    let input = vec![line(SAMPLE), eof_line(), line("h"), line("r")];
    let outcome = run_session(SimFlash::new(), input);

    assert_eq!(outcome.target, Target::Bootloader);
    assert_eq!(outcome.flash.written, [0]);
    assert!(outcome.output.contains("d\tdump application section in hex format\r\n"));
}

#[test]
fn escape_discards_partial_line() {
    let outcome = run_session(SimFlash::new(), vec![b"xyz\x1b".to_vec(), line("x"), line("q")]);

    assert_eq!(outcome.target, Target::Application);
    assert!(outcome.output.contains(">: xyz\r\n>: x\r\n'h' for help\r\n>: q\r\n"));
}
