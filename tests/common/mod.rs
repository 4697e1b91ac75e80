#![allow(dead_code)]

use std::collections::VecDeque;

use critical_section::CriticalSection;
use hexloader::bootloader::{Session, Target};
use hexloader::config::{FLASH_SIZE, PAGE_SIZE};
use hexloader::drivers::{FlashProgrammer, SelfProgram};
use hexloader::protocol::{Board, LineStatus, Record, Serial};
use hexloader::DeviceState;

/// Stands in for the UART interrupts: drains the transmit queue and feeds
/// one scripted input chunk per wake-up while the session sleeps.
pub struct SimBoard<'a> {
    device: &'a DeviceState,
    input: VecDeque<Vec<u8>>,
    pub sent: Vec<u8>,
}

impl<'a> SimBoard<'a> {
    pub fn new(device: &'a DeviceState, input: Vec<Vec<u8>>) -> Self {
        Self {
            device,
            input: input.into(),
            sent: Vec::new(),
        }
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.sent).into_owned()
    }

    fn wake(&mut self) {
        let device = self.device;
        if let Some(byte) = critical_section::with(|cs| device.serial.on_transmit_ready(cs)) {
            self.sent.push(byte);
            return;
        }
        let chunk = self.input.pop_front().expect("session waiting on exhausted input");
        critical_section::with(|cs| {
            for byte in chunk {
                device.serial.on_receive(cs, byte, LineStatus::default());
            }
            device.clock.tick(cs);
        });
    }
}

impl Board for SimBoard<'_> {
    fn start_transmit(&mut self) {}

    fn idle_while<F>(&mut self, mut pending: F)
    where
        F: FnMut(CriticalSection<'_>) -> bool,
    {
        while critical_section::with(|cs| pending(cs)) {
            self.wake();
        }
    }
}

/// Flash model with the page programming rules of the real part
pub struct SimFlash {
    pub memory: Vec<u8>,
    buffer: Vec<u8>,
    pub erased: Vec<u16>,
    pub written: Vec<u16>,
    pub rww_enables: usize,
}

impl SimFlash {
    pub fn new() -> Self {
        Self {
            memory: vec![0xff; FLASH_SIZE],
            buffer: vec![0xff; PAGE_SIZE],
            erased: Vec::new(),
            written: Vec::new(),
            rww_enables: 0,
        }
    }

    pub fn with_contents(address: usize, bytes: &[u8]) -> Self {
        let mut flash = Self::new();
        flash.memory[address..address + bytes.len()].copy_from_slice(bytes);
        flash
    }
}

impl SelfProgram for SimFlash {
    fn is_busy(&self) -> bool {
        false
    }

    fn erase_page(&mut self, address: u16) {
        let base = address as usize / PAGE_SIZE * PAGE_SIZE;
        self.memory[base..base + PAGE_SIZE].fill(0xff);
        self.erased.push(address);
    }

    fn fill_word(&mut self, address: u16, word: u16) {
        let offset = address as usize % PAGE_SIZE;
        self.buffer[offset..offset + 2].copy_from_slice(&word.to_le_bytes());
    }

    fn write_page(&mut self, address: u16) {
        let base = address as usize / PAGE_SIZE * PAGE_SIZE;
        assert!(
            self.erased.last() == Some(&address),
            "page {:#06x} written without erase",
            address
        );
        self.memory[base..base + PAGE_SIZE].copy_from_slice(&self.buffer);
        self.buffer.fill(0xff);
        self.written.push(address);
    }

    fn enable_rww(&mut self) {
        self.rww_enables += 1;
    }

    fn read_byte(&self, address: u16) -> u8 {
        self.memory[address as usize]
    }
}

pub struct Outcome {
    pub target: Target,
    pub output: String,
    pub flash: SimFlash,
}

/// Run one bootloader session against scripted input
pub fn run_session(flash: SimFlash, input: Vec<Vec<u8>>) -> Outcome {
    let device = DeviceState::new();
    let serial = Serial::new(&device.serial, SimBoard::new(&device, input));
    let mut session = Session::new(serial, FlashProgrammer::new(flash), &device.clock);
    let target = session.run();

    let (serial, programmer) = session.into_parts();
    let output = serial.release().output();
    let flash = programmer.into_flash();
    Outcome {
        target,
        output,
        flash,
    }
}

pub fn record_line(address: u16, bytes: &[u8]) -> Vec<u8> {
    let mut line = [0u8; 64];
    let len = Record::data_record(address, bytes).encode(&mut line);
    let mut line = line[..len].to_vec();
    line.extend_from_slice(b"\r\n");
    line
}

pub fn eof_line() -> Vec<u8> {
    b":00000001FF\r\n".to_vec()
}

pub fn line(text: &str) -> Vec<u8> {
    format!("{}\r\n", text).into_bytes()
}

/// Split `image` into 16 byte records starting at address 0
pub fn image_lines(image: &[u8]) -> Vec<Vec<u8>> {
    let mut lines: Vec<Vec<u8>> = image
        .chunks(16)
        .enumerate()
        .map(|(i, chunk)| record_line((i * 16) as u16, chunk))
        .collect();
    lines.push(eof_line());
    lines
}

/// The same image pasted for both passes
pub fn twice(lines: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
    let mut input = lines.clone();
    input.extend(lines);
    input
}
