//! Intel HEX record handling
//!
//! A record line reads `:CCAAAATT<data>SS`, every field two ASCII hex digits
//! per byte. The digit decoder is lax on purpose: anything that is not a hex
//! digit decodes as zero and is left for the checksum to catch.

use crate::config::{APP_SECTION_END, MAX_LINE_LEN, RECORD_MARK};

/// Mark, count, address and type
pub const HEADER_LEN: usize = 9;
/// Header plus checksum
const OVERHEAD: usize = HEADER_LEN + 2;

/// Most data bytes a single input line can carry
pub const MAX_DATA_LEN: usize = (MAX_LINE_LEN - 1 - OVERHEAD) / 2;

/// Column of the address field within a record line
pub const ADDRESS_COLUMN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordType {
    Data,
    EndOfFile,
}

impl RecordType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(RecordType::Data),
            0x01 => Some(RecordType::EndOfFile),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            RecordType::Data => 0x00,
            RecordType::EndOfFile => 0x01,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordError {
    /// The line ends before the fields its byte count announces
    Truncated { length: usize },
    /// Field sum is not zero modulo 256
    Checksum { column: usize },
    /// Only data and end-of-file records are accepted
    UnsupportedType(u8),
    /// The first data record of a pass must start at address 0
    FirstAddress,
    /// A data record starts below the end of the previous one
    AddressOrder,
    /// A data record reaches into the boot section
    OutOfRange,
}

impl RecordError {
    pub fn message(&self) -> &'static str {
        match self {
            RecordError::Truncated { .. } => "Truncated line:",
            RecordError::Checksum { .. } => "Checksum error in line:",
            RecordError::UnsupportedType(_) => "Unsupported record type:",
            RecordError::FirstAddress => "First address must be 0:",
            RecordError::AddressOrder => "Addresses must be increasing:",
            RecordError::OutOfRange => "Address beyond application section:",
        }
    }

    /// Column and width of the offending field in the record line
    pub fn caret(&self) -> (usize, usize) {
        match *self {
            RecordError::Truncated { length } => (length, 1),
            RecordError::Checksum { column } => (column, 2),
            RecordError::UnsupportedType(_) => (7, 2),
            RecordError::FirstAddress | RecordError::AddressOrder | RecordError::OutOfRange => {
                (ADDRESS_COLUMN, 4)
            }
        }
    }
}

/// One decoded and checksum-validated record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    kind: RecordType,
    address: u16,
    count: u8,
    data: [u8; MAX_DATA_LEN],
}

impl Record {
    /// Decode a line starting with the record mark
    pub fn parse(line: &[u8]) -> Result<Self, RecordError> {
        if line.len() < OVERHEAD || line[0] != RECORD_MARK {
            return Err(RecordError::Truncated { length: line.len() });
        }

        let count = decode_byte(&line[1..3]);
        let address = decode_word(&line[3..7]);
        let raw_kind = decode_byte(&line[7..9]);

        let end = OVERHEAD + count as usize * 2;
        if count as usize > MAX_DATA_LEN || line.len() < end {
            return Err(RecordError::Truncated { length: line.len() });
        }

        let mut data = [0u8; MAX_DATA_LEN];
        let mut sum = count
            .wrapping_add((address >> 8) as u8)
            .wrapping_add(address as u8)
            .wrapping_add(raw_kind);
        for (i, byte) in data[..count as usize].iter_mut().enumerate() {
            let column = HEADER_LEN + i * 2;
            *byte = decode_byte(&line[column..column + 2]);
            sum = sum.wrapping_add(*byte);
        }

        let checksum_column = end - 2;
        sum = sum.wrapping_add(decode_byte(&line[checksum_column..end]));
        if sum != 0 {
            return Err(RecordError::Checksum {
                column: checksum_column,
            });
        }

        let kind = RecordType::from_u8(raw_kind).ok_or(RecordError::UnsupportedType(raw_kind))?;

        Ok(Self {
            kind,
            address,
            count,
            data,
        })
    }

    /// Build a data record. `bytes` is cut to [`MAX_DATA_LEN`].
    pub fn data_record(address: u16, bytes: &[u8]) -> Self {
        let count = bytes.len().min(MAX_DATA_LEN);
        let mut data = [0u8; MAX_DATA_LEN];
        data[..count].copy_from_slice(&bytes[..count]);
        Self {
            kind: RecordType::Data,
            address,
            count: count as u8,
            data,
        }
    }

    pub fn end_of_file() -> Self {
        Self {
            kind: RecordType::EndOfFile,
            address: 0,
            count: 0,
            data: [0; MAX_DATA_LEN],
        }
    }

    pub fn kind(&self) -> RecordType {
        self.kind
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..self.count as usize]
    }

    /// One past the last address the record covers
    pub fn end_address(&self) -> u32 {
        self.address as u32 + self.count as u32
    }

    /// Checksum byte that makes the record sum to zero
    pub fn checksum(&self) -> u8 {
        let sum = self.data().iter().fold(
            self.count
                .wrapping_add((self.address >> 8) as u8)
                .wrapping_add(self.address as u8)
                .wrapping_add(self.kind.as_u8()),
            |sum, &byte| sum.wrapping_add(byte),
        );
        sum.wrapping_neg()
    }

    /// Encode into `out` (mark included, no line terminator), returning the
    /// number of characters written. `out` must hold at least
    /// `11 + 2 * count` bytes.
    pub fn encode(&self, out: &mut [u8]) -> usize {
        out[0] = RECORD_MARK;
        let mut len = 1;
        let mut put = |byte: u8, len: &mut usize| {
            out[*len..*len + 2].copy_from_slice(&encode_byte(byte));
            *len += 2;
        };
        put(self.count, &mut len);
        put((self.address >> 8) as u8, &mut len);
        put(self.address as u8, &mut len);
        put(self.kind.as_u8(), &mut len);
        for &byte in self.data() {
            put(byte, &mut len);
        }
        put(self.checksum(), &mut len);
        len
    }
}

/// Enforces zero-started, non-decreasing data record addresses within a
/// pass
#[derive(Debug, Default)]
pub struct AddressTracker {
    next: Option<u32>,
}

impl AddressTracker {
    pub const fn new() -> Self {
        Self { next: None }
    }

    pub fn reset(&mut self) {
        self.next = None;
    }

    /// Validate a data record against the records accepted so far
    pub fn check(&self, record: &Record) -> Result<(), RecordError> {
        let address = record.address() as u32;
        match self.next {
            None if address != 0 => return Err(RecordError::FirstAddress),
            Some(next) if address < next => return Err(RecordError::AddressOrder),
            _ => {}
        }
        if record.end_address() > APP_SECTION_END as u32 {
            return Err(RecordError::OutOfRange);
        }
        Ok(())
    }

    /// Record a data record as accepted
    pub fn advance(&mut self, record: &Record) {
        self.next = Some(record.end_address());
    }
}

pub fn decode_nibble(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'A'..=b'F' => c - b'A' + 10,
        b'a'..=b'f' => c - b'a' + 10,
        _ => 0,
    }
}

/// Decode two ASCII hex digits
pub fn decode_byte(s: &[u8]) -> u8 {
    decode_nibble(s[0]) << 4 | decode_nibble(s[1])
}

/// Decode four ASCII hex digits
pub fn decode_word(s: &[u8]) -> u16 {
    (decode_byte(&s[..2]) as u16) << 8 | decode_byte(&s[2..4]) as u16
}

pub fn encode_nibble(x: u8) -> u8 {
    const HEX_CHARS: [u8; 16] = *b"0123456789ABCDEF";
    HEX_CHARS[(x & 0xf) as usize]
}

pub fn encode_byte(x: u8) -> [u8; 2] {
    [encode_nibble(x >> 4), encode_nibble(x)]
}
