//! Serial link protocol stack: interrupt-fed transport, line assembly and
//! Intel HEX records.

pub mod ihex;
pub mod line;
pub mod transport;

pub use ihex::{AddressTracker, Record, RecordError, RecordType};
pub use line::LineAssembler;
pub use transport::{Board, ErrorFlags, LineStatus, Serial, SerialState};

/// Fatal conditions on the receive side of the link. Buffer contents can no
/// longer be trusted once either of these is seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    BufferOverflow,
    DataOverrun,
}

impl LinkError {
    /// Pick the fatal condition out of the receive error flags, if any.
    /// Frame errors are tolerated.
    pub fn from_flags(flags: ErrorFlags) -> Option<Self> {
        if flags.contains(ErrorFlags::BUFFER_OVERFLOW) {
            Some(LinkError::BufferOverflow)
        } else if flags.contains(ErrorFlags::DATA_OVERRUN) {
            Some(LinkError::DataOverrun)
        } else {
            None
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            LinkError::BufferOverflow => "buffer overflow (try a lower baud rate)",
            LinkError::DataOverrun => "data overrun",
        }
    }
}

pub type Result<T> = core::result::Result<T, LinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_errors_are_not_fatal() {
        assert_eq!(LinkError::from_flags(ErrorFlags::FRAME_ERROR), None);
        assert_eq!(LinkError::from_flags(ErrorFlags::empty()), None);
    }

    #[test]
    fn overflow_wins_over_overrun() {
        let flags = ErrorFlags::DATA_OVERRUN | ErrorFlags::BUFFER_OVERFLOW;
        assert_eq!(LinkError::from_flags(flags), Some(LinkError::BufferOverflow));
        assert_eq!(
            LinkError::from_flags(ErrorFlags::DATA_OVERRUN | ErrorFlags::FRAME_ERROR),
            Some(LinkError::DataOverrun)
        );
    }
}
