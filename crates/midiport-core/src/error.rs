//! Error types for message validation and decoding.

use thiserror::Error;

/// A message that violates MIDI 1.0 protocol constraints.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidMessage {
    #[error("channel {0} out of range (0-15)")]
    ChannelOutOfRange(u8),

    #[error("data byte {index} is {value:#04X}, must be below 0x80")]
    DataByteOutOfRange { index: usize, value: u8 },

    #[error("SysEx payload byte {index} is {value:#04X}, must be below 0x80")]
    PayloadByteOutOfRange { index: usize, value: u8 },
}

/// Malformed inbound bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty frame")]
    Empty,

    #[error("data byte {0:#04X} without a status byte")]
    UnexpectedDataByte(u8),

    #[error("undefined status byte {0:#04X}")]
    UndefinedStatus(u8),

    #[error("truncated message: status {status:#04X} needs {expected} data bytes, got {got}")]
    Truncated {
        status: u8,
        expected: usize,
        got: usize,
    },

    #[error("status byte {0:#04X} inside message data")]
    UnexpectedStatus(u8),

    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    #[error("SysEx message without End of Exclusive")]
    UnterminatedSysEx,

    #[error("End of Exclusive outside a SysEx message")]
    StrayEndOfExclusive,

    #[error("SysEx message exceeds {0} bytes")]
    SysExTooLong(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        insta::assert_snapshot!(
            InvalidMessage::DataByteOutOfRange { index: 1, value: 0x80 }.to_string(),
            @"data byte 1 is 0x80, must be below 0x80"
        );
        insta::assert_snapshot!(
            DecodeError::Truncated { status: 0x90, expected: 2, got: 1 }.to_string(),
            @"truncated message: status 0x90 needs 2 data bytes, got 1"
        );
    }
}
