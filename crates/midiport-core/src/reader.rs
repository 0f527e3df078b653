//! Resynchronizing MIDI byte stream framer.
//!
//! Backends hand over whatever bytes the transport produced: whole messages, several
//! messages at once, or fragments. [`FrameReader`] splits that stream into complete
//! frames following MIDI 1.0 framing rules:
//!
//! - running status for channel messages
//! - real-time bytes (0xF8-0xFF) emitted immediately, even mid-message
//! - SysEx bodies accumulated across calls until End of Exclusive
//! - recovery at the next status byte after any malformed input

use crate::error::DecodeError;
use crate::message::MessageKind;

/// Upper bound for a buffered SysEx message, framing bytes included.
pub const MAX_SYSEX_LEN: usize = 64 * 1024;

const SYSEX_START: u8 = 0xF0;
const END_OF_EXCLUSIVE: u8 = 0xF7;

#[derive(Debug, Default)]
pub struct FrameReader {
    pending: Vec<u8>,
    expected: usize,
    running_status: Option<u8>,
    in_sysex: bool,
    /// Skipping the rest of an oversized SysEx until the next status byte.
    discarding: bool,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops any partial message and running status.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.expected = 0;
        self.running_status = None;
        self.in_sysex = false;
        self.discarding = false;
    }

    /// True while a message is partially buffered.
    pub fn has_partial(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Feeds raw bytes, calling `emit` for every complete frame or framing error, in order.
    pub fn feed<F>(&mut self, bytes: &[u8], mut emit: F)
    where
        F: FnMut(Result<&[u8], DecodeError>),
    {
        for &byte in bytes {
            if byte >= 0xF8 {
                emit(Ok(std::slice::from_ref(&byte)));
            } else if byte >= 0x80 {
                self.feed_status(byte, &mut emit);
            } else {
                self.feed_data(byte, &mut emit);
            }
        }
    }

    fn feed_status<F>(&mut self, status: u8, emit: &mut F)
    where
        F: FnMut(Result<&[u8], DecodeError>),
    {
        if std::mem::take(&mut self.discarding) && status == END_OF_EXCLUSIVE {
            return;
        }

        if status == END_OF_EXCLUSIVE {
            if self.in_sysex {
                self.pending.push(status);
                emit(Ok(&self.pending));
                self.pending.clear();
                self.in_sysex = false;
            } else {
                self.abandon(emit);
                emit(Err(DecodeError::StrayEndOfExclusive));
            }
            return;
        }

        self.abandon(emit);

        if status == SYSEX_START {
            self.running_status = None;
            self.in_sysex = true;
            self.pending.push(status);
            return;
        }

        match MessageKind::from_status(status) {
            Some(kind) => {
                self.running_status = kind.is_channel().then_some(status);
                self.expected = kind.data_len();
                self.pending.push(status);
                if self.expected == 0 {
                    emit(Ok(&self.pending));
                    self.pending.clear();
                }
            }
            None => {
                self.running_status = None;
                emit(Err(DecodeError::UndefinedStatus(status)));
            }
        }
    }

    fn feed_data<F>(&mut self, byte: u8, emit: &mut F)
    where
        F: FnMut(Result<&[u8], DecodeError>),
    {
        if self.discarding {
            return;
        }

        if self.in_sysex {
            if self.pending.len() >= MAX_SYSEX_LEN {
                self.pending.clear();
                self.in_sysex = false;
                self.discarding = true;
                emit(Err(DecodeError::SysExTooLong(MAX_SYSEX_LEN)));
                return;
            }
            self.pending.push(byte);
            return;
        }

        if self.pending.is_empty() {
            let Some(status) = self.running_status else {
                emit(Err(DecodeError::UnexpectedDataByte(byte)));
                return;
            };
            self.pending.push(status);
            self.expected = MessageKind::from_status(status).map_or(0, MessageKind::data_len);
        }

        self.pending.push(byte);
        if self.pending.len() > self.expected {
            emit(Ok(&self.pending));
            self.pending.clear();
        }
    }

    /// Reports and discards an incomplete message interrupted by a new status byte.
    fn abandon<F>(&mut self, emit: &mut F)
    where
        F: FnMut(Result<&[u8], DecodeError>),
    {
        if self.pending.is_empty() {
            return;
        }
        let error = if self.in_sysex {
            DecodeError::UnterminatedSysEx
        } else {
            DecodeError::Truncated {
                status: self.pending[0],
                expected: self.expected,
                got: self.pending.len() - 1,
            }
        };
        self.pending.clear();
        self.in_sysex = false;
        emit(Err(error));
    }
}
