//! Wire encoding of single messages.
//!
//! [`MessageCodec`] converts between a [`Message`] and one complete wire frame.
//! Splitting a raw byte stream into frames is the job of [`FrameReader`](crate::FrameReader).

use smallvec::SmallVec;

use crate::error::DecodeError;
use crate::message::{Message, MessageKind};

/// Encoded bytes of one message. Channel and system common messages stay inline.
pub type Frame = SmallVec<[u8; 3]>;

const END_OF_EXCLUSIVE: u8 = 0xF7;

pub trait MessageCodec: Send + Sync {
    fn encode(&self, message: &Message) -> Frame;

    /// Decodes exactly one message from `bytes`.
    fn decode(&self, bytes: &[u8]) -> Result<Message, DecodeError>;
}

/// Standard MIDI 1.0 byte encoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct MidiCodec;

impl MessageCodec for MidiCodec {
    fn encode(&self, message: &Message) -> Frame {
        let mut frame = Frame::new();
        frame.push(message.status_byte());
        if message.kind() == MessageKind::SysEx {
            frame.extend_from_slice(message.payload());
            frame.push(END_OF_EXCLUSIVE);
        } else {
            frame.extend_from_slice(message.data());
        }
        frame
    }

    fn decode(&self, bytes: &[u8]) -> Result<Message, DecodeError> {
        let (&status, rest) = bytes.split_first().ok_or(DecodeError::Empty)?;
        if status < 0x80 {
            return Err(DecodeError::UnexpectedDataByte(status));
        }
        if status == END_OF_EXCLUSIVE {
            return Err(DecodeError::StrayEndOfExclusive);
        }
        let kind = MessageKind::from_status(status).ok_or(DecodeError::UndefinedStatus(status))?;

        if kind == MessageKind::SysEx {
            return decode_sysex(rest);
        }

        let expected = kind.data_len();
        if let Some(&byte) = rest.iter().take(expected).find(|&&b| b >= 0x80) {
            return Err(DecodeError::UnexpectedStatus(byte));
        }
        if rest.len() < expected {
            return Err(DecodeError::Truncated {
                status,
                expected,
                got: rest.len(),
            });
        }
        if rest.len() > expected {
            return Err(DecodeError::TrailingBytes(rest.len() - expected));
        }
        Ok(Message::from_parts(kind, status & 0x0F, rest))
    }
}

fn decode_sysex(rest: &[u8]) -> Result<Message, DecodeError> {
    let end = rest
        .iter()
        .position(|&b| b >= 0x80)
        .ok_or(DecodeError::UnterminatedSysEx)?;
    if rest[end] != END_OF_EXCLUSIVE {
        return Err(DecodeError::UnexpectedStatus(rest[end]));
    }
    if end + 1 < rest.len() {
        return Err(DecodeError::TrailingBytes(rest.len() - end - 1));
    }
    Ok(Message::sysex(&rest[..end]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(message: Message) {
        let codec = MidiCodec;
        let frame = codec.encode(&message);
        let decoded = codec.decode(&frame).unwrap();
        assert_eq!(decoded, message, "frame {:02X?}", frame.as_slice());
    }

    #[test]
    fn test_encode_channel_messages() {
        let codec = MidiCodec;
        assert_eq!(
            codec.encode(&Message::note_on(2, 60, 100)).as_slice(),
            &[0x92, 60, 100]
        );
        assert_eq!(
            codec.encode(&Message::program_change(15, 5)).as_slice(),
            &[0xCF, 5]
        );
        assert_eq!(codec.encode(&Message::stop()).as_slice(), &[0xFC]);
    }

    #[test]
    fn test_encode_sysex_frames_payload() {
        let frame = MidiCodec.encode(&Message::sysex(vec![0x7E, 0x00, 0x06, 0x01]));
        assert_eq!(frame.as_slice(), &[0xF0, 0x7E, 0x00, 0x06, 0x01, 0xF7]);
    }

    #[test]
    fn test_round_trip_every_kind() {
        let messages = [
            Message::note_off(0, 60, 64),
            Message::note_on(15, 127, 0),
            Message::poly_pressure(4, 61, 33),
            Message::control_change(9, 121, 0),
            Message::program_change(1, 127),
            Message::channel_pressure(2, 90),
            Message::pitch_bend(3, 16383),
            Message::quarter_frame(0x35),
            Message::song_position(1000),
            Message::song_select(12),
            Message::tune_request(),
            Message::clock(),
            Message::start(),
            Message::continue_(),
            Message::stop(),
            Message::active_sensing(),
            Message::system_reset(),
        ];
        for message in messages {
            round_trip(message);
        }
    }

    #[test]
    fn test_round_trip_sysex_lengths() {
        for len in [0usize, 1, 2, 3, 4, 17, 128, 1024] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 0x80) as u8).collect();
            round_trip(Message::sysex(payload));
        }
    }

    #[test]
    fn test_decode_errors() {
        let codec = MidiCodec;
        assert_eq!(codec.decode(&[]), Err(DecodeError::Empty));
        assert_eq!(
            codec.decode(&[0x3C, 0x40]),
            Err(DecodeError::UnexpectedDataByte(0x3C))
        );
        assert_eq!(codec.decode(&[0xF9]), Err(DecodeError::UndefinedStatus(0xF9)));
        assert_eq!(
            codec.decode(&[0x90, 60]),
            Err(DecodeError::Truncated {
                status: 0x90,
                expected: 2,
                got: 1
            })
        );
        assert_eq!(
            codec.decode(&[0x90, 60, 0x80]),
            Err(DecodeError::UnexpectedStatus(0x80))
        );
        assert_eq!(codec.decode(&[0xF8, 0x00]), Err(DecodeError::TrailingBytes(1)));
        assert_eq!(
            codec.decode(&[0xF0, 0x01, 0x02]),
            Err(DecodeError::UnterminatedSysEx)
        );
        assert_eq!(codec.decode(&[0xF7]), Err(DecodeError::StrayEndOfExclusive));
    }
}
