//! Immutable MIDI 1.0 message values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Instant;

use crate::error::InvalidMessage;

/// Number of MIDI 1.0 channels.
pub const NUM_CHANNELS: u8 = 16;

/// Status category of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    NoteOff,
    NoteOn,
    PolyPressure,
    ControlChange,
    ProgramChange,
    ChannelPressure,
    PitchBend,
    SysEx,
    QuarterFrame,
    SongPosition,
    SongSelect,
    TuneRequest,
    Clock,
    Start,
    Continue,
    Stop,
    ActiveSensing,
    Reset,
}

impl MessageKind {
    /// Maps a status byte to its kind. Channel bits are ignored.
    ///
    /// Returns `None` for data bytes, the End of Exclusive marker and the
    /// undefined system statuses (0xF4, 0xF5, 0xF9, 0xFD).
    pub fn from_status(status: u8) -> Option<Self> {
        let kind = match status {
            0x80..=0x8F => Self::NoteOff,
            0x90..=0x9F => Self::NoteOn,
            0xA0..=0xAF => Self::PolyPressure,
            0xB0..=0xBF => Self::ControlChange,
            0xC0..=0xCF => Self::ProgramChange,
            0xD0..=0xDF => Self::ChannelPressure,
            0xE0..=0xEF => Self::PitchBend,
            0xF0 => Self::SysEx,
            0xF1 => Self::QuarterFrame,
            0xF2 => Self::SongPosition,
            0xF3 => Self::SongSelect,
            0xF6 => Self::TuneRequest,
            0xF8 => Self::Clock,
            0xFA => Self::Start,
            0xFB => Self::Continue,
            0xFC => Self::Stop,
            0xFE => Self::ActiveSensing,
            0xFF => Self::Reset,
            _ => return None,
        };
        Some(kind)
    }

    /// Status byte with a zero channel nibble.
    pub fn status(self) -> u8 {
        match self {
            Self::NoteOff => 0x80,
            Self::NoteOn => 0x90,
            Self::PolyPressure => 0xA0,
            Self::ControlChange => 0xB0,
            Self::ProgramChange => 0xC0,
            Self::ChannelPressure => 0xD0,
            Self::PitchBend => 0xE0,
            Self::SysEx => 0xF0,
            Self::QuarterFrame => 0xF1,
            Self::SongPosition => 0xF2,
            Self::SongSelect => 0xF3,
            Self::TuneRequest => 0xF6,
            Self::Clock => 0xF8,
            Self::Start => 0xFA,
            Self::Continue => 0xFB,
            Self::Stop => 0xFC,
            Self::ActiveSensing => 0xFE,
            Self::Reset => 0xFF,
        }
    }

    /// Fixed data byte count following the status byte (SysEx payloads excluded).
    pub fn data_len(self) -> usize {
        match self {
            Self::NoteOff
            | Self::NoteOn
            | Self::PolyPressure
            | Self::ControlChange
            | Self::PitchBend
            | Self::SongPosition => 2,
            Self::ProgramChange
            | Self::ChannelPressure
            | Self::QuarterFrame
            | Self::SongSelect => 1,
            _ => 0,
        }
    }

    #[inline]
    pub fn is_channel(self) -> bool {
        self.status() < 0xF0
    }

    /// System real-time messages may appear between the bytes of any other message.
    #[inline]
    pub fn is_realtime(self) -> bool {
        self.status() >= 0xF8
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoteOff => "note_off",
            Self::NoteOn => "note_on",
            Self::PolyPressure => "poly_pressure",
            Self::ControlChange => "control_change",
            Self::ProgramChange => "program_change",
            Self::ChannelPressure => "channel_pressure",
            Self::PitchBend => "pitch_bend",
            Self::SysEx => "sysex",
            Self::QuarterFrame => "quarter_frame",
            Self::SongPosition => "song_position",
            Self::SongSelect => "song_select",
            Self::TuneRequest => "tune_request",
            Self::Clock => "clock",
            Self::Start => "start",
            Self::Continue => "continue",
            Self::Stop => "stop",
            Self::ActiveSensing => "active_sensing",
            Self::Reset => "reset",
        };
        f.write_str(name)
    }
}

/// A decoded MIDI message.
///
/// Constructors do not validate their arguments; [`Message::validate`] does, and
/// ports run it before anything reaches a backend.
///
/// Equality and hashing ignore the arrival timestamp.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    kind: MessageKind,
    channel: u8,
    data: [u8; 2],
    payload: Vec<u8>,
    /// Arrival time, set on the receive path.
    #[serde(skip)]
    timestamp: Option<Instant>,
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.channel == other.channel
            && self.data == other.data
            && self.payload == other.payload
    }
}

impl Eq for Message {}

impl Hash for Message {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.channel.hash(state);
        self.data.hash(state);
        self.payload.hash(state);
    }
}

impl Message {
    /// Builds a message from its parts. Data bytes beyond `kind.data_len()` are ignored,
    /// and `channel` is ignored for system messages.
    pub fn from_parts(kind: MessageKind, channel: u8, data: &[u8]) -> Self {
        let mut bytes = [0u8; 2];
        let n = kind.data_len().min(data.len());
        bytes[..n].copy_from_slice(&data[..n]);
        Self {
            kind,
            channel: if kind.is_channel() { channel } else { 0 },
            data: bytes,
            payload: Vec::new(),
            timestamp: None,
        }
    }

    #[inline]
    fn channel_msg(kind: MessageKind, channel: u8, a: u8, b: u8) -> Self {
        Self {
            kind,
            channel,
            data: [a, b],
            payload: Vec::new(),
            timestamp: None,
        }
    }

    #[inline]
    fn system(kind: MessageKind, a: u8, b: u8) -> Self {
        Self {
            kind,
            channel: 0,
            data: [a, b],
            payload: Vec::new(),
            timestamp: None,
        }
    }

    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::channel_msg(MessageKind::NoteOn, channel, note, velocity)
    }

    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        Self::channel_msg(MessageKind::NoteOff, channel, note, velocity)
    }

    pub fn poly_pressure(channel: u8, note: u8, pressure: u8) -> Self {
        Self::channel_msg(MessageKind::PolyPressure, channel, note, pressure)
    }

    pub fn control_change(channel: u8, control: u8, value: u8) -> Self {
        Self::channel_msg(MessageKind::ControlChange, channel, control, value)
    }

    pub fn program_change(channel: u8, program: u8) -> Self {
        Self::channel_msg(MessageKind::ProgramChange, channel, program, 0)
    }

    pub fn channel_pressure(channel: u8, pressure: u8) -> Self {
        Self::channel_msg(MessageKind::ChannelPressure, channel, pressure, 0)
    }

    /// `value`: unsigned 14-bit, 8192 is center.
    pub fn pitch_bend(channel: u8, value: u16) -> Self {
        let lsb = (value & 0x7F) as u8;
        let msb = ((value >> 7) & 0xFF) as u8;
        Self::channel_msg(MessageKind::PitchBend, channel, lsb, msb)
    }

    /// System Exclusive message. `payload` excludes the 0xF0/0xF7 framing bytes.
    pub fn sysex(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: MessageKind::SysEx,
            channel: 0,
            data: [0, 0],
            payload: payload.into(),
            timestamp: None,
        }
    }

    pub fn quarter_frame(value: u8) -> Self {
        Self::system(MessageKind::QuarterFrame, value, 0)
    }

    /// `beats`: unsigned 14-bit count of sixteenth notes since the song start.
    pub fn song_position(beats: u16) -> Self {
        Self::system(
            MessageKind::SongPosition,
            (beats & 0x7F) as u8,
            ((beats >> 7) & 0xFF) as u8,
        )
    }

    pub fn song_select(song: u8) -> Self {
        Self::system(MessageKind::SongSelect, song, 0)
    }

    pub fn tune_request() -> Self {
        Self::system(MessageKind::TuneRequest, 0, 0)
    }

    pub fn clock() -> Self {
        Self::system(MessageKind::Clock, 0, 0)
    }

    pub fn start() -> Self {
        Self::system(MessageKind::Start, 0, 0)
    }

    pub fn continue_() -> Self {
        Self::system(MessageKind::Continue, 0, 0)
    }

    pub fn stop() -> Self {
        Self::system(MessageKind::Stop, 0, 0)
    }

    pub fn active_sensing() -> Self {
        Self::system(MessageKind::ActiveSensing, 0, 0)
    }

    pub fn system_reset() -> Self {
        Self::system(MessageKind::Reset, 0, 0)
    }

    /// Returns a copy stamped with `timestamp`.
    pub fn with_timestamp(mut self, timestamp: Instant) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    #[inline]
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Channel (0-15) for channel messages, `None` for system messages.
    #[inline]
    pub fn channel(&self) -> Option<u8> {
        self.kind.is_channel().then_some(self.channel)
    }

    /// Data bytes following the status byte (0-2 of them).
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data[..self.kind.data_len()]
    }

    /// SysEx payload without framing bytes; empty for other kinds.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[inline]
    pub fn timestamp(&self) -> Option<Instant> {
        self.timestamp
    }

    /// Status byte as sent on the wire, channel nibble included.
    #[inline]
    pub fn status_byte(&self) -> u8 {
        if self.kind.is_channel() {
            self.kind.status() | (self.channel & 0x0F)
        } else {
            self.kind.status()
        }
    }

    #[inline]
    pub fn is_note_on(&self) -> bool {
        self.kind == MessageKind::NoteOn && self.data[1] > 0
    }

    /// Note Off, or Note On with velocity 0.
    #[inline]
    pub fn is_note_off(&self) -> bool {
        match self.kind {
            MessageKind::NoteOff => true,
            MessageKind::NoteOn => self.data[1] == 0,
            _ => false,
        }
    }

    #[inline]
    pub fn note(&self) -> Option<u8> {
        match self.kind {
            MessageKind::NoteOn | MessageKind::NoteOff | MessageKind::PolyPressure => {
                Some(self.data[0])
            }
            _ => None,
        }
    }

    #[inline]
    pub fn velocity(&self) -> Option<u8> {
        match self.kind {
            MessageKind::NoteOn | MessageKind::NoteOff => Some(self.data[1]),
            _ => None,
        }
    }

    /// Checks protocol constraints: channel in 0-15, every data and payload byte below 0x80.
    pub fn validate(&self) -> Result<(), InvalidMessage> {
        if self.kind.is_channel() && self.channel >= NUM_CHANNELS {
            return Err(InvalidMessage::ChannelOutOfRange(self.channel));
        }
        for (index, &value) in self.data().iter().enumerate() {
            if value >= 0x80 {
                return Err(InvalidMessage::DataByteOutOfRange { index, value });
            }
        }
        if let Some(index) = self.payload.iter().position(|&b| b >= 0x80) {
            return Err(InvalidMessage::PayloadByteOutOfRange {
                index,
                value: self.payload[index],
            });
        }
        Ok(())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(channel) = self.channel() {
            write!(f, " ch={}", channel)?;
        }
        for byte in self.data() {
            write!(f, " {:02X}", byte)?;
        }
        if self.kind == MessageKind::SysEx {
            write!(f, " [{} bytes]", self.payload.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_helpers() {
        let on = Message::note_on(3, 60, 100);
        assert!(on.is_note_on());
        assert!(!on.is_note_off());
        assert_eq!(on.note(), Some(60));
        assert_eq!(on.velocity(), Some(100));
        assert_eq!(on.channel(), Some(3));
        assert_eq!(on.status_byte(), 0x93);

        let silent = Message::note_on(0, 60, 0);
        assert!(!silent.is_note_on());
        assert!(silent.is_note_off());

        assert!(Message::note_off(0, 60, 64).is_note_off());
        assert_eq!(Message::control_change(0, 7, 100).note(), None);
    }

    #[test]
    fn test_system_messages_have_no_channel() {
        let clock = Message::clock();
        assert_eq!(clock.channel(), None);
        assert!(clock.data().is_empty());
        assert!(clock.kind().is_realtime());

        let from_parts = Message::from_parts(MessageKind::SongSelect, 9, &[4, 99]);
        assert_eq!(from_parts.channel(), None);
        assert_eq!(from_parts.data(), &[4]);
    }

    #[test]
    fn test_pitch_bend_splits_14_bits() {
        let bend = Message::pitch_bend(0, 8192);
        assert_eq!(bend.data(), &[0x00, 0x40]);
        let max = Message::pitch_bend(0, 16383);
        assert_eq!(max.data(), &[0x7F, 0x7F]);
    }

    #[test]
    fn test_validate_rejects_bad_channel() {
        let msg = Message::note_on(16, 60, 100);
        assert_eq!(msg.validate(), Err(InvalidMessage::ChannelOutOfRange(16)));
    }

    #[test]
    fn test_validate_rejects_status_in_data() {
        let msg = Message::control_change(0, 7, 0x80);
        assert_eq!(
            msg.validate(),
            Err(InvalidMessage::DataByteOutOfRange {
                index: 1,
                value: 0x80
            })
        );

        // 16384 overflows 14 bits into the MSB's top bit
        assert!(Message::pitch_bend(0, 0x4000).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_payload() {
        let msg = Message::sysex(vec![0x7E, 0x7F, 0xF7]);
        assert_eq!(
            msg.validate(),
            Err(InvalidMessage::PayloadByteOutOfRange {
                index: 2,
                value: 0xF7
            })
        );
        assert!(Message::sysex(vec![0x43, 0x10, 0x4C]).validate().is_ok());
    }

    #[test]
    fn test_timestamp_does_not_change_identity_fields() {
        let now = Instant::now();
        let msg = Message::start().with_timestamp(now);
        assert_eq!(msg.timestamp(), Some(now));
        assert_eq!(msg.kind(), MessageKind::Start);
        assert_eq!(msg, Message::start());
    }

    #[test]
    fn test_display() {
        insta::assert_snapshot!(Message::note_on(1, 60, 100).to_string(), @"note_on ch=1 3C 64");
        insta::assert_snapshot!(Message::sysex(vec![1, 2, 3]).to_string(), @"sysex [3 bytes]");
        insta::assert_snapshot!(Message::clock().to_string(), @"clock");
    }

    #[test]
    fn test_serde_skips_timestamp() {
        let msg = Message::control_change(2, 74, 12).with_timestamp(Instant::now());
        let bytes = bincode::serialize(&msg).unwrap();
        let back: Message = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back.timestamp(), None);
        assert_eq!(back.kind(), MessageKind::ControlChange);
        assert_eq!(back.data(), &[74, 12]);
    }
}
