//! Conversions to and from `midi-msg` types.

use midi_msg::MidiMsg;

use crate::codec::{MessageCodec, MidiCodec};
use crate::error::DecodeError;
use crate::message::Message;

impl Message {
    pub fn to_midi_msg(&self) -> Result<MidiMsg, midi_msg::ParseError> {
        let (msg, _len) = MidiMsg::from_midi(&MidiCodec.encode(self))?;
        Ok(msg)
    }

    pub fn from_midi_msg(msg: &MidiMsg) -> Result<Self, DecodeError> {
        MidiCodec.decode(&msg.to_midi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use midi_msg::{Channel, ChannelVoiceMsg};

    #[test]
    fn test_to_midi_msg() {
        let msg = Message::note_on(0, 60, 100).to_midi_msg().unwrap();
        match msg {
            MidiMsg::ChannelVoice {
                channel,
                msg: ChannelVoiceMsg::NoteOn { note, velocity },
            } => {
                assert_eq!(channel, Channel::Ch1);
                assert_eq!(note, 60);
                assert_eq!(velocity, 100);
            }
            other => panic!("Expected NoteOn, got {:?}", other),
        }
    }

    #[test]
    fn test_from_midi_msg() {
        let msg = MidiMsg::ChannelVoice {
            channel: Channel::Ch3,
            msg: ChannelVoiceMsg::ProgramChange { program: 5 },
        };
        let message = Message::from_midi_msg(&msg).unwrap();
        assert_eq!(message, Message::program_change(2, 5));
    }
}
