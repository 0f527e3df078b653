//! MIDI message model and wire codec for midiport.
//!
//! - [`Message`]: immutable MIDI 1.0 message value with an optional arrival timestamp
//! - [`MessageCodec`] / [`MidiCodec`]: single-frame encode and decode
//! - [`FrameReader`]: resynchronizing framer for raw byte streams from devices
//! - [`reset_messages`] / [`panic_messages`]: channel-wide controller sequences

pub mod error;
pub use error::{DecodeError, InvalidMessage};

mod message;
pub use message::{Message, MessageKind, NUM_CHANNELS};

pub mod codec;
pub use codec::{Frame, MessageCodec, MidiCodec};

mod reader;
pub use reader::{FrameReader, MAX_SYSEX_LEN};

pub mod utils;
pub use utils::{panic_messages, reset_messages};

mod interop;

// Re-export for callers converting with `Message::to_midi_msg`
pub use midi_msg::MidiMsg;
