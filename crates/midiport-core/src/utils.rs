//! Channel-wide controller sequences.

use crate::message::{Message, NUM_CHANNELS};

pub const ALL_SOUND_OFF: u8 = 120;
pub const RESET_ALL_CONTROLLERS: u8 = 121;
pub const ALL_NOTES_OFF: u8 = 123;

/// "All Notes Off" and "Reset All Controllers" for every channel.
pub fn reset_messages() -> impl Iterator<Item = Message> {
    (0..NUM_CHANNELS).flat_map(|channel| {
        [ALL_NOTES_OFF, RESET_ALL_CONTROLLERS]
            .into_iter()
            .map(move |control| Message::control_change(channel, control, 0))
    })
}

/// "All Sound Off" for every channel. Mutes notes regardless of envelopes.
pub fn panic_messages() -> impl Iterator<Item = Message> {
    (0..NUM_CHANNELS).map(|channel| Message::control_change(channel, ALL_SOUND_OFF, 0))
}
