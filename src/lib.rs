//! # midiport - unified MIDI ports
//!
//! One port type for input, output or both, over pluggable backends.
//!
//! ## Architecture
//!
//! midiport is an umbrella crate that coordinates:
//! - **midiport-core** - Message model, wire codec, stream framing
//! - **midiport-io** - Port lifecycle, inbound queue, callback dispatch, backends
//!
//! ## Quick Start
//!
//! ```
//! use midiport::prelude::*;
//! use std::time::Duration;
//!
//! # fn main() -> midiport::Result<()> {
//! let port = Port::builder("echo", LoopbackBackend::new())
//!     .direction(Direction::Both)
//!     .open()?;
//!
//! port.send(&Message::note_on(0, 60, 100))?;
//! let echoed = port.poll(Some(Duration::from_secs(1)))?;
//! assert_eq!(echoed, Some(Message::note_on(0, 60, 100)));
//!
//! port.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Loopback backend only
//! - `midi-io` - System MIDI devices through `midir`

/// Re-export of midiport-core for direct access
pub use midiport_core as core;

/// Re-export of midiport-io for direct access
pub use midiport_io as io;

// Message model
pub use midiport_core::{
    panic_messages, reset_messages, DecodeError, Frame, FrameReader, InvalidMessage, Message,
    MessageCodec, MessageKind, MidiCodec, MidiMsg, NUM_CHANNELS,
};

// Ports
pub use midiport_io::{
    Backend, BackendError, BackendProvider, BackendRegistry, Device, Diagnostics, Direction,
    Handler, HandlerPanic, InboundSink, LoopbackBackend, LoopbackProvider, MultiPort,
    OverflowPolicy, Port, PortBuilder, PortConfig, PortError, PortState, TracingDiagnostics,
};

#[cfg(feature = "midi-io")]
pub use midiport_io::{MidirBackend, MidirProvider};

pub mod error;
pub use error::{Error, Result};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{Message, MessageKind};

    pub use crate::{Direction, Port, PortBuilder, PortConfig, PortState};

    pub use crate::{Backend, InboundSink, LoopbackBackend};

    pub use crate::{BackendRegistry, Device, MultiPort};
}
