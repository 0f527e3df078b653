//! MIDI port lifecycle over pluggable backends.
//!
//! A [`Port`] owns a [`Backend`], an inbound queue and an optional callback.
//! Inbound bytes arrive on a backend thread through an [`InboundSink`], are framed
//! and decoded, then go either to the registered callback or to the queue read by
//! [`Port::poll`].
//!
//! Feature gates: `midi-io` (system devices through `midir`).

pub mod error;
pub use error::{BackendError, PortError, Result};

pub mod config;
pub use config::{Direction, OverflowPolicy, PortConfig};

mod queue;

pub mod dispatch;
pub use dispatch::{Handler, HandlerPanic};

pub mod diagnostics;
pub use diagnostics::{Diagnostics, TracingDiagnostics};

pub mod backend;
pub use backend::{Backend, InboundSink, LoopbackBackend, LoopbackProvider};

#[cfg(feature = "midi-io")]
pub use backend::{MidirBackend, MidirProvider};

mod port;
pub use port::{Port, PortBuilder, PortState};

pub mod device;
pub use device::{BackendProvider, BackendRegistry, Device};

mod multi_port;
pub use multi_port::MultiPort;

pub use midiport_core::{Message, MessageCodec, MessageKind, MidiCodec};
