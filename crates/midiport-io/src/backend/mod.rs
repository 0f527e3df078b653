//! Backend contract: the transport behind a port.
//!
//! A backend claims a device when its port opens, writes encoded frames on send,
//! and releases the device on close. Inbound bytes reach the port through the
//! [`InboundSink`] handed over at claim time.

mod loopback;
pub use loopback::{LoopbackBackend, LoopbackHandle, LoopbackProvider};

#[cfg(feature = "midi-io")]
mod midir;
#[cfg(feature = "midi-io")]
pub use self::midir::{MidirBackend, MidirHandle, MidirProvider};

use std::sync::Arc;

use crate::error::BackendError;
use crate::port::PortCore;

pub trait Backend: Send + 'static {
    /// Exclusive claim on the device, held by the port between open and close.
    type Handle: Send + 'static;

    /// Claims the device. Input-capable backends keep `sink` and call
    /// [`InboundSink::on_receive`] for every frame that arrives.
    fn claim(&mut self, sink: InboundSink) -> Result<Self::Handle, BackendError>;

    /// Gives the device back. Must not block waiting for in-flight
    /// `on_receive` calls: they may be running a handler that calls into the port.
    fn release(&mut self, handle: Self::Handle);

    fn write(&mut self, handle: &mut Self::Handle, bytes: &[u8]) -> Result<(), BackendError>;
}

/// The port's receive entry point, handed to a backend by [`Backend::claim`].
///
/// Safe to call from any thread. Calls for one port must not overlap; calls for
/// different ports may. Once the port closes, the sink goes stale and everything
/// delivered through it is dropped, even if the port is opened again later.
#[derive(Clone)]
pub struct InboundSink {
    core: Arc<PortCore>,
    session: u64,
}

impl InboundSink {
    pub(crate) fn new(core: Arc<PortCore>, session: u64) -> Self {
        Self { core, session }
    }

    /// Feeds raw bytes from the transport. Malformed input is reported to the
    /// port's diagnostics hook and skipped.
    pub fn on_receive(&self, raw: &[u8]) {
        self.core.receive(self.session, raw);
    }

    /// Reports an unrecoverable transport failure. A fatal error moves the port
    /// to `Faulted`; anything else is only logged.
    pub fn fault(&self, error: BackendError) {
        if error.is_fatal() {
            self.core.fault(Some(self.session), error);
        } else {
            tracing::warn!("MIDI backend error on '{}': {}", self.core.name(), error);
        }
    }

    /// False once the session this sink belongs to has ended.
    pub fn is_active(&self) -> bool {
        self.core.is_current(self.session)
    }

    pub fn port_name(&self) -> &str {
        self.core.name()
    }
}

impl std::fmt::Debug for InboundSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundSink")
            .field("port", &self.core.name())
            .field("session", &self.session)
            .finish()
    }
}

/// Object-safe view of a backend together with its claim.
pub(crate) trait ClaimedBackend: Send {
    fn claim(&mut self, sink: InboundSink) -> Result<(), BackendError>;
    fn write(&mut self, bytes: &[u8]) -> Result<(), BackendError>;
    fn release(&mut self);
}

pub(crate) struct Claim<B: Backend> {
    backend: B,
    handle: Option<B::Handle>,
}

impl<B: Backend> Claim<B> {
    pub(crate) fn boxed(backend: B) -> Box<dyn ClaimedBackend> {
        Box::new(Self {
            backend,
            handle: None,
        })
    }
}

impl<B: Backend> ClaimedBackend for Claim<B> {
    fn claim(&mut self, sink: InboundSink) -> Result<(), BackendError> {
        if let Some(stale) = self.handle.take() {
            self.backend.release(stale);
        }
        self.handle = Some(self.backend.claim(sink)?);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), BackendError> {
        match self.handle.as_mut() {
            Some(handle) => self.backend.write(handle, bytes),
            None => Err(BackendError::Write("device not claimed".to_string())),
        }
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.backend.release(handle);
        }
    }
}
