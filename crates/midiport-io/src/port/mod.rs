//! The unified MIDI port.
//!
//! One [`Port`] type serves input, output or both; its [`Direction`] decides
//! which operations are allowed. Lifecycle:
//!
//! ```text
//! Closed --open()--> Open --close()--> Closed
//!                     |
//!                     +--(fatal backend error)--> Faulted --close()--> Closed
//! ```

mod builder;
pub use builder::PortBuilder;

use midiport_core::{reset_messages, panic_messages, DecodeError, Message, MessageCodec};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::backend::{Backend, ClaimedBackend, InboundSink};
use crate::config::{Direction, PortConfig};
use crate::diagnostics::Diagnostics;
use crate::dispatch::{CallbackDispatcher, Handler};
use crate::error::{BackendError, PortError, Result};
use crate::queue::{InboundQueue, Popped, Pushed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortState {
    Closed,
    Open,
    Faulted,
}

struct Status {
    state: PortState,
    /// Incremented on every open; sinks from earlier sessions go stale.
    session: u64,
    fault: Option<String>,
}

struct ReaderState {
    session: u64,
    frames: midiport_core::FrameReader,
}

/// State shared between a port and the backend threads feeding it.
pub(crate) struct PortCore {
    name: String,
    direction: Direction,
    status: Mutex<Status>,
    queue: InboundQueue,
    dispatcher: CallbackDispatcher,
    reader: Mutex<ReaderState>,
    codec: Arc<dyn MessageCodec>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl PortCore {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn is_current(&self, session: u64) -> bool {
        let status = self.status.lock();
        status.state == PortState::Open && status.session == session
    }

    fn check_open(&self, status: &Status) -> Result<()> {
        match status.state {
            PortState::Open => Ok(()),
            PortState::Closed => Err(PortError::PortClosed(self.name.clone())),
            PortState::Faulted => Err(PortError::PortFaulted {
                port: self.name.clone(),
                reason: status.fault.clone().unwrap_or_default(),
            }),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        let status = self.status.lock();
        self.check_open(&status)
    }

    fn ensure_direction(&self, allowed: bool, operation: &'static str) -> Result<()> {
        if allowed {
            Ok(())
        } else {
            Err(PortError::UnsupportedDirection {
                port: self.name.clone(),
                direction: self.direction,
                operation,
            })
        }
    }

    pub(crate) fn receive(&self, session: u64, raw: &[u8]) {
        if !self.direction.is_input() {
            tracing::trace!("Ignoring {} bytes on output-only port '{}'", raw.len(), self.name);
            return;
        }
        if !self.is_current(session) {
            return;
        }

        let arrival = Instant::now();
        let mut decoded: SmallVec<[std::result::Result<Message, DecodeError>; 4]> =
            SmallVec::new();
        {
            let mut reader = self.reader.lock();
            if reader.session != session {
                reader.frames.reset();
                reader.session = session;
            }
            let codec = &self.codec;
            reader
                .frames
                .feed(raw, |frame| decoded.push(frame.and_then(|bytes| codec.decode(bytes))));
        }

        for result in decoded {
            match result {
                Ok(message) => self.deliver(session, message.with_timestamp(arrival)),
                Err(error) => self.diagnostics.decode_failed(&self.name, &error),
            }
        }
    }

    fn deliver(&self, session: u64, message: Message) {
        if !self.is_current(session) {
            return;
        }
        match self.dispatcher.dispatch(message) {
            Ok(Ok(())) => {}
            Ok(Err(panic)) => self.diagnostics.handler_panicked(&self.name, &panic),
            Err(message) => match self.queue.push(session, message) {
                Pushed::Queued => {}
                Pushed::Evicted(evicted) => self.diagnostics.message_evicted(&self.name, &evicted),
                Pushed::Closed => {
                    tracing::trace!("Port '{}' closed or reopened while delivering", self.name);
                }
            },
        }
    }

    /// Moves an open port to `Faulted`. With `session`, only if it is still current.
    pub(crate) fn fault(&self, session: Option<u64>, error: BackendError) -> bool {
        {
            let mut status = self.status.lock();
            if status.state != PortState::Open {
                return false;
            }
            if session.is_some_and(|s| s != status.session) {
                return false;
            }
            status.state = PortState::Faulted;
            status.fault = Some(error.to_string());
        }
        self.queue.close();
        self.diagnostics.backend_faulted(&self.name, &error);
        true
    }
}

/// A MIDI endpoint over a pluggable [`Backend`].
///
/// All methods take `&self`; share a port across threads with `Arc<Port>`.
/// Dropping the port closes it.
pub struct Port {
    core: Arc<PortCore>,
    config: PortConfig,
    backend: Mutex<Box<dyn ClaimedBackend>>,
}

impl Port {
    pub fn builder<B: Backend>(name: impl Into<String>, backend: B) -> PortBuilder {
        PortBuilder::new(name, backend)
    }

    /// Closed port with default configuration for `direction`.
    pub fn new<B: Backend>(name: impl Into<String>, direction: Direction, backend: B) -> Self {
        PortBuilder::new(name, backend).direction(direction).build()
    }

    pub(crate) fn from_parts(
        name: String,
        config: PortConfig,
        backend: Box<dyn ClaimedBackend>,
        codec: Arc<dyn MessageCodec>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        let core = PortCore {
            name,
            direction: config.direction,
            status: Mutex::new(Status {
                state: PortState::Closed,
                session: 0,
                fault: None,
            }),
            queue: InboundQueue::new(config.overflow),
            dispatcher: CallbackDispatcher::new(),
            reader: Mutex::new(ReaderState {
                session: 0,
                frames: midiport_core::FrameReader::new(),
            }),
            codec,
            diagnostics,
        };
        Self {
            core: Arc::new(core),
            config,
            backend: Mutex::new(backend),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.core.name
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.core.direction
    }

    pub fn config(&self) -> &PortConfig {
        &self.config
    }

    pub fn state(&self) -> PortState {
        self.core.status.lock().state
    }

    pub fn is_open(&self) -> bool {
        self.state() == PortState::Open
    }

    /// Number of queued inbound messages.
    pub fn pending(&self) -> usize {
        self.core.queue.len()
    }

    /// Claims the backend. No-op on an open port.
    pub fn open(&self) -> Result<()> {
        let mut backend = self.backend.lock();
        let session = {
            let mut status = self.core.status.lock();
            match status.state {
                PortState::Open => return Ok(()),
                PortState::Faulted => return self.core.check_open(&status),
                PortState::Closed => {}
            }
            status.session += 1;
            status.state = PortState::Open;
            status.fault = None;
            self.core.queue.open(status.session);
            status.session
        };

        let sink = InboundSink::new(Arc::clone(&self.core), session);
        if let Err(source) = backend.claim(sink) {
            self.core.status.lock().state = PortState::Closed;
            // A handler registered while the claim was pending must not outlive it
            self.core.dispatcher.unregister();
            self.core.queue.close();
            tracing::debug!("Failed to open MIDI port '{}': {}", self.name(), source);
            return Err(PortError::BackendUnavailable {
                port: self.name().to_string(),
                source,
            });
        }

        tracing::debug!("Opened MIDI port '{}' ({})", self.name(), self.direction());
        Ok(())
    }

    /// Releases the backend, drops the callback and discards queued messages.
    ///
    /// Always succeeds. Also the way out of `Faulted`.
    pub fn close(&self) -> Result<()> {
        let mut backend = self.backend.lock();
        let previous = self.core.status.lock().state;
        if previous == PortState::Closed {
            return Ok(());
        }

        if previous == PortState::Open && self.config.autoreset && self.direction().is_output() {
            for message in reset_messages() {
                let frame = self.core.codec.encode(&message);
                if let Err(e) = backend.write(&frame) {
                    tracing::debug!("Autoreset on '{}' stopped: {}", self.name(), e);
                    break;
                }
            }
        }

        {
            let mut status = self.core.status.lock();
            status.state = PortState::Closed;
            status.fault = None;
        }
        self.core.dispatcher.unregister();
        let discarded = self.core.queue.close();
        backend.release();

        tracing::debug!(
            "Closed MIDI port '{}' ({} pending messages discarded)",
            self.name(),
            discarded
        );
        Ok(())
    }

    /// Validates, encodes and writes `message`.
    ///
    /// Nothing reaches the backend unless the port is open and the message is valid.
    pub fn send(&self, message: &Message) -> Result<()> {
        self.core
            .ensure_direction(self.direction().is_output(), "send")?;
        let mut backend = self.backend.lock();
        self.core.ensure_open()?;
        message.validate()?;
        let frame = self.core.codec.encode(message);
        self.write_frame(&mut **backend, &frame)
    }

    fn write_frame(&self, backend: &mut dyn ClaimedBackend, frame: &[u8]) -> Result<()> {
        match backend.write(frame) {
            Ok(()) => Ok(()),
            Err(error) if error.is_fatal() => {
                let reason = error.to_string();
                self.core.fault(None, error);
                Err(PortError::PortFaulted {
                    port: self.name().to_string(),
                    reason,
                })
            }
            Err(error) => Err(PortError::Backend(error)),
        }
    }

    /// "All Notes Off" and "Reset All Controllers" on every channel. No-op when closed.
    pub fn send_reset(&self) -> Result<()> {
        self.send_sequence(reset_messages())
    }

    /// "All Sound Off" on every channel. No-op when closed.
    pub fn send_panic(&self) -> Result<()> {
        self.send_sequence(panic_messages())
    }

    fn send_sequence(&self, messages: impl Iterator<Item = Message>) -> Result<()> {
        if self.state() == PortState::Closed {
            return Ok(());
        }
        for message in messages {
            self.send(&message)?;
        }
        Ok(())
    }

    /// Waits up to `timeout` for the next queued message.
    ///
    /// `Some(Duration::ZERO)` never blocks, `None` waits indefinitely. Returns
    /// `Ok(None)` on timeout, or as soon as the port is closed or faulted by
    /// another thread.
    pub fn poll(&self, timeout: Option<Duration>) -> Result<Option<Message>> {
        self.core
            .ensure_direction(self.direction().is_input(), "receive")?;
        self.core.ensure_open()?;
        match self.core.queue.pop(timeout) {
            Popped::Message(message) => Ok(Some(message)),
            Popped::TimedOut | Popped::Closed => Ok(None),
        }
    }

    /// Non-blocking [`poll`](Self::poll).
    pub fn try_receive(&self) -> Result<Option<Message>> {
        self.poll(Some(Duration::ZERO))
    }

    /// Drains queued messages without blocking.
    pub fn iter_pending(&self) -> impl Iterator<Item = Message> + '_ {
        std::iter::from_fn(move || self.try_receive().ok().flatten())
    }

    /// Blocks for each message until the port leaves `Open`.
    pub fn incoming(&self) -> impl Iterator<Item = Message> + '_ {
        std::iter::from_fn(move || self.poll(None).ok().flatten())
    }

    /// Delivers inbound messages to `handler` instead of the queue, replacing any
    /// previous handler. Messages already queued stay queued.
    ///
    /// The handler runs on the backend's thread. A panic inside it is caught and
    /// reported to the diagnostics hook.
    pub fn register_callback<F>(&self, handler: F) -> Result<()>
    where
        F: FnMut(Message) + Send + 'static,
    {
        self.register_handler(Box::new(handler))
    }

    pub fn register_handler(&self, handler: Handler) -> Result<()> {
        self.core
            .ensure_direction(self.direction().is_input(), "register a callback")?;
        let status = self.core.status.lock();
        self.core.check_open(&status)?;
        self.core.dispatcher.register(handler);
        Ok(())
    }

    /// Reverts to queue delivery.
    pub fn unregister_callback(&self) {
        self.core.dispatcher.unregister();
    }

    pub fn has_callback(&self) -> bool {
        self.core.dispatcher.is_registered()
    }

    /// Receive entry point for the current session, as if the backend delivered `raw`.
    pub fn on_receive(&self, raw: &[u8]) {
        let session = self.core.status.lock().session;
        self.core.receive(session, raw);
    }
}

impl Drop for Port {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl std::fmt::Debug for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Port")
            .field("name", &self.core.name)
            .field("direction", &self.core.direction)
            .field("state", &self.state())
            .field("pending", &self.pending())
            .finish()
    }
}
