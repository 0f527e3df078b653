//! Push-based delivery of inbound messages.
//!
//! The handler slot is an atomically swapped pointer, so registering or
//! unregistering never waits for an invocation in progress. Each handler sits
//! behind its own mutex; invocations of one handler are serialized.

use arc_swap::ArcSwapOption;
use midiport_core::Message;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Boxed inbound message handler.
pub type Handler = Box<dyn FnMut(Message) + Send + 'static>;

type Slot = Mutex<Handler>;

/// A handler panicked while processing a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerPanic {
    pub reason: String,
}

impl HandlerPanic {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let reason = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self { reason }
    }
}

pub struct CallbackDispatcher {
    slot: ArcSwapOption<Slot>,
}

impl Default for CallbackDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackDispatcher {
    pub fn new() -> Self {
        Self {
            slot: ArcSwapOption::empty(),
        }
    }

    /// Installs `handler`, replacing any previous one.
    pub fn register(&self, handler: Handler) {
        self.slot.store(Some(Arc::new(Mutex::new(handler))));
    }

    /// Removes the handler. Returns whether one was registered.
    pub fn unregister(&self) -> bool {
        self.slot.swap(None).is_some()
    }

    pub fn is_registered(&self) -> bool {
        self.slot.load().is_some()
    }

    /// Delivers `message` to the current handler.
    ///
    /// Returns the message back when no handler is registered, so the caller
    /// can queue it instead. A panicking handler is caught and reported as
    /// `Ok(Err(..))`; the handler stays registered.
    pub fn dispatch(&self, message: Message) -> Result<Result<(), HandlerPanic>, Message> {
        let Some(slot) = self.slot.load_full() else {
            return Err(message);
        };
        let mut handler = slot.lock();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (&mut **handler)(message)));
        Ok(outcome.map_err(HandlerPanic::from_payload))
    }
}

impl std::fmt::Debug for CallbackDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackDispatcher")
            .field("registered", &self.is_registered())
            .finish()
    }
}
