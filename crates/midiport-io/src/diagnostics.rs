//! Reporting hook for failures on the asynchronous receive path.
//!
//! Decode failures, handler panics, queue evictions and backend faults happen on
//! the backend's thread and never propagate to a caller. They are reported here.

use midiport_core::{DecodeError, Message};

use crate::dispatch::HandlerPanic;
use crate::error::BackendError;

/// Every method defaults to a `tracing` event.
pub trait Diagnostics: Send + Sync {
    fn decode_failed(&self, port: &str, error: &DecodeError) {
        tracing::warn!("Dropping malformed MIDI input on '{}': {}", port, error);
    }

    fn handler_panicked(&self, port: &str, panic: &HandlerPanic) {
        tracing::error!("MIDI handler on '{}' panicked: {}", port, panic.reason);
    }

    fn message_evicted(&self, port: &str, message: &Message) {
        tracing::debug!("Inbound queue full on '{}', evicted {}", port, message);
    }

    fn backend_faulted(&self, port: &str, error: &BackendError) {
        tracing::error!("MIDI port '{}' faulted: {}", port, error);
    }
}

/// Default hook: log everything through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {}
