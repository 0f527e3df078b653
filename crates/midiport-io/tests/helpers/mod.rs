//! Test fixtures: a scriptable mock backend and a diagnostics hook that records
//! everything it is told.

#![allow(dead_code)]

use midiport_core::{DecodeError, Message};
use midiport_io::{Backend, BackendError, Diagnostics, HandlerPanic, InboundSink};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Shared view into a [`MockBackend`].
#[derive(Default)]
pub struct MockControl {
    pub claims: AtomicUsize,
    pub releases: AtomicUsize,
    pub writes: Mutex<Vec<Vec<u8>>>,
    sinks: Mutex<Vec<InboundSink>>,
    fail_claim: AtomicBool,
    write_error: Mutex<Option<BackendError>>,
    on_claim: Mutex<Option<Box<dyn FnMut() + Send>>>,
}

impl MockControl {
    pub fn claims(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    /// Sink from the most recent claim.
    pub fn sink(&self) -> InboundSink {
        self.sinks
            .lock()
            .last()
            .cloned()
            .expect("backend was never claimed")
    }

    /// Sink from the `n`th claim, oldest first.
    pub fn sink_at(&self, n: usize) -> InboundSink {
        self.sinks.lock()[n].clone()
    }

    /// Simulates the device delivering `raw`.
    pub fn deliver(&self, raw: &[u8]) {
        self.sink().on_receive(raw);
    }

    pub fn fail_claims(&self, fail: bool) {
        self.fail_claim.store(fail, Ordering::SeqCst);
    }

    /// Runs `hook` inside every subsequent claim, before it succeeds or fails.
    pub fn on_claim(&self, hook: Option<Box<dyn FnMut() + Send>>) {
        *self.on_claim.lock() = hook;
    }

    /// Makes every subsequent write fail with `error`.
    pub fn fail_writes(&self, error: Option<BackendError>) {
        *self.write_error.lock() = error;
    }
}

pub struct MockBackend {
    mock: Arc<MockControl>,
}

impl MockBackend {
    pub fn new() -> (Self, Arc<MockControl>) {
        let mock = Arc::new(MockControl::default());
        (
            Self {
                mock: Arc::clone(&mock),
            },
            mock,
        )
    }
}

impl Backend for MockBackend {
    type Handle = ();

    fn claim(&mut self, sink: InboundSink) -> Result<(), BackendError> {
        if let Some(hook) = self.mock.on_claim.lock().as_mut() {
            hook();
        }
        if self.mock.fail_claim.load(Ordering::SeqCst) {
            return Err(BackendError::Busy("mock".into()));
        }
        self.mock.claims.fetch_add(1, Ordering::SeqCst);
        self.mock.sinks.lock().push(sink);
        Ok(())
    }

    fn release(&mut self, _handle: ()) {
        self.mock.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn write(&mut self, _handle: &mut (), bytes: &[u8]) -> Result<(), BackendError> {
        if let Some(error) = self.mock.write_error.lock().clone() {
            return Err(error);
        }
        self.mock.writes.lock().push(bytes.to_vec());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingDiagnostics {
    pub decode_errors: Mutex<Vec<DecodeError>>,
    pub panics: Mutex<Vec<String>>,
    pub evicted: Mutex<Vec<Message>>,
    pub faults: Mutex<Vec<BackendError>>,
}

impl Diagnostics for RecordingDiagnostics {
    fn decode_failed(&self, _port: &str, error: &DecodeError) {
        self.decode_errors.lock().push(error.clone());
    }

    fn handler_panicked(&self, _port: &str, panic: &HandlerPanic) {
        self.panics.lock().push(panic.reason.clone());
    }

    fn message_evicted(&self, _port: &str, message: &Message) {
        self.evicted.lock().push(message.clone());
    }

    fn backend_faulted(&self, _port: &str, error: &BackendError) {
        self.faults.lock().push(error.clone());
    }
}
