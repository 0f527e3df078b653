//! Test helpers for midiport integration tests.
//!
//! A virtual MIDI cable: two backends joined in-process, so one port's output
//! becomes another port's input, delivered on the sender's thread.

#![allow(dead_code)]

use midiport::{Backend, BackendError, BackendProvider, Device, Direction, Port, PortConfig};
use parking_lot::Mutex;
use std::sync::Arc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

type Socket = Arc<Mutex<Option<midiport::InboundSink>>>;

/// Sending end of a cable.
pub struct CableOut {
    socket: Socket,
}

/// Receiving end of a cable.
pub struct CableIn {
    socket: Socket,
}

pub fn cable() -> (CableOut, CableIn) {
    let socket: Socket = Arc::new(Mutex::new(None));
    (
        CableOut {
            socket: Arc::clone(&socket),
        },
        CableIn { socket },
    )
}

impl Backend for CableOut {
    type Handle = ();

    fn claim(&mut self, _sink: midiport::InboundSink) -> Result<(), BackendError> {
        Ok(())
    }

    fn release(&mut self, _handle: ()) {}

    fn write(&mut self, _handle: &mut (), bytes: &[u8]) -> Result<(), BackendError> {
        // Unplugged receiving end swallows the bytes, like a real cable
        let sink = self.socket.lock().clone();
        if let Some(sink) = sink {
            sink.on_receive(bytes);
        }
        Ok(())
    }
}

impl Backend for CableIn {
    type Handle = ();

    fn claim(&mut self, sink: midiport::InboundSink) -> Result<(), BackendError> {
        *self.socket.lock() = Some(sink);
        Ok(())
    }

    fn release(&mut self, _handle: ()) {
        self.socket.lock().take();
    }

    fn write(&mut self, _handle: &mut (), _bytes: &[u8]) -> Result<(), BackendError> {
        Err(BackendError::Write("cable input end cannot send".into()))
    }
}

/// Opened pair of ports joined by a cable: `(sender, receiver)`.
pub fn cable_ports(name: &str) -> (Port, Port) {
    init_tracing();
    let (out, inp) = cable();
    let receiver = Port::builder(format!("{name}-in"), inp)
        .direction(Direction::Input)
        .open()
        .unwrap();
    let sender = Port::builder(format!("{name}-out"), out)
        .direction(Direction::Output)
        .open()
        .unwrap();
    (sender, receiver)
}

/// Provider offering one output device per name, each swallowing what it is sent.
pub struct NullProvider {
    pub names: Vec<&'static str>,
}

impl BackendProvider for NullProvider {
    fn name(&self) -> &str {
        "null"
    }

    fn devices(&self) -> Vec<Device> {
        self.names
            .iter()
            .map(|name| Device::new(*name, "null", false, true))
            .collect()
    }

    fn open(&self, device: &str, config: PortConfig) -> midiport::io::Result<Port> {
        let (out, _in) = cable();
        Port::builder(device, out).config(config).open()
    }
}
