//! Hardware backend over `midir`.
//!
//! Connections live on a dedicated thread for platform thread-safety; the port
//! talks to it through a command channel.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use std::thread;

use super::{Backend, InboundSink};
use crate::config::PortConfig;
use crate::device::{BackendProvider, Device};
use crate::error::{BackendError, Result};
use crate::port::Port;

const CLIENT_NAME: &str = "midiport";

enum Command {
    Send(Vec<u8>),
    Shutdown,
}

/// Backend for a system MIDI device, matched by case-insensitive name substring.
#[derive(Debug, Clone)]
pub struct MidirBackend {
    device: String,
    input: bool,
    output: bool,
}

impl MidirBackend {
    pub fn new(device: impl Into<String>, input: bool, output: bool) -> Self {
        Self {
            device: device.into(),
            input,
            output,
        }
    }

    pub fn input(device: impl Into<String>) -> Self {
        Self::new(device, true, false)
    }

    pub fn output(device: impl Into<String>) -> Self {
        Self::new(device, false, true)
    }
}

#[derive(Debug)]
pub struct MidirHandle {
    commands: Sender<Command>,
    results: Receiver<std::result::Result<(), BackendError>>,
}

impl Backend for MidirBackend {
    type Handle = MidirHandle;

    fn claim(&mut self, sink: InboundSink) -> std::result::Result<MidirHandle, BackendError> {
        let (commands, command_rx) = unbounded();
        let (results_tx, results) = bounded(1);
        let (ready_tx, ready_rx) = bounded(1);
        let target = self.clone();

        thread::Builder::new()
            .name(format!("midi-device-{}", sink.port_name()))
            .spawn(move || {
                let connections = match target.connect(sink.clone()) {
                    Ok(connections) => {
                        let _ = ready_tx.send(Ok(()));
                        connections
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                device_thread(connections, command_rx, results_tx, sink);
            })
            .map_err(|e| BackendError::Transport(format!("failed to spawn MIDI thread: {e}")))?;

        ready_rx
            .recv()
            .map_err(|_| BackendError::Transport("MIDI thread exited during connect".to_string()))??;

        tracing::debug!("Connected to MIDI device '{}'", self.device);
        Ok(MidirHandle { commands, results })
    }

    fn release(&mut self, handle: MidirHandle) {
        // Not joined: the input callback may be inside a handler that calls into the port
        let _ = handle.commands.send(Command::Shutdown);
    }

    fn write(
        &mut self,
        handle: &mut MidirHandle,
        bytes: &[u8],
    ) -> std::result::Result<(), BackendError> {
        handle
            .commands
            .send(Command::Send(bytes.to_vec()))
            .map_err(|_| BackendError::Disconnected(self.device.clone()))?;
        handle
            .results
            .recv()
            .map_err(|_| BackendError::Disconnected(self.device.clone()))?
    }
}

struct Connections {
    input: Option<MidiInputConnection<()>>,
    output: Option<MidiOutputConnection>,
}

impl MidirBackend {
    fn connect(&self, sink: InboundSink) -> std::result::Result<Connections, BackendError> {
        let input = if self.input {
            Some(self.connect_input(sink)?)
        } else {
            None
        };
        let output = if self.output {
            Some(self.connect_output()?)
        } else {
            None
        };
        Ok(Connections { input, output })
    }

    fn connect_input(
        &self,
        sink: InboundSink,
    ) -> std::result::Result<MidiInputConnection<()>, BackendError> {
        let mut midi_input =
            MidiInput::new(CLIENT_NAME).map_err(|e| BackendError::Transport(e.to_string()))?;
        midi_input.ignore(Ignore::None);

        let ports = midi_input.ports();
        let port = ports
            .iter()
            .find(|p| {
                midi_input
                    .port_name(p)
                    .is_ok_and(|name| matches_device(&name, &self.device))
            })
            .ok_or_else(|| BackendError::NotFound(self.device.clone()))?;

        midi_input
            .connect(
                port,
                "midiport-input",
                move |_timestamp, bytes, _| sink.on_receive(bytes),
                (),
            )
            .map_err(|e| BackendError::Busy(format!("{}: {}", self.device, e)))
    }

    fn connect_output(&self) -> std::result::Result<MidiOutputConnection, BackendError> {
        let midi_output =
            MidiOutput::new(CLIENT_NAME).map_err(|e| BackendError::Transport(e.to_string()))?;

        let ports = midi_output.ports();
        let port = ports
            .iter()
            .find(|p| {
                midi_output
                    .port_name(p)
                    .is_ok_and(|name| matches_device(&name, &self.device))
            })
            .ok_or_else(|| BackendError::NotFound(self.device.clone()))?;

        midi_output
            .connect(port, "midiport-output")
            .map_err(|e| BackendError::Busy(format!("{}: {}", self.device, e)))
    }
}

fn matches_device(name: &str, wanted: &str) -> bool {
    name.to_lowercase().contains(&wanted.to_lowercase())
}

fn device_thread(
    mut connections: Connections,
    commands: Receiver<Command>,
    results: Sender<std::result::Result<(), BackendError>>,
    sink: InboundSink,
) {
    for command in commands.iter() {
        match command {
            Command::Send(bytes) => {
                let result = match connections.output.as_mut() {
                    Some(conn) => conn
                        .send(&bytes)
                        .map_err(|e| BackendError::Write(e.to_string())),
                    None => Err(BackendError::Write("no output connection".to_string())),
                };
                if results.send(result).is_err() {
                    break;
                }
            }
            Command::Shutdown => break,
        }
    }

    if let Some(conn) = connections.input.take() {
        let _ = conn.close();
    }
    if let Some(conn) = connections.output.take() {
        let _ = conn.close();
    }
    tracing::debug!("MIDI device thread for '{}' stopped", sink.port_name());
}

/// Enumerates system MIDI devices through `midir`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MidirProvider;

impl MidirProvider {
    pub const NAME: &'static str = "midir";
}

impl BackendProvider for MidirProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn devices(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = Vec::new();

        if let Ok(midi_input) = MidiInput::new(CLIENT_NAME) {
            for port in midi_input.ports() {
                if let Ok(name) = midi_input.port_name(&port) {
                    devices.push(Device::new(name, Self::NAME, true, false));
                }
            }
        }
        if let Ok(midi_output) = MidiOutput::new(CLIENT_NAME) {
            for port in midi_output.ports() {
                if let Ok(name) = midi_output.port_name(&port) {
                    match devices.iter_mut().find(|d| d.name == name) {
                        Some(existing) => existing.is_output = true,
                        None => devices.push(Device::new(name, Self::NAME, false, true)),
                    }
                }
            }
        }
        devices
    }

    fn open(&self, device: &str, config: PortConfig) -> Result<Port> {
        let backend = MidirBackend::new(
            device,
            config.direction.is_input(),
            config.direction.is_output(),
        );
        Port::builder(device, backend).config(config).open()
    }
}
