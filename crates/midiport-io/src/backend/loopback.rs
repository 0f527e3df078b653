//! In-process backend that feeds every written frame back to the port's receive path.
//!
//! Delivery happens on a dedicated thread, like a hardware backend's notification
//! thread, so handlers and pollers see the same concurrency they would in production.

use crossbeam_channel::{unbounded, Sender};
use std::thread;

use super::{Backend, InboundSink};
use crate::config::PortConfig;
use crate::device::{BackendProvider, Device};
use crate::error::{BackendError, PortError, Result};
use crate::port::Port;

/// Echo backend. Open its port as [`Direction::Both`](crate::Direction::Both) to receive what you send.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoopbackBackend;

impl LoopbackBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Live claim on a [`LoopbackBackend`].
#[derive(Debug)]
pub struct LoopbackHandle {
    echo: Sender<Vec<u8>>,
}

impl Backend for LoopbackBackend {
    type Handle = LoopbackHandle;

    fn claim(&mut self, sink: InboundSink) -> std::result::Result<LoopbackHandle, BackendError> {
        let (echo, frames) = unbounded::<Vec<u8>>();
        let name = format!("midi-loopback-{}", sink.port_name());

        thread::Builder::new()
            .name(name)
            .spawn(move || {
                // Ends when the handle's sender is dropped on release
                for frame in frames.iter() {
                    sink.on_receive(&frame);
                }
            })
            .map_err(|e| BackendError::Transport(format!("failed to spawn loopback thread: {e}")))?;

        Ok(LoopbackHandle { echo })
    }

    fn release(&mut self, handle: LoopbackHandle) {
        drop(handle);
    }

    fn write(
        &mut self,
        handle: &mut LoopbackHandle,
        bytes: &[u8],
    ) -> std::result::Result<(), BackendError> {
        handle
            .echo
            .send(bytes.to_vec())
            .map_err(|_| BackendError::Disconnected("loopback thread exited".to_string()))
    }
}

/// Provider exposing a single bidirectional `"loopback"` device.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoopbackProvider;

impl LoopbackProvider {
    pub const NAME: &'static str = "loopback";
}

impl BackendProvider for LoopbackProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn devices(&self) -> Vec<Device> {
        vec![Device::new(Self::NAME, Self::NAME, true, true)]
    }

    fn open(&self, device: &str, config: PortConfig) -> Result<Port> {
        if device != Self::NAME {
            return Err(PortError::BackendUnavailable {
                port: device.to_string(),
                source: BackendError::NotFound(device.to_string()),
            });
        }
        Port::builder(device, LoopbackBackend::new())
            .config(config)
            .open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Direction;
    use midiport_core::Message;
    use std::time::Duration;

    #[test]
    fn test_echoes_written_frames() {
        let port = Port::builder("echo", LoopbackBackend::new())
            .direction(Direction::Both)
            .open()
            .unwrap();

        port.send(&Message::note_on(3, 64, 90)).unwrap();
        let received = port.poll(Some(Duration::from_secs(2))).unwrap();
        assert_eq!(received, Some(Message::note_on(3, 64, 90)));
        assert!(received.unwrap().timestamp().is_some());
    }

    #[test]
    fn test_provider_rejects_unknown_device() {
        let err = LoopbackProvider
            .open("nope", PortConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            PortError::BackendUnavailable {
                source: BackendError::NotFound(_),
                ..
            }
        ));
    }

    #[test]
    fn test_provider_opens_device() {
        let port = LoopbackProvider
            .open(LoopbackProvider::NAME, PortConfig::default())
            .unwrap();
        assert!(port.is_open());
        assert_eq!(port.direction(), Direction::Both);
    }
}
