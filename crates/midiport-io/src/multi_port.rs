//! Several ports driven as one.
//!
//! Output fans out to every open output-capable member. Input from every
//! input-capable member is funneled into one channel, in arrival order.
//! Closing the multi-port disconnects a second channel, which wakes every
//! blocked poller.

use crossbeam_channel::{at, never, select, unbounded, Receiver, Sender};
use midiport_core::Message;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::port::Port;

type Tagged = (Arc<str>, Message);

pub struct MultiPort {
    ports: Vec<Arc<Port>>,
    tx: Sender<Tagged>,
    rx: Receiver<Tagged>,
    /// Dropped on close.
    shutdown: Mutex<Option<Sender<()>>>,
    closed: Receiver<()>,
}

impl MultiPort {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        let (shutdown, closed) = unbounded();
        Self {
            ports: Vec::new(),
            tx,
            rx,
            shutdown: Mutex::new(Some(shutdown)),
            closed,
        }
    }

    /// Builds a multi-port from `ports`. See [`add`](Self::add).
    pub fn with_ports(ports: impl IntoIterator<Item = Port>) -> Result<Self> {
        let mut multi = Self::new();
        for port in ports {
            multi.add(port)?;
        }
        Ok(multi)
    }

    /// Adds a member. An open input-capable member gets a callback that forwards
    /// into this multi-port, replacing any callback it had.
    pub fn add(&mut self, port: Port) -> Result<Arc<Port>> {
        let port = Arc::new(port);
        if port.direction().is_input() && port.is_open() {
            let tx = self.tx.clone();
            let tag: Arc<str> = Arc::from(port.name());
            port.register_callback(move |message| {
                let _ = tx.send((Arc::clone(&tag), message));
            })?;
        }
        tracing::debug!("Added '{}' to multi-port ({} members)", port.name(), self.ports.len() + 1);
        self.ports.push(Arc::clone(&port));
        Ok(port)
    }

    pub fn ports(&self) -> &[Arc<Port>] {
        &self.ports
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Sends `message` to every open output-capable member.
    ///
    /// Every member is attempted; the first error is returned afterwards.
    pub fn send(&self, message: &Message) -> Result<()> {
        message.validate()?;
        let mut first_error = None;
        for port in self
            .ports
            .iter()
            .filter(|p| p.direction().is_output() && p.is_open())
        {
            if let Err(e) = port.send(message) {
                tracing::debug!("Multi-port send to '{}' failed: {}", port.name(), e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Next message from any input member, waiting up to `timeout` (`None` waits indefinitely).
    pub fn poll(&self, timeout: Option<Duration>) -> Option<Message> {
        self.poll_tagged(timeout).map(|(_, message)| message)
    }

    /// Like [`poll`](Self::poll), together with the name of the member it came from.
    ///
    /// Returns `None` once the multi-port is closed, waking callers already waiting.
    pub fn poll_tagged(&self, timeout: Option<Duration>) -> Option<(Arc<str>, Message)> {
        if self.is_closed() {
            return None;
        }
        if let Ok(tagged) = self.rx.try_recv() {
            return Some(tagged);
        }

        let timer = timeout
            .and_then(|t| Instant::now().checked_add(t))
            .map_or_else(never, at);
        select! {
            recv(self.rx) -> tagged => tagged.ok(),
            recv(self.closed) -> _ => None,
            recv(timer) -> _ => None,
        }
    }

    /// Drains messages already received, without blocking.
    pub fn iter_pending(&self) -> impl Iterator<Item = (Arc<str>, Message)> + '_ {
        self.rx.try_iter()
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.lock().is_none()
    }

    /// Closes every member and discards messages not yet polled.
    ///
    /// The multi-port stays closed; later polls return `None` immediately.
    pub fn close(&self) {
        for port in &self.ports {
            let _ = port.close();
        }
        self.shutdown.lock().take();
        self.rx.try_iter().for_each(drop);
    }
}

impl Default for MultiPort {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MultiPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.ports.iter().map(|p| p.name()).collect();
        f.debug_struct("MultiPort")
            .field("ports", &names)
            .field("pending", &self.rx.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
