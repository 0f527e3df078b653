use midiport_core::{MessageCodec, MidiCodec};
use std::num::NonZeroUsize;
use std::sync::Arc;

use super::Port;
use crate::backend::{Backend, Claim, ClaimedBackend};
use crate::config::{Direction, OverflowPolicy, PortConfig};
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::error::Result;

/// Fluent builder for [`Port`].
///
/// # Example
///
/// ```
/// use midiport_io::{LoopbackBackend, Port, Direction};
///
/// let port = Port::builder("synth", LoopbackBackend::new())
///     .direction(Direction::Both)
///     .bounded(256)
///     .autoreset(true)
///     .open()
///     .unwrap();
/// assert!(port.is_open());
/// ```
pub struct PortBuilder {
    name: String,
    config: PortConfig,
    backend: Box<dyn ClaimedBackend>,
    codec: Option<Arc<dyn MessageCodec>>,
    diagnostics: Option<Arc<dyn Diagnostics>>,
}

impl PortBuilder {
    pub(crate) fn new<B: Backend>(name: impl Into<String>, backend: B) -> Self {
        Self {
            name: name.into(),
            config: PortConfig::default(),
            backend: Claim::boxed(backend),
            codec: None,
            diagnostics: None,
        }
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.config.direction = direction;
        self
    }

    pub fn overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.config.overflow = overflow;
        self
    }

    /// Drop-oldest queue holding at most `capacity` messages. Zero means unbounded.
    pub fn bounded(self, capacity: usize) -> Self {
        let overflow = NonZeroUsize::new(capacity)
            .map(OverflowPolicy::DropOldest)
            .unwrap_or_default();
        self.overflow(overflow)
    }

    pub fn autoreset(mut self, autoreset: bool) -> Self {
        self.config.autoreset = autoreset;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: PortConfig) -> Self {
        self.config = config;
        self
    }

    /// Wire codec. Defaults to [`MidiCodec`].
    pub fn codec(mut self, codec: impl MessageCodec + 'static) -> Self {
        self.codec = Some(Arc::new(codec));
        self
    }

    /// Receive-path reporting hook. Defaults to [`TracingDiagnostics`].
    pub fn diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Builds the port in the `Closed` state.
    pub fn build(self) -> Port {
        Port::from_parts(
            self.name,
            self.config,
            self.backend,
            self.codec.unwrap_or_else(|| Arc::new(MidiCodec)),
            self.diagnostics
                .unwrap_or_else(|| Arc::new(TracingDiagnostics)),
        )
    }

    /// Builds and opens the port.
    pub fn open(self) -> Result<Port> {
        let port = self.build();
        port.open()?;
        Ok(port)
    }
}

impl std::fmt::Debug for PortBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortBuilder")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
