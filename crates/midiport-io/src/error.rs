//! Error types for ports and backends.

use thiserror::Error;

use crate::config::Direction;

pub use midiport_core::{DecodeError, InvalidMessage};

/// Failure reported by a backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("device '{0}' not found")]
    NotFound(String),

    #[error("device '{0}' is busy")]
    Busy(String),

    #[error("device disconnected: {0}")]
    Disconnected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("write failed: {0}")]
    Write(String),
}

impl BackendError {
    /// Fatal errors move an open port to `Faulted`.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Disconnected(_) | Self::Transport(_))
    }
}

#[derive(Error, Debug)]
pub enum PortError {
    #[error("backend unavailable for port '{port}': {source}")]
    BackendUnavailable {
        port: String,
        #[source]
        source: BackendError,
    },

    #[error("port '{port}' is faulted: {reason}")]
    PortFaulted { port: String, reason: String },

    #[error("port '{0}' is closed")]
    PortClosed(String),

    #[error("invalid message: {0}")]
    InvalidMessage(#[from] InvalidMessage),

    #[error("port '{port}' is {direction} only and cannot {operation}")]
    UnsupportedDirection {
        port: String,
        direction: Direction,
        operation: &'static str,
    },

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("unknown backend '{0}'")]
    UnknownBackend(String),
}

pub type Result<T> = std::result::Result<T, PortError>;
