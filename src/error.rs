//! Centralized error type for the midiport umbrella crate.
//!
//! Wraps the subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Port(#[from] midiport_io::PortError),

    #[error("decode: {0}")]
    Decode(#[from] midiport_core::DecodeError),

    #[error("invalid message: {0}")]
    InvalidMessage(#[from] midiport_core::InvalidMessage),
}

pub type Result<T> = std::result::Result<T, Error>;
