//! Error types for transports and the session facade.

use std::io;

use thiserror::Error;

use crate::core::{DecodeError, TurnError};

/// Failure of a transport operation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport i/o error: {0}")]
    Io(#[from] io::Error),
    /// The transport was closed locally; a blocked receive returns this.
    #[error("transport closed")]
    Closed,
    #[error("transport not connected")]
    NotConnected,
    #[error("no peer to send to")]
    NoPeer,
    #[error("could not resolve peer address {0}")]
    Resolve(String),
    #[error("payload of {len} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { len: usize, max: usize },
    /// The stream carried bytes that cannot be framed.
    #[error("stream framing error: {0}")]
    Framing(#[from] DecodeError),
}

/// Error returned by [`Session`](crate::session::Session) and
/// [`Link`](crate::runtime::Link) operations.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error(transparent)]
    Turn(#[from] TurnError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] io::Error),
}
