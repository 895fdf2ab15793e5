//! `TransportError`: OS-level I/O failure at the socket primitives layer
//! (§7). Converted from `io::Error` with a human-readable reason, mirroring
//! the errno/WSA-derived message the source attaches.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
