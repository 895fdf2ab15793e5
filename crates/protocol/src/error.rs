use std::io;

use openrti_buffer::{ProtocolError, ResourceError};
use thiserror::Error;

/// Error taxonomy for the protocol-layer stack (§7): everything a
/// [`crate::layer::ProtocolLayer`] can fail with, short of the
/// federation-semantic errors the server node itself raises.
#[derive(Debug, Error)]
pub enum LayerError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    #[error("handshake rejected: {0}")]
    HandshakeFailed(String),
}

impl LayerError {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Protocol(ProtocolError::other(msg))
    }
}

impl From<LayerError> for ProtocolError {
    fn from(err: LayerError) -> Self {
        match err {
            LayerError::Protocol(e) => e,
            other => ProtocolError::other(other.to_string()),
        }
    }
}
