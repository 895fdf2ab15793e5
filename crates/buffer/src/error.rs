use thiserror::Error;

/// Wire-format invariant violations: bad magic, truncated reads, overruns.
///
/// Fatal to the offending connection only; siblings on the same dispatcher
/// are unaffected (see the propagation policy in the crate-level docs).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Reading beyond the end of the packet")]
    ReadBeyondEnd,
    #[error("invalid option map: {0}")]
    InvalidOptionMap(String),
    #[error("{0}")]
    Other(String),
}

impl ProtocolError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// A length or size field exceeds what this implementation is willing to
/// address. Fatal to the offending operation, not the whole process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("resource limit exceeded: {0}")]
pub struct ResourceError(pub String);
