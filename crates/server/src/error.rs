//! `ConfigError`/`ServerError` (§7): server configuration/accept-glue
//! failures. Federation-semantic errors (`FederationError`, §4.9) are the
//! omitted federation core's own taxonomy; this crate only needs to name
//! the slot and propagate it unchanged, never interpret it.

use std::io;

use openrti_net::TransportError;
use openrti_protocol::LayerError;
use thiserror::Error;

/// Errors raised while reading a server configuration document (§4.11,
/// §6.6): malformed XML, an unrecognized element, or a boolean attribute
/// that is not one of `1`/`0`/`t`/`f`/`T`/`F`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("xml error: {0}")]
    Xml(String),

    #[error("unexpected root element `{0}`, expected `OpenRTIServerConfig`")]
    UnexpectedRoot(String),

    #[error("unrecognized configuration element `{0}`")]
    UnrecognizedElement(String),

    #[error("element `{element}` is missing required attribute `{attribute}`")]
    MissingAttribute { element: String, attribute: String },

    #[error("attribute `{attribute}` on `{element}` is not a valid boolean: `{value}`")]
    InvalidBoolean {
        element: String,
        attribute: String,
        value: String,
    },

    #[error("unsupported configuration version `{0}`")]
    UnsupportedVersion(String),
}

impl ConfigError {
    pub fn xml(msg: impl Into<String>) -> Self {
        Self::Xml(msg.into())
    }
}

/// Federation-semantic errors (§4.9: `FederateNotExecutionMember`,
/// `ObjectClassNotDefined`, `InvalidLogicalTime`, `SaveInProgress`, ...)
/// raised by a concrete `ServerNode`. The transport core never constructs
/// or inspects one of these beyond routing it back to the caller, so it is
/// carried here as an opaque, displayable payload rather than the full
/// exception hierarchy a federation core would define.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct FederationError {
    pub kind: String,
    pub message: String,
}

impl FederationError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Errors from the accept/connect glue (§2 "Server/accept glue", §4.9):
/// binding a listener, dialing a parent, or a connection's own protocol
/// layers failing before it ever reaches the server node.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Layer(#[from] LayerError),

    #[error(transparent)]
    Federation(#[from] FederationError),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

impl ServerError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
