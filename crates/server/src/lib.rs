//! The server node interface (§3, §4.9), the in-memory reference
//! implementation of it, the accept/connect glue that wires listeners and
//! outbound connections through the handshake into a node, and the server
//! configuration reader (§4.11, §6.6).

pub mod accept;
pub mod config;
pub mod error;
pub mod node;
pub mod trace;

pub use accept::{client_options, server_options, Server};
pub use config::{read as read_config, ListenEntry, ServerConfig};
pub use error::{ConfigError, FederationError, ServerError};
pub use node::{ChildConnectSink, InMemoryServerNode, ParentConnectSink, Role, ServerNode};
pub use trace::{TracingConnectSink, TracingMessageSink};
