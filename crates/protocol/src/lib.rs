//! Protocol layers for `OpenRTI` connections (§4):
//! the replaceable layer slot, the stream-buffer packetizer, the initial
//! handshake, negotiation policy, the optional zlib compression layer, and
//! the framed-message layer that carries typed `TightBE1` messages.
//!
//! Layers compose top-down over a raw [`openrti_net::Connection`]: a
//! freshly accepted or connected socket starts out wrapped in a
//! [`handshake::ServerHandshake`] or [`handshake::ClientHandshake`], which
//! replaces itself in place (`layer::LayerAction::Replace`) with a
//! [`framing::FramedMessageLayer`], optionally wrapped in
//! [`compression::CompressionLayer`], once negotiation completes.

pub mod compression;
pub mod error;
pub mod framing;
pub mod handshake;
pub mod layer;
pub mod negotiation;
pub mod packetizer;

pub use compression::CompressionLayer;
pub use error::LayerError;
pub use framing::{FramedMessageLayer, MessageSender, MessageSink, OUTBOUND_QUEUE_CAPACITY};
pub use handshake::{ClientHandshake, ConnectSink, ServerHandshake};
pub use layer::{LayerAction, ProtocolLayer, ProtocolSocket};
pub use negotiation::{negotiate, Negotiated, ServerPolicy, ENCODING, PROTOCOL_VERSION};
pub use packetizer::{PacketReader, PacketWriter};
