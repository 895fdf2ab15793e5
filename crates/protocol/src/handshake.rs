//! The handshake layer (§4.5): exchanges one envelope each way over the
//! packetizer, negotiates version/encoding/compression via
//! [`crate::negotiation::negotiate`], then replaces itself with the framed-
//! message layer (optionally wrapped in compression) via
//! [`LayerAction::Replace`].
//!
//! Both ends run the same 12-byte-header-then-body shape; [`ServerHandshake`]
//! additionally computes and sends back the negotiation result, and
//! [`ClientHandshake`] sends its option map first and waits for the server's
//! answer.

use std::sync::{Arc, Mutex};

use openrti_net::Connection;
use openrti_wire::envelope::{decode_body, decode_header, encode_envelope, HEADER_LEN};
use openrti_wire::{Message, OptionMap};

use crate::compression::CompressionLayer;
use crate::error::LayerError;
use crate::framing::{FramedMessageLayer, MessageSender, MessageSink};
use crate::layer::{LayerAction, ProtocolLayer};
use crate::negotiation::{negotiate, Negotiated, ServerPolicy};
use crate::packetizer::{PacketReader, PacketWriter};

/// What the server node is asked to do once a peer's handshake succeeds:
/// hand back the [`MessageSink`] decoded messages should be delivered to
/// (§4.9 "insert_connect"/"insert_parent_connect").
pub trait ConnectSink: Send + Sync {
    fn accept(&self, negotiated: &Negotiated, sender: MessageSender) -> Arc<dyn MessageSink>;
}

/// Stands in for the real sink while the `FramedMessageLayer` is built, so a
/// [`MessageSender`] exists to hand to [`ConnectSink::accept`] before the
/// accept call has told us what the real sink is. Set exactly once.
struct DeferredSink(Mutex<Option<Arc<dyn MessageSink>>>);

impl DeferredSink {
    fn new() -> Self {
        Self(Mutex::new(None))
    }

    fn resolve(&self, sink: Arc<dyn MessageSink>) {
        *self.0.lock().unwrap() = Some(sink);
    }
}

impl MessageSink for DeferredSink {
    fn deliver(&self, message: Message) {
        if let Some(inner) = self.0.lock().unwrap().as_ref() {
            inner.deliver(message);
        } else {
            tracing::warn!("message dropped before handshake accept resolved the sink");
        }
    }
}

/// Builds the layer that takes over once negotiation succeeds: the framed-
/// message layer, wrapped in [`CompressionLayer`] if negotiation chose
/// `zlib`, and resolves `connect_sink.accept`'s result into it.
fn build_next_layer(
    negotiated: &Negotiated,
    connect_sink: &dyn ConnectSink,
) -> Box<dyn ProtocolLayer> {
    let deferred = Arc::new(DeferredSink::new());
    let (framed, sender) = FramedMessageLayer::new(deferred.clone());
    let real_sink = connect_sink.accept(negotiated, sender);
    deferred.resolve(real_sink);

    if negotiated.compression == "zlib" {
        Box::new(CompressionLayer::wrap(framed))
    } else {
        Box::new(framed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerState {
    ExpectHeader,
    ExpectBody,
    SendingResponse,
    SendingFailure,
}

/// The server side of one connection's handshake.
pub struct ServerHandshake {
    state: ServerState,
    reader: PacketReader,
    writer: PacketWriter,
    server_options: OptionMap,
    policy: ServerPolicy,
    connect_sink: Arc<dyn ConnectSink>,
    pending_next: Option<Box<dyn ProtocolLayer>>,
}

impl ServerHandshake {
    #[must_use]
    pub fn new(
        server_options: OptionMap,
        policy: ServerPolicy,
        connect_sink: Arc<dyn ConnectSink>,
    ) -> Self {
        let mut reader = PacketReader::new();
        reader.expect(HEADER_LEN);
        Self {
            state: ServerState::ExpectHeader,
            reader,
            writer: PacketWriter::new(),
            server_options,
            policy,
            connect_sink,
            pending_next: None,
        }
    }

    fn handle_body(&mut self, body: &[u8]) -> Result<LayerAction, LayerError> {
        let client_options = decode_body(body)
            .map_err(|e| LayerError::HandshakeFailed(format!("malformed option map: {e}")))?;

        match negotiate(&client_options, &self.server_options, self.policy) {
            Ok(negotiated) => {
                let mut response = OptionMap::new();
                response.set("version", vec![negotiated.version.clone()]);
                response.set("encoding", vec![negotiated.encoding.clone()]);
                response.set("compression", vec![negotiated.compression.clone()]);

                self.pending_next = Some(build_next_layer(&negotiated, self.connect_sink.as_ref()));
                self.writer.stage(encode_envelope(&response));
                self.state = ServerState::SendingResponse;
                Ok(LayerAction::Continue)
            }
            Err(errors) => {
                let mut response = OptionMap::new();
                response.set("error", errors);
                self.writer.stage(encode_envelope(&response));
                self.state = ServerState::SendingFailure;
                Ok(LayerAction::Continue)
            }
        }
    }
}

impl ProtocolLayer for ServerHandshake {
    fn wants_read(&self) -> bool {
        matches!(self.state, ServerState::ExpectHeader | ServerState::ExpectBody)
    }

    fn wants_write(&self) -> bool {
        matches!(
            self.state,
            ServerState::SendingResponse | ServerState::SendingFailure
        ) && !self.writer.is_idle()
    }

    fn on_readable(&mut self, conn: &Connection) -> Result<LayerAction, LayerError> {
        loop {
            match self.state {
                ServerState::ExpectHeader => {
                    if !self.reader.fill(conn)? {
                        return Ok(LayerAction::Continue);
                    }
                    let bytes = self.reader.take();
                    let header: [u8; HEADER_LEN] = bytes.as_slice().try_into().unwrap();
                    let body_len = decode_header(&header).map_err(|e| {
                        LayerError::HandshakeFailed(format!("bad envelope header: {e}"))
                    })?;
                    self.reader.expect(body_len);
                    self.state = ServerState::ExpectBody;
                }
                ServerState::ExpectBody => {
                    if !self.reader.fill(conn)? {
                        return Ok(LayerAction::Continue);
                    }
                    let body = self.reader.take();
                    return self.handle_body(&body);
                }
                ServerState::SendingResponse | ServerState::SendingFailure => {
                    return Ok(LayerAction::Continue);
                }
            }
        }
    }

    fn on_writable(&mut self, conn: &Connection) -> Result<LayerAction, LayerError> {
        if !self.writer.drain(conn)? {
            return Ok(LayerAction::Continue);
        }
        match self.state {
            ServerState::SendingResponse => {
                let next = self
                    .pending_next
                    .take()
                    .expect("response staged only after next layer is built");
                Ok(LayerAction::Replace(next))
            }
            ServerState::SendingFailure => Ok(LayerAction::Close),
            _ => Ok(LayerAction::Continue),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientState {
    SendingRequest,
    ExpectHeader,
    ExpectBody,
    Failed,
}

/// The client side of one connection's handshake.
pub struct ClientHandshake {
    state: ClientState,
    reader: PacketReader,
    writer: PacketWriter,
    connect_sink: Arc<dyn ConnectSink>,
    pending_next: Option<Box<dyn ProtocolLayer>>,
}

impl ClientHandshake {
    #[must_use]
    pub fn new(client_options: &OptionMap, connect_sink: Arc<dyn ConnectSink>) -> Self {
        let mut writer = PacketWriter::new();
        writer.stage(encode_envelope(client_options));
        Self {
            state: ClientState::SendingRequest,
            reader: PacketReader::new(),
            writer,
            connect_sink,
            pending_next: None,
        }
    }
}

impl ProtocolLayer for ClientHandshake {
    fn wants_read(&self) -> bool {
        matches!(self.state, ClientState::ExpectHeader | ClientState::ExpectBody)
    }

    fn wants_write(&self) -> bool {
        matches!(self.state, ClientState::SendingRequest) && !self.writer.is_idle()
    }

    fn on_readable(&mut self, conn: &Connection) -> Result<LayerAction, LayerError> {
        loop {
            match self.state {
                ClientState::SendingRequest => return Ok(LayerAction::Continue),
                ClientState::ExpectHeader => {
                    if !self.reader.fill(conn)? {
                        return Ok(LayerAction::Continue);
                    }
                    let bytes = self.reader.take();
                    let header: [u8; HEADER_LEN] = bytes.as_slice().try_into().unwrap();
                    let body_len = decode_header(&header).map_err(|e| {
                        LayerError::HandshakeFailed(format!("bad envelope header: {e}"))
                    })?;
                    self.reader.expect(body_len);
                    self.state = ClientState::ExpectBody;
                }
                ClientState::ExpectBody => {
                    if !self.reader.fill(conn)? {
                        return Ok(LayerAction::Continue);
                    }
                    let body = self.reader.take();
                    let response = decode_body(&body).map_err(|e| {
                        LayerError::HandshakeFailed(format!("malformed option map: {e}"))
                    })?;

                    if let Some(errors) = response.get("error") {
                        self.state = ClientState::Failed;
                        return Err(LayerError::HandshakeFailed(errors.join("; ")));
                    }

                    let negotiated = Negotiated {
                        version: response
                            .get("version")
                            .and_then(|v| v.first().cloned())
                            .unwrap_or_default(),
                        encoding: response
                            .get("encoding")
                            .and_then(|v| v.first().cloned())
                            .unwrap_or_default(),
                        compression: response
                            .get("compression")
                            .and_then(|v| v.first().cloned())
                            .unwrap_or_else(|| "no".to_string()),
                    };

                    self.pending_next =
                        Some(build_next_layer(&negotiated, self.connect_sink.as_ref()));
                    return Ok(LayerAction::Continue);
                }
                ClientState::Failed => return Ok(LayerAction::Close),
            }
        }
    }

    fn on_writable(&mut self, conn: &Connection) -> Result<LayerAction, LayerError> {
        if self.state != ClientState::SendingRequest {
            return Ok(LayerAction::Continue);
        }
        if !self.writer.drain(conn)? {
            return Ok(LayerAction::Continue);
        }
        if let Some(next) = self.pending_next.take() {
            return Ok(LayerAction::Replace(next));
        }
        let mut reader = PacketReader::new();
        reader.expect(HEADER_LEN);
        self.reader = reader;
        self.state = ClientState::ExpectHeader;
        Ok(LayerAction::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct NullSink;
    impl MessageSink for NullSink {
        fn deliver(&self, _message: Message) {}
    }

    struct RecordingConnectSink {
        seen: StdMutex<Vec<String>>,
    }

    impl ConnectSink for RecordingConnectSink {
        fn accept(&self, negotiated: &Negotiated, _sender: MessageSender) -> Arc<dyn MessageSink> {
            self.seen.lock().unwrap().push(negotiated.encoding.clone());
            Arc::new(NullSink)
        }
    }

    #[test]
    fn server_handshake_starts_waiting_on_the_header() {
        let sink = Arc::new(RecordingConnectSink {
            seen: StdMutex::new(Vec::new()),
        });
        let mut server_options = OptionMap::new();
        server_options.set("version", vec!["8".to_string()]);
        let handshake = ServerHandshake::new(
            server_options,
            ServerPolicy {
                prefer_compression: false,
                zlib_available: true,
            },
            sink,
        );
        assert!(handshake.wants_read());
        assert!(!handshake.wants_write());
    }

    #[test]
    fn client_handshake_starts_with_request_staged() {
        let sink = Arc::new(RecordingConnectSink {
            seen: StdMutex::new(Vec::new()),
        });
        let mut client_options = OptionMap::new();
        client_options.set("version", vec!["8".to_string()]);
        let handshake = ClientHandshake::new(&client_options, sink);
        assert!(handshake.wants_write());
        assert!(!handshake.wants_read());
    }

    #[test]
    fn build_next_layer_resolves_the_deferred_sink() {
        let sink = Arc::new(RecordingConnectSink {
            seen: StdMutex::new(Vec::new()),
        });
        let negotiated = Negotiated {
            version: "8".to_string(),
            encoding: "TightBE1".to_string(),
            compression: "no".to_string(),
        };
        let _layer = build_next_layer(&negotiated, sink.as_ref());
        assert_eq!(sink.seen.lock().unwrap().as_slice(), ["TightBE1"]);
    }
}
