//! The framed-message layer (§4.8): serializes/deserializes `TightBE1`
//! packets over a raw byte stream (or, wrapped in [`crate::compression`], a
//! decompressed one), multiplexing a per-connection outbound queue and
//! routing decoded inbound messages to the server node.
//!
//! `TightBE1`'s field encoding ([`openrti_wire::encode_message`]) does not
//! self-delimit a packet boundary on the wire, so this layer prefixes every
//! packet with its own varint length before the encoded message, since the
//! packetizer contract (§4.4) needs *some* way to know a packet is
//! complete, and a length prefix is what every other framing scheme in
//! this stack (the handshake envelope, the option-map body) already uses.

use std::sync::Arc;

use openrti_buffer::{DecodeCursor, EncodeCursor, ProtocolError, VariableLengthData};
use openrti_net::Connection;
use openrti_wire::{decode_message, encode_message, Message};
use tokio::sync::mpsc;

use crate::error::LayerError;
use crate::layer::{ignore_would_block, read_available, LayerAction, ProtocolLayer, ReadOutcome};

/// Capacity of the outbound message queue each connection is given (§4.8
/// "a bounded MPSC-style message queue feeds the encoder").
pub const OUTBOUND_QUEUE_CAPACITY: usize = 1024;

/// The per-connection half of the server node's consumer interface (§3
/// "Server node (abstract)", §4.9): where decoded inbound messages, plus a
/// synthesized [`Message::ConnectionLost`] on EOF or parse failure (§7),
/// are routed. Implemented by the server crate's connection registry.
pub trait MessageSink: Send + Sync {
    fn deliver(&self, message: Message);
}

/// The handle a connecting peer is given to queue outbound messages; the
/// framed-message layer drains it on write readiness. This is the
/// `AbstractMessageSender` the server node gets back from
/// `insert_connect`/`insert_parent_connect` (§4.9).
#[derive(Clone)]
pub struct MessageSender {
    tx: mpsc::Sender<Message>,
}

impl MessageSender {
    /// Non-blocking enqueue; fails if the peer's outbound queue is full or
    /// the connection already closed.
    pub fn try_send(&self, message: Message) -> Result<(), Message> {
        self.tx.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(m) | mpsc::error::TrySendError::Closed(m) => m,
        })
    }
}

fn encode_packet(message: &Message) -> VariableLengthData {
    let encoded = encode_message(message);
    let mut packet = VariableLengthData::new();
    let mut cursor = EncodeCursor::new(&mut packet);
    cursor.write_varint_u64(encoded.size() as u64);
    cursor.write_bytes(encoded.data());
    packet
}

/// Attempts to decode one length-prefixed packet from the front of `buf`.
/// `Ok(None)` means "not enough bytes yet", not a parse error.
fn try_decode_one(buf: &[u8]) -> Result<Option<(usize, Message)>, ProtocolError> {
    let mut cursor = DecodeCursor::new(buf);
    let len = match cursor.read_varint_u64() {
        Ok(v) => v as usize,
        Err(ProtocolError::ReadBeyondEnd) => return Ok(None),
        Err(e) => return Err(e),
    };
    let header_len = cursor.offset();
    if buf.len() < header_len + len {
        return Ok(None);
    }
    let message = decode_message(&buf[header_len..header_len + len])?;
    Ok(Some((header_len + len, message)))
}

#[derive(Debug, Default)]
struct OutboundStage {
    pending: VariableLengthData,
    sent: usize,
}

impl OutboundStage {
    fn is_idle(&self) -> bool {
        self.sent >= self.pending.size()
    }

    fn stage(&mut self, packet: VariableLengthData) {
        self.pending = packet;
        self.sent = 0;
    }
}

pub struct FramedMessageLayer {
    outbound_rx: mpsc::Receiver<Message>,
    sink: Arc<dyn MessageSink>,
    read_buf: Vec<u8>,
    closed: bool,
    write: OutboundStage,
}

impl FramedMessageLayer {
    /// Builds a layer plus the [`MessageSender`] its peer (or, for a
    /// listening connection, the server node) uses to enqueue outbound
    /// messages.
    #[must_use]
    pub fn new(sink: Arc<dyn MessageSink>) -> (Self, MessageSender) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let layer = Self {
            outbound_rx: rx,
            sink,
            read_buf: Vec::new(),
            closed: false,
            write: OutboundStage::default(),
        };
        (layer, MessageSender { tx })
    }

    fn feed_inbound(&mut self, data: &[u8]) -> Result<(), LayerError> {
        self.read_buf.extend_from_slice(data);
        loop {
            match try_decode_one(&self.read_buf) {
                Ok(Some((consumed, message))) => {
                    self.read_buf.drain(..consumed);
                    self.sink.deliver(message);
                }
                Ok(None) => break,
                Err(err) => {
                    self.lose_connection(err.to_string());
                    return Err(err.into());
                }
            }
        }
        Ok(())
    }

    fn lose_connection(&mut self, reason: String) {
        if !self.closed {
            self.closed = true;
            self.sink.deliver(Message::ConnectionLost { reason });
        }
    }

    /// Called by [`crate::compression::CompressionLayer`] once it has
    /// inflated a chunk of raw bytes into plaintext.
    pub fn on_decompressed(&mut self, data: &[u8]) -> Result<(), LayerError> {
        self.feed_inbound(data)
    }

    /// Called by the compression layer on EOF/read error from the socket
    /// below it.
    pub fn on_lower_closed(&mut self, reason: String) {
        self.lose_connection(reason);
    }

    /// Stages the next queued outbound message, if the previous one fully
    /// drained and the queue has something waiting. Returns whether there
    /// is now something staged.
    fn stage_next_outbound(&mut self) -> bool {
        if !self.write.is_idle() {
            return true;
        }
        match self.outbound_rx.try_recv() {
            Ok(message) => {
                self.write.stage(encode_packet(&message));
                true
            }
            Err(_) => false,
        }
    }

    /// Pulls the next chunk of plaintext bytes to push through compression
    /// (or write directly). Returns `None` when the queue is exhausted.
    pub fn next_outbound_chunk(&mut self) -> Option<Vec<u8>> {
        if !self.stage_next_outbound() {
            return None;
        }
        let bytes = self.write.pending.data()[self.write.sent..].to_vec();
        self.write.sent = self.write.pending.size();
        Some(bytes)
    }

    /// `true` if the outbound queue has more messages once the current
    /// staged packet drains; used by the compression layer's flush
    /// discipline (§4.7).
    #[must_use]
    pub fn has_more_outbound(&self) -> bool {
        !self.outbound_rx.is_empty()
    }
}

impl ProtocolLayer for FramedMessageLayer {
    fn wants_read(&self) -> bool {
        !self.closed
    }

    fn wants_write(&self) -> bool {
        !self.write.is_idle() || !self.outbound_rx.is_empty()
    }

    fn on_readable(&mut self, conn: &Connection) -> Result<LayerAction, LayerError> {
        let mut scratch = [0u8; 64 * 1024];
        loop {
            match read_available(conn, &mut scratch)? {
                ReadOutcome::Data(n) => {
                    self.feed_inbound(&scratch[..n])?;
                    if n < scratch.len() {
                        break;
                    }
                }
                ReadOutcome::WouldBlock => break,
                ReadOutcome::Eof => {
                    self.lose_connection("peer closed the connection".to_string());
                    return Ok(LayerAction::Close);
                }
            }
        }
        Ok(LayerAction::Continue)
    }

    fn on_writable(&mut self, conn: &Connection) -> Result<LayerAction, LayerError> {
        loop {
            if !self.stage_next_outbound() {
                return Ok(LayerAction::Continue);
            }
            let remaining = self.write.pending.size() - self.write.sent;
            let n = ignore_would_block(conn.try_write(&self.write.pending.data()[self.write.sent..]))?;
            if n == 0 {
                return Ok(LayerAction::Continue);
            }
            self.write.sent += n;
            if n < remaining {
                return Ok(LayerAction::Continue);
            }
        }
    }
}
