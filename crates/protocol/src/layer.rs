//! The replaceable protocol-layer slot (§9 Design Note 2, §5 "Resource
//! lifecycle"). A connection owns one active [`ProtocolLayer`] at a time;
//! the handshake layer hands off to the compression layer and/or the
//! framed-message layer by returning [`LayerAction::Replace`] rather than
//! through virtual-dispatch subclassing, so the swap happens at the next
//! quiescent `read`/`write` the same way `AbstractProtocolLayer::replace`
//! did in the source.

use std::io;

use async_trait::async_trait;
use openrti_buffer::ProtocolError;
use openrti_net::{Connection, Readiness, SocketEvent};
use tokio::io::Interest;

use crate::error::LayerError;

/// What a layer wants to do after processing one readiness event.
pub enum LayerAction {
    /// Stay on this layer; more I/O may still be pending.
    Continue,
    /// Swap in a new layer at the next quiescent instant (§4.5 "Follow-up
    /// activation"): the dispatcher will offer readiness to the
    /// replacement on the tick after this one.
    Replace(Box<dyn ProtocolLayer>),
    /// This connection is done; erase it from the dispatcher.
    Close,
}

/// The small capability set every layer (handshake, compression, framed
/// message) implements over a raw, non-blocking [`Connection`].
pub trait ProtocolLayer: Send {
    fn wants_read(&self) -> bool;
    fn wants_write(&self) -> bool;

    /// Called once when the socket is readable. Implementations use
    /// [`Connection::try_read`] and must not block; a `WouldBlock` result
    /// from a partial read is not an error, just "try again next tick".
    fn on_readable(&mut self, conn: &Connection) -> Result<LayerAction, LayerError>;

    /// Called once when the socket is writable.
    fn on_writable(&mut self, conn: &Connection) -> Result<LayerAction, LayerError>;
}

/// Turns `WouldBlock` into "nothing happened this tick" rather than an
/// error, and propagates every other I/O error. Only meaningful for writes,
/// where a `0`-byte result never means end-of-stream; for reads use
/// [`read_available`], which keeps EOF distinguishable from "try again".
pub fn ignore_would_block(result: io::Result<usize>) -> Result<usize, LayerError> {
    match result {
        Ok(n) => Ok(n),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
        Err(e) => Err(LayerError::Io(e)),
    }
}

/// One non-blocking read attempt, with EOF kept distinct from "no data
/// ready right now" (unlike [`ignore_would_block`], which collapses both
/// to zero and is only safe on the write side).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Data(usize),
    WouldBlock,
    Eof,
}

pub fn read_available(conn: &Connection, buf: &mut [u8]) -> Result<ReadOutcome, LayerError> {
    match conn.try_read(buf) {
        Ok(0) => Ok(ReadOutcome::Eof),
        Ok(n) => Ok(ReadOutcome::Data(n)),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(ReadOutcome::WouldBlock),
        Err(e) => Err(LayerError::Io(e)),
    }
}

/// The top-level [`SocketEvent`] every accepted or outbound connection is
/// registered under (the Rust analogue of `ProtocolSocketEvent`, "the top
/// level protocol layer that just puts data into the actual operating
/// system socket"). Owns the raw connection and the single mutable layer
/// slot; `on_read`/`on_write` delegate to the active layer and perform the
/// replace-in-place the layer asks for.
pub struct ProtocolSocket {
    conn: Connection,
    layer: Option<Box<dyn ProtocolLayer>>,
    closed: bool,
    peer: String,
}

impl ProtocolSocket {
    #[must_use]
    pub fn new(conn: Connection, layer: Box<dyn ProtocolLayer>) -> Self {
        let peer = conn.peer_description();
        Self {
            conn,
            layer: Some(layer),
            closed: false,
            peer,
        }
    }

    #[must_use]
    pub fn peer_description(&self) -> &str {
        &self.peer
    }

    fn interest(&self) -> Option<Interest> {
        let layer = self.layer.as_ref()?;
        match (layer.wants_read(), layer.wants_write()) {
            (true, true) => Some(Interest::READABLE | Interest::WRITABLE),
            (true, false) => Some(Interest::READABLE),
            (false, true) => Some(Interest::WRITABLE),
            (false, false) => None,
        }
    }

    fn apply(&mut self, action: LayerAction) -> Result<(), LayerError> {
        match action {
            LayerAction::Continue => Ok(()),
            LayerAction::Replace(next) => {
                self.layer = Some(next);
                Ok(())
            }
            LayerAction::Close => {
                self.closed = true;
                self.layer = None;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl SocketEvent for ProtocolSocket {
    fn wants_read(&self) -> bool {
        !self.closed && self.layer.as_ref().is_some_and(|l| l.wants_read())
    }

    fn wants_write(&self) -> bool {
        !self.closed && self.layer.as_ref().is_some_and(|l| l.wants_write())
    }

    async fn ready(&mut self) -> io::Result<Readiness> {
        let Some(interest) = self.interest() else {
            // Nothing wanted right now; park until erased. Mirrors a
            // closed-but-not-yet-erased event parking on an always-pending
            // future rather than busy-looping.
            std::future::pending::<()>().await;
            unreachable!()
        };
        let ready = self.conn.ready(interest).await?;
        Ok(Readiness {
            readable: ready.is_readable(),
            writable: ready.is_writable(),
        })
    }

    async fn on_read(&mut self) -> Result<(), ProtocolError> {
        let Some(mut layer) = self.layer.take() else {
            return Ok(());
        };
        let result = layer.on_readable(&self.conn);
        self.layer = Some(layer);
        let action = result.map_err(ProtocolError::from)?;
        self.apply(action).map_err(ProtocolError::from)
    }

    async fn on_write(&mut self) -> Result<(), ProtocolError> {
        let Some(mut layer) = self.layer.take() else {
            return Ok(());
        };
        let result = layer.on_writable(&self.conn);
        self.layer = Some(layer);
        let action = result.map_err(ProtocolError::from)?;
        self.apply(action).map_err(ProtocolError::from)
    }

    fn on_error(&mut self, _err: &ProtocolError) {
        self.closed = true;
        self.layer = None;
    }
}
