//! The **Server node (abstract)** interface (§3, §4.9): the trait the
//! framed-message layer's [`ConnectSink`] calls into once a connection's
//! handshake succeeds, and a minimal in-memory reference implementation of
//! it sufficient to round-trip `insert_connect`/`insert_parent_connect`
//! semantics in tests. The federation RPCs named in §4.9 (join/resign,
//! declaration/object/ownership/time management, ...) are opaque to the
//! transport core and are not reproduced here; only the connect/registry
//! surface the core itself depends on is.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use openrti_protocol::{ConnectSink, MessageSender, MessageSink, Negotiated};
use openrti_wire::{Message, OptionMap};
use rustc_hash::FxHashMap;

use crate::error::FederationError;

/// Whether a registered connection is a regular child or the single
/// uplink (§4.9: "at most one such link exists").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Child,
    Parent,
}

/// The interface the transport core consumes (§4.9). `insert_connect` and
/// `insert_parent_connect` register an inbound connection's sender and
/// return the handle the core should deliver decoded messages to. The
/// federation RPCs themselves are intentionally absent: they are opaque to
/// this crate and belong to the omitted federation core.
pub trait ServerNode: Send + Sync {
    fn insert_connect(&self, sender: MessageSender, negotiated: &Negotiated) -> Arc<dyn MessageSink>;

    fn insert_parent_connect(
        &self,
        sender: MessageSender,
        negotiated: &Negotiated,
    ) -> Result<Arc<dyn MessageSink>, FederationError>;

    fn server_options(&self) -> OptionMap;

    fn is_running(&self) -> bool;
}

/// Adapts a [`ServerNode`] to the wire-level [`ConnectSink`] the handshake
/// layer calls for an ordinary child connection.
pub struct ChildConnectSink(pub Arc<dyn ServerNode>);

impl ConnectSink for ChildConnectSink {
    fn accept(&self, negotiated: &Negotiated, sender: MessageSender) -> Arc<dyn MessageSink> {
        self.0.insert_connect(sender, negotiated)
    }
}

/// Adapts a [`ServerNode`] to the wire-level [`ConnectSink`] used for the
/// single uplink connection. A second parent connect attempt has nowhere
/// good to route a sink to, so this adapter falls back to one that drops
/// everything delivered to it rather than silently replacing the uplink.
pub struct ParentConnectSink(pub Arc<dyn ServerNode>);

impl ConnectSink for ParentConnectSink {
    fn accept(&self, negotiated: &Negotiated, sender: MessageSender) -> Arc<dyn MessageSink> {
        match self.0.insert_parent_connect(sender, negotiated) {
            Ok(sink) => sink,
            Err(err) => {
                tracing::error!(%err, "rejecting parent connect: uplink already present");
                Arc::new(RejectingSink)
            }
        }
    }
}

struct RejectingSink;

impl MessageSink for RejectingSink {
    fn deliver(&self, _message: Message) {}
}

struct Connection {
    sender: MessageSender,
    role: Role,
}

#[derive(Default)]
struct Inner {
    next_id: AtomicU64,
    connections: Mutex<FxHashMap<u64, Connection>>,
    parent_id: Mutex<Option<u64>>,
    log: Mutex<Vec<(u64, Message)>>,
}

impl Inner {
    fn register(&self, sender: MessageSender, role: Role) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.connections
            .lock()
            .unwrap()
            .insert(id, Connection { sender, role });
        id
    }

    /// Routes a decoded message to the server node (§4.9). A
    /// [`Message::ConnectionLost`] deregisters the connection and is
    /// treated as a resign equivalent (§7 propagation policy), rather than
    /// being kept in the log alongside live traffic.
    fn on_message(&self, id: u64, message: Message) {
        if matches!(message, Message::ConnectionLost { .. }) {
            let removed = self.connections.lock().unwrap().remove(&id);
            if removed.is_some_and(|c| c.role == Role::Parent) {
                *self.parent_id.lock().unwrap() = None;
            }
        }
        self.log.lock().unwrap().push((id, message));
    }
}

struct NodeSink {
    inner: Arc<Inner>,
    id: u64,
}

impl MessageSink for NodeSink {
    fn deliver(&self, message: Message) {
        self.inner.on_message(self.id, message);
    }
}

/// A minimal server node that keeps every connected sender in memory and
/// records every delivered message, with no federation semantics of its
/// own. Exists to let the accept/connect glue and the protocol layers be
/// exercised end to end without a real federation core behind them.
pub struct InMemoryServerNode {
    options: OptionMap,
    inner: Arc<Inner>,
    running: AtomicBool,
}

impl InMemoryServerNode {
    #[must_use]
    pub fn new(options: OptionMap) -> Arc<Self> {
        Arc::new(Self {
            options,
            inner: Arc::new(Inner::default()),
            running: AtomicBool::new(true),
        })
    }

    /// Snapshot of every message delivered so far, in delivery order,
    /// tagged with the registering connection's id. Test-only introspection;
    /// a real federation core would consume messages as they arrive instead
    /// of accumulating them.
    #[must_use]
    pub fn message_log(&self) -> Vec<(u64, Message)> {
        self.inner.log.lock().unwrap().clone()
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.inner.connections.lock().unwrap().len()
    }

    #[must_use]
    pub fn has_parent(&self) -> bool {
        self.inner.parent_id.lock().unwrap().is_some()
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// Enqueues `message` on the connection registered as `id`'s outbound
    /// queue. Returns `false` if `id` is unknown or that connection's queue
    /// is full/closed; this is the hook a federation core would use to push
    /// messages back out to a specific child or the uplink.
    pub fn send_to(&self, id: u64, message: Message) -> bool {
        let connections = self.inner.connections.lock().unwrap();
        connections
            .get(&id)
            .is_some_and(|c| c.sender.try_send(message).is_ok())
    }
}

impl ServerNode for InMemoryServerNode {
    fn insert_connect(&self, sender: MessageSender, _negotiated: &Negotiated) -> Arc<dyn MessageSink> {
        let id = self.inner.register(sender, Role::Child);
        Arc::new(NodeSink {
            inner: Arc::clone(&self.inner),
            id,
        })
    }

    fn insert_parent_connect(
        &self,
        sender: MessageSender,
        _negotiated: &Negotiated,
    ) -> Result<Arc<dyn MessageSink>, FederationError> {
        if self.inner.parent_id.lock().unwrap().is_some() {
            return Err(FederationError::new(
                "UplinkAlreadyPresent",
                "a parent connection already exists",
            ));
        }
        let id = self.inner.register(sender, Role::Parent);
        *self.inner.parent_id.lock().unwrap() = Some(id);
        Ok(Arc::new(NodeSink {
            inner: Arc::clone(&self.inner),
            id,
        }))
    }

    fn server_options(&self) -> OptionMap {
        self.options.clone()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_negotiated() -> Negotiated {
        Negotiated {
            version: "8".to_string(),
            encoding: "TightBE1".to_string(),
            compression: "no".to_string(),
        }
    }

    struct NullSink;
    impl MessageSink for NullSink {
        fn deliver(&self, _message: Message) {}
    }

    fn dummy_sender() -> MessageSender {
        let (framed, sender) = openrti_protocol::FramedMessageLayer::new(Arc::new(NullSink));
        std::mem::forget(framed);
        sender
    }

    #[test]
    fn child_connect_registers_and_routes_messages() {
        let node = InMemoryServerNode::new(OptionMap::new());
        let sink: Arc<dyn ConnectSink> = Arc::new(ChildConnectSink(Arc::clone(&node) as Arc<dyn ServerNode>));
        let negotiated = dummy_negotiated();
        let server_side = sink.accept(&negotiated, dummy_sender());
        assert_eq!(node.connection_count(), 1);

        server_side.deliver(Message::JoinFederationExecutionResponse { federate_handle: 7 });
        assert_eq!(node.message_log().len(), 1);
    }

    #[test]
    fn connection_lost_deregisters_the_connection() {
        let node = InMemoryServerNode::new(OptionMap::new());
        let sink: Arc<dyn ConnectSink> = Arc::new(ChildConnectSink(Arc::clone(&node) as Arc<dyn ServerNode>));
        let negotiated = dummy_negotiated();
        let server_side = sink.accept(&negotiated, dummy_sender());
        assert_eq!(node.connection_count(), 1);

        server_side.deliver(Message::ConnectionLost {
            reason: "eof".to_string(),
        });
        assert_eq!(node.connection_count(), 0);
    }

    #[test]
    fn send_to_enqueues_on_the_named_connection() {
        let node = InMemoryServerNode::new(OptionMap::new());
        let sink: Arc<dyn ConnectSink> = Arc::new(ChildConnectSink(Arc::clone(&node) as Arc<dyn ServerNode>));
        let negotiated = dummy_negotiated();
        let _server_side = sink.accept(&negotiated, dummy_sender());

        assert!(node.send_to(0, Message::JoinFederationExecutionResponse { federate_handle: 1 }));
        assert!(!node.send_to(99, Message::JoinFederationExecutionResponse { federate_handle: 1 }));
    }

    #[test]
    fn only_one_parent_connect_is_accepted() {
        let node = InMemoryServerNode::new(OptionMap::new());
        let negotiated = dummy_negotiated();
        let parent_sink: Arc<dyn ConnectSink> =
            Arc::new(ParentConnectSink(Arc::clone(&node) as Arc<dyn ServerNode>));

        let _first = parent_sink.accept(&negotiated, dummy_sender());
        assert!(node.has_parent());

        // A second parent connect is rejected rather than replacing the
        // existing uplink; the rejecting sink silently drops everything.
        let second = parent_sink.accept(&negotiated, dummy_sender());
        second.deliver(Message::JoinFederationExecutionResponse { federate_handle: 1 });
        assert_eq!(node.message_log().len(), 0);
    }
}
