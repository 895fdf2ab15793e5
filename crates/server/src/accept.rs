//! The server/accept glue (§2 "Server/accept glue" row): binds listeners
//! from [`openrti_net`]'s URL scheme, runs their accept loops, dials a
//! configured parent, and wires every resulting connection through the
//! handshake layer into a [`ServerNode`].
//!
//! Binding/accepting/connecting all happen before [`Server::run`] starts
//! the dispatcher, or from a spawned accept-loop task handing newly
//! accepted connections back through [`openrti_net::InsertHandle`], since
//! the dispatcher's own event list is only ever touched from its own thread
//! (§5 "Shared-resource policy").

use std::sync::Arc;
use std::time::Instant;

use openrti_net::{connect, Address, Dispatcher, InsertHandle, Listener, Scheme};
use openrti_protocol::{ClientHandshake, ConnectSink, ProtocolSocket, ServerHandshake, ServerPolicy};
use openrti_wire::OptionMap;

use crate::error::ServerError;
use crate::node::{ChildConnectSink, ParentConnectSink, ServerNode};
use crate::trace::TracingConnectSink;

/// Builds the option map a server hands to [`ServerHandshake`] (§6.1):
/// the protocol version this build speaks, the framing it uses, and
/// whether it is willing to negotiate zlib compression.
#[must_use]
pub fn server_options(policy: ServerPolicy) -> OptionMap {
    let mut options = OptionMap::new();
    options.set("version", vec![openrti_protocol::PROTOCOL_VERSION.to_string()]);
    options.set("encoding", vec![openrti_protocol::ENCODING.to_string()]);
    options.set(
        "compression",
        vec![if policy.zlib_available { "zlib" } else { "no" }.to_string()],
    );
    options
}

/// Builds the option map a client sends to open a connection (§6.1):
/// requests zlib if `request_compression` is set.
#[must_use]
pub fn client_options(request_compression: bool) -> OptionMap {
    let mut options = OptionMap::new();
    options.set("version", vec![openrti_protocol::PROTOCOL_VERSION.to_string()]);
    options.set("encoding", vec![openrti_protocol::ENCODING.to_string()]);
    options.set(
        "compression",
        vec![if request_compression { "zlib" } else { "no" }.to_string()],
    );
    options
}

/// Strips one `trace://` layer off `address`, returning the address to
/// actually bind/connect to and a human-readable label for the decorator,
/// or `None` if `address` was not a `trace://` wrapper.
fn unwrap_trace(address: &Address) -> Option<(&Address, String)> {
    if address.scheme == Scheme::Trace {
        let wrapped = address.wrapped.as_deref()?;
        Some((wrapped, address.to_string()))
    } else {
        None
    }
}

fn child_sink_for(node: &Arc<dyn ServerNode>, address: &Address) -> Arc<dyn ConnectSink> {
    let plain: Arc<dyn ConnectSink> = Arc::new(ChildConnectSink(Arc::clone(node)));
    match unwrap_trace(address) {
        Some((_, label)) => Arc::new(TracingConnectSink::wrap(label, plain)),
        None => plain,
    }
}

fn parent_sink_for(node: &Arc<dyn ServerNode>, address: &Address) -> Arc<dyn ConnectSink> {
    let plain: Arc<dyn ConnectSink> = Arc::new(ParentConnectSink(Arc::clone(node)));
    match unwrap_trace(address) {
        Some((_, label)) => Arc::new(TracingConnectSink::wrap(label, plain)),
        None => plain,
    }
}

fn transport_address(address: &Address) -> &Address {
    unwrap_trace(address).map_or(address, |(inner, _)| inner)
}

/// Owns the dispatcher, the listeners bound into it, and the server node
/// every accepted or outbound connection is wired to.
pub struct Server {
    dispatcher: Dispatcher,
    node: Arc<dyn ServerNode>,
    policy: ServerPolicy,
}

impl Server {
    #[must_use]
    pub fn new(node: Arc<dyn ServerNode>, policy: ServerPolicy) -> Self {
        Self {
            dispatcher: Dispatcher::new(),
            node,
            policy,
        }
    }

    #[must_use]
    pub fn wakeup_handle(&self) -> openrti_net::WakeupHandle {
        self.dispatcher.wakeup_handle()
    }

    /// Binds a listener at `address` and spawns its accept loop. Every
    /// accepted connection is wrapped in a [`ServerHandshake`] over a
    /// [`ProtocolSocket`] and handed to the dispatcher through an
    /// [`InsertHandle`], never by borrowing `self` from the spawned task.
    pub async fn bind_listener(&mut self, address: &Address) -> Result<(), ServerError> {
        let listener = Listener::bind(transport_address(address)).await?;
        let insert_handle = self.dispatcher.insert_handle();
        let node = Arc::clone(&self.node);
        let policy = self.policy;
        let child_sink = child_sink_for(&node, address);
        let options = server_options(policy);

        tokio::spawn(accept_loop(listener, insert_handle, options, policy, child_sink));
        Ok(())
    }

    /// Connects to `address` as the uplink and registers the connection
    /// directly on the dispatcher. Called before [`Server::run`] starts, so
    /// there is no concurrent access to guard against.
    pub async fn connect_parent(&mut self, address: &Address, request_compression: bool) -> Result<(), ServerError> {
        let conn = connect(transport_address(address)).await?;
        let sink = parent_sink_for(&self.node, address);
        let options = client_options(request_compression);
        let handshake = ClientHandshake::new(&options, sink);
        let socket = ProtocolSocket::new(conn, Box::new(handshake));
        self.dispatcher.insert(Box::new(socket));
        Ok(())
    }

    /// Runs ticks until `deadline` or the event set empties out (§4.3,
    /// §5). Delegates directly to [`Dispatcher::exec`].
    pub async fn run(&mut self, deadline: Instant) {
        self.dispatcher.exec(deadline).await;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dispatcher.is_empty()
    }
}

async fn accept_loop(
    listener: Listener,
    insert_handle: InsertHandle,
    options: OptionMap,
    policy: ServerPolicy,
    child_sink: Arc<dyn ConnectSink>,
) {
    loop {
        match listener.accept().await {
            Ok((conn, peer)) => {
                tracing::debug!(%peer, "accepted connection");
                let handshake = ServerHandshake::new(options.clone(), policy, Arc::clone(&child_sink));
                let socket = ProtocolSocket::new(conn, Box::new(handshake));
                insert_handle.insert(Box::new(socket));
            }
            Err(err) => {
                tracing::warn!(%err, "accept failed; stopping this listener's accept loop");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::InMemoryServerNode;
    use openrti_net::parse_address;
    use std::time::Duration;

    #[tokio::test]
    async fn bind_and_connect_round_trip_the_handshake() {
        let node = InMemoryServerNode::new(OptionMap::new());
        let policy = ServerPolicy {
            prefer_compression: false,
            zlib_available: true,
        };
        let mut server = Server::new(Arc::clone(&node) as Arc<dyn ServerNode>, policy);

        let listen_addr = parse_address("rti://127.0.0.1:0").unwrap();
        // Bind directly to grab the ephemeral port before handing the
        // listener off to the accept loop.
        let listener = Listener::bind(&listen_addr).await.unwrap();
        let local = match &listener {
            Listener::Tcp(l) => l.local_addr().unwrap(),
            Listener::Unix(_) => unreachable!(),
        };
        let insert_handle = server.dispatcher.insert_handle();
        let child_sink = child_sink_for(&(Arc::clone(&node) as Arc<dyn ServerNode>), &listen_addr);
        tokio::spawn(accept_loop(
            listener,
            insert_handle,
            server_options(policy),
            policy,
            child_sink,
        ));

        let connect_addr = parse_address(&format!("rti://{local}")).unwrap();
        server.connect_parent(&connect_addr, false).await.unwrap();

        server.run(Instant::now() + Duration::from_millis(500)).await;

        // Both ends of the loopback connection register against the same
        // node here: the accept side as a child, the dialing side (this
        // process's own `connect_parent` call) as the uplink.
        assert_eq!(node.connection_count(), 2);
        assert!(node.has_parent());
    }
}
