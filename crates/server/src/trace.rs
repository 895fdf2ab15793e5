//! The `trace://` diagnostic connection decorator (§6.3). Rather than
//! wrapping the raw socket, which would
//! require a new [`openrti_net::Connection`] variant for no behavioral
//! gain, this wraps the [`ConnectSink`]/[`MessageSink`] pair: every accept
//! and every delivered message is logged at `trace` level, then passed
//! through unchanged.

use std::sync::Arc;

use openrti_protocol::{ConnectSink, MessageSender, MessageSink, Negotiated};
use openrti_wire::Message;

/// Wraps an inner [`ConnectSink`], logging each accept and wrapping its
/// returned sink in [`TracingMessageSink`].
pub struct TracingConnectSink {
    label: String,
    inner: Arc<dyn ConnectSink>,
}

impl TracingConnectSink {
    #[must_use]
    pub fn wrap(label: impl Into<String>, inner: Arc<dyn ConnectSink>) -> Self {
        Self {
            label: label.into(),
            inner,
        }
    }
}

impl ConnectSink for TracingConnectSink {
    fn accept(&self, negotiated: &Negotiated, sender: MessageSender) -> Arc<dyn MessageSink> {
        tracing::trace!(
            label = %self.label,
            version = %negotiated.version,
            encoding = %negotiated.encoding,
            compression = %negotiated.compression,
            "trace:// accept"
        );
        let inner_sink = self.inner.accept(negotiated, sender);
        Arc::new(TracingMessageSink {
            label: self.label.clone(),
            inner: inner_sink,
        })
    }
}

/// Wraps an inner [`MessageSink`], logging every delivered message at
/// `trace` level before forwarding it unchanged.
pub struct TracingMessageSink {
    label: String,
    inner: Arc<dyn MessageSink>,
}

impl MessageSink for TracingMessageSink {
    fn deliver(&self, message: Message) {
        tracing::trace!(label = %self.label, message = message.name(), "trace:// deliver");
        self.inner.deliver(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingSink(Mutex<Vec<Message>>);
    impl MessageSink for RecordingSink {
        fn deliver(&self, message: Message) {
            self.0.lock().unwrap().push(message);
        }
    }

    struct RecordingConnectSink(Arc<RecordingSink>);
    impl ConnectSink for RecordingConnectSink {
        fn accept(&self, _negotiated: &Negotiated, _sender: MessageSender) -> Arc<dyn MessageSink> {
            Arc::clone(&self.0) as Arc<dyn MessageSink>
        }
    }

    fn dummy_sender() -> MessageSender {
        struct NullSink;
        impl MessageSink for NullSink {
            fn deliver(&self, _message: Message) {}
        }
        let (framed, sender) = openrti_protocol::FramedMessageLayer::new(Arc::new(NullSink));
        std::mem::forget(framed);
        sender
    }

    #[test]
    fn forwards_accept_and_delivered_messages_unchanged() {
        let recording = Arc::new(RecordingSink(Mutex::new(Vec::new())));
        let inner: Arc<dyn ConnectSink> = Arc::new(RecordingConnectSink(Arc::clone(&recording)));
        let traced = TracingConnectSink::wrap("test", inner);

        let negotiated = Negotiated {
            version: "8".to_string(),
            encoding: "TightBE1".to_string(),
            compression: "no".to_string(),
        };
        let sink = traced.accept(&negotiated, dummy_sender());
        sink.deliver(Message::JoinFederationExecutionResponse { federate_handle: 3 });

        assert_eq!(
            recording.0.lock().unwrap().as_slice(),
            [Message::JoinFederationExecutionResponse { federate_handle: 3 }]
        );
    }
}
