use std::sync::mpsc;

use kvlink_codec::Message;

use crate::error::EndpointError;

/// Receiver lifecycle and traffic notifications.
///
/// Every method defaults to doing nothing. Handlers run synchronously on the
/// thread that produced the event: the accept thread for listener and
/// connect events, a worker thread for per-connection events.
pub trait ReceiverHandler: Send + Sync {
    fn listening_started(&self) {}

    fn listening_stopped(&self) {}

    fn client_connected(&self, _client_id: u64) {}

    /// The connection ended cleanly, with or without a message.
    fn client_disconnected(&self, _client_id: u64) {}

    fn message_received(&self, _client_id: u64, _message: &Message) {}

    /// The connection ended with an error. Replaces `client_disconnected`.
    fn connection_failed(&self, _client_id: u64, _error: &EndpointError) {}
}

/// Owned form of a [`ReceiverHandler`] notification.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiverEvent {
    ListeningStarted,
    ListeningStopped,
    ClientConnected { client_id: u64 },
    ClientDisconnected { client_id: u64 },
    MessageReceived { client_id: u64, message: Message },
    ConnectionFailed { client_id: u64, error: String },
}

impl ReceiverEvent {
    /// Client the event concerns, if any.
    pub fn client_id(&self) -> Option<u64> {
        match self {
            ReceiverEvent::ListeningStarted | ReceiverEvent::ListeningStopped => None,
            ReceiverEvent::ClientConnected { client_id }
            | ReceiverEvent::ClientDisconnected { client_id }
            | ReceiverEvent::MessageReceived { client_id, .. }
            | ReceiverEvent::ConnectionFailed { client_id, .. } => Some(*client_id),
        }
    }
}

// A dropped receiving end only means nobody is listening any more.
impl ReceiverHandler for mpsc::Sender<ReceiverEvent> {
    fn listening_started(&self) {
        let _ = self.send(ReceiverEvent::ListeningStarted);
    }

    fn listening_stopped(&self) {
        let _ = self.send(ReceiverEvent::ListeningStopped);
    }

    fn client_connected(&self, client_id: u64) {
        let _ = self.send(ReceiverEvent::ClientConnected { client_id });
    }

    fn client_disconnected(&self, client_id: u64) {
        let _ = self.send(ReceiverEvent::ClientDisconnected { client_id });
    }

    fn message_received(&self, client_id: u64, message: &Message) {
        let _ = self.send(ReceiverEvent::MessageReceived {
            client_id,
            message: message.clone(),
        });
    }

    fn connection_failed(&self, client_id: u64, error: &EndpointError) {
        let _ = self.send(ReceiverEvent::ConnectionFailed {
            client_id,
            error: error.to_string(),
        });
    }
}
