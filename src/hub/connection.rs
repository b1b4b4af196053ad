// =============================================================================
// Subscriber Connection — hub-side handle for one downstream viewer
// =============================================================================
//
// The transport task (WebSocket handler) owns the socket. The hub owns this
// handle: a bounded outbound queue plus a liveness flag. Dropping the handle
// closes the queue; the transport task sees the end of the queue and closes
// the socket.
// =============================================================================

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::error::HubError;

/// Opaque identifier of a subscriber connection.
pub type ConnectionId = Uuid;

/// What the hub asks a transport to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Pre-serialised Snapshot JSON, shared by every subscriber of a tick.
    Snapshot(Arc<str>),
    /// Liveness probe; the transport sends a Ping frame.
    Probe,
}

/// Registry entry for one subscriber.
#[derive(Debug)]
pub struct SubscriberConnection {
    id: ConnectionId,
    outbox: mpsc::Sender<Outbound>,
    alive: bool,
}

impl SubscriberConnection {
    /// New connection with an outbound queue of `capacity` messages. The
    /// receiver goes to the transport task.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (outbox, rx) = mpsc::channel(capacity.max(1));
        let conn = Self {
            id: Uuid::new_v4(),
            outbox,
            alive: true,
        };
        (conn, rx)
    }

    #[cfg(test)]
    pub(crate) fn with_id(id: ConnectionId, capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (mut conn, rx) = Self::new(capacity);
        conn.id = id;
        (conn, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive
    }

    pub(crate) fn set_alive(&mut self, alive: bool) {
        self.alive = alive;
    }

    /// Queue `msg` without waiting. A closed or full queue is a send failure.
    pub(crate) fn push(&self, msg: Outbound) -> Result<(), HubError> {
        self.outbox.try_send(msg).map_err(|e| HubError::SubscriberSend {
            id: self.id,
            reason: match e {
                TrySendError::Full(_) => "outbound queue full",
                TrySendError::Closed(_) => "transport closed",
            },
        })
    }
}
