// =============================================================================
// WebSocket Handler — subscriber transport
// =============================================================================
//
// Clients connect to `/api/v1/ws` and receive:
//   1. An immediate Snapshot on connect (pushed by the hub on registration).
//   2. A Snapshot on every polling tick while connected.
//   3. A Ping frame on every heartbeat tick; the Pong reply keeps them alive.
//
// The handler also:
//   - Answers `{"type":"ping"}` with `{"type":"pong"}` straight away.
//   - Logs and ignores anything else the client sends.
//   - Closes the socket when the hub drops the subscriber (queue closed).
//   - Removes the subscriber from the hub on any exit path.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::app_state::AppState;
use crate::error::HubError;
use crate::hub::{Outbound, SubscriberConnection};
use crate::types::{ClientMessage, ControlMessage};

// =============================================================================
// WebSocket upgrade handler
// =============================================================================

/// Axum handler for the WebSocket upgrade request.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    debug!("WebSocket upgrade requested");
    ws.on_failed_upgrade(|e: axum::Error| {
        let err = HubError::TransportUpgrade(e.to_string());
        warn!(error = %err, "WebSocket upgrade failed — dropping socket");
    })
    .on_upgrade(move |socket| handle_ws_connection(socket, state))
}

// =============================================================================
// Connection handler
// =============================================================================

/// Pump one WebSocket until either side goes away.
///
/// Runs two concurrent branches via `tokio::select!`:
///   1. **Outbound** — drain the hub's queue for this subscriber.
///   2. **Inbound** — client pings, probe replies, close frames.
async fn handle_ws_connection(socket: WebSocket, state: Arc<AppState>) {
    let (conn, mut outbound) = SubscriberConnection::new(state.outbox_capacity);
    let id = conn.id();
    let hub = Arc::clone(&state.hub);
    hub.register_connection(conn);
    info!(conn = %id, "WebSocket subscriber connected");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            // ── Outbound: snapshots and probes from the hub ─────────────
            msg = outbound.recv() => {
                let frame = match msg {
                    Some(Outbound::Snapshot(json)) => Message::Text(json.to_string()),
                    Some(Outbound::Probe) => Message::Ping(Vec::new()),
                    None => {
                        info!(conn = %id, "hub released subscriber — closing socket");
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                };
                if let Err(e) = sender.send(frame).await {
                    debug!(conn = %id, error = %e, "WebSocket send failed — disconnecting");
                    break;
                }
            }

            // ── Inbound: client traffic ─────────────────────────────────
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Ping) => {
                                if let Err(e) = send_pong(&mut sender).await {
                                    debug!(conn = %id, error = %e, "Failed to send pong — disconnecting");
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(conn = %id, error = %e, msg = %text, "Unrecognised client message ignored");
                            }
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        debug!(conn = %id, "probe reply received");
                        hub.mark_alive(id);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sender.send(Message::Pong(data)).await {
                            debug!(conn = %id, error = %e, "Failed to send Pong — disconnecting");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!(conn = %id, "WebSocket Close frame received — disconnecting");
                        break;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!(conn = %id, "WebSocket binary message ignored");
                    }
                    Some(Err(e)) => {
                        warn!(conn = %id, error = %e, "WebSocket receive error — disconnecting");
                        break;
                    }
                    None => {
                        info!(conn = %id, "WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    hub.remove_connection(id);
}

// =============================================================================
// Helpers
// =============================================================================

async fn send_pong<S>(sender: &mut S) -> Result<(), axum::Error>
where
    S: futures_util::Sink<Message, Error = axum::Error> + Unpin,
{
    match serde_json::to_string(&ControlMessage::Pong) {
        Ok(json) => sender.send(Message::Text(json)).await,
        Err(e) => {
            // Serialisation errors are not network errors; don't disconnect.
            warn!(error = %e, "Failed to serialise pong");
            Ok(())
        }
    }
}
