// =============================================================================
// Quote Client — reconnecting WebSocket subscriber
// =============================================================================
//
// Connects to a hub's `/api/v1/ws`, forwards every Snapshot over an mpsc
// channel, and reports connection state changes on a second channel. While
// connected it sends `{"type":"ping"}` on a fixed interval. Probe Ping frames
// from the hub are answered by tungstenite automatically.
//
// Reconnection follows `ReconnectPolicy`; once exhausted the client task ends
// with an error.
// =============================================================================

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use super::reconnect::{ConnectionState, ReconnectPolicy, Reconnector};
use crate::types::{ClientMessage, ControlMessage, Snapshot};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct QuoteClientConfig {
    /// Hub WebSocket URL.
    pub url: String,
    /// Application-level ping interval.
    pub ping_interval: Duration,
    pub policy: ReconnectPolicy,
    pub channel_buffer_size: usize,
}

impl Default for QuoteClientConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:3001/api/v1/ws".to_string(),
            ping_interval: Duration::from_secs(30),
            policy: ReconnectPolicy::default(),
            channel_buffer_size: 64,
        }
    }
}

impl QuoteClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }
}

/// Receivers and task handle for a running client.
pub struct QuoteClient {
    pub snapshots: mpsc::Receiver<Snapshot>,
    pub states: mpsc::Receiver<ConnectionState>,
    task: JoinHandle<Result<()>>,
}

impl QuoteClient {
    /// Spawn the connection loop.
    pub fn start(config: QuoteClientConfig) -> Self {
        let (snap_tx, snapshots) = mpsc::channel(config.channel_buffer_size.max(1));
        let (state_tx, states) = mpsc::channel(16);
        let task = tokio::spawn(run_client_loop(config, snap_tx, state_tx));
        Self {
            snapshots,
            states,
            task,
        }
    }

    /// Stop the client, including any pending retry.
    pub fn shutdown(&self) {
        self.task.abort();
    }

    /// Wait for the connection loop to end.
    pub async fn join(self) -> Result<()> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(anyhow!("quote client task failed: {e}")),
        }
    }
}

/// Why a connected session ended.
enum SessionEnd {
    /// Socket closed or errored; reconnect.
    Dropped,
    /// Snapshot receiver went away; stop for good.
    ReceiverGone,
}

async fn run_client_loop(
    config: QuoteClientConfig,
    snap_tx: mpsc::Sender<Snapshot>,
    state_tx: mpsc::Sender<ConnectionState>,
) -> Result<()> {
    let mut reconnector = Reconnector::new(config.policy);
    info!(url = %config.url, "starting quote client");

    loop {
        reconnector.begin_connect();
        let _ = state_tx.send(ConnectionState::Connecting).await;

        match connect_async(config.url.as_str()).await {
            Ok((ws_stream, _response)) => {
                reconnector.connected();
                let _ = state_tx.send(ConnectionState::Connected).await;
                info!(url = %config.url, "connected to quote hub");

                if let SessionEnd::ReceiverGone =
                    run_session(ws_stream, config.ping_interval, &snap_tx).await
                {
                    info!("snapshot receiver dropped — stopping client");
                    return Ok(());
                }
            }
            Err(e) => {
                error!(url = %config.url, error = %e, "failed to connect to quote hub");
            }
        }

        let _ = state_tx.send(ConnectionState::Disconnected).await;
        let Some(delay) = reconnector.disconnected() else {
            return Err(anyhow!(
                "gave up after {} reconnect attempts",
                config.policy.max_attempts
            ));
        };
        warn!(delay_ms = delay.as_millis() as u64, "reconnecting");
        reconnector
            .schedule(delay)
            .await
            .context("retry timer cancelled")?;
    }
}

async fn run_session<S>(
    ws_stream: S,
    ping_interval: Duration,
    snap_tx: &mpsc::Sender<Snapshot>,
) -> SessionEnd
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin,
{
    let (mut write, mut read) = ws_stream.split();
    let ping = match serde_json::to_string(&ClientMessage::Ping) {
        Ok(json) => json,
        Err(e) => {
            error!(error = %e, "failed to serialise ping");
            return SessionEnd::Dropped;
        }
    };

    let start = tokio::time::Instant::now() + ping_interval;
    let mut ticker = tokio::time::interval_at(start, ping_interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = write.send(Message::Text(ping.clone())).await {
                    debug!(error = %e, "ping send failed — connection likely dead");
                    return SessionEnd::Dropped;
                }
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(ControlMessage::Pong) = serde_json::from_str::<ControlMessage>(&text) {
                            debug!("pong received");
                            continue;
                        }
                        match serde_json::from_str::<Snapshot>(&text) {
                            Ok(snapshot) => {
                                if snap_tx.send(snapshot).await.is_err() {
                                    return SessionEnd::ReceiverGone;
                                }
                            }
                            Err(e) => warn!(error = %e, "unparseable hub message ignored"),
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("hub closed the connection");
                        return SessionEnd::Dropped;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        return SessionEnd::Dropped;
                    }
                    None => return SessionEnd::Dropped,
                }
            }
        }
    }
}
