// =============================================================================
// Broadcast Hub — one upstream poller, many subscribers
// =============================================================================
//
// State machine:
//
//   Idle   — no subscribers, no timers.
//   Active — at least one subscriber; polling + heartbeat timers armed.
//
//   Idle -> Active   first registration; timers are spawned, first tick one
//                    full interval later.
//   Active -> Idle   registry becomes empty (close, error, failed send,
//                    missed heartbeat); both timers are aborted.
//
// Every registration gets an immediate one-shot fetch-and-push of its own.
//
// Thread safety:
//   - All registry mutations and broadcast iterations happen under one
//     parking_lot::Mutex, never held across an `.await`.
//   - Timer tasks hold a Weak<BroadcastHub> and carry the epoch they were
//     armed in. A tick from an older epoch (aborted mid-flight) is discarded
//     under the lock, so Idle/Active flapping can't double-deliver.
//   - Removal is idempotent; heartbeat and tick paths may race freely.
// =============================================================================

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::connection::{ConnectionId, Outbound, SubscriberConnection};
use crate::market_data::{ChartFeed, QuoteFetcher};
use crate::runtime_config::HubConfig;
use crate::signals::evaluate_history;
use crate::types::Snapshot;

// =============================================================================
// Settings & state
// =============================================================================

/// Timer periods for the hub.
#[derive(Debug, Clone, Copy)]
pub struct HubSettings {
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
}

impl HubSettings {
    pub fn from_config(config: &HubConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            heartbeat_interval: config.heartbeat_interval(),
        }
    }
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1_000),
            heartbeat_interval: Duration::from_millis(30_000),
        }
    }
}

/// Whether the hub is currently polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HubState {
    Idle,
    Active,
}

impl std::fmt::Display for HubState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Active => write!(f, "Active"),
        }
    }
}

/// Handles of the two periodic tasks. Dropping disarms both.
struct Timers {
    poll: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
}

impl Drop for Timers {
    fn drop(&mut self) {
        self.poll.abort();
        self.heartbeat.abort();
    }
}

/// Everything guarded by the hub's single lock.
struct Registry {
    state: HubState,
    /// Incremented on every Idle -> Active transition.
    epoch: u64,
    subscribers: HashMap<ConnectionId, SubscriberConnection>,
    timers: Option<Timers>,
}

impl Registry {
    fn is_current(&self, epoch: u64) -> bool {
        self.state == HubState::Active && self.epoch == epoch
    }

    /// Drop `id` (closing its transport) and fall back to Idle if it was the
    /// last one.
    fn remove(&mut self, id: &ConnectionId) -> bool {
        let removed = self.subscribers.remove(id).is_some();
        if removed && self.subscribers.is_empty() && self.state == HubState::Active {
            self.state = HubState::Idle;
            self.timers = None;
            info!(epoch = self.epoch, "last subscriber gone — hub Active -> Idle, timers disarmed");
        }
        removed
    }
}

// =============================================================================
// BroadcastHub
// =============================================================================

/// Fan-out of quote snapshots to every connected subscriber.
///
/// Constructed once at startup and shared as `Arc<BroadcastHub>` with the
/// transport layer.
pub struct BroadcastHub {
    fetcher: QuoteFetcher,
    chart: ChartFeed,
    settings: HubSettings,
    registry: Mutex<Registry>,
}

impl BroadcastHub {
    pub fn new(fetcher: QuoteFetcher, settings: HubSettings) -> Arc<Self> {
        Arc::new(Self {
            fetcher,
            chart: ChartFeed::new(),
            settings,
            registry: Mutex::new(Registry {
                state: HubState::Idle,
                epoch: 0,
                subscribers: HashMap::new(),
                timers: None,
            }),
        })
    }

    /// Chart bars attached to every snapshot.
    pub fn chart(&self) -> &ChartFeed {
        &self.chart
    }

    pub fn state(&self) -> HubState {
        self.registry.lock().state
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().subscribers.len()
    }

    // ── Registration ────────────────────────────────────────────────────

    /// Add `conn` to the registry (no-op if already present) and push it one
    /// snapshot right away. Arms the timers on the first subscriber.
    pub fn register_connection(self: &Arc<Self>, conn: SubscriberConnection) {
        let id = conn.id();
        {
            let mut reg = self.registry.lock();
            if reg.subscribers.contains_key(&id) {
                debug!(conn = %id, "connection already registered");
                return;
            }
            reg.subscribers.insert(id, conn);

            if reg.state == HubState::Idle {
                reg.state = HubState::Active;
                reg.epoch += 1;
                reg.timers = Some(self.arm_timers(reg.epoch));
                info!(epoch = reg.epoch, "first subscriber — hub Idle -> Active, timers armed");
            }
            info!(conn = %id, subscribers = reg.subscribers.len(), "subscriber registered");
        }

        let hub = Arc::clone(self);
        tokio::spawn(async move {
            let snapshot = hub.produce_snapshot().await;
            hub.push_one(id, &snapshot);
        });
    }

    /// Remove `id`. Safe to call repeatedly and from any failure path.
    pub fn remove_connection(&self, id: ConnectionId) -> bool {
        let mut reg = self.registry.lock();
        let removed = reg.remove(&id);
        if removed {
            info!(conn = %id, subscribers = reg.subscribers.len(), "subscriber removed");
        }
        removed
    }

    /// Record a probe reply from `id`.
    pub fn mark_alive(&self, id: ConnectionId) {
        if let Some(conn) = self.registry.lock().subscribers.get_mut(&id) {
            conn.set_alive(true);
        }
    }

    // ── Snapshot production ─────────────────────────────────────────────

    /// Fetch once and attach the current chart bars and their signal.
    pub async fn produce_snapshot(&self) -> Snapshot {
        let mut snapshot = self.fetcher.fetch().await;

        if let Some(bars) = self.chart.latest() {
            let closes = ChartFeed::closes(&bars);
            let volumes = ChartFeed::volumes(&bars);
            snapshot.signal = Some(evaluate_history(&closes, &volumes, snapshot.update_time));
            snapshot.chart_data = Some(bars.as_ref().clone());
        }

        snapshot
    }

    // ── Timer callbacks ─────────────────────────────────────────────────

    /// One polling cycle: fetch, then push to every subscriber.
    pub async fn on_tick(&self) {
        let epoch = self.registry.lock().epoch;
        self.poll_cycle(epoch).await;
    }

    /// One heartbeat cycle: prune silent subscribers, probe the rest.
    pub fn on_heartbeat(&self) {
        let epoch = self.registry.lock().epoch;
        self.heartbeat_cycle(epoch);
    }

    async fn poll_cycle(&self, epoch: u64) {
        if !self.registry.lock().is_current(epoch) {
            return;
        }

        let snapshot = self.produce_snapshot().await;
        let delivered = self.broadcast(&snapshot, epoch);
        debug!(delivered, price = %snapshot.price, "tick broadcast");
    }

    fn heartbeat_cycle(&self, epoch: u64) {
        let mut reg = self.registry.lock();
        if !reg.is_current(epoch) {
            return;
        }

        let silent: Vec<ConnectionId> = reg
            .subscribers
            .values()
            .filter(|c| !c.is_alive())
            .map(|c| c.id())
            .collect();
        for id in &silent {
            reg.remove(id);
            info!(conn = %id, "no probe reply since last heartbeat — subscriber dropped");
        }

        let mut failed = Vec::new();
        for conn in reg.subscribers.values_mut() {
            conn.set_alive(false);
            if let Err(e) = conn.push(Outbound::Probe) {
                debug!(error = %e, "probe failed");
                failed.push(conn.id());
            }
        }
        for id in &failed {
            reg.remove(id);
        }

        debug!(
            pruned = silent.len() + failed.len(),
            remaining = reg.subscribers.len(),
            "heartbeat"
        );
    }

    // ── Delivery ────────────────────────────────────────────────────────

    /// Push the same payload to every subscriber registered in `epoch`.
    /// Returns the number of successful deliveries.
    fn broadcast(&self, snapshot: &Snapshot, epoch: u64) -> usize {
        let Some(payload) = serialise(snapshot) else {
            return 0;
        };

        let mut reg = self.registry.lock();
        if !reg.is_current(epoch) {
            debug!(epoch, "tick outlived its epoch — discarded");
            return 0;
        }

        let failed: Vec<ConnectionId> = reg
            .subscribers
            .values()
            .filter_map(|conn| match conn.push(Outbound::Snapshot(Arc::clone(&payload))) {
                Ok(()) => None,
                Err(e) => {
                    warn!(error = %e, "push failed — dropping subscriber");
                    Some(conn.id())
                }
            })
            .collect();

        for id in &failed {
            reg.remove(id);
        }
        reg.subscribers.len()
    }

    fn push_one(&self, id: ConnectionId, snapshot: &Snapshot) {
        let Some(payload) = serialise(snapshot) else {
            return;
        };

        let mut reg = self.registry.lock();
        let Some(conn) = reg.subscribers.get(&id) else {
            debug!(conn = %id, "subscriber left before its first snapshot");
            return;
        };
        if let Err(e) = conn.push(Outbound::Snapshot(payload)) {
            warn!(error = %e, "initial push failed — dropping subscriber");
            reg.remove(&id);
        }
    }

    // ── Timers ──────────────────────────────────────────────────────────

    fn arm_timers(self: &Arc<Self>, epoch: u64) -> Timers {
        let poll = spawn_periodic(
            Arc::downgrade(self),
            self.settings.poll_interval,
            move |hub| async move { hub.poll_cycle(epoch).await },
        );
        let heartbeat = spawn_periodic(
            Arc::downgrade(self),
            self.settings.heartbeat_interval,
            move |hub| async move { hub.heartbeat_cycle(epoch) },
        );
        Timers { poll, heartbeat }
    }
}

/// Run `f` every `period`, first run one period from now, until the hub is
/// gone or the task is aborted.
fn spawn_periodic<F, Fut>(hub: Weak<BroadcastHub>, period: Duration, f: F) -> JoinHandle<()>
where
    F: Fn(Arc<BroadcastHub>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(hub) = hub.upgrade() else {
                break;
            };
            f(hub).await;
        }
    })
}

fn serialise(snapshot: &Snapshot) -> Option<Arc<str>> {
    match serde_json::to_string(snapshot) {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            warn!(error = %e, "failed to serialise snapshot");
            None
        }
    }
}
