// =============================================================================
// Application State — shared by every HTTP/WebSocket handler
// =============================================================================
//
// Built once at startup. The hub is the only stateful subsystem; everything
// else here is read-only after construction.
// =============================================================================

use std::sync::Arc;
use std::time::Instant;

use crate::hub::BroadcastHub;
use crate::runtime_config::HubConfig;

/// State handed to the axum router as `Arc<AppState>`.
pub struct AppState {
    pub hub: Arc<BroadcastHub>,
    /// Per-subscriber outbound queue depth.
    pub outbox_capacity: usize,
    /// Instant when the server started. Used for uptime in health checks.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(hub: Arc<BroadcastHub>, config: &HubConfig) -> Self {
        Self {
            hub,
            outbox_capacity: config.outbox_capacity,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
