// =============================================================================
// Broadcast Hub Module
// =============================================================================
//
// `broadcast` owns the polling/heartbeat cycle and the subscriber registry;
// `connection` is the per-subscriber handle the registry stores.

pub mod broadcast;
pub mod connection;

pub use broadcast::{BroadcastHub, HubSettings, HubState};
pub use connection::{ConnectionId, Outbound, SubscriberConnection};
