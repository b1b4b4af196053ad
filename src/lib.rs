// =============================================================================
// TXF Quote Hub — library root
// =============================================================================
//
// Polls the TAIFEX quote list for one futures contract, derives a trading
// signal from attached chart bars, and fans Snapshots out to WebSocket
// subscribers. The `txf-quote-hub` binary serves it; `quote-watch` is a
// reconnecting subscriber.
// =============================================================================

pub mod api;
pub mod app_state;
pub mod client;
pub mod error;
pub mod hub;
pub mod indicators;
pub mod market_data;
pub mod runtime_config;
pub mod signals;
pub mod types;
