// =============================================================================
// Error taxonomy — quote hub
// =============================================================================
//
// Domain errors only. None of these escape a normal polling tick:
//   - FetchError is absorbed by the QuoteFetcher (last-known-good fallback).
//   - IndicatorError is turned into a HOLD signal by the signal engine.
//   - HubError isolates a single subscriber; the broadcast cycle continues.
//
// Application plumbing (config, server bootstrap) uses `anyhow` instead.
// =============================================================================

use thiserror::Error;

/// Failure of one upstream quote round-trip.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network error, non-2xx status, or an unparseable body.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The upstream answered but the tracked instrument was not in the list.
    #[error("no quote record for instrument {symbol_id}")]
    NoMatchingRecord { symbol_id: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        Self::UpstreamUnavailable(e.to_string())
    }
}

/// Indicator input was too short to compute anything meaningful.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndicatorError {
    #[error("insufficient data: need {required} values, have {available}")]
    InsufficientData { required: usize, available: usize },
}

/// Per-connection failures inside the broadcast hub.
#[derive(Debug, Error)]
pub enum HubError {
    /// A push or probe could not be queued for one subscriber.
    #[error("send to subscriber {id} failed: {reason}")]
    SubscriberSend { id: uuid::Uuid, reason: &'static str },

    /// The inbound WebSocket upgrade did not complete.
    #[error("transport upgrade failed: {0}")]
    TransportUpgrade(String),
}
