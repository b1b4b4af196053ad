// =============================================================================
// Runtime Configuration — quote hub settings
// =============================================================================
//
// Load order:
//   1. JSON file (path from `HUB_CONFIG`, default `hub_config.json`).
//   2. Built-in defaults for anything the file omits (or for a missing file).
//   3. `HUB_*` environment variables, which win over both.
//
// All fields carry `#[serde(default)]` so that adding new fields never breaks
// loading an older config file.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default location of the config file.
pub const DEFAULT_CONFIG_PATH: &str = "hub_config.json";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_upstream_url() -> String {
    "https://mis.taifex.com.tw/futures/api/getQuoteList".to_string()
}

fn default_symbol() -> String {
    "TXF".to_string()
}

fn default_symbol_id() -> String {
    "TXFB5-F".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_outbox_capacity() -> usize {
    64
}

fn default_utc_offset_minutes() -> i32 {
    8 * 60
}

fn default_session_open_hhmm() -> u32 {
    845
}

fn default_session_close_hhmm() -> u32 {
    1345
}

// =============================================================================
// HubConfig
// =============================================================================

/// Top-level configuration for the quote hub server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    // --- Server --------------------------------------------------------------

    /// Address the HTTP/WebSocket server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    // --- Upstream ------------------------------------------------------------

    /// Quote list endpoint (POST).
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,

    /// Product code sent in the request body (`Symbol`).
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Contract identifier matched against `SymbolID` in the response.
    #[serde(default = "default_symbol_id")]
    pub symbol_id: String,

    /// Per-request timeout for the upstream call.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    // --- Broadcast -----------------------------------------------------------

    /// Polling timer period while at least one subscriber is connected.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Heartbeat timer period. A subscriber is dropped after two ticks
    /// without answering a probe.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Per-subscriber outbound queue depth. A full queue counts as a failed
    /// send and drops the subscriber.
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,

    // --- Trading session -----------------------------------------------------

    /// Exchange-local UTC offset, minutes (TAIFEX: +480).
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,

    /// Session open, HHMM exchange-local, inclusive.
    #[serde(default = "default_session_open_hhmm")]
    pub session_open_hhmm: u32,

    /// Session close, HHMM exchange-local, inclusive.
    #[serde(default = "default_session_close_hhmm")]
    pub session_close_hhmm: u32,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            upstream_url: default_upstream_url(),
            symbol: default_symbol(),
            symbol_id: default_symbol_id(),
            request_timeout_ms: default_request_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            outbox_capacity: default_outbox_capacity(),
            utc_offset_minutes: default_utc_offset_minutes(),
            session_open_hhmm: default_session_open_hhmm(),
            session_close_hhmm: default_session_close_hhmm(),
        }
    }
}

impl HubConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read hub config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse hub config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbol_id = %config.symbol_id,
            poll_interval_ms = config.poll_interval_ms,
            "hub config loaded"
        );

        Ok(config)
    }

    /// File (or defaults) plus environment overrides. Never fails.
    pub fn from_env() -> Self {
        let path =
            std::env::var("HUB_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = Self::load(&path).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            Self::default()
        });
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply `HUB_*` overrides from `lookup`. Unparseable numbers are ignored
    /// with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("HUB_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = lookup("HUB_UPSTREAM_URL") {
            self.upstream_url = v;
        }
        if let Some(v) = lookup("HUB_SYMBOL") {
            self.symbol = v.trim().to_uppercase();
        }
        if let Some(v) = lookup("HUB_SYMBOL_ID") {
            self.symbol_id = v.trim().to_uppercase();
        }
        override_number(&lookup, "HUB_POLL_INTERVAL_MS", &mut self.poll_interval_ms);
        override_number(
            &lookup,
            "HUB_HEARTBEAT_INTERVAL_MS",
            &mut self.heartbeat_interval_ms,
        );
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn override_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) {
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(v) => *slot = v,
            Err(_) => warn!(key, value = %raw, "ignoring unparseable override"),
        }
    }
}
