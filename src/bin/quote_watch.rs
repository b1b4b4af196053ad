// =============================================================================
// quote-watch — reconnecting hub subscriber
// =============================================================================
//
// Usage: quote-watch [ws-url]
//
// The URL falls back to `HUB_WATCH_URL`, then to the local hub. Each Snapshot
// is logged as it arrives; the process exits when the reconnect policy is
// exhausted or on Ctrl-C.
// =============================================================================

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use txf_quote_hub::client::{QuoteClient, QuoteClientConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args()
        .nth(1)
        .or_else(|| std::env::var("HUB_WATCH_URL").ok())
    {
        Some(url) => QuoteClientConfig::new(url),
        None => QuoteClientConfig::default(),
    };
    info!(url = %config.url, "quote-watch starting");

    let mut client = QuoteClient::start(config);

    loop {
        tokio::select! {
            snapshot = client.snapshots.recv() => {
                let Some(s) = snapshot else { break };
                let signal = s
                    .signal
                    .as_ref()
                    .map(|sig| format!("{} ({})", sig.kind, sig.reason))
                    .unwrap_or_else(|| "-".to_string());
                info!(
                    price = %s.price,
                    change = %s.change,
                    change_percent = %s.change_percent,
                    volume = %s.volume,
                    open = s.is_market_open,
                    signal = %signal,
                    at = %s.update_time,
                    "snapshot"
                );
            }
            state = client.states.recv() => {
                let Some(state) = state else { break };
                info!(state = %state, "connection state");
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Ctrl-C received — stopping");
                client.shutdown();
                break;
            }
        }
    }

    client.join().await
}
