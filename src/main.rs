// =============================================================================
// TXF Quote Hub — Main Entry Point
// =============================================================================
//
// The hub starts Idle. Polling and heartbeats run only while at least one
// WebSocket subscriber is connected.
// =============================================================================

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use txf_quote_hub::api;
use txf_quote_hub::app_state::AppState;
use txf_quote_hub::hub::{BroadcastHub, HubSettings};
use txf_quote_hub::market_data::{MarketClock, QuoteFetcher, TaifexClient};
use txf_quote_hub::runtime_config::HubConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        TXF Quote Hub — Starting Up                       ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let config = HubConfig::from_env();

    // ── 2. Upstream & fetcher ────────────────────────────────────────────
    let source = TaifexClient::new(&config).context("failed to build upstream client")?;
    let fetcher = QuoteFetcher::new(Arc::new(source), MarketClock::from_config(&config));
    info!(
        symbol = %config.symbol,
        symbol_id = %config.symbol_id,
        upstream = %config.upstream_url,
        "quote fetcher ready"
    );

    // ── 3. Broadcast hub ─────────────────────────────────────────────────
    let settings = HubSettings::from_config(&config);
    let hub = BroadcastHub::new(fetcher, settings);
    info!(
        poll_ms = config.poll_interval_ms,
        heartbeat_ms = config.heartbeat_interval_ms,
        "broadcast hub created (idle)"
    );

    // ── 4. API server ────────────────────────────────────────────────────
    let state = Arc::new(AppState::new(hub, &config));
    let app = api::rest::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "API server listening");

    // ── 5. Serve until Ctrl-C ────────────────────────────────────────────
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received — stopping API server");
        })
        .await
        .context("API server failed")?;

    info!("TXF Quote Hub stopped");
    Ok(())
}
