// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`:
//
//   GET  /health  liveness + hub state (public)
//   GET  /quote   one-shot best-effort Snapshot (public, GET only)
//   GET  /chart   current chart bars (public)
//   POST /chart   replace chart bars (Bearer token, `HUB_INGEST_TOKEN`)
//   GET  /ws      WebSocket subscription
//
// CORS is configured permissively; the quote feed is public market data.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::api::auth::AuthBearer;
use crate::app_state::AppState;
use crate::hub::HubState;
use crate::types::ChartBar;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        .route("/api/v1/quote", get(quote).fallback(method_not_allowed))
        // ── Chart boundary (POST is authenticated) ──────────────────
        .route("/api/v1/chart", get(chart).post(replace_chart))
        // ── WebSocket ───────────────────────────────────────────────
        .route("/api/v1/ws", get(crate::api::ws::ws_handler))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health (public)
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    state: HubState,
    subscribers: usize,
    uptime_secs: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state: state.hub.state(),
        subscribers: state.hub.subscriber_count(),
        uptime_secs: state.uptime_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
    };
    Json(resp)
}

// =============================================================================
// One-shot quote (public)
// =============================================================================

async fn quote(State(state): State<Arc<AppState>>) -> Response {
    // The fetch path degrades on its own; only a task that dies before
    // producing anything becomes a 500.
    let hub = Arc::clone(&state.hub);
    match tokio::spawn(async move { hub.produce_snapshot().await }).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => {
            error!(error = %e, "one-shot quote fetch aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "message": "unable to fetch quote" })),
            )
                .into_response()
        }
    }
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(serde_json::json!({ "message": "only GET is allowed" })),
    )
}

// =============================================================================
// Chart bars
// =============================================================================

async fn chart(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let bars = state
        .hub
        .chart()
        .latest()
        .map(|bars| bars.as_ref().clone())
        .unwrap_or_default();
    Json(bars)
}

async fn replace_chart(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Json(bars): Json<Vec<ChartBar>>,
) -> impl IntoResponse {
    let count = bars.len();
    state.hub.chart().replace(bars);
    info!(bars = count, "chart feed replaced");
    (StatusCode::ACCEPTED, Json(serde_json::json!({ "bars": count })))
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{BroadcastHub, HubSettings};
    use crate::market_data::fetcher::tests::ScriptedSource;
    use crate::market_data::{MarketClock, QuoteFetcher};
    use crate::runtime_config::HubConfig;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        let fetcher = QuoteFetcher::new(
            Arc::new(ScriptedSource::always("18000")),
            MarketClock::default(),
        );
        let hub = BroadcastHub::new(fetcher, HubSettings::default());
        router(Arc::new(AppState::new(hub, &HubConfig::default())))
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn quote_returns_snapshot() {
        let resp = app()
            .oneshot(Request::get("/api/v1/quote").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["price"], "18000");
        assert_eq!(json["changePercent"], "0.28");
    }

    #[tokio::test]
    async fn quote_rejects_other_methods() {
        let resp = app()
            .oneshot(
                Request::post("/api/v1/quote")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        let json = body_json(resp).await;
        assert_eq!(json["message"], "only GET is allowed");
    }

    #[tokio::test]
    async fn health_reports_idle_hub() {
        let resp = app()
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["state"], "Idle");
        assert_eq!(json["subscribers"], 0);
        assert!(json["uptimeSecs"].is_u64());
        assert!(json["serverTime"].as_i64().is_some_and(|ms| ms > 0));
    }

    #[tokio::test]
    async fn chart_replace_requires_token() {
        let resp = app()
            .oneshot(
                Request::post("/api/v1/chart")
                    .header("content-type", "application/json")
                    .body(Body::from("[]"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn chart_starts_empty() {
        let resp = app()
            .oneshot(Request::get("/api/v1/chart").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, serde_json::json!([]));
    }
}
