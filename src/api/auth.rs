// =============================================================================
// Bearer Token Authentication — chart ingest guard
// =============================================================================
//
// Only `POST /api/v1/chart` is guarded. The expected token comes from the
// `HUB_INGEST_TOKEN` environment variable, read per request so it can be
// rotated without a restart. An unset token rejects every request.
//
//   async fn handler(_auth: AuthBearer, ...) { ... }
// =============================================================================

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

/// Environment variable holding the chart ingest token.
pub const INGEST_TOKEN_ENV: &str = "HUB_INGEST_TOKEN";

// =============================================================================
// Constant-time comparison
// =============================================================================

/// Compare two byte slices without short-circuiting on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

// =============================================================================
// Extractor
// =============================================================================

/// Yields the presented token once it matches `HUB_INGEST_TOKEN`.
pub struct AuthBearer(pub String);

/// 403 with a JSON `{"message": ...}` body.
#[derive(Debug, PartialEq, Eq)]
pub struct AuthRejection {
    message: &'static str,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "message": self.message });
        (StatusCode::FORBIDDEN, axum::Json(body)).into_response()
    }
}

/// Check an `Authorization` header value against the expected token.
fn check_bearer(header: Option<&str>, expected: &str) -> Result<String, AuthRejection> {
    if expected.is_empty() {
        warn!("{INGEST_TOKEN_ENV} is not set — rejecting chart ingest");
        return Err(AuthRejection {
            message: "ingest authentication not configured",
        });
    }

    let token = match header.and_then(|v| v.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => {
            warn!("missing or malformed Authorization header");
            return Err(AuthRejection {
                message: "missing or invalid authorization token",
            });
        }
    };

    if !constant_time_eq(token.as_bytes(), expected.as_bytes()) {
        warn!("invalid ingest token presented");
        return Err(AuthRejection {
            message: "invalid authorization token",
        });
    }

    Ok(token.to_string())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthBearer
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let expected = std::env::var(INGEST_TOKEN_ENV).unwrap_or_default();
        let header = parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        check_bearer(header, &expected).map(AuthBearer)
    }
}

// =============================================================================
// Tests
// =============================================================================
