//! Web server module.
//!
//! Exposes the authenticated `/ping` endpoint and an unauthenticated
//! liveness probe.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

use crate::config::ProbeDefaults;
use crate::probe::{ProbeError, ProbeOrchestrator, ProbeResult};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: ProbeOrchestrator,
    pub auth_token: AuthToken,
    pub probe: ProbeDefaults,
}

impl AppState {
    /// State with the system `ping` executable and TCP stack.
    pub fn new(auth_token: impl Into<String>, probe: ProbeDefaults) -> Self {
        Self {
            orchestrator: ProbeOrchestrator::system(probe.ping_program.clone()),
            auth_token: AuthToken::new(auth_token),
            probe,
        }
    }
}

/// Shared secret expected in the `Authorization` header.
#[derive(Clone)]
pub struct AuthToken(Arc<str>);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Arc::from(token.into()))
    }

    /// Constant-time comparison against a presented credential.
    ///
    /// An empty token never matches.
    pub fn verify(&self, presented: &str) -> bool {
        !self.0.is_empty() && bool::from(self.0.as_bytes().ct_eq(presented.as_bytes()))
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Errors returned to HTTP callers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or wrong credential.
    #[error("unauthorized")]
    Unauthorized,

    /// Target is empty, or neither an IP address nor a domain name.
    #[error("invalid target")]
    InvalidTarget,

    /// A query parameter is malformed, repeated or out of bounds.
    #[error("invalid {0}")]
    InvalidParameter(&'static str),
}

impl From<ProbeError> for ApiError {
    fn from(err: ProbeError) -> Self {
        match err {
            ProbeError::InvalidTarget(_) => Self::InvalidTarget,
        }
    }
}

/// Error body: `{"ok": false, "error": "..."}`.
#[derive(Serialize)]
struct ErrorResponse {
    ok: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidTarget | Self::InvalidParameter(_) => StatusCode::BAD_REQUEST,
        };
        let body = ErrorResponse {
            ok: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

/// Query parameters for the ping API.
///
/// Numbers are taken as strings so malformed values produce the same JSON
/// error body as every other client error.
#[derive(Debug, Default, Deserialize)]
pub struct PingQueryParams {
    pub target: Option<String>,
    pub count: Option<String>,
    /// Per-packet ICMP timeout in seconds.
    pub timeout: Option<String>,
}

/// Successful probe response.
#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub ok: bool,
    pub method: String,
    pub avg_ms: Option<f64>,
    pub target: String,
}

impl From<ProbeResult> for PingResponse {
    fn from(result: ProbeResult) -> Self {
        Self {
            ok: result.succeeded,
            method: result.method.to_string(),
            avg_ms: result.latency_ms,
            target: result.target.to_string(),
        }
    }
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let app_state = Arc::new(state);

    Router::new()
        .route("/ping", get(ping_handler))
        .route("/healthz", get(healthz_handler))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(app_state)
}

/// Liveness probe.
async fn healthz_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Parse an optional bounded integer query parameter.
fn parse_bounded(
    value: Option<&str>,
    name: &'static str,
    max: u64,
) -> Result<Option<u64>, ApiError> {
    let Some(raw) = value.map(str::trim) else {
        return Ok(None);
    };
    match raw.parse::<u64>() {
        Ok(n) if (1..=max).contains(&n) => Ok(Some(n)),
        _ => Err(ApiError::InvalidParameter(name)),
    }
}

/// Reachability probe endpoint.
///
/// The query is taken as a `Result` so the credential is checked before any
/// query rejection can reach the caller.
async fn ping_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<PingQueryParams>, QueryRejection>,
) -> Result<Json<PingResponse>, ApiError> {
    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !state.auth_token.verify(presented) {
        let has_credential = !presented.is_empty();
        tracing::warn!(has_credential, "Rejected unauthorized ping request");
        return Err(ApiError::Unauthorized);
    }

    let Query(params) = query.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "Rejected malformed ping query");
        ApiError::InvalidParameter("query")
    })?;

    let target = params.target.as_deref().unwrap_or_default().trim();
    if target.is_empty() {
        return Err(ApiError::InvalidTarget);
    }

    let count = parse_bounded(params.count.as_deref(), "count", state.probe.max_count.into())?;
    let timeout = parse_bounded(
        params.timeout.as_deref(),
        "timeout",
        state.probe.max_timeout.as_secs(),
    )?;

    let config = state.probe.probe_config(
        count.and_then(|n| u32::try_from(n).ok()),
        timeout.map(Duration::from_secs),
    );

    let result = state.orchestrator.probe(target, &config).await?;
    Ok(Json(result.into()))
}
