//! Web server module for Tally.
//!
//! Provides the HTTP request surface: `/collect` to record a sighting,
//! `/uniques` to list the clients seen on a day, plus health probes.
//! Validation failures answer 406, unrecognized requests 400, and a broken
//! storage backend 503. An empty query result is a 200 with
//! "No results found", never an error.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::geo::CountryLookup;
use crate::storage::{
    ClientId, CountryFilter, Day, FormatError, PresenceReader, PresenceWriter, Sighting,
    StorageError,
};

/// Body sent for an empty `/uniques` result.
const NO_RESULTS: &str = "No results found";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub writer: PresenceWriter,
    pub reader: PresenceReader,
    pub lookup: Arc<dyn CountryLookup>,
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    db: Option<String>,
}

/// Query parameters for the collect endpoint.
#[derive(Debug, Deserialize)]
pub struct CollectParams {
    pub cid: Option<String>,
}

/// Query parameters for the uniques endpoint.
#[derive(Debug, Deserialize)]
pub struct UniquesParams {
    pub d: Option<String>,
    pub cc: Option<String>,
}

/// Errors a handler can answer with.
#[derive(Debug)]
enum ServiceError {
    /// Input failed lexical validation: 406.
    InvalidFormat(FormatError),
    /// Request matches none of the supported shapes: 400.
    Unrecognized,
    /// Storage backend unreachable or failing: 503.
    Storage(StorageError),
}

impl From<FormatError> for ServiceError {
    fn from(e: FormatError) -> Self {
        Self::InvalidFormat(e)
    }
}

impl From<StorageError> for ServiceError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidFormat(f) => Self::InvalidFormat(f),
            other => Self::Storage(other),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidFormat(e) => (StatusCode::NOT_ACCEPTABLE, e.to_string()).into_response(),
            Self::Unrecognized => (
                StatusCode::BAD_REQUEST,
                "supported requests: /collect?cid=<UUID>, /uniques?d=<YYYY-MM-DD>, \
                 /uniques?d=<YYYY-MM-DD>&cc=<CC>",
            )
                .into_response(),
            Self::Storage(e) => {
                tracing::error!(error = %e, "Storage unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "storage unavailable").into_response()
            }
        }
    }
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let app_state = Arc::new(state);

    Router::new()
        .route("/", get(root_handler))
        .route("/collect", get(collect_handler))
        .route("/uniques", get(uniques_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .fallback(fallback_handler)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// Root path: reachable, nothing to say.
async fn root_handler() -> StatusCode {
    StatusCode::OK
}

/// Any path outside the supported request shapes.
async fn fallback_handler() -> ServiceError {
    ServiceError::Unrecognized
}

/// Liveness probe.
async fn healthz_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        db: None,
    })
}

/// Readiness probe that checks storage availability.
async fn readyz_handler(State(state): State<Arc<AppState>>) -> Response {
    let db_status = state
        .reader
        .query(&Day::today_utc(), None)
        .map(|_| "ready".to_string())
        .map_err(|e| e.to_string());

    match db_status {
        Ok(db) => Json(HealthResponse {
            status: "ok".to_string(),
            db: Some(db),
        })
        .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "not_ready".to_string(),
                    db: Some(err),
                }),
            )
                .into_response()
        }
    }
}

/// Record that a client was seen today.
///
/// The country code comes from the caller's network address, never from the
/// request itself.
async fn collect_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<CollectParams>,
) -> Result<StatusCode, ServiceError> {
    let cid = params.cid.ok_or(ServiceError::Unrecognized)?;
    let id = ClientId::parse(&cid)?;

    let country = state.lookup.country_for(client_addr(&headers, peer));
    state
        .writer
        .record(Sighting::new(id, country, Day::today_utc()))
        .await?;

    Ok(StatusCode::OK)
}

/// List the clients seen on a day, optionally filtered by country.
async fn uniques_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UniquesParams>,
) -> Result<String, ServiceError> {
    let d = params.d.ok_or(ServiceError::Unrecognized)?;
    let day = Day::parse(&d)?;
    let filter = params
        .cc
        .as_deref()
        .map(CountryFilter::parse)
        .transpose()?;

    let ids = state.reader.query(&day, filter.as_ref())?;
    if ids.is_empty() {
        Ok(NO_RESULTS.to_string())
    } else {
        Ok(ids.join("\n"))
    }
}

/// Client address for country lookup: first `X-Forwarded-For` entry when it
/// parses, else the socket peer address.
fn client_addr(headers: &HeaderMap, peer: SocketAddr) -> IpAddr {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|value| value.trim().parse::<IpAddr>().ok())
        .unwrap_or_else(|| peer.ip())
}
