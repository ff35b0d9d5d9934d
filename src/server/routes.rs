//! HTTP routes
//!
//! - `GET /:host[?date=yyyy-MM-dd]` lists the caller's log files
//! - `GET /:host/:severity[?date=yyyy-MM-dd]` returns one file as text
//! - `POST /:host/:severity` with `{"message": "..."}` records a line

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, warn};

use super::peer::client_address;
use crate::identity::ClientIdentity;
use crate::ingest::{IngestError, IngestService};
use crate::severity::Severity;
use crate::storage::LogFileInfo;

/// Shared state handed to every handler
#[derive(Clone, Debug)]
pub struct AppState {
    pub service: IngestService,
    pub trusted_proxies: Arc<Vec<IpAddr>>,
}

impl AppState {
    pub fn new(service: IngestService, trusted_proxies: Vec<IpAddr>) -> Self {
        Self {
            service,
            trusted_proxies: Arc::new(trusted_proxies),
        }
    }

    fn identity(&self, peer: SocketAddr, headers: &HeaderMap) -> ClientIdentity {
        let addr = client_address(peer, headers, &self.trusted_proxies);
        ClientIdentity::from_peer(Some(addr))
    }
}

/// Optional `date` query parameter of the read routes
#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    #[serde(default)]
    pub date: Option<String>,
}

/// Body of a record request
#[derive(Debug, Deserialize)]
pub struct RecordBody {
    #[serde(default)]
    pub message: Option<String>,
}

impl IngestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IngestError::InvalidInput(_) | IngestError::WriteFailed(_) => StatusCode::BAD_REQUEST,
            IngestError::NotFound => StatusCode::NOT_FOUND,
            IngestError::Filesystem(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Build the router over the given state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/:host", get(list_handler))
        .route("/:host/:severity", get(fetch_handler).post(record_handler))
        .with_state(state)
}

/// Run storage work on the blocking pool
async fn blocking<T, F>(work: F) -> Result<T, IngestError>
where
    F: FnOnce() -> Result<T, IngestError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        error!("Storage task failed: {}", e);
        IngestError::Filesystem(format!("storage task failed: {}", e))
    })?
}

/// GET /:host
async fn list_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(host): Path<String>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<LogFileInfo>>, IngestError> {
    let identity = state.identity(peer, &headers);
    debug!(client = %identity, host = %host, date = ?query.date, "List request");

    let service = state.service.clone();
    let files = blocking(move || service.list(&identity, &host, query.date.as_deref()))
        .await
        .inspect_err(|e| warn!("List failed: {}", e))?;
    Ok(Json(files))
}

/// GET /:host/:severity
async fn fetch_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path((host, severity)): Path<(String, String)>,
    Query(query): Query<DateQuery>,
) -> Result<Response, IngestError> {
    let identity = state.identity(peer, &headers);
    debug!(client = %identity, host = %host, severity = %severity, date = ?query.date, "Fetch request");

    let service = state.service.clone();
    let contents =
        blocking(move || service.fetch(&identity, &host, &severity, query.date.as_deref())).await?;

    Ok((
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static(contents.content_type),
        )],
        contents.bytes,
    )
        .into_response())
}

/// POST /:host/:severity
async fn record_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path((host, severity)): Path<(String, String)>,
    body: Result<Json<RecordBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, IngestError> {
    let identity = state.identity(peer, &headers);

    let message = match body {
        Ok(Json(body)) => body.message,
        Err(rejection) => {
            // An unknown severity is reported ahead of a malformed body
            severity.parse::<Severity>()?;
            return Err(IngestError::InvalidInput(rejection.body_text()));
        }
    };

    let service = state.service.clone();
    let outcome = blocking(move || service.record(&identity, &host, &severity, message.as_deref()))
        .await
        .inspect_err(|e| warn!("Record failed: {}", e))?;

    Ok(Json(json!({ "message": outcome.message() })))
}
