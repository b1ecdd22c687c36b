// Person API handlers
// Each route answers the same question in a different blocking style

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::types::{create_error_response, current_timestamp, ErrorResponse, HealthResponse};
use crate::client::{blocking::block_on_bridge, fanout::search, PersonLookup};
use crate::config::PocConfig;
use crate::models::Person;
use crate::server::runtime::BlockingMode;
use crate::service::PersonService;
use crate::{PocError, Result};

/// Shared state of the person API
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PersonService>,
    /// Upstream used by the async `client*` routes
    pub client: Arc<dyn PersonLookup>,
    /// Upstream used by `clientsync`, driven on the client bridge runtime
    pub blocking_client: Arc<dyn PersonLookup>,
    pub parallel_search_max: usize,
    /// Where the blocking routes run their blocking section
    pub blocking: BlockingMode,
}

impl AppState {
    pub fn new(service: PersonService, client: Arc<dyn PersonLookup>) -> Self {
        Self {
            service: Arc::new(service),
            blocking_client: client.clone(),
            client,
            parallel_search_max: PocConfig::default().controller.parallel_search_max,
            blocking: BlockingMode::default(),
        }
    }

    /// Separate upstream for `clientsync`
    ///
    /// An HTTP client keeps its pooled connections on the runtime that opened
    /// them, so the blocking route needs one that the server runtime never uses.
    pub fn with_blocking_client(mut self, client: Arc<dyn PersonLookup>) -> Self {
        self.blocking_client = client;
        self
    }

    pub fn with_parallel_search_max(mut self, max: usize) -> Self {
        self.parallel_search_max = max.max(1);
        self
    }

    pub fn with_blocking_mode(mut self, blocking: BlockingMode) -> Self {
        self.blocking = blocking;
        self
    }
}

/// `GET /persons/:id/service`
///
/// Fully async: the sleep runs on the blocking pool while this task is parked.
pub async fn retrieve_service(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<Person>> {
    let id = person_id(path)?;
    info!("retrieve_service {}", id);
    let person = state.service.retrieve_async(id).await?;
    info!("retrieve_service {}, result {:?}", id, person);
    Ok(Json(person))
}

/// `GET /persons/:id/serviceblock`
///
/// Returns a future, but the service sleeps before handing it over, so the
/// calling thread is blocked for the whole delay.
pub async fn retrieve_service_async_block(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<Person>> {
    let id = person_id(path)?;
    info!("retrieve_service_async_block {}", id);
    let service = &state.service;
    let person = state
        .blocking
        .run(|| service.retrieve_async_blocking(id))
        .await?;
    info!("retrieve_service_async_block {}, result {:?}", id, person);
    Ok(Json(person))
}

/// `GET /persons/:id/servicesync`
///
/// Plain blocking call on the request thread.
pub async fn retrieve_service_sync(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<Person>> {
    let id = person_id(path)?;
    info!("retrieve_service_sync {}", id);
    let service = &state.service;
    let person = state.blocking.run(|| service.retrieve_sync(id))?;
    info!("retrieve_service_sync {}, result {:?}", id, person);
    Ok(Json(person))
}

/// `GET /persons/:id/client`
///
/// Awaits the upstream slow endpoint without holding the worker.
pub async fn retrieve_via_client(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<Person>> {
    let id = person_id(path)?;
    info!("retrieve_via_client {}", id);
    let person = state.client.fetch(id).await?;
    info!("retrieve_via_client {}, result {:?}", id, person);
    Ok(Json(person))
}

/// `GET /persons/:id/clientsync`
///
/// Same upstream call, but the request thread waits for it synchronously.
/// The fetch itself runs on the client bridge runtime, so the wait holds
/// this thread without needing it to make progress.
pub async fn retrieve_via_client_sync(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<Person>> {
    let id = person_id(path)?;
    info!("retrieve_via_client_sync {}", id);
    let client = state.blocking_client.clone();
    let person = state
        .blocking
        .run(move || block_on_bridge(async move { client.fetch(id).await }))?;
    info!("retrieve_via_client_sync {}, result {:?}", id, person);
    Ok(Json(person))
}

/// `GET /persons/client` with a JSON array of ids as body
///
/// Fans out to the upstream at most `parallel_search_max` at a time. Answers
/// with the persons in request order, or with the first failure.
pub async fn search_via_client(
    State(state): State<AppState>,
    body: std::result::Result<Json<Vec<i64>>, JsonRejection>,
) -> Result<Json<Vec<Person>>> {
    let Json(ids) = body.map_err(|e| PocError::InvalidInput(e.body_text()))?;
    info!("search_via_client {:?}", ids);

    let outcome = search(state.client.as_ref(), &ids, state.parallel_search_max).await;
    debug!("search_via_client {:?} took {:?}", ids, outcome.elapsed);

    let persons = outcome.into_all_ok()?;
    info!("search_via_client {:?}, {} persons", ids, persons.len());
    Ok(Json(persons))
}

/// `GET /personsFunction/:id`
///
/// Only served to callers that accept JSON; proxies the upstream slow endpoint.
pub async fn receive_person_function(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Response> {
    if !accepts_json(&headers) {
        warn!("receive_person_function rejected Accept {:?}", headers.get(header::ACCEPT));
        return Ok(create_error_response(
            "Only application/json is produced".to_string(),
            "not_acceptable_error",
            None,
        )
        .with_status(StatusCode::NOT_ACCEPTABLE.as_u16())
        .into_response());
    }

    let id = person_id(path)?;
    let person = state.client.fetch(id).await?;
    Ok(Json(person).into_response())
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: current_timestamp(),
    })
}

/// Fallback for unknown routes
pub async fn not_found() -> impl IntoResponse {
    create_error_response("Unknown route".to_string(), "not_found_error", Some("route_not_found"))
}

fn person_id(path: std::result::Result<Path<i64>, PathRejection>) -> Result<i64> {
    path.map(|Path(id)| id)
        .map_err(|e| PocError::InvalidInput(e.body_text()))
}

/// True when the `Accept` header is absent or admits `application/json`
fn accepts_json(headers: &HeaderMap) -> bool {
    let accept = match headers.get(header::ACCEPT).and_then(|h| h.to_str().ok()) {
        Some(accept) => accept,
        None => return true,
    };

    accept
        .split(',')
        .map(|range| range.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .any(|range| range == "application/json" || range == "application/*" || range == "*/*")
}

impl From<&PocError> for ErrorResponse {
    fn from(err: &PocError) -> Self {
        let (error_type, code, status) = match err {
            PocError::PersonNotFound { .. } => ("not_found_error", "person_not_found", None),
            PocError::Upstream { status, .. } => ("upstream_error", "upstream_status", Some(*status)),
            PocError::Network(_) => ("upstream_error", "upstream_unreachable", None),
            PocError::InvalidInput(_) => ("invalid_request_error", "invalid_input", None),
            PocError::Serialization(_) => ("upstream_error", "bad_upstream_body", None),
            PocError::Config(_) | PocError::Internal(_) => ("internal_error", "internal", None),
        };

        let mut response = create_error_response(err.to_string(), error_type, Some(code));
        if let Some(status) = status {
            response = response.with_status(status);
        }
        // Relay the upstream's own message rather than our wrapper text
        if let PocError::Upstream { message, .. } = err {
            response.error.message = message.clone();
        }
        response
    }
}

impl IntoResponse for PocError {
    fn into_response(self) -> Response {
        ErrorResponse::from(&self).into_response()
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = match self.error.status.and_then(|s| StatusCode::from_u16(s).ok()) {
            Some(status) if status.is_client_error() || status.is_server_error() => status,
            Some(_) => StatusCode::BAD_GATEWAY,
            None => match self.error.error_type.as_str() {
                "invalid_request_error" => StatusCode::BAD_REQUEST,
                "not_found_error" => StatusCode::NOT_FOUND,
                "not_acceptable_error" => StatusCode::NOT_ACCEPTABLE,
                "upstream_error" => StatusCode::BAD_GATEWAY,
                "internal_error" => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
        };

        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let response = health_check().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_accepts_json() {
        let mut headers = HeaderMap::new();
        assert!(accepts_json(&headers));

        headers.insert(header::ACCEPT, "text/html, application/json;q=0.9".parse().unwrap());
        assert!(accepts_json(&headers));

        headers.insert(header::ACCEPT, "*/*".parse().unwrap());
        assert!(accepts_json(&headers));

        headers.insert(header::ACCEPT, "text/plain".parse().unwrap());
        assert!(!accepts_json(&headers));
    }

    #[test]
    fn test_error_status_mapping() {
        let status = |err: PocError| err.into_response().status();

        assert_eq!(status(PocError::PersonNotFound { id: 10_000 }), StatusCode::NOT_FOUND);
        assert_eq!(status(PocError::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(PocError::Network("down".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(status(PocError::Internal("boom".into())), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            status(PocError::Upstream { status: 404, message: "gone".into() }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(PocError::Upstream { status: 302, message: "moved".into() }),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_upstream_message_is_relayed() {
        let body = ErrorResponse::from(&PocError::Upstream {
            status: 404,
            message: "Cannot find person with id 10000".into(),
        });
        assert_eq!(body.error.message, "Cannot find person with id 10000");
        assert_eq!(body.error.error_type, "upstream_error");
    }
}
