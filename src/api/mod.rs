// Person REST API
// The same slow lookup exposed through blocking and non-blocking routes

pub mod handlers;
pub mod types;


use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

pub use handlers::AppState;
use handlers::{
    health_check, not_found, receive_person_function, retrieve_service,
    retrieve_service_async_block, retrieve_service_sync, retrieve_via_client,
    retrieve_via_client_sync, search_via_client,
};

/// Create the Axum router with every person route
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Service-backed routes: simulated slow lookup in this process
        .route("/persons/:id/service", get(retrieve_service))
        .route("/persons/:id/serviceblock", get(retrieve_service_async_block))
        .route("/persons/:id/servicesync", get(retrieve_service_sync))
        // Client-backed routes: call the upstream's slow endpoint
        .route("/persons/:id/client", get(retrieve_via_client))
        .route("/persons/:id/clientsync", get(retrieve_via_client_sync))
        .route("/persons/client", get(search_via_client).post(search_via_client))
        // Functional-style route
        .route("/personsFunction/:id", get(receive_person_function))
        // Health check
        .route("/health", get(health_check))
        // Fallback for unknown routes
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
