//! Stateless edge gateway: terminates client HTTP traffic, authenticates,
//! rate-limits, and converts each request into a typed RPC to the
//! coordinator behind breaker-wrapped upstream calls.

pub mod auth;
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod proxy;
pub mod rate_limit;
pub mod request_id;
pub mod state;

use std::sync::Arc;

use axum::http::HeaderName;
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use request_id::{UuidRequestId, REQUEST_ID_HEADER};
use state::AppState;

/// Builds the full route table. Split out from `main` so integration tests
/// can mount it over a [`tower::util::ServiceExt::oneshot`] call without a
/// bound TCP listener.
pub fn app(state: AppState, config: &Config) -> Router {
    let authenticated = Router::new()
        .route("/api/v1/search", get(handlers::search::search_get).post(handlers::search::search_post))
        .route("/api/v1/documents", post(handlers::documents::add_document_root))
        .route(
            "/api/v1/documents/{index}/{id}",
            get(handlers::documents::get_document)
                .put(handlers::documents::update_document)
                .delete(handlers::documents::delete_document),
        )
        .route("/api/v1/documents/batch", post(handlers::documents::batch_documents))
        .route(
            "/api/v1/indexes",
            get(handlers::indexes::list_indexes),
        )
        .route(
            "/api/v1/indexes/{id}",
            post(handlers::indexes::create_index)
                .get(handlers::indexes::get_index)
                .delete(handlers::indexes::delete_index),
        )
        .route("/api/v1/indexes/{id}/rebuild", post(handlers::indexes::rebuild_index))
        .route_layer(middleware::from_fn_with_state(state.auth_tokens.clone(), auth::require_bearer_token));

    let public = Router::new()
        .route("/health", get(handlers::health::liveness))
        .route("/health/services", get(handlers::health::services))
        .route("/health/circuit-breakers", get(handlers::health::circuit_breakers))
        .route(&config.metrics.path, get(metrics::render));

    let cors = if config.cors.allow_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = config
            .cors
            .allow_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    };

    let rate_limit_state = rate_limit::RateLimitState {
        limiter: state.rate_limiter.clone(),
        config: config.rate_limit.clone(),
    };

    Router::new()
        .merge(authenticated)
        .merge(public)
        .layer(middleware::from_fn_with_state(rate_limit_state, rate_limit::enforce_tiered_rate_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, UuidRequestId))
        .with_state(state)
}

/// `HeaderName` constant reused so the request-id layers and `request_id`
/// module agree on the exact header.
pub fn request_id_header() -> HeaderName {
    REQUEST_ID_HEADER
}

pub use config::Config as GatewayConfig;

pub fn auth_tokens(config: &Config) -> Arc<Vec<String>> {
    Arc::new(config.auth.tokens.clone())
}
