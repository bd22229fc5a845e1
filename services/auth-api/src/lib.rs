//! Keygate Auth API
//!
//! Authentication service issuing access and refresh tokens.
//!
//! ## REST Endpoints
//!
//! - `POST /api/v1/auth/login` - Exchange credentials for tokens
//! - `POST /api/v1/auth/refresh` - New access token from the refresh cookie
//! - `POST /api/v1/auth/logout` - Revoke the caller's tokens
//! - `GET /api/v1/auth/me` - Current principal
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use keygate_types::TokenKind;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub use config::{Config, ConfigError};
pub use error::{ApiError, ApiResult};
pub use lifecycle::Lifecycle;
pub use state::{AppState, Strategy};

/// Build the HTTP router
pub fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let request_timeout = state.request_timeout();

    // Refresh routes read the refresh cookie
    let refresh_routes = Router::new()
        .route("/auth/refresh", post(handlers::refresh))
        .route_layer(state.auth_layer(TokenKind::RefreshToken));

    // Access token routes
    let protected_routes = Router::new()
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::me))
        .route_layer(state.auth_layer(TokenKind::AccessToken));

    let api_v1 = Router::new()
        .route("/auth/login", post(handlers::login))
        .merge(refresh_routes)
        .merge(protected_routes);

    // Health routes (no timeout - must always respond quickly)
    let health_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready));

    // Metrics route (no timeout)
    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Build middleware stack (order matters - outermost first)
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .nest("/api/v1", api_v1)
        .layer(middleware)
        .merge(health_routes)
        .merge(metrics_route)
        .with_state(state)
}
