//! Router configuration module
//!
//! Configures all routes, middleware layers, and creates the application router.

use std::{sync::Arc, time::Duration};

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    routing::{get, post},
    Router,
};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::ceremony::{
    begin_authentication, begin_registration, complete_authentication, complete_registration,
};
use crate::config::Config;
use crate::handlers::{health, ready};
use crate::openapi::openapi_json;
use crate::state::AppState;

/// Create the application router with default config (for testing)
pub fn create_router(state: AppState) -> Router {
    create_router_with_config(state, &Config::default())
}

/// Create the application router with custom configuration
pub fn create_router_with_config(state: AppState, config: &Config) -> Router {
    // Browsers may only call from the relying party's own origins
    let origins: Vec<HeaderValue> = state
        .passkeys
        .relying_party()
        .allowed_origins()
        .filter_map(|o| o.parse().ok())
        .collect();
    tracing::info!("CORS: Restricting to {} origin(s)", origins.len());
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    // Request body limit
    let body_limit = RequestBodyLimitLayer::new(config.body_limit_kb * 1024);

    // Request timeout
    let timeout = TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(config.timeout_secs),
    );

    // Base router with common layers
    let router = Router::new()
        .route("/register/begin", post(begin_registration))
        .route("/register/complete", post(complete_registration))
        .route("/authenticate/begin", post(begin_authentication))
        .route("/authenticate/complete", post(complete_authentication))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/api-docs/openapi.json", get(openapi_json))
        .with_state(state)
        .layer(cors)
        .layer(body_limit)
        .layer(timeout);

    if !config.rate_limit_enabled {
        tracing::warn!("Rate limiting: DISABLED");
        return router.layer(TraceLayer::new_for_http());
    }

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(config.rate_limit_per_sec)
        .burst_size(config.rate_limit_burst)
        .finish();

    match governor_conf {
        Some(governor_conf) => {
            tracing::info!(
                "Rate limiting: {} req/s (burst: {})",
                config.rate_limit_per_sec,
                config.rate_limit_burst
            );
            router
                .layer(GovernorLayer::new(Arc::new(governor_conf)))
                .layer(TraceLayer::new_for_http())
        }
        None => {
            tracing::warn!(
                per_sec = config.rate_limit_per_sec,
                burst = config.rate_limit_burst,
                "Invalid rate limit settings, rate limiting DISABLED"
            );
            router.layer(TraceLayer::new_for_http())
        }
    }
}
