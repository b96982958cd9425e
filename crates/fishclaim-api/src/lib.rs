//! FishClaim API - authentication, session lifecycle and claim ledger
//!
//! Provides HTTP endpoints for registering, logging in, rotating refresh
//! tokens and recording catches against the per-zone species records.
//!
//! Author: hephaex@gmail.com

pub mod audit;
pub mod auth;
pub mod claims;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod store;

use axum::{routing::get, Json, Router};
use state::AppState;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// OpenAPI document served at `/api-docs/openapi.json`
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::health::readiness_check,
        handlers::auth::register_handler,
        handlers::auth::login_handler,
        handlers::auth::refresh_handler,
        handlers::auth::logout_handler,
        handlers::auth::me_handler,
        handlers::auth::admin_ping_handler,
        handlers::catches::record_catch_handler,
        handlers::claims::zone_claims_handler,
        handlers::claims::set_claim_status_handler,
    ),
    components(schemas(
        error::ApiError,
        auth::RegisterRequest,
        auth::RefreshRequest,
        auth::LogoutRequest,
        auth::TokenPair,
        auth::UserPublic,
        handlers::auth::LoginForm,
        handlers::auth::LogoutResponse,
        handlers::auth::StatusResponse,
        handlers::catches::RecordCatchRequest,
        handlers::catches::RecordCatchResponse,
        handlers::claims::ClaimStatusRequest,
        handlers::health::HealthResponse,
        handlers::health::ReadinessResponse,
        claims::Catch,
        claims::Claim,
        claims::ClaimOutcome,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness and readiness probes"),
        (name = "auth", description = "Registration, login and token lifecycle"),
        (name = "claims", description = "Catches and per-zone species records"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .nest("/api", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// In-memory state with cheap password hashing for tests
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state() -> Arc<AppState> {
    use fishclaim_core::config::{AppConfig, HashingConfig};

    let mut config = AppConfig::default();
    config.auth.hashing = HashingConfig {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
    };

    Arc::new(AppState::in_memory(config))
}

/// Router over a fresh in-memory state
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    create_router(create_test_state())
}
