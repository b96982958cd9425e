//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::auth::{auth_middleware, require_any_role};
use crate::claims::REVIEWER_ROLES;
use crate::handlers::{auth, catches, claims};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use fishclaim_core::UserRole;
use std::sync::Arc;

const ADMIN_ONLY: &[UserRole] = &[UserRole::Admin];

/// Create the `/api` routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/refresh", post(auth::refresh_handler))
        .route("/claims/zone/:zone_id", get(claims::zone_claims_handler));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/me", get(auth::me_handler))
        .route("/catches", post(catches::record_catch_handler));

    let admin_routes = Router::new()
        .route("/auth/admin/ping", get(auth::admin_ping_handler))
        .route_layer(middleware::from_fn(require_any_role(ADMIN_ONLY)));

    let reviewer_routes = Router::new()
        .route(
            "/claims/:claim_id/status",
            post(claims::set_claim_status_handler),
        )
        .route_layer(middleware::from_fn(require_any_role(REVIEWER_ROLES)));

    // Role checks read the principal, so authentication wraps them
    let authenticated = protected_routes
        .merge(admin_routes)
        .merge(reviewer_routes)
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(public_routes).merge(authenticated)
}
