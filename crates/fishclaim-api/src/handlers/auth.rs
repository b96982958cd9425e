//! Authentication API handlers
//!
//! Provides HTTP endpoints for the session lifecycle and profile lookup.
//!
//! Author: hephaex@gmail.com

use crate::audit::ClientContext;
use crate::auth::{AuthenticatedUser, LogoutRequest, RefreshRequest, RegisterRequest, TokenPair};
use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, http::HeaderMap, response::IntoResponse, Extension, Form, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Password grant form
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Logout response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
    pub revoked_tokens: u64,
}

/// Admin probe response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
}

/// Register a new user account
///
/// New users always get the `user` role.
///
/// # Responses
///
/// * `200 OK` - User registered, returns the public profile
/// * `400 Bad Request` - Invalid input, or email/username already registered
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered successfully", body = crate::auth::UserPublic),
        (status = 400, description = "Invalid input or duplicate user", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client = ClientContext::from_headers(&headers);
    let user = state.sessions.register(request, &client).await?;

    Ok(Json(user))
}

/// Login with username and password
///
/// Takes a form-encoded password grant and returns an access and refresh
/// token pair. Unknown users and wrong passwords get the same 401.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Login successful", body = TokenPair),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, AppError> {
    let client = ClientContext::from_headers(&headers);
    let pair = state
        .sessions
        .login(&form.username, &form.password, &client)
        .await?;

    Ok(Json(pair))
}

/// Refresh access token
///
/// Rotates the refresh token: the presented token is revoked and a new one
/// is issued. Presenting a rotated token again fails.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token refreshed successfully", body = TokenPair),
        (status = 401, description = "Invalid refresh token", body = crate::error::ApiError),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client = ClientContext::from_headers(&headers);
    let pair = state
        .sessions
        .refresh(&request.refresh_token, &client)
        .await?;

    Ok(Json(pair))
}

/// Logout current session
///
/// Revokes the given refresh token, or every refresh token of the caller
/// when `logout_all_devices` is set. Outstanding access tokens stay valid
/// until they expire.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Logged out", body = LogoutResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    headers: HeaderMap,
    request: Option<Json<LogoutRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let client = ClientContext::from_headers(&headers);
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let all_devices = request.logout_all_devices.unwrap_or(false);

    let revoked_tokens = state
        .sessions
        .logout(
            user.user_id,
            request.refresh_token.as_deref(),
            all_devices,
            &client,
        )
        .await?;

    let message = if all_devices {
        "Logged out from all devices"
    } else {
        "Logout successful"
    };

    Ok(Json(LogoutResponse {
        message: message.to_string(),
        revoked_tokens,
    }))
}

/// Get current user profile
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = crate::auth::UserPublic),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.sessions.current_user(user.user_id).await?;

    Ok(Json(profile))
}

/// Admin-only probe
#[utoipa::path(
    get,
    path = "/api/auth/admin/ping",
    tag = "auth",
    responses(
        (status = 200, description = "Caller is an admin", body = StatusResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
        (status = 403, description = "Not an admin", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn admin_ping_handler() -> impl IntoResponse {
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}
