//! Security audit logging for authentication and claim events
//!
//! All audit events are logged with the "audit" target, making them easy to
//! filter and route to security monitoring systems. Refresh token reuse is
//! logged at WARN, everything else at INFO.
//!
//! # Example
//!
//! ```ignore
//! use fishclaim_api::audit::{audit_log, AuditEvent, ClientContext};
//!
//! let client = ClientContext::from_headers(request.headers());
//! audit_log(&AuditEvent::LoginSuccess {
//!     user_id: user.id,
//!     username: user.username.clone(),
//!     ip_address: client.ip_address.clone(),
//!     user_agent: client.user_agent.clone(),
//! });
//! ```
//!
//! Author: hephaex@gmail.com

use chrono::{DateTime, Utc};
use fishclaim_core::{ClaimId, ClaimStatus, SpeciesId, UserId, ZoneId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Security audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Successful user login
    LoginSuccess {
        user_id: UserId,
        username: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed login attempt
    ///
    /// `reason` is for operators only; the client always sees the same
    /// response.
    LoginFailure {
        username: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Successful user registration
    RegistrationSuccess {
        user_id: UserId,
        username: String,
        role: String,
        ip_address: Option<String>,
    },

    /// Failed registration attempt
    RegistrationFailure {
        username: String,
        reason: String,
        ip_address: Option<String>,
    },

    /// Refresh token rotated
    TokenRefresh {
        user_id: UserId,
        ip_address: Option<String>,
    },

    /// A refresh token that was already rotated was presented again
    RefreshTokenReuse {
        user_id: UserId,
        revoked_descendants: u64,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// User logout
    Logout {
        user_id: UserId,
        logout_all_devices: bool,
        revoked_tokens: u64,
        ip_address: Option<String>,
    },

    /// Access denied due to insufficient role
    AccessDenied {
        user_id: UserId,
        role: String,
        resource: String,
        required_roles: Vec<String>,
        ip_address: Option<String>,
    },

    /// Invalid, expired or wrong-type bearer token
    InvalidToken {
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// A catch took the record for its (zone, species) pair
    ClaimSuperseded {
        claim_id: ClaimId,
        superseded: Option<ClaimId>,
        user_id: UserId,
        zone_id: ZoneId,
        species_id: SpeciesId,
        length_cm: f64,
    },

    /// A reviewer changed a claim's status
    ClaimReviewed {
        claim_id: ClaimId,
        reviewer_id: UserId,
        status: ClaimStatus,
        is_active: bool,
    },
}

impl AuditEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            AuditEvent::LoginSuccess { .. } => "login_success",
            AuditEvent::LoginFailure { .. } => "login_failure",
            AuditEvent::RegistrationSuccess { .. } => "registration_success",
            AuditEvent::RegistrationFailure { .. } => "registration_failure",
            AuditEvent::TokenRefresh { .. } => "token_refresh",
            AuditEvent::RefreshTokenReuse { .. } => "refresh_token_reuse",
            AuditEvent::Logout { .. } => "logout",
            AuditEvent::AccessDenied { .. } => "access_denied",
            AuditEvent::InvalidToken { .. } => "invalid_token",
            AuditEvent::ClaimSuperseded { .. } => "claim_superseded",
            AuditEvent::ClaimReviewed { .. } => "claim_reviewed",
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::RegistrationSuccess { .. } => "Registration successful",
            AuditEvent::RegistrationFailure { .. } => "Registration failed",
            AuditEvent::TokenRefresh { .. } => "Token refresh",
            AuditEvent::RefreshTokenReuse { .. } => "Refresh token reuse detected",
            AuditEvent::Logout { .. } => "User logout",
            AuditEvent::AccessDenied { .. } => "Access denied",
            AuditEvent::InvalidToken { .. } => "Invalid token",
            AuditEvent::ClaimSuperseded { .. } => "Claim superseded",
            AuditEvent::ClaimReviewed { .. } => "Claim reviewed",
        }
    }
}

/// Client metadata attached to audit events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientContext {
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        Self {
            ip_address: extract_ip_address(headers),
            user_agent: extract_user_agent(headers),
        }
    }
}

/// Log a security audit event with structured fields
///
/// The full event is also attached as JSON for log aggregators:
///
/// ```json
/// {
///   "event_type": "refresh_token_reuse",
///   "user_id": 42,
///   "revoked_descendants": 1,
///   "ip_address": "192.168.1.1",
///   "user_agent": null
/// }
/// ```
pub fn audit_log(event: &AuditEvent) {
    let timestamp: DateTime<Utc> = Utc::now();

    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::RefreshTokenReuse {
            user_id,
            revoked_descendants,
            ip_address,
            ..
        } => {
            warn!(
                target: "audit",
                timestamp = %timestamp,
                event_type = event.event_type(),
                event = %event_json,
                user_id = %user_id,
                revoked_descendants = %revoked_descendants,
                ip_address = ?ip_address,
                "{}",
                event.summary()
            );
        }
        AuditEvent::LoginFailure {
            username,
            reason,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event_type = event.event_type(),
                event = %event_json,
                username = %username,
                reason = %reason,
                ip_address = ?ip_address,
                "{}",
                event.summary()
            );
        }
        AuditEvent::AccessDenied {
            user_id,
            resource,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event_type = event.event_type(),
                event = %event_json,
                user_id = %user_id,
                resource = %resource,
                ip_address = ?ip_address,
                "{}",
                event.summary()
            );
        }
        _ => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event_type = event.event_type(),
                event = %event_json,
                "{}",
                event.summary()
            );
        }
    }
}

/// Extract IP address from request headers
///
/// Checks X-Forwarded-For, then X-Real-IP.
pub fn extract_ip_address(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            // First hop is the client
            if let Some(first_ip) = xff_str.split(',').next() {
                return Some(first_ip.trim().to_string());
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|ip| ip.to_str().ok())
        .map(|s| s.to_string())
}

/// Extract user agent from request headers
pub fn extract_user_agent(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}
