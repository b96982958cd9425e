//! Data models for principals and refresh tokens
//!
//! - User: account credentials and role
//! - RefreshToken: persisted digest of a long-lived session secret
//!
//! Records reference each other by numeric id only.

use chrono::{DateTime, Utc};
use fishclaim_core::{RefreshTokenId, UserId, UserRole};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User account model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    /// Email address (unique)
    pub email: String,

    /// Login name (unique)
    pub username: String,

    /// PHC-encoded password hash
    /// This field is never serialized in API responses
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub display_name: String,

    pub role: UserRole,

    pub created_at: DateTime<Utc>,
}

impl User {
    /// Convert user to public representation (without sensitive fields)
    pub fn to_public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }
}

/// Public user representation (safe for API responses)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserPublic {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub display_name: String,
    #[schema(value_type = String, example = "user")]
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// A user about to be created
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub display_name: String,
    pub role: UserRole,
}

/// Refresh token record
///
/// `revoked` only ever moves from `false` to `true`. When a token is rotated,
/// `replaced_by_token_hash` points at its successor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub id: RefreshTokenId,
    pub user_id: UserId,
    /// Hex SHA-256 digest of the raw token
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub replaced_by_token_hash: Option<String>,
}

impl RefreshToken {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Not revoked and not expired
    pub fn is_active(&self) -> bool {
        !self.revoked && !self.is_expired()
    }
}

/// A refresh token about to be persisted
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub user_id: UserId,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(expires_at: DateTime<Utc>) -> RefreshToken {
        RefreshToken {
            id: 1,
            user_id: 1,
            token_hash: "hash".to_string(),
            expires_at,
            created_at: Utc::now(),
            revoked: false,
            revoked_at: None,
            replaced_by_token_hash: None,
        }
    }

    #[test]
    fn test_refresh_token_validation() {
        let now = Utc::now();
        let mut token = token(now + Duration::days(7));

        assert!(token.is_active());
        assert!(!token.is_expired());

        token.expires_at = now - Duration::days(1);
        assert!(!token.is_active());
        assert!(token.is_expired());

        token.expires_at = now + Duration::days(7);
        token.revoked = true;
        token.revoked_at = Some(now);
        assert!(!token.is_active());
    }

    #[test]
    fn test_user_to_public() {
        let user = User {
            id: 9,
            email: "alice@example.com".to_string(),
            username: "alice".to_string(),
            password_hash: "secret_hash".to_string(),
            display_name: "Alice".to_string(),
            role: UserRole::Reviewer,
            created_at: Utc::now(),
        };

        let public = user.to_public();
        assert_eq!(public.id, 9);
        assert_eq!(public.username, "alice");
        assert_eq!(public.role, UserRole::Reviewer);

        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("secret_hash"));

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
    }
}
