//! FishClaim Core - Domain enums, identifiers, and shared configuration
//!
//! This crate defines the pieces shared by every FishClaim component:
//! - Principal roles and claim review statuses (closed enumerations)
//! - Numeric identifiers for the arena-style persistence model
//! - Common error type
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, HashingConfig, LoggingConfig,
    ServerConfig, SigningAlgorithm,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Identifiers
// ============================================================================

/// Principal (user) identifier
pub type UserId = i64;
/// Water body identifier
pub type WaterId = i64;
/// Zone identifier (a stretch of a water body)
pub type ZoneId = i64;
/// Species identifier
pub type SpeciesId = i64;
/// Catch identifier
pub type CatchId = i64;
/// Claim identifier
pub type ClaimId = i64;
/// Refresh token record identifier
pub type RefreshTokenId = i64;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for FishClaim domain parsing
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Invalid claim status: {0}")]
    InvalidClaimStatus(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================================================
// Roles
// ============================================================================

/// Principal role
///
/// - `User`: a registered angler (default at registration)
/// - `Viewer`: read-only access
/// - `Reviewer`: may review claims
/// - `Admin`: full access
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Viewer,
    Reviewer,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Viewer => "viewer",
            UserRole::Reviewer => "reviewer",
            UserRole::Admin => "admin",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(UserRole::User),
            "viewer" => Ok(UserRole::Viewer),
            "reviewer" => Ok(UserRole::Reviewer),
            "admin" => Ok(UserRole::Admin),
            other => Err(CoreError::InvalidRole(other.to_string())),
        }
    }
}

// ============================================================================
// Claim review status
// ============================================================================

/// Human review outcome of a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    Approved,
    Rejected,
    Pending,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Approved => "approved",
            ClaimStatus::Rejected => "rejected",
            ClaimStatus::Pending => "pending",
        }
    }

    /// Whether a claim in this status counts as the live record for its pair
    pub fn is_approved(&self) -> bool {
        matches!(self, ClaimStatus::Approved)
    }
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClaimStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "approved" => Ok(ClaimStatus::Approved),
            "rejected" => Ok(ClaimStatus::Rejected),
            "pending" => Ok(ClaimStatus::Pending),
            other => Err(CoreError::InvalidClaimStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_conversion() {
        assert_eq!(UserRole::Admin.as_str(), "admin");
        assert_eq!(UserRole::Reviewer.as_str(), "reviewer");
        assert_eq!("viewer".parse::<UserRole>().unwrap(), UserRole::Viewer);
        assert_eq!("user".parse::<UserRole>().unwrap(), UserRole::User);
        assert!("ADMIN".parse::<UserRole>().is_err());
        assert!("superuser".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_default_role_is_user() {
        assert_eq!(UserRole::default(), UserRole::User);
    }

    #[test]
    fn test_claim_status_parse() {
        assert_eq!(
            "rejected".parse::<ClaimStatus>().unwrap(),
            ClaimStatus::Rejected
        );
        assert!(matches!(
            "archived".parse::<ClaimStatus>(),
            Err(CoreError::InvalidClaimStatus(_))
        ));
        assert!(ClaimStatus::Approved.is_approved());
        assert!(!ClaimStatus::Pending.is_approved());
    }

    #[test]
    fn test_enums_serialize_lowercase() {
        let json = serde_json::to_string(&UserRole::Reviewer).unwrap();
        assert_eq!(json, "\"reviewer\"");

        let status: ClaimStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(status, ClaimStatus::Pending);
        assert!(serde_json::from_str::<ClaimStatus>("\"unknown\"").is_err());
    }
}
