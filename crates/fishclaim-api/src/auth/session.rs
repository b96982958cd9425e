//! Session lifecycle: registration, login, refresh token rotation and logout
//!
//! Each refresh token moves through `active -> revoked`, and never back.
//! Rotation revokes the presented token and persists its successor in one
//! store call, so a client never ends up holding a revoked token without a
//! valid replacement.

use super::jwt::TokenSigner;
use super::models::{NewRefreshToken, NewUser, UserPublic};
use super::password::{hash_password, validate_password_strength, verify_password};
use super::refresh::{self, hash_refresh_token};
use crate::audit::{audit_log, AuditEvent, ClientContext};
use crate::error::AppError;
use crate::store::{retry_once, RefreshTokenStore, StoreError, UserStore};
use chrono::{Duration, Utc};
use fishclaim_core::{AuthConfig, HashingConfig, UserId, UserRole};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(
        length(min = 3, max = 254, message = "Invalid email format"),
        contains(pattern = "@", message = "Invalid email format")
    )]
    pub email: String,

    #[validate(
        length(min = 3, max = 50, message = "Username must be 3-50 characters"),
        custom(function = "validate_username_chars")
    )]
    pub username: String,

    pub password: String,

    #[validate(length(max = 100))]
    pub display_name: Option<String>,
}

fn validate_username_chars(username: &str) -> Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        Ok(())
    } else {
        Err(ValidationError::new("username_chars").with_message(
            "Username may only contain letters, digits, '_' and '-'".into(),
        ))
    }
}

/// Token refresh request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Logout request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
    pub logout_all_devices: Option<bool>,
}

/// Access and refresh token pair returned by login and refresh
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

/// Session manager
///
/// Owns the login, refresh and logout flows over the user and refresh token
/// stores.
pub struct SessionManager {
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn RefreshTokenStore>,
    signer: TokenSigner,
    config: AuthConfig,
    /// Verified against when the username is unknown, so both failures cost
    /// one Argon2 run
    dummy_hash: String,
}

impl SessionManager {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn RefreshTokenStore>,
        signer: TokenSigner,
        config: AuthConfig,
    ) -> Self {
        let dummy_hash = hash_password("fishclaim-unknown-user", &config.hashing)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Could not prepare dummy password hash");
                String::new()
            });

        Self {
            users,
            tokens,
            signer,
            config,
            dummy_hash,
        }
    }

    /// Register a new principal with the `user` role
    ///
    /// # Returns
    ///
    /// * `Ok(UserPublic)` - Newly created user
    /// * `Err(AppError::Validation)` - Malformed email, username or weak password
    /// * `Err(AppError::Conflict)` - Email or username already registered
    pub async fn register(
        &self,
        request: RegisterRequest,
        client: &ClientContext,
    ) -> Result<UserPublic, AppError> {
        let result = self.try_register(&request).await;

        match &result {
            Ok(user) => audit_log(&AuditEvent::RegistrationSuccess {
                user_id: user.id,
                username: user.username.clone(),
                role: user.role.to_string(),
                ip_address: client.ip_address.clone(),
            }),
            Err(e) => audit_log(&AuditEvent::RegistrationFailure {
                username: request.username.clone(),
                reason: e.to_string(),
                ip_address: client.ip_address.clone(),
            }),
        }

        result
    }

    async fn try_register(&self, request: &RegisterRequest) -> Result<UserPublic, AppError> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        validate_password_strength(&request.password)
            .map_err(|e| AppError::Validation(format!("Password validation failed: {e}")))?;

        let password_hash =
            hash_blocking(request.password.clone(), self.config.hashing.clone()).await?;

        let display_name = request
            .display_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| request.username.clone());

        let user = self
            .users
            .create(NewUser {
                email: request.email.clone(),
                username: request.username.clone(),
                password_hash,
                display_name,
                role: UserRole::default(),
            })
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(_) => {
                    AppError::Conflict("Email or username already registered".to_string())
                }
                other => other.into(),
            })?;

        Ok(user.to_public())
    }

    /// Exchange a username and password for a token pair
    ///
    /// Unknown usernames and wrong passwords fail identically.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        client: &ClientContext,
    ) -> Result<TokenPair, AppError> {
        let user = self.users.find_by_username(username).await?;

        let stored = match &user {
            Some(user) => user.password_hash.clone(),
            None => self.dummy_hash.clone(),
        };
        let verified = verify_blocking(password.to_string(), stored).await? && user.is_some();

        let user = match user {
            Some(user) if verified => user,
            other => {
                audit_log(&AuditEvent::LoginFailure {
                    username: username.to_string(),
                    reason: if other.is_some() {
                        "invalid password"
                    } else {
                        "unknown user"
                    }
                    .to_string(),
                    ip_address: client.ip_address.clone(),
                    user_agent: client.user_agent.clone(),
                });
                return Err(AppError::InvalidCredentials);
            }
        };

        let pair = self.issue_pair(user.id, user.role).await?;

        audit_log(&AuditEvent::LoginSuccess {
            user_id: user.id,
            username: user.username,
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
        });

        Ok(pair)
    }

    /// Rotate a refresh token and issue a fresh access token
    ///
    /// The access token carries the principal's current role, so role changes
    /// take effect here. Presenting a token that was already rotated fails,
    /// and with `revoke_chain_on_reuse` also revokes every token issued from it.
    pub async fn refresh(&self, raw: &str, client: &ClientContext) -> Result<TokenPair, AppError> {
        let token_hash = hash_refresh_token(raw);

        let record = self
            .tokens
            .lookup(&token_hash)
            .await?
            .ok_or(AppError::InvalidRefreshToken)?;

        if record.revoked {
            if record.replaced_by_token_hash.is_some() && self.config.revoke_chain_on_reuse {
                let revoked_descendants = self.tokens.revoke_chain(&token_hash).await?;
                audit_log(&AuditEvent::RefreshTokenReuse {
                    user_id: record.user_id,
                    revoked_descendants,
                    ip_address: client.ip_address.clone(),
                    user_agent: client.user_agent.clone(),
                });
            }
            return Err(AppError::InvalidRefreshToken);
        }

        if record.is_expired() {
            return Err(AppError::InvalidRefreshToken);
        }

        let user = self
            .users
            .find_by_id(record.user_id)
            .await?
            .ok_or(AppError::InvalidRefreshToken)?;

        let next = refresh::generate();
        let replacement = NewRefreshToken {
            user_id: user.id,
            token_hash: next.hash,
            expires_at: self.refresh_expiry(),
        };

        retry_once("refresh_token_rotation", || {
            self.tokens.rotate(&token_hash, replacement.clone())
        })
        .await
        .map_err(|e| match e {
            StoreError::Stale => AppError::InvalidRefreshToken,
            other => other.into(),
        })?;

        let access = self.signer.issue_access_token(user.id, user.role)?;

        audit_log(&AuditEvent::TokenRefresh {
            user_id: user.id,
            ip_address: client.ip_address.clone(),
        });

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: next.raw,
            token_type: "bearer".to_string(),
            expires_in: access.expires_in,
        })
    }

    /// Revoke the caller's refresh token and optionally all of their sessions
    ///
    /// Idempotent: unknown, foreign or already revoked tokens are ignored.
    /// Returns how many tokens this call revoked.
    pub async fn logout(
        &self,
        user_id: UserId,
        refresh_token: Option<&str>,
        all_devices: bool,
        client: &ClientContext,
    ) -> Result<u64, AppError> {
        let mut revoked_tokens = 0;

        if let Some(raw) = refresh_token {
            let token_hash = hash_refresh_token(raw);
            let owned = self
                .tokens
                .lookup(&token_hash)
                .await?
                .is_some_and(|token| token.user_id == user_id);

            if owned && self.tokens.mark_revoked(&token_hash, None).await? {
                revoked_tokens += 1;
            }
        }

        if all_devices {
            revoked_tokens += self.tokens.revoke_all_for_user(user_id).await?;
        }

        audit_log(&AuditEvent::Logout {
            user_id,
            logout_all_devices: all_devices,
            revoked_tokens,
            ip_address: client.ip_address.clone(),
        });

        Ok(revoked_tokens)
    }

    /// Public profile of an authenticated principal
    pub async fn current_user(&self, user_id: UserId) -> Result<UserPublic, AppError> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(|user| user.to_public())
            .ok_or(AppError::Unauthorized)
    }

    async fn issue_pair(&self, user_id: UserId, role: UserRole) -> Result<TokenPair, AppError> {
        let access = self.signer.issue_access_token(user_id, role)?;

        let refresh = refresh::generate();
        self.tokens
            .persist(NewRefreshToken {
                user_id,
                token_hash: refresh.hash,
                expires_at: self.refresh_expiry(),
            })
            .await?;

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.raw,
            token_type: "bearer".to_string(),
            expires_in: access.expires_in,
        })
    }

    fn refresh_expiry(&self) -> chrono::DateTime<Utc> {
        Utc::now() + Duration::days(self.config.refresh_token_expire_days)
    }
}

// Argon2 is deliberately slow; keep it off the async workers.

async fn hash_blocking(password: String, config: HashingConfig) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password, &config))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {e}")))?
        .map_err(AppError::from)
}

async fn verify_blocking(password: String, stored: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| AppError::Internal(format!("Verification task failed: {e}")))
}
