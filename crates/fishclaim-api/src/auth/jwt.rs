//! Access token signing and verification
//!
//! Access tokens are HMAC-signed JWTs carrying the principal id and a snapshot
//! of the principal's role. They are never persisted: validity is the
//! signature, the issuer, the expiry, and the `type` claim.
//!
//! The `type` claim keeps access tokens apart from any other token format the
//! service signs, so a token minted for one purpose cannot be replayed for
//! another.

use fishclaim_core::{AuthConfig, SigningAlgorithm, UserId, UserRole};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Value of the `type` claim on access tokens
pub const ACCESS_TOKEN_TYPE: &str = "access";

/// JWT claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Token issuer
    pub iss: String,
    /// Subject - principal id as a decimal string
    pub sub: String,
    /// Unique token identifier
    pub jti: String,
    /// Token purpose, always "access" for tokens minted here
    #[serde(rename = "type", default)]
    pub token_type: String,
    /// Principal role at issuance time
    pub role: UserRole,
    /// Issued at timestamp (Unix epoch)
    pub iat: u64,
    /// Expiration timestamp (Unix epoch)
    pub exp: u64,
}

impl AccessClaims {
    /// Parse the subject back into a principal id
    pub fn user_id(&self) -> Result<UserId, TokenError> {
        self.sub.parse().map_err(|_| TokenError::InvalidToken)
    }
}

/// Access token errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    Expired,

    #[error("Wrong token type")]
    WrongTokenType,

    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),
}

/// A freshly minted access token
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    /// Lifetime in seconds
    pub expires_in: u64,
}

fn algorithm_for(algorithm: SigningAlgorithm) -> Algorithm {
    match algorithm {
        SigningAlgorithm::HS256 => Algorithm::HS256,
        SigningAlgorithm::HS384 => Algorithm::HS384,
        SigningAlgorithm::HS512 => Algorithm::HS512,
    }
}

/// Signs and verifies access tokens with a server-held symmetric secret
#[derive(Clone)]
pub struct TokenSigner {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_ttl_secs: u64,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.secret_key.as_bytes();
        Self {
            algorithm: algorithm_for(config.algorithm),
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: config.issuer.clone(),
            access_ttl_secs: config.access_ttl_secs(),
        }
    }

    /// Issue an access token for a principal
    ///
    /// `role` is a snapshot: it is not re-checked against the live principal
    /// until the next issuance.
    pub fn issue_access_token(
        &self,
        user_id: UserId,
        role: UserRole,
    ) -> Result<IssuedAccessToken, TokenError> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

        let claims = AccessClaims {
            iss: self.issuer.clone(),
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
            role,
            iat: now,
            exp: now + self.access_ttl_secs,
        };

        let token = self.sign(&claims)?;

        Ok(IssuedAccessToken {
            token,
            expires_in: self.access_ttl_secs,
        })
    }

    pub(crate) fn sign<T: Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        Ok(encode(
            &Header::new(self.algorithm),
            claims,
            &self.encoding_key,
        )?)
    }

    /// Validate an access token and extract its claims
    ///
    /// # Returns
    ///
    /// * `Err(TokenError::Expired)` - `exp` has passed
    /// * `Err(TokenError::InvalidToken)` - bad signature, foreign algorithm,
    ///   wrong issuer, malformed structure, missing `exp`, bad `sub`
    /// * `Err(TokenError::WrongTokenType)` - `type` is not "access"
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        // Expiry is exact; the library default tolerates 60s of skew
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let token_data = decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::InvalidToken,
            })?;

        let claims = token_data.claims;

        if claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(TokenError::WrongTokenType);
        }

        claims.user_id()?;

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn signer() -> TokenSigner {
        TokenSigner::new(&AuthConfig::default())
    }

    fn claims_with(sub: &str, token_type: &str, exp: u64) -> AccessClaims {
        let now = now_secs();
        AccessClaims {
            iss: AuthConfig::default().issuer,
            sub: sub.to_string(),
            jti: Uuid::new_v4().to_string(),
            token_type: token_type.to_string(),
            role: UserRole::User,
            iat: now,
            exp,
        }
    }

    #[test]
    fn test_issue_and_verify_token() {
        let signer = signer();
        let issued = signer
            .issue_access_token(42, UserRole::Reviewer)
            .expect("Failed to issue token");

        assert_eq!(issued.expires_in, 15 * 60);

        let claims = signer
            .verify_access_token(&issued.token)
            .expect("Failed to verify token");

        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.role, UserRole::Reviewer);
        assert_eq!(claims.token_type, "access");
        assert_eq!(claims.iss, "fishclaim-api");
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_tokens_issued_back_to_back_differ() {
        let signer = signer();
        let a = signer.issue_access_token(1, UserRole::User).unwrap();
        let b = signer.issue_access_token(1, UserRole::User).unwrap();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn test_malformed_token() {
        let result = signer().verify_access_token("invalid.token.here");
        assert!(matches!(result, Err(TokenError::InvalidToken)));

        let result = signer().verify_access_token("");
        assert!(matches!(result, Err(TokenError::InvalidToken)));
    }

    #[test]
    fn test_wrong_secret() {
        let signer1 = TokenSigner::new(&AuthConfig {
            secret_key: "first-secret-first-secret-first-secret".to_string(),
            ..Default::default()
        });
        let signer2 = TokenSigner::new(&AuthConfig {
            secret_key: "second-secret-second-secret-second-secret".to_string(),
            ..Default::default()
        });

        let issued = signer1.issue_access_token(7, UserRole::Viewer).unwrap();
        let result = signer2.verify_access_token(&issued.token);
        assert!(matches!(result, Err(TokenError::InvalidToken)));
    }

    #[test]
    fn test_algorithm_is_fixed() {
        let hs512 = TokenSigner::new(&AuthConfig {
            algorithm: SigningAlgorithm::HS512,
            ..Default::default()
        });
        let issued = hs512.issue_access_token(7, UserRole::Viewer).unwrap();

        let result = signer().verify_access_token(&issued.token);
        assert!(matches!(result, Err(TokenError::InvalidToken)));
    }

    #[test]
    fn test_expired_token() {
        let signer = signer();
        let claims = claims_with("3", ACCESS_TOKEN_TYPE, now_secs() - 3600);
        let token = signer.sign(&claims).unwrap();

        let result = signer.verify_access_token(&token);
        assert!(matches!(result, Err(TokenError::Expired)));
    }

    #[test]
    fn test_recently_expired_token() {
        let signer = signer();
        let claims = claims_with("3", ACCESS_TOKEN_TYPE, now_secs() - 5);
        let token = signer.sign(&claims).unwrap();

        let result = signer.verify_access_token(&token);
        assert!(matches!(result, Err(TokenError::Expired)));
    }

    #[test]
    fn test_wrong_token_type() {
        let signer = signer();
        let claims = claims_with("3", "refresh", now_secs() + 3600);
        let token = signer.sign(&claims).unwrap();

        let result = signer.verify_access_token(&token);
        assert!(matches!(result, Err(TokenError::WrongTokenType)));
    }

    #[test]
    fn test_missing_token_type() {
        let signer = signer();
        let now = now_secs();
        let token = signer
            .sign(&serde_json::json!({
                "iss": "fishclaim-api",
                "sub": "3",
                "jti": "x",
                "role": "user",
                "iat": now,
                "exp": now + 600,
            }))
            .unwrap();

        let result = signer.verify_access_token(&token);
        assert!(matches!(result, Err(TokenError::WrongTokenType)));
    }

    #[test]
    fn test_missing_expiry_rejected() {
        let signer = signer();
        let token = signer
            .sign(&serde_json::json!({
                "iss": "fishclaim-api",
                "sub": "3",
                "jti": "x",
                "type": "access",
                "role": "user",
                "iat": now_secs(),
            }))
            .unwrap();

        let result = signer.verify_access_token(&token);
        assert!(matches!(result, Err(TokenError::InvalidToken)));
    }

    #[test]
    fn test_non_numeric_subject_rejected() {
        let signer = signer();
        let claims = claims_with("alice", ACCESS_TOKEN_TYPE, now_secs() + 3600);
        let token = signer.sign(&claims).unwrap();

        let result = signer.verify_access_token(&token);
        assert!(matches!(result, Err(TokenError::InvalidToken)));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let signer = signer();
        let mut claims = claims_with("3", ACCESS_TOKEN_TYPE, now_secs() + 3600);
        claims.iss = "someone-else".to_string();
        let token = signer.sign(&claims).unwrap();

        let result = signer.verify_access_token(&token);
        assert!(matches!(result, Err(TokenError::InvalidToken)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_round_trip_recovers_subject(user_id in 1i64..i64::MAX, role_idx in 0usize..4) {
            let roles = [UserRole::User, UserRole::Viewer, UserRole::Reviewer, UserRole::Admin];
            let signer = signer();
            let issued = signer.issue_access_token(user_id, roles[role_idx]).unwrap();
            let claims = signer.verify_access_token(&issued.token).unwrap();
            prop_assert_eq!(claims.user_id().unwrap(), user_id);
            prop_assert_eq!(claims.role, roles[role_idx]);
        }
    }
}
