/// Authorization gate for protected routes
///
/// `authenticate` turns a bearer token into a live principal and `authorize`
/// checks the principal's role against an allowed set. The two axum
/// middlewares below wire them into the router: `auth_middleware` puts an
/// [`AuthenticatedUser`] into request extensions and `require_any_role`
/// reads it back.
///
/// Roles are taken from the access token, so a role change applies from the
/// next token issuance (login or refresh), not mid-token.
use super::jwt::TokenSigner;
use crate::audit::{audit_log, AuditEvent, ClientContext};
use crate::error::AppError;
use crate::state::AppState;
use crate::store::UserStore;
use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use fishclaim_core::{UserId, UserRole};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Authenticated principal extracted from a bearer token
///
/// Added to request extensions by [`auth_middleware`]; handlers take it with
/// `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub username: String,
    /// Role snapshot from the access token
    pub role: UserRole,
    /// Access token id
    pub jti: String,
}

impl AuthenticatedUser {
    pub fn has_any_role(&self, roles: &[UserRole]) -> bool {
        roles.contains(&self.role)
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolve a bearer token to a live principal
///
/// # Returns
///
/// * `Err(AppError::InvalidToken | Expired | WrongTokenType)` - token rejected
/// * `Err(AppError::Unauthorized)` - subject no longer exists
///
/// All of these render as the same 401 response.
pub async fn authenticate(
    signer: &TokenSigner,
    users: &dyn UserStore,
    token: &str,
) -> Result<AuthenticatedUser, AppError> {
    let claims = signer.verify_access_token(token)?;
    let user_id = claims.user_id()?;

    let user = users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(AuthenticatedUser {
        user_id: user.id,
        username: user.username,
        role: claims.role,
        jti: claims.jti,
    })
}

/// Check a principal's role against an allowed set
///
/// An empty set admits any authenticated principal.
pub fn authorize(user: &AuthenticatedUser, allowed: &[UserRole]) -> Result<(), AppError> {
    if allowed.is_empty() || user.has_any_role(allowed) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not enough permissions".to_string()))
    }
}

/// Authentication middleware that requires a valid access token
///
/// # Usage
///
/// ```ignore
/// use axum::{middleware, routing::get, Router};
/// use fishclaim_api::auth::gate::auth_middleware;
///
/// let app = Router::new()
///     .route("/protected", get(protected_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string);

    let Some(token) = token else {
        return Err(AppError::Unauthorized);
    };

    let user = match authenticate(&state.signer, state.users.as_ref(), &token).await {
        Ok(user) => user,
        Err(e) => {
            if e.is_auth_failure() {
                let client = ClientContext::from_headers(request.headers());
                audit_log(&AuditEvent::InvalidToken {
                    reason: e.to_string(),
                    ip_address: client.ip_address,
                    user_agent: client.user_agent,
                });
            }
            return Err(e);
        }
    };

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Type alias for role middleware future
type RoleMiddlewareFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AppError>> + Send>>;

/// Middleware factory for role-based access control
///
/// Must run after [`auth_middleware`].
///
/// # Example
///
/// ```ignore
/// use axum::{middleware, routing::get, Router};
/// use fishclaim_api::auth::gate::{auth_middleware, require_any_role};
/// use fishclaim_core::UserRole;
///
/// let app = Router::new()
///     .route("/admin/ping", get(admin_ping))
///     .route_layer(middleware::from_fn(require_any_role(&[UserRole::Admin])))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub fn require_any_role(
    allowed: &'static [UserRole],
) -> impl Fn(Request<Body>, Next) -> RoleMiddlewareFuture + Clone {
    move |request: Request<Body>, next: Next| {
        Box::pin(async move {
            let user = request
                .extensions()
                .get::<AuthenticatedUser>()
                .cloned()
                .ok_or(AppError::Unauthorized)?;

            if let Err(e) = authorize(&user, allowed) {
                let client = ClientContext::from_headers(request.headers());
                audit_log(&AuditEvent::AccessDenied {
                    user_id: user.user_id,
                    role: user.role.to_string(),
                    resource: request.uri().path().to_string(),
                    required_roles: allowed.iter().map(|r| r.to_string()).collect(),
                    ip_address: client.ip_address,
                });
                return Err(e);
            }

            Ok(next.run(request).await)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::NewUser;
    use crate::store::MemoryStore;
    use fishclaim_core::AuthConfig;

    fn principal(role: UserRole) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: 1,
            username: "alice".to_string(),
            role,
            jti: "jti".to_string(),
        }
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }

    #[test]
    fn test_authorize_empty_set_admits_anyone() {
        for role in [
            UserRole::User,
            UserRole::Viewer,
            UserRole::Reviewer,
            UserRole::Admin,
        ] {
            assert!(authorize(&principal(role), &[]).is_ok());
        }
    }

    #[test]
    fn test_authorize_membership() {
        let reviewers = [UserRole::Reviewer, UserRole::Admin];

        assert!(authorize(&principal(UserRole::Reviewer), &reviewers).is_ok());
        assert!(authorize(&principal(UserRole::Admin), &reviewers).is_ok());
        assert!(matches!(
            authorize(&principal(UserRole::Viewer), &reviewers),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            authorize(&principal(UserRole::User), &[UserRole::Admin]),
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_resolves_live_principal() {
        let store = MemoryStore::new();
        let signer = TokenSigner::new(&AuthConfig::default());
        let user = store
            .create(NewUser {
                email: "alice@example.com".to_string(),
                username: "alice".to_string(),
                password_hash: "hash".to_string(),
                display_name: "alice".to_string(),
                role: UserRole::Viewer,
            })
            .await
            .unwrap();

        let issued = signer.issue_access_token(user.id, user.role).unwrap();
        let principal = authenticate(&signer, &store, &issued.token).await.unwrap();
        assert_eq!(principal.user_id, user.id);
        assert_eq!(principal.username, "alice");
        assert_eq!(principal.role, UserRole::Viewer);
    }

    #[tokio::test]
    async fn test_authenticate_rejects_missing_principal() {
        let store = MemoryStore::new();
        let signer = TokenSigner::new(&AuthConfig::default());
        let issued = signer.issue_access_token(77, UserRole::Admin).unwrap();

        assert!(matches!(
            authenticate(&signer, &store, &issued.token).await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            authenticate(&signer, &store, "garbage").await,
            Err(AppError::InvalidToken)
        ));
    }
}
