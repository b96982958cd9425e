//! Authentication and authorization module
//!
//! This module provides the session lifecycle with the following components:
//! - Access token signing and validation
//! - Opaque refresh tokens stored as SHA-256 digests
//! - Password hashing with Argon2
//! - Session manager for register, login, refresh and logout
//! - Authorization gate and middleware for protected routes

pub mod gate;
pub mod jwt;
pub mod models;
pub mod password;
pub mod refresh;
pub mod session;

pub use gate::{auth_middleware, authenticate, authorize, require_any_role, AuthenticatedUser};
pub use jwt::{AccessClaims, IssuedAccessToken, TokenError, TokenSigner};
pub use models::{NewRefreshToken, NewUser, RefreshToken, User, UserPublic};
pub use password::{hash_password, validate_password_strength, verify_password};
pub use session::{LogoutRequest, RefreshRequest, RegisterRequest, SessionManager, TokenPair};
