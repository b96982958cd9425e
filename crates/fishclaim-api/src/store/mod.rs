//! Persistence seam
//!
//! The auth core and the claim ledger only talk to storage through the traits
//! in this module. Every mutation that must be atomic (rotation, supersession,
//! review) is a single trait call so each adapter can wrap it in whatever
//! unit of atomicity it has: one write guard for [`MemoryStore`], one
//! transaction for [`PgStore`].

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::auth::models::{NewRefreshToken, NewUser, RefreshToken, User};
use crate::claims::models::{Catch, Claim, ClaimOutcome, NewCatch, NewClaim, ReviewUpdate};
use async_trait::async_trait;
use fishclaim_core::{ClaimId, SpeciesId, UserId, UserRole, ZoneId};
use std::future::Future;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// A compare-and-swap precondition no longer holds
    #[error("Record changed concurrently")]
    Stale,

    /// Serialization or lock conflict; the operation may succeed if retried
    #[error("Transient storage conflict: {0}")]
    Transient(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user; `Duplicate` when email or username is taken
    async fn create(&self, user: NewUser) -> StoreResult<User>;

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Change a principal's role; `NotFound` for an unknown id
    async fn set_role(&self, id: UserId, role: UserRole) -> StoreResult<User>;

    /// Round trip to the backing storage, used by the readiness probe
    async fn ping(&self) -> StoreResult<()>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn persist(&self, token: NewRefreshToken) -> StoreResult<RefreshToken>;

    async fn lookup(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>>;

    /// Revoke a token if it is not revoked yet
    ///
    /// Returns `true` only for the call that performed the transition.
    async fn mark_revoked(&self, token_hash: &str, replaced_by: Option<&str>)
        -> StoreResult<bool>;

    /// Revoke `old_hash` and persist `replacement` as one atomic unit
    ///
    /// Fails with `Stale` when the old token is missing, revoked or expired,
    /// in which case nothing is written.
    async fn rotate(&self, old_hash: &str, replacement: NewRefreshToken)
        -> StoreResult<RefreshToken>;

    /// Revoke every active token of a principal, returning how many changed
    async fn revoke_all_for_user(&self, user_id: UserId) -> StoreResult<u64>;

    /// Revoke every still-active descendant reachable from `token_hash`
    /// through `replaced_by_token_hash` links
    async fn revoke_chain(&self, token_hash: &str) -> StoreResult<u64>;
}

#[async_trait]
pub trait CatchStore: Send + Sync {
    async fn insert(&self, user_id: UserId, catch: NewCatch) -> StoreResult<Catch>;
}

#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// Replace the active claim for the candidate's pair if the candidate is
    /// strictly longer, retiring the incumbent in the same atomic unit
    async fn supersede_if_longer(&self, candidate: NewClaim) -> StoreResult<ClaimOutcome>;

    async fn find(&self, id: ClaimId) -> StoreResult<Option<Claim>>;

    async fn active_for(&self, zone_id: ZoneId, species_id: SpeciesId)
        -> StoreResult<Option<Claim>>;

    /// Apply a review decision
    ///
    /// `NotFound` for an unknown claim; `Duplicate` when approving would leave
    /// two active claims for the same pair.
    async fn update_review(&self, id: ClaimId, update: ReviewUpdate) -> StoreResult<Claim>;

    /// All claims for a zone, newest first
    async fn list_for_zone(&self, zone_id: ZoneId) -> StoreResult<Vec<Claim>>;
}

/// Run a storage operation, retrying exactly once on a transient conflict
pub async fn retry_once<T, F, Fut>(operation: &str, mut op: F) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    match op().await {
        Err(StoreError::Transient(reason)) => {
            tracing::warn!(operation, %reason, "Transient storage conflict, retrying once");
            op().await
        }
        other => other,
    }
}
