//! In-memory storage adapter
//!
//! All tables live behind a single `RwLock`; every trait method takes the lock
//! once, so each call is atomic with respect to every other call.

use super::{CatchStore, ClaimStore, RefreshTokenStore, StoreError, StoreResult, UserStore};
use crate::auth::models::{NewRefreshToken, NewUser, RefreshToken, User};
use crate::claims::models::{Catch, Claim, ClaimOutcome, NewCatch, NewClaim, ReviewUpdate};
use async_trait::async_trait;
use chrono::Utc;
use fishclaim_core::{
    CatchId, ClaimId, ClaimStatus, RefreshTokenId, SpeciesId, UserId, UserRole, ZoneId,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    refresh_tokens: HashMap<RefreshTokenId, RefreshToken>,
    token_by_hash: HashMap<String, RefreshTokenId>,
    catches: HashMap<CatchId, Catch>,
    claims: HashMap<ClaimId, Claim>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn token_mut(&mut self, token_hash: &str) -> Option<&mut RefreshToken> {
        let id = self.token_by_hash.get(token_hash)?;
        self.refresh_tokens.get_mut(id)
    }

    fn insert_token(&mut self, token: NewRefreshToken) -> StoreResult<RefreshToken> {
        if self.token_by_hash.contains_key(&token.token_hash) {
            return Err(StoreError::Duplicate("refresh token hash".to_string()));
        }

        let id = self.next_id();
        let record = RefreshToken {
            id,
            user_id: token.user_id,
            token_hash: token.token_hash,
            expires_at: token.expires_at,
            created_at: Utc::now(),
            revoked: false,
            revoked_at: None,
            replaced_by_token_hash: None,
        };

        self.token_by_hash.insert(record.token_hash.clone(), id);
        self.refresh_tokens.insert(id, record.clone());
        Ok(record)
    }

    fn active_claim_id(&self, zone_id: ZoneId, species_id: SpeciesId) -> Option<ClaimId> {
        self.claims
            .values()
            .find(|c| c.is_active && c.zone_id == zone_id && c.species_id == species_id)
            .map(|c| c.id)
    }
}

/// Storage adapter keeping every table in process memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email".to_string()));
        }
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate("username".to_string()));
        }

        let id = tables.next_id();
        let record = User {
            id,
            email: user.email,
            username: user.username,
            password_hash: user.password_hash,
            display_name: user.display_name,
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.insert(id, record.clone());
        Ok(record)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn set_role(&self, id: UserId, role: UserRole) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.role = role;
        Ok(user.clone())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryStore {
    async fn persist(&self, token: NewRefreshToken) -> StoreResult<RefreshToken> {
        self.tables.write().await.insert_token(token)
    }

    async fn lookup(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>> {
        let tables = self.tables.read().await;
        Ok(tables
            .token_by_hash
            .get(token_hash)
            .and_then(|id| tables.refresh_tokens.get(id))
            .cloned())
    }

    async fn mark_revoked(
        &self,
        token_hash: &str,
        replaced_by: Option<&str>,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let Some(token) = tables.token_mut(token_hash) else {
            return Ok(false);
        };
        if token.revoked {
            return Ok(false);
        }

        token.revoked = true;
        token.revoked_at = Some(Utc::now());
        token.replaced_by_token_hash = replaced_by.map(str::to_string);
        Ok(true)
    }

    async fn rotate(
        &self,
        old_hash: &str,
        replacement: NewRefreshToken,
    ) -> StoreResult<RefreshToken> {
        let mut tables = self.tables.write().await;

        match tables.token_mut(old_hash) {
            Some(old) if old.is_active() => {}
            _ => return Err(StoreError::Stale),
        }

        let new_hash = replacement.token_hash.clone();
        let created = tables.insert_token(replacement)?;

        if let Some(old) = tables.token_mut(old_hash) {
            old.revoked = true;
            old.revoked_at = Some(Utc::now());
            old.replaced_by_token_hash = Some(new_hash);
        }

        Ok(created)
    }

    async fn revoke_all_for_user(&self, user_id: UserId) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let mut revoked = 0;

        for token in tables
            .refresh_tokens
            .values_mut()
            .filter(|t| t.user_id == user_id && !t.revoked)
        {
            token.revoked = true;
            token.revoked_at = Some(now);
            revoked += 1;
        }

        Ok(revoked)
    }

    async fn revoke_chain(&self, token_hash: &str) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let mut visited = HashSet::new();
        let mut next = Some(token_hash.to_string());
        let mut revoked = 0;

        while let Some(hash) = next.take() {
            if !visited.insert(hash.clone()) {
                break;
            }
            let Some(token) = tables.token_mut(&hash) else {
                break;
            };
            if !token.revoked {
                token.revoked = true;
                token.revoked_at = Some(now);
                revoked += 1;
            }
            next = token.replaced_by_token_hash.clone();
        }

        Ok(revoked)
    }
}

#[async_trait]
impl CatchStore for MemoryStore {
    async fn insert(&self, user_id: UserId, catch: NewCatch) -> StoreResult<Catch> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let now = Utc::now();

        let record = Catch {
            id,
            user_id,
            water_id: catch.water_id,
            zone_id: catch.zone_id,
            species_id: catch.species_id,
            length_cm: catch.length_cm,
            weight_kg: catch.weight_kg,
            method: catch.method,
            notes: catch.notes,
            caught_at: catch.caught_at.unwrap_or(now),
            created_at: now,
        };
        tables.catches.insert(id, record.clone());
        Ok(record)
    }
}

#[async_trait]
impl ClaimStore for MemoryStore {
    async fn supersede_if_longer(&self, candidate: NewClaim) -> StoreResult<ClaimOutcome> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        let incumbent_id = tables.active_claim_id(candidate.zone_id, candidate.species_id);
        let incumbent = incumbent_id.and_then(|id| tables.claims.get(&id));

        if !candidate.displaces(incumbent) {
            if let Some(id) = incumbent_id {
                return Ok(ClaimOutcome::Kept { incumbent: id });
            }
        }

        if let Some(old) = incumbent_id.and_then(|id| tables.claims.get_mut(&id)) {
            old.is_active = false;
            old.revoked_at = Some(now);
        }

        let id = tables.next_id();
        let claim = Claim {
            id,
            user_id: candidate.user_id,
            water_id: candidate.water_id,
            zone_id: candidate.zone_id,
            species_id: candidate.species_id,
            catch_id: candidate.catch_id,
            length_cm: candidate.length_cm,
            is_active: true,
            status: ClaimStatus::Approved,
            created_at: now,
            revoked_at: None,
            reviewed_by_user_id: None,
            reviewed_at: None,
            review_notes: None,
        };
        tables.claims.insert(id, claim.clone());

        Ok(ClaimOutcome::Created {
            claim,
            superseded: incumbent_id,
        })
    }

    async fn find(&self, id: ClaimId) -> StoreResult<Option<Claim>> {
        Ok(self.tables.read().await.claims.get(&id).cloned())
    }

    async fn active_for(
        &self,
        zone_id: ZoneId,
        species_id: SpeciesId,
    ) -> StoreResult<Option<Claim>> {
        let tables = self.tables.read().await;
        Ok(tables
            .active_claim_id(zone_id, species_id)
            .and_then(|id| tables.claims.get(&id))
            .cloned())
    }

    async fn update_review(&self, id: ClaimId, update: ReviewUpdate) -> StoreResult<Claim> {
        let mut tables = self.tables.write().await;

        let (zone_id, species_id) = {
            let claim = tables.claims.get(&id).ok_or(StoreError::NotFound)?;
            (claim.zone_id, claim.species_id)
        };

        if update.status.is_approved() {
            if let Some(other) = tables.active_claim_id(zone_id, species_id) {
                if other != id {
                    return Err(StoreError::Duplicate(format!(
                        "claim {other} is already active for zone {zone_id}, species {species_id}"
                    )));
                }
            }
        }

        let claim = tables.claims.get_mut(&id).ok_or(StoreError::NotFound)?;
        update.apply_to(claim);
        Ok(claim.clone())
    }

    async fn list_for_zone(&self, zone_id: ZoneId) -> StoreResult<Vec<Claim>> {
        let tables = self.tables.read().await;
        let mut claims: Vec<Claim> = tables
            .claims
            .values()
            .filter(|c| c.zone_id == zone_id)
            .cloned()
            .collect();
        claims.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(claims)
    }
}
