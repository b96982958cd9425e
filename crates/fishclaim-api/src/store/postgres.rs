//! PostgreSQL storage adapter
//!
//! Atomic operations run inside a single transaction and lock the rows they
//! read with `SELECT ... FOR UPDATE`. The partial unique index on
//! `claims (zone_id, species_id) WHERE is_active` catches the one race row
//! locks cannot: two first claims for an empty pair.

use super::{CatchStore, ClaimStore, RefreshTokenStore, StoreError, StoreResult, UserStore};
use crate::auth::models::{NewRefreshToken, NewUser, RefreshToken, User};
use crate::claims::models::{Catch, Claim, ClaimOutcome, NewCatch, NewClaim, ReviewUpdate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fishclaim_core::{ClaimId, DatabaseConfig, SpeciesId, UserId, UserRole, ZoneId};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        display_name TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'user',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS refresh_tokens (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL REFERENCES users(id),
        token_hash TEXT NOT NULL UNIQUE,
        expires_at TIMESTAMPTZ NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        revoked BOOLEAN NOT NULL DEFAULT FALSE,
        revoked_at TIMESTAMPTZ,
        replaced_by_token_hash TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS refresh_tokens_user_idx ON refresh_tokens (user_id)",
    r#"
    CREATE TABLE IF NOT EXISTS catches (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL REFERENCES users(id),
        water_id BIGINT NOT NULL,
        zone_id BIGINT NOT NULL,
        species_id BIGINT NOT NULL,
        length_cm DOUBLE PRECISION NOT NULL,
        weight_kg DOUBLE PRECISION,
        method TEXT,
        notes TEXT,
        caught_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS claims (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL REFERENCES users(id),
        water_id BIGINT NOT NULL,
        zone_id BIGINT NOT NULL,
        species_id BIGINT NOT NULL,
        catch_id BIGINT NOT NULL REFERENCES catches(id),
        length_cm DOUBLE PRECISION NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        status TEXT NOT NULL DEFAULT 'approved',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        revoked_at TIMESTAMPTZ,
        reviewed_by_user_id BIGINT REFERENCES users(id),
        reviewed_at TIMESTAMPTZ,
        review_notes TEXT
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS claims_one_active_per_pair
        ON claims (zone_id, species_id) WHERE is_active
    "#,
    "CREATE INDEX IF NOT EXISTS claims_zone_idx ON claims (zone_id, created_at DESC)",
];

const USER_COLUMNS: &str = "id, email, username, password_hash, display_name, role, created_at";
const TOKEN_COLUMNS: &str =
    "id, user_id, token_hash, expires_at, created_at, revoked, revoked_at, replaced_by_token_hash";
const CATCH_COLUMNS: &str = "id, user_id, water_id, zone_id, species_id, length_cm, weight_kg, \
     method, notes, caught_at, created_at";
const CLAIM_COLUMNS: &str = "id, user_id, water_id, zone_id, species_id, catch_id, length_cm, \
     is_active, status, created_at, revoked_at, reviewed_by_user_id, reviewed_at, review_notes";

// SQLSTATE codes
const UNIQUE_VIOLATION: &str = "23505";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

fn map_err(context: &str, err: sqlx::Error) -> StoreError {
    match sqlstate(&err).as_deref() {
        Some(UNIQUE_VIOLATION) => return StoreError::Duplicate(format!("{context}: {err}")),
        Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => {
            return StoreError::Transient(format!("{context}: {err}"))
        }
        _ => {}
    }

    match err {
        sqlx::Error::PoolTimedOut => StoreError::Transient(format!("{context}: pool timed out")),
        other => StoreError::Backend(format!("{context}: {other}")),
    }
}

/// Inside supersession a unique violation means a concurrent writer claimed
/// the pair first; retrying re-reads the winner.
fn map_race_err(context: &str, err: sqlx::Error) -> StoreError {
    match map_err(context, err) {
        StoreError::Duplicate(reason) => StoreError::Transient(reason),
        other => other,
    }
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect using the configured pool settings
    pub async fn connect(database_url: &str, config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Backend(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Create tables and indexes if they do not exist yet
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_err("Failed to create schema", e))?;
        }
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    email: String,
    username: String,
    password_hash: String,
    display_name: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> StoreResult<Self> {
        let role: UserRole = row
            .role
            .parse()
            .map_err(|e| StoreError::Backend(format!("user {}: {e}", row.id)))?;

        Ok(User {
            id: row.id,
            email: row.email,
            username: row.username,
            password_hash: row.password_hash,
            display_name: row.display_name,
            role,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RefreshTokenRow {
    id: i64,
    user_id: i64,
    token_hash: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    revoked: bool,
    revoked_at: Option<DateTime<Utc>>,
    replaced_by_token_hash: Option<String>,
}

impl From<RefreshTokenRow> for RefreshToken {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshToken {
            id: row.id,
            user_id: row.user_id,
            token_hash: row.token_hash,
            expires_at: row.expires_at,
            created_at: row.created_at,
            revoked: row.revoked,
            revoked_at: row.revoked_at,
            replaced_by_token_hash: row.replaced_by_token_hash,
        }
    }
}

#[derive(Debug, FromRow)]
struct CatchRow {
    id: i64,
    user_id: i64,
    water_id: i64,
    zone_id: i64,
    species_id: i64,
    length_cm: f64,
    weight_kg: Option<f64>,
    method: Option<String>,
    notes: Option<String>,
    caught_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<CatchRow> for Catch {
    fn from(row: CatchRow) -> Self {
        Catch {
            id: row.id,
            user_id: row.user_id,
            water_id: row.water_id,
            zone_id: row.zone_id,
            species_id: row.species_id,
            length_cm: row.length_cm,
            weight_kg: row.weight_kg,
            method: row.method,
            notes: row.notes,
            caught_at: row.caught_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ClaimRow {
    id: i64,
    user_id: i64,
    water_id: i64,
    zone_id: i64,
    species_id: i64,
    catch_id: i64,
    length_cm: f64,
    is_active: bool,
    status: String,
    created_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
    reviewed_by_user_id: Option<i64>,
    reviewed_at: Option<DateTime<Utc>>,
    review_notes: Option<String>,
}

impl TryFrom<ClaimRow> for Claim {
    type Error = StoreError;

    fn try_from(row: ClaimRow) -> StoreResult<Self> {
        let status = row
            .status
            .parse()
            .map_err(|e| StoreError::Backend(format!("claim {}: {e}", row.id)))?;

        Ok(Claim {
            id: row.id,
            user_id: row.user_id,
            water_id: row.water_id,
            zone_id: row.zone_id,
            species_id: row.species_id,
            catch_id: row.catch_id,
            length_cm: row.length_cm,
            is_active: row.is_active,
            status,
            created_at: row.created_at,
            revoked_at: row.revoked_at,
            reviewed_by_user_id: row.reviewed_by_user_id,
            reviewed_at: row.reviewed_at,
            review_notes: row.review_notes,
        })
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let row: UserRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (email, username, password_hash, display_name, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_err("Failed to create user", e))?;

        row.try_into()
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
                .bind(username)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_err("Failed to fetch user", e))?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_err("Failed to fetch user", e))?;

        row.map(User::try_from).transpose()
    }

    async fn set_role(&self, id: UserId, role: UserRole) -> StoreResult<User> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users SET role = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_err("Failed to update role", e))?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| map_err("Storage ping failed", e))?;
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenStore for PgStore {
    async fn persist(&self, token: NewRefreshToken) -> StoreResult<RefreshToken> {
        let row: RefreshTokenRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING {TOKEN_COLUMNS}
            "#
        ))
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_err("Failed to store refresh token", e))?;

        Ok(row.into())
    }

    async fn lookup(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(&format!(
            "SELECT {TOKEN_COLUMNS} FROM refresh_tokens WHERE token_hash = $1"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_err("Failed to fetch refresh token", e))?;

        Ok(row.map(RefreshToken::from))
    }

    async fn mark_revoked(
        &self,
        token_hash: &str,
        replaced_by: Option<&str>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE, revoked_at = NOW(), replaced_by_token_hash = $2
            WHERE token_hash = $1 AND NOT revoked
            "#,
        )
        .bind(token_hash)
        .bind(replaced_by)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err("Failed to revoke refresh token", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn rotate(
        &self,
        old_hash: &str,
        replacement: NewRefreshToken,
    ) -> StoreResult<RefreshToken> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_err("Failed to begin rotation", e))?;

        let old: Option<RefreshTokenRow> = sqlx::query_as(&format!(
            "SELECT {TOKEN_COLUMNS} FROM refresh_tokens WHERE token_hash = $1 FOR UPDATE"
        ))
        .bind(old_hash)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_err("Failed to lock refresh token", e))?;

        let old = match old.map(RefreshToken::from) {
            Some(token) if token.is_active() => token,
            _ => return Err(StoreError::Stale),
        };

        let created: RefreshTokenRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING {TOKEN_COLUMNS}
            "#
        ))
        .bind(replacement.user_id)
        .bind(&replacement.token_hash)
        .bind(replacement.expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_err("Failed to store rotated token", e))?;

        sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE, revoked_at = NOW(), replaced_by_token_hash = $2
            WHERE id = $1
            "#,
        )
        .bind(old.id)
        .bind(&replacement.token_hash)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_err("Failed to revoke rotated token", e))?;

        tx.commit()
            .await
            .map_err(|e| map_err("Failed to commit rotation", e))?;

        Ok(created.into())
    }

    async fn revoke_all_for_user(&self, user_id: UserId) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE, revoked_at = NOW() WHERE user_id = $1 AND NOT revoked",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err("Failed to revoke refresh tokens", e))?;

        Ok(result.rows_affected())
    }

    async fn revoke_chain(&self, token_hash: &str) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            WITH RECURSIVE chain (token_hash, replaced_by_token_hash) AS (
                SELECT token_hash, replaced_by_token_hash
                FROM refresh_tokens WHERE token_hash = $1
                UNION
                SELECT t.token_hash, t.replaced_by_token_hash
                FROM refresh_tokens t
                JOIN chain c ON t.token_hash = c.replaced_by_token_hash
            )
            UPDATE refresh_tokens
            SET revoked = TRUE, revoked_at = NOW()
            WHERE token_hash IN (SELECT token_hash FROM chain) AND NOT revoked
            "#,
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err("Failed to revoke token chain", e))?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CatchStore for PgStore {
    async fn insert(&self, user_id: UserId, catch: NewCatch) -> StoreResult<Catch> {
        let row: CatchRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO catches (
                user_id, water_id, zone_id, species_id, length_cm,
                weight_kg, method, notes, caught_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, NOW()))
            RETURNING {CATCH_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(catch.water_id)
        .bind(catch.zone_id)
        .bind(catch.species_id)
        .bind(catch.length_cm)
        .bind(catch.weight_kg)
        .bind(&catch.method)
        .bind(&catch.notes)
        .bind(catch.caught_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_err("Failed to store catch", e))?;

        Ok(row.into())
    }
}

#[async_trait]
impl ClaimStore for PgStore {
    async fn supersede_if_longer(&self, candidate: NewClaim) -> StoreResult<ClaimOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_race_err("Failed to begin supersession", e))?;

        let incumbent: Option<ClaimRow> = sqlx::query_as(&format!(
            r#"
            SELECT {CLAIM_COLUMNS} FROM claims
            WHERE zone_id = $1 AND species_id = $2 AND is_active
            FOR UPDATE
            "#
        ))
        .bind(candidate.zone_id)
        .bind(candidate.species_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_race_err("Failed to lock active claim", e))?;

        let incumbent = incumbent.map(Claim::try_from).transpose()?;

        if !candidate.displaces(incumbent.as_ref()) {
            if let Some(active) = incumbent {
                return Ok(ClaimOutcome::Kept {
                    incumbent: active.id,
                });
            }
        }

        if let Some(active) = &incumbent {
            sqlx::query("UPDATE claims SET is_active = FALSE, revoked_at = NOW() WHERE id = $1")
                .bind(active.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_race_err("Failed to retire claim", e))?;
        }

        let row: ClaimRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO claims (
                user_id, water_id, zone_id, species_id, catch_id, length_cm, is_active, status
            ) VALUES ($1, $2, $3, $4, $5, $6, TRUE, 'approved')
            RETURNING {CLAIM_COLUMNS}
            "#
        ))
        .bind(candidate.user_id)
        .bind(candidate.water_id)
        .bind(candidate.zone_id)
        .bind(candidate.species_id)
        .bind(candidate.catch_id)
        .bind(candidate.length_cm)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_race_err("Failed to create claim", e))?;

        tx.commit()
            .await
            .map_err(|e| map_race_err("Failed to commit supersession", e))?;

        Ok(ClaimOutcome::Created {
            claim: row.try_into()?,
            superseded: incumbent.map(|c| c.id),
        })
    }

    async fn find(&self, id: ClaimId) -> StoreResult<Option<Claim>> {
        let row: Option<ClaimRow> =
            sqlx::query_as(&format!("SELECT {CLAIM_COLUMNS} FROM claims WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_err("Failed to fetch claim", e))?;

        row.map(Claim::try_from).transpose()
    }

    async fn active_for(
        &self,
        zone_id: ZoneId,
        species_id: SpeciesId,
    ) -> StoreResult<Option<Claim>> {
        let row: Option<ClaimRow> = sqlx::query_as(&format!(
            "SELECT {CLAIM_COLUMNS} FROM claims WHERE zone_id = $1 AND species_id = $2 AND is_active"
        ))
        .bind(zone_id)
        .bind(species_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_err("Failed to fetch active claim", e))?;

        row.map(Claim::try_from).transpose()
    }

    async fn update_review(&self, id: ClaimId, update: ReviewUpdate) -> StoreResult<Claim> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_err("Failed to begin review", e))?;

        let row: Option<ClaimRow> = sqlx::query_as(&format!(
            "SELECT {CLAIM_COLUMNS} FROM claims WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_err("Failed to lock claim", e))?;

        let mut claim = Claim::try_from(row.ok_or(StoreError::NotFound)?)?;

        if update.status.is_approved() {
            let other: Option<(i64,)> = sqlx::query_as(
                r#"
                SELECT id FROM claims
                WHERE zone_id = $1 AND species_id = $2 AND is_active AND id <> $3
                FOR UPDATE
                "#,
            )
            .bind(claim.zone_id)
            .bind(claim.species_id)
            .bind(claim.id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_err("Failed to check active claim", e))?;

            if let Some((other_id,)) = other {
                return Err(StoreError::Duplicate(format!(
                    "claim {other_id} is already active for zone {}, species {}",
                    claim.zone_id, claim.species_id
                )));
            }
        }

        update.apply_to(&mut claim);

        sqlx::query(
            r#"
            UPDATE claims
            SET status = $2, review_notes = $3, reviewed_by_user_id = $4,
                reviewed_at = $5, is_active = $6, revoked_at = $7
            WHERE id = $1
            "#,
        )
        .bind(claim.id)
        .bind(claim.status.as_str())
        .bind(&claim.review_notes)
        .bind(claim.reviewed_by_user_id)
        .bind(claim.reviewed_at)
        .bind(claim.is_active)
        .bind(claim.revoked_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_err("Failed to update claim", e))?;

        tx.commit()
            .await
            .map_err(|e| map_err("Failed to commit review", e))?;

        Ok(claim)
    }

    async fn list_for_zone(&self, zone_id: ZoneId) -> StoreResult<Vec<Claim>> {
        let rows: Vec<ClaimRow> = sqlx::query_as(&format!(
            "SELECT {CLAIM_COLUMNS} FROM claims WHERE zone_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(zone_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_err("Failed to list claims", e))?;

        rows.into_iter().map(Claim::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_user_row_conversion() {
        let row = UserRow {
            id: 3,
            email: "carol@example.com".to_string(),
            username: "carol".to_string(),
            password_hash: "$argon2id$...".to_string(),
            display_name: "Carol".to_string(),
            role: "reviewer".to_string(),
            created_at: Utc::now(),
        };

        let user = User::try_from(row).unwrap();
        assert_eq!(user.role, UserRole::Reviewer);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let row = UserRow {
            id: 3,
            email: "carol@example.com".to_string(),
            username: "carol".to_string(),
            password_hash: String::new(),
            display_name: "Carol".to_string(),
            role: "superuser".to_string(),
            created_at: Utc::now(),
        };

        assert!(matches!(User::try_from(row), Err(StoreError::Backend(_))));
    }

    #[test]
    fn test_claim_row_conversion() {
        let row = ClaimRow {
            id: 1,
            user_id: 2,
            water_id: 3,
            zone_id: 4,
            species_id: 5,
            catch_id: 6,
            length_cm: 42.5,
            is_active: false,
            status: "rejected".to_string(),
            created_at: Utc::now(),
            revoked_at: Some(Utc::now()),
            reviewed_by_user_id: Some(7),
            reviewed_at: Some(Utc::now()),
            review_notes: None,
        };

        let claim = Claim::try_from(row).unwrap();
        assert_eq!(claim.status, fishclaim_core::ClaimStatus::Rejected);
        assert_eq!(claim.zone_id, 4);
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        assert!(matches!(
            map_err("ctx", sqlx::Error::PoolTimedOut),
            StoreError::Transient(_)
        ));
        assert!(matches!(
            map_err("ctx", sqlx::Error::RowNotFound),
            StoreError::Backend(_)
        ));
    }

    async fn test_store() -> PgStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let store = PgStore::connect(&url, &DatabaseConfig::default())
            .await
            .unwrap();
        store.ensure_schema().await.unwrap();
        store
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_pg_rotation_is_single_use() {
        let store = test_store().await;
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let user = store
            .create(NewUser {
                email: format!("{suffix}@example.com"),
                username: format!("u{}", &suffix[..12]),
                password_hash: "hash".to_string(),
                display_name: "pg".to_string(),
                role: UserRole::User,
            })
            .await
            .unwrap();

        let token = |hash: &str| NewRefreshToken {
            user_id: user.id,
            token_hash: format!("{hash}-{suffix}"),
            expires_at: Utc::now() + ChronoDuration::days(1),
        };

        let first = store.persist(token("a")).await.unwrap();
        store.rotate(&first.token_hash, token("b")).await.unwrap();

        assert!(matches!(
            store.rotate(&first.token_hash, token("c")).await,
            Err(StoreError::Stale)
        ));
        assert_eq!(store.revoke_chain(&first.token_hash).await.unwrap(), 1);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_pg_supersession_keeps_one_active() {
        let store = test_store().await;
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let user = store
            .create(NewUser {
                email: format!("{suffix}@example.com"),
                username: format!("u{}", &suffix[..12]),
                password_hash: "hash".to_string(),
                display_name: "pg".to_string(),
                role: UserRole::User,
            })
            .await
            .unwrap();

        let zone_id = (Utc::now().timestamp_micros() % 1_000_000_000) + 1_000_000;
        let mut outcomes = Vec::new();
        for length_cm in [15.0, 20.0, 20.0] {
            let catch = store
                .insert(
                    user.id,
                    NewCatch {
                        water_id: 1,
                        zone_id,
                        species_id: 1,
                        length_cm,
                        weight_kg: None,
                        method: None,
                        notes: None,
                        caught_at: None,
                    },
                )
                .await
                .unwrap();
            outcomes.push(store.supersede_if_longer(NewClaim::from(&catch)).await.unwrap());
        }

        assert!(matches!(outcomes[2], ClaimOutcome::Kept { .. }));
        let claims = store.list_for_zone(zone_id).await.unwrap();
        assert_eq!(claims.iter().filter(|c| c.is_active).count(), 1);
    }
}
