//! Claim ledger: "longer fish wins" per (zone, species)
//!
//! A catch becomes the active claim for its pair when it is strictly longer
//! than the incumbent. Supersession and review each run as one store call.
//! Rejecting a claim leaves its pair without an active claim; the previous
//! holder is not reinstated.

use super::models::{Catch, Claim, ClaimOutcome, NewCatch, NewClaim, ReviewUpdate};
use crate::audit::{audit_log, AuditEvent};
use crate::auth::gate::{authorize, AuthenticatedUser};
use crate::error::AppError;
use crate::store::{retry_once, CatchStore, ClaimStore, StoreError};
use chrono::Utc;
use fishclaim_core::{ClaimId, ClaimStatus, UserRole, ZoneId};
use std::sync::Arc;

/// Roles allowed to change a claim's review status
pub const REVIEWER_ROLES: &[UserRole] = &[UserRole::Reviewer, UserRole::Admin];

/// Upper bound on a plausible catch length
pub const MAX_LENGTH_CM: f64 = 1000.0;

/// Review decision submitted by a reviewer
#[derive(Debug, Clone)]
pub struct ReviewDecision {
    pub status: ClaimStatus,
    pub review_notes: Option<String>,
}

pub struct ClaimLedger {
    catches: Arc<dyn CatchStore>,
    claims: Arc<dyn ClaimStore>,
}

impl ClaimLedger {
    pub fn new(catches: Arc<dyn CatchStore>, claims: Arc<dyn ClaimStore>) -> Self {
        Self { catches, claims }
    }

    /// Store a catch for `angler` and evaluate it against the active claim
    pub async fn record_catch(
        &self,
        angler: &AuthenticatedUser,
        catch: NewCatch,
    ) -> Result<(Catch, ClaimOutcome), AppError> {
        validate_catch(&catch)?;

        let stored = self.catches.insert(angler.user_id, catch).await?;
        let outcome = self.evaluate(&stored).await?;

        Ok((stored, outcome))
    }

    /// Apply the "longer fish wins" rule to a stored catch
    ///
    /// Ties keep the incumbent.
    pub async fn evaluate(&self, catch: &Catch) -> Result<ClaimOutcome, AppError> {
        let candidate = NewClaim::from(catch);

        let outcome = retry_once("claim_supersession", || {
            self.claims.supersede_if_longer(candidate.clone())
        })
        .await?;

        match &outcome {
            ClaimOutcome::Created { claim, superseded } => {
                audit_log(&AuditEvent::ClaimSuperseded {
                    claim_id: claim.id,
                    superseded: *superseded,
                    user_id: claim.user_id,
                    zone_id: claim.zone_id,
                    species_id: claim.species_id,
                    length_cm: claim.length_cm,
                });
            }
            ClaimOutcome::Kept { incumbent } => {
                tracing::debug!(
                    catch_id = catch.id,
                    incumbent,
                    "Catch does not beat the active claim"
                );
            }
        }

        Ok(outcome)
    }

    /// Record a reviewer's decision on a claim
    ///
    /// # Returns
    ///
    /// * `Err(AppError::Forbidden)` - reviewer is not a reviewer or admin
    /// * `Err(AppError::NotFound)` - no such claim
    /// * `Err(AppError::Conflict)` - approving while another claim for the
    ///   same pair is active
    pub async fn set_review_status(
        &self,
        claim_id: ClaimId,
        decision: ReviewDecision,
        reviewer: &AuthenticatedUser,
    ) -> Result<Claim, AppError> {
        authorize(reviewer, REVIEWER_ROLES)?;

        let update = ReviewUpdate {
            status: decision.status,
            review_notes: decision.review_notes,
            reviewed_by_user_id: reviewer.user_id,
            reviewed_at: Utc::now(),
        };

        let claim = self
            .claims
            .update_review(claim_id, update)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AppError::NotFound("Claim".to_string()),
                other => other.into(),
            })?;

        audit_log(&AuditEvent::ClaimReviewed {
            claim_id: claim.id,
            reviewer_id: reviewer.user_id,
            status: claim.status,
            is_active: claim.is_active,
        });

        Ok(claim)
    }

    /// All claims for a zone, newest first
    pub async fn claims_for_zone(&self, zone_id: ZoneId) -> Result<Vec<Claim>, AppError> {
        Ok(self.claims.list_for_zone(zone_id).await?)
    }
}

fn validate_catch(catch: &NewCatch) -> Result<(), AppError> {
    if !catch.length_cm.is_finite() || catch.length_cm <= 0.0 {
        return Err(AppError::Validation(
            "length_cm must be a positive number".to_string(),
        ));
    }
    if catch.length_cm > MAX_LENGTH_CM {
        return Err(AppError::Validation(format!(
            "length_cm must not exceed {MAX_LENGTH_CM}"
        )));
    }
    if let Some(weight) = catch.weight_kg {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(AppError::Validation(
                "weight_kg must be a positive number".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use proptest::prelude::*;

    fn ledger(store: &MemoryStore) -> ClaimLedger {
        ClaimLedger::new(Arc::new(store.clone()), Arc::new(store.clone()))
    }

    fn angler(user_id: i64, role: UserRole) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id,
            username: format!("user{user_id}"),
            role,
            jti: "jti".to_string(),
        }
    }

    fn catch_of(length_cm: f64) -> NewCatch {
        NewCatch {
            water_id: 1,
            zone_id: 10,
            species_id: 20,
            length_cm,
            weight_kg: None,
            method: Some("fly".to_string()),
            notes: None,
            caught_at: None,
        }
    }

    #[tokio::test]
    async fn test_longer_catch_takes_the_claim() {
        let store = MemoryStore::new();
        let ledger = ledger(&store);
        let alice = angler(1, UserRole::User);

        let (_, first) = ledger.record_catch(&alice, catch_of(15.0)).await.unwrap();
        let first_claim = first.created_claim().unwrap().clone();

        let (_, second) = ledger.record_catch(&alice, catch_of(20.0)).await.unwrap();
        let ClaimOutcome::Created { claim, superseded } = second else {
            panic!("20.0 should beat 15.0");
        };
        assert_eq!(superseded, Some(first_claim.id));
        assert_eq!(claim.length_cm, 20.0);
        assert_eq!(claim.status, ClaimStatus::Approved);
        assert!(claim.is_active);

        let (_, tie) = ledger.record_catch(&alice, catch_of(20.0)).await.unwrap();
        assert_eq!(tie, ClaimOutcome::Kept { incumbent: claim.id });

        let claims = ledger.claims_for_zone(10).await.unwrap();
        assert_eq!(claims.len(), 2);
        assert_eq!(claims.iter().filter(|c| c.is_active).count(), 1);
        assert!(!claims.iter().find(|c| c.id == first_claim.id).unwrap().is_active);
    }

    #[tokio::test]
    async fn test_pairs_are_independent() {
        let store = MemoryStore::new();
        let ledger = ledger(&store);
        let alice = angler(1, UserRole::User);

        ledger.record_catch(&alice, catch_of(50.0)).await.unwrap();
        let (_, other_species) = ledger
            .record_catch(
                &alice,
                NewCatch {
                    species_id: 21,
                    ..catch_of(10.0)
                },
            )
            .await
            .unwrap();

        assert!(matches!(other_species, ClaimOutcome::Created { superseded: None, .. }));
    }

    #[tokio::test]
    async fn test_invalid_lengths_rejected() {
        let store = MemoryStore::new();
        let ledger = ledger(&store);
        let alice = angler(1, UserRole::User);

        for length in [0.0, -3.0, f64::NAN, f64::INFINITY, 1000.5] {
            assert!(
                matches!(
                    ledger.record_catch(&alice, catch_of(length)).await,
                    Err(AppError::Validation(_))
                ),
                "length {length} should be rejected"
            );
        }

        let bad_weight = NewCatch {
            weight_kg: Some(-1.0),
            ..catch_of(30.0)
        };
        assert!(ledger.record_catch(&alice, bad_weight).await.is_err());
        assert!(ledger.claims_for_zone(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_review_requires_reviewer_role() {
        let store = MemoryStore::new();
        let ledger = ledger(&store);
        let alice = angler(1, UserRole::User);

        let (_, outcome) = ledger.record_catch(&alice, catch_of(15.0)).await.unwrap();
        let claim_id = outcome.created_claim().unwrap().id;

        let decision = ReviewDecision {
            status: ClaimStatus::Rejected,
            review_notes: None,
        };

        for role in [UserRole::User, UserRole::Viewer] {
            assert!(matches!(
                ledger
                    .set_review_status(claim_id, decision.clone(), &angler(2, role))
                    .await,
                Err(AppError::Forbidden(_))
            ));
        }

        let reviewed = ledger
            .set_review_status(claim_id, decision, &angler(3, UserRole::Reviewer))
            .await
            .unwrap();
        assert_eq!(reviewed.status, ClaimStatus::Rejected);
        assert!(!reviewed.is_active);
        assert!(reviewed.revoked_at.is_some());
        assert_eq!(reviewed.reviewed_by_user_id, Some(3));
    }

    #[tokio::test]
    async fn test_rejection_does_not_reinstate_previous_claim() {
        let store = MemoryStore::new();
        let ledger = ledger(&store);
        let alice = angler(1, UserRole::User);
        let admin = angler(9, UserRole::Admin);

        ledger.record_catch(&alice, catch_of(15.0)).await.unwrap();
        let (_, outcome) = ledger.record_catch(&alice, catch_of(20.0)).await.unwrap();
        let top = outcome.created_claim().unwrap().id;

        ledger
            .set_review_status(
                top,
                ReviewDecision {
                    status: ClaimStatus::Rejected,
                    review_notes: Some("measured with the tail pinched".to_string()),
                },
                &admin,
            )
            .await
            .unwrap();

        let claims = ledger.claims_for_zone(10).await.unwrap();
        assert!(claims.iter().all(|c| !c.is_active));

        // The next catch of any length takes the vacant record
        let (_, next) = ledger.record_catch(&alice, catch_of(5.0)).await.unwrap();
        assert!(matches!(next, ClaimOutcome::Created { superseded: None, .. }));
    }

    #[tokio::test]
    async fn test_review_conflict_and_missing_claim() {
        let store = MemoryStore::new();
        let ledger = ledger(&store);
        let alice = angler(1, UserRole::User);
        let reviewer = angler(2, UserRole::Reviewer);

        let (_, first) = ledger.record_catch(&alice, catch_of(15.0)).await.unwrap();
        ledger.record_catch(&alice, catch_of(20.0)).await.unwrap();

        let approve = ReviewDecision {
            status: ClaimStatus::Approved,
            review_notes: None,
        };

        assert!(matches!(
            ledger
                .set_review_status(first.created_claim().unwrap().id, approve.clone(), &reviewer)
                .await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            ledger.set_review_status(12345, approve, &reviewer).await,
            Err(AppError::NotFound(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_single_active_claim_is_first_maximum(
            lengths in prop::collection::vec(1u32..200, 1..20)
        ) {
            let claims = tokio_test::block_on(async {
                let store = MemoryStore::new();
                let ledger = ledger(&store);
                let alice = angler(1, UserRole::User);

                for length in &lengths {
                    ledger
                        .record_catch(&alice, catch_of(*length as f64 / 2.0))
                        .await
                        .unwrap();
                }
                ledger.claims_for_zone(10).await.unwrap()
            });

            let active: Vec<_> = claims.iter().filter(|c| c.is_active).collect();
            prop_assert_eq!(active.len(), 1);

            let max = *lengths.iter().max().unwrap();
            prop_assert_eq!(active[0].length_cm, max as f64 / 2.0);

            // Ties keep the first catch, so the winning claim is the oldest
            // claim at the maximal length
            let max_claims: Vec<_> = claims
                .iter()
                .filter(|c| c.length_cm == max as f64 / 2.0)
                .collect();
            prop_assert_eq!(max_claims.len(), 1);
        }
    }
}
