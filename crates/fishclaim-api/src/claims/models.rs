//! Catch and claim records

use chrono::{DateTime, Utc};
use fishclaim_core::{CatchId, ClaimId, ClaimStatus, SpeciesId, UserId, WaterId, ZoneId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A recorded catch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Catch {
    pub id: CatchId,
    pub user_id: UserId,
    pub water_id: WaterId,
    pub zone_id: ZoneId,
    pub species_id: SpeciesId,
    pub length_cm: f64,
    pub weight_kg: Option<f64>,
    pub method: Option<String>,
    pub notes: Option<String>,
    pub caught_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A catch about to be persisted
#[derive(Debug, Clone)]
pub struct NewCatch {
    pub water_id: WaterId,
    pub zone_id: ZoneId,
    pub species_id: SpeciesId,
    pub length_cm: f64,
    pub weight_kg: Option<f64>,
    pub method: Option<String>,
    pub notes: Option<String>,
    pub caught_at: Option<DateTime<Utc>>,
}

/// The current or historical biggest-fish record for a (zone, species) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Claim {
    pub id: ClaimId,
    pub user_id: UserId,
    pub water_id: WaterId,
    pub zone_id: ZoneId,
    pub species_id: SpeciesId,
    pub catch_id: CatchId,
    pub length_cm: f64,
    pub is_active: bool,
    #[schema(value_type = String, example = "approved")]
    pub status: ClaimStatus,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub reviewed_by_user_id: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
}

/// Claim candidate derived from a stored catch
#[derive(Debug, Clone)]
pub struct NewClaim {
    pub user_id: UserId,
    pub water_id: WaterId,
    pub zone_id: ZoneId,
    pub species_id: SpeciesId,
    pub catch_id: CatchId,
    pub length_cm: f64,
}

impl NewClaim {
    /// Whether this candidate takes the record from `incumbent`
    ///
    /// Only a strictly longer catch displaces the active claim; on a tie the
    /// first claimant keeps it.
    pub fn displaces(&self, incumbent: Option<&Claim>) -> bool {
        match incumbent {
            None => true,
            Some(active) => self.length_cm > active.length_cm,
        }
    }
}

impl From<&Catch> for NewClaim {
    fn from(catch: &Catch) -> Self {
        Self {
            user_id: catch.user_id,
            water_id: catch.water_id,
            zone_id: catch.zone_id,
            species_id: catch.species_id,
            catch_id: catch.id,
            length_cm: catch.length_cm,
        }
    }
}

/// Result of evaluating a catch against the active claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClaimOutcome {
    /// A new active claim was created, retiring `superseded` if there was one
    Created {
        claim: Claim,
        superseded: Option<ClaimId>,
    },
    /// The incumbent claim is at least as long and stays active
    Kept { incumbent: ClaimId },
}

impl ClaimOutcome {
    pub fn created_claim(&self) -> Option<&Claim> {
        match self {
            ClaimOutcome::Created { claim, .. } => Some(claim),
            ClaimOutcome::Kept { .. } => None,
        }
    }
}

/// Review decision applied to a single claim
#[derive(Debug, Clone)]
pub struct ReviewUpdate {
    pub status: ClaimStatus,
    pub review_notes: Option<String>,
    pub reviewed_by_user_id: UserId,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewUpdate {
    /// Apply the decision to a claim in place
    ///
    /// Leaving `approved` deactivates the claim and stamps `revoked_at`.
    pub fn apply_to(&self, claim: &mut Claim) {
        claim.status = self.status;
        claim.review_notes = self.review_notes.clone();
        claim.reviewed_by_user_id = Some(self.reviewed_by_user_id);
        claim.reviewed_at = Some(self.reviewed_at);
        claim.is_active = self.status.is_approved();
        if !self.status.is_approved() {
            claim.revoked_at = Some(self.reviewed_at);
        }
    }
}
