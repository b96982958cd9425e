//! Claim listing and moderation handlers
//!
//! Author: hephaex@gmail.com

use crate::auth::AuthenticatedUser;
use crate::claims::{Claim, ReviewDecision};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use fishclaim_core::{ClaimId, ClaimStatus, ZoneId};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Review request
///
/// `status` is parsed here rather than by serde so an unknown value is a
/// 400 with the usual error body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ClaimStatusRequest {
    /// One of `pending`, `approved`, `rejected`
    pub status: String,
    pub review_notes: Option<String>,
}

/// List claims for a zone, newest first
#[utoipa::path(
    get,
    path = "/api/claims/zone/{zone_id}",
    tag = "claims",
    params(("zone_id" = i64, Path, description = "Zone id")),
    responses(
        (status = 200, description = "Claims for the zone", body = Vec<Claim>),
    )
)]
pub async fn zone_claims_handler(
    State(state): State<Arc<AppState>>,
    Path(zone_id): Path<ZoneId>,
) -> Result<impl IntoResponse, AppError> {
    let claims = state.ledger.claims_for_zone(zone_id).await?;

    Ok(Json(claims))
}

/// Set a claim's review status
///
/// Approving makes the claim active; pending or rejected makes it inactive.
/// Approving while another claim for the same pair is active is a 400.
#[utoipa::path(
    post,
    path = "/api/claims/{claim_id}/status",
    tag = "claims",
    params(("claim_id" = i64, Path, description = "Claim id")),
    request_body = ClaimStatusRequest,
    responses(
        (status = 200, description = "Updated claim", body = Claim),
        (status = 400, description = "Invalid status or conflicting active claim", body = crate::error::ApiError),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
        (status = 403, description = "Not a reviewer or admin", body = crate::error::ApiError),
        (status = 404, description = "Claim not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn set_claim_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(claim_id): Path<ClaimId>,
    Json(request): Json<ClaimStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status: ClaimStatus = request.status.parse()?;

    let claim = state
        .ledger
        .set_review_status(
            claim_id,
            ReviewDecision {
                status,
                review_notes: request.review_notes,
            },
            &user,
        )
        .await?;

    Ok(Json(claim))
}
