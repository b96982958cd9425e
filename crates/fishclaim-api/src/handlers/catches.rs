//! Catch recording handler

use crate::auth::AuthenticatedUser;
use crate::claims::{Catch, ClaimOutcome, NewCatch};
use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Extension, Json};
use chrono::{DateTime, Utc};
use fishclaim_core::{SpeciesId, WaterId, ZoneId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Catch submission
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecordCatchRequest {
    pub water_id: WaterId,
    pub zone_id: ZoneId,
    pub species_id: SpeciesId,
    /// Length in centimetres, must be positive
    pub length_cm: f64,
    pub weight_kg: Option<f64>,
    pub method: Option<String>,
    pub notes: Option<String>,
    /// Defaults to the time of submission
    pub caught_at: Option<DateTime<Utc>>,
}

impl From<RecordCatchRequest> for NewCatch {
    fn from(request: RecordCatchRequest) -> Self {
        Self {
            water_id: request.water_id,
            zone_id: request.zone_id,
            species_id: request.species_id,
            length_cm: request.length_cm,
            weight_kg: request.weight_kg,
            method: request.method,
            notes: request.notes,
            caught_at: request.caught_at,
        }
    }
}

/// Stored catch plus what it did to the claim ledger
#[derive(Debug, Serialize, ToSchema)]
pub struct RecordCatchResponse {
    pub catch: Catch,
    pub claim_outcome: ClaimOutcome,
}

/// Record a catch for the authenticated angler
///
/// The catch becomes the active claim for its (zone, species) pair when it
/// is strictly longer than the current one.
#[utoipa::path(
    post,
    path = "/api/catches",
    tag = "claims",
    request_body = RecordCatchRequest,
    responses(
        (status = 200, description = "Catch recorded", body = RecordCatchResponse),
        (status = 400, description = "Invalid catch", body = crate::error::ApiError),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn record_catch_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<RecordCatchRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (catch, claim_outcome) = state.ledger.record_catch(&user, request.into()).await?;

    Ok(Json(RecordCatchResponse {
        catch,
        claim_outcome,
    }))
}
