//! Reward claim endpoint

use axum::{extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiResult, Identity};
use crate::rewards::{self, RewardGrant};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub program_id: Uuid,
}

/// POST /api/rewards/claim - claim the XP reward for a completed program
///
/// Rejected with 409 when the program is not completed or the reward was
/// already claimed; each program pays out at most once per learner.
pub async fn claim_reward(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<ClaimRequest>,
) -> ApiResult<Json<RewardGrant>> {
    let grant =
        rewards::claim_reward(&state.db, identity.learner_id, request.program_id).await?;

    Ok(Json(grant))
}
