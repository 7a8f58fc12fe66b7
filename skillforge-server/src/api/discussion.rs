//! Discussion message endpoints (the durable side of the room layer)
//!
//! Every message and like is committed here before any broadcast
//! mentions it; the room relay never writes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use skillforge_common::types::{DiscussionMessage, LikeReceipt};
use skillforge_common::Error;
use tracing::info;
use uuid::Uuid;

use super::{ApiResult, Identity};
use crate::{db, AppState};

/// Messages served per room fetch: the newest window, oldest first
pub const MESSAGE_WINDOW: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct RoomQuery {
    pub program_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub program_id: Uuid,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct WipeResponse {
    pub deleted: u64,
}

/// GET /api/discussion?program_id= - the room's recent history
pub async fn list_messages(
    State(state): State<AppState>,
    _identity: Identity,
    Query(query): Query<RoomQuery>,
) -> ApiResult<Json<Vec<DiscussionMessage>>> {
    let messages =
        db::discussion::list_messages(&state.db, query.program_id, MESSAGE_WINDOW).await?;
    Ok(Json(messages))
}

/// POST /api/discussion - persist a message
///
/// Returns the authoritative record (id, author, timestamp as stored);
/// clients echo this record, not their local draft.
pub async fn post_message(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<PostMessageRequest>,
) -> ApiResult<(StatusCode, Json<DiscussionMessage>)> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(Error::InvalidInput("message must not be empty".to_string()).into());
    }
    if !db::programs::program_exists(&state.db, request.program_id).await? {
        return Err(Error::NotFound(format!("program {}", request.program_id)).into());
    }
    if db::learners::get_learner(&state.db, identity.learner_id)
        .await?
        .is_none()
    {
        return Err(Error::NotFound(format!("learner {}", identity.learner_id)).into());
    }

    let stored =
        db::discussion::post_message(&state.db, request.program_id, identity.learner_id, message)
            .await?;

    Ok((StatusCode::CREATED, Json(stored)))
}

/// POST /api/discussion/:id/like - add one like
pub async fn like_message(
    State(state): State<AppState>,
    _identity: Identity,
    Path(message_id): Path<Uuid>,
) -> ApiResult<Json<LikeReceipt>> {
    let receipt = db::discussion::like_message(&state.db, message_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("message {}", message_id)))?;

    Ok(Json(receipt))
}

/// DELETE /api/discussion?program_id= - wipe a room's history (admin)
pub async fn wipe_room(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<RoomQuery>,
) -> ApiResult<Json<WipeResponse>> {
    identity.require_admin()?;

    let deleted = db::discussion::clear_messages(&state.db, query.program_id).await?;

    info!(
        admin_id = %identity.learner_id,
        program_id = %query.program_id,
        deleted,
        "Discussion room wiped"
    );

    Ok(Json(WipeResponse { deleted }))
}
