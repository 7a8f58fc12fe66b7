//! Episode completion endpoint

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use skillforge_common::db::models::Enrollment;
use skillforge_common::Error;
use tracing::info;
use uuid::Uuid;

use super::{ApiResult, Identity};
use crate::{db, progress, AppState};

#[derive(Debug, Serialize)]
pub struct CompleteEpisodeResponse {
    pub episode_id: Uuid,
    pub program_id: Uuid,
    /// Recomputed enrollment; absent when the caller is not enrolled
    /// (the completion mark is still recorded)
    pub enrollment: Option<Enrollment>,
}

/// POST /api/episodes/:episode_id/complete
///
/// Records the completion mark (idempotent) and folds it into the
/// caller's enrollment progress. Marking an already-complete episode
/// changes nothing.
pub async fn complete_episode(
    State(state): State<AppState>,
    identity: Identity,
    Path(episode_id): Path<Uuid>,
) -> ApiResult<Json<CompleteEpisodeResponse>> {
    let episode = db::episodes::get_episode(&state.db, episode_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("episode {}", episode_id)))?;

    db::episodes::mark_episode_complete(&state.db, identity.learner_id, episode_id).await?;

    let enrollment =
        progress::recompute_progress(&state.db, identity.learner_id, episode.program_id).await?;

    info!(
        learner_id = %identity.learner_id,
        episode_id = %episode_id,
        program_id = %episode.program_id,
        progress = enrollment.as_ref().map(|e| e.progress),
        "Episode completed"
    );

    Ok(Json(CompleteEpisodeResponse {
        episode_id,
        program_id: episode.program_id,
        enrollment,
    }))
}
