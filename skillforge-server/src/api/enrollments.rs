//! Enrollment endpoints
//!
//! Enrollment is the membership record behind all progress tracking.
//! Joining is idempotent; leaving removes the membership and every
//! completion fact scoped to it, so a later re-join starts clean.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use skillforge_common::db::models::Enrollment;
use skillforge_common::Error;
use tracing::info;
use uuid::Uuid;

use super::{ApiResult, Identity};
use crate::{db, progress, AppState};

/// Program fields embedded in an enrollment listing
#[derive(Debug, Serialize)]
pub struct ProgramSummary {
    pub id: Uuid,
    pub title: String,
    pub reward_points: i64,
}

/// An enrollment with its program summary attached
#[derive(Debug, Serialize)]
pub struct EnrollmentView {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub program: ProgramSummary,
}

#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub program_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ProgressOverrideRequest {
    /// Target learner; defaults to the caller
    pub learner_id: Option<Uuid>,
    pub progress: Option<i64>,
    pub completed: Option<bool>,
}

/// GET /api/enrollments - the caller's memberships, newest first
pub async fn list_enrollments(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<Vec<EnrollmentView>>> {
    let rows = db::enrollments::list_enrollments(&state.db, identity.learner_id).await?;

    let views = rows
        .into_iter()
        .map(|(enrollment, program)| EnrollmentView {
            enrollment,
            program: ProgramSummary {
                id: program.id,
                title: program.title,
                reward_points: program.reward_points,
            },
        })
        .collect();

    Ok(Json(views))
}

/// POST /api/enrollments - join a program
///
/// Idempotent: re-joining returns the existing membership unchanged.
pub async fn enroll(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<EnrollRequest>,
) -> ApiResult<(StatusCode, Json<Enrollment>)> {
    if !db::programs::program_exists(&state.db, request.program_id).await? {
        return Err(Error::NotFound(format!("program {}", request.program_id)).into());
    }

    let enrollment = db::enrollments::enroll(&state.db, identity.learner_id, request.program_id).await?;

    info!(
        learner_id = %identity.learner_id,
        program_id = %request.program_id,
        "Learner enrolled"
    );

    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// DELETE /api/enrollments/:program_id - leave a program
///
/// Drops the membership and the learner's episode marks and quiz attempts
/// for the program in one transaction.
pub async fn unenroll(
    State(state): State<AppState>,
    identity: Identity,
    Path(program_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let existed =
        db::enrollments::delete_enrollment_cascade(&state.db, identity.learner_id, program_id)
            .await?;

    if !existed {
        return Err(Error::NotFound(format!("enrollment in program {}", program_id)).into());
    }

    info!(
        learner_id = %identity.learner_id,
        program_id = %program_id,
        "Learner unenrolled"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/enrollments/:program_id - administrative progress override
///
/// Writes progress state directly, bypassing the completion ledger.
/// Never grants XP.
pub async fn override_progress(
    State(state): State<AppState>,
    identity: Identity,
    Path(program_id): Path<Uuid>,
    Json(request): Json<ProgressOverrideRequest>,
) -> ApiResult<Json<Enrollment>> {
    identity.require_admin()?;

    let learner_id = request.learner_id.unwrap_or(identity.learner_id);
    let enrollment = progress::set_manual_progress(
        &state.db,
        learner_id,
        program_id,
        request.progress,
        request.completed,
    )
    .await?
    .ok_or_else(|| Error::NotFound(format!("enrollment in program {}", program_id)))?;

    info!(
        admin_id = %identity.learner_id,
        learner_id = %learner_id,
        program_id = %program_id,
        progress = enrollment.progress,
        "Progress overridden"
    );

    Ok(Json(enrollment))
}
