//! Quiz fetch and submission endpoints
//!
//! The fetch path serves questions through an answer-free view; the
//! correct index only ever travels back inside a post-grading breakdown.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use skillforge_common::db::models::{Enrollment, Question, QuizResult};
use skillforge_common::Error;
use tracing::info;
use uuid::Uuid;

use super::{ApiResult, Identity};
use crate::grading::{self, AnswerReview};
use crate::{db, progress, AppState};

/// A question as served to learners: no answer field exists on this type
#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub id: Uuid,
    pub text: String,
    pub options: Vec<String>,
    pub position: i64,
}

impl From<Question> for QuestionView {
    fn from(q: Question) -> Self {
        QuestionView {
            id: q.id,
            text: q.text,
            options: q.options,
            position: q.position,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuizView {
    pub id: Uuid,
    pub program_id: Uuid,
    pub title: String,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Deserialize)]
pub struct QuizQuery {
    pub program_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    pub quiz_id: Uuid,
    #[serde(default)]
    pub answers: Vec<i64>,
    #[serde(default)]
    pub auto_pass: bool,
}

#[derive(Debug, Serialize)]
pub struct SubmitQuizResponse {
    pub quiz_id: Uuid,
    pub score: i64,
    pub total: i64,
    pub passed: bool,
    pub breakdown: Vec<AnswerReview>,
    /// Enrollment state after any recompute; absent when not enrolled
    pub enrollment: Option<Enrollment>,
}

/// GET /api/quiz?program_id= - the program's quiz, answers withheld
pub async fn get_quiz(
    State(state): State<AppState>,
    _identity: Identity,
    Query(query): Query<QuizQuery>,
) -> ApiResult<Json<QuizView>> {
    let quiz = db::quizzes::get_quiz_for_program(&state.db, query.program_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("quiz for program {}", query.program_id)))?;

    let questions = db::quizzes::list_questions(&state.db, quiz.id).await?;

    Ok(Json(QuizView {
        id: quiz.id,
        program_id: quiz.program_id,
        title: quiz.title,
        questions: questions.into_iter().map(QuestionView::from).collect(),
    }))
}

/// POST /api/quiz/submit - grade an attempt
///
/// Every graded attempt is recorded, pass or fail. A passing attempt
/// folds into enrollment progress unless the enrollment is already
/// completed. `auto_pass` skips grading and is admin-only.
pub async fn submit_quiz(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<SubmitQuizRequest>,
) -> ApiResult<Json<SubmitQuizResponse>> {
    let quiz = db::quizzes::get_quiz(&state.db, request.quiz_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("quiz {}", request.quiz_id)))?;

    let questions = db::quizzes::list_questions(&state.db, quiz.id).await?;

    // A rejected submission records nothing
    let graded = if request.auto_pass {
        identity.require_admin()?;
        grading::auto_pass(&questions)
    } else {
        grading::score_answers(&questions, &request.answers)?
    };

    db::quizzes::save_quiz_result(
        &state.db,
        &QuizResult {
            id: Uuid::new_v4(),
            learner_id: identity.learner_id,
            quiz_id: quiz.id,
            score: graded.score,
            total: graded.total,
            passed: graded.passed,
            created_at: Utc::now(),
        },
    )
    .await?;

    let enrollment =
        db::enrollments::get_enrollment(&state.db, identity.learner_id, quiz.program_id).await?;
    let enrollment = match enrollment {
        Some(current) if graded.passed && !current.completed => {
            progress::recompute_progress(&state.db, identity.learner_id, quiz.program_id).await?
        }
        other => other,
    };

    info!(
        learner_id = %identity.learner_id,
        quiz_id = %quiz.id,
        score = graded.score,
        total = graded.total,
        passed = graded.passed,
        auto_pass = request.auto_pass,
        "Quiz attempt graded"
    );

    Ok(Json(SubmitQuizResponse {
        quiz_id: quiz.id,
        score: graded.score,
        total: graded.total,
        passed: graded.passed,
        breakdown: graded.breakdown,
        enrollment,
    }))
}
